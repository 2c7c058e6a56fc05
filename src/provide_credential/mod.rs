//! Credential providers.
//!
//! A provider is any source of signing credentials: environment variables,
//! process-wide properties, the shared AWS config files, or a fixed value.
//! Providers compose through [`ProvideCredentialChain`] and gain caching
//! and background refresh through [`CachedCredentialProvider`].

use std::fmt::Debug;

use crate::credential::Credential;
use crate::Result;

/// Load a credential from some source.
///
/// Returning `Ok(None)` means the source has nothing to offer and the
/// caller may consult another one. Returning `Err` means the source is
/// misconfigured or broken in a way worth surfacing.
pub trait ProvideCredential: Debug + Send + Sync + 'static {
    /// Load a credential.
    fn provide_credential(&self) -> Result<Option<Credential>>;

    /// Release background resources held by this provider.
    ///
    /// Calling `provide_credential` after `stop` is allowed; decorators
    /// may keep serving a previously loaded value.
    fn stop(&self) {}
}

mod cached;
pub use cached::CachedCredentialProvider;

mod chain;
pub use chain::ProvideCredentialChain;

mod default;
pub use default::DefaultCredentialProvider;

mod env;
pub use env::EnvCredentialProvider;

mod profile;
pub use profile::ProfileCredentialProvider;

mod properties;
pub use properties::PropertiesCredentialProvider;

mod r#static;
pub use r#static::StaticCredentialProvider;
