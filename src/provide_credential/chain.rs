use std::fmt;
use std::fmt::Debug;
use std::sync::Mutex;

use log::{debug, warn};

use crate::provide_credential::ProvideCredential;
use crate::{Credential, Result};

/// A chain of credential providers tried in order.
///
/// During a scan a provider error is logged and the next provider is
/// tried. The first provider that yields a credential is pinned: later
/// loads go straight to it, and its results, errors included, are
/// returned as-is without falling back to the rest of the chain.
pub struct ProvideCredentialChain {
    providers: Vec<Box<dyn ProvideCredential>>,
    pinned: Mutex<Option<usize>>,
}

impl Debug for ProvideCredentialChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideCredentialChain")
            .field("providers_count", &self.providers.len())
            .finish()
    }
}

impl Default for ProvideCredentialChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvideCredentialChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            pinned: Mutex::new(None),
        }
    }

    /// Add a provider to the end of the chain.
    pub fn push(mut self, provider: impl ProvideCredential) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Create a chain from a vector of providers.
    pub fn from_vec(providers: Vec<Box<dyn ProvideCredential>>) -> Self {
        Self {
            providers,
            pinned: Mutex::new(None),
        }
    }
}

impl ProvideCredential for ProvideCredentialChain {
    fn provide_credential(&self) -> Result<Option<Credential>> {
        let pinned = *self.pinned.lock().expect("lock poisoned");
        if let Some(i) = pinned {
            return self.providers[i].provide_credential();
        }

        for (i, provider) in self.providers.iter().enumerate() {
            debug!("trying credential provider: {provider:?}");

            match provider.provide_credential() {
                Ok(Some(cred)) => {
                    debug!("loaded credential from provider: {provider:?}");
                    *self.pinned.lock().expect("lock poisoned") = Some(i);
                    return Ok(Some(cred));
                }
                Ok(None) => {
                    debug!("no credential found in provider: {provider:?}");
                }
                Err(err) => {
                    warn!("credential provider {provider:?} failed: {err:?}");
                }
            }
        }

        Ok(None)
    }

    fn stop(&self) {
        for provider in &self.providers {
            provider.stop();
        }
    }
}
