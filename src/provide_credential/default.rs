use crate::env::{Env, Properties};
use crate::provide_credential::{
    EnvCredentialProvider, ProfileCredentialProvider, PropertiesCredentialProvider,
    ProvideCredential, ProvideCredentialChain,
};
use crate::{Credential, Result};

/// DefaultCredentialProvider resolves credentials the standard way:
/// environment variables first, then process-local properties, then the
/// shared AWS files.
///
/// Remote sources such as container or instance metadata endpoints are
/// not part of the default chain.
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain,
    properties: Properties,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create the default provider chain.
    pub fn new() -> Self {
        let properties = Properties::new();
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(PropertiesCredentialProvider::new(properties.clone()))
            .push(ProfileCredentialProvider::new());

        Self { chain, properties }
    }

    /// Rebuild the chain against the given environment instead of the
    /// process one.
    pub fn with_env(self, env: impl Env + Clone) -> Self {
        let properties = self.properties;
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new().with_env(env.clone()))
            .push(PropertiesCredentialProvider::new(properties.clone()))
            .push(ProfileCredentialProvider::new().with_env(env));

        Self { chain, properties }
    }

    /// Replace the chain entirely, keeping the properties table.
    pub fn with_chain(mut self, chain: ProvideCredentialChain) -> Self {
        self.chain = chain;
        self
    }

    /// The properties table consulted by this provider.
    ///
    /// The handle is shared: values set on it are visible on the next
    /// load.
    pub fn properties(&self) -> Properties {
        self.properties.clone()
    }
}

impl ProvideCredential for DefaultCredentialProvider {
    fn provide_credential(&self) -> Result<Option<Credential>> {
        self.chain.provide_credential()
    }

    fn stop(&self) {
        self.chain.stop();
    }
}
