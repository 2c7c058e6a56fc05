use std::sync::Arc;

use crate::constants::{AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN};
use crate::env::{Env, OsEnv};
use crate::provide_credential::ProvideCredential;
use crate::{Credential, Result};

/// EnvCredentialProvider loads credentials from environment variables.
///
/// Reads `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`, and picks up
/// `AWS_SESSION_TOKEN` when present. Yields nothing unless both key
/// variables are set and non-blank.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    env: Arc<dyn Env>,
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvCredentialProvider {
    /// Create a provider reading the process environment.
    pub fn new() -> Self {
        Self {
            env: Arc::new(OsEnv),
        }
    }

    /// Read the given environment instead of the process one.
    pub fn with_env(mut self, env: impl Env) -> Self {
        self.env = Arc::new(env);
        self
    }
}

impl ProvideCredential for EnvCredentialProvider {
    fn provide_credential(&self) -> Result<Option<Credential>> {
        let access_key_id = self.env.var(AWS_ACCESS_KEY_ID);
        let secret_access_key = self.env.var(AWS_SECRET_ACCESS_KEY);

        match (access_key_id, secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => {
                let cred = Credential {
                    access_key_id,
                    secret_access_key,
                    session_token: self.env.var(AWS_SESSION_TOKEN),
                    ttl: None,
                };
                Ok(cred.is_valid().then_some(cred))
            }
            _ => Ok(None),
        }
    }
}
