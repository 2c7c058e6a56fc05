use crate::provide_credential::ProvideCredential;
use crate::{Credential, Error, Result};

/// StaticCredentialProvider returns a fixed credential on every load.
///
/// Useful for hardcoded credentials in tests or for plugging an external
/// credential source into a chain.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Create a provider around a fixed access key pair.
    ///
    /// Fails when either field is blank: a static provider with nothing
    /// to provide is a configuration mistake, not an absent source.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Result<Self> {
        let credential = Credential::new(access_key_id, secret_access_key);
        if !credential.is_valid() {
            return Err(Error::credential_incomplete(
                "static credentials require a non-blank access key id and secret access key",
            ));
        }

        Ok(Self { credential })
    }

    /// Set the session token.
    pub fn with_session_token(mut self, token: &str) -> Self {
        self.credential.session_token = Some(token.to_string());
        self
    }

    /// Set a time-to-live so a caching wrapper refreshes the credential.
    pub fn with_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.credential.ttl = Some(ttl);
        self
    }
}

impl ProvideCredential for StaticCredentialProvider {
    fn provide_credential(&self) -> Result<Option<Credential>> {
        Ok(Some(self.credential.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_static_credential_provider() {
        let _ = env_logger::builder().is_test(true).try_init();

        let provider = StaticCredentialProvider::new("access_key_id", "secret_access_key")
            .expect("provider must build");

        let cred = provider
            .provide_credential()
            .expect("provider must not fail")
            .expect("credential must be found");
        assert_eq!("access_key_id", cred.access_key_id);
        assert_eq!("secret_access_key", cred.secret_access_key);
        assert_eq!(None, cred.session_token);
    }

    #[test]
    fn test_static_credential_provider_with_session_token() {
        let _ = env_logger::builder().is_test(true).try_init();

        let provider = StaticCredentialProvider::new("access_key_id", "secret_access_key")
            .expect("provider must build")
            .with_session_token("session_token");

        let cred = provider
            .provide_credential()
            .expect("provider must not fail")
            .expect("credential must be found");
        assert_eq!(Some("session_token"), cred.session_token.as_deref());
    }

    #[test]
    fn test_static_credential_provider_rejects_blank() {
        let _ = env_logger::builder().is_test(true).try_init();

        for (access_key_id, secret_access_key) in
            [("", "secret_access_key"), ("access_key_id", ""), ("", "")]
        {
            let err = StaticCredentialProvider::new(access_key_id, secret_access_key)
                .expect_err("blank fields must be rejected");
            assert_eq!(ErrorKind::CredentialIncomplete, err.kind());
        }
    }
}
