use std::sync::Arc;

use crate::hash::Payload;
use crate::provide_credential::ProvideCredential;
use crate::sign_request::RequestSigner;
use crate::{Error, Result};

/// Signer is the main struct used to sign requests.
///
/// It ties a credential provider to a [`RequestSigner`]: every call loads
/// a credential and signs with it. Wrap the provider in
/// [`CachedCredentialProvider`][crate::provide_credential::CachedCredentialProvider]
/// to avoid reloading on every request.
#[derive(Clone, Debug)]
pub struct Signer {
    provider: Arc<dyn ProvideCredential>,
    signer: RequestSigner,
}

impl Signer {
    /// Create a new signer.
    pub fn new(provider: impl ProvideCredential, signer: RequestSigner) -> Self {
        Self {
            provider: Arc::new(provider),
            signer,
        }
    }

    /// Load a credential and sign the request with it.
    pub fn sign(&self, req: &mut http::request::Parts, payload: &Payload) -> Result<()> {
        let Some(cred) = self.provider.provide_credential()? else {
            return Err(Error::credential_not_found("no credentials available"));
        };

        self.signer.sign(req, payload, &cred)
    }

    /// Stop the underlying provider.
    pub fn stop(&self) {
        self.provider.stop();
    }
}

#[cfg(test)]
mod tests {
    use http::header::AUTHORIZATION;
    use http::Request;

    use super::*;
    use crate::provide_credential::{ProvideCredentialChain, StaticCredentialProvider};
    use crate::ErrorKind;

    #[test]
    fn test_signer_signs_with_provided_credential() {
        let _ = env_logger::builder().is_test(true).try_init();

        let provider = StaticCredentialProvider::new("access_key_id", "secret_access_key")
            .expect("provider must build");
        let signer = Signer::new(provider, RequestSigner::new("us-east-1"));

        let req = Request::builder()
            .method(http::Method::GET)
            .uri("https://s3.amazonaws.com/testbucket")
            .body(())
            .expect("request must build");
        let (mut parts, _) = req.into_parts();

        signer
            .sign(&mut parts, &Payload::Empty)
            .expect("sign must succeed");

        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .expect("authorization header must be set")
            .to_str()
            .expect("authorization header must be valid");
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=access_key_id/"));
    }

    #[test]
    fn test_signer_without_credential() {
        let _ = env_logger::builder().is_test(true).try_init();

        let signer = Signer::new(
            ProvideCredentialChain::new(),
            RequestSigner::new("us-east-1"),
        );

        let req = Request::builder()
            .method(http::Method::GET)
            .uri("https://s3.amazonaws.com/testbucket")
            .body(())
            .expect("request must build");
        let (mut parts, _) = req.into_parts();

        let err = signer
            .sign(&mut parts, &Payload::Empty)
            .expect_err("sign must fail without credentials");
        assert_eq!(ErrorKind::CredentialNotFound, err.kind());
        assert!(err.is_credential_error());
    }
}
