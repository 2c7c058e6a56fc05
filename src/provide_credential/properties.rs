use crate::constants::{
    AWS_ACCESS_KEY_ID_PROPERTY, AWS_SECRET_ACCESS_KEY_PROPERTY, AWS_SESSION_TOKEN_PROPERTY,
};
use crate::env::Properties;
use crate::provide_credential::ProvideCredential;
use crate::{Credential, Result};

/// PropertiesCredentialProvider loads credentials from a process-local
/// [`Properties`] table, the counterpart of JVM system properties.
///
/// Reads `aws.accessKeyId` and `aws.secretKey`, and picks up
/// `aws.sessionToken` when present. Yields nothing unless both key
/// properties are set and non-blank.
#[derive(Debug, Clone)]
pub struct PropertiesCredentialProvider {
    properties: Properties,
}

impl PropertiesCredentialProvider {
    /// Create a provider reading the given properties table.
    ///
    /// The table is shared: values set on any clone of the handle are
    /// visible to this provider on the next load.
    pub fn new(properties: Properties) -> Self {
        Self { properties }
    }
}

impl ProvideCredential for PropertiesCredentialProvider {
    fn provide_credential(&self) -> Result<Option<Credential>> {
        let access_key_id = self.properties.get(AWS_ACCESS_KEY_ID_PROPERTY);
        let secret_access_key = self.properties.get(AWS_SECRET_ACCESS_KEY_PROPERTY);

        match (access_key_id, secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => {
                let cred = Credential {
                    access_key_id,
                    secret_access_key,
                    session_token: self.properties.get(AWS_SESSION_TOKEN_PROPERTY),
                    ttl: None,
                };
                Ok(cred.is_valid().then_some(cred))
            }
            _ => Ok(None),
        }
    }
}
