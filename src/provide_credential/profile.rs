use std::fs;
use std::sync::Arc;

use ini::Ini;
use log::debug;

use crate::constants::{AWS_CONFIG_FILE, AWS_PROFILE, AWS_SHARED_CREDENTIALS_FILE};
use crate::env::{expand_home_dir, Env, OsEnv};
use crate::provide_credential::ProvideCredential;
use crate::{Credential, Error, Result};

const DEFAULT_CREDENTIALS_FILE: &str = "~/.aws/credentials";
const DEFAULT_CONFIG_FILE: &str = "~/.aws/config";

/// ProfileCredentialProvider loads credentials from the shared AWS files.
///
/// Looks for the active profile in the credentials file first
/// (`~/.aws/credentials` or the path in `AWS_SHARED_CREDENTIALS_FILE`),
/// then in the config file (`~/.aws/config` or the path in
/// `AWS_CONFIG_FILE`). The active profile is taken from `AWS_PROFILE`,
/// the value given to [`with_profile`][Self::with_profile], or `default`.
///
/// A missing or unreadable file yields nothing; a file that exists but
/// cannot be parsed is an error.
#[derive(Debug, Clone)]
pub struct ProfileCredentialProvider {
    env: Arc<dyn Env>,
    profile: String,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl Default for ProfileCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCredentialProvider {
    /// Create a provider reading the `default` profile.
    pub fn new() -> Self {
        Self {
            env: Arc::new(OsEnv),
            profile: "default".to_string(),
            config_file: None,
            credentials_file: None,
        }
    }

    /// Read the given environment instead of the process one.
    pub fn with_env(mut self, env: impl Env) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Set the profile name to load.
    ///
    /// `AWS_PROFILE` still takes precedence when set.
    pub fn with_profile(mut self, profile: &str) -> Self {
        self.profile = profile.to_string();
        self
    }

    /// Set the config file path, overriding `AWS_CONFIG_FILE` and the
    /// `~/.aws/config` default.
    pub fn with_config_file(mut self, path: &str) -> Self {
        self.config_file = Some(path.to_string());
        self
    }

    /// Set the credentials file path, overriding
    /// `AWS_SHARED_CREDENTIALS_FILE` and the `~/.aws/credentials` default.
    pub fn with_credentials_file(mut self, path: &str) -> Self {
        self.credentials_file = Some(path.to_string());
        self
    }

    fn load_file(&self, path: &str, kind: &str) -> Result<Option<Ini>> {
        let path = match expand_home_dir(self.env.as_ref(), path) {
            Some(expanded) => expanded,
            None => {
                debug!("failed to expand home dir in {kind} file path: {path}");
                return Ok(None);
            }
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                debug!("failed to read {kind} file {path}: {err:?}");
                return Ok(None);
            }
        };

        let conf = Ini::load_from_str(&content).map_err(|err| {
            Error::config_invalid(format!("failed to parse {kind} file {path}"))
                .with_source(anyhow::Error::new(err))
        })?;

        Ok(Some(conf))
    }

    fn load_from_credentials_file(&self, profile: &str) -> Result<Option<Credential>> {
        let path = self
            .credentials_file
            .clone()
            .or_else(|| self.env.var(AWS_SHARED_CREDENTIALS_FILE))
            .unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.to_string());

        let Some(conf) = self.load_file(&path, "credentials")? else {
            return Ok(None);
        };

        let Some(props) = conf.section(Some(profile)) else {
            debug!("profile {profile} is not found in credentials file");
            return Ok(None);
        };

        Ok(credential_from_section(props))
    }

    fn load_from_config_file(&self, profile: &str) -> Result<Option<Credential>> {
        let path = self
            .config_file
            .clone()
            .or_else(|| self.env.var(AWS_CONFIG_FILE))
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let Some(conf) = self.load_file(&path, "config")? else {
            return Ok(None);
        };

        // The config file prefixes every profile section except `default`.
        let section = match profile {
            "default" => "default".to_string(),
            profile => format!("profile {profile}"),
        };

        let Some(props) = conf.section(Some(&section)) else {
            debug!("profile {profile} is not found in config file");
            return Ok(None);
        };

        Ok(credential_from_section(props))
    }
}

fn credential_from_section(props: &ini::Properties) -> Option<Credential> {
    let access_key_id = props.get("aws_access_key_id");
    let secret_access_key = props.get("aws_secret_access_key");

    match (access_key_id, secret_access_key) {
        (Some(access_key_id), Some(secret_access_key)) => {
            let cred = Credential {
                access_key_id: access_key_id.to_string(),
                secret_access_key: secret_access_key.to_string(),
                session_token: props.get("aws_session_token").map(|v| v.to_string()),
                ttl: None,
            };
            cred.is_valid().then_some(cred)
        }
        _ => None,
    }
}

impl ProvideCredential for ProfileCredentialProvider {
    fn provide_credential(&self) -> Result<Option<Credential>> {
        let profile = self
            .env
            .var(AWS_PROFILE)
            .unwrap_or_else(|| self.profile.clone());

        if let Some(cred) = self.load_from_credentials_file(&profile)? {
            return Ok(Some(cred));
        }

        self.load_from_config_file(&profile)
    }
}
