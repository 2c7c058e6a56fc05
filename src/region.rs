//! Region resolution for signing scopes.

use std::sync::Arc;
use std::sync::RwLock;

use ini::Ini;
use log::debug;

use crate::constants::{AWS_CONFIG_FILE, AWS_DEFAULT_REGION, AWS_PROFILE, AWS_REGION};
use crate::env::{expand_home_dir, Env, OsEnv};

/// Region used when no source configures one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// RegionLoader resolves the signing region once and caches it.
///
/// Sources, in order: `AWS_REGION`, `AWS_DEFAULT_REGION`, the `region` key
/// of the active profile in the shared config file.
#[derive(Debug)]
pub struct RegionLoader {
    region: Arc<RwLock<Option<String>>>,

    env: Arc<dyn Env>,
}

impl Default for RegionLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionLoader {
    /// Create a new region loader reading the process environment.
    pub fn new() -> Self {
        Self {
            region: Arc::default(),
            env: Arc::new(OsEnv),
        }
    }

    /// Read the given environment instead of the process one.
    pub fn with_env(mut self, env: impl Env) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Load region.
    pub fn load(&self) -> Option<String> {
        // Return cached region if it's valid.
        if let Some(region) = self.region.read().expect("lock poisoned").clone() {
            return Some(region);
        }

        self.load_from_sources().map(|region| {
            let mut lock = self.region.write().expect("lock poisoned");
            *lock = Some(region.clone());

            region
        })
    }

    /// Load region, falling back to [`DEFAULT_REGION`].
    pub fn load_or_default(&self) -> String {
        self.load().unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    fn load_from_sources(&self) -> Option<String> {
        if let Some(region) = self.env.var(AWS_REGION).filter(|v| !v.is_empty()) {
            return Some(region);
        }
        if let Some(region) = self.env.var(AWS_DEFAULT_REGION).filter(|v| !v.is_empty()) {
            return Some(region);
        }

        self.load_from_profile()
    }

    /// Region from the `region` key of the active profile in the shared
    /// config file. Missing or unparsable files resolve to `None`, region
    /// lookup is best effort.
    fn load_from_profile(&self) -> Option<String> {
        let path = self
            .env
            .var(AWS_CONFIG_FILE)
            .unwrap_or_else(|| "~/.aws/config".to_string());
        let path = expand_home_dir(self.env.as_ref(), &path)?;

        let conf = match Ini::load_from_file(&path) {
            Ok(conf) => conf,
            Err(err) => {
                debug!("config file {path} is not loadable: {err:?}");
                return None;
            }
        };

        let profile = self
            .env
            .var(AWS_PROFILE)
            .unwrap_or_else(|| "default".to_string());
        let section = match profile.as_str() {
            "default" => "default".to_string(),
            x => format!("profile {x}"),
        };

        conf.section(Some(section))?
            .get("region")
            .map(|v| v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs::File;
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::env::StaticEnv;

    #[test]
    fn test_region_without_sources() {
        let _ = env_logger::builder().is_test(true).try_init();

        let l = RegionLoader::new().with_env(StaticEnv::default());
        assert!(l.load().is_none());
        assert_eq!(DEFAULT_REGION, l.load_or_default());
    }

    #[test]
    fn test_region_with_env() {
        let _ = env_logger::builder().is_test(true).try_init();

        temp_env::with_vars(vec![(AWS_REGION, Some("test"))], || {
            let l = RegionLoader::new();
            assert_eq!("test", l.load().expect("load must success"));
        });
    }

    #[test]
    fn test_region_with_default_region_env() {
        let _ = env_logger::builder().is_test(true).try_init();

        temp_env::with_vars(
            vec![
                (AWS_REGION, None::<&str>),
                (AWS_DEFAULT_REGION, Some("eu-west-1")),
            ],
            || {
                let l = RegionLoader::new();
                assert_eq!("eu-west-1", l.load().expect("load must success"));
            },
        );
    }

    #[test]
    fn test_region_from_profile() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let tmp_dir = tempdir()?;
        let file_path = tmp_dir.path().join("config");
        let mut tmp_file = File::create(&file_path)?;
        writeln!(tmp_file, "[default]")?;
        writeln!(tmp_file, "region = ap-northeast-1")?;
        writeln!(tmp_file)?;
        writeln!(tmp_file, "[profile staging]")?;
        writeln!(tmp_file, "region = eu-central-1")?;

        let l = RegionLoader::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([(
                AWS_CONFIG_FILE.to_string(),
                file_path.to_string_lossy().to_string(),
            )]),
        });
        assert_eq!("ap-northeast-1", l.load().expect("load must success"));

        let l = RegionLoader::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([
                (
                    AWS_CONFIG_FILE.to_string(),
                    file_path.to_string_lossy().to_string(),
                ),
                (AWS_PROFILE.to_string(), "staging".to_string()),
            ]),
        });
        assert_eq!("eu-central-1", l.load().expect("load must success"));

        Ok(())
    }

    #[test]
    fn test_region_cached_after_first_load() {
        let _ = env_logger::builder().is_test(true).try_init();

        temp_env::with_vars(vec![(AWS_REGION, Some("test"))], || {
            let l = RegionLoader::new();
            assert_eq!("test", l.load().expect("load must success"));

            temp_env::with_vars_unset(vec![AWS_REGION], || {
                assert_eq!("test", l.load().expect("cached region must survive"));
            });
        });
    }
}
