//! Access to ambient process state: environment variables, the home
//! directory, and the shared properties table.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;

/// Env abstracts the process environment so credential providers can be
/// exercised against a fixed environment in tests.
pub trait Env: Debug + Send + Sync + 'static {
    /// Get an environment variable.
    ///
    /// - Returns `Some(v)` if the environment variable is found and is valid utf-8.
    /// - Returns `None` if the environment variable is not found or value is invalid.
    fn var(&self, key: &str) -> Option<String>;

    /// Return the path to the users home dir, returns `None` if any error occurs.
    fn home_dir(&self) -> Option<PathBuf>;
}

/// Implements Env for the OS context, both Unix style and Windows.
#[derive(Debug, Copy, Clone, Default)]
pub struct OsEnv;

impl Env for OsEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var_os(key)?.into_string().ok()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        home::home_dir()
    }
}

/// StaticEnv provides a static env environment.
///
/// This is useful for testing or for providing a fixed environment.
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    /// The home directory to use.
    pub home_dir: Option<PathBuf>,
    /// The environment variables to use.
    pub envs: HashMap<String, String>,
}

impl Env for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.envs.get(key).cloned()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home_dir.clone()
    }
}

/// Expand `~` in input path.
///
/// - If path not starts with `~/` or `~\\`, returns `Some(path)` directly.
/// - Otherwise, replace `~` with home dir instead.
/// - If home_dir is not found, returns `None`.
pub fn expand_home_dir(env: &dyn Env, path: &str) -> Option<String> {
    if !path.starts_with("~/") && !path.starts_with("~\\") {
        Some(path.to_string())
    } else {
        env.home_dir()
            .map(|home| path.replace('~', &home.to_string_lossy()))
    }
}

/// Properties is a process-local key/value table, the analogue of JVM
/// system properties for configuring credentials programmatically.
///
/// Handles are cheap clones of one shared table: a value set through any
/// handle is immediately visible to every provider holding a clone.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl Properties {
    /// Create an empty properties table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value for a property key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.read().expect("lock poisoned").get(key).cloned()
    }

    /// Set a property, returning the previous value if any.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.inner
            .write()
            .expect("lock poisoned")
            .insert(key.into(), value.into())
    }

    /// Remove a property, returning the removed value if any.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.inner.write().expect("lock poisoned").remove(key)
    }
}
