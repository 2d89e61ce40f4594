use crate::error::{ConfigError, FinteamError};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Read-only snapshot of credentials.
///
/// Values come from the process environment first, then from a dotenv-style
/// secret file. Nothing is ever written back to the environment.
#[derive(Clone, Default)]
pub struct SecretSource {
    values: HashMap<String, String>,
}

impl SecretSource {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Environment snapshot, filled in from `secret_file` for keys the
    /// environment does not define. A missing file is not an error.
    pub fn from_process(secret_file: &Path) -> Result<Self, FinteamError> {
        let mut source = Self::from_pairs(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        );
        if secret_file.exists() {
            source.merge_file(secret_file)?;
        } else {
            tracing::debug!(path = %secret_file.display(), "no secret file");
        }
        Ok(source)
    }

    /// Adds entries from a dotenv file without overriding existing keys.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), FinteamError> {
        let iter = dotenvy::from_path_iter(path).map_err(|e| {
            ConfigError::Settings(format!("cannot read {}: {e}", path.display()))
        })?;
        for item in iter {
            let (key, value) = item.map_err(|e| {
                ConfigError::Settings(format!("malformed entry in {}: {e}", path.display()))
            })?;
            self.values.entry(key).or_insert(value);
        }
        Ok(())
    }

    /// Non-blank value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingCredential {
            env: key.to_string(),
        })
    }
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("SecretSource").field("keys", &keys).finish()
    }
}
