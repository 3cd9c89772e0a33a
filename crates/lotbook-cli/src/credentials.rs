//! Gist access token storage in the OS keychain.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use crate::config_profiles::normalize_text_option;
use crate::error::CliError;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "lotbook-cli";

/// Environment variable that overrides the stored token.
pub const TOKEN_ENV_VAR: &str = "LOTBOOK_GIST_TOKEN";

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    Keychain,
}

impl TokenSource {
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Environment => TOKEN_ENV_VAR,
            Self::Keychain => "OS keychain",
        }
    }
}

#[derive(Clone)]
pub struct TokenStore {
    username: String,
}

impl TokenStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            username: format!("gist_token:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> Result<Entry, CliError> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| CliError::Credentials(error.to_string()))
    }

    #[cfg(not(test))]
    pub fn load(&self) -> Result<Option<String>, CliError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(normalize_text_option(Some(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(CliError::Credentials(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn load(&self) -> Result<Option<String>, CliError> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::Credentials(error.to_string()))?;
        Ok(normalize_text_option(guard.get(&self.username).cloned()))
    }

    #[cfg(not(test))]
    pub fn save(&self, token: &str) -> Result<(), CliError> {
        self.entry()?
            .set_password(token)
            .map_err(|error| CliError::Credentials(error.to_string()))
    }

    #[cfg(test)]
    pub fn save(&self, token: &str) -> Result<(), CliError> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::Credentials(error.to_string()))?;
        guard.insert(self.username.clone(), token.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    pub fn clear(&self) -> Result<(), CliError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(CliError::Credentials(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn clear(&self) -> Result<(), CliError> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::Credentials(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

/// Token for a profile: the environment variable first, then the keychain.
pub fn resolve_token(profile_name: &str) -> Result<Option<(String, TokenSource)>, CliError> {
    if let Some(token) = normalize_text_option(std::env::var(TOKEN_ENV_VAR).ok()) {
        return Ok(Some((token, TokenSource::Environment)));
    }
    Ok(TokenStore::new(profile_name)
        .load()?
        .map(|token| (token, TokenSource::Keychain)))
}
