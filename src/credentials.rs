//! Secure storage for the claude.ai session key using the system keyring.
//!
//! The session key is stored in the OS's native secret storage:
//! - Linux: kernel keyutils
//! - macOS: Keychain
//! - Windows: Credential Manager
//!
//! Security notes:
//! - Never log the key value
//! - Always use masked display in UI

use std::sync::Mutex;

use keyring::Entry;

const SERVICE_NAME: &str = "claude-checker";
const SESSION_KEY_NAME: &str = "claude-session-key";

/// Environment variable that overrides the stored session key.
pub const SESSION_KEY_ENV: &str = "CLAUDE_SESSION_KEY";

/// Somewhere a session key can be kept between runs.
pub trait CredentialStore: Send + Sync {
    /// Stored key, if any. Errors are logged and reported as `None`.
    fn load(&self) -> Option<String>;
    /// Store a key, replacing any previous one.
    fn save(&self, key: &str) -> Result<(), String>;
    /// Remove the stored key. Removing a missing key is not an error.
    fn clear(&self) -> Result<(), String>;
}

/// OS keyring backed store.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringStore;

impl KeyringStore {
    fn entry() -> Result<Entry, String> {
        Entry::new(SERVICE_NAME, SESSION_KEY_NAME)
            .map_err(|e| format!("Failed to create keyring entry: {}", e))
    }
}

impl CredentialStore for KeyringStore {
    fn load(&self) -> Option<String> {
        let entry = match Self::entry() {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Credentials: {}", e);
                return None;
            }
        };

        match entry.get_password() {
            Ok(key) if key.trim().is_empty() => None,
            Ok(key) => Some(key),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                log::warn!("Credentials: failed to retrieve session key: {}", e);
                None
            }
        }
    }

    fn save(&self, key: &str) -> Result<(), String> {
        let key = key.trim();
        if key.is_empty() {
            return self.clear();
        }
        Self::entry()?
            .set_password(key)
            .map_err(|e| format!("Failed to store session key: {}", e))?;
        // Log action without the key value
        log::info!("Credentials: stored new session key");
        Ok(())
    }

    fn clear(&self) -> Result<(), String> {
        match Self::entry()?.delete_credential() {
            Ok(()) => {
                log::info!("Credentials: deleted session key");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(format!("Failed to delete session key: {}", e)),
        }
    }
}

/// Process-local store, used by tests and when no keyring is wanted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    key: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new(initial: Option<&str>) -> Self {
        Self {
            key: Mutex::new(initial.map(str::to_string)),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Option<String> {
        let guard = self.key.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone().filter(|k| !k.trim().is_empty())
    }

    fn save(&self, key: &str) -> Result<(), String> {
        let mut guard = self.key.lock().map_err(|e| e.to_string())?;
        *guard = Some(key.trim().to_string()).filter(|k| !k.is_empty());
        Ok(())
    }

    fn clear(&self) -> Result<(), String> {
        let mut guard = self.key.lock().map_err(|e| e.to_string())?;
        *guard = None;
        Ok(())
    }
}

/// Pick the session key to use: `CLAUDE_SESSION_KEY` first, then the store.
pub fn resolve_credential(store: &dyn CredentialStore) -> Option<String> {
    credential_from(std::env::var(SESSION_KEY_ENV).ok(), store)
}

fn credential_from(env_value: Option<String>, store: &dyn CredentialStore) -> Option<String> {
    match env_value.map(|v| v.trim().to_string()) {
        Some(key) if !key.is_empty() => {
            log::debug!("Credentials: using session key from {}", SESSION_KEY_ENV);
            Some(key)
        }
        _ => store.load(),
    }
}

/// Masked version of a key for display (e.g., "sk-...abc123").
pub fn mask_credential(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..3].iter().collect();
        let tail: String = chars[chars.len() - 6..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
