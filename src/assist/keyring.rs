use std::collections::HashMap;

use thiserror::Error;

pub(crate) const SERVICE_NAME: &str = "droidplan";
const KEYRING_SERVER: &str = "gemini-api";
const ITEM_LABEL: &str = "DroidPlan Gemini API Key";

/// Environment variables checked before the keyring, in order.
pub const API_KEY_VARS: [&str; 2] = ["DROIDPLAN_API_KEY", "API_KEY"];

#[derive(Debug, Error)]
pub enum KeyringError {
    #[error("API key is blank")]
    BlankKey,
    #[error("secret service unavailable: {0}")]
    Unavailable(#[source] oo7::Error),
    #[error("keyring {action} failed: {source}")]
    Operation {
        action: &'static str,
        #[source]
        source: oo7::Error,
    },
    #[error("stored API key is not UTF-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

fn attributes() -> HashMap<&'static str, &'static str> {
    HashMap::from([("service", SERVICE_NAME), ("server", KEYRING_SERVER)])
}

async fn open_keyring() -> Result<oo7::Keyring, KeyringError> {
    oo7::Keyring::new().await.map_err(KeyringError::Unavailable)
}

/// The trimmed key, or `None` when nothing is left to store.
pub fn normalize_key(key: &str) -> Option<&str> {
    Some(key.trim()).filter(|k| !k.is_empty())
}

/// Save the Gemini API key to the Secret Service, replacing any earlier one.
pub async fn store_api_key(key: &str) -> Result<(), KeyringError> {
    let key = normalize_key(key).ok_or(KeyringError::BlankKey)?;
    let keyring = open_keyring().await?;
    keyring
        .create_item(ITEM_LABEL, &attributes(), key.as_bytes(), true)
        .await
        .map_err(|source| KeyringError::Operation {
            action: "store",
            source,
        })?;
    log::info!("Stored API key in keyring");
    Ok(())
}

/// The stored Gemini API key, if any non-blank one exists.
pub async fn load_api_key() -> Result<Option<String>, KeyringError> {
    let keyring = open_keyring().await?;
    let items = keyring
        .search_items(&attributes())
        .await
        .map_err(|source| KeyringError::Operation {
            action: "search",
            source,
        })?;
    let Some(item) = items.first() else {
        return Ok(None);
    };
    let secret = item.secret().await.map_err(|source| KeyringError::Operation {
        action: "read",
        source,
    })?;
    let key = String::from_utf8(secret.to_vec())?;
    Ok(normalize_key(&key).map(str::to_string))
}

/// First non-blank value among `vars` in the process environment.
pub fn api_key_from_env(vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|name| std::env::var(name).ok())
        .find_map(|v| normalize_key(&v).map(str::to_string))
}

/// Environment first, then the keyring. Keyring failures count as "no key".
pub async fn resolve_api_key() -> Option<String> {
    if let Some(key) = api_key_from_env(&API_KEY_VARS) {
        return Some(key);
    }
    match load_api_key().await {
        Ok(key) => key,
        Err(e) => {
            log::debug!("Keyring lookup skipped: {}", e);
            None
        }
    }
}
