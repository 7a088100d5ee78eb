//! localStorage Backend
//!
//! Persists the client core's `auth-storage`, `chat-storage` and
//! `notification-storage` entries in the browser.

use groupchat::store::KeyValueStorage;
use groupchat::{ClientError, ClientResult};
use wasm_bindgen::JsValue;

/// `window.localStorage`, looked up on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    fn backend() -> ClientResult<web_sys::Storage> {
        web_sys::window()
            .and_then(|window| window.local_storage().ok().flatten())
            .ok_or_else(|| ClientError::Storage("localStorage unavailable".to_string()))
    }
}

impl KeyValueStorage for LocalStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Self::backend()?.get_item(key).map_err(js_error)
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        Self::backend()?.set_item(key, value).map_err(js_error)
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        Self::backend()?.remove_item(key).map_err(js_error)
    }
}

fn js_error(e: JsValue) -> ClientError {
    ClientError::Storage(
        e.as_string()
            .unwrap_or_else(|| format!("{:?}", e)),
    )
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_local_storage_round_trip() {
        let storage = LocalStorage;
        let key = "groupchat-test-entry";

        storage.set(key, r#"{"unread_count":3}"#).unwrap();
        assert_eq!(storage.get(key).unwrap().as_deref(), Some(r#"{"unread_count":3}"#));

        storage.remove(key).unwrap();
        assert_eq!(storage.get(key).unwrap(), None);
    }
}
