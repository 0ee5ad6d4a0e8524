//! Default header bag shared by every request

use std::sync::RwLock;

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::errors::CloudError;

/// Headers attached to every outgoing request until removed
#[derive(Debug, Default)]
pub struct HeaderBag {
    headers: RwLock<HeaderMap>,
}

impl HeaderBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: &str, value: &str) -> Result<(), CloudError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| CloudError::ConfigError(format!("invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| CloudError::ConfigError(format!("invalid header value: {}", e)))?;
        let mut headers = self.headers.write().unwrap_or_else(|e| e.into_inner());
        headers.insert(name, value);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        let headers = self.headers.read().unwrap_or_else(|e| e.into_inner());
        headers.contains_key(name.to_ascii_lowercase().as_str())
    }

    pub fn get(&self, name: &str) -> Option<String> {
        let headers = self.headers.read().unwrap_or_else(|e| e.into_inner());
        headers
            .get(name.to_ascii_lowercase().as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn remove(&self, name: &str) {
        let mut headers = self.headers.write().unwrap_or_else(|e| e.into_inner());
        headers.remove(name.to_ascii_lowercase().as_str());
    }

    pub fn clear(&self) {
        let mut headers = self.headers.write().unwrap_or_else(|e| e.into_inner());
        headers.clear();
    }

    /// Copy of the current headers, taken without holding the lock across a request
    pub fn snapshot(&self) -> HeaderMap {
        let headers = self.headers.read().unwrap_or_else(|e| e.into_inner());
        headers.clone()
    }
}
