//! Process-wide security properties with scoped, serialized overrides.
//!
//! Overrides are taken through [`SecurityProperties::override_scoped`], which
//! holds the registry's override lock for as long as the returned guard lives
//! and puts the previous value back when the guard drops, whichever way the
//! owning future ends.

use crate::error::{GamePayError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// DNS cache lifetime in seconds. `"0"` disables caching.
pub const DNS_CACHE_TTL: &str = "networkaddress.cache.ttl";

static GLOBAL: LazyLock<Arc<SecurityProperties>> =
    LazyLock::new(|| Arc::new(SecurityProperties::new()));

#[derive(Debug, Default)]
pub struct SecurityProperties {
    values: RwLock<HashMap<String, String>>,
    read_only: AtomicBool,
    override_lock: Mutex<()>,
}

impl SecurityProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> Arc<SecurityProperties> {
        GLOBAL.clone()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_writable(key)?;
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<Option<String>> {
        self.ensure_writable(key)?;
        Ok(self.values.write().remove(key))
    }

    /// Makes every write fail, as a sandboxed process would see it.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn ensure_writable(&self, key: &str) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            Err(GamePayError::PropertyDenied(key.to_string()))
        } else {
            Ok(())
        }
    }

    /// Waits for exclusive override rights, then sets `key` to `value`.
    ///
    /// The returned guard keeps other overrides out until it drops. When the
    /// write itself is denied the guard still serializes callers but restores
    /// nothing.
    pub async fn override_scoped<'a>(&'a self, key: &str, value: &str) -> PropertyOverride<'a> {
        let lock = self.override_lock.lock().await;
        let previous = self.get(key);
        let applied = match self.set(key, value) {
            Ok(()) => {
                debug!(key, value, ?previous, "security property overridden");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "security property override not permitted");
                false
            }
        };
        PropertyOverride {
            properties: self,
            key: key.to_string(),
            previous,
            applied,
            _lock: lock,
        }
    }
}

pub struct PropertyOverride<'a> {
    properties: &'a SecurityProperties,
    key: String,
    previous: Option<String>,
    applied: bool,
    _lock: MutexGuard<'a, ()>,
}

impl PropertyOverride<'_> {
    pub fn applied(&self) -> bool {
        self.applied
    }
}

impl Drop for PropertyOverride<'_> {
    fn drop(&mut self) {
        if !self.applied {
            return;
        }
        let restored = match &self.previous {
            Some(value) => self.properties.set(&self.key, value),
            None => self.properties.remove(&self.key).map(|_| ()),
        };
        match restored {
            Ok(()) => debug!(key = %self.key, previous = ?self.previous, "security property restored"),
            Err(e) => warn!(key = %self.key, error = %e, "failed to restore security property"),
        }
    }
}
