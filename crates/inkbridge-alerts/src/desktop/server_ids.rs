//! Tag → notification-server id bookkeeping.
//!
//! A server id is reused when the same tag is shown again, so the server
//! replaces the notification in place. Every show takes a new claim on the
//! tag; releasing an older claim leaves the newer one alone even though
//! both carry the same server id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Claim {
    id: u32,
    generation: u64,
}

#[derive(Debug, Default)]
struct Inner {
    claims: HashMap<String, Claim>,
    next_generation: u64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ServerIds {
    inner: Arc<Mutex<Inner>>,
}

impl ServerIds {
    /// Id to replace when showing `tag`, if one is still live.
    pub(crate) fn replacement_for(&self, tag: &str) -> Option<u32> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.claims.get(tag).map(|c| c.id))
    }

    pub(crate) fn claim(&self, tag: &str, id: u32) -> Option<Claim> {
        let mut inner = self.inner.lock().ok()?;
        inner.next_generation += 1;
        let claim = Claim {
            id,
            generation: inner.next_generation,
        };
        inner.claims.insert(tag.to_string(), claim);
        Some(claim)
    }

    /// Forget `tag` only while `claim` is still the latest one.
    pub(crate) fn release(&self, tag: &str, claim: Claim) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.claims.get(tag) == Some(&claim) {
            inner.claims.remove(tag);
        }
    }
}
