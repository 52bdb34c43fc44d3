//! Tab identity used to namespace persisted timer state

use std::fmt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::KeyValueStore;

/// Session store key holding the identity of the current tab
pub const TAB_ID_KEY: &str = "timer-tab-id";

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Random, session-scoped identifier of one tab
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identity of the form `tab-<millis>-<9 base36 chars>`
    pub fn generate(now_ms: i64) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect();
        Self(format!("tab-{}-{}", now_ms, suffix))
    }

    /// Reuse the identity stored in the session store, or generate and store one
    ///
    /// A failed write is logged; the generated identity is still returned so the
    /// tab keeps working for the rest of its lifetime.
    pub fn resolve(session: &dyn KeyValueStore, now_ms: i64) -> Self {
        match session.get(TAB_ID_KEY) {
            Ok(Some(existing)) if !existing.trim().is_empty() => {
                debug!("Reusing tab identity {}", existing.trim());
                return Self(existing.trim().to_string());
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to read tab identity, generating a new one: {}", e),
        }

        let generated = Self::generate(now_ms);
        if let Err(e) = session.set(TAB_ID_KEY, generated.as_str()) {
            warn!("Failed to remember tab identity {}: {}", generated, e);
        }
        debug!("Generated tab identity {}", generated);
        generated
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
