//! Client session context

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Session of a connected client.
///
/// The router never looks inside; it is passed through to routing strategies
/// that need per-client stickiness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Frontend-assigned session ID
    pub id: i64,

    /// User ID once the session is bound
    uid: Option<String>,

    /// Arbitrary key/value data attached to the session
    data: HashMap<String, String>,
}

impl Session {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            uid: None,
            data: HashMap::new(),
        }
    }

    /// Bind the session to a user ID
    pub fn bind(&mut self, uid: impl Into<String>) {
        self.uid = Some(uid.into());
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.uid.is_some()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}
