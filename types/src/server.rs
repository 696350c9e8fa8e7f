//! Cluster server model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single backend instance of some server type.
///
/// Servers are owned by service discovery and handed to the router as
/// `Arc<Server>`; the router only ever selects among them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Unique server ID
    pub id: String,

    /// Logical server type (e.g. "room", "match")
    pub server_type: String,

    /// Free-form metadata published by the server
    pub metadata: HashMap<String, String>,

    /// Whether the server accepts client connections
    pub frontend: bool,

    /// Host the server runs on
    pub hostname: String,
}

impl Server {
    /// Create a new server
    pub fn new(id: impl Into<String>, server_type: impl Into<String>, frontend: bool) -> Self {
        Self {
            id: id.into(),
            server_type: server_type.into(),
            metadata: HashMap::new(),
            frontend,
            hostname: String::new(),
        }
    }

    /// Create a new server with a random v4 UUID as its ID
    pub fn with_generated_id(server_type: impl Into<String>, frontend: bool) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), server_type, frontend)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Identifying address, `<server_type>/<id>`
    pub fn address(&self) -> String {
        format!("{}/{}", self.server_type, self.id)
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address())
    }
}
