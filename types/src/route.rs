//! RPC route descriptor

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Target of an RPC call: `[server_type.]service.method`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    /// Server type, empty when the route is local to the receiving server
    pub server_type: String,
    pub service: String,
    pub method: String,
}

impl Route {
    pub fn new(
        server_type: impl Into<String>,
        service: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            server_type: server_type.into(),
            service: service.into(),
            method: method.into(),
        }
    }

    /// Parse a dotted route string.
    ///
    /// Three segments are `server_type.service.method`, two are
    /// `service.method`. Blank segments are rejected before the count check.
    pub fn decode(route: &str) -> Result<Self, TypesError> {
        let parts: Vec<&str> = route.split('.').collect();

        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(TypesError::EmptyRouteField(route.to_string()));
        }

        match parts.as_slice() {
            [server_type, service, method] => Ok(Self::new(*server_type, *service, *method)),
            [service, method] => Ok(Self::new("", *service, *method)),
            _ => Err(TypesError::InvalidRoute(route.to_string())),
        }
    }

    /// `service.method`, without the server type
    pub fn short(&self) -> String {
        format!("{}.{}", self.service, self.method)
    }
}

impl FromStr for Route {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.server_type.is_empty() {
            write!(f, "{}.{}", self.service, self.method)
        } else {
            write!(f, "{}.{}.{}", self.server_type, self.service, self.method)
        }
    }
}
