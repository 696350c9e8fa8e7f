//! Errors for the call-context types

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Route has an empty field: {0}")]
    EmptyRouteField(String),

    #[error("Unknown RPC kind: {0}")]
    UnknownRpcKind(i32),
}
