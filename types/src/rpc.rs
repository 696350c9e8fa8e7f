//! RPC classification

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TypesError;

/// Kind of an RPC call.
///
/// `User` calls originate from a client and are always load balanced;
/// `Sys` calls are server-to-server and may be steered by a per-type strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum RpcKind {
    /// Internal server-to-server call
    Sys = 0,

    /// Client-originated call
    User = 1,
}

impl RpcKind {
    pub fn is_user(&self) -> bool {
        matches!(self, RpcKind::User)
    }
}

impl TryFrom<i32> for RpcKind {
    type Error = TypesError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RpcKind::Sys),
            1 => Ok(RpcKind::User),
            other => Err(TypesError::UnknownRpcKind(other)),
        }
    }
}

impl fmt::Display for RpcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcKind::Sys => write!(f, "sys"),
            RpcKind::User => write!(f, "user"),
        }
    }
}
