//! Courier Router - RPC Routing Module
//!
//! Picks the backend server that receives an RPC.
//!
//! # Architecture
//!
//! ```text
//! RPC (kind, server type, session, route)
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │   ServiceDiscovery      │  Resolves server type → live servers
//! └───────────┬─────────────┘
//!             │
//!             ▼
//! ┌─────────────────────────┐
//! │        Router           │  User RPC → random
//! │   (Which server?)       │  Sys RPC  → per-type strategy, else random
//! └─────────────────────────┘
//! ```
//!
//! # Routing Strategies
//!
//! - **RandomStrategy**: Uniform random selection (the default)
//! - **RoundRobinStrategy**: Rotates through the servers of a type
//! - **SessionAffinityStrategy**: Same session → same server
//! - **FnStrategy**: Any closure with the strategy signature
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_router::{Router, StaticServiceDiscovery};
//! use courier_types::{Route, RpcKind, Server};
//!
//! let discovery = Arc::new(StaticServiceDiscovery::new());
//! discovery.register(Server::new("room-1", "room", false));
//!
//! let mut router = Router::new();
//! router.set_service_discovery(discovery);
//! router.add_route_fn("room", |_session, _route, servers| Ok(servers[0].clone()));
//!
//! // Done configuring; share it
//! let router = Arc::new(router);
//! let server = router.route(RpcKind::Sys, "room", None, &Route::decode("room.room.join")?)?;
//! ```

mod config;
mod discovery;
mod error;
mod router;
mod strategy;

// Re-exports: Error types
pub use error::{Result, RouterError};

// Re-exports: Configuration
pub use config::{parse_strategies, RouterConfig, ENV_RNG_SEED, ENV_STRATEGIES};

// Re-exports: Service discovery
pub use discovery::{DiscoveryListener, ServiceDiscovery, StaticServiceDiscovery};

// Re-exports: Strategy traits and implementations
pub use strategy::{
    BuiltinStrategy, FnStrategy, LoadBalancingStrategy, RandomStrategy, RoundRobinStrategy,
    RoutingStrategy, SessionAffinityStrategy,
};

// Re-exports: Router
pub use router::Router;
