//! Router - picks the server that receives an RPC

use courier_types::{Route, RpcKind, Server, Session};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::RouterConfig;
use crate::discovery::ServiceDiscovery;
use crate::error::{Result, RouterError};
use crate::strategy::{derive_seed, FnStrategy, RandomStrategy, RoutingStrategy};

/// Selects a target server for every outgoing RPC.
///
/// Holds one optional `RoutingStrategy` per server type and falls back to
/// uniform random selection. Registration takes `&mut self` and routing takes
/// `&self`: configure the router first, then share it (e.g. in an `Arc`).
/// Once shared, the strategy table can no longer change, so the routing path
/// takes no locks.
pub struct Router {
    service_discovery: Option<Arc<dyn ServiceDiscovery>>,

    /// Server type -> custom strategy
    routes: HashMap<String, Box<dyn RoutingStrategy>>,

    default_strategy: RandomStrategy,
}

impl Router {
    /// Create a router with no strategies and no service discovery
    pub fn new() -> Self {
        Self {
            service_discovery: None,
            routes: HashMap::new(),
            default_strategy: RandomStrategy::new(),
        }
    }

    /// Create a router from configuration, registering the configured
    /// built-in strategies.
    ///
    /// With a seed, each configured strategy draws from its own generator
    /// seeded from the config seed and its server type, so no two share a
    /// sequence with the default policy.
    pub fn with_config(config: &RouterConfig) -> Self {
        let mut router = Self::new();
        if let Some(seed) = config.rng_seed {
            router.default_strategy = RandomStrategy::with_seed(seed);
        }

        for (server_type, strategy) in &config.strategies {
            debug!(
                server_type = %server_type,
                strategy = %strategy,
                "Registering configured route"
            );
            let seed = config.rng_seed.map(|seed| derive_seed(seed, server_type));
            router.add_route(server_type.clone(), strategy.build(seed));
        }

        router
    }

    /// Bind the service discovery used by subsequent `route` calls
    pub fn set_service_discovery(&mut self, service_discovery: Arc<dyn ServiceDiscovery>) {
        self.service_discovery = Some(service_discovery);
    }

    /// Drop the bound service discovery; `route` fails until a new one is set
    pub fn unset_service_discovery(&mut self) {
        self.service_discovery = None;
    }

    /// Register the strategy for a server type, replacing any previous one
    pub fn add_route<S>(&mut self, server_type: impl Into<String>, strategy: S)
    where
        S: RoutingStrategy + 'static,
    {
        let server_type = server_type.into();
        if self.routes.contains_key(&server_type) {
            warn!(server_type = %server_type, "Overriding the route to server type");
        }
        self.routes.insert(server_type, Box::new(strategy));
    }

    /// Register a routing function for a server type
    pub fn add_route_fn<F>(&mut self, server_type: impl Into<String>, routing_fn: F)
    where
        F: Fn(Option<&Session>, &Route, &[Arc<Server>]) -> Result<Arc<Server>>
            + Send
            + Sync
            + 'static,
    {
        self.add_route(server_type, FnStrategy::new(routing_fn));
    }

    /// Whether a custom strategy is registered for a server type
    pub fn has_route(&self, server_type: &str) -> bool {
        self.routes.contains_key(server_type)
    }

    /// Number of server types with a custom strategy
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Pick the server that should receive a call.
    ///
    /// User RPCs always go through the default random policy. Other RPCs use
    /// the strategy registered for `server_type` if there is one; its result,
    /// error included, is returned unchanged.
    pub fn route(
        &self,
        rpc_kind: RpcKind,
        server_type: &str,
        session: Option<&Session>,
        route: &Route,
    ) -> Result<Arc<Server>> {
        let service_discovery = self
            .service_discovery
            .as_ref()
            .ok_or(RouterError::ServiceDiscoveryNotInitialized)?;

        let servers = service_discovery.get_servers_by_type(server_type)?;
        if servers.is_empty() {
            return Err(RouterError::NoServersAvailable(server_type.to_string()));
        }

        if rpc_kind == RpcKind::User {
            return self.default_route(server_type, &servers);
        }

        let Some(strategy) = self.routes.get(server_type) else {
            debug!(
                server_type = %server_type,
                "No specific route for server type, using default route"
            );
            return self.default_route(server_type, &servers);
        };

        let selected = strategy.select(session, route, &servers)?;
        trace!(
            rpc_kind = %rpc_kind,
            route = %route,
            server = %selected.address(),
            "Routed with custom strategy"
        );
        Ok(selected)
    }

    fn default_route(&self, server_type: &str, servers: &[Arc<Server>]) -> Result<Arc<Server>> {
        let selected = self
            .default_strategy
            .pick(servers)
            .ok_or_else(|| RouterError::NoServersAvailable(server_type.to_string()))?;
        trace!(server = %selected.address(), "Routed with default strategy");
        Ok(selected)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut route_types: Vec<&String> = self.routes.keys().collect();
        route_types.sort();

        f.debug_struct("Router")
            .field("service_discovery", &self.service_discovery.is_some())
            .field("routes", &route_types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::StaticServiceDiscovery;
    use crate::strategy::LoadBalancingStrategy;

    fn discovery() -> Arc<StaticServiceDiscovery> {
        Arc::new(StaticServiceDiscovery::with_servers(vec![
            Server::new("room-a", "room", false),
            Server::new("room-b", "room", false),
        ]))
    }

    fn route() -> Route {
        Route::new("room", "room", "join")
    }

    #[test]
    fn test_new_router_is_empty() {
        let router = Router::new();
        assert_eq!(router.route_count(), 0);
        assert!(!router.has_route("room"));
    }

    #[test]
    fn test_route_without_discovery() {
        let router = Router::new();
        let result = router.route(RpcKind::Sys, "room", None, &route());

        assert_eq!(
            result.unwrap_err(),
            RouterError::ServiceDiscoveryNotInitialized
        );
    }

    #[test]
    fn test_unset_discovery() {
        let mut router = Router::new();
        router.set_service_discovery(discovery());
        assert!(router.route(RpcKind::Sys, "room", None, &route()).is_ok());

        router.unset_service_discovery();
        assert_eq!(
            router.route(RpcKind::Sys, "room", None, &route()).unwrap_err(),
            RouterError::ServiceDiscoveryNotInitialized
        );
    }

    #[test]
    fn test_add_route_override() {
        let mut router = Router::new();
        router.add_route("room", LoadBalancingStrategy::Random.build(None));
        router.add_route_fn("room", |_, _, servers| Ok(servers[0].clone()));

        assert_eq!(router.route_count(), 1);
        assert!(router.has_route("room"));
    }

    #[test]
    fn test_with_config_registers_strategies() {
        let config = RouterConfig::default()
            .with_seed(3)
            .with_strategy("room", LoadBalancingStrategy::RoundRobin);
        let mut router = Router::with_config(&config);
        router.set_service_discovery(discovery());

        assert!(router.has_route("room"));
        let picks: Vec<String> = (0..4)
            .map(|_| {
                router
                    .route(RpcKind::Sys, "room", None, &route())
                    .unwrap()
                    .id
                    .clone()
            })
            .collect();
        assert_eq!(picks, vec!["room-a", "room-b", "room-a", "room-b"]);
    }

    #[test]
    fn test_with_config_seeds_strategies_independently() {
        let discovery = StaticServiceDiscovery::new();
        for i in 0..5 {
            discovery.register(Server::new(format!("room-{}", i), "room", false));
            discovery.register(Server::new(format!("chat-{}", i), "chat", false));
        }
        let config = RouterConfig::default()
            .with_seed(42)
            .with_strategy("room", LoadBalancingStrategy::Random);
        let mut router = Router::with_config(&config);
        router.set_service_discovery(Arc::new(discovery));

        let picks = |server_type: &str| -> Vec<String> {
            (0..32)
                .map(|_| {
                    let server = router
                        .route(RpcKind::Sys, server_type, None, &route())
                        .unwrap();
                    server.id.trim_start_matches(server_type).to_string()
                })
                .collect()
        };

        // "room" uses its configured strategy, "chat" the default policy
        assert_ne!(picks("room"), picks("chat"));
    }

    #[test]
    fn test_with_config_is_reproducible() {
        let config = RouterConfig::default()
            .with_seed(9)
            .with_strategy("room", LoadBalancingStrategy::Random);

        let run = || -> Vec<String> {
            let mut router = Router::with_config(&config);
            router.set_service_discovery(discovery());
            (0..16)
                .map(|_| {
                    router
                        .route(RpcKind::Sys, "room", None, &route())
                        .unwrap()
                        .id
                        .clone()
                })
                .collect()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_debug_lists_routes() {
        let mut router = Router::new();
        router.add_route("match", LoadBalancingStrategy::RoundRobin.build(None));

        let rendered = format!("{:?}", router);
        assert!(rendered.contains("match"));
        assert!(rendered.contains("service_discovery: false"));
    }
}
