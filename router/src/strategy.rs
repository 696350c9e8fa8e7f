//! Server selection strategies

use courier_types::{Route, Server, Session};
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Result, RouterError};

/// Picks one server out of the live servers of a type.
///
/// Strategies are registered per server type and consulted only for
/// non-user RPCs. Whatever they return is handed back to the caller as is.
pub trait RoutingStrategy: Send + Sync {
    fn select(
        &self,
        session: Option<&Session>,
        route: &Route,
        servers: &[Arc<Server>],
    ) -> Result<Arc<Server>>;
}

/// Adapts a plain function or closure into a `RoutingStrategy`
pub struct FnStrategy<F>(pub F);

impl<F> FnStrategy<F>
where
    F: Fn(Option<&Session>, &Route, &[Arc<Server>]) -> Result<Arc<Server>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> RoutingStrategy for FnStrategy<F>
where
    F: Fn(Option<&Session>, &Route, &[Arc<Server>]) -> Result<Arc<Server>> + Send + Sync,
{
    fn select(
        &self,
        session: Option<&Session>,
        route: &Route,
        servers: &[Arc<Server>],
    ) -> Result<Arc<Server>> {
        (self.0)(session, route, servers)
    }
}

// Strategies only see the route, which may not name a server type
fn no_servers(route: &Route) -> RouterError {
    RouterError::EmptyCandidateSet(route.to_string())
}

/// Seed for a per-type generator, derived from the configured seed
pub(crate) fn derive_seed(seed: u64, server_type: &str) -> u64 {
    let digest = Sha256::digest(server_type.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    seed ^ u64::from_be_bytes(bytes)
}

/// Uniform random selection. This is the router's default policy.
///
/// Unseeded instances draw from the thread-local generator, which is seeded
/// from the OS. Seeded instances share one generator behind a mutex so a run
/// can be replayed.
#[derive(Debug, Default)]
pub struct RandomStrategy {
    seeded: Option<Mutex<StdRng>>,
}

impl RandomStrategy {
    pub fn new() -> Self {
        Self { seeded: None }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    fn index(&self, len: usize) -> usize {
        match &self.seeded {
            Some(rng) => rng.lock().gen_range(0..len),
            None => rand::thread_rng().gen_range(0..len),
        }
    }

    /// Pick a server, `None` if there are none
    pub fn pick(&self, servers: &[Arc<Server>]) -> Option<Arc<Server>> {
        if servers.is_empty() {
            return None;
        }
        Some(servers[self.index(servers.len())].clone())
    }
}

impl RoutingStrategy for RandomStrategy {
    fn select(
        &self,
        _session: Option<&Session>,
        route: &Route,
        servers: &[Arc<Server>],
    ) -> Result<Arc<Server>> {
        self.pick(servers).ok_or_else(|| no_servers(route))
    }
}

/// Round-robin selection
#[derive(Debug)]
pub struct RoundRobinStrategy {
    index: AtomicUsize,
}

impl RoundRobinStrategy {
    pub const fn new() -> Self {
        Self {
            index: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobinStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingStrategy for RoundRobinStrategy {
    fn select(
        &self,
        _session: Option<&Session>,
        route: &Route,
        servers: &[Arc<Server>],
    ) -> Result<Arc<Server>> {
        if servers.is_empty() {
            return Err(no_servers(route));
        }

        let idx = self.index.fetch_add(1, Ordering::Relaxed);
        Ok(servers[idx % servers.len()].clone())
    }
}

/// Sticky selection by session.
///
/// Hashes the session's user ID (or its numeric ID while unbound) onto the
/// candidates ordered by server ID, so the same session lands on the same
/// server as long as membership does not change. Calls without a session
/// fall back to random selection.
#[derive(Debug, Default)]
pub struct SessionAffinityStrategy {
    fallback: RandomStrategy,
}

impl SessionAffinityStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(fallback: RandomStrategy) -> Self {
        Self { fallback }
    }

    fn session_hash(session: &Session) -> u64 {
        let key = match session.uid() {
            Some(uid) => format!("uid:{}", uid),
            None => format!("sid:{}", session.id),
        };
        let digest = Sha256::digest(key.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(bytes)
    }
}

impl RoutingStrategy for SessionAffinityStrategy {
    fn select(
        &self,
        session: Option<&Session>,
        route: &Route,
        servers: &[Arc<Server>],
    ) -> Result<Arc<Server>> {
        if servers.is_empty() {
            return Err(no_servers(route));
        }

        let Some(session) = session else {
            return self.fallback.select(None, route, servers);
        };

        let mut ordered: Vec<&Arc<Server>> = servers.iter().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));

        let idx = (Self::session_hash(session) % ordered.len() as u64) as usize;
        Ok(ordered[idx].clone())
    }
}

/// Built-in load balancing strategy, as named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadBalancingStrategy {
    /// Uniform random selection
    Random,

    /// Round-robin selection
    RoundRobin,

    /// Same session, same server
    SessionAffinity,
}

impl LoadBalancingStrategy {
    /// Instantiate the strategy. `seed` only affects random draws.
    pub fn build(&self, seed: Option<u64>) -> BuiltinStrategy {
        let random = || match seed {
            Some(seed) => RandomStrategy::with_seed(seed),
            None => RandomStrategy::new(),
        };

        match self {
            LoadBalancingStrategy::Random => BuiltinStrategy::Random(random()),
            LoadBalancingStrategy::RoundRobin => {
                BuiltinStrategy::RoundRobin(RoundRobinStrategy::new())
            }
            LoadBalancingStrategy::SessionAffinity => BuiltinStrategy::SessionAffinity(
                SessionAffinityStrategy::with_fallback(random()),
            ),
        }
    }
}

impl FromStr for LoadBalancingStrategy {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(LoadBalancingStrategy::Random),
            "round-robin" | "round_robin" => Ok(LoadBalancingStrategy::RoundRobin),
            "session-affinity" | "session_affinity" => Ok(LoadBalancingStrategy::SessionAffinity),
            other => Err(RouterError::InvalidConfig(format!(
                "unknown load balancing strategy: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for LoadBalancingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadBalancingStrategy::Random => "random",
            LoadBalancingStrategy::RoundRobin => "round-robin",
            LoadBalancingStrategy::SessionAffinity => "session-affinity",
        };
        write!(f, "{}", name)
    }
}

/// A configured built-in strategy
#[derive(Debug)]
pub enum BuiltinStrategy {
    Random(RandomStrategy),
    RoundRobin(RoundRobinStrategy),
    SessionAffinity(SessionAffinityStrategy),
}

impl RoutingStrategy for BuiltinStrategy {
    fn select(
        &self,
        session: Option<&Session>,
        route: &Route,
        servers: &[Arc<Server>],
    ) -> Result<Arc<Server>> {
        match self {
            BuiltinStrategy::Random(s) => s.select(session, route, servers),
            BuiltinStrategy::RoundRobin(s) => s.select(session, route, servers),
            BuiltinStrategy::SessionAffinity(s) => s.select(session, route, servers),
        }
    }
}
