//! Service discovery for resolving server types to live servers

use courier_types::Server;
use parking_lot::{ReentrantMutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, RouterError};

/// Resolves server types to the set of live servers.
///
/// The router calls `get_servers_by_type` on every dispatch and never caches
/// the result, so membership changes show up on the next call.
pub trait ServiceDiscovery: Send + Sync {
    /// Get all live servers of a type
    fn get_servers_by_type(&self, server_type: &str) -> Result<Vec<Arc<Server>>>;

    /// Get a server by ID
    fn get_server(&self, id: &str) -> Result<Arc<Server>>;

    /// Get every known server
    fn get_servers(&self) -> Vec<Arc<Server>>;

    /// Subscribe to membership changes
    fn add_listener(&self, listener: Arc<dyn DiscoveryListener>);
}

/// Receives membership changes from a `ServiceDiscovery`
pub trait DiscoveryListener: Send + Sync {
    fn add_server(&self, server: &Server);

    fn remove_server(&self, server: &Server);
}

/// In-memory service discovery.
///
/// Servers are registered and unregistered explicitly, which makes it the
/// discovery of choice for single-process deployments and tests.
///
/// Each membership change and its listener notifications happen under one
/// lock, so listeners see changes in the order they were applied. Callbacks
/// run without any lock on the server map or the listener list, and may call
/// back into the discovery from the same thread.
pub struct StaticServiceDiscovery {
    /// Map of server ID to server
    servers: RwLock<HashMap<String, Arc<Server>>>,

    listeners: RwLock<Vec<Arc<dyn DiscoveryListener>>>,

    /// Serializes a mutation together with its notifications
    membership: ReentrantMutex<()>,
}

impl StaticServiceDiscovery {
    /// Create an empty discovery
    pub fn new() -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
            membership: ReentrantMutex::new(()),
        }
    }

    fn listeners_snapshot(&self) -> Vec<Arc<dyn DiscoveryListener>> {
        self.listeners.read().clone()
    }

    /// Create a discovery pre-populated with servers
    pub fn with_servers(servers: impl IntoIterator<Item = Server>) -> Self {
        let discovery = Self::new();
        for server in servers {
            discovery.register(server);
        }
        discovery
    }

    /// Register a server, replacing any server with the same ID
    pub fn register(&self, server: Server) -> Arc<Server> {
        info!(
            server_id = %server.id,
            server_type = %server.server_type,
            frontend = server.frontend,
            "Registering server"
        );

        let server = Arc::new(server);
        let _membership = self.membership.lock();
        let replaced = self
            .servers
            .write()
            .insert(server.id.clone(), server.clone());

        let listeners = self.listeners_snapshot();
        if let Some(old) = replaced {
            for listener in listeners.iter() {
                listener.remove_server(&old);
            }
        }
        for listener in listeners.iter() {
            listener.add_server(&server);
        }

        server
    }

    /// Unregister a server
    pub fn unregister(&self, id: &str) -> Option<Arc<Server>> {
        let _membership = self.membership.lock();
        let removed = self.servers.write().remove(id);

        match &removed {
            Some(server) => {
                info!(
                    server_id = %id,
                    server_type = %server.server_type,
                    "Unregistering server"
                );
                for listener in self.listeners_snapshot() {
                    listener.remove_server(server);
                }
            }
            None => debug!(server_id = %id, "Unregister of unknown server"),
        }

        removed
    }

    /// Get total server count
    pub fn count(&self) -> usize {
        self.servers.read().len()
    }

    /// Get server count for one type
    pub fn count_by_type(&self, server_type: &str) -> usize {
        self.servers
            .read()
            .values()
            .filter(|s| s.server_type == server_type)
            .count()
    }
}

impl Default for StaticServiceDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceDiscovery for StaticServiceDiscovery {
    fn get_servers_by_type(&self, server_type: &str) -> Result<Vec<Arc<Server>>> {
        let servers = self.servers.read();
        let mut of_type: Vec<Arc<Server>> = servers
            .values()
            .filter(|s| s.server_type == server_type)
            .cloned()
            .collect();

        if of_type.is_empty() {
            return Err(RouterError::NoServersAvailable(server_type.to_string()));
        }

        // HashMap order is arbitrary; keep results stable across calls
        of_type.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(of_type)
    }

    fn get_server(&self, id: &str) -> Result<Arc<Server>> {
        self.servers
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RouterError::ServerNotFound(id.to_string()))
    }

    fn get_servers(&self) -> Vec<Arc<Server>> {
        self.servers.read().values().cloned().collect()
    }

    fn add_listener(&self, listener: Arc<dyn DiscoveryListener>) {
        self.listeners.write().push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::thread;

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<String>>,
    }

    impl DiscoveryListener for RecordingListener {
        fn add_server(&self, server: &Server) {
            self.events.lock().push(format!("add:{}", server.id));
        }

        fn remove_server(&self, server: &Server) {
            self.events.lock().push(format!("remove:{}", server.id));
        }
    }

    #[test]
    fn test_register_server() {
        let discovery = StaticServiceDiscovery::new();
        discovery.register(Server::new("room-1", "room", false));
        discovery.register(Server::new("match-1", "match", false));

        assert_eq!(discovery.count(), 2);
        assert_eq!(discovery.count_by_type("room"), 1);
    }

    #[test]
    fn test_get_servers_by_type_sorted() {
        let discovery = StaticServiceDiscovery::with_servers(vec![
            Server::new("room-c", "room", false),
            Server::new("room-a", "room", false),
            Server::new("match-1", "match", false),
            Server::new("room-b", "room", false),
        ]);

        let ids: Vec<String> = discovery
            .get_servers_by_type("room")
            .unwrap()
            .iter()
            .map(|s| s.id.clone())
            .collect();
        assert_eq!(ids, vec!["room-a", "room-b", "room-c"]);
    }

    #[test]
    fn test_unknown_type() {
        let discovery = StaticServiceDiscovery::new();
        let result = discovery.get_servers_by_type("chat");

        assert_eq!(
            result.unwrap_err(),
            RouterError::NoServersAvailable("chat".to_string())
        );
    }

    #[test]
    fn test_get_server() {
        let discovery = StaticServiceDiscovery::new();
        discovery.register(Server::new("room-1", "room", false));

        assert_eq!(discovery.get_server("room-1").unwrap().server_type, "room");
        assert_eq!(
            discovery.get_server("nope").unwrap_err(),
            RouterError::ServerNotFound("nope".to_string())
        );
    }

    #[test]
    fn test_unregister_server() {
        let discovery = StaticServiceDiscovery::new();
        discovery.register(Server::new("room-1", "room", false));

        assert!(discovery.unregister("room-1").is_some());
        assert!(discovery.unregister("room-1").is_none());
        assert_eq!(discovery.count(), 0);
        assert!(discovery.get_servers().is_empty());
    }

    #[test]
    fn test_listener_notified() {
        let discovery = StaticServiceDiscovery::new();
        let listener = Arc::new(RecordingListener::default());
        discovery.add_listener(listener.clone());

        discovery.register(Server::new("room-1", "room", false));
        discovery.register(Server::new("room-1", "room", true));
        discovery.unregister("room-1");

        let events = listener.events.lock().clone();
        assert_eq!(
            events,
            vec!["add:room-1", "remove:room-1", "add:room-1", "remove:room-1"]
        );
    }

    /// Mirrors membership from notifications alone
    #[derive(Default)]
    struct MirrorListener {
        live: Mutex<HashSet<String>>,
    }

    impl DiscoveryListener for MirrorListener {
        fn add_server(&self, server: &Server) {
            self.live.lock().insert(server.id.clone());
        }

        fn remove_server(&self, server: &Server) {
            self.live.lock().remove(&server.id);
        }
    }

    #[test]
    fn test_concurrent_changes_notified_in_order() {
        let discovery = Arc::new(StaticServiceDiscovery::new());
        let mirror = Arc::new(MirrorListener::default());
        discovery.add_listener(mirror.clone());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let discovery = discovery.clone();
                thread::spawn(move || {
                    for i in 0..200 {
                        let id = format!("room-{}", i % 4);
                        if (t + i) % 2 == 0 {
                            discovery.register(Server::new(id, "room", false));
                        } else {
                            discovery.unregister(&id);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let actual: HashSet<String> = discovery.get_servers().iter().map(|s| s.id.clone()).collect();
        assert_eq!(*mirror.live.lock(), actual);
    }

    /// Subscribes another listener and re-registers from inside a callback
    struct ReentrantListener {
        discovery: Arc<StaticServiceDiscovery>,
        nested: Arc<RecordingListener>,
    }

    impl DiscoveryListener for ReentrantListener {
        fn add_server(&self, server: &Server) {
            if server.id == "room-1" {
                self.discovery.add_listener(self.nested.clone());
                self.discovery.register(Server::new("room-2", "room", false));
            }
        }

        fn remove_server(&self, _server: &Server) {}
    }

    #[test]
    fn test_listener_may_call_back_into_discovery() {
        let discovery = Arc::new(StaticServiceDiscovery::new());
        let nested = Arc::new(RecordingListener::default());
        discovery.add_listener(Arc::new(ReentrantListener {
            discovery: discovery.clone(),
            nested: nested.clone(),
        }));

        discovery.register(Server::new("room-1", "room", false));

        assert_eq!(discovery.count_by_type("room"), 2);
        assert_eq!(nested.events.lock().clone(), vec!["add:room-2"]);
    }
}
