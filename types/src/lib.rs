// ========== Core Modules ==========
pub mod error;
pub mod route; // Route descriptor ([server_type.]service.method)
pub mod rpc; // RPC kind (Sys / User)
pub mod server; // Cluster server model
pub mod session; // Client session context

// Export error types
pub use error::TypesError;

// Export call-context types
pub use route::Route;
pub use rpc::RpcKind;
pub use session::Session;

// Export cluster types
pub use server::Server;
