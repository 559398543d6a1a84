//! Inbound HTTP server module
//!
//! Serves every request through the edge handler, plus health and metrics
//! routes under `/_edge`.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use routes::create_router;
pub use server::EdgeServer;
