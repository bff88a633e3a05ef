//! Primary HTTP server.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → TraceLayer
//!     → request metrics (http.server.requests)
//!     → request timeout
//!     → application router
//! ```

pub mod server;

pub use server::{HttpServer, HttpServerError};
