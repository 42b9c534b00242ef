//! API gateway: axum router, authentication and error mapping.

mod error;
pub mod routes;
pub mod state;

pub use routes::{router, serve, serve_with};
pub use state::AppState;
