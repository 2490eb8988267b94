//! HTTP surface: routes, handlers, shared state, and the response envelope.

pub mod response;
pub mod routes;
pub mod state;

pub use response::ApiResponse;
pub use routes::{create_router, DEFAULT_BODY_LIMIT};
pub use state::AppState;
