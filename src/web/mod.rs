//! HTTP interface: start, stream, stop and poll scan sessions.

mod api;
mod error;
mod handlers;
mod server;

pub use api::{ErrorResponse, StartRequest, StartResponse, StopResponse};
pub use error::{ApiError, ServerError};
pub use handlers::{to_sse_event, AppState};
pub use server::ScanServer;
