//! HTTP adapter for merge endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, MergeRequest};
pub use handlers::{MergeHandlers, ACTING_USER_HEADER};
pub use routes::merge_routes;
