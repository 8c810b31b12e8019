mod handler;
mod model;

pub use handler::{approve, list_pending, reject, request_to_join};
