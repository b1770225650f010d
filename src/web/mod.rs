//! Web API module for filecab.
//!
//! A JSON REST API over the file service, plus static serving of stored
//! blobs from the local store.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::{create_app, create_router};
pub use server::WebServer;
