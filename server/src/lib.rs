pub mod auth;
pub mod devices;
pub mod ingest;
pub mod registration;
pub mod server;
pub mod store;

pub use ingest::HandlerRegistry;
pub use server::{AppState, TelemetryServer};
pub use store::DocumentStore;
