//! REST API over the spam manager

pub mod handlers;
pub mod history;
pub mod metrics;
pub mod server;

pub use handlers::AppState;
pub use history::{History, HistoryEntry};
pub use metrics::Metrics;
pub use server::ApiServer;
