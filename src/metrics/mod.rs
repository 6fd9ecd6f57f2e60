pub mod server;

pub use server::{metrics_router, start_metrics_server};
