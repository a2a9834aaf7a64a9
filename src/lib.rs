pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod notify;
pub mod poller;
pub mod scheduler;
pub mod sites;

// Re-export commonly used types
pub use cache::DedupCache;
pub use config::AppConfig;
pub use error::{AppError, Result};
pub use sites::SiteDescriptor;
