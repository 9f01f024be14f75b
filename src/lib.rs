pub mod capability;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{RunOutcome, RunStatus, launch, resume};
