pub mod bench;
pub mod config;
pub mod fetch;
pub mod providers;

// Re-export main components for easier use
pub use bench::{measure, Benchmark, TimedRun};
pub use config::BenchConfig;
pub use providers::errors::DetectError;
