// Command handlers module
mod monitor_config;
pub mod check;
pub mod state;
pub mod watch;

// Re-exports for cleaner imports
pub use check::execute as check;
pub use state::execute as state;
pub use watch::execute as watch;
