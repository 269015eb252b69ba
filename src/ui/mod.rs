// UI and formatting module

pub mod formatters;
pub mod system_formatters;

// Re-export commonly used items for cleaner imports
pub use formatters::{format_mb, format_percent, format_uptime};
pub use system_formatters::{format_alert, print_snapshot, render_snapshot};
