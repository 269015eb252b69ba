use std::time::Duration;

/// Format an uptime as "Xd Yh Zm"
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    format!("{}d {}h {}m", days, hours, minutes)
}

/// Format an optional percentage with no decimals, or "N/A"
pub fn format_percent(value: Option<f32>) -> String {
    match value {
        Some(v) => format!("{:.0}%", v),
        None => "N/A".to_string(),
    }
}

/// Format a megabyte count with one decimal
pub fn format_mb(mb: f64) -> String {
    format!("{:.1} MB", mb)
}
