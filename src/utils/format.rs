//! Duration formatting helpers

/// Split a number of seconds into `(hours, minutes, seconds)`
pub fn split_hms(total_seconds: u64) -> (u64, u64, u64) {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    (hours, minutes, seconds)
}

/// Format seconds as "HH:MM:SS"
pub fn format_hms(total_seconds: u64) -> String {
    let (h, m, s) = split_hms(total_seconds);
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Format a process uptime compactly, e.g. "1h 2m 3s", "4m 5s" or "6s"
pub fn format_uptime(total_seconds: u64) -> String {
    let (hours, minutes, seconds) = split_hms(total_seconds);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
