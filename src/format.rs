//! Display formatting for paces, race times and durations.

/// Format a pace in seconds per kilometre as `m:ss /km`.
pub fn format_pace(seconds_per_km: u32) -> String {
    format!("{}:{:02} /km", seconds_per_km / 60, seconds_per_km % 60)
}

/// Format a race time in seconds as `h:mm:ss`, or `m:ss` under an hour.
pub fn format_race_time(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Format whole minutes as `45 min` or `2h 05m`.
pub fn format_duration_minutes(minutes: u32) -> String {
    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    }
}
