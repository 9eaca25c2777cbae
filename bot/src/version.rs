use chrono::{TimeZone, Utc};

/// Build metadata embedded by build.rs
pub fn summary() -> String {
    let hash = option_env!("GIT_HASH").unwrap_or("unknown");
    let branch = option_env!("GIT_BRANCH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");

    format!(
        "v{} ({}@{}, built {})",
        env!("CARGO_PKG_VERSION"),
        branch,
        hash,
        human_time(build_time)
    )
}

/// Format epoch seconds as a UTC timestamp, passing anything else through
fn human_time(raw: &str) -> String {
    raw.parse::<i64>()
        .ok()
        .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| raw.to_string())
}
