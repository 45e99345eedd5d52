use chrono::{DateTime, Duration, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole seconds between two instants, zero if `to` precedes `from`.
pub fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    u32::try_from((to - from).num_seconds().max(0)).unwrap_or(u32::MAX)
}

/// Anything last touched before the returned instant counts as idle.
pub fn idle_cutoff(now: DateTime<Utc>, idle_minutes: i64) -> DateTime<Utc> {
    now - Duration::minutes(idle_minutes.max(0))
}
