use chrono::{DateTime, Local, Timelike, Utc};

/// Orders placed before this local hour are delivered the same day.
pub const SAME_DAY_CUTOFF_HOUR: u32 = 16;

pub fn delivery_estimate_for_hour(local_hour: u32) -> &'static str {
    if local_hour < SAME_DAY_CUTOFF_HOUR {
        "Today by 6pm"
    } else {
        "Tomorrow by 10am"
    }
}

/// The delivery label for an order placed at `placed_at`, judged in the server's local time zone.
pub fn delivery_estimate(placed_at: DateTime<Utc>) -> &'static str {
    delivery_estimate_for_hour(placed_at.with_timezone(&Local).hour())
}
