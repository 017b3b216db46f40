/*!
GPS-week-to-UTC conversion. Spec.md §1 calls this out as an external pure
collaborator the engine calls with `(week, seconds)` and gets back a UTC
instant; it's not respecified in detail there. This module ships a minimal,
leap-second-naive default so the crate is self-contained, but keeps the
seam: [`Log::post_process`](crate::table::Log::post_process) depends only on
this free function's signature, so an embedder who needs a leap-second
table can swap it without touching the merge/align/serialize logic.
*/
use chrono::{DateTime, Duration, TimeZone, Utc};

/// GPS epoch: 1980-01-06T00:00:00Z.
fn gps_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1980, 1, 6, 0, 0, 0).unwrap()
}

/// Converts a GPS week number and milliseconds-of-week into a UTC instant.
/// Does not apply a leap-second correction (GPS time and UTC have drifted
/// by a whole number of leap seconds since 1980; callers needing
/// second-accurate UTC should apply that offset themselves).
pub fn gps_week_ms_to_utc(week: u32, ms_of_week: u32) -> DateTime<Utc> {
    gps_epoch() + Duration::weeks(week as i64) + Duration::milliseconds(ms_of_week as i64)
}
