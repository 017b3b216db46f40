/*!
Time Aligner (§4.7): computes the inter-log shift, in seconds, from matching
current-draw spikes on designated channels.
*/
use crate::table::Log;

const DEFAULT_BGU_CURRENT: f64 = 18.0;
const RECEIVER_CURRENT_THRESHOLD: f64 = 18.0;
const RCOU_FALLBACK_THRESHOLD: f64 = 1500.0;
const IPS_FALLBACK_THRESHOLD: f64 = 600.0;

/// Returns the shift in seconds such that `receiver.TimeUS - donor.TimeUS`
/// equals that shift at the matching current-draw event. Returns 0 and logs
/// if either signal is missing or no row crosses the threshold.
pub fn find_offset(receiver: &Log, donor: &Log) -> f64 {
    find_offset_with_threshold(receiver, donor, DEFAULT_BGU_CURRENT)
}

pub fn find_offset_with_threshold(receiver: &Log, donor: &Log, bgu_current: f64) -> f64 {
    let donor_event = first_at_or_above(donor, "BGU1", "CurrAll", bgu_current)
        .or_else(|| first_above(donor, "IPS", "mA", IPS_FALLBACK_THRESHOLD));
    let Some((donor_time, _)) = donor_event else {
        log::warn!("could not autodetect offset: donor has no BGU1/IPS current spike");
        return 0.0;
    };

    let receiver_event = first_at_or_above(receiver, "BAT", "Curr", RECEIVER_CURRENT_THRESHOLD)
        .or_else(|| first_above(receiver, "RCOU", "C1", RCOU_FALLBACK_THRESHOLD));
    let Some((receiver_time, _)) = receiver_event else {
        log::warn!("could not autodetect offset: receiver has no BAT/RCOU current spike");
        return 0.0;
    };

    (receiver_time as f64 - donor_time as f64) / 1_000_000.0
}

/// First row in `table_name` whose `column` value is `>= threshold`, paired
/// with its `TimeUS`.
fn first_at_or_above(log: &Log, table_name: &str, column: &str, threshold: f64) -> Option<(u64, f64)> {
    first_matching(log, table_name, column, |value| value >= threshold)
}

/// First row in `table_name` whose `column` value is strictly `> threshold`,
/// paired with its `TimeUS` — the `RCOU`/`IPS` fallback checks are strict
/// per spec.md §4.7, unlike the primary `BAT`/`BGU1` checks.
fn first_above(log: &Log, table_name: &str, column: &str, threshold: f64) -> Option<(u64, f64)> {
    first_matching(log, table_name, column, |value| value > threshold)
}

fn first_matching(
    log: &Log,
    table_name: &str,
    column: &str,
    matches: impl Fn(f64) -> bool,
) -> Option<(u64, f64)> {
    let table = log.tables.get(table_name)?;
    let time_idx = table.time_us_index()?;
    let col_idx = table.columns.iter().position(|c| c == column)?;
    table.rows.iter().find_map(|row| {
        let value = row.0.get(col_idx)?.as_f64()?;
        if matches(value) {
            let time_us = row.0.get(time_idx)?.as_u64()?;
            Some((time_us, value))
        } else {
            None
        }
    })
}
