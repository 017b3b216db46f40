//! End-to-end coverage for the parse -> merge -> serialize pipeline, beyond
//! what the per-module unit tests exercise in isolation.
use chrono::{TimeZone, Utc};

use dflog::format::MessageFormat;
use dflog::table::{Log, Row};
use dflog::value::Value;
use dflog::{merger, serializer, text};

fn fmt_table(log: &mut Log, id: u8, name: &str, codes: &str, columns: &[&str], rows: Vec<Vec<Value>>) {
    let cols: Vec<String> = columns.iter().map(|s| s.to_string()).collect();
    log.formats
        .insert(id, MessageFormat::new(id, name.to_string(), 11, codes, cols.clone()).unwrap());
    let table = log.table_mut(name, &cols);
    for row in rows {
        table.rows.push(Row(row));
    }
}

/// S5: GPS-aligned merge shifts the donor's TimeUS by the 3-second gap
/// between the two logs' GPS epochs.
#[test]
fn s5_gps_aligned_merge_shifts_donor_time() {
    let mut receiver = Log::new();
    receiver.gps_zero_time = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    fmt_table(
        &mut receiver,
        129,
        "GPS",
        "Q",
        &["TimeUS"],
        vec![vec![Value::U64(0)]],
    );

    let mut donor = Log::new();
    donor.gps_zero_time = Some(Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 57).unwrap());
    fmt_table(
        &mut donor,
        130,
        "BAT",
        "Q",
        &["TimeUS"],
        vec![vec![Value::U64(1_000_000)]],
    );

    merger::merge(&mut receiver, donor, &[], 0.0, true);

    let bat = receiver.tables.get("BAT").expect("BAT table transferred");
    let time_us = bat.rows[0].0[0].as_u64().unwrap();
    // shifted by 3s = 3_000_000us on top of the original 1_000_000us
    assert_eq!(time_us, 4_000_000);
}

/// Property 5: after a merge every surviving descriptor keeps a unique type-ID.
#[test]
fn type_ids_are_unique_after_merge() {
    let mut receiver = Log::new();
    fmt_table(&mut receiver, 129, "GPS", "Q", &["TimeUS"], vec![]);
    fmt_table(&mut receiver, 130, "BAT", "Q", &["TimeUS"], vec![]);

    let mut donor = Log::new();
    fmt_table(&mut donor, 130, "IMU", "Q", &["TimeUS"], vec![]);
    fmt_table(&mut donor, 131, "MAG", "Q", &["TimeUS"], vec![]);

    merger::merge(&mut receiver, donor, &[], 0.0, false);

    let mut ids: Vec<u8> = receiver.formats.keys().copied().collect();
    let before_dedup = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), before_dedup);
    assert_eq!(ids.len(), receiver.formats.len());
}

/// Property 3: a text log's rows survive a parse/serialize round trip and
/// the serializer's output is sorted strictly non-decreasing by TimeUS.
#[test]
fn text_round_trip_is_sorted_and_lossless() {
    let input = "FMT, 128, 89, FMT, BBnNZ, Type,Length,Name,Format,Columns\n\
                 FMT, 130, 15, TEST, Qf, TimeUS,V\n\
                 TEST, 3000, 3.0\n\
                 TEST, 1000, 1.0\n\
                 TEST, 2000, 2.0\n";

    let log = text::parse_text_log(input.as_bytes()).unwrap();
    let rendered = serializer::render(&log);

    let data_lines: Vec<&str> = rendered.lines().filter(|l| !l.starts_with("FMT,")).collect();
    assert_eq!(data_lines.len(), 3);

    let times: Vec<u64> = data_lines
        .iter()
        .map(|l| l.split(", ").nth(1).unwrap().parse().unwrap())
        .collect();
    assert_eq!(times, vec![1000, 2000, 3000]);
}
