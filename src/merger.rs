/*!
Merger (§4.6): combines a donor [`Log`] into a receiver, resolving type-ID
collisions, de-duplicating descriptor tables, and aligning timestamps.

Two Open Questions from spec.md §9 are resolved here (and recorded in
DESIGN.md):
- `drop_tables` removes entries from the **donor's** FMT table, not the
  receiver's (the collision loop iterates the donor's descriptors, so
  dropping from the receiver would have no merge-time effect).
- the drop is actually applied — donor tables named in `drop_tables` never
  appear in the merged receiver, unlike the reference Python where the
  computed drop result was never assigned back.
*/
use crate::format::{FMTU_NAME, FMT_NAME, MULT_NAME, UNIT_NAME};
use crate::idpool::IdPool;
use crate::table::{Log, Table};

const DESCRIPTOR_TABLES: [&str; 4] = [FMT_NAME, FMTU_NAME, UNIT_NAME, MULT_NAME];
const DEDUP_TABLES: [(&str, &str); 3] = [(UNIT_NAME, "Id"), (MULT_NAME, "Id"), (FMTU_NAME, "FmtType")];

/// Merge `donor` into `receiver` in place. `donor` must not be used
/// afterwards (ownership is taken by value, so the type system enforces
/// this for free).
pub fn merge(
    receiver: &mut Log,
    mut donor: Log,
    drop_tables: &[String],
    time_shift_secs: f64,
    gps_time_shift: bool,
) {
    for name in drop_tables {
        donor.formats.retain(|_, fmt| &fmt.name != name);
        donor.tables.remove(name);
    }

    resolve_collisions(receiver, &mut donor, drop_tables);
    drop_duplicate_descriptors_by_name(receiver, &mut donor);

    for (table_name, key_field) in DEDUP_TABLES {
        dedup_append(receiver, &donor, table_name, key_field);
    }

    let effective_shift = effective_time_shift(receiver, &donor, time_shift_secs, gps_time_shift);
    apply_shift(receiver, &mut donor, effective_shift);

    transfer_tables(receiver, donor, drop_tables);
}

fn resolve_collisions(receiver: &mut Log, donor: &mut Log, drop_tables: &[String]) {
    let mut available = IdPool::available_excluding(receiver.formats.keys().copied());
    let donor_ids: Vec<u8> = donor.formats.keys().copied().collect();

    for type_num in donor_ids {
        let name = donor.formats[&type_num].name.clone();
        if drop_tables.iter().any(|d| d == &name) || DESCRIPTOR_TABLES.contains(&name.as_str()) {
            continue;
        }
        if available.contains(type_num) {
            available.remove(type_num);
            continue;
        }

        let new_id = available.pop().or_else(|| free_a_droppable_id(receiver));
        match new_id {
            Some(new_id) => {
                log::info!("renumbering donor message {name} from type {type_num} to {new_id}");
                let mut fmt = donor.formats.remove(&type_num).unwrap();
                fmt.id = new_id;
                donor.formats.insert(new_id, fmt);
            }
            None => {
                log::warn!("out of type-id space: dropping donor message {name}:{type_num}");
                donor.formats.remove(&type_num);
                donor.tables.remove(&name);
            }
        }
    }
}

/// Drop the next droppable table off the receiver's list, freeing its type-ID.
fn free_a_droppable_id(receiver: &mut Log) -> Option<u8> {
    while !receiver.droppable_tables.is_empty() {
        let victim = receiver.droppable_tables.remove(0);
        let freed_id = receiver
            .formats
            .iter()
            .find(|(_, fmt)| fmt.name == victim)
            .map(|(id, _)| *id);
        if let Some(id) = freed_id {
            log::info!("dropping receiver table {victim} to free type-id {id}");
            receiver.formats.remove(&id);
            receiver.tables.remove(&victim);
            return Some(id);
        }
    }
    None
}

fn dedup_append(receiver: &mut Log, donor: &Log, table_name: &str, key_field: &str) {
    let donor_table = donor.tables.get(table_name);
    if donor_table.is_none() {
        return;
    }
    let donor_table = donor_table.unwrap();

    let combined_columns = receiver
        .tables
        .get(table_name)
        .map(|t| t.columns.clone())
        .unwrap_or_else(|| donor_table.columns.clone());

    let mut seen = std::collections::HashSet::new();
    let mut rows = Vec::new();
    let key_idx = combined_columns.iter().position(|c| c == key_field);

    let receiver_rows = receiver
        .tables
        .get(table_name)
        .map(|t| t.rows.clone())
        .unwrap_or_default();
    for row in receiver_rows.into_iter().chain(donor_table.rows.clone()) {
        let key = key_idx.and_then(|i| row.0.get(i)).map(|v| v.to_string());
        match key {
            Some(k) if !seen.insert(k) => continue,
            _ => {}
        }
        rows.push(row);
    }

    receiver.tables.insert(
        table_name.to_string(),
        Table {
            columns: combined_columns,
            rows,
        },
    );
}

/// FMT itself is conceptually one of the four dedup-by-key tables (§4.6 step
/// 3: "concatenate R.FMT and D.FMT, drop duplicates by Name, first
/// occurrence wins"), but this crate keeps the format registry as
/// `Log::formats` (keyed by id) rather than a literal `Table`. Applied here
/// as: drop any donor descriptor (after collision renumbering) whose `Name`
/// already exists in the receiver, so the receiver's own entry — always
/// "first" in the concat order — is the one that survives. This must run
/// before [`transfer_tables`]: a message type already present in both logs
/// under the same type-id (e.g. `GPS` in both R and D) gets renumbered as a
/// collision in step 2, then deduped back out here by name.
fn drop_duplicate_descriptors_by_name(receiver: &Log, donor: &mut Log) {
    let existing: std::collections::HashSet<String> =
        receiver.formats.values().map(|f| f.name.clone()).collect();
    let dup_ids: Vec<u8> = donor
        .formats
        .iter()
        .filter(|(_, fmt)| existing.contains(&fmt.name))
        .map(|(id, _)| *id)
        .collect();
    for id in dup_ids {
        if let Some(fmt) = donor.formats.remove(&id) {
            log::info!("dropping duplicate donor descriptor {} (type {id}); receiver already has one", fmt.name);
        }
    }
}

fn effective_time_shift(receiver: &mut Log, donor: &Log, time_shift_secs: f64, gps_time_shift: bool) -> f64 {
    if !gps_time_shift {
        receiver.gps_zero_time = donor.gps_zero_time;
        return time_shift_secs;
    }
    let delta = match (receiver.gps_zero_time, donor.gps_zero_time) {
        (Some(r), Some(d)) => (r - d).num_microseconds().unwrap_or(0) as f64 / 1e6,
        _ => {
            log::warn!("gps_time_shift requested but one log has no GPS epoch; using 0 offset");
            0.0
        }
    };
    if time_shift_secs > 0.0 {
        time_shift_secs - delta
    } else {
        delta
    }
}

fn apply_shift(receiver: &mut Log, donor: &mut Log, effective_shift_secs: f64) {
    if effective_shift_secs == 0.0 {
        return;
    }
    let micros = (effective_shift_secs.abs() * 1_000_000.0).round() as u64;
    let target = if effective_shift_secs > 0.0 { donor } else { receiver };
    for (name, table) in target.tables.iter_mut() {
        if DESCRIPTOR_TABLES.contains(&name.as_str()) {
            continue;
        }
        let Some(idx) = table.time_us_index() else {
            continue;
        };
        for row in table.rows.iter_mut() {
            if let Some(t) = row.0[idx].as_u64() {
                row.0[idx] = crate::value::Value::U64(t.wrapping_add(micros));
            }
        }
    }
}

fn transfer_tables(receiver: &mut Log, donor: Log, drop_tables: &[String]) {
    for (id, fmt) in donor.formats {
        if DESCRIPTOR_TABLES.contains(&fmt.name.as_str()) {
            continue;
        }
        receiver.formats.entry(id).or_insert(fmt);
    }

    for (name, table) in donor.tables {
        if DESCRIPTOR_TABLES.contains(&name.as_str()) || drop_tables.contains(&name) {
            continue;
        }
        if receiver.tables.contains_key(&name) {
            log::warn!("table name collision on {name} survived renumbering; receiver wins");
            continue;
        }
        receiver.tables.insert(name, table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::MessageFormat;
    use crate::table::Row;
    use crate::value::Value;

    fn simple_log(id: u8, name: &str, time_us: u64) -> Log {
        let mut log = Log::new();
        let fmt = MessageFormat::new(id, name.into(), 11, "Q", vec!["TimeUS".into()]).unwrap();
        log.formats.insert(id, fmt);
        log.table_mut(name, &["TimeUS".to_string()])
            .rows
            .push(Row(vec![Value::U64(time_us)]));
        log
    }

    #[test]
    fn merging_empty_donor_is_idempotent() {
        let mut r = simple_log(129, "GPS", 100);
        let before = r.tables.get("GPS").unwrap().rows.clone();
        merge(&mut r, Log::new(), &[], 0.0, false);
        assert_eq!(r.tables.get("GPS").unwrap().rows, before);
    }

    /// Property 4 (second half): merging R with a copy of itself, with no
    /// drops and no time shift, leaves the receiver's own rows untouched —
    /// the donor's colliding descriptor maps back onto the receiver's own
    /// type-ID since every id the donor needs is already taken by R itself.
    #[test]
    fn merging_with_a_copy_of_self_is_a_no_op_on_receiver_rows() {
        let mut r = simple_log(129, "GPS", 100);
        let d = simple_log(129, "GPS", 100);
        let before = r.tables.get("GPS").unwrap().rows.clone();

        merge(&mut r, d, &[], 0.0, false);

        assert_eq!(r.tables.get("GPS").unwrap().rows, before);
        assert_eq!(r.formats.len(), 1);
    }

    #[test]
    fn s3_non_colliding_types_all_present_renumbered_on_collision() {
        let mut r = Log::new();
        r.formats.insert(129, MessageFormat::new(129, "GPS".into(), 11, "Q", vec!["TimeUS".into()]).unwrap());
        r.formats.insert(130, MessageFormat::new(130, "BAT".into(), 11, "Q", vec!["TimeUS".into()]).unwrap());
        r.table_mut("GPS", &["TimeUS".to_string()]);
        r.table_mut("BAT", &["TimeUS".to_string()]);

        let mut d = Log::new();
        d.formats.insert(130, MessageFormat::new(130, "IMU".into(), 11, "Q", vec!["TimeUS".into()]).unwrap());
        d.formats.insert(131, MessageFormat::new(131, "MAG".into(), 11, "Q", vec!["TimeUS".into()]).unwrap());
        d.table_mut("IMU", &["TimeUS".to_string()]);
        d.table_mut("MAG", &["TimeUS".to_string()]);

        merge(&mut r, d, &[], 0.0, false);

        assert!(r.tables.contains_key("GPS"));
        assert!(r.tables.contains_key("BAT"));
        assert!(r.tables.contains_key("IMU"));
        assert!(r.tables.contains_key("MAG"));

        let imu_id = *r.formats.iter().find(|(_, f)| f.name == "IMU").unwrap().0;
        assert!(![128, 129, 130, 131].contains(&imu_id));
    }

    #[test]
    fn drop_tables_removes_donor_entries_before_merge() {
        let mut r = Log::new();
        let mut d = simple_log(130, "NOISY", 5);
        d.table_mut("NOISY", &["TimeUS".to_string()]);

        merge(&mut r, d, &["NOISY".to_string()], 0.0, false);
        assert!(!r.tables.contains_key("NOISY"));
    }

    #[test]
    fn type_id_exhaustion_falls_back_to_droppable_table() {
        let mut r = Log::new();
        for id in 0u8..=255 {
            let name = format!("T{id}");
            r.formats.insert(id, MessageFormat::new(id, name.clone(), 11, "Q", vec!["TimeUS".into()]).unwrap());
            r.table_mut(&name, &["TimeUS".to_string()]);
        }
        r.droppable_tables.push("T0".to_string());

        let mut d = Log::new();
        d.formats.insert(200, MessageFormat::new(200, "NEW".into(), 11, "Q", vec!["TimeUS".into()]).unwrap());
        d.table_mut("NEW", &["TimeUS".to_string()]);

        merge(&mut r, d, &[], 0.0, false);

        assert!(!r.tables.contains_key("T0"));
        assert!(r.tables.contains_key("NEW"));
    }
}
