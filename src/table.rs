/*!
Table Store (§3, §4.5): in-memory column-oriented tables keyed by message
name, and the `Log` that owns them.
*/
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::format::{MessageFormat, FMTU_NAME, FMT_NAME, MULT_NAME, UNIT_NAME};
use crate::gps::gps_week_ms_to_utc;
use crate::value::Value;

/// One decoded row, ordered to match its table's `columns` (MSGNAME is not
/// stored per-row; it's the table's key, synthesized back on serialize).
#[derive(Debug, Clone, PartialEq)]
pub struct Row(pub Vec<Value>);

impl Row {
    pub fn get(&self, columns: &[String], name: &str) -> Option<&Value> {
        columns.iter().position(|c| c == name).map(|i| &self.0[i])
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn time_us_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c == "TimeUS")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Log {
    pub tables: BTreeMap<String, Table>,
    pub formats: BTreeMap<u8, MessageFormat>,
    pub droppable_tables: Vec<String>,
    pub gps_zero_time: Option<DateTime<Utc>>,
}

impl Log {
    pub fn new() -> Self {
        Log::default()
    }

    /// Get (creating if absent) the table for `name`, seeding its column list
    /// the first time it's touched.
    pub fn table_mut(&mut self, name: &str, columns: &[String]) -> &mut Table {
        self.tables.entry(name.to_string()).or_insert_with(|| Table {
            columns: columns.to_vec(),
            rows: Vec::new(),
        })
    }

    /// Load a droppable-tables file: one table name per line, silently
    /// ignoring names not present in this log (§4.3 of SPEC_FULL.md: a
    /// shared file is expected to list candidates across many log shapes).
    pub fn load_droppable_tables(&mut self, contents: &str) {
        for line in contents.lines() {
            let name = line.trim();
            if name.is_empty() {
                continue;
            }
            if self.tables.contains_key(name) {
                self.droppable_tables.push(name.to_string());
            }
        }
    }

    /// Post-parse fixups (§4.5): drop FMT entries for never-observed
    /// messages and compute `gps_zero_time` from the first `GPS` row.
    pub fn post_process(&mut self) {
        let observed: std::collections::BTreeSet<String> =
            self.tables.keys().cloned().collect();
        self.formats.retain(|_, fmt| observed.contains(&fmt.name));

        if let Some(gps) = self.tables.get("GPS") {
            self.gps_zero_time = compute_gps_zero(gps);
        }
    }

    /// Names of the four descriptor tables that mirror the Format Registry
    /// inside `tables` (§3).
    pub fn descriptor_table_names() -> [&'static str; 4] {
        [FMT_NAME, FMTU_NAME, UNIT_NAME, MULT_NAME]
    }
}

fn compute_gps_zero(gps: &Table) -> Option<DateTime<Utc>> {
    let gwk_idx = gps.columns.iter().position(|c| c == "GWk")?;
    let gms_idx = gps.columns.iter().position(|c| c == "GMS")?;
    let time_idx = gps.columns.iter().position(|c| c == "TimeUS")?;
    let first = gps.rows.first()?;

    let week = first.0[gwk_idx].as_u64()? as u32;
    let ms_of_week = first.0[gms_idx].as_u64()? as u32;
    let time_us_0 = first.0[time_idx].as_u64()?;

    let utc_at_gps_row = gps_week_ms_to_utc(week, ms_of_week);
    Some(utc_at_gps_row - Duration::microseconds(time_us_0 as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_process_drops_unused_format_rows() {
        let mut log = Log::new();
        let fmt = MessageFormat::new(130, "GHOST".into(), 15, "Qf", vec!["TimeUS".into(), "V".into()]).unwrap();
        log.formats.insert(130, fmt);
        log.post_process();
        assert!(log.formats.is_empty());
    }

    #[test]
    fn droppable_file_ignores_unknown_names() {
        let mut log = Log::new();
        log.table_mut("BAT", &["TimeUS".to_string()]);
        log.load_droppable_tables("BAT\nGHOST\n");
        assert_eq!(log.droppable_tables, vec!["BAT".to_string()]);
    }
}
