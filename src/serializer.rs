/*!
Serializer (§4.8): emits descriptors first, then every remaining row with a
`TimeUS` column, stable-sorted by that timestamp, in canonical `", "`-joined
text form.
*/
use std::io::Write;

use crate::error::DflogError;
use crate::table::Log;

/// Render `log` to the canonical DataFlash text form.
pub fn render(log: &Log) -> String {
    let mut out = String::new();

    for fmt in log.formats.values() {
        let codes: String = fmt.field_codes.iter().map(|f| f.code).collect();
        out.push_str(&format!(
            "FMT, {}, {}, {}, {}, {}\n",
            fmt.id,
            fmt.record_length,
            fmt.name,
            codes,
            fmt.columns.join(",")
        ));
    }

    let mut timed_rows: Vec<(u64, String)> = Vec::new();
    for (name, table) in &log.tables {
        let Some(time_idx) = table.time_us_index() else {
            continue;
        };
        for row in &table.rows {
            let Some(time_us) = row.0[time_idx].as_u64() else {
                continue;
            };
            let rest = row
                .0
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            timed_rows.push((time_us, format!("{name}, {rest}")));
        }
    }
    timed_rows.sort_by_key(|(t, _)| *t);

    for (_, line) in timed_rows {
        out.push_str(&line);
        out.push('\n');
    }

    out
}

/// Write `log`'s canonical text form to `path`, truncating any existing file.
pub fn write_to_file(log: &Log, path: &std::path::Path) -> Result<(), DflogError> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(render(log).as_bytes())?;
    Ok(())
}
