/*!
Record Decoder — text path (§4.4). Text logs are line-oriented CSV: each
line is `NAME, f1, f2, …`. A `FMT` line's trailing columns list is itself
comma-separated inside what should be a single logical field, so it's
rejoined before the row is staged.
*/
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};

use crate::error::DflogError;
use crate::format::{FieldKind, MessageFormat, FMT_NAME};
use crate::table::{Log, Row};
use crate::value::Value;

fn split_fields(line: &str) -> Vec<String> {
    line.split(',').map(|s| s.trim().to_string()).collect()
}

/// Parse a complete text DataFlash log from `input` into a [`Log`].
pub fn parse_text_log<R: Read>(input: R) -> Result<Log, DflogError> {
    let reader = BufReader::new(input);
    let mut fmt_rows: Vec<Vec<String>> = Vec::new();
    let mut staged: BTreeMap<String, Vec<Vec<String>>> = BTreeMap::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = split_fields(&line);
        if fields.is_empty() {
            continue;
        }
        let name = fields.remove(0);
        if name == FMT_NAME {
            if fields.len() < 5 {
                log::warn!("malformed FMT line, skipping: {line}");
                continue;
            }
            let rejoined = fields[4..].join(",");
            fields.truncate(4);
            fields.push(rejoined);
            fmt_rows.push(fields);
        } else {
            staged.entry(name).or_default().push(fields);
        }
    }

    let mut formats: BTreeMap<u8, MessageFormat> = BTreeMap::new();
    for payload in &fmt_rows {
        match build_format(payload) {
            Ok(fmt) => {
                formats.insert(fmt.id, fmt);
            }
            Err(e) => log::warn!("malformed FMT row, skipping: {e}"),
        }
    }

    let mut log = Log::new();
    log.formats = formats.clone();

    for (name, rows) in staged {
        let Some(fmt) = formats.values().find(|f| f.name == name) else {
            log::warn!("no FMT descriptor for table {name}, discarding {} rows", rows.len());
            continue;
        };
        let table = log.table_mut(&name, &fmt.columns);
        for payload in rows {
            table.rows.push(Row(decode_text_row(&payload, fmt)));
        }
    }

    log.post_process();
    Ok(log)
}

fn build_format(payload: &[String]) -> Result<MessageFormat, DflogError> {
    if payload.len() != 5 {
        return Err(DflogError::FormatError(format!(
            "FMT row needs 5 fields after rejoining, got {}",
            payload.len()
        )));
    }
    let id: u8 = payload[0]
        .parse()
        .map_err(|_| DflogError::FormatError(format!("bad Type {:?}", payload[0])))?;
    let record_length: u8 = payload[1]
        .parse()
        .map_err(|_| DflogError::FormatError(format!("bad Length {:?}", payload[1])))?;
    let name = payload[2].clone();
    let codes = payload[3].clone();
    let columns: Vec<String> = payload[4].split(',').map(|s| s.to_string()).collect();
    MessageFormat::new(id, name, record_length, &codes, columns)
}

fn decode_text_row(payload: &[String], fmt: &MessageFormat) -> Vec<Value> {
    fmt.field_codes
        .iter()
        .enumerate()
        .map(|(i, code)| {
            let raw = payload.get(i).map(String::as_str).unwrap_or("");
            decode_text_field(raw, code.kind)
        })
        .collect()
}

fn decode_text_field(raw: &str, kind: FieldKind) -> Value {
    match kind {
        FieldKind::I64 => raw.parse().map(Value::I64).unwrap_or_else(|_| Value::Str(raw.to_string())),
        FieldKind::U64 => raw.parse().map(Value::U64).unwrap_or_else(|_| Value::Str(raw.to_string())),
        FieldKind::F64 => {
            raw.parse().map(Value::F64).unwrap_or_else(|_| Value::Str(raw.to_string()))
        }
        FieldKind::Str => Value::Str(raw.to_string()),
        FieldKind::I16Array32 => {
            let mut arr = [0i16; 32];
            for (slot, part) in arr.iter_mut().zip(raw.split(':')) {
                *slot = part.trim().parse().unwrap_or(0);
            }
            Value::I16Array32(arr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> &'static str {
        "FMT, 128, 89, FMT, BBnNZ, Type,Length,Name,Format,Columns\n\
         FMT, 130, 15, TEST, Qf, TimeUS,V\n\
         TEST, 1000, 1.5\n\
         TEST, 2000, 2.5\n"
    }

    #[test]
    fn parses_simple_text_log() {
        let log = parse_text_log(sample_log().as_bytes()).unwrap();
        let table = log.tables.get("TEST").expect("TEST table present");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].0[0].as_u64(), Some(1000));
        let v = table.rows[1].0[1].as_f64().unwrap();
        assert!((v - 2.5).abs() < 1e-9);
    }

    #[test]
    fn fmt_line_columns_are_rejoined_into_one_field() {
        let log = parse_text_log(sample_log().as_bytes()).unwrap();
        let fmt = log.formats.get(&130).expect("TEST descriptor present");
        assert_eq!(fmt.columns, vec!["TimeUS".to_string(), "V".to_string()]);
    }

    #[test]
    fn unknown_table_is_discarded_with_warning() {
        let text = "GHOST, 1, 2\n";
        let log = parse_text_log(text.as_bytes()).unwrap();
        assert!(log.tables.is_empty());
    }

    #[test]
    fn empty_input_yields_empty_log() {
        let log = parse_text_log(&[][..]).unwrap();
        assert!(log.tables.is_empty());
    }
}
