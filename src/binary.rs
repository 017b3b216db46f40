/*!
Record Decoder — binary path (§4.2, §4.3). Reassembles complete records out
of [`Framer`] output (the sync marker can legitimately appear inside a
record's payload) and unpacks each record's fields per the §6.1 alphabet.
*/
use std::collections::BTreeMap;
use std::io::Read;

use bytes::Buf;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::format::{FieldKind, MessageFormat, FMT_TYPE_ID};
use crate::framer::{frame_all, SYNC_MARKER};
use crate::table::{Log, Row};
use crate::value::Value;

/// On-wire `FMT` payload layout: `B B 4s 16s 64s`, 86 bytes (§4.2, §6.1).
#[derive(FromBytes, KnownLayout, Immutable)]
#[repr(C)]
struct RawFmtPayload {
    type_id: u8,
    record_length: u8,
    name: [u8; 4],
    field_codes: [u8; 16],
    columns: [u8; 64],
}

const RAW_FMT_PAYLOAD_LEN: usize = size_of::<RawFmtPayload>();
const _: () = assert!(RAW_FMT_PAYLOAD_LEN == 86);

fn ascii_trim(raw: &[u8]) -> String {
    let s: String = raw.iter().map(|&b| b as char).collect();
    s.trim_end_matches('\0').to_string()
}

/// Decode one `FMT` record's payload (the bytes after the outer type byte)
/// into a [`MessageFormat`].
fn decode_fmt_payload(record: &[u8]) -> Result<MessageFormat, String> {
    if record.len() < 1 + RAW_FMT_PAYLOAD_LEN {
        return Err(format!(
            "FMT record too short: {} bytes, need {}",
            record.len(),
            1 + RAW_FMT_PAYLOAD_LEN
        ));
    }
    let raw = RawFmtPayload::ref_from_bytes(&record[1..1 + RAW_FMT_PAYLOAD_LEN])
        .map_err(|e| format!("FMT payload layout mismatch: {e:?}"))?;
    let name = ascii_trim(&raw.name);
    let field_codes = ascii_trim(&raw.field_codes);
    let columns: Vec<String> = ascii_trim(&raw.columns)
        .split(',')
        .map(|s| s.to_string())
        .collect();
    MessageFormat::new(raw.type_id, name, raw.record_length, &field_codes, columns)
        .map_err(|e| e.to_string())
}

/// Decode a record's payload fields (after the 1-byte type) per `fmt`'s
/// field-code list, little-endian, no alignment.
fn decode_fields(mut payload: &[u8], fmt: &MessageFormat) -> Vec<Value> {
    let mut values = Vec::with_capacity(fmt.field_codes.len());
    for field in &fmt.field_codes {
        if payload.len() < field.width {
            // truncated trailing field: pad remaining width decode with
            // zeroes rather than panicking, per the best-effort policy.
            let mut padded = vec![0u8; field.width];
            padded[..payload.len()].copy_from_slice(payload);
            payload = &[];
            values.push(decode_one(&mut &padded[..], field.kind, field.width));
            continue;
        }
        values.push(decode_one(&mut payload, field.kind, field.width));
    }
    values
}

fn decode_one(buf: &mut &[u8], kind: FieldKind, width: usize) -> Value {
    match kind {
        FieldKind::I16Array32 => {
            let mut arr = [0i16; 32];
            for slot in arr.iter_mut() {
                *slot = buf.get_i16_le();
            }
            Value::I16Array32(arr)
        }
        FieldKind::I64 => {
            let v = match width {
                1 => buf.get_i8() as i64,
                2 => buf.get_i16_le() as i64,
                4 => buf.get_i32_le() as i64,
                8 => buf.get_i64_le(),
                _ => unreachable!("field alphabet widths are fixed"),
            };
            Value::I64(v)
        }
        FieldKind::U64 => {
            let v = match width {
                1 => buf.get_u8() as u64,
                2 => buf.get_u16_le() as u64,
                4 => buf.get_u32_le() as u64,
                8 => buf.get_u64_le(),
                _ => unreachable!("field alphabet widths are fixed"),
            };
            Value::U64(v)
        }
        FieldKind::F64 => {
            let v = match width {
                4 => buf.get_f32_le() as f64,
                8 => buf.get_f64_le(),
                _ => unreachable!("field alphabet widths are fixed"),
            };
            Value::F64(v)
        }
        FieldKind::Str => {
            let raw = &buf[..width];
            buf.advance(width);
            Value::Str(ascii_trim(raw))
        }
    }
}

fn emit_record(
    record: &[u8],
    formats: &BTreeMap<u8, MessageFormat>,
    log: &mut Log,
) {
    let Some(&type_id) = record.first() else {
        return;
    };
    let Some(fmt) = formats.get(&type_id) else {
        log::warn!("unknown type-id {type_id}, discarding record");
        return;
    };
    let values = decode_fields(&record[1..], fmt);
    let row = Row(values);
    log.table_mut(&fmt.name, &fmt.columns).rows.push(row);
}

/// Parse a complete binary DataFlash log from `input` into a [`Log`].
pub fn parse_binary_log<R: Read>(input: R) -> Result<Log, crate::error::DflogError> {
    let mut frames = frame_all(input)?;
    frames.retain(|f| !f.is_empty());
    frames.retain(|f| f.len() >= 3 || f.first() == Some(&FMT_TYPE_ID));

    if frames.is_empty() {
        log::warn!("no valid lines in file");
        return Ok(Log::new());
    }

    let mut formats: BTreeMap<u8, MessageFormat> = BTreeMap::new();
    for frame in &frames {
        if frame.first() == Some(&FMT_TYPE_ID) {
            match decode_fmt_payload(frame) {
                Ok(fmt) => {
                    formats.insert(fmt.id, fmt);
                }
                Err(e) => log::warn!("malformed FMT record: {e}"),
            }
        }
    }

    let mut log = Log::new();
    log.formats = formats.clone();

    let mut current = frames[0].clone();
    for next in &frames[1..] {
        let known = next
            .first()
            .map(|b| formats.contains_key(b))
            .unwrap_or(false);
        let len_ok = current
            .first()
            .and_then(|t| formats.get(t))
            .map(|fmt| current.len() >= fmt.record_length as usize - 2)
            .unwrap_or(false);
        if known && len_ok {
            emit_record(&current, &formats, &mut log);
            current = next.clone();
        } else {
            let mut stitched = current;
            stitched.extend_from_slice(&SYNC_MARKER);
            stitched.extend_from_slice(next);
            current = stitched;
        }
    }
    let final_ok = current
        .first()
        .and_then(|t| formats.get(t))
        .map(|fmt| current.len() >= fmt.record_length as usize - 2)
        .unwrap_or(false);
    if final_ok {
        emit_record(&current, &formats, &mut log);
    }

    log.post_process();
    Ok(log)
}
