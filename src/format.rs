/*!
Format Registry: message-type descriptors (§4.2 of the spec) and the
field-code alphabet fixed by §6.1.
*/
use crate::error::DflogError;

/// Type-ID of the self-describing `FMT` message.
pub const FMT_TYPE_ID: u8 = 128;
pub const FMT_NAME: &str = "FMT";
pub const FMTU_NAME: &str = "FMTU";
pub const UNIT_NAME: &str = "UNIT";
pub const MULT_NAME: &str = "MULT";

/// How a field's raw on-disk bytes should be interpreted once read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    I64,
    U64,
    F64,
    Str,
    I16Array32,
}

/// One entry of the fixed field-code alphabet: on-disk width in bytes and
/// how to decode it. Compile-time constant table, per Design Notes §9.
#[derive(Debug, Clone, Copy)]
pub struct FieldCode {
    pub code: char,
    pub width: usize,
    pub kind: FieldKind,
}

const ALPHABET: &[FieldCode] = &[
    FieldCode { code: 'a', width: 64, kind: FieldKind::I16Array32 },
    FieldCode { code: 'b', width: 1, kind: FieldKind::I64 },
    FieldCode { code: 'B', width: 1, kind: FieldKind::U64 },
    FieldCode { code: 'h', width: 2, kind: FieldKind::I64 },
    FieldCode { code: 'H', width: 2, kind: FieldKind::U64 },
    FieldCode { code: 'i', width: 4, kind: FieldKind::I64 },
    FieldCode { code: 'I', width: 4, kind: FieldKind::U64 },
    FieldCode { code: 'f', width: 4, kind: FieldKind::F64 },
    FieldCode { code: 'd', width: 8, kind: FieldKind::F64 },
    FieldCode { code: 'n', width: 4, kind: FieldKind::Str },
    FieldCode { code: 'N', width: 16, kind: FieldKind::Str },
    FieldCode { code: 'Z', width: 64, kind: FieldKind::Str },
    // "scaled by 100" in §6.1 describes the field's physical meaning, not
    // the on-disk decode: these unpack as plain int16/uint16/int32/uint32,
    // same as their h/H/i/I siblings.
    FieldCode { code: 'c', width: 2, kind: FieldKind::I64 },
    FieldCode { code: 'C', width: 2, kind: FieldKind::U64 },
    FieldCode { code: 'e', width: 4, kind: FieldKind::I64 },
    FieldCode { code: 'E', width: 4, kind: FieldKind::U64 },
    FieldCode { code: 'L', width: 4, kind: FieldKind::I64 },
    FieldCode { code: 'M', width: 1, kind: FieldKind::U64 },
    FieldCode { code: 'q', width: 8, kind: FieldKind::I64 },
    FieldCode { code: 'Q', width: 8, kind: FieldKind::U64 },
];

pub fn lookup_field_code(c: char) -> Result<FieldCode, DflogError> {
    ALPHABET
        .iter()
        .copied()
        .find(|f| f.code == c)
        .ok_or_else(|| DflogError::FormatError(format!("unknown field code '{c}'")))
}

/// A message-type descriptor produced by decoding a `FMT` frame/line.
#[derive(Debug, Clone)]
pub struct MessageFormat {
    pub id: u8,
    pub name: String,
    pub record_length: u8,
    pub field_codes: Vec<FieldCode>,
    pub columns: Vec<String>,
}

impl MessageFormat {
    pub fn new(
        id: u8,
        name: String,
        record_length: u8,
        codes_str: &str,
        columns: Vec<String>,
    ) -> Result<Self, DflogError> {
        let field_codes = codes_str
            .chars()
            .map(lookup_field_code)
            .collect::<Result<Vec<_>, _>>()?;
        if field_codes.len() != columns.len() {
            return Err(DflogError::FormatError(format!(
                "{name}: {} field codes but {} columns",
                field_codes.len(),
                columns.len()
            )));
        }
        Ok(MessageFormat {
            id,
            name,
            record_length,
            field_codes,
            columns,
        })
    }

    /// Total on-disk width of the payload, excluding the 3-byte sync+type header.
    pub fn payload_width(&self) -> usize {
        self.field_codes.iter().map(|f| f.width).sum()
    }
}
