//! Schema-described fixed-size records and key extraction.
//!
//! Every record of a table encodes to the same number of bytes, fixed by its
//! [`TableSchema`]. Field 0 is always the integer key the index orders by.

use std::fmt;

use crate::error::{IndexError, Result};

/// Upper bound on fields per schema.
pub const MAX_FIELDS: usize = 8;
/// Upper bound on a field name, in bytes.
pub const MAX_FIELD_NAME: usize = 20;
/// Upper bound on a fixed text field, in bytes.
pub const MAX_TEXT_LEN: usize = 200;

/// Type of one schema field, fixing its encoded width.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FieldType {
    /// 64-bit signed integer, 8 bytes little-endian.
    Int,
    /// 64-bit float, 8 bytes little-endian.
    Float,
    /// Fixed-width UTF-8 text, NUL-padded to the declared length.
    Text(u8),
}

impl FieldType {
    /// Encoded width of a value of this type.
    pub fn width(self) -> usize {
        match self {
            FieldType::Int | FieldType::Float => 8,
            FieldType::Text(len) => len as usize,
        }
    }

    pub(crate) fn to_parts(self) -> (u8, u8) {
        match self {
            FieldType::Int => (1, 0),
            FieldType::Float => (2, 0),
            FieldType::Text(len) => (3, len),
        }
    }

    pub(crate) fn from_parts(tag: u8, aux: u8) -> Result<Self> {
        match tag {
            1 => Ok(Self::Int),
            2 => Ok(Self::Float),
            3 => Ok(Self::Text(aux)),
            other => Err(IndexError::Corruption(format!(
                "unknown field type tag 0x{other:02X}"
            ))),
        }
    }
}

/// One named, typed column of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column name, 1..=20 bytes.
    pub name: String,
    /// Column type.
    pub ty: FieldType,
}

/// Ordered field list describing one table's records.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    fields: Vec<Field>,
}

impl TableSchema {
    /// Builds a schema, rejecting shapes the index cannot store: field 0
    /// must be the integer key, names and text widths must stay within
    /// their fixed bounds.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        if fields.is_empty() || fields.len() > MAX_FIELDS {
            return Err(IndexError::InvalidArgument(format!(
                "schema must have between 1 and {MAX_FIELDS} fields, got {}",
                fields.len()
            )));
        }
        if fields[0].ty != FieldType::Int {
            return Err(IndexError::InvalidArgument(
                "first field must be the integer key".into(),
            ));
        }
        for field in &fields {
            let name_len = field.name.as_bytes().len();
            if name_len == 0 || name_len > MAX_FIELD_NAME {
                return Err(IndexError::InvalidArgument(format!(
                    "field name `{}` must be between 1 and {MAX_FIELD_NAME} bytes",
                    field.name
                )));
            }
            if let FieldType::Text(len) = field.ty {
                if len == 0 || len as usize > MAX_TEXT_LEN {
                    return Err(IndexError::InvalidArgument(format!(
                        "text field `{}` must be between 1 and {MAX_TEXT_LEN} bytes",
                        field.name
                    )));
                }
            }
        }
        Ok(Self { fields })
    }

    /// The schema's fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Encoded size of one record of this schema.
    pub fn record_len(&self) -> usize {
        self.fields.iter().map(|f| f.ty.width()).sum()
    }

    /// Checks `record` against this schema: arity, value types, text widths.
    pub fn validate(&self, record: &Record) -> Result<()> {
        if record.values.len() != self.fields.len() {
            return Err(IndexError::InvalidArgument(format!(
                "record has {} values, schema has {} fields",
                record.values.len(),
                self.fields.len()
            )));
        }
        for (field, value) in self.fields.iter().zip(&record.values) {
            match (field.ty, value) {
                (FieldType::Int, FieldValue::Int(_)) => {}
                (FieldType::Float, FieldValue::Float(_)) => {}
                (FieldType::Text(len), FieldValue::Text(text)) => {
                    let bytes = text.as_bytes();
                    if bytes.len() > len as usize {
                        return Err(IndexError::InvalidArgument(format!(
                            "text value exceeds {len} bytes for field `{}`",
                            field.name
                        )));
                    }
                    if bytes.contains(&0) {
                        return Err(IndexError::InvalidArgument(format!(
                            "text value for field `{}` contains a NUL byte",
                            field.name
                        )));
                    }
                }
                _ => {
                    return Err(IndexError::InvalidArgument(format!(
                        "value type does not match field `{}`",
                        field.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Extracts the ordering key from `record` (its first field).
    pub fn key_of(&self, record: &Record) -> Result<i64> {
        record.key().ok_or_else(|| {
            IndexError::InvalidArgument("record does not carry an integer key".into())
        })
    }
}

/// One field value of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// One logical row, always paired with a [`TableSchema`] for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<FieldValue>,
}

impl Record {
    /// Wraps raw values into a record; validated against a schema on use.
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self { values }
    }

    /// The record's values in field order.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub(crate) fn key(&self) -> Option<i64> {
        match self.values.first() {
            Some(FieldValue::Int(key)) => Some(*key),
            _ => None,
        }
    }

    /// Encodes the record into `out`, which must hold `schema.record_len()`
    /// bytes. Text slots are NUL-padded to their declared width.
    pub fn write_to(&self, schema: &TableSchema, out: &mut [u8]) -> Result<()> {
        schema.validate(self)?;
        if out.len() < schema.record_len() {
            return Err(IndexError::Corruption(
                "destination slice shorter than record".into(),
            ));
        }
        let mut offset = 0;
        for (field, value) in schema.fields().iter().zip(&self.values) {
            let width = field.ty.width();
            let slot = &mut out[offset..offset + width];
            match value {
                FieldValue::Int(v) => slot.copy_from_slice(&v.to_le_bytes()),
                FieldValue::Float(v) => slot.copy_from_slice(&v.to_le_bytes()),
                FieldValue::Text(text) => {
                    slot.fill(0);
                    slot[..text.as_bytes().len()].copy_from_slice(text.as_bytes());
                }
            }
            offset += width;
        }
        Ok(())
    }

    /// Decodes one record of `schema` from the front of `bytes`.
    pub fn read_from(schema: &TableSchema, bytes: &[u8]) -> Result<Self> {
        if bytes.len() < schema.record_len() {
            return Err(IndexError::Corruption("record slice truncated".into()));
        }
        let mut values = Vec::with_capacity(schema.fields().len());
        let mut offset = 0;
        for field in schema.fields() {
            let width = field.ty.width();
            let slot = &bytes[offset..offset + width];
            let value = match field.ty {
                FieldType::Int => FieldValue::Int(i64::from_le_bytes(
                    slot.try_into().expect("slice has exactly 8 bytes"),
                )),
                FieldType::Float => FieldValue::Float(f64::from_le_bytes(
                    slot.try_into().expect("slice has exactly 8 bytes"),
                )),
                FieldType::Text(_) => {
                    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
                    let text = std::str::from_utf8(&slot[..end]).map_err(|_| {
                        IndexError::Corruption("text field is not valid UTF-8".into())
                    })?;
                    FieldValue::Text(text.to_string())
                }
            };
            values.push(value);
            offset += width;
        }
        Ok(Self { values })
    }
}
