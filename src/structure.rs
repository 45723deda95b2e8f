//! Ordered, named fields: the struct-like container.

use indexmap::IndexMap;

use crate::error::{LayoutError, Result};
use crate::node::Layout;
use crate::value::Value;

/// Sentinel returned by [`Structure::offset_of`] when the requested field
/// follows a variable-span sibling and its offset is not statically known.
pub const UNKNOWN_OFFSET: i64 = -1;

#[derive(Debug, Clone)]
pub struct Structure {
    pub property: Option<String>,
    pub name: Option<String>,
    pub fields: Vec<Layout>,
    pub decode_prefixes: bool,
    span: Option<i64>,
}

impl Structure {
    pub fn span(&self) -> Option<i64> {
        self.span
    }

    pub fn span_of(&self, buf: &[u8], offset: usize) -> Result<i64> {
        if let Some(span) = self.span {
            return Ok(span);
        }
        let mut running = 0i64;
        for field in &self.fields {
            running += field.span_of(buf, offset + running as usize)?;
        }
        Ok(running)
    }

    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<Value> {
        let mut record = IndexMap::new();
        let mut running = 0usize;
        for field in &self.fields {
            let field_offset = offset + running;
            if self.decode_prefixes && field_offset > buf.len() {
                break;
            }
            let span = match field.span_of(buf, field_offset) {
                Ok(span) => span,
                Err(_) if self.decode_prefixes => break,
                Err(e) => return Err(e),
            };
            if self.decode_prefixes && field_offset + span as usize > buf.len() {
                break;
            }
            let decoded = match field.decode(buf, field_offset) {
                Ok(v) => v,
                Err(_) if self.decode_prefixes => break,
                Err(e) => return Err(e),
            };
            if let Some(name) = field.property() {
                record.insert(name.to_owned(), decoded);
            }
            running += span as usize;
        }
        Ok(Value::Map(record))
    }

    pub fn encode(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        let map = value.as_map().ok_or(LayoutError::Type {
            expected: "map",
            found: "non-map value",
        })?;
        let mut running = 0usize;
        for field in &self.fields {
            let field_offset = offset + running;
            let span = match field.property() {
                Some(name) => match map.get(name) {
                    Some(v) => field.encode(v, buf, field_offset)?,
                    None => field.span_of(buf, field_offset)? as usize,
                },
                None => field.span_of(buf, field_offset)? as usize,
            };
            running += span;
        }
        Ok(running)
    }

    pub fn layout_for(&self, name: &str) -> Option<&Layout> {
        self.fields.iter().find(|f| f.property() == Some(name))
    }

    pub fn offset_of(&self, name: &str) -> Option<i64> {
        let mut running = 0i64;
        for field in &self.fields {
            if field.property() == Some(name) {
                return Some(running);
            }
            match field.span() {
                Some(span) => running += span,
                None => return Some(UNKNOWN_OFFSET),
            }
        }
        None
    }

    pub fn from_array(&self, values: &[Value]) -> Value {
        let mut record = IndexMap::new();
        let mut it = values.iter();
        for field in &self.fields {
            let Some(name) = field.property() else {
                continue;
            };
            if let Some(v) = it.next() {
                record.insert(name.to_owned(), v.clone());
            }
        }
        Value::Map(record)
    }
}

/// Accumulates fields, then produces an immutable [`Structure`]. Construction
/// fails if an unnamed child is variable-span (there would be no way to
/// recover its consumed length when omitted on encode).
pub struct StructureBuilder {
    name: Option<String>,
    fields: Vec<Layout>,
    decode_prefixes: bool,
}

impl StructureBuilder {
    pub fn new(name: Option<String>) -> Self {
        StructureBuilder {
            name,
            fields: Vec::new(),
            decode_prefixes: false,
        }
    }

    pub fn field(mut self, field: Layout) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Layout>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn decode_prefixes(mut self, enabled: bool) -> Self {
        self.decode_prefixes = enabled;
        self
    }

    pub fn build(self) -> Result<Structure> {
        for field in &self.fields {
            if field.property().is_none() && field.span().is_none() {
                return Err(LayoutError::schema(
                    "structure may not contain an unnamed variable-span field",
                ));
            }
        }
        let span = self
            .fields
            .iter()
            .try_fold(0i64, |acc, f| f.span().map(|s| acc + s));
        Ok(Structure {
            property: None,
            name: self.name,
            fields: self.fields,
            decode_prefixes: self.decode_prefixes,
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endian::Endian;
    use crate::factory as f;
    use crate::node::Layout;

    fn sensor_struct() -> Structure {
        StructureBuilder::new(Some("sensor".into()))
            .field(f::u8().named("sensor_id"))
            .field(f::s16(Endian::Little).named("T_Cel"))
            .field(f::u16(Endian::Little).named("RH_pph"))
            .field(f::u32(Endian::Little).named("timestamp_posix"))
            .build()
            .unwrap()
    }

    #[test]
    fn packed_reading_scenario() {
        let s = sensor_struct();
        let bytes = [0x05, 0x17, 0x00, 0x00, 0x00, 0xde, 0x26, 0x2d, 0x56];
        let decoded = s.decode(&bytes, 0).unwrap();
        let map = decoded.as_map().unwrap();
        assert_eq!(map["sensor_id"], Value::UInt(5));
        assert_eq!(map["T_Cel"], Value::Int(23));
        assert_eq!(map["RH_pph"], Value::UInt(0));
        assert_eq!(map["timestamp_posix"], Value::UInt(1_445_799_646));
    }

    #[test]
    fn packed_writing_scenario() {
        let s = sensor_struct();
        let mut buf = [0u8; 9];
        let mut record = IndexMap::new();
        record.insert("sensor_id".to_owned(), Value::UInt(7));
        record.insert("T_Cel".to_owned(), Value::Int(-5));
        record.insert("RH_pph".to_owned(), Value::UInt(16));
        record.insert("timestamp_posix".to_owned(), Value::UInt(1_445_799_694));
        let n = s.encode(&Value::Map(record), &mut buf, 0).unwrap();
        assert_eq!(n, 9);
        assert_eq!(buf, [0x07, 0xfb, 0xff, 0x10, 0x00, 0x0e, 0x4e, 0x2d, 0x56]);
    }

    #[test]
    fn decode_prefixes_stops_cleanly() {
        let s = StructureBuilder::new(Some("rec".into()))
            .field(f::u8().named("a"))
            .field(f::u16(Endian::Little).named("b"))
            .field(f::u32(Endian::Little).named("c"))
            .decode_prefixes(true)
            .build()
            .unwrap();
        let buf = [0x01, 0x02, 0x00];
        let decoded = s.decode(&buf, 0).unwrap();
        let map = decoded.as_map().unwrap();
        assert_eq!(map.get("a"), Some(&Value::UInt(1)));
        assert_eq!(map.get("b"), Some(&Value::UInt(2)));
        assert_eq!(map.get("c"), None);
    }

    #[test]
    fn unnamed_variable_span_field_rejected() {
        let err = StructureBuilder::new(None)
            .field(Layout::Utf8(crate::bytes::Utf8::new(None)))
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn offset_of_unknown_after_variable_sibling() {
        let s = StructureBuilder::new(None)
            .field(f::utf8(None).named("name"))
            .field(f::u8().named("flag"))
            .build()
            .unwrap();
        assert_eq!(s.offset_of("name"), Some(0));
        assert_eq!(s.offset_of("flag"), Some(UNKNOWN_OFFSET));
    }
}
