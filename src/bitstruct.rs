//! Packs multiple sub-byte fields inside a single 1..=4 byte integer word.

use indexmap::IndexMap;

use crate::endian::{self, Endian};
use crate::error::{LayoutError, Result};
use crate::value::Value;

/// First-added field placement within the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    /// First-added field occupies the least-significant bits (default).
    Lsb0,
    /// First-added field occupies the most-significant bits.
    Msb0,
}

#[derive(Debug, Clone)]
pub struct BitField {
    pub property: Option<String>,
    pub bits: u32,
    pub start: u32,
    pub boolean: bool,
}

impl BitField {
    fn value_mask(&self) -> u64 {
        if self.bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        }
    }

    fn word_mask(&self) -> u64 {
        self.value_mask() << self.start
    }

    fn decode(&self, word: u64) -> Value {
        let raw = (word >> self.start) & self.value_mask();
        if self.boolean {
            Value::Bool(raw != 0)
        } else {
            Value::UInt(raw)
        }
    }

    fn encode_into(&self, value: &Value, word: &mut u64) -> Result<()> {
        let raw = if self.boolean {
            if value.as_bool().unwrap_or(value.as_u64().unwrap_or(0) != 0) {
                1
            } else {
                0
            }
        } else {
            value.as_u64()?
        };
        if raw > self.value_mask() {
            return Err(LayoutError::range(
                0,
                format!("value {raw} does not fit in {}-bit field", self.bits),
            ));
        }
        *word = (*word & !self.word_mask()) | ((raw & self.value_mask()) << self.start);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BitStructure {
    pub property: Option<String>,
    pub word_bytes: usize,
    pub endian: Endian,
    pub fields: Vec<BitField>,
}

impl BitStructure {
    pub fn span(&self) -> i64 {
        self.word_bytes as i64
    }

    fn read_word(&self, buf: &[u8], offset: usize) -> Result<u64> {
        let slice = buf.get(offset..offset + self.word_bytes).ok_or_else(|| {
            LayoutError::range(offset, format!("need {} bytes for bit structure word", self.word_bytes))
        })?;
        Ok(endian::read_uint(slice, self.word_bytes, self.endian))
    }

    fn write_word(&self, buf: &mut [u8], offset: usize, word: u64) -> Result<()> {
        let slot = buf.get_mut(offset..offset + self.word_bytes).ok_or_else(|| {
            LayoutError::range(offset, format!("need {} bytes for bit structure word", self.word_bytes))
        })?;
        endian::write_uint(slot, self.word_bytes, self.endian, word);
        Ok(())
    }

    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<Value> {
        let word = self.read_word(buf, offset)?;
        let mut record = IndexMap::new();
        for field in &self.fields {
            if let Some(name) = &field.property {
                record.insert(name.clone(), field.decode(word));
            }
        }
        Ok(Value::Map(record))
    }

    /// A field absent from `src` preserves the existing bits at its
    /// position; unused bits outside every declared field are always
    /// preserved.
    pub fn encode(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        let map = value.as_map().ok_or(LayoutError::Type {
            expected: "map",
            found: "non-map value",
        })?;
        let mut word = self.read_word(buf, offset)?;
        for field in &self.fields {
            let Some(name) = &field.property else {
                continue;
            };
            if let Some(v) = map.get(name) {
                field.encode_into(v, &mut word)?;
            }
        }
        self.write_word(buf, offset, word)?;
        Ok(self.word_bytes)
    }

    pub fn from_array(&self, values: &[Value]) -> Value {
        let mut record = IndexMap::new();
        let mut it = values.iter();
        for field in &self.fields {
            let Some(name) = &field.property else {
                continue;
            };
            if let Some(v) = it.next() {
                record.insert(name.clone(), v.clone());
            }
        }
        Value::Map(record)
    }
}

pub struct BitStructureBuilder {
    word_bytes: usize,
    endian: Endian,
    order: BitOrder,
    fields: Vec<BitField>,
    total_bits_used: u32,
}

impl BitStructureBuilder {
    pub fn new(word_bytes: usize, endian: Endian, order: BitOrder) -> Result<Self> {
        if !(1..=4).contains(&word_bytes) {
            return Err(LayoutError::schema(
                "bit structure word must be 1..=4 bytes",
            ));
        }
        Ok(BitStructureBuilder {
            word_bytes,
            endian,
            order,
            fields: Vec::new(),
            total_bits_used: 0,
        })
    }

    fn word_bits(&self) -> u32 {
        self.word_bytes as u32 * 8
    }

    fn place(&mut self, property: Option<String>, bits: u32, boolean: bool) -> Result<()> {
        if bits > 32 {
            return Err(LayoutError::schema("bit field width may not exceed 32 bits"));
        }
        if self.total_bits_used + bits > self.word_bits() {
            return Err(LayoutError::schema(format!(
                "bit field of {bits} bits does not fit in remaining {} bits of word",
                self.word_bits() - self.total_bits_used
            )));
        }
        let start = match self.order {
            BitOrder::Lsb0 => self.total_bits_used,
            BitOrder::Msb0 => self.word_bits() - self.total_bits_used - bits,
        };
        self.total_bits_used += bits;
        self.fields.push(BitField {
            property,
            bits,
            start,
            boolean,
        });
        Ok(())
    }

    pub fn add_field(mut self, property: impl Into<String>, bits: u32) -> Result<Self> {
        self.place(Some(property.into()), bits, false)?;
        Ok(self)
    }

    pub fn add_bool(mut self, property: impl Into<String>) -> Result<Self> {
        self.place(Some(property.into()), 1, true)?;
        Ok(self)
    }

    pub fn build(self) -> BitStructure {
        BitStructure {
            property: None,
            word_bytes: self.word_bytes,
            endian: self.endian,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> BitStructure {
        BitStructureBuilder::new(2, Endian::Little, BitOrder::Lsb0)
            .unwrap()
            .add_field("a", 3)
            .unwrap()
            .add_field("b", 5)
            .unwrap()
            .add_field("c", 8)
            .unwrap()
            .build()
    }

    #[test]
    fn lsb_first_scenario() {
        let bs = abc();
        let mut record = IndexMap::new();
        record.insert("a".to_owned(), Value::UInt(5));
        record.insert("b".to_owned(), Value::UInt(17));
        record.insert("c".to_owned(), Value::UInt(0xA5));
        let mut buf = [0u8; 2];
        bs.encode(&Value::Map(record), &mut buf, 0).unwrap();
        assert_eq!(buf, [0x8d, 0xa5]);

        let decoded = bs.decode(&buf, 0).unwrap();
        let map = decoded.as_map().unwrap();
        assert_eq!(map["a"], Value::UInt(5));
        assert_eq!(map["b"], Value::UInt(17));
        assert_eq!(map["c"], Value::UInt(0xA5));
    }

    #[test]
    fn msb_first_layout() {
        let bs = BitStructureBuilder::new(1, Endian::Little, BitOrder::Msb0)
            .unwrap()
            .add_field("hi", 3)
            .unwrap()
            .add_field("lo", 5)
            .unwrap()
            .build();
        let mut record = IndexMap::new();
        record.insert("hi".to_owned(), Value::UInt(0b101));
        record.insert("lo".to_owned(), Value::UInt(0b10101));
        let mut buf = [0u8; 1];
        bs.encode(&Value::Map(record), &mut buf, 0).unwrap();
        // hi occupies bits 5..8 (word bits 8), lo occupies bits 0..5.
        assert_eq!(buf[0], 0b101_10101);
    }

    #[test]
    fn unaddressed_bits_preserved_on_partial_encode() {
        let bs = abc();
        let mut buf = [0xff, 0xff];
        let mut record = IndexMap::new();
        record.insert("b".to_owned(), Value::UInt(0));
        bs.encode(&Value::Map(record), &mut buf, 0).unwrap();
        let decoded = bs.decode(&buf, 0).unwrap();
        let map = decoded.as_map().unwrap();
        // a and c were not present in the source and must be preserved.
        assert_eq!(map["a"], Value::UInt(0b111));
        assert_eq!(map["b"], Value::UInt(0));
        assert_eq!(map["c"], Value::UInt(0xff));
    }

    #[test]
    fn overflowing_field_rejected_at_build_time() {
        let result = BitStructureBuilder::new(1, Endian::Little, BitOrder::Lsb0)
            .unwrap()
            .add_field("a", 4)
            .unwrap()
            .add_field("b", 5);
        assert!(result.is_err());
    }

    #[test]
    fn boolean_field_round_trip() {
        let bs = BitStructureBuilder::new(1, Endian::Little, BitOrder::Lsb0)
            .unwrap()
            .add_bool("flag")
            .unwrap()
            .build();
        let mut buf = [0u8; 1];
        let mut record = IndexMap::new();
        record.insert("flag".to_owned(), Value::Bool(true));
        bs.encode(&Value::Map(record), &mut buf, 0).unwrap();
        assert_eq!(buf[0] & 1, 1);
        let decoded = bs.decode(&buf, 0).unwrap();
        assert_eq!(decoded.as_map().unwrap()["flag"], Value::Bool(true));
    }
}
