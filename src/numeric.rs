//! Integer and floating point leaves.

use crate::endian::{self, Endian};
use crate::error::{LayoutError, Result};
use crate::value::Value;

/// Signedness of an [`IntLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signedness {
    Unsigned,
    Signed,
    /// 8 bytes on the wire, decoded/encoded as `f64`; precision degrades
    /// above 2^53 and that is not an error.
    Near64,
}

/// A 1..=6 byte (or 8-byte "near-64") integer leaf.
#[derive(Debug, Clone)]
pub struct IntLayout {
    pub property: Option<String>,
    pub width: usize,
    pub endian: Endian,
    pub signedness: Signedness,
}

impl IntLayout {
    pub fn new(width: usize, endian: Endian, signedness: Signedness) -> Self {
        assert!(
            matches!(signedness, Signedness::Near64) || (1..=6).contains(&width),
            "integer leaf width must be 1..=6 bytes"
        );
        IntLayout {
            property: None,
            width,
            endian,
            signedness,
        }
    }

    pub fn span(&self) -> i64 {
        match self.signedness {
            Signedness::Near64 => 8,
            _ => self.width as i64,
        }
    }

    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<Value> {
        let span = self.span() as usize;
        let slice = buf.get(offset..offset + span).ok_or_else(|| {
            LayoutError::range(offset, format!("need {span} bytes for integer leaf"))
        })?;
        match self.signedness {
            Signedness::Near64 => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(slice);
                Ok(Value::Float(endian::read_f64(&arr, self.endian)))
            }
            Signedness::Unsigned => {
                Ok(Value::UInt(endian::read_uint(slice, self.width, self.endian)))
            }
            Signedness::Signed => {
                let raw = endian::read_uint(slice, self.width, self.endian);
                Ok(Value::Int(endian::sign_extend(raw, self.width)))
            }
        }
    }

    pub fn encode(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        let span = self.span() as usize;
        let slot = buf.get_mut(offset..offset + span).ok_or_else(|| {
            LayoutError::range(offset, format!("need {span} bytes for integer leaf"))
        })?;
        match self.signedness {
            Signedness::Near64 => {
                let v = value.as_f64()?;
                slot.copy_from_slice(&endian::write_f64(v, self.endian));
            }
            Signedness::Unsigned => {
                let v = value.as_u64()?;
                self.range_check_unsigned(v, offset)?;
                endian::write_uint(slot, self.width, self.endian, v);
            }
            Signedness::Signed => {
                let v = value.as_i64()?;
                self.range_check_signed(v, offset)?;
                endian::write_uint(slot, self.width, self.endian, v as u64);
            }
        }
        Ok(span)
    }

    fn range_check_unsigned(&self, v: u64, offset: usize) -> Result<()> {
        let bits = self.width as u32 * 8;
        let max = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
        if v > max {
            return Err(LayoutError::range(
                offset,
                format!("value {v} does not fit in unsigned {}-byte width", self.width),
            ));
        }
        Ok(())
    }

    fn range_check_signed(&self, v: i64, offset: usize) -> Result<()> {
        let bits = self.width as u32 * 8;
        if bits >= 64 {
            return Ok(());
        }
        let max = (1i64 << (bits - 1)) - 1;
        let min = -(1i64 << (bits - 1));
        if v < min || v > max {
            return Err(LayoutError::range(
                offset,
                format!("value {v} does not fit in signed {}-byte width", self.width),
            ));
        }
        Ok(())
    }
}

/// 32- or 64-bit IEEE-754 float leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    F32,
    F64,
}

#[derive(Debug, Clone)]
pub struct FloatLayout {
    pub property: Option<String>,
    pub width: FloatWidth,
    pub endian: Endian,
}

impl FloatLayout {
    pub fn new(width: FloatWidth, endian: Endian) -> Self {
        FloatLayout {
            property: None,
            width,
            endian,
        }
    }

    pub fn span(&self) -> i64 {
        match self.width {
            FloatWidth::F32 => 4,
            FloatWidth::F64 => 8,
        }
    }

    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<Value> {
        let span = self.span() as usize;
        let slice = buf
            .get(offset..offset + span)
            .ok_or_else(|| LayoutError::range(offset, format!("need {span} bytes for float leaf")))?;
        Ok(match self.width {
            FloatWidth::F32 => {
                let mut arr = [0u8; 4];
                arr.copy_from_slice(slice);
                Value::Float(endian::read_f32(&arr, self.endian) as f64)
            }
            FloatWidth::F64 => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(slice);
                Value::Float(endian::read_f64(&arr, self.endian))
            }
        })
    }

    pub fn encode(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        let span = self.span() as usize;
        let slot = buf
            .get_mut(offset..offset + span)
            .ok_or_else(|| LayoutError::range(offset, format!("need {span} bytes for float leaf")))?;
        let v = value.as_f64()?;
        match self.width {
            FloatWidth::F32 => slot.copy_from_slice(&endian::write_f32(v as f32, self.endian)),
            FloatWidth::F64 => slot.copy_from_slice(&endian::write_f64(v, self.endian)),
        }
        Ok(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_16_round_trip() {
        let layout = IntLayout::new(2, Endian::Little, Signedness::Signed);
        let mut buf = [0u8; 2];
        layout.encode(&Value::Int(-5), &mut buf, 0).unwrap();
        assert_eq!(buf, [0xfb, 0xff]);
        assert_eq!(layout.decode(&buf, 0).unwrap(), Value::Int(-5));
    }

    #[test]
    fn unsigned_range_error() {
        let layout = IntLayout::new(1, Endian::Little, Signedness::Unsigned);
        let mut buf = [0u8; 1];
        assert!(layout.encode(&Value::UInt(256), &mut buf, 0).is_err());
    }

    #[test]
    fn near64_precision_degrades_silently() {
        let layout = IntLayout::new(8, Endian::Little, Signedness::Near64);
        let mut buf = [0u8; 8];
        let huge = 2f64.powi(60);
        layout.encode(&Value::Float(huge), &mut buf, 0).unwrap();
        let Value::Float(back) = layout.decode(&buf, 0).unwrap() else {
            panic!("expected float");
        };
        assert_eq!(back, huge);
    }

    #[rstest::rstest]
    #[case(1, Endian::Little)]
    #[case(1, Endian::Big)]
    #[case(3, Endian::Little)]
    #[case(3, Endian::Big)]
    #[case(5, Endian::Little)]
    #[case(6, Endian::Big)]
    fn unsigned_round_trips_at_every_supported_width(#[case] width: usize, #[case] endian: Endian) {
        let layout = IntLayout::new(width, endian, Signedness::Unsigned);
        let max = (1u64 << (width as u32 * 8)) - 1;
        let mut buf = vec![0u8; width];
        layout.encode(&Value::UInt(max), &mut buf, 0).unwrap();
        assert_eq!(layout.decode(&buf, 0).unwrap(), Value::UInt(max));
    }

    #[rstest::rstest]
    #[case(1, Endian::Little)]
    #[case(2, Endian::Big)]
    #[case(4, Endian::Little)]
    #[case(6, Endian::Big)]
    fn signed_round_trips_at_every_supported_width(#[case] width: usize, #[case] endian: Endian) {
        let layout = IntLayout::new(width, endian, Signedness::Signed);
        let bits = width as u32 * 8;
        let min = -(1i64 << (bits - 1));
        let mut buf = vec![0u8; width];
        layout.encode(&Value::Int(min), &mut buf, 0).unwrap();
        assert_eq!(layout.decode(&buf, 0).unwrap(), Value::Int(min));
    }
}
