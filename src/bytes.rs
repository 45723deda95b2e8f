//! Byte and string leaves: fixed-length blobs, NUL-terminated strings,
//! length-implicit UTF-8, and constants.

use crate::error::{LayoutError, Result};
use crate::external::CountSource;
use crate::value::Value;

/// Raw bytes of fixed or externally-sourced length.
#[derive(Debug, Clone)]
pub struct Blob {
    pub property: Option<String>,
    pub length: CountSource,
}

impl Blob {
    pub fn fixed(len: usize) -> Self {
        Blob {
            property: None,
            length: CountSource::Fixed(len as u64),
        }
    }

    pub fn external(length: CountSource) -> Self {
        Blob {
            property: None,
            length,
        }
    }

    pub fn span(&self) -> Option<i64> {
        self.length.fixed().map(|n| n as i64)
    }

    pub fn span_of(&self, buf: &[u8], offset: usize) -> Result<i64> {
        Ok(self.length.resolve(buf, offset)? as i64)
    }

    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<Value> {
        let len = self.length.resolve(buf, offset)? as usize;
        let slice = buf
            .get(offset..offset + len)
            .ok_or_else(|| LayoutError::range(offset, format!("need {len} bytes for blob")))?;
        Ok(Value::Bytes(slice.to_vec()))
    }

    pub fn encode(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        let bytes = value.as_bytes().ok_or(LayoutError::Type {
            expected: "bytes",
            found: "non-bytes value",
        })?;
        if let Some(fixed) = self.length.fixed() {
            if bytes.len() as u64 != fixed {
                return Err(LayoutError::range(
                    offset,
                    format!("blob source is {} bytes, layout expects {fixed}", bytes.len()),
                ));
            }
        }
        let slot = buf.get_mut(offset..offset + bytes.len()).ok_or_else(|| {
            LayoutError::range(offset, format!("need {} bytes for blob", bytes.len()))
        })?;
        slot.copy_from_slice(bytes);
        // External length is finalised after the payload, outside this span.
        self.length
            .write_resolved(bytes.len() as u64, buf, offset)?;
        Ok(bytes.len())
    }
}

/// Bytes up to and including a zero terminator.
#[derive(Debug, Clone, Default)]
pub struct CStr {
    pub property: Option<String>,
}

impl CStr {
    pub fn new() -> Self {
        CStr { property: None }
    }

    pub fn span_of(&self, buf: &[u8], offset: usize) -> Result<i64> {
        let tail = buf
            .get(offset..)
            .ok_or_else(|| LayoutError::range(offset, "offset past end of buffer"))?;
        let terminator = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| LayoutError::range(offset, "no NUL terminator found"))?;
        Ok((terminator + 1) as i64)
    }

    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<Value> {
        let span = self.span_of(buf, offset)? as usize;
        let text = std::str::from_utf8(&buf[offset..offset + span - 1])?;
        Ok(Value::Str(text.to_owned()))
    }

    pub fn encode(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        let text = value.as_str().ok_or(LayoutError::Type {
            expected: "string",
            found: "non-string value",
        })?;
        let bytes = text.as_bytes();
        let span = bytes.len() + 1;
        let slot = buf
            .get_mut(offset..offset + span)
            .ok_or_else(|| LayoutError::range(offset, format!("need {span} bytes for cstr")))?;
        slot[..bytes.len()].copy_from_slice(bytes);
        slot[bytes.len()] = 0;
        Ok(span)
    }
}

/// Entire remaining buffer slice decoded as UTF-8, with an optional maximum
/// encoded length.
#[derive(Debug, Clone, Default)]
pub struct Utf8 {
    pub property: Option<String>,
    pub max_span: Option<usize>,
}

impl Utf8 {
    pub fn new(max_span: Option<usize>) -> Self {
        Utf8 {
            property: None,
            max_span,
        }
    }

    pub fn span_of(&self, buf: &[u8], offset: usize) -> Result<i64> {
        Ok(buf.len().saturating_sub(offset) as i64)
    }

    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<Value> {
        let slice = buf
            .get(offset..)
            .ok_or_else(|| LayoutError::range(offset, "offset past end of buffer"))?;
        Ok(Value::Str(std::str::from_utf8(slice)?.to_owned()))
    }

    pub fn encode(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        let text = value.as_str().ok_or(LayoutError::Type {
            expected: "string",
            found: "non-string value",
        })?;
        let bytes = text.as_bytes();
        if let Some(max) = self.max_span {
            if bytes.len() > max {
                return Err(LayoutError::range(
                    offset,
                    format!("utf8 value is {} bytes, max_span is {max}", bytes.len()),
                ));
            }
        }
        let slot = buf
            .get_mut(offset..offset + bytes.len())
            .ok_or_else(|| LayoutError::range(offset, format!("need {} bytes for utf8", bytes.len())))?;
        slot.copy_from_slice(bytes);
        Ok(bytes.len())
    }
}

/// Span-0 leaf that always decodes to a preset value and never writes bytes.
#[derive(Debug, Clone)]
pub struct Constant {
    pub property: Option<String>,
    pub value: Value,
}

impl Constant {
    pub fn new(value: Value) -> Self {
        Constant {
            property: None,
            value,
        }
    }

    pub fn decode(&self) -> Value {
        // Cloned, not identity-shared: Rust has no implicit aliasing for
        // owned values, so unlike the object-identity contract this module
        // is modeled on, every decode gets its own copy.
        self.value.clone()
    }

    pub fn encode(&self) -> usize {
        0
    }
}
