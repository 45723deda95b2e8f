//! External layouts: nodes whose purpose is to locate or derive a value
//! rather than occupy space within their parent.

use std::rc::Rc;

use crate::error::{LayoutError, Result};
use crate::node::Layout;
use crate::value::Value;

/// A capability narrower than the full [`Layout`] surface: something that can
/// be asked "do you decode to a non-negative count/discriminator?" and,
/// if so, read and write that count from a buffer.
pub trait ExternalNode {
    fn decode_at(&self, buf: &[u8], offset: usize) -> Result<Value>;
    fn encode_at(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize>;
    fn is_count(&self) -> bool;
}

/// `floor((buf.len() - offset) / element_span)`, with a no-op encode.
#[derive(Debug, Clone)]
pub struct Greedy {
    pub property: Option<String>,
    pub element_span: usize,
}

impl Greedy {
    pub fn new(element_span: usize) -> Self {
        Greedy {
            property: None,
            element_span,
        }
    }
}

impl ExternalNode for Greedy {
    fn decode_at(&self, buf: &[u8], offset: usize) -> Result<Value> {
        if self.element_span == 0 {
            return Err(LayoutError::schema("greedy element span must be non-zero"));
        }
        let remainder = buf.len().saturating_sub(offset);
        Ok(Value::UInt((remainder / self.element_span) as u64))
    }

    fn encode_at(&self, _value: &Value, _buf: &mut [u8], _offset: usize) -> Result<usize> {
        Ok(0)
    }

    fn is_count(&self) -> bool {
        true
    }
}

/// Redirects to `target` at a signed relative offset `k` from the consumer's
/// base offset.
#[derive(Clone)]
pub struct Offset {
    pub property: Option<String>,
    pub target: Box<Layout>,
    pub k: i64,
}

impl std::fmt::Debug for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Offset")
            .field("property", &self.property)
            .field("k", &self.k)
            .finish_non_exhaustive()
    }
}

impl Offset {
    pub fn new(target: Layout, k: i64) -> Self {
        Offset {
            property: None,
            target: Box::new(target),
            k,
        }
    }

    fn resolved(&self, offset: usize) -> Result<usize> {
        let resolved = offset as i64 + self.k;
        if resolved < 0 {
            return Err(LayoutError::range(
                offset,
                format!("offset layout resolves to negative position ({resolved})"),
            ));
        }
        Ok(resolved as usize)
    }
}

impl ExternalNode for Offset {
    fn decode_at(&self, buf: &[u8], offset: usize) -> Result<Value> {
        self.target.decode(buf, self.resolved(offset)?)
    }

    fn encode_at(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        self.target.encode(value, buf, self.resolved(offset)?)
    }

    fn is_count(&self) -> bool {
        self.target.is_count()
    }
}

/// Either concrete external kind, boxed behind a single reference-counted
/// handle so it can be shared between, e.g., a structure's field and a
/// sequence's count without cloning the target layout.
#[derive(Debug, Clone)]
pub enum External {
    Greedy(Greedy),
    Offset(Offset),
}

impl External {
    pub fn property(&self) -> Option<&str> {
        match self {
            External::Greedy(g) => g.property.as_deref(),
            External::Offset(o) => o.property.as_deref(),
        }
    }

    pub fn replicate(&self, new_property: Option<String>) -> External {
        match self {
            External::Greedy(g) => External::Greedy(Greedy {
                property: new_property,
                ..g.clone()
            }),
            External::Offset(o) => External::Offset(Offset {
                property: new_property,
                ..o.clone()
            }),
        }
    }
}

impl ExternalNode for External {
    fn decode_at(&self, buf: &[u8], offset: usize) -> Result<Value> {
        match self {
            External::Greedy(g) => g.decode_at(buf, offset),
            External::Offset(o) => o.decode_at(buf, offset),
        }
    }

    fn encode_at(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        match self {
            External::Greedy(g) => g.encode_at(value, buf, offset),
            External::Offset(o) => o.encode_at(value, buf, offset),
        }
    }

    fn is_count(&self) -> bool {
        match self {
            External::Greedy(g) => g.is_count(),
            External::Offset(o) => o.is_count(),
        }
    }
}

/// A count or discriminator source: either a literal non-negative integer
/// fixed at construction, or a shared external layout consulted at
/// decode/encode time.
#[derive(Debug, Clone)]
pub enum CountSource {
    Fixed(u64),
    External(Rc<External>),
}

impl CountSource {
    pub fn resolve(&self, buf: &[u8], offset: usize) -> Result<u64> {
        match self {
            CountSource::Fixed(n) => Ok(*n),
            CountSource::External(ext) => ext.decode_at(buf, offset)?.as_u64(),
        }
    }

    pub fn write_resolved(&self, n: u64, buf: &mut [u8], offset: usize) -> Result<()> {
        if let CountSource::External(ext) = self {
            ext.encode_at(&Value::UInt(n), buf, offset)?;
        }
        Ok(())
    }

    pub fn fixed(&self) -> Option<u64> {
        match self {
            CountSource::Fixed(n) => Some(*n),
            CountSource::External(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greedy_count() {
        let g = Greedy::new(3);
        let buf = [0u8; 10];
        assert_eq!(g.decode_at(&buf, 1).unwrap(), Value::UInt(3));
    }

    #[test]
    fn offset_commutes_with_direct_decode() {
        use crate::numeric::{IntLayout, Signedness};
        use crate::endian::Endian;

        let target = Layout::Int(IntLayout::new(2, Endian::Little, Signedness::Unsigned));
        let offset = Offset::new(target.clone(), 3);
        let buf = [0u8, 0, 0, 0x2a, 0x00, 0x00];
        assert_eq!(
            offset.decode_at(&buf, 0).unwrap(),
            target.decode(&buf, 3).unwrap()
        );
    }
}
