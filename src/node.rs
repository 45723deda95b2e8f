//! The polymorphic layout tree: a closed sum type over every node kind, with
//! the base contract (`decode`, `encode`, `span_of`, `replicate`, ...)
//! dispatched by a single `match`.

use std::rc::Rc;

use crate::bitstruct::BitStructure;
use crate::bytes::{Blob, CStr, Constant, Utf8};
use crate::error::{LayoutError, Result};
use crate::external::{External, ExternalNode, Greedy, Offset};
use crate::numeric::{FloatLayout, IntLayout};
use crate::sequence::Sequence;
use crate::structure::Structure;
use crate::union_::{Union, VariantLayout};
use crate::value::Value;

/// Every layout node kind. Containers that need shared ownership (because
/// they're referenced both from the tree and from a back-reference, or
/// because cloning the whole subtree would be wasteful) are `Rc`-wrapped;
/// everything else is held by value so `Layout` itself stays `Clone`.
#[derive(Clone)]
pub enum Layout {
    Int(IntLayout),
    Float(FloatLayout),
    Blob(Blob),
    CStr(CStr),
    Utf8(Utf8),
    Constant(Constant),
    Greedy(Greedy),
    Offset(Offset),
    Structure(Rc<Structure>),
    Sequence(Box<Sequence>),
    BitStructure(Rc<BitStructure>),
    /// The field name under which this union is placed, held alongside the
    /// `Rc` rather than inside `Union` itself, so `replicate` can rename it
    /// with a cheap `Rc` clone instead of rebuilding the `Weak` back-
    /// reference cycle every variant holds to its union.
    Union(Rc<Union>, Option<String>),
    Variant(Rc<VariantLayout>, Option<String>),
}

impl From<Rc<Union>> for Layout {
    fn from(union: Rc<Union>) -> Layout {
        Layout::Union(union, None)
    }
}

impl From<Rc<VariantLayout>> for Layout {
    fn from(variant: Rc<VariantLayout>) -> Layout {
        Layout::Variant(variant, None)
    }
}

impl Layout {
    pub fn property(&self) -> Option<&str> {
        match self {
            Layout::Int(i) => i.property.as_deref(),
            Layout::Float(f) => f.property.as_deref(),
            Layout::Blob(b) => b.property.as_deref(),
            Layout::CStr(c) => c.property.as_deref(),
            Layout::Utf8(u) => u.property.as_deref(),
            Layout::Constant(c) => c.property.as_deref(),
            Layout::Greedy(g) => g.property.as_deref(),
            Layout::Offset(o) => o.property.as_deref(),
            Layout::Structure(s) => s.property.as_deref(),
            Layout::Sequence(s) => s.property.as_deref(),
            Layout::BitStructure(b) => b.property.as_deref(),
            Layout::Union(_, property) => property.as_deref(),
            Layout::Variant(_, property) => property.as_deref(),
        }
    }

    /// `Some(span)` if fixed-span; `None` if the span depends on a buffer.
    pub fn span(&self) -> Option<i64> {
        match self {
            Layout::Int(i) => Some(i.span()),
            Layout::Float(f) => Some(f.span()),
            Layout::Blob(b) => b.span(),
            Layout::CStr(_) => None,
            Layout::Utf8(_) => None,
            Layout::Constant(_) => Some(0),
            Layout::Greedy(_) => Some(0),
            Layout::Offset(_) => Some(0),
            Layout::Structure(s) => s.span(),
            Layout::Sequence(s) => s.span(),
            Layout::BitStructure(b) => Some(b.span()),
            Layout::Union(u, _) => u.span(),
            Layout::Variant(v, _) => v.span(),
        }
    }

    /// True iff this layout decodes to a non-negative integer usable as a
    /// count/length/discriminator. Plain integer leaves qualify directly
    /// (an [`Offset`](crate::external::Offset) wrapping one is the common
    /// way to source a count from elsewhere); [`Greedy`] always qualifies;
    /// an [`Offset`] otherwise mirrors its target's status.
    pub fn is_count(&self) -> bool {
        match self {
            Layout::Int(_) => true,
            Layout::Greedy(g) => g.is_count(),
            Layout::Offset(o) => o.is_count(),
            _ => false,
        }
    }

    pub fn span_of(&self, buf: &[u8], offset: usize) -> Result<i64> {
        match self {
            Layout::Int(i) => Ok(i.span()),
            Layout::Float(f) => Ok(f.span()),
            Layout::Blob(b) => b.span_of(buf, offset),
            Layout::CStr(c) => c.span_of(buf, offset),
            Layout::Utf8(u) => u.span_of(buf, offset),
            Layout::Constant(_) => Ok(0),
            Layout::Greedy(_) => Ok(0),
            Layout::Offset(_) => Ok(0),
            Layout::Structure(s) => s.span_of(buf, offset),
            Layout::Sequence(s) => s.span_of(buf, offset),
            Layout::BitStructure(b) => Ok(b.span()),
            Layout::Union(u, _) => u.span_of(buf, offset),
            Layout::Variant(v, _) => v.span_of(buf, offset),
        }
    }

    /// Like [`Layout::span_of`], but fails with
    /// [`LayoutError::UnresolvedSpan`] instead of requiring a buffer when
    /// the node turns out to be variable-span and none was given.
    pub fn span_of_opt(&self, buf: Option<&[u8]>, offset: usize) -> Result<i64> {
        if let Some(span) = self.span() {
            return Ok(span);
        }
        match buf {
            Some(buf) => self.span_of(buf, offset),
            None => Err(LayoutError::UnresolvedSpan {
                property: self.property().map(str::to_owned),
            }),
        }
    }

    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<Value> {
        match self {
            Layout::Int(i) => i.decode(buf, offset),
            Layout::Float(f) => f.decode(buf, offset),
            Layout::Blob(b) => b.decode(buf, offset),
            Layout::CStr(c) => c.decode(buf, offset),
            Layout::Utf8(u) => u.decode(buf, offset),
            Layout::Constant(c) => Ok(c.decode()),
            Layout::Greedy(g) => g.decode_at(buf, offset),
            Layout::Offset(o) => o.decode_at(buf, offset),
            Layout::Structure(s) => s.decode(buf, offset),
            Layout::Sequence(s) => s.decode(buf, offset),
            Layout::BitStructure(b) => b.decode(buf, offset),
            Layout::Union(u, _) => u.decode(buf, offset),
            Layout::Variant(v, _) => v.decode(buf, offset),
        }
    }

    pub fn encode(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        match self {
            Layout::Int(i) => i.encode(value, buf, offset),
            Layout::Float(f) => f.encode(value, buf, offset),
            Layout::Blob(b) => b.encode(value, buf, offset),
            Layout::CStr(c) => c.encode(value, buf, offset),
            Layout::Utf8(u) => u.encode(value, buf, offset),
            Layout::Constant(c) => Ok(c.encode()),
            Layout::Greedy(g) => g.encode_at(value, buf, offset),
            Layout::Offset(o) => o.encode_at(value, buf, offset),
            Layout::Structure(s) => s.encode(value, buf, offset),
            Layout::Sequence(s) => s.encode(value, buf, offset),
            Layout::BitStructure(b) => b.encode(value, buf, offset),
            Layout::Union(u, _) => u.encode(value, buf, offset),
            Layout::Variant(v, _) => v.encode(value, buf, offset),
        }
    }

    /// Shallow clone with a new property name. Containers keep their
    /// children; only the top node's property changes.
    pub fn replicate(&self, new_property: Option<String>) -> Layout {
        match self {
            Layout::Int(i) => Layout::Int(IntLayout {
                property: new_property,
                ..i.clone()
            }),
            Layout::Float(f) => Layout::Float(FloatLayout {
                property: new_property,
                ..f.clone()
            }),
            Layout::Blob(b) => Layout::Blob(Blob {
                property: new_property,
                ..b.clone()
            }),
            Layout::CStr(c) => Layout::CStr(CStr {
                property: new_property,
                ..c.clone()
            }),
            Layout::Utf8(u) => Layout::Utf8(Utf8 {
                property: new_property,
                ..u.clone()
            }),
            Layout::Constant(c) => Layout::Constant(Constant {
                property: new_property,
                ..c.clone()
            }),
            Layout::Greedy(g) => Layout::Greedy(Greedy {
                property: new_property,
                ..g.clone()
            }),
            Layout::Offset(o) => Layout::Offset(Offset {
                property: new_property,
                ..o.clone()
            }),
            // Containers bound through Rc are replicated by wrapping a
            // fresh instance with the changed property; children are
            // shared (Rc clone of the same field list would be wrong if we
            // mutated in place, so we rebuild the outer shell only).
            Layout::Structure(s) => Layout::Structure(Rc::new(Structure {
                property: new_property,
                ..(**s).clone()
            })),
            Layout::Sequence(s) => Layout::Sequence(Box::new(Sequence {
                property: new_property,
                ..(**s).clone()
            })),
            Layout::BitStructure(b) => Layout::BitStructure(Rc::new(BitStructure {
                property: new_property,
                ..(**b).clone()
            })),
            // The union/variant itself is shared unchanged (its `Weak`
            // back-reference cycle is never touched); only the placement
            // name travelling alongside the `Rc` changes.
            Layout::Union(u, _) => Layout::Union(u.clone(), new_property),
            Layout::Variant(v, _) => Layout::Variant(v.clone(), new_property),
        }
    }

    /// Pairs positional `values` with named children in order, skipping
    /// unnamed children, ignoring extras. Only meaningful for
    /// record-producing nodes; returns `None` otherwise.
    pub fn from_array(&self, values: &[Value]) -> Option<Value> {
        match self {
            Layout::Structure(s) => Some(s.from_array(values)),
            Layout::BitStructure(b) => Some(b.from_array(values)),
            Layout::Variant(v, _) => match &v.inner {
                Some(inner) => inner.from_array(values),
                None => Some(Value::map()),
            },
            _ => None,
        }
    }

    pub fn make_destination_object(&self) -> Value {
        Value::map()
    }
}

impl std::fmt::Debug for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Layout({:?})", self.property())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endian::Endian;
    use crate::factory::{self as f, Named};
    use crate::structure::StructureBuilder;
    use crate::union_::{Discriminator, UnionBuilder};
    use indexmap::IndexMap;

    fn tagged_union() -> Rc<Union> {
        let discr = Discriminator::Prefix(IntLayout::new(1, Endian::Little, crate::numeric::Signedness::Unsigned));
        UnionBuilder::new(discr, None)
            .add_variant(0, Some(f::u32(Endian::Little)), "a")
            .build()
            .unwrap()
    }

    #[test]
    fn replicate_renames_a_union_without_rebuilding_it() {
        let layout = Layout::from(tagged_union());
        assert_eq!(layout.property(), None);
        let named = layout.named("payload");
        assert_eq!(named.property(), Some("payload"));
    }

    #[test]
    fn a_named_union_field_round_trips_inside_a_structure() {
        let union_field = Layout::from(tagged_union()).named("payload");
        let s = StructureBuilder::new(None)
            .field(f::u8().named("prefix"))
            .field(union_field)
            .build()
            .unwrap();

        let mut record = IndexMap::new();
        record.insert("prefix".to_owned(), Value::UInt(7));
        let mut inner = IndexMap::new();
        inner.insert("a".to_owned(), Value::UInt(0xDEADBEEF));
        record.insert("payload".to_owned(), Value::Map(inner));

        let mut buf = [0u8; 6];
        let n = s.encode(&Value::Map(record), &mut buf, 0).unwrap();
        assert_eq!(n, 6);
        assert_eq!(buf, [0x07, 0x00, 0xef, 0xbe, 0xad, 0xde]);

        let decoded = s.decode(&buf, 0).unwrap();
        let map = decoded.as_map().unwrap();
        assert_eq!(map["prefix"], Value::UInt(7));
        let payload = map["payload"].as_map().unwrap();
        assert_eq!(payload["a"], Value::UInt(0xDEADBEEF));
    }
}
