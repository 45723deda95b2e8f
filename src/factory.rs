//! Ergonomic constructors, one per node kind, matching the shorthand in the
//! factory surface.

use std::rc::Rc;

use crate::bytes::{Blob, CStr, Constant, Utf8};
use crate::endian::Endian;
use crate::external::{CountSource, External, Greedy, Offset};
use crate::node::Layout;
use crate::numeric::{FloatLayout, FloatWidth, IntLayout, Signedness};
use crate::sequence::Sequence;
use crate::union_::{Union, VariantLayout};
use crate::value::Value;

/// Attaches a property name to any layout by replicating it.
pub trait Named {
    fn named(self, property: impl Into<String>) -> Layout;
}

impl Named for Layout {
    fn named(self, property: impl Into<String>) -> Layout {
        self.replicate(Some(property.into()))
    }
}

macro_rules! int_factory {
    ($name:ident, $width:expr, $endian:expr, $signed:expr) => {
        pub fn $name() -> Layout {
            Layout::Int(IntLayout::new($width, $endian, $signed))
        }
    };
}

int_factory!(u8, 1, Endian::Little, Signedness::Unsigned);
int_factory!(u16be, 2, Endian::Big, Signedness::Unsigned);
int_factory!(u24be, 3, Endian::Big, Signedness::Unsigned);
int_factory!(u32be, 4, Endian::Big, Signedness::Unsigned);
int_factory!(u40be, 5, Endian::Big, Signedness::Unsigned);
int_factory!(u48be, 6, Endian::Big, Signedness::Unsigned);

int_factory!(s8, 1, Endian::Little, Signedness::Signed);
int_factory!(s16be, 2, Endian::Big, Signedness::Signed);
int_factory!(s24be, 3, Endian::Big, Signedness::Signed);
int_factory!(s32be, 4, Endian::Big, Signedness::Signed);
int_factory!(s40be, 5, Endian::Big, Signedness::Signed);
int_factory!(s48be, 6, Endian::Big, Signedness::Signed);

pub fn u8_layout() -> IntLayout {
    IntLayout::new(1, Endian::Little, Signedness::Unsigned)
}

pub fn u16(endian: Endian) -> Layout {
    Layout::Int(IntLayout::new(2, endian, Signedness::Unsigned))
}
pub fn u24(endian: Endian) -> Layout {
    Layout::Int(IntLayout::new(3, endian, Signedness::Unsigned))
}
pub fn u32(endian: Endian) -> Layout {
    Layout::Int(IntLayout::new(4, endian, Signedness::Unsigned))
}
pub fn u40(endian: Endian) -> Layout {
    Layout::Int(IntLayout::new(5, endian, Signedness::Unsigned))
}
pub fn u48(endian: Endian) -> Layout {
    Layout::Int(IntLayout::new(6, endian, Signedness::Unsigned))
}
pub fn s16(endian: Endian) -> Layout {
    Layout::Int(IntLayout::new(2, endian, Signedness::Signed))
}
pub fn s24(endian: Endian) -> Layout {
    Layout::Int(IntLayout::new(3, endian, Signedness::Signed))
}
pub fn s32(endian: Endian) -> Layout {
    Layout::Int(IntLayout::new(4, endian, Signedness::Signed))
}
pub fn s40(endian: Endian) -> Layout {
    Layout::Int(IntLayout::new(5, endian, Signedness::Signed))
}
pub fn s48(endian: Endian) -> Layout {
    Layout::Int(IntLayout::new(6, endian, Signedness::Signed))
}

pub fn nu64(endian: Endian) -> Layout {
    Layout::Int(IntLayout::new(8, endian, Signedness::Near64))
}
pub fn ns64(endian: Endian) -> Layout {
    Layout::Int(IntLayout::new(8, endian, Signedness::Near64))
}

pub fn f32(endian: Endian) -> Layout {
    Layout::Float(FloatLayout::new(FloatWidth::F32, endian))
}
pub fn f64(endian: Endian) -> Layout {
    Layout::Float(FloatLayout::new(FloatWidth::F64, endian))
}

pub fn blob(len: usize) -> Layout {
    Layout::Blob(Blob::fixed(len))
}

pub fn blob_counted(length: CountSource) -> Layout {
    Layout::Blob(Blob::external(length))
}

pub fn cstr() -> Layout {
    Layout::CStr(CStr::new())
}

pub fn utf8(max_span: Option<usize>) -> Layout {
    Layout::Utf8(Utf8::new(max_span))
}

pub fn constant(value: impl Into<Value>) -> Layout {
    Layout::Constant(Constant::new(value.into()))
}

pub fn seq(element: Layout, count: impl Into<CountSource>) -> Layout {
    Layout::Sequence(Box::new(Sequence::new(element, count.into())))
}

pub fn seq_fixed(element: Layout, count: usize) -> Layout {
    seq(element, CountSource::Fixed(count as u64))
}

pub fn offset(target: Layout, k: i64) -> CountSource {
    CountSource::External(Rc::new(External::Offset(Offset::new(target, k))))
}

pub fn offset_layout(target: Layout, k: i64) -> Layout {
    Layout::Offset(Offset::new(target, k))
}

pub fn greedy(element_span: usize) -> CountSource {
    CountSource::External(Rc::new(External::Greedy(Greedy::new(element_span))))
}

pub fn greedy_layout(element_span: usize) -> Layout {
    Layout::Greedy(Greedy::new(element_span))
}

/// Wraps a built union as a placeable layout node, e.g. to use as a named
/// structure field via `.named(...)`.
pub fn union(union: Rc<Union>) -> Layout {
    Layout::Union(union, None)
}

/// Wraps a single variant as a placeable layout node, e.g. to decode/encode
/// one alternative outside its owning union's discriminator dispatch.
pub fn variant(variant: Rc<VariantLayout>) -> Layout {
    Layout::Variant(variant, None)
}

impl From<usize> for CountSource {
    fn from(value: usize) -> Self {
        CountSource::Fixed(value as u64)
    }
}
