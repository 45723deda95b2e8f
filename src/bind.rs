//! Couples a user-defined value type with a layout for symmetric
//! construct/destructure, playing the role the source library's
//! `bindConstructorLayout` helper does.

use std::marker::PhantomData;

use crate::error::Result;
use crate::node::Layout;
use crate::value::Value;

/// Binds `T` to `layout`: `decode` produces a `T` (via `TryFrom<Value>`),
/// `encode` accepts a `T` (via `Into<Value>`).
///
/// This plays the role of the "bound constructor" in the node base contract:
/// rather than rewiring a shared mutable registry on the layout (there is
/// none - `Layout` is immutable once built), the binding is a thin typed
/// wrapper held by the caller.
pub struct Bind<T> {
    pub layout: Layout,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Bind<T>
where
    T: TryFrom<Value, Error = crate::error::LayoutError> + Clone + Into<Value>,
{
    pub fn new(layout: Layout) -> Self {
        Bind {
            layout,
            _marker: PhantomData,
        }
    }

    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<T> {
        let value = self.layout.decode(buf, offset)?;
        T::try_from(value)
    }

    pub fn encode(&self, value: &T, buf: &mut [u8], offset: usize) -> Result<usize> {
        let as_value = value.clone().into();
        self.layout.encode(&as_value, buf, offset)
    }

    pub fn span_of(&self, buf: &[u8], offset: usize) -> Result<i64> {
        self.layout.span_of(buf, offset)
    }
}
