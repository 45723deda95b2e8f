//! Repetition of one element layout, fixed or externally counted.

use crate::error::{LayoutError, Result};
use crate::external::CountSource;
use crate::node::Layout;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Sequence {
    pub property: Option<String>,
    pub element: Box<Layout>,
    pub count: CountSource,
}

impl Sequence {
    pub fn new(element: Layout, count: CountSource) -> Self {
        Sequence {
            property: None,
            element: Box::new(element),
            count,
        }
    }

    /// `count × element_span` when both the count and the element are
    /// fixed; `None` otherwise (variable-span).
    pub fn span(&self) -> Option<i64> {
        match (self.count.fixed(), self.element.span()) {
            (Some(count), Some(element_span)) => Some(count as i64 * element_span),
            _ => None,
        }
    }

    pub fn span_of(&self, buf: &[u8], offset: usize) -> Result<i64> {
        if let Some(span) = self.span() {
            return Ok(span);
        }
        let count = self.count.resolve(buf, offset)?;
        if let Some(element_span) = self.element.span() {
            return Ok(count as i64 * element_span);
        }
        let mut running = 0i64;
        for _ in 0..count {
            running += self.element.span_of(buf, offset + running as usize)?;
        }
        Ok(running)
    }

    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<Value> {
        let count = self.count.resolve(buf, offset)?;
        let mut items = Vec::with_capacity(count as usize);
        let mut running = 0usize;
        for _ in 0..count {
            let item_offset = offset + running;
            let item = self.element.decode(buf, item_offset)?;
            running += self.element.span_of(buf, item_offset)? as usize;
            items.push(item);
        }
        Ok(Value::Seq(items))
    }

    /// Writes `min(count, src.len())` elements when `count` is fixed;
    /// drops any extra source elements silently (documented open question:
    /// a strict mode could surface a range error here instead). Missing
    /// elements, when `src` is shorter than a fixed count, leave the
    /// corresponding buffer bytes untouched. When the count is external,
    /// every source element is written and the resolved length is then
    /// written through the external node, outside the returned span.
    pub fn encode(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        let src = value.as_seq().ok_or(LayoutError::Type {
            expected: "sequence",
            found: "non-sequence value",
        })?;
        let to_write = match self.count.fixed() {
            Some(fixed) => src.len().min(fixed as usize),
            None => src.len(),
        };
        let mut running = 0usize;
        for item in &src[..to_write] {
            let item_offset = offset + running;
            running += self.element.encode(item, buf, item_offset)?;
        }
        if self.count.fixed().is_none() {
            self.count
                .write_resolved(src.len() as u64, buf, offset)?;
        }
        // Fixed count and fixed element span together make this a
        // fixed-span node (see `span`), so the bytes-written result must
        // always equal that span, not just what was actually copied - a
        // `src` shorter than `fixed` still consumes the whole span, with
        // the missing elements' bytes left untouched.
        if let Some(total_span) = self.span() {
            return Ok(total_span as usize);
        }
        Ok(running)
    }
}
