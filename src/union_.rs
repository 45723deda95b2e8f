//! Tagged unions: discriminator sources, variant registry, default fallback
//! and source-variant inference.

use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::{LayoutError, Result};
use crate::external::{External, ExternalNode};
use crate::node::Layout;
use crate::numeric::IntLayout;
use crate::value::Value;

/// A user-supplied, opaque discriminator: used verbatim, the library makes
/// no assumption about where the tag physically lives.
pub trait CustomDiscriminator: fmt::Debug {
    fn read(&self, buf: &[u8], offset: usize) -> Result<i64>;
    fn write(&self, tag: i64, buf: &mut [u8], offset: usize) -> Result<()>;
}

#[derive(Debug, Clone)]
pub enum Discriminator {
    /// Physically stored at the union's start.
    Prefix(IntLayout),
    /// Lives elsewhere, referenced through an external, `is_count()` layout.
    External(Rc<External>),
    /// Opaque user-supplied source.
    Custom(Rc<dyn CustomDiscriminator>),
}

impl Discriminator {
    pub fn property(&self) -> &str {
        match self {
            Discriminator::Prefix(i) => i.property.as_deref().unwrap_or("variant"),
            Discriminator::External(e) => e.property().unwrap_or("variant"),
            Discriminator::Custom(_) => "variant",
        }
    }

    pub fn is_prefix(&self) -> bool {
        matches!(self, Discriminator::Prefix(_))
    }

    pub fn prefix_span(&self) -> i64 {
        match self {
            Discriminator::Prefix(i) => i.span(),
            _ => 0,
        }
    }

    pub fn read(&self, buf: &[u8], offset: usize) -> Result<i64> {
        match self {
            Discriminator::Prefix(i) => i.decode(buf, offset)?.as_i64(),
            Discriminator::External(e) => e.decode_at(buf, offset)?.as_i64(),
            Discriminator::Custom(c) => c.read(buf, offset),
        }
    }

    pub fn write(&self, tag: i64, buf: &mut [u8], offset: usize) -> Result<()> {
        match self {
            Discriminator::Prefix(i) => {
                i.encode(&Value::Int(tag), buf, offset)?;
            }
            Discriminator::External(e) => {
                e.encode_at(&Value::Int(tag), buf, offset)?;
            }
            Discriminator::Custom(c) => c.write(tag, buf, offset)?,
        }
        Ok(())
    }
}

/// One alternative interpretation of a union's payload.
pub struct VariantLayout {
    pub tag: i64,
    pub inner: Option<Box<Layout>>,
    pub property: String,
    union: Weak<Union>,
}

impl fmt::Debug for VariantLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantLayout")
            .field("tag", &self.tag)
            .field("property", &self.property)
            .finish_non_exhaustive()
    }
}

impl VariantLayout {
    fn union(&self) -> Rc<Union> {
        self.union
            .upgrade()
            .expect("variant layout outlived its union")
    }

    pub fn span(&self) -> Option<i64> {
        let prefix = self.union().discriminator.prefix_span();
        match &self.inner {
            Some(inner) => inner.span().map(|s| s + prefix),
            None => Some(prefix),
        }
    }

    pub fn span_of(&self, buf: &[u8], offset: usize) -> Result<i64> {
        let union = self.union();
        let prefix = union.discriminator.prefix_span();
        match &self.inner {
            Some(inner) => Ok(prefix + inner.span_of(buf, offset + prefix as usize)?),
            None => Ok(prefix),
        }
    }

    /// Pure-tag variants (no inner layout) decode to an empty record.
    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<Value> {
        let union = self.union();
        let prefix = union.discriminator.prefix_span() as usize;
        let mut record = IndexMap::new();
        if let Some(inner) = &self.inner {
            let decoded = inner.decode(buf, offset + prefix)?;
            record.insert(self.property.clone(), decoded);
        }
        Ok(Value::Map(record))
    }

    pub fn encode(&self, value: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        let union = self.union();
        let prefix = union.discriminator.prefix_span() as usize;
        union.discriminator.write(self.tag, buf, offset)?;
        let inner_span = match &self.inner {
            Some(inner) => {
                let map = value.as_map();
                let field = map.and_then(|m| m.get(&self.property));
                match field {
                    Some(field_value) => inner.encode(field_value, buf, offset + prefix)?,
                    None => {
                        return Err(LayoutError::Type {
                            expected: "variant payload present",
                            found: "missing variant field",
                        })
                    }
                }
            }
            None => 0,
        };
        Ok(prefix + inner_span)
    }
}

/// Which alternative a union should use for a given encode source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantChoice {
    Default,
    Tag(i64),
}

type Chooser = dyn Fn(&Union, &Value) -> Result<VariantChoice>;

pub struct Union {
    pub name: Option<String>,
    pub discriminator: Discriminator,
    pub default_layout: Option<Box<Layout>>,
    pub default_content_property: String,
    variants: IndexMap<i64, Rc<VariantLayout>>,
    chooser: Rc<Chooser>,
}

impl fmt::Debug for Union {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Union")
            .field("name", &self.name)
            .field("discriminator", &self.discriminator)
            .field("variants", &self.variants.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Union {
    pub fn span(&self) -> Option<i64> {
        self.default_layout
            .as_ref()
            .and_then(|d| d.span())
            .map(|s| s + self.discriminator.prefix_span())
    }

    pub fn span_of(&self, buf: &[u8], offset: usize) -> Result<i64> {
        if let Some(span) = self.span() {
            return Ok(span);
        }
        let tag = self.discriminator.read(buf, offset)?;
        let variant = self.variants.get(&tag).ok_or(LayoutError::UnknownVariant { tag })?;
        variant.span_of(buf, offset)
    }

    pub fn variant(&self, tag: i64) -> Option<&Rc<VariantLayout>> {
        self.variants.get(&tag)
    }

    pub fn variants(&self) -> impl Iterator<Item = &Rc<VariantLayout>> {
        self.variants.values()
    }

    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<Value> {
        let tag = self.discriminator.read(buf, offset)?;
        if let Some(variant) = self.variants.get(&tag) {
            return variant.decode(buf, offset);
        }
        match &self.default_layout {
            Some(default) => {
                let prefix = self.discriminator.prefix_span() as usize;
                let mut record = IndexMap::new();
                record.insert(self.discriminator.property().to_owned(), Value::Int(tag));
                record.insert(
                    self.default_content_property.clone(),
                    default.decode(buf, offset + prefix)?,
                );
                Ok(Value::Map(record))
            }
            None => Err(LayoutError::UnknownVariant { tag }),
        }
    }

    /// Encodes through the default-layout path only: writes the
    /// discriminator (if prefixed) then the default layout, reading the
    /// source's discriminator and content properties.
    pub fn encode_default(&self, src: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        let default = self
            .default_layout
            .as_ref()
            .ok_or_else(|| LayoutError::schema("union has no default layout"))?;
        let map = src.as_map().ok_or(LayoutError::Type {
            expected: "map",
            found: "non-map value",
        })?;
        let tag = map
            .get(self.discriminator.property())
            .ok_or(LayoutError::Type {
                expected: "discriminator property present",
                found: "missing discriminator property",
            })?
            .as_i64()?;
        let content = map
            .get(&self.default_content_property)
            .ok_or(LayoutError::Type {
                expected: "default content property present",
                found: "missing default content property",
            })?;
        self.discriminator.write(tag, buf, offset)?;
        let prefix = self.discriminator.prefix_span() as usize;
        let n = default.encode(content, buf, offset + prefix)?;
        Ok(prefix + n)
    }

    /// Infers the right variant (or the default path) from `src` and
    /// encodes through it.
    pub fn encode(&self, src: &Value, buf: &mut [u8], offset: usize) -> Result<usize> {
        match self.get_source_variant(src)? {
            VariantChoice::Default => self.encode_default(src, buf, offset),
            VariantChoice::Tag(tag) => {
                let variant = self
                    .variants
                    .get(&tag)
                    .ok_or(LayoutError::UnknownVariant { tag })?;
                variant.encode(src, buf, offset)
            }
        }
    }

    pub fn get_source_variant(&self, src: &Value) -> Result<VariantChoice> {
        (self.chooser)(self, src)
    }
}

/// Default variant-inference rule, exposed free-standing so a replacement
/// chooser can delegate to it.
pub fn default_source_variant(union: &Union, src: &Value) -> Result<VariantChoice> {
    let Some(map) = src.as_map() else {
        return Err(LayoutError::Type {
            expected: "map",
            found: "non-map value",
        });
    };
    let discr_prop = union.discriminator.property();
    let has_discr = map.contains_key(discr_prop);
    let has_content = map.contains_key(&union.default_content_property);

    if has_discr && has_content && union.default_layout.is_some() {
        return Ok(VariantChoice::Default);
    }
    if has_discr {
        if let Ok(tag) = map[discr_prop].as_i64() {
            if let Some(variant) = union.variants.get(&tag) {
                if variant.inner.is_none() || map.contains_key(&variant.property) {
                    return Ok(VariantChoice::Tag(tag));
                }
            }
        }
    }
    // Rule 3 only rescues a source that lacks the discriminator property
    // entirely; one that has it but with a value matching no registered
    // tag falls through to rule 4 instead of being guessed at here.
    if has_discr {
        return Err(LayoutError::AmbiguousVariant);
    }
    let matches: Vec<i64> = union
        .variants
        .values()
        .filter(|v| map.contains_key(&v.property))
        .map(|v| v.tag)
        .collect();
    if matches.len() == 1 {
        return Ok(VariantChoice::Tag(matches[0]));
    }
    Err(LayoutError::AmbiguousVariant)
}

pub struct UnionBuilder {
    name: Option<String>,
    discriminator: Discriminator,
    default_layout: Option<Layout>,
    default_content_property: String,
    pending_variants: Vec<(i64, Option<Layout>, String)>,
    chooser: Option<Rc<Chooser>>,
}

impl UnionBuilder {
    pub fn new(discriminator: Discriminator, name: Option<String>) -> Self {
        UnionBuilder {
            name,
            discriminator,
            default_layout: None,
            default_content_property: "content".to_owned(),
            pending_variants: Vec::new(),
            chooser: None,
        }
    }

    pub fn default_layout(mut self, layout: Layout) -> Self {
        self.default_layout = Some(layout);
        self
    }

    pub fn default_content_property(mut self, name: impl Into<String>) -> Self {
        self.default_content_property = name.into();
        self
    }

    pub fn add_variant(
        mut self,
        tag: i64,
        inner: Option<Layout>,
        property: impl Into<String>,
    ) -> Self {
        self.pending_variants.push((tag, inner, property.into()));
        self
    }

    pub fn chooser(
        mut self,
        chooser: impl Fn(&Union, &Value) -> Result<VariantChoice> + 'static,
    ) -> Self {
        self.chooser = Some(Rc::new(chooser));
        self
    }

    pub fn build(self) -> Result<Rc<Union>> {
        if let Discriminator::External(e) = &self.discriminator {
            if !e.is_count() {
                return Err(LayoutError::schema(
                    "union discriminator external layout must be is_count()",
                ));
            }
        }
        if let Some(default) = &self.default_layout {
            if default.span().is_none() {
                return Err(LayoutError::schema("union default layout must be fixed-span"));
            }
        }
        for (_, inner, property) in &self.pending_variants {
            if let Some(default) = &self.default_layout {
                if property == &self.default_content_property {
                    return Err(LayoutError::schema(format!(
                        "variant property {property:?} collides with the default content property"
                    )));
                }
                let prefix = self.discriminator.prefix_span();
                if let Some(inner_span) = inner.as_ref().and_then(Layout::span) {
                    if inner_span > default.span().unwrap() - prefix {
                        return Err(LayoutError::schema(format!(
                            "variant {property:?} inner span {inner_span} exceeds default layout budget"
                        )));
                    }
                }
            }
        }

        let chooser = self
            .chooser
            .unwrap_or_else(|| Rc::new(default_source_variant));
        let pending_variants = self.pending_variants;
        let default_layout = self.default_layout.map(Box::new);
        let discriminator = self.discriminator;
        let default_content_property = self.default_content_property;
        let name = self.name;

        Ok(Rc::new_cyclic(|weak: &Weak<Union>| {
            let variants = pending_variants
                .into_iter()
                .map(|(tag, inner, property)| {
                    (
                        tag,
                        Rc::new(VariantLayout {
                            tag,
                            inner: inner.map(Box::new),
                            property,
                            union: weak.clone(),
                        }),
                    )
                })
                .collect::<IndexMap<_, _>>();
            Union {
                name,
                discriminator,
                default_layout,
                default_content_property,
                variants,
                chooser,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endian::Endian;
    use crate::factory as f;

    fn tagged_union() -> Rc<Union> {
        let discr = Discriminator::Prefix(f::u8_layout());
        UnionBuilder::new(discr, None)
            .add_variant(0, Some(f::u32(Endian::Little)), "a")
            .add_variant(
                1,
                Some(Layout::Structure(Rc::new(
                    crate::structure::StructureBuilder::new(Some("pos".into()))
                        .field(f::u16(Endian::Little).named("x"))
                        .field(f::u16(Endian::Little).named("y"))
                        .build()
                        .unwrap(),
                ))),
                "pos",
            )
            .build()
            .unwrap()
    }

    #[test]
    fn decode_variant_1() {
        let union = tagged_union();
        let bytes = [0x01, 0x0a, 0x00, 0x14, 0x00];
        let decoded = union.decode(&bytes, 0).unwrap();
        let map = decoded.as_map().unwrap();
        let pos = map["pos"].as_map().unwrap();
        assert_eq!(pos["x"], Value::UInt(10));
        assert_eq!(pos["y"], Value::UInt(20));
    }

    #[test]
    fn encode_inferred_variant_0() {
        let union = tagged_union();
        let mut record = IndexMap::new();
        record.insert("a".to_owned(), Value::UInt(0xDEADBEEF));
        let mut buf = [0u8; 5];
        let n = union.encode(&Value::Map(record), &mut buf, 0).unwrap();
        assert_eq!(n, 5);
        assert_eq!(buf, [0x00, 0xef, 0xbe, 0xad, 0xde]);
    }

    #[test]
    fn unregistered_tag_without_default_fails() {
        let union = tagged_union();
        let bytes = [0x02, 0, 0, 0, 0];
        assert!(union.decode(&bytes, 0).is_err());
    }

    #[test]
    fn discriminator_present_with_unknown_tag_is_ambiguous_not_guessed() {
        let union = tagged_union();
        let mut record = IndexMap::new();
        // "variant" (the discriminator property) names a tag that isn't
        // registered, but "a" alone would otherwise uniquely match variant
        // 0's property - rule 3 must not rescue this, since the source
        // does carry a discriminator property.
        record.insert("variant".to_owned(), Value::Int(99));
        record.insert("a".to_owned(), Value::UInt(1));
        let choice = default_source_variant(&union, &Value::Map(record));
        assert!(matches!(choice, Err(LayoutError::AmbiguousVariant)));
    }

    #[test]
    fn encode_with_chooser_returning_unregistered_tag_errors_instead_of_panicking() {
        let union = UnionBuilder::new(Discriminator::Prefix(f::u8_layout()), None)
            .add_variant(0, Some(f::u32(Endian::Little)), "a")
            .chooser(|_union, _src| Ok(VariantChoice::Tag(42)))
            .build()
            .unwrap();
        let mut buf = [0u8; 5];
        let err = union.encode(&Value::map(), &mut buf, 0);
        assert!(matches!(err, Err(LayoutError::UnknownVariant { tag: 42 })));
    }
}
