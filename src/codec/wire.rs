//! On-disk value tree
//!
//! `Wire` mirrors [`Value`](super::Value) with custom values flattened to a
//! (type name, payload) pair. Decoding goes through [`WireSeed`], which
//! counts list/map nesting and fails once it passes [`MAX_DEPTH`], so a
//! malformed blob cannot recurse until the stack runs out.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{
    self, DeserializeSeed, EnumAccess, MapAccess, SeqAccess, Unexpected, VariantAccess, Visitor,
};
use serde::{Deserializer, Serialize};

/// Deepest list/map nesting accepted when encoding or decoding
pub const MAX_DEPTH: usize = 128;

/// Upper bound on capacity reserved from an untrusted element count
const MAX_PREALLOC: usize = 4096;

const VARIANTS: &[&str] = &[
    "Bool", "I8", "I16", "I32", "I64", "U8", "U16", "U32", "U64", "F32", "F64", "Str", "Bytes",
    "List", "Map", "Custom",
];

const CUSTOM_FIELDS: &[&str] = &["type_name", "payload"];

/// Variant order is the on-disk tag; append only.
#[derive(Serialize)]
pub(crate) enum Wire {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Wire>),
    Map(BTreeMap<String, Wire>),
    Custom { type_name: String, payload: Vec<u8> },
}

/// Depth-aware deserializer for [`Wire`]
pub(crate) struct WireSeed {
    depth: usize,
}

impl WireSeed {
    pub(crate) fn root() -> Self {
        Self { depth: 0 }
    }
}

fn too_deep<E: de::Error>() -> E {
    E::custom(format_args!("value nesting exceeds {} levels", MAX_DEPTH))
}

impl<'de> DeserializeSeed<'de> for WireSeed {
    type Value = Wire;

    fn deserialize<D>(self, deserializer: D) -> Result<Wire, D::Error>
    where
        D: Deserializer<'de>,
    {
        if self.depth > MAX_DEPTH {
            return Err(too_deep());
        }
        deserializer.deserialize_enum("Wire", VARIANTS, WireVisitor { depth: self.depth })
    }
}

struct WireVisitor {
    depth: usize,
}

impl<'de> Visitor<'de> for WireVisitor {
    type Value = Wire;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an encoded value")
    }

    fn visit_enum<A>(self, data: A) -> Result<Wire, A::Error>
    where
        A: EnumAccess<'de>,
    {
        let (tag, variant) = data.variant::<u32>()?;
        let child = self.depth + 1;

        let wire = match tag {
            0 => Wire::Bool(variant.newtype_variant()?),
            1 => Wire::I8(variant.newtype_variant()?),
            2 => Wire::I16(variant.newtype_variant()?),
            3 => Wire::I32(variant.newtype_variant()?),
            4 => Wire::I64(variant.newtype_variant()?),
            5 => Wire::U8(variant.newtype_variant()?),
            6 => Wire::U16(variant.newtype_variant()?),
            7 => Wire::U32(variant.newtype_variant()?),
            8 => Wire::U64(variant.newtype_variant()?),
            9 => Wire::F32(variant.newtype_variant()?),
            10 => Wire::F64(variant.newtype_variant()?),
            11 => Wire::Str(variant.newtype_variant()?),
            12 => Wire::Bytes(variant.newtype_variant()?),
            13 => Wire::List(variant.newtype_variant_seed(ListSeed { depth: child })?),
            14 => Wire::Map(variant.newtype_variant_seed(MapSeed { depth: child })?),
            15 => {
                let (type_name, payload) = variant.struct_variant(CUSTOM_FIELDS, CustomVisitor)?;
                Wire::Custom { type_name, payload }
            }
            other => {
                return Err(de::Error::invalid_value(
                    Unexpected::Unsigned(other as u64),
                    &"a value tag below 16",
                ))
            }
        };
        Ok(wire)
    }
}

struct ListSeed {
    depth: usize,
}

impl<'de> DeserializeSeed<'de> for ListSeed {
    type Value = Vec<Wire>;

    fn deserialize<D>(self, deserializer: D) -> Result<Vec<Wire>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for ListSeed {
    type Value = Vec<Wire>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of encoded values")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Vec<Wire>, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(MAX_PREALLOC));
        while let Some(item) = seq.next_element_seed(WireSeed { depth: self.depth })? {
            items.push(item);
        }
        Ok(items)
    }
}

struct MapSeed {
    depth: usize,
}

impl<'de> DeserializeSeed<'de> for MapSeed {
    type Value = BTreeMap<String, Wire>;

    fn deserialize<D>(self, deserializer: D) -> Result<BTreeMap<String, Wire>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for MapSeed {
    type Value = BTreeMap<String, Wire>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of encoded values")
    }

    fn visit_map<A>(self, mut map: A) -> Result<BTreeMap<String, Wire>, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = BTreeMap::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(WireSeed { depth: self.depth })?;
            entries.insert(key, value);
        }
        Ok(entries)
    }
}

struct CustomVisitor;

impl<'de> Visitor<'de> for CustomVisitor {
    type Value = (String, Vec<u8>);

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a custom value")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<(String, Vec<u8>), A::Error>
    where
        A: SeqAccess<'de>,
    {
        let type_name = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let payload = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        Ok((type_name, payload))
    }
}
