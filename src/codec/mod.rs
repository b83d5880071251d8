//! Codec Module
//!
//! Converts [`Value`]s to opaque byte sequences and back.
//!
//! ## Responsibilities
//! - Round-trip fidelity for every supported value shape
//! - Registry of user types that may appear as custom values
//! - Reject malformed, truncated or unknown input with a decoding error
//!
//! ## Encoded Format
//! A value is written as a bincode-encoded tagged tree (fixed-width
//! integers, little endian, no trailing bytes allowed):
//! ```text
//! ┌─────────┬──────────────────────────────────────────────┐
//! │ Tag (4) │ Body                                         │
//! └─────────┴──────────────────────────────────────────────┘
//!   scalars : the scalar itself
//!   str     : len (8) + utf-8 bytes
//!   bytes   : len (8) + bytes
//!   list    : count (8) + encoded children
//!   map     : count (8) + (key, encoded child) pairs
//!   custom  : type name (len + utf-8) + payload (len + bincode of T)
//! ```
//!
//! Lists and maps may nest at most [`MAX_DEPTH`] levels. Deeper values fail
//! to encode, and deeper input fails to decode.

mod registry;
mod value;
mod wire;

pub use registry::TypeRegistry;
pub use value::{CustomData, CustomValue, Value};
pub use wire::MAX_DEPTH;

use bincode::Options;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

use wire::{Wire, WireSeed};

/// bincode configuration shared by values and custom payloads
pub(crate) fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

/// Value serializer with a registry of user types
///
/// Thread-safe: registration takes a write lock, encoding and decoding
/// share a read lock.
#[derive(Default)]
pub struct Codec {
    registry: RwLock<TypeRegistry>,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user type under a stable name
    ///
    /// Must happen before any value of that type is encoded or decoded.
    pub fn register<T>(&self, name: &str) -> Result<()>
    where
        T: CustomData + Serialize + DeserializeOwned,
    {
        self.registry.write().register::<T>(name)
    }

    /// Whether a type name has been registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.read().contains(name)
    }

    /// Encode a value to bytes
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let registry = self.registry.read();
        let wire = to_wire(value, &registry, 0)?;
        wire_options()
            .serialize(&wire)
            .map_err(|e| StoreError::Encoding(e.to_string()))
    }

    /// Decode bytes produced by [`encode`](Self::encode)
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let wire = wire_options()
            .deserialize_seed(WireSeed::root(), bytes)
            .map_err(|e| StoreError::Decoding(e.to_string()))?;
        let registry = self.registry.read();
        from_wire(wire, &registry)
    }
}

fn to_wire(value: &Value, registry: &TypeRegistry, depth: usize) -> Result<Wire> {
    if depth > MAX_DEPTH {
        return Err(StoreError::Encoding(format!(
            "value nesting exceeds {} levels",
            MAX_DEPTH
        )));
    }

    let wire = match value {
        Value::Bool(v) => Wire::Bool(*v),
        Value::I8(v) => Wire::I8(*v),
        Value::I16(v) => Wire::I16(*v),
        Value::I32(v) => Wire::I32(*v),
        Value::I64(v) => Wire::I64(*v),
        Value::U8(v) => Wire::U8(*v),
        Value::U16(v) => Wire::U16(*v),
        Value::U32(v) => Wire::U32(*v),
        Value::U64(v) => Wire::U64(*v),
        Value::F32(v) => Wire::F32(*v),
        Value::F64(v) => Wire::F64(*v),
        Value::Str(v) => Wire::Str(v.clone()),
        Value::Bytes(v) => Wire::Bytes(v.clone()),
        Value::List(items) => Wire::List(
            items
                .iter()
                .map(|item| to_wire(item, registry, depth + 1))
                .collect::<Result<_>>()?,
        ),
        Value::Map(map) => Wire::Map(
            map.iter()
                .map(|(k, v)| -> Result<(String, Wire)> { Ok((k.clone(), to_wire(v, registry, depth + 1)?)) })
                .collect::<Result<_>>()?,
        ),
        Value::Custom(custom) => {
            let registration = registry.by_type(custom.type_id()).ok_or_else(|| {
                StoreError::Encoding(format!("unregistered custom type: {:?}", custom))
            })?;
            Wire::Custom {
                type_name: registration.name.clone(),
                payload: (registration.encode)(custom.as_any())?,
            }
        }
    };
    Ok(wire)
}

fn from_wire(wire: Wire, registry: &TypeRegistry) -> Result<Value> {
    let value = match wire {
        Wire::Bool(v) => Value::Bool(v),
        Wire::I8(v) => Value::I8(v),
        Wire::I16(v) => Value::I16(v),
        Wire::I32(v) => Value::I32(v),
        Wire::I64(v) => Value::I64(v),
        Wire::U8(v) => Value::U8(v),
        Wire::U16(v) => Value::U16(v),
        Wire::U32(v) => Value::U32(v),
        Wire::U64(v) => Value::U64(v),
        Wire::F32(v) => Value::F32(v),
        Wire::F64(v) => Value::F64(v),
        Wire::Str(v) => Value::Str(v),
        Wire::Bytes(v) => Value::Bytes(v),
        Wire::List(items) => Value::List(
            items
                .into_iter()
                .map(|item| from_wire(item, registry))
                .collect::<Result<_>>()?,
        ),
        Wire::Map(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| -> Result<(String, Value)> { Ok((k, from_wire(v, registry)?)) })
                .collect::<Result<_>>()?,
        ),
        Wire::Custom { type_name, payload } => {
            let registration = registry.by_name(&type_name).ok_or_else(|| {
                StoreError::Decoding(format!("unregistered custom type name: {:?}", type_name))
            })?;
            Value::Custom((registration.decode)(&payload)?)
        }
    };
    Ok(value)
}
