//! Type registry
//!
//! Maps user types to stable names so custom values can be written by one
//! process and read back by another.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

use super::value::{CustomData, CustomValue};
use super::wire_options;

type EncodeFn = fn(&dyn Any) -> Result<Vec<u8>>;
type DecodeFn = fn(&[u8]) -> Result<CustomValue>;

/// Encode/decode pair bound to one user type
pub(crate) struct Registration {
    pub name: String,
    pub encode: EncodeFn,
    pub decode: DecodeFn,
}

/// Registered user types, indexed both ways
#[derive(Default)]
pub struct TypeRegistry {
    by_name: HashMap<String, Arc<Registration>>,
    by_type: HashMap<TypeId, Arc<Registration>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `T` to `name`
    ///
    /// Registering the same pair twice is a no-op. Rebinding either side
    /// to something else is rejected.
    pub fn register<T>(&mut self, name: &str) -> Result<()>
    where
        T: CustomData + Serialize + DeserializeOwned,
    {
        let type_id = TypeId::of::<T>();

        match (self.by_name.get(name), self.by_type.get(&type_id)) {
            (Some(by_name), Some(by_type)) if Arc::ptr_eq(by_name, by_type) => return Ok(()),
            (Some(_), _) => {
                return Err(StoreError::Registration(format!(
                    "name {:?} is already bound to another type",
                    name
                )))
            }
            (None, Some(existing)) => {
                return Err(StoreError::Registration(format!(
                    "{} is already registered as {:?}",
                    std::any::type_name::<T>(),
                    existing.name
                )))
            }
            (None, None) => {}
        }

        let registration = Arc::new(Registration {
            name: name.to_string(),
            encode: encode_as::<T>,
            decode: decode_as::<T>,
        });
        self.by_name.insert(name.to_string(), Arc::clone(&registration));
        self.by_type.insert(type_id, registration);

        tracing::debug!("Registered custom type {} as {:?}", std::any::type_name::<T>(), name);
        Ok(())
    }

    pub(crate) fn by_type(&self, type_id: TypeId) -> Option<&Arc<Registration>> {
        self.by_type.get(&type_id)
    }

    pub(crate) fn by_name(&self, name: &str) -> Option<&Arc<Registration>> {
        self.by_name.get(name)
    }

    /// Whether a type name is known
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn encode_as<T: Serialize + 'static>(value: &dyn Any) -> Result<Vec<u8>> {
    let value = value.downcast_ref::<T>().ok_or_else(|| {
        StoreError::Encoding(format!(
            "registration mismatch for {}",
            std::any::type_name::<T>()
        ))
    })?;
    wire_options()
        .serialize(value)
        .map_err(|e| StoreError::Encoding(e.to_string()))
}

fn decode_as<T: CustomData + DeserializeOwned>(bytes: &[u8]) -> Result<CustomValue> {
    let value: T = wire_options()
        .deserialize(bytes)
        .map_err(|e| StoreError::Decoding(e.to_string()))?;
    Ok(CustomValue::new(value))
}
