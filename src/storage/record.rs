//! Record types read back from the table

/// Metadata attached to a key by `set_default`
///
/// Useful for preference systems that want to describe what a key is for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfo {
    pub description: String,
    pub category: String,
}

impl KeyInfo {
    pub fn new(description: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            category: category.into(),
        }
    }
}

/// One row produced by a [`Scan`](super::Scan)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRecord {
    pub key: String,

    /// Encoded current value
    pub value: Option<Vec<u8>>,

    /// Encoded default value
    pub original: Option<Vec<u8>>,
}

impl ScannedRecord {
    /// Bytes a read should decode: the current value, else the default
    pub fn effective(&self) -> Option<&[u8]> {
        self.value.as_deref().or(self.original.as_deref())
    }
}
