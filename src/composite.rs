//! Composite values spanning several fields, concatenated LSB-first.

use std::collections::BTreeMap;

use crate::errors::AccessError;
use crate::field::Field;

/// A named value formed by concatenating several plain fields, least
/// significant constituent first, possibly across multiple addresses.
///
/// A composite holds its constituents by *name*. When a layout is built the
/// names are resolved against that layout's own field copies, so a composite
/// cloned from a template never aliases another instance's caches. The value
/// is derived only; there is no setter.
#[derive(Debug, Clone)]
pub struct Composite {
    /// Name used as the unique lookup key.
    pub name: String,
    /// Constituent field names, least significant first.
    pub fields: Vec<String>,
    /// Human-readable description.
    pub description: String,
}

impl Composite {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Composite {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            description: String::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Concatenates the constituents' cached values, each shifted by the
    /// cumulative width of its predecessors. Fails if any constituent is
    /// missing from `fields` or has no cached value.
    pub(crate) fn value_from(&self, fields: &BTreeMap<String, Field>) -> Result<u64, AccessError> {
        let mut value = 0u64;
        let mut shift = 0u32;
        for name in &self.fields {
            let field = fields.get(name).ok_or_else(|| AccessError::UnknownRegister {
                name: name.clone(),
            })?;
            let v = field.value().ok_or_else(|| AccessError::Unset {
                name: name.clone(),
            })?;
            value |= v << shift;
            shift += u32::from(field.width);
        }
        Ok(value)
    }

    /// Total width in bits of the constituents resolved against `fields`.
    pub(crate) fn total_width(&self, fields: &BTreeMap<String, Field>) -> u32 {
        self.fields
            .iter()
            .filter_map(|name| fields.get(name))
            .map(|f| u32::from(f.width))
            .sum()
    }
}

#[cfg(feature = "serde")]
impl From<crate::serde::CompositeDef> for Composite {
    fn from(def: crate::serde::CompositeDef) -> Self {
        Composite {
            name: def.name,
            fields: def.fields,
            description: def.description,
        }
    }
}
