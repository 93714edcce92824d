//! JSON-deserializable layout description.
//!
//! These types describe the register map of a peripheral and are intended to
//! be loaded from a file (for example a datasheet-derived JSON shipped with a
//! driver) and then turned into core layout entries.

use serde::{Deserialize, Serialize};

use crate::layout::Entry;

/// Writeability of a field as declared in a layout file.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub enum AccessDef {
    /// Host-writeable.
    ReadWrite,
    /// Never written by the host.
    ReadOnly,
    #[default]
    /// Datasheet silent; writes are verified with a read-back.
    Unverified,
}

impl From<AccessDef> for crate::field::Access {
    fn from(def: AccessDef) -> Self {
        match def {
            AccessDef::ReadWrite => crate::field::Access::ReadWrite,
            AccessDef::ReadOnly => crate::field::Access::ReadOnly,
            AccessDef::Unverified => crate::field::Access::Unverified,
        }
    }
}

/// Description of a single bit-field.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    /// Unique register name.
    pub name: String,
    /// Address of the word holding this field.
    pub address: u16,
    /// Bit offset of the field's LSB; defaults to 0.
    #[serde(default)]
    pub offset: u8,
    /// Width in bits; defaults to 1.
    #[serde(default = "default_width")]
    pub width: u8,
    /// Writeability; defaults to unverified.
    #[serde(default)]
    pub access: AccessDef,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

fn default_width() -> u8 {
    1
}

/// Description of a composite value spanning several fields.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CompositeDef {
    /// Unique register name.
    pub name: String,
    /// Constituent field names, least significant first.
    pub fields: Vec<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// Top-level layout definition: word size plus all fields and composites.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LayoutDef {
    /// Register word width in bits; defaults to 8.
    #[serde(default = "default_register_size")]
    pub register_size: u32,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub composites: Vec<CompositeDef>,
}

fn default_register_size() -> u32 {
    8
}

impl LayoutDef {
    /// Flattens the definition into layout entries, fields first.
    pub fn entries(&self) -> Vec<Entry> {
        let mut entries: Vec<Entry> = Vec::with_capacity(self.fields.len() + self.composites.len());
        for field in &self.fields {
            entries.push(crate::field::Field::from(field.clone()).into());
        }
        for composite in &self.composites {
            entries.push(crate::composite::Composite::from(composite.clone()).into());
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;

    #[test]
    fn test_layout_from_json() {
        let json = r#"{
            "fields": [
                { "name": "mode", "address": 244, "width": 2, "access": "ReadWrite" },
                { "name": "osrs_t", "address": 244, "offset": 5, "width": 3, "access": "ReadWrite" },
                { "name": "t_lsb", "address": 251, "width": 8, "access": "ReadOnly" },
                { "name": "t_msb", "address": 250, "width": 8, "access": "ReadOnly" }
            ],
            "composites": [
                { "name": "t", "fields": ["t_lsb", "t_msb"] }
            ]
        }"#;
        let def: LayoutDef = serde_json::from_str(json).unwrap();
        assert_eq!(def.register_size, 8);

        let layout = Layout::build(&def.entries(), def.register_size).unwrap();
        let mode = layout.field("mode").unwrap();
        assert_eq!(mode.width, 2);
        assert_eq!(mode.access, crate::field::Access::ReadWrite);
        assert!(layout.register("t").is_ok());
    }

    #[test]
    fn test_defaults() {
        let json = r#"{ "fields": [ { "name": "en", "address": 16 } ] }"#;
        let def: LayoutDef = serde_json::from_str(json).unwrap();
        let field = &def.fields[0];
        assert_eq!(field.offset, 0);
        assert_eq!(field.width, 1);
        assert!(matches!(field.access, AccessDef::Unverified));
    }
}
