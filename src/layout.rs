//! Register layout: owned, validated, address-indexed copies of field and
//! composite templates.

use std::collections::{BTreeMap, BTreeSet};

use crate::composite::Composite;
use crate::errors::{AccessError, LayoutError};
use crate::field::Field;

/// One entry in a register layout template: a plain field or a composite.
#[derive(Debug, Clone)]
pub enum Entry {
    Field(Field),
    Composite(Composite),
}

impl From<Field> for Entry {
    fn from(f: Field) -> Self {
        Entry::Field(f)
    }
}

impl From<Composite> for Entry {
    fn from(c: Composite) -> Self {
        Entry::Composite(c)
    }
}

/// Reference to a looked-up register: either a plain field or a composite.
#[derive(Debug, Clone, Copy)]
pub enum RegisterRef<'a> {
    Field(&'a Field),
    Composite(&'a Composite),
}

/// A validated register layout.
///
/// [Layout::build] deep-copies the caller's templates into owned maps, so a
/// shared static table can seed any number of independent layouts. Fields are
/// additionally indexed by address, sorted by offset, and each address group
/// is checked once for overlap and word overflow. The field set is fixed for
/// the layout's lifetime.
#[derive(Debug, Clone)]
pub struct Layout {
    register_size: u32,
    fields: BTreeMap<String, Field>,
    composites: BTreeMap<String, Composite>,
    by_address: BTreeMap<u16, Vec<String>>,
}

impl Layout {
    /// Builds a layout from templates with `register_size`-bit words.
    pub fn build(entries: &[Entry], register_size: u32) -> Result<Self, LayoutError> {
        if register_size == 0 || register_size > 64 {
            return Err(LayoutError::InvalidWordSize { bits: register_size });
        }

        let mut fields: BTreeMap<String, Field> = BTreeMap::new();
        let mut composites: BTreeMap<String, Composite> = BTreeMap::new();

        for entry in entries {
            let name = match entry {
                Entry::Field(f) => &f.name,
                Entry::Composite(c) => &c.name,
            };
            if fields.contains_key(name) || composites.contains_key(name) {
                return Err(LayoutError::DuplicateName { name: name.clone() });
            }
            match entry {
                Entry::Field(f) => {
                    fields.insert(f.name.clone(), f.clone());
                }
                Entry::Composite(c) => {
                    composites.insert(c.name.clone(), c.clone());
                }
            }
        }

        // Composites resolve by name against the copies above, never against
        // the caller's template objects.
        for composite in composites.values() {
            for constituent in &composite.fields {
                if !fields.contains_key(constituent) {
                    return Err(LayoutError::UnknownConstituent {
                        composite: composite.name.clone(),
                        constituent: constituent.clone(),
                    });
                }
            }
            if composite.total_width(&fields) > 64 {
                return Err(LayoutError::CompositeTooWide {
                    name: composite.name.clone(),
                });
            }
        }

        let mut by_address: BTreeMap<u16, Vec<String>> = BTreeMap::new();
        for field in fields.values() {
            by_address
                .entry(field.address)
                .or_default()
                .push(field.name.clone());
        }

        for (&address, names) in by_address.iter_mut() {
            names.sort_by_key(|n| fields[n].offset);

            let mut bits_set = 0u64;
            for name in names.iter() {
                let field = &fields[name];
                if field.width == 0 {
                    return Err(LayoutError::ZeroWidth { name: name.clone() });
                }
                if u32::from(field.offset) + u32::from(field.width) > register_size {
                    return Err(LayoutError::Overflow { address });
                }
                if field.bitmask() & bits_set != 0 {
                    return Err(LayoutError::Overlap {
                        address,
                        name: name.clone(),
                    });
                }
                bits_set |= field.bitmask();
            }
        }

        Ok(Layout {
            register_size,
            fields,
            composites,
            by_address,
        })
    }

    /// Width in bits of one register word.
    pub fn register_size(&self) -> u32 {
        self.register_size
    }

    /// Mask covering one full register word.
    pub fn word_mask(&self) -> u64 {
        crate::bits::mask(self.register_size as u8)
    }

    /// Looks up a register by name, trying composites first.
    pub fn register(&self, name: &str) -> Result<RegisterRef<'_>, AccessError> {
        if let Some(c) = self.composites.get(name) {
            return Ok(RegisterRef::Composite(c));
        }
        self.fields
            .get(name)
            .map(RegisterRef::Field)
            .ok_or_else(|| AccessError::UnknownRegister { name: name.to_string() })
    }

    /// Looks up a plain field by name.
    pub fn field(&self, name: &str) -> Result<&Field, AccessError> {
        self.fields
            .get(name)
            .ok_or_else(|| AccessError::UnknownRegister { name: name.to_string() })
    }

    pub(crate) fn field_mut(&mut self, name: &str) -> Result<&mut Field, AccessError> {
        self.fields
            .get_mut(name)
            .ok_or_else(|| AccessError::UnknownRegister { name: name.to_string() })
    }

    /// Fields mapped at `address`, ordered by ascending offset.
    pub fn fields_at(&self, address: u16) -> Result<Vec<&Field>, AccessError> {
        let names = self
            .by_address
            .get(&address)
            .ok_or(AccessError::UnmappedAddress { address })?;
        Ok(names.iter().map(|n| &self.fields[n]).collect())
    }

    pub(crate) fn field_names_at(&self, address: u16) -> Option<&[String]> {
        self.by_address.get(&address).map(|v| v.as_slice())
    }

    /// Every mapped address, ascending.
    pub fn addresses(&self) -> impl Iterator<Item = u16> + '_ {
        self.by_address.keys().copied()
    }

    /// Names of all plain fields.
    pub fn register_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Names of all composites.
    pub fn composite_names(&self) -> impl Iterator<Item = &str> {
        self.composites.keys().map(String::as_str)
    }

    /// Cached value of a field or composite. Composites are derived from
    /// their constituents; either kind fails if a needed cache is unset.
    pub fn value(&self, name: &str) -> Result<u64, AccessError> {
        match self.register(name)? {
            RegisterRef::Composite(c) => c.value_from(&self.fields),
            RegisterRef::Field(f) => f.value().ok_or_else(|| AccessError::Unset {
                name: name.to_string(),
            }),
        }
    }

    /// Sets the cached value of a plain field. Composites cannot be set.
    pub fn set_value(&mut self, name: &str, value: u64) -> Result<(), AccessError> {
        if self.composites.contains_key(name) {
            return Err(AccessError::DerivedValue { name: name.to_string() });
        }
        self.field_mut(name)?.set_value(value)
    }

    /// Expands a name selection into the set of plain-field names plus the
    /// composites that were named directly. Returned data is owned so callers
    /// can keep it across cache mutations.
    pub(crate) fn expand(
        &self,
        names: &[&str],
    ) -> Result<(BTreeSet<String>, Vec<Composite>), AccessError> {
        let mut field_names: BTreeSet<String> = BTreeSet::new();
        let mut requested_composites = Vec::new();
        for name in names {
            match self.register(name)? {
                RegisterRef::Composite(c) => {
                    field_names.extend(c.fields.iter().cloned());
                    requested_composites.push(c.clone());
                }
                RegisterRef::Field(f) => {
                    field_names.insert(f.name.clone());
                }
            }
        }
        Ok((field_names, requested_composites))
    }

    /// Decodes a fetched word into the caches of the fields at `address`.
    /// `only` restricts the update to the named fields; `skip_writeable`
    /// leaves `ReadWrite` fields alone (used after a write read-back).
    pub(crate) fn decode_word(
        &mut self,
        address: u16,
        word: u64,
        only: Option<&BTreeSet<String>>,
        skip_writeable: bool,
    ) {
        let Some(names) = self.by_address.get(&address) else {
            return;
        };
        for name in names {
            if let Some(filter) = only {
                if !filter.contains(name) {
                    continue;
                }
            }
            if let Some(field) = self.fields.get_mut(name) {
                if skip_writeable && field.access == crate::field::Access::ReadWrite {
                    continue;
                }
                field.decode(word);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Access;

    fn ctrl_entries() -> Vec<Entry> {
        vec![
            Field::new("mode", 0xF4).bits(0, 2).access(Access::ReadWrite).into(),
            Field::new("osrs_p", 0xF4).bits(2, 3).access(Access::ReadWrite).into(),
            Field::new("osrs_t", 0xF4).bits(5, 3).access(Access::ReadWrite).into(),
            Field::new("t_lsb", 0xFB).bits(0, 8).access(Access::ReadOnly).into(),
            Field::new("t_msb", 0xFA).bits(0, 8).access(Access::ReadOnly).into(),
            Composite::new("t", ["t_lsb", "t_msb"]).into(),
        ]
    }

    #[test]
    fn test_build_groups_and_sorts_by_offset() {
        let entries = vec![
            Field::new("hi", 0x10).bits(5, 3).into(),
            Field::new("lo", 0x10).bits(0, 2).into(),
            Field::new("mid", 0x10).bits(2, 3).into(),
        ];
        let layout = Layout::build(&entries, 8).unwrap();
        let names: Vec<&str> = layout
            .fields_at(0x10)
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, ["lo", "mid", "hi"]);
    }

    #[test]
    fn test_overlap_fails() {
        let entries = vec![
            Field::new("a", 0x10).bits(0, 4).into(),
            Field::new("b", 0x10).bits(3, 2).into(),
        ];
        assert_eq!(
            Layout::build(&entries, 8).unwrap_err(),
            LayoutError::Overlap {
                address: 0x10,
                name: "b".to_string(),
            }
        );
    }

    #[test]
    fn test_overflow_fails() {
        let entries = vec![Field::new("wide", 0x10).bits(4, 6).into()];
        assert_eq!(
            Layout::build(&entries, 8).unwrap_err(),
            LayoutError::Overflow { address: 0x10 }
        );
    }

    #[test]
    fn test_duplicate_name_fails() {
        let entries = vec![
            Field::new("x", 0x10).into(),
            Field::new("x", 0x11).into(),
        ];
        assert_eq!(
            Layout::build(&entries, 8).unwrap_err(),
            LayoutError::DuplicateName { name: "x".to_string() }
        );
    }

    #[test]
    fn test_unknown_constituent_fails() {
        let entries = vec![
            Field::new("lsb", 0x10).bits(0, 8).into(),
            Composite::new("v", ["lsb", "msb"]).into(),
        ];
        assert_eq!(
            Layout::build(&entries, 8).unwrap_err(),
            LayoutError::UnknownConstituent {
                composite: "v".to_string(),
                constituent: "msb".to_string(),
            }
        );
    }

    #[test]
    fn test_composite_lookup_precedes_field() {
        let layout = Layout::build(&ctrl_entries(), 8).unwrap();
        assert!(matches!(
            layout.register("t").unwrap(),
            RegisterRef::Composite(_)
        ));
        assert!(matches!(
            layout.register("mode").unwrap(),
            RegisterRef::Field(_)
        ));
        assert!(layout.register("nope").is_err());
    }

    #[test]
    fn test_set_value_rejects_composites() {
        let mut layout = Layout::build(&ctrl_entries(), 8).unwrap();
        assert_eq!(
            layout.set_value("t", 1),
            Err(AccessError::DerivedValue { name: "t".to_string() })
        );
        layout.set_value("mode", 0b11).unwrap();
        assert_eq!(layout.value("mode"), Ok(0b11));
    }

    #[test]
    fn test_build_decouples_templates() {
        let entries = ctrl_entries();
        let mut layout = Layout::build(&entries, 8).unwrap();
        layout.set_value("mode", 0b10).unwrap();

        // Same templates seed a second, independent layout.
        let layout2 = Layout::build(&entries, 8).unwrap();
        assert_eq!(
            layout2.value("mode"),
            Err(AccessError::Unset { name: "mode".to_string() })
        );
    }

    #[test]
    fn test_unmapped_address() {
        let layout = Layout::build(&ctrl_entries(), 8).unwrap();
        assert_eq!(
            layout.fields_at(0x00).unwrap_err(),
            AccessError::UnmappedAddress { address: 0x00 }
        );
    }

    #[test]
    fn test_composite_wider_than_64_bits_fails() {
        let mut entries: Vec<Entry> = (0u16..9)
            .map(|i| Field::new(format!("b{i}"), 0x20 + i).bits(0, 8).into())
            .collect();
        let names: Vec<String> = (0..9).map(|i| format!("b{i}")).collect();
        entries.push(Composite::new("huge", names).into());
        assert_eq!(
            Layout::build(&entries, 8).unwrap_err(),
            LayoutError::CompositeTooWide { name: "huge".to_string() }
        );
    }
}
