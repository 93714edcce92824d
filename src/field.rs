//! Definition of a single named bit-field within one register word.

use crate::bits;
use crate::errors::AccessError;

/// Writeability of a field.
///
/// `Unverified` means the datasheet does not say: the field is treated as
/// writeable, but any write touching it is followed by a read-back so the
/// mirror picks up whatever the peripheral actually latched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    /// Host may write; the peripheral latches the value as-is.
    ReadWrite,
    /// Host must never write this field.
    ReadOnly,
    /// Writeability unknown until verified by a post-write read-back.
    #[default]
    Unverified,
}

/// One named bit-field: a `width`-bit range starting `offset` bits above the
/// LSB of the word at `address`, plus the host-side cached value.
///
/// Templates are built once (typically in a shared table) and deep-copied
/// into each [crate::layout::Layout]; the cache on a template never aliases
/// the cache of a live instance.
#[derive(Debug, Clone)]
pub struct Field {
    /// Name used as the unique lookup key.
    pub name: String,
    /// Address of the register word holding this field.
    pub address: u16,
    /// Bit position of the field's LSB within the word (0 = word LSB).
    pub offset: u8,
    /// Width in bits, at least 1.
    pub width: u8,
    /// Whether the host may write this field.
    pub access: Access,
    /// Human-readable description.
    pub description: String,
    value: Option<u64>,
}

impl Field {
    /// A 1-bit field at bit 0 of `address`, unverified writeability, unset value.
    pub fn new(name: impl Into<String>, address: u16) -> Self {
        Field {
            name: name.into(),
            address,
            offset: 0,
            width: 1,
            access: Access::default(),
            description: String::new(),
            value: None,
        }
    }

    /// Places the field at `offset` with the given `width`.
    pub fn bits(mut self, offset: u8, width: u8) -> Self {
        self.offset = offset;
        self.width = width;
        self
    }

    /// Sets the width, keeping the offset.
    pub fn width(mut self, width: u8) -> Self {
        self.width = width;
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mask of this field's bits within the register word.
    pub fn bitmask(&self) -> u64 {
        bits::field_mask(self.offset, self.width)
    }

    /// Cached value, or `None` if no read or write has populated it yet.
    pub fn value(&self) -> Option<u64> {
        self.value
    }

    /// Sets the cached value. Fails if `value` does not fit into `width` bits.
    pub fn set_value(&mut self, value: u64) -> Result<(), AccessError> {
        if !bits::fits(value, self.width) {
            return Err(AccessError::OutOfRange {
                name: self.name.clone(),
                value,
                width: self.width,
            });
        }
        self.value = Some(value);
        Ok(())
    }

    /// Cached value shifted into word position, or `None` if unset.
    pub fn register_value(&self) -> Option<u64> {
        self.value.map(|v| v << self.offset)
    }

    /// Decodes this field's bits out of a raw register word into the cache.
    pub(crate) fn decode(&mut self, raw: u64) {
        self.value = Some((raw & self.bitmask()) >> self.offset);
    }
}

#[cfg(feature = "serde")]
impl From<crate::serde::FieldDef> for Field {
    fn from(def: crate::serde::FieldDef) -> Self {
        Field {
            name: def.name,
            address: def.address,
            offset: def.offset,
            width: def.width,
            access: def.access.into(),
            description: def.description,
            value: None,
        }
    }
}
