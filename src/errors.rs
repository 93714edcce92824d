//! Error types for layout construction, register access, and bus transport.

use std::fmt;

/// Errors produced when building a [crate::layout::Layout] from templates.
/// All of these are fatal configuration problems, detected once at
/// construction and never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Two fields at the same address have intersecting bitmasks.
    Overlap { address: u16, name: String },
    /// The union of field bitmasks at an address exceeds the register word.
    Overflow { address: u16 },
    /// A field declares a zero-bit width.
    ZeroWidth { name: String },
    /// Two templates share a name.
    DuplicateName { name: String },
    /// A composite names a constituent that is not a plain field in the layout.
    UnknownConstituent { composite: String, constituent: String },
    /// A composite's total width exceeds 64 bits.
    CompositeTooWide { name: String },
    /// Register word size is zero or greater than 64 bits.
    InvalidWordSize { bits: u32 },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Overlap { address, name } => {
                write!(f, "field {name:?} overlaps another field at address {address:#x}")
            }
            LayoutError::Overflow { address } => {
                write!(f, "fields at address {address:#x} extend past the register word")
            }
            LayoutError::ZeroWidth { name } => write!(f, "field {name:?} has zero width"),
            LayoutError::DuplicateName { name } => write!(f, "duplicate register name {name:?}"),
            LayoutError::UnknownConstituent { composite, constituent } => {
                write!(f, "composite {composite:?} references unknown field {constituent:?}")
            }
            LayoutError::CompositeTooWide { name } => {
                write!(f, "composite {name:?} is wider than 64 bits")
            }
            LayoutError::InvalidWordSize { bits } => {
                write!(f, "register word size of {bits} bits is unsupported")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

/// Errors produced while reading or writing register state at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// A value does not fit into the field's declared width.
    OutOfRange { name: String, value: u64, width: u8 },
    /// No field or composite with the given name exists.
    UnknownRegister { name: String },
    /// No fields are mapped at the given address.
    UnmappedAddress { address: u16 },
    /// Direct assignment to a composite, whose value is derived only.
    DerivedValue { name: String },
    /// A value was requested before any read or write populated it.
    Unset { name: String },
    /// The underlying bus transport failed; surfaced unchanged.
    Transport(TransportError),
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::OutOfRange { name, value, width } => {
                write!(f, "value {value:#x} does not fit into {width} bits (register {name:?})")
            }
            AccessError::UnknownRegister { name } => write!(f, "unknown register {name:?}"),
            AccessError::UnmappedAddress { address } => {
                write!(f, "no registers mapped at address {address:#x}")
            }
            AccessError::DerivedValue { name } => {
                write!(f, "composite {name:?} is derived and cannot be set directly")
            }
            AccessError::Unset { name } => write!(f, "register {name:?} has no cached value yet"),
            AccessError::Transport(e) => write!(f, "transport failure: {e}"),
        }
    }
}

impl std::error::Error for AccessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AccessError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for AccessError {
    fn from(e: TransportError) -> Self {
        AccessError::Transport(e)
    }
}

/// Errors raised by a [crate::transport::Transport] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport has no register at the given address.
    NoSuchAddress { address: u16 },
    /// Bus-level failure, with a transport-defined message.
    Bus(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NoSuchAddress { address } => {
                write!(f, "no register at address {address:#x}")
            }
            TransportError::Bus(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TransportError {}
