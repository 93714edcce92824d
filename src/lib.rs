//! # regmirror
//!
//! A host-side mirror of a bus-accessed peripheral's register file.
//!
//! Describe the device's registers as named bit-fields (possibly sub-byte,
//! possibly spanning several words via composites), then synchronize the
//! mirror with the device through a pluggable [transport::Transport]. Reads
//! are batched per address or as bursts; writes are read-modify-write so
//! neighbouring bits survive and unchanged words are never rewritten.
//!
//! ## Example
//!
//! ```
//! use regmirror::composite::Composite;
//! use regmirror::field::{Access, Field};
//! use regmirror::layout::Entry;
//! use regmirror::state::{ReadMode, RegisterFile};
//! use regmirror::transport::MemTransport;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template: Vec<Entry> = vec![
//!     Field::new("mode", 0xF4).bits(0, 2).access(Access::ReadWrite).into(),
//!     Field::new("temp_lsb", 0xFB).width(8).access(Access::ReadOnly).into(),
//!     Field::new("temp_msb", 0xFA).width(8).access(Access::ReadOnly).into(),
//!     Composite::new("temp", ["temp_lsb", "temp_msb"]).into(),
//! ];
//!
//! let bus = MemTransport::with_memory([(0xF4, 0b00), (0xFA, 0x12), (0xFB, 0x34)]);
//! let mut mirror = RegisterFile::new(bus, &template, 8)?;
//!
//! mirror.read_state(None, ReadMode::Auto, true)?;
//! assert_eq!(mirror.value("temp")?, 0x1234);
//!
//! mirror.set_value("mode", 0b11)?;
//! mirror.write_state(Some(&["mode"]), true)?;
//! assert_eq!(mirror.transport().word(0xF4), Some(0b11));
//! # Ok(()) }
//! ```

pub mod bits;
pub mod composite;
pub mod errors;
pub mod field;
pub mod file;
pub mod layout;
#[cfg(feature = "serde")]
pub mod serde;
pub mod state;
pub mod transport;
