//! Synchronization engine: keeps a [Layout]'s caches and the peripheral's
//! registers in step over a [Transport].

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::composite::Composite;
use crate::errors::{AccessError, LayoutError};
use crate::field::{Access, Field};
use crate::layout::{Entry, Layout, RegisterRef};
use crate::transport::Transport;

/// How a multi-address read is batched on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// One discrete read per address.
    Discrete,
    /// One burst read spanning the whole requested address range.
    Burst,
    /// Discrete reads for plain addresses, one burst per composite whose
    /// constituent addresses form a contiguous run.
    #[default]
    Auto,
}

/// Host-side mirror of a peripheral's register file.
///
/// Owns a validated [Layout] (deep-copied from the caller's templates) and
/// the transport used to reach the device. All operations are synchronous
/// and blocking; the mirror must be driven by one logical caller at a time.
#[derive(Debug)]
pub struct RegisterFile<T> {
    layout: Layout,
    transport: T,
}

impl<T: Transport> RegisterFile<T> {
    /// Builds the layout from `entries` and wraps `transport`.
    pub fn new(transport: T, entries: &[Entry], register_size: u32) -> Result<Self, LayoutError> {
        Ok(RegisterFile {
            layout: Layout::build(entries, register_size)?,
            transport,
        })
    }

    /// Wraps an already-built layout.
    pub fn from_layout(transport: T, layout: Layout) -> Self {
        RegisterFile { layout, transport }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Looks up a register by name, composites first.
    pub fn register(&self, name: &str) -> Result<RegisterRef<'_>, AccessError> {
        self.layout.register(name)
    }

    /// Looks up a plain field by name.
    pub fn field(&self, name: &str) -> Result<&Field, AccessError> {
        self.layout.field(name)
    }

    /// Fields mapped at `address`, ordered by ascending offset.
    pub fn fields_at(&self, address: u16) -> Result<Vec<&Field>, AccessError> {
        self.layout.fields_at(address)
    }

    /// Cached value of a field or composite.
    pub fn value(&self, name: &str) -> Result<u64, AccessError> {
        self.layout.value(name)
    }

    /// Sets the cached value of a plain field; composites cannot be set. The
    /// peripheral is untouched until the next [RegisterFile::write_state].
    pub fn set_value(&mut self, name: &str, value: u64) -> Result<(), AccessError> {
        self.layout.set_value(name, value)
    }

    /// Pulls raw words from the peripheral and decodes them into the caches.
    ///
    /// `names` selects fields or composites (composites expand to their
    /// constituents); `None` selects every mapped address. `mode` controls
    /// bus batching only; the decoded values are identical across modes.
    /// With `update_all`, every field at a fetched mapped address is
    /// refreshed, even unrequested ones; otherwise only the requested fields
    /// are. Returns the address → raw word map actually fetched, including
    /// unmapped gap words inside a burst span.
    ///
    /// A transport failure aborts the rest of the batch; caches already
    /// decoded keep their new values, the rest stay as they were.
    pub fn read_state(
        &mut self,
        names: Option<&[&str]>,
        mode: ReadMode,
        update_all: bool,
    ) -> Result<BTreeMap<u16, u64>, AccessError> {
        let (requested, composites) = self.select(names)?;
        let addresses: BTreeSet<u16> = requested
            .iter()
            .filter_map(|n| self.layout.field(n).ok())
            .map(|f| f.address)
            .collect();
        if addresses.is_empty() {
            return Ok(BTreeMap::new());
        }

        // Decode word-by-word as each bus operation lands, so a failed
        // address abandons only the remainder of the batch.
        let only = if update_all { None } else { Some(&requested) };
        let mut fetched: BTreeMap<u16, u64> = BTreeMap::new();
        match mode {
            ReadMode::Discrete => {
                for &address in &addresses {
                    let word = self.transport.read_register(address)?;
                    trace!(address, word, "read register");
                    self.layout.decode_word(address, word, only, false);
                    fetched.insert(address, word);
                }
            }
            ReadMode::Burst => {
                let start = *addresses.iter().next().unwrap_or(&0);
                let end = *addresses.iter().next_back().unwrap_or(&0);
                let count = usize::from(end - start) + 1;
                let words = self.transport.read_registers(start, count)?;
                trace!(start, count, "burst read");
                for (i, word) in words.into_iter().enumerate() {
                    let address = start + i as u16;
                    self.layout.decode_word(address, word, only, false);
                    fetched.insert(address, word);
                }
            }
            ReadMode::Auto => {
                for composite in &composites {
                    if let Some((start, count)) = self.contiguous_run(composite) {
                        if !(0..count).all(|i| fetched.contains_key(&(start + i as u16))) {
                            let words = self.transport.read_registers(start, count)?;
                            trace!(start, count, composite = %composite.name, "burst read");
                            for (i, word) in words.into_iter().enumerate() {
                                let address = start + i as u16;
                                self.layout.decode_word(address, word, only, false);
                                fetched.insert(address, word);
                            }
                        }
                    }
                }
                for &address in &addresses {
                    if !fetched.contains_key(&address) {
                        let word = self.transport.read_register(address)?;
                        trace!(address, word, "read register");
                        self.layout.decode_word(address, word, only, false);
                        fetched.insert(address, word);
                    }
                }
            }
        }
        Ok(fetched)
    }

    /// Pushes cached field values to the peripheral.
    ///
    /// `names` restricts the operation to the addresses of the given fields
    /// or composites; `None` touches every mapped address. With
    /// `only_update`, the current word is read first (read-modify-write) so
    /// unrelated bits survive and unchanged words are not rewritten; without
    /// it, every touched address is written unconditionally over a zero
    /// baseline.
    ///
    /// At each address, every field that is not read-only and has a cached
    /// value contributes clear-then-OR to the composed word; read-only and
    /// unset fields leave the baseline bits alone. If any contributing field
    /// at an address has [Access::Unverified] writeability, an issued write
    /// is followed by a read-back that re-decodes the non-writeable fields
    /// there, capturing peripheral-side effects.
    pub fn write_state(
        &mut self,
        names: Option<&[&str]>,
        only_update: bool,
    ) -> Result<(), AccessError> {
        let (requested, _) = self.select(names)?;
        let addresses: BTreeSet<u16> = requested
            .iter()
            .filter_map(|n| self.layout.field(n).ok())
            .map(|f| f.address)
            .collect();

        for &address in &addresses {
            let Some(names_here) = self.layout.field_names_at(address) else {
                continue;
            };
            let names_here: Vec<String> = names_here.to_vec();

            let baseline = if only_update {
                let word = self.transport.read_register(address)?;
                trace!(address, word, "read baseline");
                word
            } else {
                0
            };

            let mut word = baseline;
            let mut unverified_written = false;
            for name in &names_here {
                let field = self.layout.field(name)?;
                if field.access == Access::ReadOnly {
                    continue;
                }
                let Some(value) = field.value() else {
                    continue;
                };
                word = (word & !field.bitmask() & self.layout.word_mask())
                    | (value << field.offset);
                if field.access == Access::Unverified {
                    unverified_written = true;
                }
            }

            if !only_update || word != baseline {
                debug!(address, word, "write register");
                self.transport.write_register(address, word)?;
                if unverified_written {
                    let raw = self.transport.read_register(address)?;
                    debug!(address, raw, "read back after write");
                    self.layout.decode_word(address, raw, None, true);
                }
            }
        }
        Ok(())
    }

    /// Resolves a selection into requested field names plus the composites
    /// named directly. `None` selects everything.
    fn select(
        &self,
        names: Option<&[&str]>,
    ) -> Result<(BTreeSet<String>, Vec<Composite>), AccessError> {
        match names {
            Some(names) => self.layout.expand(names),
            None => {
                let fields = self.layout.register_names().map(str::to_string).collect();
                let composites = self
                    .layout
                    .composite_names()
                    .filter_map(|n| match self.layout.register(n) {
                        Ok(RegisterRef::Composite(c)) => Some(c.clone()),
                        _ => None,
                    })
                    .collect();
                Ok((fields, composites))
            }
        }
    }

    /// The contiguous address run covered by a composite's constituents, or
    /// `None` if the addresses have gaps or the run is a single word.
    fn contiguous_run(&self, composite: &Composite) -> Option<(u16, usize)> {
        let addresses: BTreeSet<u16> = composite
            .fields
            .iter()
            .filter_map(|n| self.layout.field(n).ok())
            .map(|f| f.address)
            .collect();
        let start = *addresses.iter().next()?;
        let end = *addresses.iter().next_back()?;
        let span = usize::from(end - start) + 1;
        if span == addresses.len() && span > 1 {
            Some((start, span))
        } else {
            None
        }
    }
}
