//! Bus transport seam: the two-operation interface the sync engine drives,
//! plus an in-memory implementation for tests and benches.

use std::collections::BTreeMap;

use crate::errors::TransportError;

/// A bus capable of reading and writing register words at addresses.
///
/// Only the single-word operations are required; the burst forms default to
/// per-word loops, so transports without a burst primitive implement just
/// `read_register` and `write_register`. Burst-capable buses override the
/// defaults with one bus operation spanning consecutive addresses.
///
/// Words are `register_size` bits wide; passing a wider value is a caller
/// contract violation, not a transport error. Any timeout policy lives in the
/// transport, which blocks until the bus answers.
pub trait Transport {
    /// Reads the word at `address`.
    fn read_register(&mut self, address: u16) -> Result<u64, TransportError>;

    /// Writes `value` to the word at `address`.
    fn write_register(&mut self, address: u16, value: u64) -> Result<(), TransportError>;

    /// Reads `count` consecutive words starting at `address`.
    fn read_registers(&mut self, address: u16, count: usize) -> Result<Vec<u64>, TransportError> {
        (0..count)
            .map(|i| self.read_register(address + i as u16))
            .collect()
    }

    /// Writes consecutive words starting at `address`.
    fn write_registers(&mut self, address: u16, values: &[u64]) -> Result<(), TransportError> {
        for (i, &value) in values.iter().enumerate() {
            self.write_register(address + i as u16, value)?;
        }
        Ok(())
    }
}

/// One bus operation recorded by [MemTransport].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Read { address: u16, count: usize },
    Write { address: u16, count: usize },
}

/// Burst-capable transport backed by an address → word map.
///
/// Reads of absent addresses fail with [TransportError::NoSuchAddress];
/// writes store unconditionally. Every bus operation is appended to a log so
/// callers can assert on batching shape and on suppressed writes.
#[derive(Debug, Default)]
pub struct MemTransport {
    memory: BTreeMap<u16, u64>,
    log: Vec<BusOp>,
}

impl MemTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory(words: impl IntoIterator<Item = (u16, u64)>) -> Self {
        MemTransport {
            memory: words.into_iter().collect(),
            log: Vec::new(),
        }
    }

    /// Stores a word without logging, as if the peripheral changed it.
    pub fn preload(&mut self, address: u16, value: u64) {
        self.memory.insert(address, value);
    }

    /// Current word at `address`, if any.
    pub fn word(&self, address: u16) -> Option<u64> {
        self.memory.get(&address).copied()
    }

    /// Operations issued so far, oldest first.
    pub fn log(&self) -> &[BusOp] {
        &self.log
    }

    /// Returns the operation log and clears it.
    pub fn take_log(&mut self) -> Vec<BusOp> {
        std::mem::take(&mut self.log)
    }
}

impl Transport for MemTransport {
    fn read_register(&mut self, address: u16) -> Result<u64, TransportError> {
        self.log.push(BusOp::Read { address, count: 1 });
        self.memory
            .get(&address)
            .copied()
            .ok_or(TransportError::NoSuchAddress { address })
    }

    fn write_register(&mut self, address: u16, value: u64) -> Result<(), TransportError> {
        self.log.push(BusOp::Write { address, count: 1 });
        self.memory.insert(address, value);
        Ok(())
    }

    fn read_registers(&mut self, address: u16, count: usize) -> Result<Vec<u64>, TransportError> {
        self.log.push(BusOp::Read { address, count });
        (0..count)
            .map(|i| {
                let addr = address + i as u16;
                self.memory
                    .get(&addr)
                    .copied()
                    .ok_or(TransportError::NoSuchAddress { address: addr })
            })
            .collect()
    }

    fn write_registers(&mut self, address: u16, values: &[u64]) -> Result<(), TransportError> {
        self.log.push(BusOp::Write { address, count: values.len() });
        for (i, &value) in values.iter().enumerate() {
            self.memory.insert(address + i as u16, value);
        }
        Ok(())
    }
}
