//! File-backed transport: registers recorded as "address value" lines.
//!
//! Useful as a stand-in for real hardware when replaying captured register
//! dumps or inspecting what a driver would have written.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::errors::TransportError;
use crate::transport::Transport;

/// Number base used for addresses and values in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileBase {
    #[default]
    Hex,
    Decimal,
}

/// A [Transport] whose register words live in a text file, one
/// `address value` pair per line.
///
/// The file is parsed lazily on first access (or explicitly via
/// [FileTransport::load]) and written back only on [FileTransport::flush],
/// unless write-through is enabled, in which case every register access goes
/// straight to disk.
#[derive(Debug)]
pub struct FileTransport {
    path: PathBuf,
    out_path: Option<PathBuf>,
    base: FileBase,
    write_through: bool,
    words: Option<BTreeMap<u16, u64>>,
}

impl FileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTransport {
            path: path.into(),
            out_path: None,
            base: FileBase::default(),
            write_through: false,
            words: None,
        }
    }

    /// Writes go to a separate file, leaving the input untouched.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.out_path = Some(path.into());
        self
    }

    pub fn base(mut self, base: FileBase) -> Self {
        self.base = base;
        self
    }

    /// Re-reads the file before every register read and flushes after every
    /// register write.
    pub fn write_through(mut self, enabled: bool) -> Self {
        self.write_through = enabled;
        self
    }

    /// Parses the backing file into memory, replacing any loaded words.
    pub fn load(&mut self) -> io::Result<()> {
        let text = fs::read_to_string(&self.path)?;
        let mut words = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (addr, value) = match (parts.next(), parts.next(), parts.next()) {
                (Some(a), Some(v), None) => (a, v),
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("register file line is not two-element: {line:?}"),
                    ));
                }
            };
            let radix = match self.base {
                FileBase::Hex => 16,
                FileBase::Decimal => 10,
            };
            let addr = u16::from_str_radix(addr, radix)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let value = u64::from_str_radix(value, radix)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            words.insert(addr, value);
        }
        self.words = Some(words);
        Ok(())
    }

    /// Writes the loaded words back out, sorted by address. Does nothing if
    /// nothing was ever loaded.
    pub fn flush(&self) -> io::Result<()> {
        let Some(words) = &self.words else {
            return Ok(());
        };
        let path: &Path = self.out_path.as_deref().unwrap_or(&self.path);
        let mut out = fs::File::create(path)?;
        for (addr, value) in words {
            match self.base {
                FileBase::Hex => writeln!(out, "{addr:x} {value:x}")?,
                FileBase::Decimal => writeln!(out, "{addr} {value}")?,
            }
        }
        Ok(())
    }

    fn ensure_loaded(&mut self, reload: bool) -> Result<(), TransportError> {
        if reload || self.words.is_none() {
            self.load().map_err(|e| TransportError::Bus(e.to_string()))?;
        }
        Ok(())
    }
}

impl Transport for FileTransport {
    fn read_register(&mut self, address: u16) -> Result<u64, TransportError> {
        self.ensure_loaded(self.write_through)?;
        self.words
            .as_ref()
            .and_then(|w| w.get(&address).copied())
            .ok_or(TransportError::NoSuchAddress { address })
    }

    fn write_register(&mut self, address: u16, value: u64) -> Result<(), TransportError> {
        self.ensure_loaded(false)?;
        if let Some(words) = self.words.as_mut() {
            words.insert(address, value);
        }
        if self.write_through {
            self.flush().map_err(|e| TransportError::Bus(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("regmirror-{}-{name}", std::process::id()));
        p
    }

    #[test]
    fn test_load_and_read_hex() {
        let path = scratch("load.regs");
        fs::write(&path, "f4 27\nf5 a0\n\nd0 60\n").unwrap();

        let mut t = FileTransport::new(&path);
        assert_eq!(t.read_register(0xF4), Ok(0x27));
        assert_eq!(t.read_register(0xD0), Ok(0x60));
        assert_eq!(
            t.read_register(0x00),
            Err(TransportError::NoSuchAddress { address: 0 })
        );
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_flush_round_trip() {
        let path = scratch("flush.regs");
        fs::write(&path, "10 ff\n").unwrap();

        let mut t = FileTransport::new(&path);
        t.write_register(0x10, 0x12).unwrap();
        t.write_register(0x11, 0x34).unwrap();
        t.flush().unwrap();

        let mut reread = FileTransport::new(&path);
        assert_eq!(reread.read_register(0x10), Ok(0x12));
        assert_eq!(reread.read_register(0x11), Ok(0x34));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_decimal_base() {
        let path = scratch("dec.regs");
        fs::write(&path, "16 255\n").unwrap();

        let mut t = FileTransport::new(&path).base(FileBase::Decimal);
        assert_eq!(t.read_register(16), Ok(255));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_malformed_line_is_a_bus_error() {
        let path = scratch("bad.regs");
        fs::write(&path, "10 20 30\n").unwrap();

        let mut t = FileTransport::new(&path);
        assert!(matches!(
            t.read_register(0x10),
            Err(TransportError::Bus(_))
        ));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_separate_output_file() {
        let in_path = scratch("in.regs");
        let out_path = scratch("out.regs");
        fs::write(&in_path, "10 1\n").unwrap();

        let mut t = FileTransport::new(&in_path).with_output(&out_path);
        t.write_register(0x10, 0x2).unwrap();
        t.flush().unwrap();

        assert_eq!(fs::read_to_string(&in_path).unwrap(), "10 1\n");
        assert_eq!(fs::read_to_string(&out_path).unwrap(), "10 2\n");
        fs::remove_file(&in_path).unwrap();
        fs::remove_file(&out_path).unwrap();
    }
}
