//! [`CodeFetch`] implementations backing the CLI drivers: a flat raw-binary
//! reader and an ELF `.text`-section loader built on the `elf` crate (spec
//! §6 `fetch_u32`), mirroring `elf_utils::read_text_instructions`'s
//! section-by-name lookup.

use elf::endian::AnyEndian;
use elf::ElfBytes;
use riscvemu::error::FetchError;
use riscvemu::tb::CodeFetch;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read input file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse ELF file: {0}")]
    Elf(#[from] elf::ParseError),
    #[error("file has no .text section")]
    NoTextSection,
}

/// Reads guest code from one contiguous region loaded up front, the way a
/// real engine's page tables would back [`CodeFetch`] (spec §6: fetch is
/// "given a guest PC", not a file offset).
pub struct SegmentFetch {
    base: u64,
    bytes: Vec<u8>,
}

impl SegmentFetch {
    /// Load an entire file as one region based at `base`, for raw/flat
    /// binaries with no ELF headers.
    pub fn flat(path: &str, base: u64) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path)?;
        Ok(SegmentFetch { base, bytes })
    }

    /// Load the `.text` section of an ELF file at its `sh_addr`.
    pub fn elf(path: &str) -> Result<Self, LoadError> {
        let raw = std::fs::read(path)?;
        let file = ElfBytes::<AnyEndian>::minimal_parse(&raw)?;
        let text_shdr = file.section_header_by_name(".text")?.ok_or(LoadError::NoTextSection)?;
        let (data, compression) = file.section_data(&text_shdr)?;
        if compression.is_some() {
            return Err(LoadError::NoTextSection);
        }
        Ok(SegmentFetch { base: text_shdr.sh_addr, bytes: data.to_vec() })
    }

    pub fn entry_point(path: &str) -> Result<u64, LoadError> {
        let raw = std::fs::read(path)?;
        let file = ElfBytes::<AnyEndian>::minimal_parse(&raw)?;
        Ok(file.ehdr.e_entry)
    }
}

impl CodeFetch for SegmentFetch {
    fn fetch_u32(&mut self, guest_pc: u64) -> Result<u32, FetchError> {
        let end = self.base + self.bytes.len() as u64;
        if guest_pc < self.base || guest_pc + 4 > end {
            return Err(FetchError::PageFault(guest_pc));
        }
        let off = (guest_pc - self.base) as usize;
        Ok(u32::from_le_bytes(self.bytes[off..off + 4].try_into().unwrap()))
    }
}
