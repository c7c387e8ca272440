//! Minimal PE reader: just enough of the header to resolve the entry-point
//! file offset and the file offset of each section.
//!
//! Field offsets are grounded on `spec.md` §6 and mirror the original
//! `peid.exe.pe.PE` class; the containment test for the entry point uses
//! `virtual_size` (not `raw_size`), per spec.md's pinned answer to the
//! "two historical ambiguities" note.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use log::{debug, trace};
use scroll::{Pread, LE};

use crate::error::{Error, Result};

/// One `IMAGE_SECTION_HEADER`-worth of fields, restricted to what identification needs.
#[derive(Debug, Clone, Copy, Default)]
struct RawSection {
    virtual_size: u32,
    virtual_address: u32,
    #[allow(dead_code)]
    raw_size: u32,
    raw_pointer: u32,
}

/// A read-only cursor over a PE file, exposing the offsets signature matching needs.
#[derive(Debug)]
pub struct PeFile {
    path: String,
    file: File,
    pub size: u64,
    pe_offset: u64,
    number_of_sections: u16,
    size_of_opt_header: u16,
}

impl PeFile {
    pub fn open(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let size = file.metadata()?.len();

        let mut magic = [0u8; 2];
        file.read_exact(&mut magic).map_err(|_| Error::InvalidMagic { path: path.to_string() })?;
        if &magic != b"MZ" {
            return Err(Error::InvalidMagic { path: path.to_string() });
        }

        file.seek(SeekFrom::Start(0x3c))?;
        let mut buf4 = [0u8; 4];
        file.read_exact(&mut buf4)?;
        let pe_offset = buf4.pread_with::<u32>(0, LE)? as u64;

        file.seek(SeekFrom::Start(pe_offset))?;
        let mut sig = [0u8; 4];
        file.read_exact(&mut sig).map_err(|_| Error::InvalidMagic { path: path.to_string() })?;
        if &sig != b"PE\0\0" {
            return Err(Error::InvalidMagic { path: path.to_string() });
        }

        file.seek(SeekFrom::Start(pe_offset + 6))?;
        let mut buf2 = [0u8; 2];
        file.read_exact(&mut buf2)?;
        let number_of_sections = buf2.pread_with::<u16>(0, LE)?;

        file.seek(SeekFrom::Start(pe_offset + 20))?;
        file.read_exact(&mut buf2)?;
        let size_of_opt_header = buf2.pread_with::<u16>(0, LE)?;

        debug!(
            "{}: pe_offset={:#x} sections={} opt_header_size={}",
            path, pe_offset, number_of_sections, size_of_opt_header
        );

        Ok(PeFile { path: path.to_string(), file, size, pe_offset, number_of_sections, size_of_opt_header })
    }

    fn sections(&mut self) -> Result<Vec<RawSection>> {
        let start = self.pe_offset + 24 + self.size_of_opt_header as u64;
        let mut out = Vec::with_capacity(self.number_of_sections as usize);
        for i in 0..self.number_of_sections as u64 {
            self.file.seek(SeekFrom::Start(start + i * 40 + 8))?;
            let mut buf = [0u8; 16];
            self.file.read_exact(&mut buf)?;
            out.push(RawSection {
                virtual_size: buf.pread_with::<u32>(0, LE)?,
                virtual_address: buf.pread_with::<u32>(4, LE)?,
                raw_size: buf.pread_with::<u32>(8, LE)?,
                raw_pointer: buf.pread_with::<u32>(12, LE)?,
            });
        }
        Ok(out)
    }

    pub fn entrypoint_offset(&mut self) -> Result<u64> {
        self.file.seek(SeekFrom::Start(self.pe_offset + 40))?;
        let mut buf4 = [0u8; 4];
        self.file.read_exact(&mut buf4)?;
        let rva = buf4.pread_with::<u32>(0, LE)? as u64;
        trace!("{}: entry point rva={:#x}", self.path, rva);

        for section in self.sections()? {
            let va = section.virtual_address as u64;
            let vsize = section.virtual_size as u64;
            if va <= rva && rva < va + vsize {
                let offset = section.raw_pointer as u64 + (rva - va);
                trace!("{}: entry point offset={:#x}", self.path, offset);
                return Ok(offset);
            }
        }
        Err(Error::MalformedPe { rva, file_size: self.size })
    }

    pub fn sections_offsets(&mut self) -> Result<Vec<u64>> {
        Ok(self.sections()?.into_iter().map(|s| s.raw_pointer as u64).collect())
    }

    pub fn read_window(&mut self, offset: u64, n: usize) -> Result<Vec<u8>> {
        if offset >= self.size {
            return Ok(Vec::new());
        }
        self.file.seek(SeekFrom::Start(offset))?;
        let want = n.min((self.size - offset) as usize);
        let mut buf = vec![0u8; want];
        let read = self.file.read(&mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }
}
