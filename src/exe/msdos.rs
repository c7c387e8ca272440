//! Minimal MZ (MS-DOS) reader, used when a file isn't a PE.
//!
//! Grounded on `peid.exe.msdos.MSDOS`: entry point is the real-mode
//! `(cs << 4) + ip`, and section offsets come from walking the
//! relocation table as `(segment << 4) + offset` pairs.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use log::trace;
use scroll::{Pread, LE};

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct MsdosFile {
    path: String,
    file: File,
    pub size: u64,
    number_relocations: u16,
    initial_ip: u16,
    initial_cs: u16,
    relocation_table_offset: u16,
}

impl MsdosFile {
    pub fn open(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let size = file.metadata()?.len();

        let mut header = [0u8; 26];
        file.read_exact(&mut header).map_err(|_| Error::InvalidMagic { path: path.to_string() })?;
        if &header[0..2] != b"MZ" {
            return Err(Error::InvalidMagic { path: path.to_string() });
        }

        let initial_ip = header.pread_with::<u16>(20, LE)?;
        let initial_cs = header.pread_with::<u16>(22, LE)?;
        let relocation_table_offset = header.pread_with::<u16>(24, LE)?;
        let number_relocations = header.pread_with::<u16>(6, LE)?;

        Ok(MsdosFile {
            path: path.to_string(),
            file,
            size,
            number_relocations,
            initial_ip,
            initial_cs,
            relocation_table_offset,
        })
    }

    pub fn entrypoint_offset(&mut self) -> Result<u64> {
        let offset = ((self.initial_cs as u64) << 4) + self.initial_ip as u64;
        trace!("{}: entry point offset={:#x}", self.path, offset);
        Ok(offset)
    }

    pub fn sections_offsets(&mut self) -> Result<Vec<u64>> {
        self.file.seek(SeekFrom::Start(self.relocation_table_offset as u64))?;
        let mut offsets = Vec::with_capacity(self.number_relocations as usize);
        for _ in 0..self.number_relocations {
            let mut buf = [0u8; 4];
            self.file.read_exact(&mut buf)?;
            let segment = buf.pread_with::<u16>(0, LE)?;
            let offset = buf.pread_with::<u16>(2, LE)?;
            offsets.push(((segment as u64) << 4) + offset as u64);
        }
        Ok(offsets)
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
