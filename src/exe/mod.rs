//! EXE Reader: opens a file, validates the MZ/PE magics, and exposes the
//! offsets signature matching needs.
//!
//! `Exe` is a closed dispatch enum rather than a trait object, the way
//! `goblin`'s own top-level `Object` enum dispatches between ELF/Mach-O/PE
//! rather than boxing a shared trait.

pub mod msdos;
pub mod pe;

use crate::error::{Error, Result};
use msdos::MsdosFile;
use pe::PeFile;

/// An opened executable, in whichever of the two supported formats it turned out to be.
#[derive(Debug)]
pub enum Exe {
    Pe(PeFile),
    Msdos(MsdosFile),
}

/// Try PE first, then MSDOS; `InvalidMagic` from either is swallowed so the next format gets a chance.
pub fn open_exe(path: &str) -> Result<Exe> {
    match PeFile::open(path) {
        Ok(pe) => return Ok(Exe::Pe(pe)),
        Err(Error::InvalidMagic { .. }) => {}
        Err(e) => return Err(e),
    }
    match MsdosFile::open(path) {
        Ok(m) => Ok(Exe::Msdos(m)),
        Err(Error::InvalidMagic { .. }) => Err(Error::InvalidMagic { path: path.to_string() }),
        Err(e) => Err(e),
    }
}

impl Exe {
    pub fn size(&self) -> u64 {
        match self {
            Exe::Pe(p) => p.size,
            Exe::Msdos(m) => m.size,
        }
    }

    pub fn entrypoint_offset(&mut self) -> Result<u64> {
        match self {
            Exe::Pe(p) => p.entrypoint_offset(),
            Exe::Msdos(m) => m.entrypoint_offset(),
        }
    }

    pub fn sections_offsets(&mut self) -> Result<Vec<u64>> {
        match self {
            Exe::Pe(p) => p.sections_offsets(),
            Exe::Msdos(m) => m.sections_offsets(),
        }
    }

    fn read_window(&mut self, offset: u64, n: usize) -> Result<Vec<u8>> {
        match self {
            Exe::Pe(p) => p.read_window(offset, n),
            Exe::Msdos(m) => m.read_window(offset, n),
        }
    }

    /// Visits byte windows of length `n` at each of `offsets`, or, if `offsets` is
    /// empty, at every offset in `[0, size - n)` (the "anywhere" scan). `visit`
    /// returns `true` to keep scanning, `false` to stop early — the eager
    /// equivalent of the original Python generator plus caller-side `break`.
    pub fn for_each_window<F>(&mut self, n: usize, offsets: &[u64], mut visit: F) -> Result<()>
    where
        F: FnMut(u64, &[u8]) -> Result<bool>,
    {
        if offsets.is_empty() {
            let size = self.size();
            if (n as u64) >= size {
                return Ok(());
            }
            let mut offset = 0u64;
            while offset < size - n as u64 {
                let window = self.read_window(offset, n)?;
                if !visit(offset, &window)? {
                    return Ok(());
                }
                offset += 1;
            }
        } else {
            for &offset in offsets {
                let window = self.read_window(offset, n)?;
                if !visit(offset, &window)? {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}
