// SPDX-License-Identifier: MIT

//! Fixed-size file names layered on the kernel.
//!
//! The kernel knows files only by sector id. This wrapper stores an
//! 8-byte name as the first bytes of each file's payload and resolves names
//! by scanning the volume. A volume managed through [`NamedFs`] must not mix
//! in files created on the kernel directly; lookups read the name prefix of
//! every file they pass.

use alloc::vec::Vec;

use helio::BlockIO;

use crate::chunk::FileId;
use crate::errors::{FsError, FsResult};
use crate::fs::HelFs;

/// Length in bytes of a file name. Exact, not a maximum.
pub const NAME_SIZE: usize = 8;

/// Name-addressed view over [`HelFs`].
pub struct NamedFs<IO> {
    fs: HelFs<IO>,
}

impl<IO: BlockIO> NamedFs<IO> {
    pub fn init(io: IO) -> FsResult<Self> {
        Ok(NamedFs {
            fs: HelFs::init(io)?,
        })
    }

    pub fn format(io: IO) -> FsResult<Self> {
        Ok(NamedFs {
            fs: HelFs::format(io)?,
        })
    }

    pub fn format_full(io: IO) -> FsResult<Self> {
        Ok(NamedFs {
            fs: HelFs::format_full(io)?,
        })
    }

    pub fn close(self) -> FsResult<IO> {
        self.fs.close()
    }

    /// Unwraps back to the id-addressed kernel.
    pub fn into_inner(self) -> HelFs<IO> {
        self.fs
    }

    /// Creates a file called `name` holding the concatenation of `bufs`.
    ///
    /// The name must be exactly [`NAME_SIZE`] bytes long and not taken yet.
    pub fn create_and_write(&mut self, name: &[u8], bufs: &[&[u8]]) -> FsResult<FileId> {
        crate::ensure!(name.len() == NAME_SIZE, FsError::InvalidParam);

        match self.lookup(name) {
            Ok(_) => crate::bail!(FsError::AlreadyExists),
            Err(FsError::FileNotFound) => {}
            Err(e) => return Err(e),
        }

        // The name rides along as one more buffer, so it costs no copy.
        let mut all: Vec<&[u8]> = Vec::new();
        all.try_reserve(bufs.len() + 1)
            .map_err(|_| FsError::OutOfMemory)?;
        all.push(name);
        all.extend_from_slice(bufs);

        self.fs.create_and_write(&all)
    }

    /// Finds the id of the file called `name`.
    ///
    /// Fails with [`FsError::FileNotFound`] when no file carries that name.
    pub fn lookup(&mut self, name: &[u8]) -> FsResult<FileId> {
        crate::ensure!(name.len() == NAME_SIZE, FsError::InvalidParam);

        let mut stored = [0u8; NAME_SIZE];
        let mut id = self.fs.first_file()?;

        loop {
            self.fs.read(id, 0, &mut stored)?;
            if stored.as_slice() == name {
                return Ok(id);
            }

            id = self.fs.next_file(id)?;
        }
    }

    /// Reads from the file's payload, past its name.
    pub fn read(&mut self, id: FileId, begin: u32, out: &mut [u8]) -> FsResult {
        self.fs
            .read(id, begin.saturating_add(NAME_SIZE as u32), out)
    }

    pub fn delete(&mut self, id: FileId) -> FsResult {
        self.fs.delete(id)
    }
}
