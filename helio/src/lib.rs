// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

// Core modules
pub mod errors;
pub mod fault;
mod macros;

// Backend modules
#[cfg(feature = "mem")]
mod mem;

#[cfg(feature = "std")]
mod std;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::BlockIO;
    pub use super::BlockIOExt;
    pub use super::errors::*;
    pub use super::fault::*;

    #[cfg(feature = "mem")]
    pub use super::mem::MemBlockIO;

    #[cfg(feature = "std")]
    pub use super::std::StdBlockIO;
}

// Internal use
use errors::*;

// Constants

/// Size in bytes of the atomic word accepted by [`BlockIO::write_group`].
///
/// Storage formats that rely on the group-write ordering guarantee reserve
/// exactly this many bytes at the group's base offset for their commit word.
pub const ATOMIC_WRITE_SIZE: usize = 4;

/// Maximum size of internal scratch buffer (used for fill/chunked ops).
/// 4 KiB = typical page size and common disk sector/cluster size.
/// Safe for no_std stack usage, overridable in high-level code.
pub const BLOCK_BUF_SIZE: usize = 4096;

// Traits

/// Block IO abstraction trait.
///
/// Allows read/write/flush at arbitrary byte offsets and reports the device
/// geometry. Implementations may target RAM, files, block devices, etc.
pub trait BlockIO {
    /// Total device size in bytes.
    fn total_size(&self) -> u64;

    /// Addressing granularity of the device in bytes.
    fn sector_size(&self) -> u32;

    /// Writes `data` at `offset` (absolute).
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult;

    /// Reads `buf.len()` bytes into `buf` from `offset` (absolute).
    /// Reads are precise: a short read is an error, never a partial success.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult;

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> BlockIOResult;

    /// Writes a group of buffers laid out back to back, optionally sealed by
    /// an atomic word.
    ///
    /// When `atomic` is present, the buffers start at
    /// `offset + ATOMIC_WRITE_SIZE` and the word itself lands at `offset`,
    /// little-endian, committed strictly after every buffer in the call.
    /// When `atomic` is absent, the buffers start at `offset`.
    ///
    /// Callers use the word-last ordering as a commit point: if the call is
    /// cut short at any write boundary, the word still holds its previous
    /// value.
    fn write_group(&mut self, offset: u64, atomic: Option<u32>, bufs: &[&[u8]]) -> BlockIOResult {
        let mut pos = match atomic {
            Some(_) => offset + ATOMIC_WRITE_SIZE as u64,
            None => offset,
        };

        for buf in bufs {
            self.write_at(pos, buf)?;
            pos += buf.len() as u64;
        }

        if let Some(word) = atomic {
            self.write_at(offset, &word.to_le_bytes())?;
        }

        Ok(())
    }
}

/// Extension helpers for BlockIO.
///
/// Provides convenient helpers:
/// - low-level primitive accessors (read/write u16/u32/u64, little-endian)
/// - zero fill
pub trait BlockIOExt: BlockIO {
    /// Fills a region with zeroes.
    ///
    /// Used for full formats and quick region clears.
    #[inline(always)]
    fn zero_fill(&mut self, offset: u64, len: usize) -> BlockIOResult {
        const ZERO_BUF: [u8; BLOCK_BUF_SIZE] = [0u8; BLOCK_BUF_SIZE];
        let mut remaining = len;
        let mut off = offset;
        while remaining > 0 {
            let chunk = remaining.min(ZERO_BUF.len());
            self.write_at(off, &ZERO_BUF[..chunk])?;
            off += chunk as u64;
            remaining -= chunk;
        }
        Ok(())
    }

    // Little-endian accessors for primitive types (u16, u32, u64)
    blockio_le_accessors!(u16, u32, u64);
}

impl<T: BlockIO + ?Sized> BlockIOExt for T {}
