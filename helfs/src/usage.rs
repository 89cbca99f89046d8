// SPDX-License-Identifier: MIT

//! Sector usage tracking.
//!
//! The kernel keeps one bit per sector in RAM, rebuilt from the chunk words
//! on every mount. Nothing here touches the device.

use alloc::vec::Vec;

use crate::chunk::FileId;
use crate::errors::{FsError, FsResult};

/// Extension trait for bitmap operations on byte slices.
///
/// Little-endian bit ordering within bytes: bit 0 is the LSB of byte 0,
/// bit 8 is the LSB of byte 1, and so on.
pub trait BitmapOps {
    /// Sets or clears a bit at the given position.
    ///
    /// Does nothing if `bit` is out of bounds.
    fn set_bit(&mut self, bit: usize, value: bool);

    /// Gets the value of a bit at the given position.
    ///
    /// Returns `false` if `bit` is out of bounds.
    fn get_bit(&self, bit: usize) -> bool;

    /// Finds the first zero bit starting from `start`.
    ///
    /// Returns `None` if no zero bit is found within the bitmap.
    fn find_first_zero(&self, start: usize) -> Option<usize>;

    /// Counts the total number of set bits in the entire bitmap.
    fn count_ones(&self) -> usize;
}

impl BitmapOps for [u8] {
    #[inline]
    fn set_bit(&mut self, bit: usize, value: bool) {
        let Some(byte) = self.get_mut(bit / 8) else {
            return;
        };
        let mask = 1u8 << (bit % 8);
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    #[inline]
    fn get_bit(&self, bit: usize) -> bool {
        self.get(bit / 8)
            .is_some_and(|byte| byte & (1 << (bit % 8)) != 0)
    }

    fn find_first_zero(&self, start: usize) -> Option<usize> {
        let mut bit = start;
        while bit < self.len() * 8 {
            let byte = self[bit / 8];
            if byte == 0xFF {
                // Hop over saturated bytes.
                bit = (bit / 8 + 1) * 8;
                continue;
            }
            if byte & (1 << (bit % 8)) == 0 {
                return Some(bit);
            }
            bit += 1;
        }
        None
    }

    fn count_ones(&self) -> usize {
        self.iter().map(|byte| byte.count_ones() as usize).sum()
    }
}

/// In-RAM map of which sectors belong to a live chain.
///
/// Padding bits past `sectors` in the last byte stay zero; the sector-level
/// accessors clamp to the device size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageMap {
    bits: Vec<u8>,
    sectors: u32,
}

impl UsageMap {
    /// Allocates a cleared map for a device of `sectors` sectors.
    pub fn new(sectors: u32) -> FsResult<Self> {
        let len = (sectors as usize).div_ceil(8);
        let mut bits = Vec::new();
        bits.try_reserve_exact(len)
            .map_err(|_| FsError::OutOfMemory)?;
        bits.resize(len, 0);

        Ok(UsageMap { bits, sectors })
    }

    #[inline]
    pub fn sectors(&self) -> u32 {
        self.sectors
    }

    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    #[inline]
    pub fn is_used(&self, id: FileId) -> bool {
        self.bits.get_bit(id as usize)
    }

    /// Marks `sectors` sectors starting at `id`; spans past the device end
    /// are clipped.
    pub fn mark_span(&mut self, id: FileId, sectors: u32, used: bool) {
        let end = id.saturating_add(sectors).min(self.sectors);
        for bit in id..end {
            self.bits.set_bit(bit as usize, used);
        }
    }

    /// First free sector at or after `from`, if any.
    pub fn find_first_free(&self, from: FileId) -> Option<FileId> {
        let bit = self.bits.find_first_zero(from as usize)?;
        (bit < self.sectors as usize).then_some(bit as FileId)
    }

    /// Length of the free run starting at `from`.
    pub fn free_run(&self, from: FileId) -> u32 {
        (from..self.sectors)
            .take_while(|&id| !self.is_used(id))
            .count() as u32
    }

    /// Number of sectors currently marked used.
    pub fn used_sectors(&self) -> u32 {
        self.bits.count_ones() as u32
    }
}
