// SPDX-License-Identifier: MIT

//! Device geometry captured when the file system is brought up.

use helio::BlockIO;

use crate::chunk::{FileId, MAX_BYTES, MAX_SECTORS, META_SIZE};
use crate::errors::{FsError, FsResult};

/// Validated device geometry.
///
/// Every size and offset computation in the kernel goes through this; once
/// constructed, device size and sector size are known to be encodable in a
/// chunk metadata word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelMeta {
    total_size: u64,
    sector_size: u32,
}

impl HelMeta {
    /// Checks the geometry against what a metadata word can address.
    ///
    /// A sector must fit more than the metadata word, the device must be a
    /// whole number of sectors, at least one sector long, and both the byte
    /// and sector counts must fit their fields.
    pub fn new(total_size: u64, sector_size: u32) -> FsResult<Self> {
        crate::ensure!(sector_size > META_SIZE, FsError::Bounds);
        crate::ensure!(total_size % sector_size as u64 == 0, FsError::Bounds);
        crate::ensure!(total_size >= sector_size as u64, FsError::Bounds);
        crate::ensure!(total_size <= MAX_BYTES as u64, FsError::Bounds);
        crate::ensure!(
            total_size / sector_size as u64 <= MAX_SECTORS as u64,
            FsError::Bounds
        );

        Ok(HelMeta {
            total_size,
            sector_size,
        })
    }

    /// Reads the geometry off a device.
    pub fn from_io<IO: BlockIO + ?Sized>(io: &IO) -> FsResult<Self> {
        HelMeta::new(io.total_size(), io.sector_size())
    }

    #[inline]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    #[inline]
    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    #[inline]
    pub fn total_sectors(&self) -> u32 {
        (self.total_size / self.sector_size as u64) as u32
    }

    /// Byte offset of the sector `id` on the device.
    #[inline]
    pub fn sector_offset(&self, id: FileId) -> u64 {
        id as u64 * self.sector_size as u64
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_valid_geometry() {
        let meta = HelMeta::new(0x400, 0x20).unwrap();
        assert_eq!(meta.total_sectors(), 32);
        assert_eq!(meta.sector_offset(3), 0x60);
    }

    #[test]
    fn test_sector_must_exceed_meta_word() {
        assert_eq!(HelMeta::new(0x400, 4), Err(FsError::Bounds));
        assert!(HelMeta::new(0x400, 8).is_ok());
    }

    #[test]
    fn test_unaligned_total_size() {
        assert_eq!(HelMeta::new(0x401, 0x20), Err(FsError::Bounds));
    }

    #[test]
    fn test_empty_device() {
        assert_eq!(HelMeta::new(0, 0x20), Err(FsError::Bounds));
    }

    #[test]
    fn test_field_limits() {
        // One sector past what the 15-bit sector count can hold.
        let sector = 0x8000;
        let too_many = (MAX_SECTORS as u64 + 1) * sector;
        assert_eq!(HelMeta::new(too_many, sector as u32), Err(FsError::Bounds));
        assert!(HelMeta::new(too_many - sector, sector as u32).is_ok());

        // Byte count limit trips first on big sectors.
        assert_eq!(
            HelMeta::new(1 << 30, 1 << 30),
            Err(FsError::Bounds)
        );
    }
}
