// SPDX-License-Identifier: MIT

//! Chunk metadata word codec.
//!
//! Every chunk opens with one little-endian `u32` that the device commits
//! atomically:
//!
//! ```text
//! bit  31       is_end
//! bit  30       is_start
//! bits 0..=29   is_end == 0:  next chunk id (bits 0..=14)
//!                             occupied size in sectors (bits 15..=29)
//!               is_end == 1:  payload size in bytes, word excluded
//! ```
//!
//! A free extent is stored as a non-start, non-end word whose sector count
//! spans the whole extent, so free space is always tiled by decodable words.

use helio::ATOMIC_WRITE_SIZE;

/// Sector id of a file's head chunk. This is the kernel's file identity.
pub type FileId = u32;

/// Size in bytes of a chunk metadata word as stored on the device.
pub const META_SIZE: u32 = 4;

// The word must be exactly what the driver can commit atomically.
const _: () = assert!(META_SIZE as usize == ATOMIC_WRITE_SIZE);

/// Largest sector count a device may have; next-id and sector-count fields
/// are 15 bits wide.
pub const MAX_SECTORS: u32 = (1 << 15) - 1;

/// Largest device size in bytes; the terminal byte-count field is 30 bits
/// wide.
pub const MAX_BYTES: u32 = (1 << 30) - 1;

const NEXT_MASK: u32 = 0x0000_7FFF;
const SECTORS_MASK: u32 = 0x3FFF_8000;
const SECTORS_SHIFT: u32 = 15;
const BYTES_MASK: u32 = 0x3FFF_FFFF;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MetaFlags: u32 {
        const START = 1 << 30;
        const END   = 1 << 31;
    }
}

/// Size half of a chunk metadata word; which form is stored depends on the
/// end flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Chunk with a successor: occupied span in sectors plus the id of the
    /// next chunk in the chain. Free extents use this form with `next = 0`.
    Continuation { next: FileId, sectors: u32 },
    /// Last chunk of a chain: exact payload length in bytes.
    Terminal { bytes: u32 },
}

/// Decoded chunk metadata word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub is_start: bool,
    pub kind: ChunkKind,
}

impl ChunkHeader {
    /// Header of a free extent covering `sectors` sectors.
    #[inline]
    pub fn free_extent(sectors: u32) -> Self {
        ChunkHeader {
            is_start: false,
            kind: ChunkKind::Continuation { next: 0, sectors },
        }
    }

    pub fn decode(word: u32) -> Self {
        let flags = MetaFlags::from_bits_truncate(word);
        let kind = if flags.contains(MetaFlags::END) {
            ChunkKind::Terminal {
                bytes: word & BYTES_MASK,
            }
        } else {
            ChunkKind::Continuation {
                next: word & NEXT_MASK,
                sectors: (word & SECTORS_MASK) >> SECTORS_SHIFT,
            }
        };

        ChunkHeader {
            is_start: flags.contains(MetaFlags::START),
            kind,
        }
    }

    pub fn encode(&self) -> u32 {
        let mut word = match self.kind {
            ChunkKind::Continuation { next, sectors } => {
                (next & NEXT_MASK) | ((sectors << SECTORS_SHIFT) & SECTORS_MASK)
            }
            ChunkKind::Terminal { bytes } => (bytes & BYTES_MASK) | MetaFlags::END.bits(),
        };
        if self.is_start {
            word |= MetaFlags::START.bits();
        }

        word
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        matches!(self.kind, ChunkKind::Terminal { .. })
    }

    /// Id of the next chunk in the chain, `None` on a terminal chunk.
    #[inline]
    pub fn next(&self) -> Option<FileId> {
        match self.kind {
            ChunkKind::Continuation { next, .. } => Some(next),
            ChunkKind::Terminal { .. } => None,
        }
    }

    /// Occupied span in sectors. Stored for continuations, derived from the
    /// payload length for terminal chunks.
    #[inline]
    pub fn span_sectors(&self, sector_size: u32) -> u32 {
        match self.kind {
            ChunkKind::Continuation { sectors, .. } => sectors,
            ChunkKind::Terminal { bytes } => (bytes + META_SIZE).div_ceil(sector_size),
        }
    }

    /// Payload bytes this chunk carries (for terminal chunks) or can carry
    /// (for continuations, whose span is always filled).
    #[inline]
    pub fn data_bytes(&self, sector_size: u32) -> u32 {
        match self.kind {
            ChunkKind::Continuation { sectors, .. } => sectors * sector_size - META_SIZE,
            ChunkKind::Terminal { bytes } => bytes,
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_roundtrip() {
        let hdr = ChunkHeader {
            is_start: true,
            kind: ChunkKind::Continuation {
                next: 0x7FFF,
                sectors: 0x7FFF,
            },
        };
        assert_eq!(ChunkHeader::decode(hdr.encode()), hdr);

        let hdr = ChunkHeader {
            is_start: false,
            kind: ChunkKind::Continuation { next: 3, sectors: 1 },
        };
        assert_eq!(ChunkHeader::decode(hdr.encode()), hdr);
    }

    #[test]
    fn test_terminal_roundtrip() {
        for bytes in [0, 1, MAX_BYTES] {
            let hdr = ChunkHeader {
                is_start: true,
                kind: ChunkKind::Terminal { bytes },
            };
            assert_eq!(ChunkHeader::decode(hdr.encode()), hdr);
        }
    }

    #[test]
    fn test_flag_bits() {
        let word = ChunkHeader {
            is_start: true,
            kind: ChunkKind::Terminal { bytes: 7 },
        }
        .encode();

        assert_eq!(word & (1 << 30), 1 << 30);
        assert_eq!(word & (1 << 31), 1 << 31);
        assert_eq!(word & BYTES_MASK, 7);
    }

    #[test]
    fn test_free_extent_is_plain_continuation() {
        let hdr = ChunkHeader::free_extent(12);
        assert!(!hdr.is_start);
        assert_eq!(hdr.next(), Some(0));
        assert_eq!(hdr.span_sectors(0x200), 12);
    }

    #[test]
    fn test_terminal_span_rounds_up() {
        let sector = 0x200;

        // The metadata word itself occupies payload space.
        let exact = ChunkHeader {
            is_start: false,
            kind: ChunkKind::Terminal {
                bytes: sector - META_SIZE,
            },
        };
        assert_eq!(exact.span_sectors(sector), 1);

        let spill = ChunkHeader {
            is_start: false,
            kind: ChunkKind::Terminal {
                bytes: sector - META_SIZE + 1,
            },
        };
        assert_eq!(spill.span_sectors(sector), 2);

        // An empty file still needs a sector for its word.
        let empty = ChunkHeader {
            is_start: true,
            kind: ChunkKind::Terminal { bytes: 0 },
        };
        assert_eq!(empty.span_sectors(sector), 1);
    }

    #[test]
    fn test_data_bytes() {
        let sector = 0x200;

        let cont = ChunkHeader {
            is_start: false,
            kind: ChunkKind::Continuation { next: 9, sectors: 3 },
        };
        assert_eq!(cont.data_bytes(sector), 3 * sector - META_SIZE);

        let term = ChunkHeader {
            is_start: false,
            kind: ChunkKind::Terminal { bytes: 77 },
        };
        assert_eq!(term.data_bytes(sector), 77);
    }
}
