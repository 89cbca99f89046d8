// SPDX-License-Identifier: MIT

//! The file system kernel.
//!
//! A file is a singly-linked chain of chunks. Every chunk starts with one
//! metadata word (see [`crate::chunk`]); the word of the head chunk carries
//! the start flag, which is the only durable record that the file exists.
//!
//! Writes are ordered so that a power cut at any write boundary leaves the
//! volume consistent:
//!
//! 1. Free space is re-tiled first. Wherever a planned chunk does not line
//!    up with the free extents on the device, the leftover extent word is
//!    written before the shrunk one, so free space never stops being covered
//!    by valid words.
//! 2. Payloads are then committed back to front, each chunk as one write
//!    group sealed by its metadata word. The head word lands last; until it
//!    does the file does not exist, and the sectors it touched still read as
//!    free tiles.
//!
//! Mounting rebuilds the in-RAM usage map by scanning: chains reachable from
//! a start word are marked used, any other word is skipped by its span.
//! Chunks of a file that never gained its head word are never reached and
//! stay free.

use alloc::vec::Vec;

use helio::{BlockIO, BlockIOExt};

use crate::allocator::{ChunkSpan, plan_chunks};
use crate::chunk::{ChunkHeader, ChunkKind, FileId, MAX_BYTES, META_SIZE};
use crate::errors::{FsError, FsResult};
use crate::meta::HelMeta;
use crate::usage::UsageMap;

/// The chunk-chained file system over a [`BlockIO`] device.
///
/// Files are flat byte runs addressed by [`FileId`], the sector id of their
/// head chunk. There are no directories and no metadata beyond the per-chunk
/// words.
#[derive(Debug)]
pub struct HelFs<IO> {
    io: IO,
    meta: HelMeta,
    usage: UsageMap,
}

impl<IO: BlockIO> HelFs<IO> {
    /// Brings up the file system on an already formatted device.
    ///
    /// Scans the chunk words to rebuild the usage map. The device must have
    /// been formatted at some point; mounting a device with garbage where
    /// the tiling should be is undefined.
    pub fn init(io: IO) -> FsResult<Self> {
        let meta = HelMeta::from_io(&io)?;
        let usage = UsageMap::new(meta.total_sectors())?;

        let mut fs = HelFs { io, meta, usage };
        fs.rebuild_usage()?;

        Ok(fs)
    }

    /// Formats the device and brings the file system up.
    ///
    /// Writes a single free-extent word covering the whole device. Existing
    /// chunk words become unreachable but are not wiped; use
    /// [`HelFs::format_full`] to destroy them.
    pub fn format(mut io: IO) -> FsResult<Self> {
        let meta = HelMeta::from_io(&io)?;

        let all_free = ChunkHeader::free_extent(meta.total_sectors());
        io.write_group(0, Some(all_free.encode()), &[])?;

        Self::init(io)
    }

    /// Zero-fills the device, then formats it.
    pub fn format_full(mut io: IO) -> FsResult<Self> {
        let total = io.total_size();
        io.zero_fill(0, total as usize)?;

        Self::format(io)
    }

    /// Flushes the device and hands it back.
    pub fn close(mut self) -> FsResult<IO> {
        self.io.flush()?;
        Ok(self.io)
    }

    #[inline]
    pub fn meta(&self) -> &HelMeta {
        &self.meta
    }

    #[inline]
    pub fn io(&self) -> &IO {
        &self.io
    }

    /// Creates a file holding the concatenation of `bufs` and returns its id.
    ///
    /// The data lands in one pass: chunks are planned, free space is
    /// re-tiled, then every chunk is written back to front so the head word
    /// commits last. A cut at any point before that final word leaves the
    /// volume without the file and without leaked space.
    ///
    /// Accepting multiple buffers lets callers prepend framing without
    /// copying payloads around.
    pub fn create_and_write(&mut self, bufs: &[&[u8]]) -> FsResult<FileId> {
        let mut total: u64 = 0;
        for buf in bufs {
            total += buf.len() as u64;
        }
        crate::ensure!(total <= MAX_BYTES as u64, FsError::OutOfSpace);

        let spans = plan_chunks(&self.usage, &self.meta, total as u32)?;
        self.organize_chunks(&spans)?;
        self.commit_chunks(&spans, bufs, total)?;

        Ok(spans[0].id)
    }

    /// Reads `out.len()` bytes of file `id`, starting `begin` bytes in.
    ///
    /// Fails with [`FsError::Bounds`] when the range runs past the end of
    /// the file. Reading zero bytes from a valid file always succeeds, with
    /// any `begin`.
    pub fn read(&mut self, id: FileId, begin: u32, out: &mut [u8]) -> FsResult {
        crate::ensure!(id < self.meta.total_sectors(), FsError::Bounds);

        let mut hdr = self.read_header(id)?;
        crate::ensure!(hdr.is_start, FsError::NotAFile);

        let sector_size = self.meta.sector_size();
        let mut begin = begin;
        let mut curr = id;
        let mut pos = 0;

        while pos < out.len() {
            let data = hdr.data_bytes(sector_size);
            let skip = data.min(begin);
            begin -= skip;

            let avail = (data - skip) as usize;
            let read_len = avail.min(out.len() - pos);
            if read_len != 0 {
                let offset = self.meta.sector_offset(curr) + (META_SIZE + skip) as u64;
                self.io.read_at(offset, &mut out[pos..pos + read_len])?;
                pos += read_len;
            }

            match hdr.kind {
                ChunkKind::Terminal { .. } => {
                    // Chain ended with bytes still owed.
                    crate::ensure!(pos == out.len(), FsError::Bounds);
                }
                ChunkKind::Continuation { next, .. } => {
                    curr = next;
                    hdr = self.read_header(next)?;
                }
            }
        }

        Ok(())
    }

    /// Deletes file `id` and frees its chain.
    ///
    /// The head word is rewritten without its start flag before the usage
    /// map lets the sectors go, so a failed write cannot leave the file
    /// half-forgotten. On power loss the chain simply reappears or not,
    /// whole either way.
    pub fn delete(&mut self, id: FileId) -> FsResult {
        crate::ensure!(id < self.meta.total_sectors(), FsError::Bounds);

        let hdr = self.read_header(id)?;
        crate::ensure!(hdr.is_start, FsError::NotAFile);

        let cleared = ChunkHeader {
            is_start: false,
            ..hdr
        };
        self.write_header(id, cleared)?;
        self.mark_chain(id, cleared, false)?;

        Ok(())
    }

    /// Id of the first file on the volume, in sector order.
    ///
    /// Fails with [`FsError::FileNotFound`] when the volume holds no files.
    pub fn first_file(&mut self) -> FsResult<FileId> {
        let hdr = self.read_header(0)?;
        if hdr.is_start {
            return Ok(0);
        }

        self.next_file(0)
    }

    /// Id of the first file after `id`, in sector order.
    ///
    /// `id` may be any chunk position, not just a file. Fails with
    /// [`FsError::FileNotFound`] past the last file. Creating or deleting
    /// files invalidates a running iteration.
    pub fn next_file(&mut self, id: FileId) -> FsResult<FileId> {
        crate::ensure!(id < self.meta.total_sectors(), FsError::Bounds);

        let mut hdr = self.read_header(id)?;
        let mut curr = id;

        loop {
            match self.step_chunk(curr, &hdr)? {
                Some((next_id, next_hdr)) => {
                    curr = next_id;
                    hdr = next_hdr;
                }
                None => crate::bail!(FsError::FileNotFound),
            }

            if hdr.is_start {
                return Ok(curr);
            }
        }
    }

    // === Chunk word access ===

    fn read_header(&mut self, id: FileId) -> FsResult<ChunkHeader> {
        let word = self.io.read_u32_at(self.meta.sector_offset(id))?;
        Ok(ChunkHeader::decode(word))
    }

    fn write_header(&mut self, id: FileId, hdr: ChunkHeader) -> FsResult {
        self.io
            .write_group(self.meta.sector_offset(id), Some(hdr.encode()), &[])?;
        Ok(())
    }

    /// Positional hop to the chunk word following `id`'s span, or `None` at
    /// the device end.
    ///
    /// A zero-span word only ever comes from unformatted media; it fails with
    /// [`FsError::Bounds`] so the scan cannot spin in place on it.
    fn step_chunk(
        &mut self,
        id: FileId,
        hdr: &ChunkHeader,
    ) -> FsResult<Option<(FileId, ChunkHeader)>> {
        let span = hdr.span_sectors(self.meta.sector_size());
        crate::ensure!(span != 0, FsError::Bounds);

        let next_id = id + span;
        if next_id >= self.meta.total_sectors() {
            return Ok(None);
        }

        let next_hdr = self.read_header(next_id)?;
        Ok(Some((next_id, next_hdr)))
    }

    // === Usage map maintenance ===

    /// Marks the whole chain starting at `id` as used or free.
    fn mark_chain(&mut self, id: FileId, first: ChunkHeader, used: bool) -> FsResult {
        let sector_size = self.meta.sector_size();
        let mut curr = id;
        let mut hdr = first;

        loop {
            self.usage.mark_span(curr, hdr.span_sectors(sector_size), used);

            match hdr.next() {
                Some(next) => {
                    hdr = self.read_header(next)?;
                    curr = next;
                }
                None => return Ok(()),
            }
        }
    }

    /// Rebuilds the usage map from the chunk words.
    ///
    /// Every free position holds a decodable word, so the scan can hop spans
    /// without knowing what the bytes in between mean.
    fn rebuild_usage(&mut self) -> FsResult {
        self.usage.clear();

        let mut curr = 0;
        while let Some(id) = self.usage.find_first_free(curr) {
            curr = id;
            let hdr = self.read_header(id)?;

            if hdr.is_start {
                self.mark_chain(id, hdr, true)?;
            } else {
                match self.step_chunk(id, &hdr)? {
                    Some((next_id, _)) => curr = next_id,
                    None => break,
                }
            }
        }

        Ok(())
    }

    // === Write path ===

    /// Re-tiles free space so every planned chunk starts on a word of
    /// exactly its size.
    ///
    /// When a free extent must shrink, the leftover extent's word is written
    /// first and the shrunk word second. In between the two writes the old
    /// oversized word still covers the leftover, so a cut never uncovers
    /// untiled space.
    fn organize_chunks(&mut self, spans: &[ChunkSpan]) -> FsResult {
        let sector_size = self.meta.sector_size();

        for span in spans {
            let empty_sectors = self.usage.free_run(span.id);
            let needed = (span.bytes + META_SIZE).div_ceil(sector_size);
            let first = self.read_header(span.id)?;

            let mut update_first = false;
            let mut split_leftover = false;

            if first.span_sectors(sector_size) != needed {
                update_first = true;

                // Walk the free tiles to see whether one crosses the new
                // boundary.
                let mut walk = first;
                let mut walk_id = span.id;
                loop {
                    walk_id += walk.span_sectors(sector_size);
                    if walk_id > span.id + needed {
                        split_leftover = true;
                        break;
                    }
                    if walk_id == span.id + needed {
                        break;
                    }
                    walk = self.read_header(walk_id)?;
                }
            }

            if split_leftover {
                let leftover = ChunkHeader::free_extent(empty_sectors - needed);
                self.write_header(span.id + needed, leftover)?;
            }
            if update_first {
                self.write_header(span.id, ChunkHeader::free_extent(needed))?;
            }
        }

        Ok(())
    }

    /// Writes the planned chunks back to front, head word last.
    fn commit_chunks(&mut self, spans: &[ChunkSpan], bufs: &[&[u8]], total: u64) -> FsResult {
        let sector_size = self.meta.sector_size();

        let mut scratch: Vec<&[u8]> = Vec::new();
        scratch
            .try_reserve(bufs.len())
            .map_err(|_| FsError::OutOfMemory)?;

        let mut end = total;
        for (i, span) in spans.iter().enumerate().rev() {
            let start = end - span.bytes as u64;

            let kind = if i == spans.len() - 1 {
                ChunkKind::Terminal { bytes: span.bytes }
            } else {
                ChunkKind::Continuation {
                    next: spans[i + 1].id,
                    sectors: (span.bytes + META_SIZE).div_ceil(sector_size),
                }
            };
            let hdr = ChunkHeader {
                is_start: i == 0,
                kind,
            };

            gather(bufs, start, span.bytes as u64, &mut scratch);

            self.usage.mark_span(span.id, hdr.span_sectors(sector_size), true);
            self.io
                .write_group(self.meta.sector_offset(span.id), Some(hdr.encode()), &scratch)?;

            end = start;
        }

        Ok(())
    }
}

/// Collects the subslices of `bufs` covering `len` bytes of the logical
/// concatenation starting at `start`.
fn gather<'a>(bufs: &[&'a [u8]], start: u64, len: u64, out: &mut Vec<&'a [u8]>) {
    out.clear();

    let mut skip = start;
    let mut left = len;
    for &buf in bufs {
        if left == 0 {
            break;
        }

        let buf_len = buf.len() as u64;
        if skip >= buf_len {
            skip -= buf_len;
            continue;
        }

        let take = (buf_len - skip).min(left);
        out.push(&buf[skip as usize..(skip + take) as usize]);
        skip = 0;
        left -= take;
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_gather_single_buffer() {
        let data = [1u8, 2, 3, 4, 5];
        let bufs: [&[u8]; 1] = [&data];
        let mut out = Vec::new();

        gather(&bufs, 1, 3, &mut out);
        assert_eq!(out, vec![&data[1..4]]);
    }

    #[test]
    fn test_gather_across_buffers() {
        let a = [1u8, 2, 3];
        let b = [4u8, 5];
        let c = [6u8, 7, 8, 9];
        let bufs: [&[u8]; 3] = [&a, &b, &c];
        let mut out = Vec::new();

        // Covers tail of a, all of b, head of c.
        gather(&bufs, 2, 5, &mut out);
        let flat: Vec<u8> = out.iter().flat_map(|s| s.iter().copied()).collect();
        assert_eq!(flat, [3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_gather_skips_empty_buffers() {
        let a = [1u8, 2];
        let b: [u8; 0] = [];
        let c = [3u8];
        let bufs: [&[u8]; 3] = [&a, &b, &c];
        let mut out = Vec::new();

        gather(&bufs, 0, 3, &mut out);
        assert_eq!(out.len(), 2);
        let flat: Vec<u8> = out.iter().flat_map(|s| s.iter().copied()).collect();
        assert_eq!(flat, [1, 2, 3]);
    }

    #[test]
    fn test_gather_zero_len() {
        let a = [1u8, 2];
        let bufs: [&[u8]; 1] = [&a];
        let mut out = vec![&a[..]];

        gather(&bufs, 0, 0, &mut out);
        assert!(out.is_empty());
    }
}
