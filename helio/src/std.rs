// SPDX-License-Identifier: MIT

use std::io::{Error, Read, Seek, SeekFrom, Write};

use crate::{BlockIO, BlockIOError, BlockIOResult};

/// File/stream implementation of `BlockIO` over any `Read + Write + Seek`.
///
/// The stream length is sampled once at construction and reported as the
/// device size; the stream is not grown or shrunk afterwards.
#[derive(Debug)]
pub struct StdBlockIO<'a, T: Read + Write + Seek> {
    io: &'a mut T,
    total_size: u64,
    sector_size: u32,
}

impl<'a, T: Read + Write + Seek> StdBlockIO<'a, T> {
    pub fn new(io: &'a mut T, sector_size: u32) -> BlockIOResult<Self> {
        let total_size = io.seek(SeekFrom::End(0))?;
        io.seek(SeekFrom::Start(0))?;
        Ok(Self {
            io,
            total_size,
            sector_size,
        })
    }
}

impl<'a, T: Read + Write + Seek> BlockIO for StdBlockIO<'a, T> {
    #[inline]
    fn total_size(&self) -> u64 {
        self.total_size
    }

    #[inline]
    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(BlockIOError::OutOfBounds)?;
        if end > self.total_size {
            return Err(BlockIOError::OutOfBounds);
        }
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.write_all(data)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.read_exact(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> BlockIOResult {
        self.io.flush()?;
        Ok(())
    }
}

impl From<Error> for BlockIOError {
    #[cold]
    #[inline(never)]
    fn from(e: Error) -> Self {
        // Leak the string to produce a 'static str. Acceptable for error mapping.
        let leaked_str: &'static str = Box::leak(e.to_string().into_boxed_str());
        BlockIOError::Other(leaked_str)
    }
}

#[cfg(test)]
mod test {
    use crate::prelude::*;
    use tempfile::tempfile;

    #[test]
    fn test_rw() {
        let mut file = tempfile().unwrap();
        file.set_len(256).unwrap();
        let mut io = StdBlockIO::new(&mut file, 32).unwrap();
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_geometry() {
        let mut file = tempfile().unwrap();
        file.set_len(1024).unwrap();
        let io = StdBlockIO::new(&mut file, 32).unwrap();
        assert_eq!(io.total_size(), 1024);
        assert_eq!(io.sector_size(), 32);
    }

    #[test]
    fn test_write_past_end() {
        let mut file = tempfile().unwrap();
        file.set_len(64).unwrap();
        let mut io = StdBlockIO::new(&mut file, 32).unwrap();

        assert_eq!(
            io.write_at(60, &[0u8; 8]),
            Err(BlockIOError::OutOfBounds)
        );
    }

    #[test]
    fn test_write_group_layout() {
        let mut file = tempfile().unwrap();
        file.set_len(64).unwrap();
        let mut io = StdBlockIO::new(&mut file, 32).unwrap();

        io.write_group(8, Some(0xCAFE_F00D), &[&[7, 8, 9]]).unwrap();

        assert_eq!(io.read_u32_at(8).unwrap(), 0xCAFE_F00D);
        let mut output = [0u8; 3];
        io.read_at(12, &mut output).unwrap();
        assert_eq!(output, [7, 8, 9]);
    }
}
