//! Cursor adapter implementing `std::io` traits over a blob handle

use super::BlobHandle;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Sequential view of a handle
///
/// Reads stop at the cell's fixed size. Writes past the end transfer nothing,
/// which `write_all` reports as [`io::ErrorKind::WriteZero`].
pub struct BlobStream<'h, 's> {
    handle: &'h mut BlobHandle<'s>,
    position: usize,
}

impl<'h, 's> BlobStream<'h, 's> {
    pub fn new(handle: &'h mut BlobHandle<'s>) -> Self {
        Self {
            handle,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn remaining(&self) -> io::Result<usize> {
        Ok(self.handle.size()?.saturating_sub(self.position))
    }
}

impl Read for BlobStream<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining()?);
        if n == 0 {
            return Ok(0);
        }

        self.handle.read(buf, 0, n, self.position)?;
        self.position += n;
        Ok(n)
    }
}

impl Write for BlobStream<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining()?);
        if n == 0 {
            return Ok(0);
        }

        self.handle.write(buf, 0, n, self.position)?;
        self.position += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for BlobStream<'_, '_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(n) => (0i128, i128::from(n)),
            SeekFrom::End(n) => (self.handle.size()? as i128, i128::from(n)),
            SeekFrom::Current(n) => (self.position as i128, i128::from(n)),
        };

        let target = base + delta;
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }

        self.position = usize::try_from(target)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek position overflows"))?;
        Ok(self.position as u64)
    }
}
