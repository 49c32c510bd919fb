//! Big-endian output primitives over a seekable sink.
//!
//! Every writer returns the number of bytes it put on the sink. Box sizes are
//! the sum of these return values and are never computed any other way.

use std::io::{self, Seek, SeekFrom, Write};

use crate::error::Result;

pub struct Wire<W: Write + Seek> {
    inner: W,
}

impl<W: Write + Seek> Wire<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn u8(&mut self, v: u8) -> Result<u32> {
        self.bytes(&[v])
    }

    pub fn u16(&mut self, v: u16) -> Result<u32> {
        self.bytes(&v.to_be_bytes())
    }

    pub fn u32(&mut self, v: u32) -> Result<u32> {
        self.bytes(&v.to_be_bytes())
    }

    /// Raw bytes, verbatim. A short write surfaces as `ErrorKind::WriteZero`.
    pub fn bytes(&mut self, data: &[u8]) -> Result<u32> {
        let len = u32::try_from(data.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("write of {} bytes exceeds 32-bit box sizing", data.len()),
            )
        })?;
        self.inner.write_all(data)?;
        Ok(len)
    }

    pub fn zeros(&mut self, count: usize) -> Result<u32> {
        let mut written = 0;
        for _ in 0..count {
            written += self.u8(0)?;
        }
        Ok(written)
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn seek_end(&mut self) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::End(0))?)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}
