//! Sample index tables (`stts`, `stsz`, `stsc`, `stco`) derived from the
//! per-frame size history.

use std::io::{Seek, Write};

use super::wire::Wire;
use crate::error::{MuxError, Result};

/// Samples per AAC-LC frame. Every frame gets the same duration.
pub const FRAME_DURATION: u32 = 1024;

/// Frames grouped into one chunk offset entry.
pub const FRAMES_PER_CHUNK: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeToSample {
    pub sample_count: u32,
    pub sample_delta: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleToChunk {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTable<'a> {
    pub time_to_sample: TimeToSample,
    pub sizes: &'a [u32],
    pub sample_to_chunk: [SampleToChunk; 2],
    pub chunk_offsets: Vec<u64>,
}

impl<'a> SampleTable<'a> {
    /// Build the tables for frames laid out back to back from `base_offset`.
    ///
    /// There are always `frames / 256 + 1` chunks. When the frame count is a
    /// multiple of 256 the last chunk is empty and its offset is the end of
    /// the payload.
    pub fn build(frame_sizes: &'a [u32], base_offset: u64) -> Self {
        let frames = frame_sizes.len();
        let full_chunks = frames / FRAMES_PER_CHUNK;

        let mut chunk_offsets = Vec::with_capacity(full_chunks + 1);
        let mut offset = base_offset;
        for (i, &size) in frame_sizes.iter().enumerate() {
            if i % FRAMES_PER_CHUNK == 0 {
                chunk_offsets.push(offset);
            }
            offset += size as u64;
        }
        if frames % FRAMES_PER_CHUNK == 0 {
            chunk_offsets.push(offset);
        }

        Self {
            time_to_sample: TimeToSample {
                sample_count: frames as u32,
                sample_delta: FRAME_DURATION,
            },
            sizes: frame_sizes,
            sample_to_chunk: [
                SampleToChunk {
                    first_chunk: 1,
                    samples_per_chunk: FRAMES_PER_CHUNK as u32,
                    sample_description_index: 1,
                },
                SampleToChunk {
                    first_chunk: (full_chunks + 1) as u32,
                    samples_per_chunk: (frames & 0xff) as u32,
                    sample_description_index: 1,
                },
            ],
            chunk_offsets,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_offsets.len()
    }

    pub fn write_stts<W: Write + Seek>(&self, wire: &mut Wire<W>) -> Result<u32> {
        let mut size = 0;
        size += wire.u32(0)?; // version/flags
        size += wire.u32(1)?; // entry count
        size += wire.u32(self.time_to_sample.sample_count)?;
        size += wire.u32(self.time_to_sample.sample_delta)?;
        Ok(size)
    }

    pub fn write_stsz<W: Write + Seek>(&self, wire: &mut Wire<W>) -> Result<u32> {
        let mut size = 0;
        size += wire.u32(0)?; // version/flags
        size += wire.u32(0)?; // sample size: variable
        size += wire.u32(self.sizes.len() as u32)?;
        for &s in self.sizes {
            size += wire.u32(s)?;
        }
        Ok(size)
    }

    pub fn write_stsc<W: Write + Seek>(&self, wire: &mut Wire<W>) -> Result<u32> {
        let mut size = 0;
        size += wire.u32(0)?; // version/flags
        size += wire.u32(self.sample_to_chunk.len() as u32)?;
        for entry in &self.sample_to_chunk {
            size += wire.u32(entry.first_chunk)?;
            size += wire.u32(entry.samples_per_chunk)?;
            size += wire.u32(entry.sample_description_index)?;
        }
        Ok(size)
    }

    pub fn write_stco<W: Write + Seek>(&self, wire: &mut Wire<W>) -> Result<u32> {
        let mut size = 0;
        size += wire.u32(0)?; // version/flags
        size += wire.u32(self.chunk_count() as u32)?;
        for &offset in &self.chunk_offsets {
            let offset = u32::try_from(offset).map_err(|_| {
                MuxError::state(format!("chunk offset {offset} exceeds 32-bit stco range"))
            })?;
            size += wire.u32(offset)?;
        }
        Ok(size)
    }
}
