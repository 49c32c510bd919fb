//! Progressive MP4 (M4A) writer for a single AAC track.
//!
//! File layout:
//! - Header: ftyp + free + mdat (size patched on close)
//! - Payload: raw AAC frames appended to mdat as they arrive
//! - Trailer: moov with sample tables built from the frame-size history,
//!   plus udta/meta/ilst tags
//!
//! Nothing but the frame sizes is kept in memory, so the sink must be seekable.

pub mod atoms;
pub mod boxes;
mod creator;
pub mod esds;
pub mod sample_table;
pub mod session;
pub mod tags;
pub mod time;
pub mod wire;

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use crate::error::{MuxError, Result};
use boxes::Context;
use creator::Creator;
use wire::Wire;

pub use atoms::{validate, Node, HEADER, TRAILER};
pub use sample_table::SampleTable;
pub use session::{MuxSummary, Session, StreamParams};
pub use tags::{TagValue, Tags};

pub type FourCC = [u8; 4];

/// BufWriter capacity for output files.
const BUF_WRITER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Opened,
    Streaming,
    Finished,
    /// A write failed part way. Only `close` (or drop) is allowed.
    Failed,
}

pub struct Mp4Muxer<W: Write + Seek> {
    /// `None` once the output has been closed and handed back.
    wire: Option<Wire<W>>,
    session: Session,
    phase: Phase,
}

impl Mp4Muxer<BufWriter<File>> {
    /// Create (truncating) the output file.
    pub fn create<P: AsRef<Path>>(path: P, params: StreamParams) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        log::info!("Mp4Muxer output: {}", path.as_ref().display());
        Ok(Self::new(BufWriter::with_capacity(BUF_WRITER_SIZE, file), params))
    }
}

impl<W: Write + Seek> Mp4Muxer<W> {
    /// Start a session on an empty sink. Nothing is written until `write_header`.
    pub fn new(writer: W, params: StreamParams) -> Self {
        log::info!(
            "Mp4Muxer opened: {} Hz, {} ch, {} bit",
            params.sample_rate,
            params.channels,
            params.bit_depth
        );
        Self {
            wire: Some(Wire::new(writer)),
            session: Session::new(params),
            phase: Phase::Opened,
        }
    }

    /// Start over on a new sink. The current output, if still open, goes
    /// through the full close sequence first and is returned.
    pub fn open(&mut self, writer: W, params: StreamParams) -> Result<Option<(W, MuxSummary)>> {
        let previous = if self.wire.is_some() {
            Some(self.finish()?)
        } else {
            None
        };
        *self = Self::new(writer, params);
        Ok(previous)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// True once a write has failed. The output is corrupt and should be
    /// closed and discarded.
    pub fn is_failed(&self) -> bool {
        self.phase == Phase::Failed
    }

    /// Write ftyp, free and the mdat header, and record where the payload starts.
    pub fn write_header(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if self.phase != Phase::Opened {
            return Err(MuxError::state("header already written"));
        }
        let result = self.put_header();
        let written = self.poison_on_error("header", result)?;
        self.phase = Phase::Streaming;
        log::info!(
            "Header written: {written} bytes, payload starts at {}",
            self.session.payload_base_offset().unwrap_or_default()
        );
        Ok(())
    }

    /// Append one encoded frame representing `samples` audio samples per channel.
    pub fn feed_frame(&mut self, frame: &[u8], samples: u32) -> Result<()> {
        self.ensure_usable()?;
        if self.phase != Phase::Streaming {
            return Err(MuxError::state("frames must be fed between header and trailer"));
        }
        let result = self.put_frame(frame, samples);
        self.poison_on_error("frame", result)?;
        log::trace!(
            "frame {}: {} bytes, {samples} samples",
            self.session.frame_sizes().len(),
            frame.len()
        );
        Ok(())
    }

    /// The decoder configuration (AudioSpecificConfig) for the esds box.
    pub fn set_decoder_config(&mut self, config: &[u8]) -> Result<()> {
        self.ensure_usable()?;
        if self.phase == Phase::Finished {
            return Err(MuxError::state("trailer already written"));
        }
        esds::DescriptorSizes::for_config(config.len())?;
        self.session.set_decoder_config(config);
        Ok(())
    }

    pub fn set_tags(&mut self, tags: Tags) -> Result<()> {
        self.ensure_usable()?;
        if self.phase == Phase::Finished {
            return Err(MuxError::state("trailer already written"));
        }
        self.session.set_tags(tags);
        Ok(())
    }

    /// Write the moov box. The sample tables are built from every frame fed so far.
    pub fn write_trailer(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if self.phase != Phase::Streaming {
            return Err(MuxError::state("trailer needs a written header and may be written once"));
        }
        if self.session.decoder_config().is_empty() {
            log::warn!("No decoder config set; esds will carry an empty DecoderSpecificInfo");
        }
        self.session.finalize_average_bitrate();
        self.session.set_creation_time(time::now());

        let result = self.put_trailer();
        let written = self.poison_on_error("trailer", result)?;
        self.phase = Phase::Finished;
        log::info!(
            "Trailer written: {written} bytes, {} frames, avg {} bps, peak {} bps",
            self.session.frame_sizes().len(),
            self.session.average_bitrate(),
            self.session.peak_bitrate()
        );
        Ok(())
    }

    /// Patch the mdat size, flush, and hand the sink back.
    pub fn close(mut self) -> Result<(W, MuxSummary)> {
        self.finish()
    }

    fn put_header(&mut self) -> Result<u64> {
        let wire = self.wire.as_mut().ok_or_else(|| MuxError::state("output closed"))?;
        let written = {
            let ctx = Context::header(&self.session);
            Creator::new(wire, &ctx, HEADER).run()?
        };
        let offset = wire.position()?;
        self.session.set_payload_base_offset(offset)?;
        Ok(written)
    }

    fn put_frame(&mut self, frame: &[u8], samples: u32) -> Result<()> {
        let wire = self.wire.as_mut().ok_or_else(|| MuxError::state("output closed"))?;
        let written = wire.bytes(frame)?;
        self.session.record_frame(written, samples)
    }

    /// The sample tables are built once here and shared by every index box.
    fn put_trailer(&mut self) -> Result<u64> {
        let wire = self.wire.as_mut().ok_or_else(|| MuxError::state("output closed"))?;
        let ctx = Context::trailer(&self.session)?;
        Creator::new(wire, &ctx, TRAILER).run()
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.phase == Phase::Failed {
            return Err(MuxError::state("an earlier write failed; close and discard this output"));
        }
        Ok(())
    }

    fn poison_on_error<T>(&mut self, step: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            log::error!("Mp4Muxer {step} write failed, output is unusable: {e}");
            self.phase = Phase::Failed;
        }
        result
    }

    fn finish(&mut self) -> Result<(W, MuxSummary)> {
        let mut wire = self.wire.take().ok_or_else(|| MuxError::state("output closed"))?;
        let summary = self.session.summary();

        if let Some(base) = self.session.payload_base_offset() {
            let mdat_size = u32::try_from(self.session.payload_bytes() + 8).map_err(|_| {
                MuxError::state(format!(
                    "payload of {} bytes exceeds 32-bit mdat size",
                    self.session.payload_bytes()
                ))
            })?;
            wire.seek_to(base - 8)?;
            wire.u32(mdat_size)?;
            wire.seek_end()?;
        }
        wire.flush()?;
        self.session.release_frame_table();

        match self.phase {
            Phase::Finished => {}
            Phase::Failed => log::warn!("Mp4Muxer closed after a failed write; file is corrupt"),
            _ => log::warn!("Mp4Muxer closed before the trailer was written; file is incomplete"),
        }
        log::info!(
            "Mp4Muxer closed: {} frames, {} payload bytes, {:.2}s",
            summary.frames,
            summary.payload_bytes,
            summary.duration_seconds
        );
        Ok((wire.into_inner(), summary))
    }
}

impl<W: Write + Seek> Drop for Mp4Muxer<W> {
    fn drop(&mut self) {
        if self.wire.is_some() {
            if let Err(e) = self.finish() {
                log::error!("Mp4Muxer close on drop failed: {e}");
            }
        }
    }
}
