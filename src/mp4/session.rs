//! Per-file muxing state: stream parameters, running statistics and the
//! frame-size history the trailer's sample tables are built from.

use std::cell::Cell;

use serde::Serialize;

use super::tags::Tags;
use crate::error::{MuxError, Result};

/// Consecutive descriptor faults tolerated before the tree write is abandoned.
pub const DESCRIPTOR_FAULT_LIMIT: u32 = 10;

/// Frame-size table growth step, in entries.
const FRAME_TABLE_STEP: usize = 0x4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl StreamParams {
    pub fn new(sample_rate: u32, channels: u16, bit_depth: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(MuxError::invalid_config("sample rate must be non-zero"));
        }
        if channels == 0 {
            return Err(MuxError::invalid_config("channel count must be non-zero"));
        }
        Ok(Self {
            sample_rate,
            channels,
            bit_depth,
        })
    }
}

/// Totals reported when a file is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MuxSummary {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
    pub total_samples: u64,
    pub payload_bytes: u64,
    pub peak_bitrate: u32,
    pub average_bitrate: u32,
    pub peak_frame_bytes: u32,
    pub duration_seconds: f64,
}

#[derive(Debug)]
pub struct Session {
    pub(crate) params: StreamParams,
    total_samples: u64,
    payload_bytes: u64,
    peak_bitrate: u32,
    average_bitrate: u32,
    peak_frame_bytes: u32,
    /// Largest per-frame sample count seen; gates peak bitrate updates.
    widest_frame_samples: u32,
    payload_base_offset: Option<u64>,
    frame_sizes: Vec<u32>,
    decoder_config: Vec<u8>,
    tags: Tags,
    creation_time: u32,
    /// Consecutive non-box nodes met by the creator, which only reads the session.
    descriptor_faults: Cell<u32>,
}

impl Session {
    pub fn new(params: StreamParams) -> Self {
        Self {
            params,
            total_samples: 0,
            payload_bytes: 0,
            peak_bitrate: 0,
            average_bitrate: 0,
            peak_frame_bytes: 0,
            widest_frame_samples: 0,
            payload_base_offset: None,
            frame_sizes: Vec::new(),
            decoder_config: Vec::new(),
            tags: Tags::default(),
            creation_time: 0,
            descriptor_faults: Cell::new(0),
        }
    }

    pub fn params(&self) -> StreamParams {
        self.params
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    pub fn peak_bitrate(&self) -> u32 {
        self.peak_bitrate
    }

    pub fn average_bitrate(&self) -> u32 {
        self.average_bitrate
    }

    pub fn peak_frame_bytes(&self) -> u32 {
        self.peak_frame_bytes
    }

    pub fn payload_base_offset(&self) -> Option<u64> {
        self.payload_base_offset
    }

    pub fn frame_sizes(&self) -> &[u32] {
        &self.frame_sizes
    }

    pub fn decoder_config(&self) -> &[u8] {
        &self.decoder_config
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub(crate) fn creation_time(&self) -> u32 {
        self.creation_time
    }

    pub(crate) fn set_decoder_config(&mut self, config: &[u8]) {
        self.decoder_config = config.to_vec();
    }

    pub(crate) fn set_tags(&mut self, tags: Tags) {
        self.tags = tags;
    }

    pub(crate) fn set_creation_time(&mut self, t: u32) {
        self.creation_time = t;
    }

    /// Records where the first payload byte lives. Set once per file.
    pub(crate) fn set_payload_base_offset(&mut self, offset: u64) -> Result<()> {
        if let Some(existing) = self.payload_base_offset {
            return Err(MuxError::state(format!(
                "payload offset already fixed at {existing}"
            )));
        }
        self.payload_base_offset = Some(offset);
        Ok(())
    }

    /// Account one frame that has already been appended to the payload.
    /// Nothing is counted if the frame-size table cannot grow.
    pub(crate) fn record_frame(&mut self, bytes: u32, samples: u32) -> Result<()> {
        if self.frame_sizes.len() == self.frame_sizes.capacity() {
            self.frame_sizes.try_reserve(FRAME_TABLE_STEP).map_err(|e| {
                MuxError::ResourceExhausted(format!(
                    "frame-size table at {} entries: {e}",
                    self.frame_sizes.len()
                ))
            })?;
        }
        self.frame_sizes.push(bytes);

        if samples > 0 && self.widest_frame_samples <= samples {
            let bitrate =
                (8.0 * bytes as f64 * self.params.sample_rate as f64 / samples as f64) as u32;
            self.peak_bitrate = self.peak_bitrate.max(bitrate);
            self.widest_frame_samples = samples;
        }
        self.peak_frame_bytes = self.peak_frame_bytes.max(bytes);
        self.total_samples += samples as u64;
        self.payload_bytes += bytes as u64;
        Ok(())
    }

    pub(crate) fn finalize_average_bitrate(&mut self) {
        self.average_bitrate = if self.total_samples == 0 {
            0
        } else {
            (8.0 * self.payload_bytes as f64 * self.params.sample_rate as f64
                / self.total_samples as f64) as u32
        };
    }

    /// Returns the number of consecutive faults including this one.
    pub(crate) fn record_descriptor_fault(&self) -> u32 {
        let faults = self.descriptor_faults.get() + 1;
        self.descriptor_faults.set(faults);
        faults
    }

    pub(crate) fn clear_descriptor_faults(&self) {
        self.descriptor_faults.set(0);
    }

    pub(crate) fn release_frame_table(&mut self) {
        self.frame_sizes = Vec::new();
    }

    pub fn summary(&self) -> MuxSummary {
        MuxSummary {
            sample_rate: self.params.sample_rate,
            channels: self.params.channels,
            frames: self.frame_sizes.len(),
            total_samples: self.total_samples,
            payload_bytes: self.payload_bytes,
            peak_bitrate: self.peak_bitrate,
            average_bitrate: self.average_bitrate,
            peak_frame_bytes: self.peak_frame_bytes,
            duration_seconds: self.total_samples as f64 / self.params.sample_rate as f64,
        }
    }
}
