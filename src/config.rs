use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MuxError, Result};
use crate::mp4::{MuxSummary, StreamParams, Tags};

fn default_bit_depth() -> u16 {
    16
}

/// Settings for one encode-and-mux run, loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuxConfig {
    pub sample_rate: u32,
    pub channels: u16,
    #[serde(default = "default_bit_depth")]
    pub bit_depth: u16,
    /// Encoder target in bits per second. Defaults to 64 kbps per channel.
    #[serde(default)]
    pub bitrate: Option<u32>,
    #[serde(default)]
    pub tags: Tags,
}

impl MuxConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MuxConfig = serde_json::from_str(json)
            .map_err(|e| MuxError::Config(format!("Failed to parse config: {e}")))?;
        config.stream_params()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref()).map_err(|e| {
            MuxError::Config(format!("Failed to read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn stream_params(&self) -> Result<StreamParams> {
        StreamParams::new(self.sample_rate, self.channels, self.bit_depth)
    }

    pub fn bitrate(&self) -> u32 {
        self.bitrate.unwrap_or(64_000 * self.channels as u32)
    }
}

/// Write the run summary as pretty JSON.
pub fn write_summary<P: AsRef<Path>>(path: P, summary: &MuxSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| MuxError::Config(format!("Failed to serialize summary: {e}")))?;
    fs::write(path.as_ref(), json)?;
    log::info!("Summary written: {}", path.as_ref().display());
    Ok(())
}
