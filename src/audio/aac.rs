use fdk_aac::enc::{
    AudioObjectType, BitRate, ChannelMode, EncodeInfo, Encoder, EncoderParams, Transport,
};

use super::FrameEncoder;
use crate::error::{MuxError, Result};

/// Wraps fdk-aac for AAC-LC CBR encoding, mono or stereo.
/// Outputs raw AAC frames (no ADTS headers) suitable for MP4 muxing.
pub struct AacEncoder {
    encoder: Encoder,
    /// AudioSpecificConfig bytes for the esds box.
    asc: Vec<u8>,
    /// Persistent output buffer sized to encoder's max frame bytes.
    out_buf: Vec<u8>,
    frame_samples: usize,
    channels: usize,
    /// Encoder lookahead in samples per channel.
    delay: usize,
}

impl AacEncoder {
    pub fn new(sample_rate: u32, channels: u16, bitrate: u32) -> Result<Self> {
        let channel_mode = match channels {
            1 => ChannelMode::Mono,
            2 => ChannelMode::Stereo,
            n => {
                return Err(MuxError::invalid_config(format!(
                    "AAC encoder supports 1 or 2 channels, got {n}"
                )))
            }
        };

        let params = EncoderParams {
            bit_rate: BitRate::Cbr(bitrate),
            sample_rate,
            transport: Transport::Raw,
            channels: channel_mode,
            audio_object_type: AudioObjectType::Mpeg4LowComplexity,
        };

        let encoder = Encoder::new(params)
            .map_err(|e| MuxError::encoder(format!("Failed to create AAC encoder: {e:?}")))?;

        let info = encoder
            .info()
            .map_err(|e| MuxError::encoder(format!("Failed to get AAC encoder info: {e:?}")))?;

        let asc = info.confBuf[..info.confSize as usize].to_vec();
        let out_buf = vec![0u8; info.maxOutBufBytes as usize];
        let frame_samples = info.frameLength as usize;

        log::info!(
            "AAC encoder created: {sample_rate} Hz, {channels} ch, {} kbps CBR, frame_len={}, delay={} samples, ASC={} bytes",
            bitrate / 1000,
            info.frameLength,
            info.nDelay,
            asc.len()
        );

        Ok(Self {
            encoder,
            asc,
            out_buf,
            frame_samples,
            channels: channels as usize,
            delay: info.nDelay as usize,
        })
    }
}

impl FrameEncoder for AacEncoder {
    fn decoder_config(&self) -> &[u8] {
        &self.asc
    }

    fn frame_samples(&self) -> usize {
        self.frame_samples
    }

    /// Returns empty while the encoder is still priming.
    fn encode(&mut self, pcm: &[i16]) -> Result<Vec<u8>> {
        let info: EncodeInfo = self
            .encoder
            .encode(pcm, &mut self.out_buf)
            .map_err(|e| MuxError::encoder(format!("AAC encode failed: {e:?}")))?;

        if info.output_size > 0 {
            Ok(self.out_buf[..info.output_size].to_vec())
        } else {
            Ok(Vec::new())
        }
    }

    /// Push silence through until the lookahead has been emitted.
    fn flush(&mut self) -> Result<Vec<Vec<u8>>> {
        if self.frame_samples == 0 {
            return Ok(Vec::new());
        }
        let silence = vec![0i16; self.frame_samples * self.channels];
        let mut frames = Vec::new();
        for _ in 0..self.delay.div_ceil(self.frame_samples) {
            let frame = self.encode(&silence)?;
            if !frame.is_empty() {
                frames.push(frame);
            }
        }
        log::debug!("AAC encoder drained {} delayed frames", frames.len());
        Ok(frames)
    }
}
