pub mod aac;
pub mod recorder;

use crate::error::Result;

/// The compressor that feeds the muxer. Produces whole frames and the
/// decoder configuration blob the esds box carries.
pub trait FrameEncoder {
    /// AudioSpecificConfig (or equivalent) for the decoder.
    fn decoder_config(&self) -> &[u8];

    /// Samples per channel consumed by one `encode` call.
    fn frame_samples(&self) -> usize;

    /// Encode exactly `frame_samples() * channels` interleaved samples.
    /// An empty result means no frame was produced yet.
    fn encode(&mut self, pcm: &[i16]) -> Result<Vec<u8>>;

    /// Frames still held back by the encoder's lookahead once input ends.
    fn flush(&mut self) -> Result<Vec<Vec<u8>>> {
        Ok(Vec::new())
    }
}
