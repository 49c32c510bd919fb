use std::io::{ErrorKind, Read, Seek, Write};

use super::FrameEncoder;
use crate::error::Result;
use crate::mp4::Mp4Muxer;

/// Encode interleaved s16le PCM from `reader` and feed every produced frame
/// to `muxer`. The last partial frame is padded with silence, and the
/// encoder is drained once the reader is exhausted.
///
/// Returns the number of PCM samples (per channel) consumed from the reader.
pub fn encode_pcm<R, E, W>(mut reader: R, encoder: &mut E, muxer: &mut Mp4Muxer<W>) -> Result<u64>
where
    R: Read,
    E: FrameEncoder,
    W: Write + Seek,
{
    let channels = muxer.session().params().channels as usize;
    let frame_samples = encoder.frame_samples();
    let frame_len = frame_samples * channels;

    let mut bytes = vec![0u8; frame_len * 2];
    let mut pcm = vec![0i16; frame_len];
    let mut consumed = 0u64;
    let mut frames = 0usize;

    log::info!("Encoding PCM: {channels} ch, {frame_samples} samples per frame");

    loop {
        let filled = fill(&mut reader, &mut bytes)?;
        let samples = filled / 2;
        if samples == 0 {
            break;
        }

        for (dst, src) in pcm.iter_mut().zip(bytes[..samples * 2].chunks_exact(2)) {
            *dst = i16::from_le_bytes([src[0], src[1]]);
        }
        // Pad last partial frame with silence
        for s in &mut pcm[samples..] {
            *s = 0;
        }
        consumed += (samples / channels) as u64;

        let aac_data = encoder.encode(&pcm)?;
        if !aac_data.is_empty() {
            muxer.feed_frame(&aac_data, frame_samples as u32)?;
            frames += 1;
        }

        if filled < bytes.len() {
            break;
        }
    }

    for aac_data in encoder.flush()? {
        muxer.feed_frame(&aac_data, frame_samples as u32)?;
        frames += 1;
    }

    log::info!("Encoded {consumed} samples into {frames} frames");
    Ok(consumed)
}

/// Read until `buf` is full or the reader is exhausted.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
