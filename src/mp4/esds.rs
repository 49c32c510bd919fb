//! Elementary stream descriptor (`esds`) content.
//!
//! Descriptor tree:
//! - ES_Descriptor
//!   - DecoderConfigDescriptor
//!     - DecoderSpecificInfo (the AudioSpecificConfig blob)
//!   - SLConfigDescriptor
//!
//! Descriptor sizes are single bytes and are computed bottom-up before anything
//! is written; unlike boxes they are never backpatched.

use std::io::{Seek, Write};

use super::wire::Wire;
use crate::error::{MuxError, Result};

const TAG_ES: u8 = 3;
const TAG_DECODER_CONFIG: u8 = 4;
const TAG_DECODER_SPECIFIC: u8 = 5;
const TAG_SL_CONFIG: u8 = 6;

/// objectTypeIndication: MPEG-4 audio.
const OBJECT_TYPE_AUDIO: u8 = 0x40;
/// Stream-type byte. Carries the AAC-LC object type in bits 2-7.
const STREAM_TYPE: u8 = 2 << 2;

/// Fixed fields: ES_ID(2) + flags(1).
const ES_FIXED: usize = 3;
/// Fixed fields: object type(1) + stream type(1) + buffer size(3) + max(4) + avg(4).
const DECODER_CONFIG_FIXED: usize = 13;
const SL_CONFIG_LEN: usize = 1;

/// Content size of a child descriptor plus its own tag and size bytes.
const fn with_header(content: usize) -> usize {
    content + 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorSizes {
    pub es: u8,
    pub decoder_config: u8,
    pub decoder_specific: u8,
    pub sl_config: u8,
}

impl DescriptorSizes {
    pub fn for_config(config_len: usize) -> Result<Self> {
        let decoder_specific = config_len;
        let decoder_config = DECODER_CONFIG_FIXED + with_header(decoder_specific);
        let es = ES_FIXED + with_header(decoder_config) + with_header(SL_CONFIG_LEN);

        let es = u8::try_from(es).map_err(|_| {
            MuxError::invalid_config(format!(
                "decoder config of {config_len} bytes does not fit a one-byte descriptor size"
            ))
        })?;
        Ok(Self {
            es,
            decoder_config: decoder_config as u8,
            decoder_specific: decoder_specific as u8,
            sl_config: SL_CONFIG_LEN as u8,
        })
    }
}

pub struct EsdsFields<'a> {
    pub decoder_config: &'a [u8],
    pub buffer_size: u32,
    pub max_bitrate: u32,
    pub avg_bitrate: u32,
}

pub fn write<W: Write + Seek>(wire: &mut Wire<W>, fields: &EsdsFields<'_>) -> Result<u32> {
    let sizes = DescriptorSizes::for_config(fields.decoder_config.len())?;
    let mut size = 0;

    size += wire.u32(0)?; // version/flags

    size += wire.u8(TAG_ES)?;
    size += wire.u8(sizes.es)?;
    size += wire.u16(0)?; // ES_ID
    size += wire.u8(0)?; // url/ocr/priority flags

    size += wire.u8(TAG_DECODER_CONFIG)?;
    size += wire.u8(sizes.decoder_config)?;
    size += wire.u8(OBJECT_TYPE_AUDIO)?;
    size += wire.u8(STREAM_TYPE)?;
    // 24-bit bufferSizeDB. The low byte is a logical AND in the reference
    // layout, so it is 1 for any non-zero buffer size.
    size += wire.u16((fields.buffer_size >> 8) as u16)?;
    size += wire.u8((fields.buffer_size != 0) as u8)?;
    size += wire.u32(fields.max_bitrate)?;
    size += wire.u32(fields.avg_bitrate)?;

    size += wire.u8(TAG_DECODER_SPECIFIC)?;
    size += wire.u8(sizes.decoder_specific)?;
    size += wire.bytes(fields.decoder_config)?;

    size += wire.u8(TAG_SL_CONFIG)?;
    size += wire.u8(sizes.sl_config)?;
    size += wire.u8(2)?; // predefined: MP4

    Ok(size)
}
