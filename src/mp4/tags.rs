//! iTunes-style metadata items for the `ilst` box.

use std::io::{Seek, Write};

use serde::{Deserialize, Serialize};

use super::wire::Wire;
use super::FourCC;
use crate::error::Result;

pub const DEFAULT_ENCODER: &str = concat!("m4amux ", env!("CARGO_PKG_VERSION"));

/// `data` record type flag for UTF-8 text.
const DATA_TEXT: u32 = 1;
/// `data` record type flag for integers.
const DATA_INTEGER: u32 = 0;

/// Free-form tag metadata. Text fields are written when set, integer fields when non-zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tags {
    pub encoder: Option<String>,
    pub artist: Option<String>,
    pub composer: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
    pub comment: Option<String>,
    pub compilation: u32,
    pub track: u32,
    pub disc: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagValue<'a> {
    Text(&'a str),
    Integer(u32),
}

impl Tags {
    /// Populated items in `ilst` order. The encoder item is always present.
    pub fn items(&self) -> Vec<(FourCC, TagValue<'_>)> {
        let mut items = vec![(
            *b"\xa9too",
            TagValue::Text(self.encoder.as_deref().unwrap_or(DEFAULT_ENCODER)),
        )];
        push_text(&mut items, *b"\xa9ART", &self.artist);
        push_text(&mut items, *b"\xa9wrt", &self.composer);
        push_text(&mut items, *b"\xa9nam", &self.title);
        push_text(&mut items, *b"gnre", &self.genre);
        push_text(&mut items, *b"\xa9alb", &self.album);
        push_integer(&mut items, *b"cpil", self.compilation);
        push_integer(&mut items, *b"trkn", self.track);
        push_integer(&mut items, *b"disk", self.disc);
        push_text(&mut items, *b"\xa9day", &self.year);
        push_text(&mut items, *b"\xa9cmt", &self.comment);
        items
    }
}

fn push_text<'a>(items: &mut Vec<(FourCC, TagValue<'a>)>, name: FourCC, value: &'a Option<String>) {
    if let Some(v) = value {
        items.push((name, TagValue::Text(v.as_str())));
    }
}

fn push_integer<'a>(items: &mut Vec<(FourCC, TagValue<'a>)>, name: FourCC, value: u32) {
    if value != 0 {
        items.push((name, TagValue::Integer(value)));
    }
}

/// One item box: `[size][name]` wrapping `[size]["data"][flag][locale][value]`.
/// The inner `data` record is 16 bytes plus the value, the item 8 more.
pub fn write_item<W: Write + Seek>(wire: &mut Wire<W>, name: &FourCC, value: TagValue<'_>) -> Result<u32> {
    let (flag, payload_len) = match value {
        TagValue::Text(s) => (DATA_TEXT, s.len() as u32),
        TagValue::Integer(_) => (DATA_INTEGER, 4),
    };
    let data_size = payload_len + 16;

    let mut size = 0;
    size += wire.u32(data_size + 8)?;
    size += wire.bytes(name)?;
    size += wire.u32(data_size)?;
    size += wire.bytes(b"data")?;
    size += wire.u32(flag)?;
    size += wire.u32(0)?; // locale
    size += match value {
        TagValue::Text(s) => wire.bytes(s.as_bytes())?,
        TagValue::Integer(n) => wire.u32(n)?,
    };
    Ok(size)
}
