//! Declarative layout of the header and trailer box groups.
//!
//! A layout is a flat node sequence. `Box` opens a box, an optional `Content`
//! right after it names the producer of its payload, and `Enter`/`Leave`
//! bracket its children. Sibling order here is sibling order in the file.

use super::boxes::Content;
use super::FourCC;
use crate::error::{MuxError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Box(FourCC),
    Enter,
    Leave,
    Content(Content),
    End,
}

use Node::{Box as Atom, Content as Data, End, Enter, Leave};

/// `ftyp`, an empty `free`, and the `mdat` whose size is patched on close.
pub const HEADER: &[Node] = &[
    Atom(*b"ftyp"),
    Data(Content::FileType),
    Atom(*b"free"),
    Atom(*b"mdat"),
    End,
];

pub const TRAILER: &[Node] = &[
    Atom(*b"moov"),
    Enter,
    Atom(*b"mvhd"),
    Data(Content::MovieHeader),
    Atom(*b"trak"),
    Enter,
    Atom(*b"tkhd"),
    Data(Content::TrackHeader),
    Atom(*b"mdia"),
    Enter,
    Atom(*b"mdhd"),
    Data(Content::MediaHeader),
    Atom(*b"hdlr"),
    Data(Content::SoundHandler),
    Atom(*b"minf"),
    Enter,
    Atom(*b"smhd"),
    Data(Content::SoundMediaHeader),
    Atom(*b"dinf"),
    Enter,
    Atom(*b"dref"),
    Data(Content::DataReference),
    Enter,
    Atom(*b"url "),
    Data(Content::DataEntryUrl),
    Leave,
    Leave,
    Atom(*b"stbl"),
    Enter,
    Atom(*b"stsd"),
    Data(Content::SampleDescription),
    Enter,
    Atom(*b"mp4a"),
    Data(Content::AudioSampleEntry),
    Enter,
    Atom(*b"esds"),
    Data(Content::ElementaryStream),
    Leave,
    Leave,
    Atom(*b"stts"),
    Data(Content::TimeToSample),
    Atom(*b"stsz"),
    Data(Content::SampleSize),
    Atom(*b"stsc"),
    Data(Content::SampleToChunk),
    Atom(*b"stco"),
    Data(Content::ChunkOffset),
    Leave, // stbl
    Leave, // minf
    Leave, // mdia
    Leave, // trak
    Atom(*b"udta"),
    Enter,
    Atom(*b"meta"),
    Enter,
    Atom(*b"hdlr"),
    Data(Content::MetadataHandler),
    Atom(*b"ilst"),
    Data(Content::ItemList),
    Leave, // meta
    Leave, // udta
    Leave, // moov
    End,
];

/// Check a layout ahead of time: it starts with a box, `Content` only follows
/// a box start, `Enter` only follows a box header, and every `Enter` is closed.
pub fn validate(nodes: &[Node]) -> Result<()> {
    match nodes.first() {
        Some(Node::Box(_)) => {}
        Some(other) => {
            return Err(MuxError::descriptor(
                0,
                format!("layout must start with a box, found {other:?}"),
            ))
        }
        None => return Err(MuxError::descriptor(0, "empty layout")),
    }

    let mut depth = 0usize;
    let mut prev: Option<Node> = None;
    for (i, node) in nodes.iter().enumerate() {
        match node {
            Node::Box(_) => {}
            Node::Content(_) => {
                if !matches!(prev, Some(Node::Box(_))) {
                    return Err(MuxError::descriptor(i, "content must directly follow a box"));
                }
            }
            Node::Enter => {
                if !matches!(prev, Some(Node::Box(_)) | Some(Node::Content(_))) {
                    return Err(MuxError::descriptor(i, "children must follow a box header"));
                }
                depth += 1;
            }
            Node::Leave => {
                if depth == 0 {
                    return Err(MuxError::descriptor(i, "leave without matching enter"));
                }
                depth -= 1;
            }
            Node::End => break,
        }
        prev = Some(*node);
    }

    if depth != 0 {
        return Err(MuxError::descriptor(
            nodes.len(),
            format!("{depth} child group(s) left open"),
        ));
    }
    Ok(())
}
