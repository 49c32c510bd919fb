//! Independent box-tree reader used to check muxer output.

#![allow(dead_code)]

use std::io::{self, Cursor, Seek, SeekFrom, Write};

use m4amux::{Mp4Muxer, StreamParams, Tags};

pub const ASC_STEREO_44K: [u8; 2] = [0x12, 0x10];

#[derive(Debug, Clone)]
pub struct BoxNode {
    pub kind: [u8; 4],
    pub offset: usize,
    pub size: u32,
    /// Bytes between the header and the first child (or the whole body for leaves).
    pub prefix: usize,
    pub children: Vec<BoxNode>,
}

impl BoxNode {
    pub fn body<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.offset + 8..self.offset + self.size as usize]
    }

    pub fn child(&self, kind: &[u8; 4]) -> &BoxNode {
        self.children
            .iter()
            .find(|c| &c.kind == kind)
            .unwrap_or_else(|| panic!("no {} in {}", name(kind), name(&self.kind)))
    }

    pub fn path(&self, kinds: &[&[u8; 4]]) -> &BoxNode {
        kinds.iter().fold(self, |node, kind| node.child(kind))
    }
}

pub fn name(kind: &[u8; 4]) -> String {
    String::from_utf8_lossy(kind).into_owned()
}

/// Bytes of fixed fields before child boxes, for boxes that have children.
fn child_prefix(parent: Option<&[u8; 4]>, kind: &[u8; 4]) -> Option<usize> {
    if parent == Some(b"ilst") {
        return Some(0);
    }
    match kind {
        b"moov" | b"trak" | b"mdia" | b"minf" | b"dinf" | b"stbl" | b"udta" | b"meta" | b"ilst" => {
            Some(0)
        }
        b"dref" | b"stsd" => Some(8),
        b"mp4a" => Some(28),
        _ => None,
    }
}

pub fn parse(data: &[u8]) -> Vec<BoxNode> {
    parse_range(data, 0, data.len(), None)
}

fn parse_range(data: &[u8], start: usize, end: usize, parent: Option<&[u8; 4]>) -> Vec<BoxNode> {
    let mut nodes = Vec::new();
    let mut pos = start;
    while pos < end {
        assert!(pos + 8 <= end, "truncated box header at {pos}");
        let size = read_u32(data, pos);
        let kind: [u8; 4] = data[pos + 4..pos + 8].try_into().unwrap();
        assert!(size >= 8, "box {} at {pos} has size {size}", name(&kind));
        let box_end = pos + size as usize;
        assert!(box_end <= end, "box {} at {pos} overruns its parent", name(&kind));

        let (prefix, children) = match child_prefix(parent, &kind) {
            Some(prefix) => (prefix, parse_range(data, pos + 8 + prefix, box_end, Some(&kind))),
            None => (size as usize - 8, Vec::new()),
        };
        nodes.push(BoxNode {
            kind,
            offset: pos,
            size,
            prefix,
            children,
        });
        pos = box_end;
    }
    assert_eq!(pos, end, "children do not fill their parent exactly");
    nodes
}

/// Every box's size equals 8 + fixed fields + its children's sizes.
pub fn verify_sizes(node: &BoxNode) {
    if !node.children.is_empty() {
        let children: u32 = node.children.iter().map(|c| c.size).sum();
        assert_eq!(
            node.size,
            8 + node.prefix as u32 + children,
            "size mismatch in {}",
            name(&node.kind)
        );
    }
    node.children.iter().for_each(verify_sizes);
}

/// Depth-first (type, size) sequence.
pub fn flatten(nodes: &[BoxNode]) -> Vec<([u8; 4], u32)> {
    let mut out = Vec::new();
    for n in nodes {
        out.push((n.kind, n.size));
        out.extend(flatten(&n.children));
    }
    out
}

pub fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes(data[at..at + 4].try_into().unwrap())
}

pub fn u32s(body: &[u8]) -> Vec<u32> {
    body.chunks_exact(4)
        .map(|c| u32::from_be_bytes(c.try_into().unwrap()))
        .collect()
}

/// Run a full header → frames → trailer → close cycle into memory.
pub fn mux(params: StreamParams, frames: &[Vec<u8>], tags: Tags) -> Vec<u8> {
    let mut muxer = Mp4Muxer::new(Cursor::new(Vec::new()), params);
    muxer.write_header().unwrap();
    for frame in frames {
        muxer.feed_frame(frame, 1024).unwrap();
    }
    muxer.set_decoder_config(&ASC_STEREO_44K).unwrap();
    muxer.set_tags(tags).unwrap();
    muxer.write_trailer().unwrap();
    let (out, _) = muxer.close().unwrap();
    out.into_inner()
}

/// In-memory sink that fails the first write starting at or past `fail_from`.
/// Later writes succeed again, so anything the muxer does after the failure
/// lands in the buffer where a test can see it.
pub struct FailingSink {
    pub inner: Cursor<Vec<u8>>,
    fail_from: u64,
    failed: bool,
}

impl FailingSink {
    pub fn new(fail_from: u64) -> Self {
        Self {
            inner: Cursor::new(Vec::new()),
            fail_from,
            failed: false,
        }
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.failed && self.inner.position() >= self.fail_from {
            self.failed = true;
            return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FailingSink {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
