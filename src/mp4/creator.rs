//! Writes a node layout to the sink.
//!
//! Each box is written with a placeholder size of 8, its body and children
//! follow, then the size field is patched by seeking back to the box start
//! and the sink is repositioned just past the box.

use std::io::{Seek, Write};

use super::atoms::Node;
use super::boxes::Context;
use super::session::DESCRIPTOR_FAULT_LIMIT;
use super::wire::Wire;
use crate::error::{MuxError, Result};

pub(crate) struct Creator<'a, W: Write + Seek> {
    wire: &'a mut Wire<W>,
    ctx: &'a Context<'a>,
    nodes: &'a [Node],
    cursor: usize,
}

impl<'a, W: Write + Seek> Creator<'a, W> {
    pub(crate) fn new(wire: &'a mut Wire<W>, ctx: &'a Context<'a>, nodes: &'a [Node]) -> Self {
        Self {
            wire,
            ctx,
            nodes,
            cursor: 0,
        }
    }

    /// Write every top-level box until `End` or the end of the layout.
    /// Returns the total bytes written.
    pub(crate) fn run(mut self) -> Result<u64> {
        let mut total = 0u64;
        while !matches!(self.peek(), None | Some(Node::End)) {
            total += self.create()? as u64;
        }
        Ok(total)
    }

    fn peek(&self) -> Option<Node> {
        self.nodes.get(self.cursor).copied()
    }

    /// Write the box at the cursor, including all descendants, and advance
    /// past it. Returns the box's full size.
    fn create(&mut self) -> Result<u32> {
        let kind = match self.peek() {
            Some(Node::Box(kind)) => kind,
            other => return self.fault(other),
        };
        self.ctx.session.clear_descriptor_faults();

        let start = self.wire.position()?;
        let mut size = self.wire.u32(8)?;
        size += self.wire.bytes(&kind)?;
        self.cursor += 1;

        if let Some(Node::Content(content)) = self.peek() {
            size += content.produce(self.wire, self.ctx)?;
            self.cursor += 1;
        }

        if let Some(Node::Enter) = self.peek() {
            self.cursor += 1;
            loop {
                match self.peek() {
                    None | Some(Node::End) => break,
                    Some(Node::Leave) => {
                        self.cursor += 1;
                        break;
                    }
                    Some(_) => size += self.create()?,
                }
            }
        }

        self.wire.seek_to(start)?;
        self.wire.u32(size)?;
        self.wire.seek_to(start + size as u64)?;

        log::debug!(
            "box {} at {start}: {size} bytes",
            String::from_utf8_lossy(&kind)
        );
        Ok(size)
    }

    /// A non-box node where a box was expected. Skipped and counted; too
    /// many in a row means the layout is broken and the write is abandoned.
    fn fault(&mut self, node: Option<Node>) -> Result<u32> {
        let faults = self.ctx.session.record_descriptor_fault();
        log::error!(
            "internal error: node {} is {:?}, expected a box start",
            self.cursor,
            node
        );
        if faults > DESCRIPTOR_FAULT_LIMIT {
            return Err(MuxError::descriptor(
                self.cursor,
                format!("{faults} consecutive non-box nodes"),
            ));
        }
        self.cursor += 1;
        Ok(0)
    }
}
