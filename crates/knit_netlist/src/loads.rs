//! Reverse index from a node to everything that reads it.
//!
//! The graph only stores drivers on their destinations. Bidirectional nets have
//! no fixed polarity, so searches over them also need to walk from a node to its
//! readers; [`LoadIndex`] is that reverse view, computed once per snapshot.

use crate::ids::SignalId;
use crate::netlist::Netlist;
use crate::shape::BitRange;
use crate::signal::SignalKind;
use std::collections::HashMap;

/// One way a node is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reader {
    /// The node drives `range` of `target` in full.
    Driven {
        /// The driven port or wire.
        target: SignalId,
        /// The destination bits.
        range: BitRange,
    },
    /// A subset node exposes `range` of the node.
    Subset {
        /// The subset node.
        node: SignalId,
        /// The bits of the read node it exposes.
        range: BitRange,
    },
    /// A concatenation places the node at `offset`.
    Concat {
        /// The concatenation node.
        node: SignalId,
        /// Bit offset of the segment inside the concatenation.
        offset: u32,
    },
}

/// Readers of every node in a netlist.
#[derive(Debug, Default)]
pub struct LoadIndex {
    readers: HashMap<SignalId, Vec<Reader>>,
}

impl LoadIndex {
    /// Builds the reverse index of `netlist`.
    pub fn build(netlist: &Netlist) -> Self {
        let mut readers: HashMap<SignalId, Vec<Reader>> = HashMap::new();
        for sig in netlist.signals() {
            for d in &sig.drivers {
                readers.entry(d.source).or_default().push(Reader::Driven {
                    target: sig.id,
                    range: d.range,
                });
            }
            match &sig.kind {
                SignalKind::Subset { source, range } => {
                    readers.entry(*source).or_default().push(Reader::Subset {
                        node: sig.id,
                        range: *range,
                    });
                }
                SignalKind::Concat(segments) => {
                    let mut offset = 0;
                    for seg in segments {
                        readers.entry(*seg).or_default().push(Reader::Concat {
                            node: sig.id,
                            offset,
                        });
                        offset += netlist.signal(*seg).width();
                    }
                }
                _ => {}
            }
        }
        Self { readers }
    }

    /// Everything that reads `id`.
    pub fn readers(&self, id: SignalId) -> &[Reader] {
        self.readers.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}
