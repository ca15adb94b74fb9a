//! Node id → interface index, loaded from an ITDK `.nodes` file.
//!
//! ```text
//! node N1:  10.0.0.1 10.0.1.1
//! ```
//!
//! The index is built once per run by the caller and passed explicitly to the
//! graph builder and query resolution. It is expected to contain only node
//! ids that have a usable geographic coordinate; see [`NodeInterfaceIndex::retain_nodes`].

use std::io::BufRead;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, warn};

use crate::address::{self, VertexId};
use crate::error::{FormatKind, PathError, Result};

const PROGRESS_EVERY: usize = 1_000_000;

/// One parsed `node` line, borrowing from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLine<'a> {
    pub node_id: &'a str,
    pub addresses: Vec<&'a str>,
}

/// Parse a `node N<digits>: <ip> ...` line. Comments and blank lines yield `None`.
pub fn parse_node_line(line: &str) -> Result<Option<NodeLine<'_>>> {
    if line.starts_with('#') || line.trim().is_empty() {
        return Ok(None);
    }

    let malformed = || PathError::format(FormatKind::NodeLine, line.trim_end());

    let rest = line.strip_prefix("node ").ok_or_else(malformed)?;
    let (node_id, addresses) = rest.split_once(':').ok_or_else(malformed)?;
    let node_id = node_id.trim();
    if !is_node_id(node_id) {
        return Err(malformed());
    }

    Ok(Some(NodeLine {
        node_id,
        addresses: addresses.split_whitespace().collect(),
    }))
}

/// Extract the node id from a `node.geo N<digits>:\t...` line.
pub fn parse_geo_node_id(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("node.geo ")?;
    let (node_id, _) = rest.split_once(':')?;
    let node_id = node_id.trim();
    is_node_id(node_id).then_some(node_id)
}

fn is_node_id(s: &str) -> bool {
    s.len() > 1 && s.starts_with('N') && s[1..].bytes().all(|b| b.is_ascii_digit())
}

/// Read the set of node ids that carry a geo record.
pub fn read_geo_node_ids<R: BufRead>(reader: R) -> Result<FxHashSet<String>> {
    let mut ids = FxHashSet::default();
    let mut skipped = 0usize;

    // Place names are not always UTF-8; only the ASCII node id prefix matters.
    for line in reader.split(b'\n') {
        let line = line.map_err(|e| PathError::io("reading node geo file", e))?;
        let line = String::from_utf8_lossy(&line);
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        match parse_geo_node_id(&line) {
            Some(id) => {
                ids.insert(id.to_string());
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "Skipped malformed node geo lines");
    }
    info!(nodes = ids.len(), "Loaded node ids with geo coordinates");
    Ok(ids)
}

/// Read-only (after loading) mapping from topology node id to its interfaces.
#[derive(Debug, Default, Clone)]
pub struct NodeInterfaceIndex {
    interfaces: FxHashMap<String, Vec<VertexId>>,
}

impl NodeInterfaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            interfaces: FxHashMap::with_capacity_and_hasher(nodes, Default::default()),
        }
    }

    /// Register a node's interfaces, replacing any previous entry.
    pub fn insert(&mut self, node_id: impl Into<String>, interfaces: Vec<VertexId>) {
        self.interfaces.insert(node_id.into(), interfaces);
    }

    /// Register a node's interfaces given as dotted quads.
    pub fn insert_dotted(&mut self, node_id: impl Into<String>, addresses: &[&str]) -> Result<()> {
        let interfaces = address::encode_all(addresses.iter().copied())?;
        self.insert(node_id, interfaces);
        Ok(())
    }

    /// Load from a `.nodes` file. Malformed lines (including ones that are not
    /// valid UTF-8) and addresses are logged and skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        info!("Loading ITDK nodes ...");
        let start = Instant::now();
        let mut index = Self::new();
        let mut node_count = 0usize;

        for (lineno, line) in reader.split(b'\n').enumerate() {
            let line = line.map_err(|e| PathError::io("reading node file", e))?;
            let line = match std::str::from_utf8(&line) {
                Ok(line) => line,
                Err(e) => {
                    warn!(line = lineno + 1, "Cannot decode node line: {}", e);
                    continue;
                }
            };
            let parsed = match parse_node_line(line) {
                Ok(Some(parsed)) => parsed,
                Ok(None) => continue,
                Err(e) => {
                    warn!(line = lineno + 1, "Cannot process node line: {}", e);
                    continue;
                }
            };

            let mut interfaces = Vec::with_capacity(parsed.addresses.len());
            for addr in &parsed.addresses {
                match address::encode(addr) {
                    Ok(v) => interfaces.push(v),
                    Err(e) => warn!(line = lineno + 1, node = parsed.node_id, "{}", e),
                }
            }
            index.insert(parsed.node_id, interfaces);

            node_count += 1;
            if node_count % PROGRESS_EVERY == 0 {
                debug!(
                    elapsed_s = start.elapsed().as_secs_f64(),
                    node_count, "Loading nodes"
                );
            }
        }

        info!(
            elapsed_s = start.elapsed().as_secs_f64(),
            node_count, "Loaded ITDK nodes"
        );
        Ok(index)
    }

    /// Interfaces of `node_id`; empty if the node is unknown.
    pub fn interfaces(&self, node_id: &str) -> &[VertexId] {
        self.interfaces
            .get(node_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Collect the interfaces of every listed node, in order.
    ///
    /// An unknown node id is an `InvalidArgument`: it usually means the id was
    /// filtered out for lacking a coordinate, or was mistyped.
    pub fn interfaces_of<'a, I>(&self, node_ids: I) -> Result<Vec<VertexId>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out = Vec::new();
        for id in node_ids {
            let ifaces = self
                .interfaces
                .get(id)
                .ok_or_else(|| PathError::invalid_argument(format!("unknown node id {}", id)))?;
            out.extend_from_slice(ifaces);
        }
        Ok(out)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.interfaces.contains_key(node_id)
    }

    /// Number of nodes in the index.
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Total interfaces across all nodes.
    pub fn interface_count(&self) -> usize {
        self.interfaces.values().map(|v| v.len()).sum()
    }

    /// Drop every node for which `keep` returns false. Returns the number removed.
    pub fn retain_nodes<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.interfaces.len();
        self.interfaces.retain(|id, _| keep(id));
        let removed = before - self.interfaces.len();
        info!(removed, remaining = self.interfaces.len(), "Filtered node index");
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[VertexId])> {
        self.interfaces
            .iter()
            .map(|(id, v)| (id.as_str(), v.as_slice()))
    }
}
