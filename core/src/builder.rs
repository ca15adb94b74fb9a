//! Builds the interface graph from link records and the node index.
//!
//! For each link, the interfaces of every node on it are unioned. A link with
//! k ≥ 2 distinct interfaces becomes a k-clique: the shared medium makes every
//! pair of interfaces one hop apart. Links with fewer than two known
//! interfaces add nothing.

use std::io::BufRead;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::address::VertexId;
use crate::config::EngineConfig;
use crate::error::{PathError, Result};
use crate::graph::Graph;
use crate::link::{self, LinkRecord};
use crate::nodes::NodeInterfaceIndex;

const PROGRESS_EVERY: usize = 1_000_000;

/// Counters collected while building.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub lines: usize,
    pub comments: usize,
    pub malformed: usize,
    /// Links that contributed at least one edge.
    pub linked_records: usize,
    /// Well-formed links with fewer than two known interfaces.
    pub skipped_records: usize,
    /// Edge insertions, before deduplication.
    pub edges_inserted: usize,
}

impl BuildStats {
    fn merge(&mut self, other: &BuildStats) {
        self.lines += other.lines;
        self.comments += other.comments;
        self.malformed += other.malformed;
        self.linked_records += other.linked_records;
        self.skipped_records += other.skipped_records;
        self.edges_inserted += other.edges_inserted;
    }
}

/// Distinct interfaces across all nodes on a link, in ascending order.
pub fn record_interfaces(index: &NodeInterfaceIndex, record: &LinkRecord) -> Vec<VertexId> {
    let mut ifaces: Vec<VertexId> = record
        .node_ids()
        .flat_map(|id| index.interfaces(id).iter().copied())
        .collect();
    ifaces.sort_unstable();
    ifaces.dedup();
    ifaces
}

/// Every unordered pair of a distinct interface set.
fn clique_edges(ifaces: &[VertexId]) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
    ifaces
        .iter()
        .enumerate()
        .flat_map(move |(i, &u)| ifaces[i + 1..].iter().map(move |&v| (u, v)))
}

/// Whether a running count crossed a multiple of `PROGRESS_EVERY`.
fn progress_due(before: usize, after: usize) -> bool {
    before / PROGRESS_EVERY != after / PROGRESS_EVERY
}

/// Decode, classify and expand one raw line, handing each resulting edge to `emit`.
///
/// A line that is not valid UTF-8 counts as malformed like any other bad record.
fn process_line<F>(
    index: &NodeInterfaceIndex,
    raw: &[u8],
    lineno: usize,
    stats: &mut BuildStats,
    mut emit: F,
) where
    F: FnMut(VertexId, VertexId),
{
    stats.lines += 1;
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => {
            warn!(line = lineno, "Cannot decode link line: {}", e);
            stats.malformed += 1;
            return;
        }
    };
    match link::parse_link_line(line) {
        Ok(Some(record)) => {
            let ifaces = record_interfaces(index, &record);
            if ifaces.len() < 2 {
                stats.skipped_records += 1;
                return;
            }
            for (u, v) in clique_edges(&ifaces) {
                emit(u, v);
                stats.edges_inserted += 1;
            }
            stats.linked_records += 1;
        }
        Ok(None) => stats.comments += 1,
        Err(e) => {
            warn!(line = lineno, "Cannot process link line: {}", e);
            stats.malformed += 1;
        }
    }
}

fn log_progress(stats: &BuildStats, started: Instant) {
    debug!(
        elapsed_s = started.elapsed().as_secs_f64(),
        linked_records = stats.linked_records,
        "Building graph"
    );
}

/// Incremental, single-threaded builder.
pub struct GraphBuilder<'a> {
    index: &'a NodeInterfaceIndex,
    graph: Graph,
    stats: BuildStats,
    sorted_adjacency: bool,
    started: Instant,
}

impl<'a> GraphBuilder<'a> {
    /// The graph is pre-sized from the number of indexed nodes.
    pub fn new(index: &'a NodeInterfaceIndex) -> Self {
        Self::with_config(index, &EngineConfig::default())
    }

    pub fn with_config(index: &'a NodeInterfaceIndex, config: &EngineConfig) -> Self {
        Self {
            index,
            graph: Graph::with_capacity(index.len()),
            stats: BuildStats::default(),
            sorted_adjacency: config.sorted_adjacency,
            started: Instant::now(),
        }
    }

    /// Feed one raw line, with or without its terminator. Returns the number
    /// of edges it inserted.
    pub fn add_line(&mut self, line: impl AsRef<[u8]>) -> usize {
        let edges_before = self.stats.edges_inserted;
        let linked_before = self.stats.linked_records;
        let lineno = self.stats.lines + 1;
        let graph = &mut self.graph;
        process_line(self.index, line.as_ref(), lineno, &mut self.stats, |u, v| {
            graph.add_edge(u, v)
        });
        if progress_due(linked_before, self.stats.linked_records) {
            log_progress(&self.stats, self.started);
        }
        self.stats.edges_inserted - edges_before
    }

    /// Feed an already parsed record. Returns the number of edges it inserted.
    pub fn add_record(&mut self, record: &LinkRecord) -> usize {
        let ifaces = record_interfaces(self.index, record);
        if ifaces.len() < 2 {
            self.stats.skipped_records += 1;
            return 0;
        }
        let mut added = 0;
        for (u, v) in clique_edges(&ifaces) {
            self.graph.add_edge(u, v);
            added += 1;
        }
        self.stats.edges_inserted += added;
        self.stats.linked_records += 1;
        if progress_due(self.stats.linked_records - 1, self.stats.linked_records) {
            log_progress(&self.stats, self.started);
        }
        added
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn finish(mut self) -> (Graph, BuildStats) {
        if self.sorted_adjacency {
            self.graph.compact();
        }
        log_built(&self.graph, &self.stats, self.started);
        (self.graph, self.stats)
    }
}

fn log_built(graph: &Graph, stats: &BuildStats, started: Instant) {
    info!(
        elapsed_s = started.elapsed().as_secs_f64(),
        lines = stats.lines,
        malformed = stats.malformed,
        linked_records = stats.linked_records,
        vertices = graph.node_count(),
        edges = graph.edge_count(),
        "Built interface graph"
    );
}

/// Stream a links file into a graph.
///
/// Malformed lines, including ones that are not valid UTF-8, are logged and
/// skipped; a read error aborts the build.
pub fn build_graph<R: BufRead>(
    reader: R,
    index: &NodeInterfaceIndex,
    config: &EngineConfig,
) -> Result<(Graph, BuildStats)> {
    info!(nodes = index.len(), "Building graph from ITDK links ...");
    let mut builder = GraphBuilder::with_config(index, config);
    for line in reader.split(b'\n') {
        let line = line.map_err(|e| PathError::io("reading link file", e))?;
        builder.add_line(&line);
    }
    Ok(builder.finish())
}

/// Build from lines already in memory, expanding shards of
/// `config.build_shard_lines` lines in parallel and merging their edges.
pub fn build_graph_parallel<S>(
    lines: &[S],
    index: &NodeInterfaceIndex,
    config: &EngineConfig,
) -> Result<(Graph, BuildStats)>
where
    S: AsRef<[u8]> + Sync,
{
    config.validate()?;
    let started = Instant::now();
    let shard_lines = config.build_shard_lines;
    info!(
        lines = lines.len(),
        shard_lines,
        nodes = index.len(),
        "Building graph from ITDK links in parallel ..."
    );

    let shards: Vec<(Vec<(VertexId, VertexId)>, BuildStats)> = lines
        .par_chunks(shard_lines)
        .enumerate()
        .map(|(shard, chunk)| {
            let mut edges = Vec::new();
            let mut stats = BuildStats::default();
            for (i, line) in chunk.iter().enumerate() {
                let lineno = shard * shard_lines + i + 1;
                process_line(index, line.as_ref(), lineno, &mut stats, |u, v| {
                    edges.push((u, v))
                });
            }
            (edges, stats)
        })
        .collect();

    let mut graph = Graph::with_capacity(index.len());
    let mut stats = BuildStats::default();
    for (edges, shard_stats) in &shards {
        for &(u, v) in edges {
            graph.add_edge(u, v);
        }
        let linked_before = stats.linked_records;
        stats.merge(shard_stats);
        if progress_due(linked_before, stats.linked_records) {
            log_progress(&stats, started);
        }
    }
    drop(shards);

    if config.sorted_adjacency {
        graph.compact();
    }
    log_built(&graph, &stats, started);
    Ok((graph, stats))
}
