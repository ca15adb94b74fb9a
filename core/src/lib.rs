//! itdk-path-core: router-level topology graph and nearest-path engine.
//!
//! Parses ITDK link records into an undirected graph of router interfaces
//! (IPv4 addresses packed into `u32`), then answers "shortest path from this
//! interface to the nearest of those" queries, one at a time or as parallel
//! batches over a fixed worker pool.
//!
//! File access is left to the caller: loaders take any `BufRead`.

pub mod address;
mod builder;
pub mod config;
mod error;
mod graph;
pub mod link;
pub mod nodes;
mod search;

pub use address::VertexId;
pub use builder::{build_graph, build_graph_parallel, record_interfaces, BuildStats, GraphBuilder};
pub use config::EngineConfig;
pub use error::{ErrorKind, FormatKind, PathError, Result};
pub use graph::Graph;
pub use link::{parse_link_line, LinkRecord, LinkToken};
pub use nodes::NodeInterfaceIndex;
pub use search::{nearest_path, BatchSummary, Path, PathEngine, VertexSet};
