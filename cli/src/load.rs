use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use itdk_path_core::{build_graph_parallel, nodes, EngineConfig, Graph, NodeInterfaceIndex};
use tracing::info;

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Load the node index, keeping only nodes listed in `geo_path` when given.
pub fn load_index(nodes_path: &Path, geo_path: Option<&Path>) -> Result<NodeInterfaceIndex> {
    let mut index = NodeInterfaceIndex::from_reader(open(nodes_path)?)
        .with_context(|| format!("loading nodes from {}", nodes_path.display()))?;

    if let Some(geo_path) = geo_path {
        info!("Removing nodes without geocoordinates ...");
        let with_geo = nodes::read_geo_node_ids(open(geo_path)?)
            .with_context(|| format!("loading node geo from {}", geo_path.display()))?;
        index.retain_nodes(|id| with_geo.contains(id));
    }

    Ok(index)
}

/// Read the whole links file into memory, then build the graph in parallel.
///
/// Lines stay raw bytes here; the builder skips any that are not valid UTF-8.
pub fn load_graph(
    links_path: &Path,
    index: &NodeInterfaceIndex,
    config: &EngineConfig,
) -> Result<Graph> {
    info!(path = %links_path.display(), "Loading links from file to memory ...");
    let start = Instant::now();
    let lines = open(links_path)?
        .split(b'\n')
        .collect::<std::io::Result<Vec<Vec<u8>>>>()
        .with_context(|| format!("reading {}", links_path.display()))?;
    info!(
        elapsed_s = start.elapsed().as_secs_f64(),
        lines = lines.len(),
        "Read link file"
    );

    let (graph, stats) = build_graph_parallel(&lines, index, config)?;
    if stats.malformed > 0 {
        info!(malformed = stats.malformed, "Some link lines were skipped");
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: impl AsRef<[u8]>) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_ref()).unwrap();
        f
    }

    #[test]
    fn test_load_index_with_geo_filter() {
        let nodes = write_temp("node N1:  10.0.0.1\nnode N2:  10.0.0.2\nnode N3:  10.0.0.3\n");
        let geo = write_temp("node.geo N1:\tNA\tUS\nnode.geo N3:\tEU\tDE\n");

        let index = load_index(nodes.path(), Some(geo.path())).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.contains("N1"));
        assert!(!index.contains("N2"));

        let unfiltered = load_index(nodes.path(), None).unwrap();
        assert_eq!(unfiltered.len(), 3);
    }

    #[test]
    fn test_load_graph() {
        let nodes = write_temp("node N1:  10.0.0.1\nnode N2:  10.0.0.2\nnode N3:  10.0.0.3\n");
        let links = write_temp("# links\nlink L1: N1 N2 N3\nbogus\n");
        let index = load_index(nodes.path(), None).unwrap();
        let graph = load_graph(links.path(), &index, &EngineConfig::default()).unwrap();
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_load_graph_skips_invalid_utf8_line() {
        let nodes = write_temp("node N1:  10.0.0.1\nnode N2:  10.0.0.2\nnode N3:  10.0.0.3\n");
        let links = write_temp(b"link L1: N1 N2\nlink L2: N\xff\xfe N2\nlink L3: N2 N3\n");
        let index = load_index(nodes.path(), None).unwrap();
        let graph = load_graph(links.path(), &index, &EngineConfig::default()).unwrap();
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = load_index(Path::new("/nonexistent/midar-iff.nodes"), None).unwrap_err();
        assert!(err.to_string().contains("midar-iff.nodes"));
    }
}
