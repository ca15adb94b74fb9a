//! Nearest-destination shortest paths over the interface graph.
//!
//! A query is one source and a set of acceptable destinations. The search is
//! uniform-cost with unit weights and stops at the first destination popped,
//! which is at minimum hop distance. Batches run one independent search per
//! source on a private worker pool; results keep the order of the sources.

use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::BinaryHeap;
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPool;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{info, trace};

use crate::address::{self, VertexId};
use crate::config::EngineConfig;
use crate::error::{PathError, Result};
use crate::graph::Graph;

/// Set of acceptable destinations for a query.
pub type VertexSet = FxHashSet<VertexId>;

/// A path from a source to one destination, both endpoints included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path(Vec<VertexId>);

impl Path {
    pub fn vertices(&self) -> &[VertexId] {
        &self.0
    }

    /// Number of edges on the path.
    pub fn hops(&self) -> usize {
        self.0.len() - 1
    }

    pub fn source(&self) -> VertexId {
        self.0[0]
    }

    pub fn destination(&self) -> VertexId {
        self.0[self.0.len() - 1]
    }

    /// The path as dotted-quad addresses.
    pub fn to_dotted(&self) -> Vec<String> {
        self.0.iter().map(|&v| address::decode(v)).collect()
    }

    pub fn into_vec(self) -> Vec<VertexId> {
        self.0
    }
}

/// Found / not-found counts for one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub sources: usize,
    pub found: usize,
    pub not_found: usize,
}

impl BatchSummary {
    pub fn of(results: &[Option<Path>]) -> Self {
        let found = results.iter().filter(|r| r.is_some()).count();
        Self {
            sources: results.len(),
            found,
            not_found: results.len() - found,
        }
    }
}

/// Shortest path from `source` to whichever member of `destinations` is nearest.
///
/// Returns `Ok(None)` when no destination is reachable (including when `source`
/// is not in the graph) and `InvalidArgument` when `destinations` is empty.
/// With `max_hops`, vertices at that distance are not expanded further.
pub fn nearest_path(
    graph: &Graph,
    source: VertexId,
    destinations: &VertexSet,
    max_hops: Option<u32>,
) -> Result<Option<Path>> {
    if destinations.is_empty() {
        return Err(PathError::invalid_argument("destination set is empty"));
    }
    Ok(search(graph, source, destinations, max_hops))
}

fn search(
    graph: &Graph,
    source: VertexId,
    destinations: &VertexSet,
    max_hops: Option<u32>,
) -> Option<Path> {
    if destinations.contains(&source) {
        return Some(Path(vec![source]));
    }
    if !graph.contains(source) {
        return None;
    }
    let max_hops = max_hops.unwrap_or(u32::MAX);

    // Absent from `dist` means infinite. `prev` doubles as the settled-path tree.
    let mut dist: FxHashMap<VertexId, u32> = FxHashMap::default();
    let mut prev: FxHashMap<VertexId, VertexId> = FxHashMap::default();
    let mut heap: BinaryHeap<Reverse<(u32, VertexId)>> = BinaryHeap::new();

    dist.insert(source, 0);
    heap.push(Reverse((0, source)));

    while let Some(Reverse((d, current))) = heap.pop() {
        // Stale entry: a shorter distance was recorded after this push.
        if dist.get(&current).is_some_and(|&best| d > best) {
            continue;
        }
        if destinations.contains(&current) {
            return Some(reconstruct(&prev, source, current));
        }
        if d >= max_hops {
            continue;
        }

        let next = d + 1;
        for &neighbor in graph.neighbors(current) {
            match dist.entry(neighbor) {
                Entry::Occupied(mut e) => {
                    if next < *e.get() {
                        e.insert(next);
                        prev.insert(neighbor, current);
                        heap.push(Reverse((next, neighbor)));
                    }
                }
                Entry::Vacant(e) => {
                    e.insert(next);
                    prev.insert(neighbor, current);
                    heap.push(Reverse((next, neighbor)));
                }
            }
        }
    }

    None
}

/// Walk predecessors from `target` back to `source`.
fn reconstruct(prev: &FxHashMap<VertexId, VertexId>, source: VertexId, target: VertexId) -> Path {
    let mut path = vec![target];
    let mut current = target;
    while current != source {
        current = prev[&current];
        path.push(current);
    }
    path.reverse();
    Path(path)
}

/// Runs nearest-path queries against one immutable graph.
///
/// Owns a fixed-size worker pool used by [`PathEngine::nearest_paths_batch`].
/// Every worker only reads the graph and keeps its own search state, so no
/// locking is involved.
pub struct PathEngine<'g> {
    graph: &'g Graph,
    config: EngineConfig,
    pool: ThreadPool,
}

impl<'g> PathEngine<'g> {
    pub fn new(graph: &'g Graph, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads())
            .thread_name(|i| format!("itdk-path-{}", i))
            .build()?;
        Ok(Self {
            graph,
            config,
            pool,
        })
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn nearest_path(&self, source: VertexId, destinations: &VertexSet) -> Result<Option<Path>> {
        nearest_path(self.graph, source, destinations, self.config.max_hops)
    }

    /// One nearest-path search per source, run on the worker pool.
    ///
    /// `result[i]` always answers `sources[i]`, whatever order workers finish in.
    pub fn nearest_paths_batch(
        &self,
        sources: &[VertexId],
        destinations: &VertexSet,
    ) -> Result<Vec<Option<Path>>> {
        if destinations.is_empty() {
            return Err(PathError::invalid_argument("destination set is empty"));
        }

        info!(
            sources = sources.len(),
            destinations = destinations.len(),
            workers = self.worker_count(),
            "Finding nearest paths ..."
        );
        let start = Instant::now();
        let graph = self.graph;
        let max_hops = self.config.max_hops;
        let results = self.map_indexed(sources.len(), |i| {
            search(graph, sources[i], destinations, max_hops)
        });

        let summary = BatchSummary::of(&results);
        info!(
            elapsed_s = start.elapsed().as_secs_f64(),
            found = summary.found,
            not_found = summary.not_found,
            "Nearest path batch completed"
        );
        Ok(results)
    }

    /// Evaluate `task(i)` for every `i < len` on the pool, collecting into slot `i`.
    fn map_indexed<T, F>(&self, len: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        self.pool.install(|| {
            (0..len)
                .into_par_iter()
                .map(|i| {
                    let out = task(i);
                    trace!(index = i, "Query finished");
                    out
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    fn graph_from(edges: &[(VertexId, VertexId)]) -> Graph {
        let mut g = Graph::new();
        for &(u, v) in edges {
            g.add_edge(u, v);
        }
        g.compact();
        g
    }

    fn set(vs: &[VertexId]) -> VertexSet {
        vs.iter().copied().collect()
    }

    fn make_chain(n: VertexId) -> Graph {
        let edges: Vec<_> = (0..n - 1).map(|i| (i, i + 1)).collect();
        graph_from(&edges)
    }

    fn make_star(center: VertexId, leaves: VertexId) -> Graph {
        let edges: Vec<_> = (1..=leaves).map(|i| (center, center + i)).collect();
        graph_from(&edges)
    }

    fn scenario() -> Graph {
        graph_from(&[(1, 2), (2, 3), (3, 4), (1, 5)])
    }

    fn path_of(p: Option<Path>) -> Option<Vec<VertexId>> {
        p.map(Path::into_vec)
    }

    /// Plain BFS hop distance to the nearest destination.
    fn reference_distance(g: &Graph, source: VertexId, dests: &VertexSet) -> Option<usize> {
        if dests.contains(&source) {
            return Some(0);
        }
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::new();
        seen.insert(source);
        queue.push_back((source, 0usize));
        while let Some((u, d)) = queue.pop_front() {
            for &v in g.neighbors(u) {
                if seen.insert(v) {
                    if dests.contains(&v) {
                        return Some(d + 1);
                    }
                    queue.push_back((v, d + 1));
                }
            }
        }
        None
    }

    // --- Single query ---

    #[test]
    fn test_scenario_paths() {
        let g = scenario();
        let d = set(&[4]);
        assert_eq!(path_of(nearest_path(&g, 1, &d, None).unwrap()), Some(vec![1, 2, 3, 4]));
        assert_eq!(path_of(nearest_path(&g, 5, &d, None).unwrap()), Some(vec![5, 1, 2, 3, 4]));
        assert_eq!(nearest_path(&g, 6, &d, None).unwrap(), None);
    }

    #[test]
    fn test_source_in_destinations() {
        let g = scenario();
        let p = nearest_path(&g, 3, &set(&[3, 4]), None).unwrap().unwrap();
        assert_eq!(p.vertices(), &[3]);
        assert_eq!(p.hops(), 0);
    }

    #[test]
    fn test_source_in_destinations_but_not_in_graph() {
        let g = scenario();
        let p = nearest_path(&g, 99, &set(&[99]), None).unwrap().unwrap();
        assert_eq!(p.vertices(), &[99]);
    }

    #[test]
    fn test_empty_destinations_is_invalid() {
        let g = scenario();
        let err = nearest_path(&g, 1, &VertexSet::default(), None).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_picks_nearest_destination() {
        let g = make_chain(10);
        let p = nearest_path(&g, 5, &set(&[0, 7, 9]), None).unwrap().unwrap();
        assert_eq!(p.vertices(), &[5, 6, 7]);
        assert_eq!(p.destination(), 7);
    }

    #[test]
    fn test_unreachable_destination() {
        let g = graph_from(&[(1, 2), (3, 4)]);
        assert_eq!(nearest_path(&g, 1, &set(&[4]), None).unwrap(), None);
        assert_eq!(nearest_path(&g, 1, &set(&[77]), None).unwrap(), None);
    }

    #[test]
    fn test_parallel_edges_do_not_change_distance() {
        let mut g = Graph::new();
        for _ in 0..3 {
            g.add_edge(1, 2);
            g.add_edge(2, 3);
        }
        let p = nearest_path(&g, 1, &set(&[3]), None).unwrap().unwrap();
        assert_eq!(p.hops(), 2);
    }

    #[test]
    fn test_cycle_terminates() {
        let g = graph_from(&[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]);
        let p = nearest_path(&g, 0, &set(&[3]), None).unwrap().unwrap();
        assert_eq!(p.vertices(), &[0, 4, 3]);
    }

    #[test]
    fn test_star_leaf_to_leaf() {
        let g = make_star(100, 50);
        let p = nearest_path(&g, 101, &set(&[150]), None).unwrap().unwrap();
        assert_eq!(p.vertices(), &[101, 100, 150]);
    }

    #[test]
    fn test_max_hops_bounds_search() {
        let g = make_chain(10);
        let d = set(&[9]);
        assert_eq!(nearest_path(&g, 0, &d, Some(8)).unwrap(), None);
        assert_eq!(nearest_path(&g, 0, &d, Some(9)).unwrap().unwrap().hops(), 9);
        assert_eq!(nearest_path(&g, 0, &set(&[0]), Some(0)).unwrap().unwrap().hops(), 0);
    }

    #[test]
    fn test_sorted_adjacency_gives_stable_tie_break() {
        // Two equal-length routes 1-2-4 and 1-3-4; ascending neighbor order picks 2.
        let g = graph_from(&[(1, 3), (3, 4), (1, 2), (2, 4)]);
        for _ in 0..5 {
            let p = nearest_path(&g, 1, &set(&[4]), None).unwrap().unwrap();
            assert_eq!(p.vertices(), &[1, 2, 4]);
        }
    }

    #[test]
    fn test_path_to_dotted() {
        let mut g = Graph::new();
        g.add_edge(0x0A00_0001, 0x0A00_0002);
        let p = nearest_path(&g, 0x0A00_0001, &set(&[0x0A00_0002]), None)
            .unwrap()
            .unwrap();
        assert_eq!(p.to_dotted(), vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(p.source(), 0x0A00_0001);
    }

    // --- Batch ---

    fn engine(g: &Graph, threads: usize) -> PathEngine<'_> {
        PathEngine::new(
            g,
            EngineConfig {
                threads: Some(threads),
                ..EngineConfig::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_batch_index_aligned() {
        let g = scenario();
        let e = engine(&g, 4);
        let results = e.nearest_paths_batch(&[5, 6, 4, 1], &set(&[4])).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(path_of(results[0].clone()), Some(vec![5, 1, 2, 3, 4]));
        assert_eq!(results[1], None);
        assert_eq!(path_of(results[2].clone()), Some(vec![4]));
        assert_eq!(path_of(results[3].clone()), Some(vec![1, 2, 3, 4]));
        assert_eq!(
            BatchSummary::of(&results),
            BatchSummary {
                sources: 4,
                found: 3,
                not_found: 1
            }
        );
    }

    #[test]
    fn test_batch_empty_sources() {
        let g = scenario();
        let e = engine(&g, 2);
        assert!(e.nearest_paths_batch(&[], &set(&[4])).unwrap().is_empty());
    }

    #[test]
    fn test_batch_empty_destinations_is_invalid() {
        let g = scenario();
        let e = engine(&g, 2);
        let err = e.nearest_paths_batch(&[1], &VertexSet::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let g = scenario();
        let config = EngineConfig {
            threads: Some(0),
            ..EngineConfig::default()
        };
        assert!(PathEngine::new(&g, config).is_err());
    }

    #[test]
    fn test_batch_matches_single_queries() {
        let g = make_chain(200);
        let e = engine(&g, 8);
        let sources: Vec<VertexId> = (0..200).rev().collect();
        let d = set(&[0, 150]);
        let batch = e.nearest_paths_batch(&sources, &d).unwrap();
        for (i, &s) in sources.iter().enumerate() {
            assert_eq!(batch[i], e.nearest_path(s, &d).unwrap(), "source {}", s);
        }
    }

    #[test]
    fn test_map_indexed_order_survives_random_delays() {
        let g = Graph::new();
        let e = engine(&g, 8);
        // LCG-derived delays so late indices often finish first.
        let delays: Vec<u64> = (0..64u64)
            .map(|i| {
                let x = i
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (x >> 33) % 7
            })
            .collect();
        let out = e.map_indexed(delays.len(), |i| {
            std::thread::sleep(Duration::from_millis(delays[i]));
            i * 10
        });
        let expected: Vec<usize> = (0..64).map(|i| i * 10).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_worker_count_follows_config() {
        let g = Graph::new();
        assert_eq!(engine(&g, 3).worker_count(), 3);
    }

    // --- Against reference BFS ---

    proptest! {
        #[test]
        fn prop_matches_reference_bfs(
            edges in prop::collection::vec((0u32..40, 0u32..40), 0..120),
            source in 0u32..45,
            dests in prop::collection::hash_set(0u32..45, 1..4),
        ) {
            let g = graph_from(&edges);
            let d: VertexSet = dests.into_iter().collect();
            let got = nearest_path(&g, source, &d, None).unwrap();
            let expected = reference_distance(&g, source, &d);
            prop_assert_eq!(got.as_ref().map(Path::hops), expected);

            if let Some(p) = got {
                prop_assert_eq!(p.source(), source);
                prop_assert!(d.contains(&p.destination()));
                for w in p.vertices().windows(2) {
                    prop_assert!(g.neighbors(w[0]).contains(&w[1]));
                }
            }
        }
    }
}
