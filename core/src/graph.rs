use rustc_hash::FxHashMap;

use crate::address::VertexId;

/// Undirected router-interface graph: one adjacency list per vertex.
///
/// Every edge is stored in both endpoints' lists, so `v ∈ neighbors(u)` iff
/// `u ∈ neighbors(v)`. Parallel insertions of the same edge are allowed while
/// building; [`Graph::compact`] sorts and deduplicates every list afterwards.
///
/// The graph is built once and then only read. Shared `&Graph` references are
/// used by all concurrent searches without locking.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    adjacency: FxHashMap<VertexId, Vec<VertexId>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate for a known vertex count.
    pub fn with_capacity(vertex_count: usize) -> Self {
        Self {
            adjacency: FxHashMap::with_capacity_and_hasher(vertex_count, Default::default()),
        }
    }

    /// Reserve room for `additional` more vertices. No observable effect.
    pub fn reserve(&mut self, additional: usize) {
        self.adjacency.reserve(additional);
    }

    /// Add an undirected edge. Self-loops are ignored: they never shorten a path.
    pub fn add_edge(&mut self, u: VertexId, v: VertexId) {
        if u == v {
            return;
        }
        self.adjacency.entry(u).or_default().push(v);
        self.adjacency.entry(v).or_default().push(u);
    }

    /// Neighbors of `u`; empty for a vertex that was never inserted.
    pub fn neighbors(&self, u: VertexId) -> &[VertexId] {
        self.adjacency.get(&u).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, u: VertexId) -> bool {
        self.adjacency.contains_key(&u)
    }

    /// Sort and deduplicate every adjacency list, then release spare capacity.
    ///
    /// After this, neighbor iteration order is ascending, so equal-length
    /// alternatives are resolved the same way on every run.
    pub fn compact(&mut self) {
        for list in self.adjacency.values_mut() {
            list.sort_unstable();
            list.dedup();
            list.shrink_to_fit();
        }
        self.adjacency.shrink_to_fit();
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Undirected edge count, each edge counted once.
    ///
    /// Includes duplicate insertions until [`Graph::compact`] has run.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|v| v.len()).sum::<usize>() / 2
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;

        let slot = size_of::<VertexId>() + size_of::<Vec<VertexId>>() + 1;
        let slots = self.adjacency.capacity() * slot;
        let lists: usize = self
            .adjacency
            .values()
            .map(|v| v.capacity() * size_of::<VertexId>())
            .sum();

        slots + lists
    }

    /// Iterate vertices with their neighbor lists, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, &[VertexId])> {
        self.adjacency.iter().map(|(&u, v)| (u, v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_edge_is_symmetric() {
        let mut g = Graph::new();
        g.add_edge(1, 2);
        g.add_edge(2, 3);
        assert_eq!(g.neighbors(1), &[2]);
        assert_eq!(g.neighbors(2), &[1, 3]);
        assert_eq!(g.neighbors(3), &[2]);
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_neighbors_of_missing_vertex() {
        let g = Graph::new();
        assert!(g.neighbors(42).is_empty());
        assert!(!g.contains(42));
    }

    #[test]
    fn test_self_loop_ignored() {
        let mut g = Graph::new();
        g.add_edge(7, 7);
        assert_eq!(g.node_count(), 0);
        assert!(g.neighbors(7).is_empty());
    }

    #[test]
    fn test_compact_dedups_and_sorts() {
        let mut g = Graph::with_capacity(4);
        g.add_edge(1, 3);
        g.add_edge(1, 2);
        g.add_edge(3, 1);
        g.add_edge(1, 2);
        assert_eq!(g.edge_count(), 4);

        g.compact();
        assert_eq!(g.neighbors(1), &[2, 3]);
        assert_eq!(g.neighbors(3), &[1]);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_symmetry_over_all_vertices() {
        let mut g = Graph::new();
        for (u, v) in [(1, 2), (2, 3), (3, 4), (1, 5), (5, 2)] {
            g.add_edge(u, v);
        }
        for (u, ns) in g.iter() {
            for &v in ns {
                assert!(g.neighbors(v).contains(&u), "{} -> {} has no reverse", u, v);
            }
        }
    }

    #[test]
    fn test_reserve_has_no_observable_effect() {
        let mut g = Graph::new();
        g.reserve(1_000);
        assert_eq!(g.node_count(), 0);
        g.add_edge(1, 2);
        assert_eq!(g.neighbors(2), &[1]);
        assert!(g.memory_usage() > 0);
    }
}
