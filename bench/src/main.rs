use itdk_path_core::{
    build_graph_parallel, EngineConfig, Graph, NodeInterfaceIndex, PathEngine, VertexId, VertexSet,
};
use std::time::Instant;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("all");
    let node_count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1_000_000);
    let queries: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(1_000);

    if mode == "help" || mode == "--help" {
        println!("Usage: itdk-path-bench [mode] [node_count] [queries]");
        println!();
        println!("Modes:");
        println!("  all         Run all generators and benchmark each (default)");
        println!("  scalefree   Preferential attachment (hub-and-spoke backbone)");
        println!("  smallworld  Ring lattice of links + random shortcuts");
        println!("  random      Uniform random multi-router links");
        println!("  barbell     Two dense regions joined by a thin chain of links");
        println!();
        println!("Default node_count: 1000000, queries: 1000");
        return;
    }

    println!("itdk-path-bench");
    println!("===============");
    println!();

    let generators: Vec<(&str, fn(u64) -> Topology)> = match mode {
        "scalefree" => vec![("Scale-free (edge sampling)", gen_scale_free)],
        "smallworld" => vec![("Small-world (ring + shortcuts)", gen_small_world)],
        "random" => vec![("Random multi-router links", gen_random)],
        "barbell" => vec![("Barbell (region-chain-region)", gen_barbell)],
        "all" => vec![
            ("Scale-free (edge sampling)", gen_scale_free as fn(u64) -> Topology),
            ("Small-world (ring + shortcuts)", gen_small_world),
            ("Random multi-router links", gen_random),
            ("Barbell (region-chain-region)", gen_barbell),
        ],
        _ => {
            eprintln!("Unknown mode: {}. Use --help for options.", mode);
            return;
        }
    };

    for (name, generator) in generators {
        run_benchmark(name, generator, node_count, queries);
    }
}

fn run_benchmark(name: &str, generator: fn(u64) -> Topology, node_count: u64, queries: usize) {
    println!("--- {} ---", name);
    println!("Target: {} routers", node_count);

    let t = Instant::now();
    let topo = generator(node_count);
    println!(
        "Generated in {:.2}s — {} indexed nodes, {} link records",
        t.elapsed().as_secs_f64(),
        topo.index.len(),
        topo.links.len()
    );

    let config = EngineConfig::default();
    let t = Instant::now();
    let (graph, stats) = match build_graph_parallel(&topo.links, &topo.index, &config) {
        Ok(built) => built,
        Err(e) => {
            eprintln!("Build failed: {}", e);
            return;
        }
    };
    println!(
        "Built in {:.2}s — {} vertices, {} edges, {} links used, {} skipped, ~{:.0}MB",
        t.elapsed().as_secs_f64(),
        graph.node_count(),
        graph.edge_count(),
        stats.linked_records,
        stats.skipped_records,
        graph.memory_usage() as f64 / 1_048_576.0
    );

    let (sources, destinations) = pick_queries(&graph, &topo, queries);
    if sources.is_empty() || destinations.is_empty() {
        println!("Not enough connected interfaces to query.");
        println!();
        return;
    }

    let engine = match PathEngine::new(&graph, config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Engine failed: {}", e);
            return;
        }
    };

    println!();
    let t = Instant::now();
    let single = engine.nearest_path(sources[0], &destinations);
    let elapsed = t.elapsed();
    match single {
        Ok(Some(p)) => println!(
            "Single query {}: {} hops in {:.1}ms",
            p.to_dotted()[0],
            p.hops(),
            elapsed.as_secs_f64() * 1000.0
        ),
        Ok(None) => println!("Single query: no path ({:.1}ms)", elapsed.as_secs_f64() * 1000.0),
        Err(e) => println!("Single query failed: {}", e),
    }

    let t = Instant::now();
    let results = match engine.nearest_paths_batch(&sources, &destinations) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Batch failed: {}", e);
            return;
        }
    };
    let elapsed = t.elapsed().as_secs_f64();
    let found: Vec<usize> = results.iter().flatten().map(|p| p.hops()).collect();
    let mean_hops = if found.is_empty() {
        0.0
    } else {
        found.iter().sum::<usize>() as f64 / found.len() as f64
    };
    println!(
        "Batch of {} on {} workers: {} found, mean {:.1} hops, {:.2}s ({:.0} queries/s)",
        sources.len(),
        engine.worker_count(),
        found.len(),
        mean_hops,
        elapsed,
        sources.len() as f64 / elapsed.max(1e-9)
    );
    println!();
}

/// Sources from the low end of the id space, destinations from the top 1%.
fn pick_queries(graph: &Graph, topo: &Topology, queries: usize) -> (Vec<VertexId>, VertexSet) {
    let n = topo.node_count;
    let dest_from = n.saturating_sub((n / 100).max(1));

    let destinations: VertexSet = (dest_from..n)
        .flat_map(|i| topo.index.interfaces(&node_id(i)).to_vec())
        .filter(|v| graph.contains(*v))
        .collect();

    let sources: Vec<VertexId> = (0..dest_from)
        .flat_map(|i| topo.index.interfaces(&node_id(i)).to_vec())
        .filter(|v| graph.contains(*v))
        .take(queries)
        .collect();

    (sources, destinations)
}

// ---------------------------------------------------------------------------
// Generators — O(n + links), single-threaded, deterministic
// ---------------------------------------------------------------------------

/// Simple LCG for deterministic, fast pseudo-random numbers.
struct FastRng(u64);

impl FastRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % max
    }
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Synthetic dataset: a node index plus raw link lines.
struct Topology {
    node_count: u64,
    index: NodeInterfaceIndex,
    links: Vec<String>,
}

fn node_id(i: u64) -> String {
    format!("N{}", i + 1)
}

/// Interfaces live in 10.0.0.0/8, two addresses per router slot.
fn interface(i: u64, slot: u64) -> VertexId {
    0x0A00_0000 + ((i * 2 + slot) as u32 & 0x00FF_FFFF)
}

impl Topology {
    /// Every 20th router has no geo record and is left out of the index;
    /// every 5th has a second interface.
    fn new(node_count: u64, link_estimate: usize) -> Self {
        let mut index = NodeInterfaceIndex::with_capacity(node_count as usize);
        for i in 0..node_count {
            if i % 20 == 19 {
                continue;
            }
            let mut ifaces = vec![interface(i, 0)];
            if i % 5 == 0 {
                ifaces.push(interface(i, 1));
            }
            index.insert(node_id(i), ifaces);
        }
        Self {
            node_count,
            index,
            links: Vec::with_capacity(link_estimate),
        }
    }

    /// Append a link line; odd-numbered routers are written as inferred interfaces.
    fn link(&mut self, routers: &[u64]) {
        let mut line = format!("link L{}:", self.links.len() + 1);
        for &r in routers {
            if r % 2 == 0 {
                let ip = itdk_path_core::address::decode(interface(r, 0));
                line.push_str(&format!(" {}:{}", node_id(r), ip));
            } else {
                line.push_str(&format!(" {}", node_id(r)));
            }
        }
        self.links.push(line);
    }
}

/// Scale-free via edge-list sampling (O(links), not O(n²)).
///
/// Each new router links to routers picked from existing link endpoints, so
/// well-connected routers attract more links. One link in eight is a shared
/// medium with a third router.
fn gen_scale_free(node_count: u64) -> Topology {
    let links_per_node = 3u64;
    let mut topo = Topology::new(node_count, (node_count * links_per_node) as usize);
    let mut rng = FastRng::new(12345);
    let mut endpoints: Vec<u64> = Vec::with_capacity((node_count * links_per_node * 2) as usize);

    let seed = 5u64.min(node_count);
    for i in 0..seed {
        for j in (i + 1)..seed {
            topo.link(&[i, j]);
            endpoints.push(i);
            endpoints.push(j);
        }
    }

    for new_node in seed..node_count {
        for _ in 0..links_per_node.min(new_node) {
            let target = endpoints[rng.next(endpoints.len() as u64) as usize];
            if target == new_node {
                continue;
            }
            if rng.next(8) == 0 {
                let third = rng.next(new_node);
                topo.link(&[new_node, target, third]);
            } else {
                topo.link(&[new_node, target]);
            }
            endpoints.push(new_node);
            endpoints.push(target);
        }
    }

    topo
}

/// Ring lattice of point-to-point links, each rewired with probability p.
/// High clustering with short paths.
fn gen_small_world(node_count: u64) -> Topology {
    let k = 3u64;
    let p = 0.05f64;
    let mut topo = Topology::new(node_count, (node_count * k) as usize);
    let mut rng = FastRng::new(67890);

    for i in 0..node_count {
        for j in 1..=k {
            let neighbor = (i + j) % node_count;
            if rng.next_f64() < p {
                let rewired = rng.next(node_count);
                if rewired != i {
                    topo.link(&[i, rewired]);
                    continue;
                }
            }
            topo.link(&[i, neighbor]);
        }
    }

    topo
}

/// Uniform random links with two to four routers each. No structure.
fn gen_random(node_count: u64) -> Topology {
    let target_links = node_count * 2;
    let mut topo = Topology::new(node_count, target_links as usize);
    let mut rng = FastRng::new(54321);

    for _ in 0..target_links {
        let size = 2 + rng.next(3) as usize;
        let routers: Vec<u64> = (0..size).map(|_| rng.next(node_count)).collect();
        topo.link(&routers);
    }

    topo
}

/// Two densely linked regions joined by a chain of ~10 point-to-point links.
/// Worst case for searches that must find the bottleneck.
fn gen_barbell(node_count: u64) -> Topology {
    let bridge_len = 10u64.min(node_count / 2);
    let region = (node_count - bridge_len) / 2;
    let mut topo = Topology::new(node_count, (region * 8 + bridge_len) as usize);
    let mut rng = FastRng::new(99999);

    let b_start = region + bridge_len;
    for base in [0, b_start] {
        for i in 0..region {
            for _ in 0..4u64.min(region.saturating_sub(1)) {
                let target = rng.next(region);
                if target != i {
                    topo.link(&[base + i, base + target]);
                }
            }
        }
    }

    // Chain: last router of region A through the bridge into region B.
    let mut prev = region.saturating_sub(1);
    for id in region..=b_start.min(node_count.saturating_sub(1)) {
        topo.link(&[prev, id]);
        prev = id;
    }

    topo
}
