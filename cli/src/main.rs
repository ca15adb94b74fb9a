//! itdk-paths: nearest router-level paths between groups of interfaces.
//!
//! Loads an ITDK node index (optionally restricted to nodes with a geo
//! record), builds the interface graph from the links file, then for every
//! (source group, destination group) pair prints one path per source
//! interface to the nearest destination interface.

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use itdk_path_core::{EngineConfig, PathEngine, VertexSet};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod groups;
mod load;
mod output;

use groups::Spec;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("src").required(true).args(["src_ips", "src_nodes", "src_file"])))]
#[command(group(ArgGroup::new("dst").required(true).args(["dst_ips", "dst_nodes", "dst_file"])))]
struct Args {
    /// ITDK links file (`link L<n>: N<id>[:<ip>] ...`)
    #[arg(long, default_value = "../data/caida-itdk/midar-iff.links")]
    links: PathBuf,

    /// ITDK nodes file (`node N<id>: <ip> ...`)
    #[arg(long, default_value = "../data/caida-itdk/midar-iff.nodes")]
    nodes: PathBuf,

    /// ITDK node geo file; when given, nodes without a geo record are dropped
    #[arg(long)]
    geo: Option<PathBuf>,

    /// Source interface addresses
    #[arg(long, num_args = 1..)]
    src_ips: Option<Vec<String>>,

    /// Source node ids; all of their interfaces are used
    #[arg(long, num_args = 1..)]
    src_nodes: Option<Vec<String>>,

    /// Source groups file (`group<TAB>ip` per line)
    #[arg(long)]
    src_file: Option<PathBuf>,

    /// Destination interface addresses
    #[arg(long, num_args = 1..)]
    dst_ips: Option<Vec<String>>,

    /// Destination node ids; all of their interfaces are used
    #[arg(long, num_args = 1..)]
    dst_nodes: Option<Vec<String>>,

    /// Destination groups file (`group<TAB>ip` per line)
    #[arg(long)]
    dst_file: Option<PathBuf>,

    /// Engine configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads for path search (default: all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Longest path to report, in hops
    #[arg(long)]
    max_hops: Option<u32>,

    /// Also print a line for each source with no path
    #[arg(long)]
    include_missing: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn src_spec(&self) -> Spec {
        spec_of(&self.src_ips, &self.src_nodes, &self.src_file)
    }

    fn dst_spec(&self) -> Spec {
        spec_of(&self.dst_ips, &self.dst_nodes, &self.dst_file)
    }

    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if self.max_hops.is_some() {
            config.max_hops = self.max_hops;
        }
        config.validate()?;
        Ok(config)
    }
}

// clap's required group guarantees one of the three is present.
fn spec_of(
    ips: &Option<Vec<String>>,
    nodes: &Option<Vec<String>>,
    file: &Option<PathBuf>,
) -> Spec {
    match (ips, nodes, file) {
        (Some(ips), _, _) => Spec::Ips(ips.clone()),
        (None, Some(nodes), _) => Spec::Nodes(nodes.clone()),
        (None, None, Some(file)) => Spec::File(file.clone()),
        (None, None, None) => Spec::Ips(Vec::new()),
    }
}

fn run<W: Write>(args: &Args, out: &mut W) -> Result<()> {
    let config = args.engine_config()?;

    let index = load::load_index(&args.nodes, args.geo.as_deref())?;
    let graph = load::load_graph(&args.links, &index, &config)?;

    let src_groups = groups::resolve(&args.src_spec(), &index).context("resolving sources")?;
    let dst_groups =
        groups::resolve(&args.dst_spec(), &index).context("resolving destinations")?;

    let engine = PathEngine::new(&graph, config)?;

    for src in &src_groups {
        for dst in &dst_groups {
            if groups::is_same_group(src, dst) {
                continue;
            }

            info!(src = %src.name, dst = %dst.name, "Finding paths ...");
            let start = Instant::now();
            let destinations: VertexSet = dst.interfaces.iter().copied().collect();
            let results = engine.nearest_paths_batch(&src.interfaces, &destinations)?;

            let found = output::write_results(
                out,
                &src.name,
                &dst.name,
                &src.interfaces,
                &results,
                args.include_missing,
            )?;
            info!(
                src = %src.name,
                dst = %dst.name,
                found,
                elapsed_s = start.elapsed().as_secs_f64(),
                "Group pair completed"
            );
        }
    }

    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&args, &mut out)
}
