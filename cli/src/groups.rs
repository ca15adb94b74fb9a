use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use itdk_path_core::{address, NodeInterfaceIndex, PathError, VertexId};
use tracing::info;

/// A named set of interfaces, queried together. Unnamed groups use `""`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub interfaces: Vec<VertexId>,
}

/// Where one side of a query comes from.
#[derive(Debug, Clone)]
pub enum Spec {
    Ips(Vec<String>),
    Nodes(Vec<String>),
    /// `group<TAB>ip` or bare `ip` lines, e.g. cloud-region matches produced upstream.
    File(PathBuf),
}

pub fn resolve(spec: &Spec, index: &NodeInterfaceIndex) -> Result<Vec<Group>> {
    let groups = match spec {
        Spec::Ips(ips) => vec![Group {
            name: String::new(),
            interfaces: address::encode_all(ips.iter().map(String::as_str))?,
        }],
        Spec::Nodes(node_ids) => vec![Group {
            name: String::new(),
            interfaces: index.interfaces_of(node_ids.iter().map(String::as_str))?,
        }],
        Spec::File(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            parse_group_file(BufReader::new(file))
                .with_context(|| format!("reading groups from {}", path.display()))?
        }
    };

    for group in &groups {
        if group.interfaces.is_empty() {
            bail!(PathError::invalid_argument(format!(
                "group {:?} resolves to no interfaces",
                group.name
            )));
        }
        info!(group = %group.name, ips = group.interfaces.len(), "Resolved interface group");
    }
    Ok(groups)
}

/// Parse a group file. Groups keep the order in which they first appear.
pub fn parse_group_file<R: BufRead>(reader: R) -> Result<Vec<Group>> {
    let mut groups: Vec<Group> = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (name, ip) = match line.split_once('\t') {
            Some((name, ip)) => (name.trim(), ip.trim()),
            None => ("", line),
        };
        let vertex = address::encode(ip).with_context(|| format!("line {}", lineno + 1))?;

        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.interfaces.push(vertex),
            None => groups.push(Group {
                name: name.to_string(),
                interfaces: vec![vertex],
            }),
        }
    }

    if groups.is_empty() {
        bail!(PathError::invalid_argument("group file lists no addresses"));
    }
    Ok(groups)
}

/// Whether a (source, destination) group pair is skipped: same named group on both sides.
pub fn is_same_group(src: &Group, dst: &Group) -> bool {
    !src.name.is_empty() && src.name == dst.name
}
