//! Parser for ITDK `.links` records.
//!
//! A data line names one link and the router interfaces attached to it:
//!
//! ```text
//! link L12: N1:10.0.0.1 N2:10.0.0.2 N3
//! ```
//!
//! `N<digits>:<ip>` is a known interface, a bare `N<digits>` is an inferred one.
//! Only the node id is kept for graph building: interface addresses are taken
//! from the node index, which is the only source that is consistent with the
//! geo dataset.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::address::{self, VertexId};
use crate::error::{FormatKind, PathError, Result};

static LINK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^link L(\d+): +([N\d.: ]+)$").expect("valid link regex"));

static LINK_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(N\d+)(?::([\d.]+))?$").expect("valid token regex"));

/// One router interface mentioned on a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkToken {
    pub node_id: String,
    /// Inline address, present for known interfaces. Not used for edges.
    pub address: Option<VertexId>,
}

/// A parsed `link` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    /// Digits after `L`, kept verbatim; ITDK ids are not bounded.
    pub link_id: String,
    pub tokens: Vec<LinkToken>,
}

impl LinkRecord {
    /// Node ids in encounter order, duplicates included.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.node_id.as_str())
    }
}

/// Whether a line carries no data: a `#` comment or blank.
pub fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.trim().is_empty()
}

/// Parse one line of a links file.
///
/// Returns `Ok(None)` for comments and blank lines, and a `Format` error for
/// anything that is not a well-formed `link` record. Callers building a graph
/// log the error and move on to the next line.
pub fn parse_link_line(line: &str) -> Result<Option<LinkRecord>> {
    if is_comment(line) {
        return Ok(None);
    }

    let line = line.trim_end();
    let caps = LINK_LINE
        .captures(line)
        .ok_or_else(|| PathError::format(FormatKind::LinkLine, line))?;

    let link_id = caps[1].to_string();

    let tokens = caps[2]
        .split_whitespace()
        .map(parse_token)
        .collect::<Result<Vec<_>>>()?;

    if tokens.is_empty() {
        return Err(PathError::format(FormatKind::LinkLine, line));
    }

    Ok(Some(LinkRecord { link_id, tokens }))
}

fn parse_token(token: &str) -> Result<LinkToken> {
    let caps = LINK_TOKEN
        .captures(token)
        .ok_or_else(|| PathError::format(FormatKind::LinkToken, token))?;

    // The inline address is informational; a bad one does not cost the node.
    let address = caps
        .get(2)
        .and_then(|ip| match address::encode(ip.as_str()) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(token, "Ignoring inline address: {}", e);
                None
            }
        });

    Ok(LinkToken {
        node_id: caps[1].to_string(),
        address,
    })
}
