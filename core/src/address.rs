use std::net::Ipv4Addr;

use crate::error::{FormatKind, PathError, Result};

/// A router interface in the graph: an IPv4 address packed big-endian into a u32,
/// so `1.2.3.4` becomes `0x01020304`.
pub type VertexId = u32;

/// Encode a dotted-quad IPv4 address as a vertex id.
pub fn encode(dotted_quad: &str) -> Result<VertexId> {
    dotted_quad
        .trim()
        .parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| PathError::format(FormatKind::Address, dotted_quad))
}

/// Decode a vertex id back into its dotted-quad form.
pub fn decode(vertex: VertexId) -> String {
    Ipv4Addr::from(vertex).to_string()
}

/// Encode a list of addresses, failing on the first malformed one.
pub fn encode_all<'a, I>(addresses: I) -> Result<Vec<VertexId>>
where
    I: IntoIterator<Item = &'a str>,
{
    addresses.into_iter().map(encode).collect()
}
