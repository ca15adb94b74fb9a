use std::io::Write;

use itdk_path_core::{address, Path, VertexId};

/// Render a path as `['10.0.0.1', '10.0.0.2']`.
pub fn format_path(path: &Path) -> String {
    let hops: Vec<String> = path
        .to_dotted()
        .into_iter()
        .map(|ip| format!("'{}'", ip))
        .collect();
    format!("[{}]", hops.join(", "))
}

/// Write the results of one group pair. Missing paths are listed only when asked.
pub fn write_results<W: Write>(
    out: &mut W,
    src_name: &str,
    dst_name: &str,
    sources: &[VertexId],
    results: &[Option<Path>],
    include_missing: bool,
) -> std::io::Result<usize> {
    writeln!(out, "# {} -> {}", src_name, dst_name)?;
    let mut found = 0;
    for (source, result) in sources.iter().zip(results) {
        match result {
            Some(path) => {
                writeln!(out, "{}", format_path(path))?;
                found += 1;
            }
            None if include_missing => {
                writeln!(out, "# no path from {}", address::decode(*source))?;
            }
            None => {}
        }
    }
    Ok(found)
}
