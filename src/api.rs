//! Python binding layer for branch label transfer.
//!
//! Exposes the file-based transfer pipeline to Python.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::io::ReadOptions;
use crate::render::{RenderOptions, render};
use crate::transfer::transfer_files;

/// Transfer branch labels from source tree files onto a target tree file.
///
/// Args:
///     target: Path to the target tree (NEXUS or Newick, optionally gzipped)
///     sources: Paths to the source trees; source i fills label slot i
///     delimiter: Separator between per-source values (default: "/")
///     placeholder: Written where no source supplied a value (default: "-")
///     use_real_taxa: Use TRANSLATE block for taxon names when available (default: True)
///
/// Returns:
///     A tuple of (newick, stats) where:
///     - newick is the labelled target tree, without a trailing semicolon
///     - stats holds one (matched, unmatched) pair per source tree
///
/// Raises:
///     ValueError: If a file cannot be read or parsed, or the target has
///     unnamed or duplicate leaves
#[pyfunction]
#[pyo3(signature = (target, sources, delimiter="/", placeholder="-", use_real_taxa=true))]
fn transfer_labels(
    target: String,
    sources: Vec<String>,
    delimiter: &str,
    placeholder: &str,
    use_real_taxa: bool,
) -> PyResult<(String, Vec<(usize, usize)>)> {
    let read_options = ReadOptions { translate: use_real_taxa };
    let mut stats = Vec::with_capacity(sources.len());

    let labelled = transfer_files(&target, &sources, &read_options, |_, _, s| {
        stats.push((s.matched, s.unmatched));
    })
    .map_err(|e| PyValueError::new_err(format!("Label transfer failed: {}", e)))?;

    let options = RenderOptions {
        delimiter: delimiter.to_string(),
        placeholder: placeholder.to_string(),
    };
    let newick = render(&labelled, &options)
        .map_err(|e| PyValueError::new_err(format!("Failed to render target tree: {}", e)))?;

    Ok((newick, stats))
}

/// Python module definition
#[pymodule]
fn transfer_branch_labels(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(transfer_labels, m)?)?;
    Ok(())
}
