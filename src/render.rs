//! Writing the annotated target tree.
//!
//! The output looks like Newick, but each internal branch carries *all* of
//! its label slots, joined by a delimiter:
//!
//! ```text
//! (A:0.100000,B:0.200000,(C:0.300000,D:0.400000)0.87/-:0.500000)-/-
//!                                               ^^^^^^ slot 0 / slot 1
//! ```
//!
//! Numeric slot values are printed with 2 decimals, edge lengths with 6.
//! No terminating `;` is added here.

use itertools::Itertools;
use tracing::warn;

use crate::error::TransferError;
use crate::index::{LabelSlot, TargetTree};
use crate::taxa::unquote;

/// Text used between and in place of slot values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Inserted between consecutive slot values.
    pub delimiter: String,
    /// Emitted for slots without a value.
    pub placeholder: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions { delimiter: "/".to_string(), placeholder: "-".to_string() }
    }
}

/// Renders the whole target tree from its root.
///
/// Slots are only read, so rendering the same tree twice gives identical
/// output.
pub fn render(target: &TargetTree, options: &RenderOptions) -> Result<String, TransferError> {
    let mut out = String::new();
    render_node(target, target.root(), options, &mut out)?;
    Ok(out)
}

fn render_node(
    target: &TargetTree,
    node_id: usize,
    options: &RenderOptions,
    out: &mut String,
) -> Result<(), TransferError> {
    let node = target.tree().get(&node_id)?;

    if node.children.is_empty() {
        out.push_str(node.name.as_deref().map(unquote).unwrap_or_default());
    } else {
        out.push('(');
        for (i, &child) in node.children.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            render_node(target, child, options, out)?;
        }
        out.push(')');
        if let Some(slots) = target.slots(node_id) {
            out.push_str(&slots.iter().map(|s| format_slot(s, options)).join(&options.delimiter));
        }
    }

    if let Some(length) = node.parent_edge {
        out.push_str(&format!(":{length:.6}"));
    }
    Ok(())
}

fn format_slot(slot: &LabelSlot, options: &RenderOptions) -> String {
    match slot {
        LabelSlot::Placeholder => options.placeholder.clone(),
        LabelSlot::Value(value) => match value.trim().parse::<f64>() {
            Ok(number) => format!("{number:.2}"),
            Err(_) => {
                warn!(value = %value, "non-numeric branch label, writing it verbatim");
                value.clone()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::transfer;
    use phylotree::tree::Tree as PhyloTree;

    fn parse(newick: &str) -> PhyloTree {
        PhyloTree::from_newick(newick).unwrap()
    }

    #[test]
    fn test_two_sources_one_match() {
        let mut target = TargetTree::new(parse("(A:0.1,B:0.2,(C:0.3,D:0.4):0.5);"), 2).unwrap();
        transfer(&mut target, &parse("(C,D,(A,B)0.87);"), 0).unwrap();
        transfer(&mut target, &parse("(A,C,(B,D)0.95);"), 1).unwrap();

        let out = render(&target, &RenderOptions::default()).unwrap();
        assert_eq!(out, "(A:0.100000,B:0.200000,(C:0.300000,D:0.400000)0.87/-:0.500000)-/-");
    }

    #[test]
    fn test_render_is_repeatable() {
        let mut target = TargetTree::new(parse("((A:1,B:1):1,C:1,(D:1,E:1):1);"), 1).unwrap();
        transfer(&mut target, &parse("(C,(A,B)95,(D,E)80);"), 0).unwrap();

        let options = RenderOptions::default();
        let first = render(&target, &options).unwrap();
        let second = render(&target, &options).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            "((A:1.000000,B:1.000000)95.00:1.000000,C:1.000000,(D:1.000000,E:1.000000)80.00:1.000000)-"
        );
    }

    #[test]
    fn test_bifurcating_source_root_renders_later_label() {
        let mut target = TargetTree::new(parse("(A:1,B:1,(C:1,D:1):1);"), 1).unwrap();
        transfer(&mut target, &parse("((A,B)0.4,(C,D)0.9);"), 0).unwrap();
        let out = render(&target, &RenderOptions::default()).unwrap();
        assert_eq!(out, "(A:1.000000,B:1.000000,(C:1.000000,D:1.000000)0.90:1.000000)-");
    }

    #[test]
    fn test_missing_lengths_are_omitted() {
        let target = TargetTree::new(parse("(A,B,(C,D));"), 1).unwrap();
        let out = render(&target, &RenderOptions::default()).unwrap();
        assert_eq!(out, "(A,B,(C,D)-)-");
    }

    #[test]
    fn test_star_tree_renders_placeholders_only() {
        let target = TargetTree::new(parse("(A:1,B:2,C:3);"), 2).unwrap();
        let out = render(&target, &RenderOptions::default()).unwrap();
        assert_eq!(out, "(A:1.000000,B:2.000000,C:3.000000)-/-");
    }

    #[test]
    fn test_zero_sources_render_no_labels() {
        let target = TargetTree::new(parse("(A:1,(B:1,C:1):2);"), 0).unwrap();
        let out = render(&target, &RenderOptions::default()).unwrap();
        assert_eq!(out, "(A:1.000000,(B:1.000000,C:1.000000):2.000000)");
    }

    #[test]
    fn test_custom_delimiter_and_placeholder() {
        let mut target = TargetTree::new(parse("(A,B,(C,D));"), 3).unwrap();
        transfer(&mut target, &parse("(A,B,(C,D)1);"), 1).unwrap();
        let options = RenderOptions { delimiter: "|".into(), placeholder: "NA".into() };
        let out = render(&target, &options).unwrap();
        assert_eq!(out, "(A,B,(C,D)NA|1.00|NA)NA|NA|NA");
    }

    #[test]
    fn test_non_numeric_label_written_verbatim() {
        let mut target = TargetTree::new(parse("(A,B,(C,D));"), 1).unwrap();
        transfer(&mut target, &parse("(A,B,(C,D)high);"), 0).unwrap();
        let out = render(&target, &RenderOptions::default()).unwrap();
        assert_eq!(out, "(A,B,(C,D)high)-");
    }
}
