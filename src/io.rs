use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use phylotree::tree::Tree;
use std::collections::HashMap;
use tracing::{debug, warn};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::TransferError;
use crate::taxa::unquote;

/// How tree files are turned into trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Map leaf tokens through a NEXUS `TRANSLATE` block when one is present.
    pub translate: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions { translate: true }
    }
}

/// Read the first tree of a NEXUS or Newick file.
///
/// Files starting with `#NEXUS` are read from their first `TREE` statement;
/// anything else is taken as Newick up to the first `;`. A `.gz` suffix means
/// the file is gzip-compressed. Further trees in the file are ignored.
pub fn read_tree<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Tree, TransferError> {
    let path = path.as_ref();
    let content = read_text(path).map_err(|source| TransferError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (name, newick, translate) = if is_nexus(&content) {
        let blocks = collect_tree_blocks(&content);
        if blocks.len() > 1 {
            warn!(path = %path.display(), trees = blocks.len(), "file holds several trees, using the first");
        }
        let block = blocks
            .into_iter()
            .next()
            .ok_or_else(|| TransferError::NoTrees(path.to_path_buf()))?;
        let translate = if options.translate { parse_taxon_block(&content) } else { HashMap::new() };
        (block.name, block.body, translate)
    } else {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(TransferError::NoTrees(path.to_path_buf()));
        }
        let newick = match find_terminator(trimmed) {
            Some(end) => {
                if !trimmed[end + 1..].trim().is_empty() {
                    warn!(path = %path.display(), "file holds several trees, using the first");
                }
                trimmed[..=end].to_string()
            }
            None => trimmed.to_string(),
        };
        (String::new(), newick, HashMap::new())
    };

    let mut tree = Tree::from_newick(&sanitize_newick(&newick)).map_err(|source| {
        TransferError::Parse { path: path.to_path_buf(), source }
    })?;
    if !translate.is_empty() {
        rename_leaf_nodes(&mut tree, &translate);
    }
    debug!(path = %path.display(), tree = %name, leaves = tree.get_leaves().len(), "read tree");
    Ok(tree)
}

fn read_text(path: &Path) -> io::Result<String> {
    let mut content = String::new();
    let file = File::open(path)?;
    if is_gz(path) {
        GzDecoder::new(file).read_to_string(&mut content)?;
    } else {
        io::BufReader::new(file).read_to_string(&mut content)?;
    }
    Ok(content)
}

fn is_gz(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".gz")
}

fn is_nexus(content: &str) -> bool {
    content.trim_start().to_ascii_uppercase().starts_with("#NEXUS")
}

/// Make a Newick string digestible for the tree reader.
///
/// - `[...]` comments are dropped: rooting flags like `[&R]` and BEAST
///   annotations (`:[&rate=0.123]2.45` → `:2.45`)
/// - whitespace outside quotes is dropped
/// - quoted labels are re-quoted with `"` so the reader keeps them whole
fn sanitize_newick(newick: &str) -> String {
    let mut result = String::with_capacity(newick.len());
    let mut comment_depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = newick.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            if ch == q {
                if chars.peek() == Some(&q) {
                    // Doubled quote is an escaped quote
                    chars.next();
                    if q == '\'' {
                        result.push('\'');
                    }
                    continue;
                }
                quote = None;
                result.push('"');
            } else if ch != '"' {
                result.push(ch);
            }
            continue;
        }

        match ch {
            '[' => comment_depth += 1,
            ']' if comment_depth > 0 => comment_depth -= 1,
            _ if comment_depth > 0 => {}
            '\'' | '"' => {
                quote = Some(ch);
                result.push('"');
            }
            c if c.is_whitespace() => {}
            c => result.push(c),
        }
    }

    result
}

/// Byte offset of the first `;` outside quotes and `[...]` comments.
fn find_terminator(newick: &str) -> Option<usize> {
    let mut comment_depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, ch) in newick.char_indices() {
        match (quote, ch) {
            // A doubled quote closes and reopens, which leaves the state unchanged
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '[') => comment_depth += 1,
            (None, ']') => comment_depth = comment_depth.saturating_sub(1),
            (None, _) if comment_depth > 0 => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, ';') => return Some(i),
            _ => {}
        }
    }
    None
}

struct TreeBlock { name: String, body: String }

/// `TREE name = newick;` statements of a NEXUS file, in file order. A
/// statement may span several lines.
fn collect_tree_blocks(content: &str) -> Vec<TreeBlock> {
    let mut blocks = Vec::new();
    let mut pending: Option<String> = None;

    for line in content
        .lines()
        .skip_while(|line| !is_tree_statement(line))
        .take_while(|line| !line.trim().to_ascii_uppercase().starts_with("END"))
    {
        let statement = match pending.take() {
            Some(mut statement) => {
                statement.push(' ');
                statement.push_str(line.trim());
                statement
            }
            None if is_tree_statement(line) => line.trim().to_string(),
            None => continue,
        };

        if !statement.contains(';') {
            pending = Some(statement);
            continue;
        }

        let Some((header, body)) = split_statement(&statement) else { continue };
        let name = header
            .split_whitespace()
            .nth(1)
            .map(|n| n.trim_matches('\'').to_string())
            .unwrap_or_default();
        blocks.push(TreeBlock { name, body: body.trim().to_string() });
    }

    blocks
}

/// Split `TREE name = body` at the first `=` outside a `[...]` comment.
fn split_statement(statement: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (i, ch) in statement.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '=' if depth == 0 => return Some((&statement[..i], &statement[i + 1..])),
            _ => {}
        }
    }
    None
}

fn is_tree_statement(line: &str) -> bool {
    let upper = line.trim_start().to_ascii_uppercase();
    upper.starts_with("TREE ") || upper.starts_with("UTREE ")
}

/// Entries of a NEXUS `TRANSLATE` block: token → taxon label.
fn parse_taxon_block(content: &str) -> HashMap<String, String> {
    let mut lines = content
        .lines()
        .skip_while(|line| !line.trim().to_ascii_uppercase().starts_with("TRANSLATE"));
    let Some(first) = lines.next() else { return HashMap::new() };

    // STRUCTURE:
    // translate
    //     1 '1959.M.CD.59.ZR59',
    //     2 '1960.DRC60A',
    //     3 Pan_troglodytes;
    let mut block = first.trim()["TRANSLATE".len()..].to_string();
    if !block.contains(';') {
        for line in lines {
            block.push(' ');
            block.push_str(line.trim());
            if line.contains(';') {
                break;
            }
        }
    }

    block
        .split(';')
        .next()
        .unwrap_or_default()
        .split(',')
        .filter_map(|entry| {
            let (id, label) = entry.trim().split_once(char::is_whitespace)?;
            Some((id.to_string(), label.trim().trim_matches('\'').to_string()))
        })
        .collect::<HashMap<_, _>>()
}

/// Replace leaf tokens by their `TRANSLATE` labels; unknown tokens are kept.
pub fn rename_leaf_nodes(phylo_tree: &mut Tree, translate: &HashMap<String, String>) {
    for leaf_id in phylo_tree.get_leaves() {
        if let Ok(node) = phylo_tree.get_mut(&leaf_id) {
            let label = node
                .name
                .as_deref()
                .and_then(|n| translate.get(unquote(n)))
                .cloned();
            if label.is_some() {
                node.name = label;
            }
        }
    }
}

/// `<target>_labeled.tre`, next to the target file.
pub fn default_output_path<P: AsRef<Path>>(target: P) -> PathBuf {
    let mut name = target.as_ref().as_os_str().to_owned();
    name.push("_labeled.tre");
    PathBuf::from(name)
}

/// Write the rendered tree to a file, replacing any previous content.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// If `path` equals `-`, the tree is written to stdout (uncompressed).
pub fn write_labeled_tree<P: AsRef<Path>>(path: P, text: &str) -> Result<(), TransferError> {
    let p = path.as_ref();
    write_text(p, text).map_err(|source| TransferError::Write { path: p.to_path_buf(), source })
}

fn write_text(p: &Path, text: &str) -> io::Result<()> {
    if p.as_os_str() == "-" {
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes())?;
        writeln!(&mut out)?;
        return out.flush();
    }

    let file = BufWriter::new(File::create(p)?);
    if is_gz(p) {
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(text.as_bytes())?;
        enc.finish()?.flush()
    } else {
        let mut out = file;
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_names(tree: &Tree) -> Vec<String> {
        let mut names: Vec<String> = tree
            .get_leaves()
            .iter()
            .filter_map(|&id| tree.get(&id).ok()?.name.clone())
            .collect();
        names.sort();
        names
    }

    const NEXUS: &str = "#NEXUS
begin taxa;
    dimensions ntax=4;
    taxlabels A B C D;
end;

begin trees;
    translate
        1 A,
        2 'B',
        3 C,
        4 D
        ;
    tree con_50_majrule = [&U] (1:0.1,2:0.2,
        (3:0.3,4:0.4)0.87:0.5);
    tree other = [&U] (1,3,(2,4));
end;
";

    #[test]
    fn test_sanitize_strips_comments_and_whitespace() {
        assert_eq!(
            sanitize_newick("[&R] ((A:[&rate=0.1]1.0, B:2.0)[&prob=1.0]0.9 , C);"),
            "((A:1.0,B:2.0)0.9,C);"
        );
    }

    #[test]
    fn test_sanitize_requotes_labels() {
        assert_eq!(
            sanitize_newick("('Homo sapiens':1,'it''s':2,C);"),
            "(\"Homo sapiens\":1,\"it's\":2,C);"
        );
    }

    #[test]
    fn test_terminator_skips_quotes_and_comments() {
        assert_eq!(find_terminator("(A,B);(C,D);"), Some(5));
        assert_eq!(find_terminator("('a;b',C,D);"), Some(11));
        assert_eq!(find_terminator("[note;](A,'it''s;',C);"), Some(21));
        assert_eq!(find_terminator("(A,B)"), None);
    }

    #[test]
    fn test_read_newick_with_semicolon_in_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quoted.nwk");
        std::fs::write(&path, "('a;b',C,D);\n(C,D,E);\n").unwrap();

        let tree = read_tree(&path, &ReadOptions::default()).unwrap();
        let names: Vec<String> = leaf_names(&tree).iter().map(|n| unquote(n).to_string()).collect();
        assert_eq!(names.len(), 3);
        assert!(names.iter().any(|n| n == "a;b"));
    }

    #[test]
    fn test_collect_multiline_tree_blocks() {
        let blocks = collect_tree_blocks(NEXUS);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "con_50_majrule");
        assert_eq!(blocks[0].body, "[&U] (1:0.1,2:0.2, (3:0.3,4:0.4)0.87:0.5);");
        assert_eq!(blocks[1].name, "other");
    }

    #[test]
    fn test_equals_inside_comment_is_skipped() {
        let blocks = collect_tree_blocks("tree best [&lnL=-123.4] = (A,B,C);\nend;");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "best");
        assert_eq!(blocks[0].body, "(A,B,C);");
    }

    #[test]
    fn test_parse_translate_block() {
        let translate = parse_taxon_block(NEXUS);
        assert_eq!(translate.len(), 4);
        assert_eq!(translate.get("2").map(String::as_str), Some("B"));
        assert_eq!(translate.get("4").map(String::as_str), Some("D"));
    }

    #[test]
    fn test_parse_single_line_translate() {
        let translate = parse_taxon_block("begin trees;\n translate 1 A, 2 B, 3 C;\n tree t = (1,2,3);\nend;");
        assert_eq!(translate.len(), 3);
        assert_eq!(translate.get("3").map(String::as_str), Some("C"));
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path("runs/ml.nex"),
            PathBuf::from("runs/ml.nex_labeled.tre")
        );
    }

    #[test]
    fn test_read_nexus_applies_translate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.nex");
        std::fs::write(&path, NEXUS).unwrap();

        let tree = read_tree(&path, &ReadOptions::default()).unwrap();
        assert_eq!(leaf_names(&tree), ["A", "B", "C", "D"]);

        let raw = read_tree(&path, &ReadOptions { translate: false }).unwrap();
        assert_eq!(leaf_names(&raw), ["1", "2", "3", "4"]);
    }

    #[test]
    fn test_gzip_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.nwk.gz");
        write_labeled_tree(&path, "((A:1,B:1):1,C:1);").unwrap();

        let tree = read_tree(&path, &ReadOptions::default()).unwrap();
        assert_eq!(tree.get_leaves().len(), 3);
    }

    #[test]
    fn test_empty_file_has_no_trees() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.nwk");
        std::fs::write(&path, "  \n").unwrap();
        assert!(matches!(
            read_tree(&path, &ReadOptions::default()),
            Err(TransferError::NoTrees(_))
        ));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = read_tree("/nonexistent/tree.nwk", &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, TransferError::Read { .. }));
        assert_eq!(err.exit_code(), 2);
    }
}
