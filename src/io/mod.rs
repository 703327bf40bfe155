use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use log::{debug, info};
use phylotree::tree::Tree as PhyloTree;

use crate::error::{ParseError, ParseResult};
use crate::life_list::normalize_taxon;
use crate::tree::{Tree, TreeBundle, TreeFileFormat};

pub fn load_trees(path: &Path) -> ParseResult<TreeBundle> {
    let raw = fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let bundle = parse_trees(&raw)?;
    info!(
        "Loaded {:?} file {} with {} tree(s)",
        bundle.format,
        path.display(),
        bundle.trees.len()
    );
    Ok(bundle)
}

/// Load the first tree of a Newick or Nexus file.
pub fn load_tree(path: &Path) -> ParseResult<Tree> {
    first_tree(load_trees(path)?)
}

pub fn parse_trees(raw: &str) -> ParseResult<TreeBundle> {
    let format = detect_format(raw);
    let trees = match format {
        TreeFileFormat::Newick => parse_newick(raw)?,
        TreeFileFormat::Nexus => parse_nexus(raw)?,
    };

    if trees.is_empty() {
        return Err(ParseError::NoTrees);
    }

    Ok(TreeBundle::new(format, trees))
}

pub fn parse_tree(raw: &str) -> ParseResult<Tree> {
    first_tree(parse_trees(raw)?)
}

fn first_tree(bundle: TreeBundle) -> ParseResult<Tree> {
    bundle.trees.into_iter().next().ok_or(ParseError::NoTrees)
}

fn detect_format(raw: &str) -> TreeFileFormat {
    // Check first non-empty, non-comment line
    for line in raw.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            continue;
        }

        if trimmed.to_ascii_uppercase().starts_with("#NEXUS") {
            return TreeFileFormat::Nexus;
        }

        let upper = trimmed.to_ascii_uppercase();
        if upper.starts_with("BEGIN ") || upper.starts_with("TREE ") {
            return TreeFileFormat::Nexus;
        }

        if trimmed.starts_with('(') || trimmed.contains('(') && trimmed.contains(')') {
            return TreeFileFormat::Newick;
        }
    }

    TreeFileFormat::Newick
}

fn parse_newick(raw: &str) -> ParseResult<Vec<Tree>> {
    let text = strip_comments(raw)?;
    let mut trees = Vec::new();

    for chunk in split_outside_quotes(&text, ';') {
        if chunk.trim().is_empty() {
            continue;
        }
        let tree = build_tree(trees.len(), None, chunk)?;
        trees.push(finish_tree(tree, &HashMap::new(), &HashSet::new())?);
    }

    Ok(trees)
}

fn parse_nexus(raw: &str) -> ParseResult<Vec<Tree>> {
    let text = strip_comments(raw)?;
    let mut trees = Vec::new();
    let mut block: Option<String> = None;
    let mut taxa: HashSet<String> = HashSet::new();
    let mut translate: HashMap<String, String> = HashMap::new();

    for command in split_outside_quotes(&text, ';') {
        let command = skip_nexus_header(command.trim());
        if command.is_empty() {
            continue;
        }

        let (keyword, rest) = split_keyword(command);
        // Bare TREE commands outside any block are accepted too
        let in_trees_block = matches!(block.as_deref(), None | Some("TREES"));

        match keyword.to_ascii_uppercase().as_str() {
            "BEGIN" => block = Some(rest.trim().to_ascii_uppercase()),
            "END" | "ENDBLOCK" => block = None,
            "TAXLABELS" => taxa.extend(tokens(rest).iter().map(|label| normalize_taxon(label))),
            "TRANSLATE" if in_trees_block => translate = parse_translate(rest)?,
            "TREE" | "UTREE" if in_trees_block => {
                let (label, newick) = parse_nexus_tree_line(rest)?;
                let tree = build_tree(trees.len(), label, newick)?;
                trees.push(finish_tree(tree, &translate, &taxa)?);
            }
            _ => {}
        }
    }

    debug!(
        "nexus file declared {} taxa and {} translations",
        taxa.len(),
        translate.len()
    );

    Ok(trees)
}

fn build_tree(index: usize, label: Option<String>, newick: &str) -> ParseResult<Tree> {
    let newick = prepare_newick(newick)?;
    let phylo = PhyloTree::from_newick(&newick).map_err(|err| ParseError::Newick(err.to_string()))?;
    Tree::from_phylo(index, label, &phylo)
}

/// Translate tip tokens, put names in canonical form, check them against the taxa block
/// and reject branch lengths no layout can place.
fn finish_tree(
    mut tree: Tree,
    translate: &HashMap<String, String>,
    taxa: &HashSet<String>,
) -> ParseResult<Tree> {
    tree.rename_tips(|token| {
        let name = match translate.get(token) {
            Some(mapped) => mapped.clone(),
            None => normalize_taxon(token),
        };
        if !taxa.is_empty() && !taxa.contains(&name) {
            return Err(ParseError::UndeclaredTaxon(name));
        }
        Ok(name)
    })?;

    for node in &tree.nodes {
        if let Some(length) = node.length.filter(|length| !length.is_finite() || *length < 0.0) {
            let node_name = match &node.name {
                Some(name) => format!("'{name}'"),
                None => format!("node {}", node.id),
            };
            return Err(ParseError::InvalidBranchLength {
                node: node_name,
                length,
            });
        }
    }

    let mut seen = HashSet::new();
    for name in tree.tip_names() {
        if !seen.insert(name) {
            return Err(ParseError::DuplicateTip(name.to_owned()));
        }
    }

    Ok(tree)
}

/// `label = newick` as found after a TREE/UTREE keyword.
fn parse_nexus_tree_line(definition: &str) -> ParseResult<(Option<String>, &str)> {
    let (label_part, tree_part) = definition
        .split_once('=')
        .ok_or_else(|| ParseError::TreeLine(definition.trim().to_owned()))?;

    // Label can be quoted and may carry an asterisk marking the default tree
    let cleaned_label = label_part.trim().trim_start_matches('*').trim();
    let label = if cleaned_label.is_empty() {
        None
    } else {
        Some(
            cleaned_label
                .trim_matches('"')
                .trim_matches('\'')
                .to_owned(),
        )
    };

    let payload = tree_part.trim();
    if payload.is_empty() {
        return Err(ParseError::TreeLine(definition.trim().to_owned()));
    }

    Ok((label, payload))
}

fn parse_translate(body: &str) -> ParseResult<HashMap<String, String>> {
    let mut table = HashMap::new();
    for entry in split_outside_quotes(body, ',') {
        let parts = tokens(entry);
        if parts.is_empty() {
            continue;
        }
        let [key, name] = parts.as_slice() else {
            return Err(ParseError::Translate(entry.trim().to_owned()));
        };
        if table.insert(key.clone(), normalize_taxon(name)).is_some() {
            return Err(ParseError::Translate(format!("duplicate key {key}")));
        }
    }
    Ok(table)
}

/// Remove `[...]` comments (nested, multi-line) outside quoted labels.
fn strip_comments(raw: &str) -> ParseResult<String> {
    let mut cleaned = String::with_capacity(raw.len());
    let mut depth = 0usize;
    let mut in_quote = false;

    for c in raw.chars() {
        match c {
            '[' if !in_quote => depth += 1,
            ']' if !in_quote && depth > 0 => depth -= 1,
            _ if depth > 0 => {}
            '\'' => {
                in_quote = !in_quote;
                cleaned.push(c);
            }
            _ => cleaned.push(c),
        }
    }

    if depth > 0 {
        return Err(ParseError::Unterminated("comment"));
    }
    if in_quote {
        return Err(ParseError::Unterminated("quoted label"));
    }
    Ok(cleaned)
}

fn is_newick_punctuation(c: char) -> bool {
    matches!(c, '(' | ')' | ',' | ':' | ';')
}

/// Newick ready for the topology parser: whitespace dropped around punctuation and turned
/// into `_` inside labels, quoted labels flattened, one trailing semicolon, balanced
/// parentheses.
fn prepare_newick(raw: &str) -> ParseResult<String> {
    let body = raw.trim().trim_end_matches(';');
    let mut prepared = String::with_capacity(body.len() + 1);
    let mut depth = 0usize;
    let mut gap = false;
    let mut chars = body.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c.is_whitespace() {
            gap = true;
            continue;
        }
        if std::mem::take(&mut gap)
            && !is_newick_punctuation(c)
            && prepared.chars().last().is_some_and(|prev| !is_newick_punctuation(prev))
        {
            prepared.push('_');
        }

        match c {
            '\'' => {
                let mut label = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\'')) if matches!(chars.peek(), Some((_, '\''))) => {
                            chars.next();
                        }
                        Some((_, '\'')) => break,
                        Some((_, inner)) => label.push(inner),
                        None => return Err(ParseError::Unterminated("quoted label")),
                    }
                }
                let flattened = label
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join("_")
                    .replace(['(', ')', ',', ':', ';', '[', ']'], "_");
                prepared.push_str(&flattened);
            }
            '(' => {
                depth += 1;
                prepared.push(c);
            }
            ')' => {
                if depth == 0 {
                    return Err(ParseError::Unbalanced { offset });
                }
                depth -= 1;
                prepared.push(c);
            }
            ';' => return Err(ParseError::Newick(format!("unexpected ';' at byte {offset}"))),
            _ => prepared.push(c),
        }
    }

    if depth != 0 {
        return Err(ParseError::Unbalanced { offset: body.len() });
    }
    if prepared.is_empty() {
        return Err(ParseError::Newick("empty tree".to_owned()));
    }

    prepared.push(';');
    Ok(prepared)
}

fn split_outside_quotes(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut start = 0;

    for (index, c) in text.char_indices() {
        if c == '\'' {
            in_quote = !in_quote;
        } else if c == separator && !in_quote {
            parts.push(&text[start..index]);
            start = index + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Whitespace-separated words, single quotes grouping a word and `''` escaping a quote.
fn tokens(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quote {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    current.push('\'');
                } else {
                    in_quote = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '\'' {
            in_quote = true;
        } else if c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn split_keyword(command: &str) -> (&str, &str) {
    match command.find(char::is_whitespace) {
        Some(index) => (&command[..index], &command[index..]),
        None => (command, ""),
    }
}

fn skip_nexus_header(command: &str) -> &str {
    match command.get(..6) {
        Some(head) if head.eq_ignore_ascii_case("#NEXUS") => command[6..].trim_start(),
        _ => command,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn detects_format_correctly() {
        assert_eq!(detect_format("#NEXUS\nBEGIN TREES;"), TreeFileFormat::Nexus);
        assert_eq!(detect_format("(A:0.1,B:0.2);"), TreeFileFormat::Newick);
        assert_eq!(detect_format("   #nexus   \n"), TreeFileFormat::Nexus);
        assert_eq!(detect_format("[comment]\n(A,B);"), TreeFileFormat::Newick);
    }

    #[test]
    fn parses_simple_newick() {
        let trees = parse_newick("(A:0.1,B:0.2);").unwrap();
        assert_eq!(trees.len(), 1);
        let tree = &trees[0];
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.tip_names(), vec!["A", "B"]);
        assert!(tree.root_node().is_root());
        let b = tree.tips()[1];
        assert_eq!(tree.nodes[b].length, Some(0.2));
    }

    #[test]
    fn parses_multiple_newick() {
        let input = "(A:0.1,B:0.2);\n(C:0.3,D:0.4);\n";
        let trees = parse_newick(input).unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[1].id, 1);
    }

    #[test]
    fn keeps_root_label_and_missing_lengths() {
        let tree = parse_tree("(A:1,(B,C:1):1)Root;").unwrap();
        assert_eq!(tree.root_node().name.as_deref(), Some("Root"));
        let b = tree.tips()[1];
        assert_eq!(tree.nodes[b].name.as_deref(), Some("B"));
        assert_eq!(tree.nodes[b].length, None);
    }

    #[test]
    fn parses_simple_nexus() {
        let input = "#NEXUS\nBEGIN TREES;\nTREE tree1 = [&R] (A:0.1,B:0.2);\nEND;";
        let trees = parse_nexus(input).unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].label.as_deref(), Some("tree1"));
        assert_eq!(trees[0].leaf_count(), 2);
    }

    #[test]
    fn parses_nexus_with_annotations() {
        let input = "#NEXUS
BEGIN TREES;
    TREE tree1 = [&R] ((A[&rate=0.5]:0.1,B:0.2)[&posterior=0.99]:0.3,C:0.4);
END;";
        let trees = parse_nexus(input).unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].label.as_deref(), Some("tree1"));
        assert_eq!(trees[0].tip_names(), vec!["A", "B", "C"]);
    }

    #[test]
    fn parses_nexus_with_hpd_annotations() {
        let input = "#NEXUS
BEGIN TREES;
    UTREE 1 = (((Sly: 1.108043, (Mtr: 1.025109, (Ppr: 0.931515, Ath: 0.931515) [&95%HPD={0.884857, 0.976439}]: 0.093594) [&95%HPD={1.00855, 1.04577}]: 0.082934) [&95%HPD={1.08281, 1.1334}]: 0.084596, (Atr: 0.501430, ((Bvu: 0.393534, (Sol: 0.277897, (Cqu_subA: 0.074266, Cqu_subB: 0.074266) [&95%HPD={0.0514245, 0.0989838}]: 0.203632) [&95%HPD={0.217687, 0.342218}]: 0.115637) [&95%HPD={0.32271, 0.466057}]: 0.029666, (Ham: 0.335063, ((Sgl_subA: 0.011259, Sgl_subB: 0.011259) [&95%HPD={0.0076616, 0.0151649}]: 0.243167, (Sbi_subA: 0.060486, Sbi_subB: 0.060486) [&95%HPD={0.0417489, 0.0801152}]: 0.193939) [&95%HPD={0.19932, 0.311098}]: 0.080638) [&95%HPD={0.27219, 0.400269}]: 0.088137) [&95%HPD={0.349973, 0.498591}]: 0.078230) [&95%HPD={0.417616, 0.590171}]: 0.691209) [&95%HPD={1.17014, 1.20772}]: 0.343069, Osa: 1.535707) [&95%HPD={1.42368, 1.64135}];
END;";

        let trees = parse_nexus(input).unwrap();
        assert_eq!(trees.len(), 1);
        let tree = &trees[0];
        assert_eq!(tree.label.as_deref(), Some("1"));
        assert_eq!(tree.leaf_count(), 15);
        assert_eq!(tree.tip_names().first(), Some(&"Sly"));
        assert_eq!(tree.tip_names().last(), Some(&"Osa"));
    }

    #[test]
    fn accepts_tree_command_without_block() {
        let trees = parse_trees("TREE t1 = (A:1,B:1);").unwrap();
        assert_eq!(trees.format, TreeFileFormat::Nexus);
        assert_eq!(trees.trees[0].label.as_deref(), Some("t1"));
    }

    #[test]
    fn parses_nexus_multiline_tree() {
        let input = "#NEXUS
BEGIN TREES;
    TREE tree1 =
        (A:0.1,
         B:0.2);
END;";
        let trees = parse_nexus(input).unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].label.as_deref(), Some("tree1"));
        assert_eq!(trees[0].leaf_count(), 2);
    }

    #[test]
    fn parses_nexus_with_comments() {
        let input = "#NEXUS
[This is a comment]
BEGIN TREES;
    TREE tree1 = (A:0.1,B:0.2); [inline comment]
    [Another comment; with a semicolon]
    TREE tree2 = (C:0.3,D:0.4);
END;";
        let trees = parse_nexus(input).unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].label.as_deref(), Some("tree1"));
        assert_eq!(trees[1].label.as_deref(), Some("tree2"));
    }

    #[test]
    fn handles_quoted_labels() {
        let input = "#NEXUS
BEGIN TREES;
    TREE 'my tree' = (A:0.1,B:0.2);
    TREE \"another tree\" = (C:0.3,D:0.4);
END;";
        let trees = parse_nexus(input).unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].label.as_deref(), Some("my tree"));
        assert_eq!(trees[1].label.as_deref(), Some("another tree"));
    }

    #[test]
    fn quoted_tip_names_take_underscores() {
        let tree = parse_tree("('Turdus migratorius':1,'Sitta carolinensis':2);").unwrap();
        assert_eq!(
            tree.tip_names(),
            vec!["Turdus_migratorius", "Sitta_carolinensis"]
        );
    }

    #[test]
    fn applies_translate_table() {
        let input = "#NEXUS
BEGIN TAXA;
    DIMENSIONS NTAX=3;
    TAXLABELS Turdus_migratorius 'Sitta carolinensis' Poecile_atricapillus;
END;
BEGIN TREES;
    TRANSLATE
        1 Turdus_migratorius,
        2 'Sitta carolinensis',
        3 Poecile_atricapillus;
    TREE con_50 = [&R] (1:1.0,(2:0.5,3:0.5):0.5);
END;";
        let tree = parse_tree(input).unwrap();
        assert_eq!(tree.label.as_deref(), Some("con_50"));
        assert_eq!(
            tree.tip_names(),
            vec!["Turdus_migratorius", "Sitta_carolinensis", "Poecile_atricapillus"]
        );
    }

    #[test]
    fn rejects_tips_missing_from_taxa_block() {
        let input = "#NEXUS
BEGIN TAXA;
    TAXLABELS A B;
END;
BEGIN TREES;
    TREE t = (A:1,B:1,C:1);
END;";
        assert!(matches!(
            parse_trees(input),
            Err(ParseError::UndeclaredTaxon(name)) if name == "C"
        ));
    }

    #[test]
    fn rejects_malformed_translate_entries() {
        let input = "#NEXUS
BEGIN TREES;
    TRANSLATE 1 A, 2;
    TREE t = (1,2);
END;";
        assert!(matches!(parse_trees(input), Err(ParseError::Translate(_))));
    }

    #[test]
    fn rejects_unbalanced_parentheses() {
        assert!(matches!(
            parse_trees("((A:1,B:1);"),
            Err(ParseError::Unbalanced { .. })
        ));
        assert!(matches!(
            parse_trees("(A:1,B:1));"),
            Err(ParseError::Unbalanced { .. })
        ));
    }

    #[test]
    fn unquoted_tip_names_with_spaces_take_underscores() {
        let tree = parse_tree("(Turdus migratorius:1, Sitta  carolinensis :2) Root;").unwrap();
        assert_eq!(
            tree.tip_names(),
            vec!["Turdus_migratorius", "Sitta_carolinensis"]
        );
        assert_eq!(tree.root_node().name.as_deref(), Some("Root"));
    }

    #[test]
    fn rejects_negative_and_non_finite_branch_lengths() {
        assert!(matches!(
            parse_trees("(A:-1,B:1);"),
            Err(ParseError::InvalidBranchLength { length, .. }) if length == -1.0
        ));
        assert!(matches!(
            parse_trees("(A:1,B:inf);"),
            Err(ParseError::InvalidBranchLength { .. }) | Err(ParseError::Newick(_))
        ));
        assert!(parse_trees("(A:0,B:1);").is_ok());
    }

    #[test]
    fn non_ascii_commands_do_not_break_header_detection() {
        let input = "#NEXUS\nBEGIN TREES;\naéééé;\nTREE t = (A:1,B:1);\nEND;";
        let tree = parse_tree(input).unwrap();
        assert_eq!(tree.tip_names(), vec!["A", "B"]);
        assert_eq!(skip_nexus_header("#NEXUé x"), "#NEXUé x");
        assert_eq!(skip_nexus_header("#nexus BEGIN"), "BEGIN");
    }

    #[test]
    fn rejects_duplicate_tips() {
        assert!(matches!(
            parse_trees("(A:1,(B:1,A:1):1);"),
            Err(ParseError::DuplicateTip(name)) if name == "A"
        ));
    }

    #[test]
    fn rejects_unterminated_comments_and_tree_lines() {
        assert!(matches!(
            parse_trees("(A:1,B:1)[unterminated;"),
            Err(ParseError::Unterminated("comment"))
        ));
        let input = "#NEXUS\nBEGIN TREES;\nTREE (A,B);\nEND;";
        assert!(matches!(parse_trees(input), Err(ParseError::TreeLine(_))));
    }

    #[test]
    fn empty_input_has_no_trees() {
        assert!(matches!(parse_trees(""), Err(ParseError::NoTrees)));
        assert!(matches!(
            parse_trees("#NEXUS\nBEGIN TAXA;\nTAXLABELS A;\nEND;"),
            Err(ParseError::NoTrees)
        ));
    }

    #[test]
    fn loads_tree_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(A:1,(B:1,C:1):1)Root;").unwrap();
        let tree = load_tree(file.path()).unwrap();
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_trees(&dir.path().join("absent.nex"));
        assert!(matches!(result, Err(ParseError::Read { .. })));
    }
}
