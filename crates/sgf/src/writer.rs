//! SGF text serialization.

use crate::tree::{GameTree, NodeId};

/// Serializes a game tree, one node per line.
///
/// Values are escaped so that [`parse`](crate::parse) reads back the same
/// properties.
pub fn to_sgf(tree: &GameTree) -> String {
    let mut out = String::new();
    write_game_tree(tree, tree.root(), &mut out);
    out.push('\n');
    out
}

fn write_game_tree(tree: &GameTree, start: NodeId, out: &mut String) {
    out.push('(');
    let mut current = start;
    loop {
        write_node(tree, current, out);
        match tree.node(current).children() {
            [] => break,
            [only] => {
                out.push('\n');
                current = *only;
            }
            variations => {
                for &child in variations {
                    out.push('\n');
                    write_game_tree(tree, child, out);
                }
                break;
            }
        }
    }
    out.push(')');
}

fn write_node(tree: &GameTree, id: NodeId, out: &mut String) {
    out.push(';');
    for property in tree.node(id).properties() {
        out.push_str(&property.ident);
        for value in &property.values {
            out.push('[');
            out.push_str(&escape(value));
            out.push(']');
        }
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == ']' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
