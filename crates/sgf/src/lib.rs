//! SGF (Smart Game Format) game records.
//!
//! Only what a review tool needs: read the first game of a file into a
//! [`GameTree`], edit nodes (comments, `LB` labels, `TR` markers, new
//! variation nodes) and write it back with [`to_sgf`].

mod parser;
mod tree;
mod writer;

pub use parser::parse;
pub use tree::{GameTree, Node, NodeId, Property};
pub use writer::to_sgf;

use thiserror::Error;

/// Errors that can occur when parsing SGF text. Offsets are byte positions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SgfError {
    #[error("no game tree found")]
    NoGameTree,

    #[error("game tree at offset {offset} has no nodes")]
    EmptySequence { offset: usize },

    #[error("expected '{expected}' at offset {offset}, found '{found}'")]
    Unexpected {
        expected: char,
        found: char,
        offset: usize,
    },

    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEnd { offset: usize },

    #[error("property '{ident}' at offset {offset} has no value")]
    MissingValue { ident: String, offset: usize },

    #[error("unterminated property value starting at offset {offset}")]
    UnterminatedValue { offset: usize },
}
