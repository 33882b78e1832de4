//! SGF text parsing.

use crate::tree::{GameTree, Node, NodeId};
use crate::SgfError;

/// Parses the first game of an SGF collection.
///
/// Property identifiers written FF[3]-style with lowercase letters
/// (`PlayerBlack`) are reduced to their uppercase letters (`PB`). Soft line
/// breaks (a backslash before a newline) are removed from values and other
/// escapes are resolved.
///
/// ```
/// let tree = sgf::parse("(;GM[1]SZ[9];B[ee];W[cc])").unwrap();
/// assert_eq!(tree.node(tree.root()).get("SZ"), Some("9"));
/// assert_eq!(tree.main_line().len(), 3);
/// ```
pub fn parse(text: &str) -> Result<GameTree, SgfError> {
    let mut parser = Parser { src: text, pos: 0 };
    parser.skip_to_collection()?;

    let mut tree = GameTree::new();
    parser.game_tree(&mut tree, None)?;
    Ok(tree)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn skip_to_collection(&mut self) -> Result<(), SgfError> {
        match self.src.find('(') {
            Some(start) => {
                self.pos = start;
                Ok(())
            }
            None => Err(SgfError::NoGameTree),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SgfError> {
        self.skip_whitespace();
        let offset = self.pos;
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(found) => Err(SgfError::Unexpected {
                expected,
                found,
                offset,
            }),
            None => Err(SgfError::UnexpectedEnd { offset }),
        }
    }

    fn game_tree(&mut self, tree: &mut GameTree, parent: Option<NodeId>) -> Result<(), SgfError> {
        self.expect('(')?;
        let start = self.pos;

        let mut current = parent;
        loop {
            self.skip_whitespace();
            if self.peek() != Some(';') {
                break;
            }
            self.bump();
            let node = self.node()?;
            current = Some(match current {
                None => {
                    tree.set_root_properties(node);
                    tree.root()
                }
                Some(p) => tree.add_child(p, node),
            });
        }

        let last = match current {
            Some(last) if current != parent => last,
            _ => return Err(SgfError::EmptySequence { offset: start }),
        };

        loop {
            self.skip_whitespace();
            let offset = self.pos;
            match self.peek() {
                Some('(') => self.game_tree(tree, Some(last))?,
                Some(')') => {
                    self.bump();
                    return Ok(());
                }
                Some(found) => {
                    return Err(SgfError::Unexpected {
                        expected: ')',
                        found,
                        offset,
                    })
                }
                None => return Err(SgfError::UnexpectedEnd { offset }),
            }
        }
    }

    fn node(&mut self) -> Result<Node, SgfError> {
        let mut node = Node::new();
        loop {
            self.skip_whitespace();
            if !self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
                return Ok(node);
            }

            let offset = self.pos;
            let mut ident = String::new();
            while let Some(c) = self.peek().filter(char::is_ascii_alphabetic) {
                if c.is_ascii_uppercase() {
                    ident.push(c);
                }
                self.bump();
            }

            let mut values = Vec::new();
            loop {
                self.skip_whitespace();
                if self.peek() != Some('[') {
                    break;
                }
                self.bump();
                values.push(self.value()?);
            }

            if values.is_empty() {
                return Err(SgfError::MissingValue { ident, offset });
            }
            if !ident.is_empty() {
                node.push_property(ident, values);
            }
        }
    }

    fn value(&mut self) -> Result<String, SgfError> {
        let start = self.pos;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(']') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('\n') => {
                        if self.peek() == Some('\r') {
                            self.bump();
                        }
                    }
                    Some('\r') => {
                        if self.peek() == Some('\n') {
                            self.bump();
                        }
                    }
                    Some(c) => value.push(c),
                    None => return Err(SgfError::UnterminatedValue { offset: start }),
                },
                Some(c) => value.push(c),
                None => return Err(SgfError::UnterminatedValue { offset: start }),
            }
        }
    }
}
