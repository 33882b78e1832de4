//! In-memory game tree.
//!
//! Nodes live in an arena owned by [`GameTree`] and refer to each other by
//! [`NodeId`]. The first child of a node continues the main line; further
//! children are variations.

use go_core::Color;

/// Index of a node inside its [`GameTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A property identifier with its values, such as `AB[dd][pp]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub ident: String,
    pub values: Vec<String>,
}

/// One node of the game tree: an ordered property list plus its links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    properties: Vec<Property>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// A node holding a single move.
    pub fn with_move(color: Color, pos: &str) -> Self {
        let mut node = Self::new();
        node.set(color.sgf_property(), pos);
        node
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has(&self, ident: &str) -> bool {
        self.property(ident).is_some()
    }

    /// First value of a property.
    pub fn get(&self, ident: &str) -> Option<&str> {
        self.property(ident)
            .and_then(|p| p.values.first())
            .map(String::as_str)
    }

    /// All values of a property, empty when absent.
    pub fn values(&self, ident: &str) -> &[String] {
        self.property(ident)
            .map(|p| p.values.as_slice())
            .unwrap_or(&[])
    }

    /// Replaces a property with a single value.
    pub fn set(&mut self, ident: &str, value: impl Into<String>) {
        let value = value.into();
        match self.property_mut(ident) {
            Some(p) => p.values = vec![value],
            None => self.properties.push(Property {
                ident: ident.to_string(),
                values: vec![value],
            }),
        }
    }

    /// Adds a value to a list property, ignoring exact duplicates.
    pub fn push_value(&mut self, ident: &str, value: impl Into<String>) {
        let value = value.into();
        match self.property_mut(ident) {
            Some(p) => {
                if !p.values.contains(&value) {
                    p.values.push(value);
                }
            }
            None => self.properties.push(Property {
                ident: ident.to_string(),
                values: vec![value],
            }),
        }
    }

    pub fn remove(&mut self, ident: &str) -> Option<Vec<String>> {
        let index = self.properties.iter().position(|p| p.ident == ident)?;
        Some(self.properties.remove(index).values)
    }

    /// Appends text to the node comment (`C`), creating it if needed.
    pub fn append_comment(&mut self, text: &str) {
        match self.property_mut("C") {
            Some(p) if !p.values.is_empty() => p.values[0].push_str(text),
            _ => self.set("C", text),
        }
    }

    /// Adds an `LB` label on an SGF point.
    pub fn add_label(&mut self, pos: &str, label: &str) {
        self.push_value("LB", format!("{}:{}", pos, label));
    }

    /// Marks an SGF point with a `TR` triangle.
    pub fn add_triangle(&mut self, pos: &str) {
        self.push_value("TR", pos);
    }

    /// The move played in this node, if any, as color and SGF value.
    pub fn game_move(&self) -> Option<(Color, &str)> {
        if let Some(pos) = self.get("B") {
            return Some((Color::Black, pos));
        }
        self.get("W").map(|pos| (Color::White, pos))
    }

    /// Adds a parsed property, merging repeated identifiers.
    pub(crate) fn push_property(&mut self, ident: String, values: Vec<String>) {
        match self.property_mut(&ident) {
            Some(p) => p.values.extend(values),
            None => self.properties.push(Property { ident, values }),
        }
    }

    fn property(&self, ident: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.ident == ident)
    }

    fn property_mut(&mut self, ident: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.ident == ident)
    }
}

/// A single game: a rooted tree of nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameTree {
    nodes: Vec<Node>,
}

impl Default for GameTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GameTree {
    /// A tree consisting of an empty root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new()],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `id` belongs to another tree and is out of range.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Replaces the root's properties, keeping its children.
    pub(crate) fn set_root_properties(&mut self, node: Node) {
        self.nodes[0].properties = node.properties;
    }

    /// Attaches `node` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// The root followed by every first child.
    pub fn main_line(&self) -> Vec<NodeId> {
        let mut line = vec![self.root()];
        let mut current = self.root();
        while let Some(&next) = self.node(current).children.first() {
            line.push(next);
            current = next;
        }
        line
    }

    /// Returns the child of `parent` playing `pos` for `color`, appending a
    /// new variation node when there is none.
    pub fn find_or_append_child(&mut self, parent: NodeId, color: Color, pos: &str) -> NodeId {
        let existing = self
            .node(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).game_move() == Some((color, pos)));
        match existing {
            Some(child) => child,
            None => self.add_child(parent, Node::with_move(color, pos)),
        }
    }
}
