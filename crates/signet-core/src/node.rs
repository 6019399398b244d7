//! Immutable, content-addressed graph nodes.
//!
//! A [`Node`] describes one DSP operation: a `kind` (opcode name), its
//! [`Props`], and an ordered list of children. Nodes are rebuilt from scratch on
//! every declaration pass, so identity comes from a structural [`NodeHash`]
//! rather than from pointer equality: two nodes with the same kind, identity
//! basis and ordered child hashes are the same native node.
//!
//! # Hashing
//!
//! The hash is an FNV-1a style fold over 32-bit words:
//!
//! 1. Seed with the offset basis `0x811C9DC5`.
//! 2. Fold every UTF-16 code unit of `kind`, then a terminating zero.
//! 3. Fold the identity basis the same way: the `"key"` prop if it holds a
//!    string, otherwise the canonical JSON of all props.
//! 4. Fold each child hash in order.
//! 5. Mask the result to 31 bits.
//!
//! Child order is significant: reordering children changes identity.

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::props::{KEY_PROP, PropValue, Props, canonical_json};

const OFFSET_BASIS: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 16_777_619;
const HASH_MASK: u32 = 0x7FFF_FFFF;

/// Kind of the implicit node a bare number resolves to.
pub const CONST_KIND: &str = "const";

/// Structural hash of a node: a 31-bit non-negative integer.
///
/// Hash equality is the sole criterion for "same native node" across the whole
/// system. Displayed as lowercase hex, the same form hydration payloads use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHash(pub(crate) u32);

impl NodeHash {
    /// Creates a hash from a raw value, masking it to 31 bits.
    #[inline]
    pub fn from_raw(value: u32) -> Self {
        Self(value & HASH_MASK)
    }

    /// Returns the raw numeric hash.
    #[inline]
    pub fn value(self) -> u32 {
        self.0
    }

    /// Parses a hexadecimal hash as found in hydration payloads.
    pub fn from_hex(s: &str) -> Option<Self> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        u32::from_str_radix(trimmed, 16)
            .ok()
            .filter(|v| *v <= HASH_MASK)
            .map(Self)
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

#[inline]
fn mix(seed: u32, word: u32) -> u32 {
    (seed ^ word).wrapping_mul(FNV_PRIME)
}

fn mix_str(seed: u32, s: &str) -> u32 {
    let r = s.encode_utf16().fold(seed, |r, unit| mix(r, u32::from(unit)));
    mix(r, 0)
}

/// Computes the structural hash for a node description.
///
/// Pure function of its inputs; [`Node::new`] calls this with the hashes of
/// the already-built children.
pub fn hash_node(
    kind: &str,
    props: &Props,
    child_hashes: impl IntoIterator<Item = NodeHash>,
) -> NodeHash {
    let r = mix_str(OFFSET_BASIS, kind);
    let r = match props.get(KEY_PROP) {
        Some(PropValue::String(key)) => mix_str(r, key),
        _ => mix_str(r, &canonical_json(props)),
    };
    let r = child_hashes.into_iter().fold(r, |r, h| mix(r, h.0));
    NodeHash(r & HASH_MASK)
}

struct NodeData {
    hash: NodeHash,
    kind: String,
    props: Props,
    children: Vec<Node>,
}

impl Drop for NodeData {
    // Unlinks uniquely owned descendants iteratively so very deep chains do not
    // overflow the stack on drop.
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(child) = stack.pop() {
            if let Some(mut data) = Arc::into_inner(child.0) {
                stack.append(&mut data.children);
            }
        }
    }
}

/// An immutable DSP graph node with its structural hash.
///
/// Cloning is cheap: the node data is shared. Equality compares hashes only.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    /// Creates a node from a kind, props and already-resolved children.
    ///
    /// `kind` must be non-empty. This is only asserted in debug builds; use
    /// [`try_new`](Self::try_new) when the kind comes from outside the
    /// program. Use [`Operand`] (or the helpers in [`ops`](crate::ops)) when
    /// children may be bare numbers.
    pub fn new(kind: impl Into<String>, props: Props, children: Vec<Node>) -> Self {
        let kind = kind.into();
        debug_assert!(!kind.is_empty(), "node kind must not be empty");
        Self::build(kind, props, children)
    }

    /// Creates a node, rejecting an empty `kind` with [`GraphError::EmptyKind`].
    pub fn try_new(
        kind: impl Into<String>,
        props: Props,
        children: Vec<Node>,
    ) -> Result<Self, GraphError> {
        let kind = kind.into();
        if kind.is_empty() {
            return Err(GraphError::EmptyKind);
        }
        Ok(Self::build(kind, props, children))
    }

    fn build(kind: String, props: Props, children: Vec<Node>) -> Self {
        let hash = hash_node(&kind, &props, children.iter().map(Node::hash));
        Self(Arc::new(NodeData {
            hash,
            kind,
            props,
            children,
        }))
    }

    /// Creates the implicit constant node `const {value}` a bare number resolves to.
    pub fn constant(value: f64) -> Self {
        let mut props = Props::new();
        props.insert("value".to_owned(), PropValue::Number(value));
        Self::new(CONST_KIND, props, Vec::new())
    }

    /// Returns the structural hash.
    #[inline]
    pub fn hash(&self) -> NodeHash {
        self.0.hash
    }

    /// Returns the opcode name.
    #[inline]
    pub fn kind(&self) -> &str {
        &self.0.kind
    }

    /// Returns the props.
    #[inline]
    pub fn props(&self) -> &Props {
        &self.0.props
    }

    /// Returns the ordered children.
    #[inline]
    pub fn children(&self) -> &[Node] {
        &self.0.children
    }

    /// Returns the explicit identity key, if the `"key"` prop holds a string.
    pub fn key(&self) -> Option<&str> {
        self.0.props.get(KEY_PROP).and_then(PropValue::as_str)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for Node {}

impl core::hash::Hash for Node {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.0.hash.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.0.kind)
            .field("hash", &self.0.hash)
            .field("props", &self.0.props)
            .field("children", &self.0.children.len())
            .finish()
    }
}

/// A graph-building operand: a bare number or an already-built node.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Resolves to a `const {value}` node.
    Number(f64),
    /// Used as-is.
    Node(Node),
}

impl Operand {
    /// Resolves the operand into a node.
    pub fn into_node(self) -> Node {
        match self {
            Self::Number(n) => Node::constant(n),
            Self::Node(node) => node,
        }
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for Operand {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<Node> for Operand {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<&Node> for Operand {
    fn from(node: &Node) -> Self {
        Self::Node(node.clone())
    }
}

impl From<Operand> for Node {
    fn from(operand: Operand) -> Self {
        operand.into_node()
    }
}
