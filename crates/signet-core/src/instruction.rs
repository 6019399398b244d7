//! Native graph mutation instructions and per-call instruction batches.
//!
//! An [`Instruction`] is one command for the native engine. On the wire it is a
//! JSON tuple whose first element is the integer code:
//!
//! | Code | Instruction      | Tuple                               |
//! |------|------------------|-------------------------------------|
//! | 0    | `CreateNode`     | `[0, hash, kind]`                   |
//! | 1    | `DeleteNode`     | `[1, hash]`                         |
//! | 2    | `AppendChild`    | `[2, parentHash, childHash]`        |
//! | 3    | `SetProperty`    | `[3, hash, key, value]`             |
//! | 4    | `ActivateRoots`  | `[4, [hash, ...]]`                  |
//! | 5    | `CommitUpdates`  | `[5]`                               |
//!
//! An [`InstructionBatch`] collects instructions by category during one render
//! or ref update and packs them in the fixed order above, so the receiver can
//! apply each category in bulk and commit is always last.

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

use crate::node::NodeHash;
use crate::props::PropValue;

/// A single native graph mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Create a native node of the given kind.
    CreateNode {
        /// Hash of the new node.
        hash: NodeHash,
        /// Opcode name.
        kind: String,
    },
    /// Delete a native node.
    DeleteNode {
        /// Hash of the node to delete.
        hash: NodeHash,
    },
    /// Append `child` to `parent`'s input list.
    AppendChild {
        /// Hash of the parent node.
        parent: NodeHash,
        /// Hash of the child node.
        child: NodeHash,
    },
    /// Write one property value.
    SetProperty {
        /// Hash of the target node.
        hash: NodeHash,
        /// Property name.
        key: String,
        /// New value.
        value: PropValue,
    },
    /// Replace the set of active output roots, in channel order.
    ActivateRoots {
        /// Root hashes, one per output channel.
        roots: Vec<NodeHash>,
    },
    /// Marks the end of a batch; the native side may apply it atomically.
    CommitUpdates,
}

impl Instruction {
    /// Integer code identifying this instruction on the wire.
    pub fn code(&self) -> u8 {
        match self {
            Self::CreateNode { .. } => 0,
            Self::DeleteNode { .. } => 1,
            Self::AppendChild { .. } => 2,
            Self::SetProperty { .. } => 3,
            Self::ActivateRoots { .. } => 4,
            Self::CommitUpdates => 5,
        }
    }
}

impl Serialize for Instruction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = match self {
            Self::CreateNode { .. } | Self::AppendChild { .. } => 3,
            Self::DeleteNode { .. } | Self::ActivateRoots { .. } => 2,
            Self::SetProperty { .. } => 4,
            Self::CommitUpdates => 1,
        };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.code())?;
        match self {
            Self::CreateNode { hash, kind } => {
                seq.serialize_element(hash)?;
                seq.serialize_element(kind)?;
            }
            Self::DeleteNode { hash } => seq.serialize_element(hash)?,
            Self::AppendChild { parent, child } => {
                seq.serialize_element(parent)?;
                seq.serialize_element(child)?;
            }
            Self::SetProperty { hash, key, value } => {
                seq.serialize_element(hash)?;
                seq.serialize_element(key)?;
                seq.serialize_element(value)?;
            }
            Self::ActivateRoots { roots } => seq.serialize_element(roots)?,
            Self::CommitUpdates => {}
        }
        seq.end()
    }
}

/// Instructions recorded during one call, grouped by category.
#[derive(Debug, Default, Clone)]
pub struct InstructionBatch {
    create_node: Vec<Instruction>,
    delete_node: Vec<Instruction>,
    append_child: Vec<Instruction>,
    set_property: Vec<Instruction>,
    activate_roots: Vec<Instruction>,
    commit_updates: Vec<Instruction>,
}

impl InstructionBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an instruction in its category.
    pub fn push(&mut self, instruction: Instruction) {
        let bucket = match instruction {
            Instruction::CreateNode { .. } => &mut self.create_node,
            Instruction::DeleteNode { .. } => &mut self.delete_node,
            Instruction::AppendChild { .. } => &mut self.append_child,
            Instruction::SetProperty { .. } => &mut self.set_property,
            Instruction::ActivateRoots { .. } => &mut self.activate_roots,
            Instruction::CommitUpdates => &mut self.commit_updates,
        };
        bucket.push(instruction);
    }

    /// Total number of recorded instructions.
    pub fn len(&self) -> usize {
        self.buckets().map(Vec::len).sum()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all recorded instructions.
    pub fn clear(&mut self) {
        self.create_node.clear();
        self.delete_node.clear();
        self.append_child.clear();
        self.set_property.clear();
        self.activate_roots.clear();
        self.commit_updates.clear();
    }

    /// Concatenates the categories in wire order: create, delete, append,
    /// set-property, activate-roots, commit.
    pub fn pack(&self) -> Vec<Instruction> {
        let mut packed = Vec::with_capacity(self.len());
        for bucket in self.buckets() {
            packed.extend(bucket.iter().cloned());
        }
        packed
    }

    fn buckets(&self) -> impl Iterator<Item = &Vec<Instruction>> {
        [
            &self.create_node,
            &self.delete_node,
            &self.append_child,
            &self.set_property,
            &self.activate_roots,
            &self.commit_updates,
        ]
        .into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(v: u32) -> NodeHash {
        NodeHash::from_raw(v)
    }

    #[test]
    fn wire_format_is_code_prefixed_tuple() {
        let cases = [
            (
                Instruction::CreateNode {
                    hash: h(7),
                    kind: "sin".into(),
                },
                r#"[0,7,"sin"]"#,
            ),
            (Instruction::DeleteNode { hash: h(7) }, "[1,7]"),
            (
                Instruction::AppendChild {
                    parent: h(1),
                    child: h(2),
                },
                "[2,1,2]",
            ),
            (
                Instruction::SetProperty {
                    hash: h(3),
                    key: "value".into(),
                    value: PropValue::Number(440.0),
                },
                r#"[3,3,"value",440]"#,
            ),
            (
                Instruction::ActivateRoots {
                    roots: vec![h(4), h(5)],
                },
                "[4,[4,5]]",
            ),
            (Instruction::CommitUpdates, "[5]"),
        ];
        for (instruction, expected) in cases {
            assert_eq!(serde_json::to_string(&instruction).unwrap(), expected);
        }
    }

    #[test]
    fn pack_orders_by_category_not_emission() {
        let mut batch = InstructionBatch::new();
        batch.push(Instruction::CommitUpdates);
        batch.push(Instruction::SetProperty {
            hash: h(1),
            key: "k".into(),
            value: PropValue::Bool(true),
        });
        batch.push(Instruction::AppendChild {
            parent: h(1),
            child: h(2),
        });
        batch.push(Instruction::CreateNode {
            hash: h(1),
            kind: "a".into(),
        });
        batch.push(Instruction::DeleteNode { hash: h(9) });
        batch.push(Instruction::ActivateRoots { roots: vec![h(1)] });

        let codes: Vec<u8> = batch.pack().iter().map(Instruction::code).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(batch.len(), 6);

        batch.clear();
        assert!(batch.is_empty());
        assert!(batch.pack().is_empty());
    }
}
