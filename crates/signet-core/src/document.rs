//! JSON graph documents.
//!
//! Hosts that do not build graphs in Rust can describe them as JSON:
//!
//! ```json
//! [
//!   { "kind": "mul", "children": [0.5, { "kind": "in", "props": { "channel": 0 } }] },
//!   { "kind": "mul", "children": [0.5, { "kind": "in", "props": { "channel": 1 } }] }
//! ]
//! ```
//!
//! A top-level array lists one graph per output channel; a single object or
//! number is one channel. Children follow the operand rule: numbers become
//! `const` nodes, objects are decoded as nodes, and anything else is an
//! [`InvalidOperand`](GraphError::InvalidOperand) naming the parent kind and the
//! child position.

use serde::Deserialize;
use serde_json::Value;

use crate::error::GraphError;
use crate::node::Node;
use crate::props::Props;
use crate::reconciler::ROOT_KIND;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeDocument {
    kind: String,
    #[serde(default)]
    props: Props,
    #[serde(default)]
    children: Vec<Value>,
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn resolve(value: &Value, parent: &str, position: usize) -> Result<Node, GraphError> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(v) => Ok(Node::constant(v)),
            None => Err(GraphError::InvalidOperand {
                kind: parent.to_owned(),
                position,
                found: "non-finite number".to_owned(),
            }),
        },
        Value::Object(_) => node_from_value(value),
        other => Err(GraphError::InvalidOperand {
            kind: parent.to_owned(),
            position,
            found: describe(other).to_owned(),
        }),
    }
}

/// Decodes one node object.
pub fn node_from_value(value: &Value) -> Result<Node, GraphError> {
    let doc = NodeDocument::deserialize(value)?;
    if doc.kind.is_empty() {
        return Err(GraphError::EmptyKind);
    }
    let children = doc
        .children
        .iter()
        .enumerate()
        .map(|(position, child)| resolve(child, &doc.kind, position))
        .collect::<Result<Vec<_>, _>>()?;
    Node::try_new(doc.kind, doc.props, children)
}

/// Decodes a document into one graph per output channel.
pub fn graphs_from_value(value: &Value) -> Result<Vec<Node>, GraphError> {
    match value {
        Value::Array(channels) => channels
            .iter()
            .enumerate()
            .map(|(channel, graph)| resolve(graph, ROOT_KIND, channel))
            .collect(),
        single => Ok(vec![resolve(single, ROOT_KIND, 0)?]),
    }
}

/// Parses JSON text into one graph per output channel.
pub fn graphs_from_json(json: &str) -> Result<Vec<Node>, GraphError> {
    let value: Value = serde_json::from_str(json)?;
    graphs_from_value(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    #[test]
    fn decodes_nested_nodes_and_numbers() {
        let graphs = graphs_from_json(
            r#"{"kind": "mul", "children": [440, {"kind": "sr"}]}"#,
        )
        .unwrap();
        assert_eq!(graphs, vec![ops::mul(440.0, ops::sr())]);
    }

    #[test]
    fn top_level_array_is_channels() {
        let graphs = graphs_from_json(
            r#"[{"kind": "in", "props": {"channel": 0}}, {"kind": "in", "props": {"channel": 1}}, 0.5]"#,
        )
        .unwrap();
        assert_eq!(graphs, vec![ops::input(0), ops::input(1), ops::constant(0.5)]);
    }

    #[test]
    fn invalid_child_names_parent_and_position() {
        let err = graphs_from_json(r#"{"kind": "add", "children": [1, "two"]}"#).unwrap_err();
        match err {
            GraphError::InvalidOperand {
                kind,
                position,
                found,
            } => {
                assert_eq!(kind, "add");
                assert_eq!(position, 1);
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_channel_is_reported_against_root() {
        let err = graphs_from_json(r#"[1, null]"#).unwrap_err();
        assert!(matches!(
            err,
            GraphError::InvalidOperand { ref kind, position: 1, .. } if kind == "root"
        ));
    }

    #[test]
    fn empty_kind_is_rejected() {
        assert!(matches!(
            graphs_from_json(r#"{"kind": ""}"#),
            Err(GraphError::EmptyKind)
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            graphs_from_json(r#"{"kind": "sr", "child": []}"#),
            Err(GraphError::Json(_))
        ));
    }
}
