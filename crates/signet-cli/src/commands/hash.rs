//! Print structural hashes of a graph document.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::Args;
use signet_core::{Node, NodeHash, root_node};

use super::common::read_graphs;

/// Print the root hash of every channel in a graph document.
#[derive(Args)]
pub struct HashArgs {
    /// Graph document (JSON)
    pub file: PathBuf,

    /// Print every node, marking sub-graphs already printed as shared
    #[arg(long)]
    pub tree: bool,
}

/// Run the hash command.
pub fn run(args: HashArgs) -> anyhow::Result<()> {
    let graphs = read_graphs(&args.file)?;
    let mut printed = HashSet::new();

    for (channel, graph) in graphs.into_iter().enumerate() {
        let root = root_node(channel, graph);
        println!("channel {channel}: {}", root.hash());
        if args.tree {
            print_tree(&root, &mut printed);
        }
    }
    Ok(())
}

fn print_tree(root: &Node, printed: &mut HashSet<NodeHash>) {
    let mut stack = vec![(root.clone(), 1usize)];
    while let Some((node, depth)) = stack.pop() {
        let indent = "  ".repeat(depth);
        if !printed.insert(node.hash()) {
            println!("{indent}{} {} (shared)", node.kind(), node.hash());
            continue;
        }
        if node.props().is_empty() {
            println!("{indent}{} {}", node.kind(), node.hash());
        } else {
            let props = signet_core::canonical_json(node.props());
            println!("{indent}{} {} {props}", node.kind(), node.hash());
        }
        stack.extend(node.children().iter().rev().map(|c| (c.clone(), depth + 1)));
    }
}
