//! Nodes and the id counter inside a store transaction.

use crate::error::NiwaError;
use crate::store::{keys, Txn};
use crate::tree::node::{validate_node_id, Node};
use crate::tree::Tree;

const NEXT_INDEX: &str = "next_index";

pub fn get_node(txn: &mut Txn<'_>, node_id: &str) -> Result<Node, NiwaError> {
    validate_node_id(node_id)?;
    txn.get_record(&keys::node(node_id))?
        .ok_or_else(|| NiwaError::NodeNotFound(node_id.to_string()))
}

pub fn put_node(txn: &mut Txn<'_>, node: &Node) -> Result<(), NiwaError> {
    txn.put_record(keys::node(&node.id), node)?;
    Ok(())
}

pub fn all_nodes(txn: &mut Txn<'_>) -> Result<Vec<Node>, NiwaError> {
    Ok(txn.scan_records(&keys::all_nodes())?)
}

/// The stored document, or `None` if nothing has been loaded.
pub fn load_tree(txn: &mut Txn<'_>) -> Result<Option<Tree>, NiwaError> {
    let nodes = all_nodes(txn)?;
    if nodes.is_empty() {
        return Ok(None);
    }
    Tree::from_nodes(nodes).map(Some)
}

pub fn next_index(txn: &mut Txn<'_>) -> Result<u64, NiwaError> {
    Ok(txn.get_record(&keys::meta(NEXT_INDEX))?.unwrap_or(0))
}

pub fn set_next_index(txn: &mut Txn<'_>, value: u64) -> Result<(), NiwaError> {
    txn.put_record(keys::meta(NEXT_INDEX), &value)?;
    Ok(())
}

/// Take one id index from the counter.
pub fn allocate_index(txn: &mut Txn<'_>) -> Result<u64, NiwaError> {
    let index = next_index(txn)?;
    set_next_index(txn, index + 1)?;
    Ok(index)
}
