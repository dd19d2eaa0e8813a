//! Key layout for the logical key-spaces inside the sled tree.
//!
//! Every key is `<space byte> 0x00 <parts joined by 0x00>`. Agent ids are validated to
//! contain no control characters, so the separator never appears inside a part.

use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;

const SEP: u8 = 0;
const NODES: u8 = b'n';
const LEDGER: u8 = b'v';
const PENDING: u8 = b'p';
const CONFLICTS: u8 = b'c';
const META: u8 = b'm';
const VERSION_PAD: usize = 20;

fn key(space: u8, parts: &[&str]) -> Vec<u8> {
    let mut out = vec![space, SEP];
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(SEP);
        }
        out.extend_from_slice(part.as_bytes());
    }
    out
}

fn prefix(space: u8, parts: &[&str]) -> Vec<u8> {
    let mut out = key(space, parts);
    if !parts.is_empty() {
        out.push(SEP);
    }
    out
}

pub fn node(node_id: &str) -> Vec<u8> {
    key(NODES, &[node_id])
}

pub fn all_nodes() -> Vec<u8> {
    prefix(NODES, &[])
}

pub fn ledger(node_id: &str, version: u64) -> Vec<u8> {
    let padded = format!("{version:0width$}", width = VERSION_PAD);
    key(LEDGER, &[node_id, &padded])
}

pub fn ledger_of(node_id: &str) -> Vec<u8> {
    prefix(LEDGER, &[node_id])
}

pub fn all_ledger() -> Vec<u8> {
    prefix(LEDGER, &[])
}

pub fn pending(agent_id: &str, node_id: &str) -> Vec<u8> {
    key(PENDING, &[agent_id, node_id])
}

pub fn pending_of(agent_id: &str) -> Vec<u8> {
    prefix(PENDING, &[agent_id])
}

pub fn all_pending() -> Vec<u8> {
    prefix(PENDING, &[])
}

pub fn conflict(node_id: &str, agent_id: &str) -> Vec<u8> {
    key(CONFLICTS, &[node_id, agent_id])
}

pub fn conflicts_of(node_id: &str) -> Vec<u8> {
    prefix(CONFLICTS, &[node_id])
}

pub fn all_conflicts() -> Vec<u8> {
    prefix(CONFLICTS, &[])
}

pub fn meta(name: &str) -> Vec<u8> {
    key(META, &[name])
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(bincode::deserialize(bytes)?)
}
