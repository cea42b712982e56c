use blox_graph::{BlockEntry, GraphDocument, GraphError, SocketEntry};
use blox_schema::{validate_schema_instance, CodeTemplate, KindRegistry, GRAPH_FRAGMENT_SCHEMA_0_0_1};
use std::collections::{BTreeMap, BTreeSet};

use super::types::{GraphAddress, GraphFragment, InterpreterError};

/// Where a block hangs in a document.
enum Referrer {
    Entry(usize),
    Next(String),
    Slot { owner: String, slot: String },
    Socket { owner: String, socket: String },
}

/// Returns a new document with `fragment` substituted for the addressed region.
/// The input document is never modified; the result still has to be validated.
pub fn splice_fragment(
    registry: &KindRegistry,
    document: &GraphDocument,
    target: &GraphAddress,
    fragment: &GraphFragment,
) -> Result<GraphDocument, InterpreterError> {
    let issues = validate_schema_instance(
        GRAPH_FRAGMENT_SCHEMA_0_0_1,
        &serde_json::to_value(fragment).map_err(|err| InterpreterError::Structure(err.to_string()))?,
    );
    if !issues.is_empty() {
        return Err(GraphError::Document(issues).into());
    }
    if let Some(head) = fragment.head.as_deref() {
        if !fragment.blocks.contains_key(head) {
            return Err(InterpreterError::Structure(format!(
                "fragment head `{head}` is not one of its blocks"
            )));
        }
    }

    let mut working = document.clone();
    let (mut blocks, head) = rename_fragment(&working, fragment);

    match target {
        GraphAddress::EntryPoint { kind } => {
            let owner = working
                .entry_points
                .iter()
                .find(|id| working.blocks.get(*id).is_some_and(|entry| entry.kind == *kind))
                .cloned()
                .ok_or_else(|| InterpreterError::AddressNotFound(format!("no `{kind}` entry point")))?;
            let slot = body_slot(registry, kind)?;
            replace_slot(&mut working, &owner, &slot, head.clone());
        }
        GraphAddress::Slot { block, slot } => {
            let entry = working
                .blocks
                .get(block)
                .ok_or_else(|| InterpreterError::AddressNotFound(format!("no block `{block}`")))?;
            let kind = registry.get_kind(&entry.kind).map_err(blox_graph::GraphError::from)?;
            if !kind.has_slot(slot) {
                return Err(InterpreterError::AddressNotFound(format!(
                    "block `{block}` has no slot `{slot}`"
                )));
            }
            replace_slot(&mut working, block, slot, head.clone());
        }
        GraphAddress::Block { block } => {
            replace_block(&mut working, block, head.clone(), &mut blocks)?;
        }
    }

    for (id, entry) in blocks {
        working.blocks.insert(id, entry);
    }
    Ok(working)
}

/// Moves fragment-local ids into a namespace the document does not use.
fn rename_fragment(document: &GraphDocument, fragment: &GraphFragment) -> (BTreeMap<String, BlockEntry>, Option<String>) {
    let mut taken = document.blocks.keys().cloned().collect::<BTreeSet<_>>();
    let mut renames = BTreeMap::new();
    for local in fragment.blocks.keys() {
        let mut candidate = format!("f.{local}");
        while taken.contains(&candidate) {
            candidate.push('_');
        }
        taken.insert(candidate.clone());
        renames.insert(local.clone(), candidate);
    }

    let blocks = fragment
        .blocks
        .iter()
        .map(|(local, entry)| {
            let mut entry = entry.clone();
            entry.rename_references(|id| renames.get(id).cloned());
            (renames.get(local).cloned().unwrap_or_else(|| local.clone()), entry)
        })
        .collect();
    let head = fragment
        .head
        .as_ref()
        .map(|head| renames.get(head).cloned().unwrap_or_else(|| head.clone()));
    (blocks, head)
}

fn body_slot(registry: &KindRegistry, kind: &str) -> Result<String, InterpreterError> {
    let kind = registry.get_kind(kind).map_err(blox_graph::GraphError::from)?;
    if let CodeTemplate::Body { slot } = &kind.template {
        return Ok(slot.clone());
    }
    kind.slots
        .first()
        .cloned()
        .ok_or_else(|| InterpreterError::AddressNotFound(format!("entry point `{}` has no body", kind.id)))
}

fn replace_slot(document: &mut GraphDocument, owner: &str, slot: &str, head: Option<String>) {
    let old = document
        .blocks
        .get_mut(owner)
        .and_then(|entry| entry.slots.remove(slot));
    if let Some(old) = old {
        remove_subtree(document, &old, true);
    }
    if let (Some(head), Some(entry)) = (head, document.blocks.get_mut(owner)) {
        entry.slots.insert(slot.to_string(), head);
    }
}

fn replace_block(
    document: &mut GraphDocument,
    block: &str,
    head: Option<String>,
    fragment: &mut BTreeMap<String, BlockEntry>,
) -> Result<(), InterpreterError> {
    let Some(entry) = document.blocks.get(block) else {
        return Err(InterpreterError::AddressNotFound(format!("no block `{block}`")));
    };
    let successor = entry.next.clone();
    let referrer = find_referrer(document, block)
        .ok_or_else(|| InterpreterError::Structure(format!("block `{block}` is not attached to the program")))?;
    remove_subtree(document, block, false);

    // Statement replacements keep the displaced block's successor at the fragment tail.
    let tail = head.as_deref().map(|head| chain_tail(fragment, head));
    let (new_link, tail_successor) = match head {
        Some(head) => (Some(head), successor),
        None => (successor, None),
    };

    match referrer {
        Referrer::Entry(index) => match new_link {
            Some(id) => document.entry_points[index] = id,
            None => {
                document.entry_points.remove(index);
            }
        },
        Referrer::Next(prev) => {
            if let Some(entry) = document.blocks.get_mut(&prev) {
                entry.next = new_link;
            }
        }
        Referrer::Slot { owner, slot } => {
            if let Some(entry) = document.blocks.get_mut(&owner) {
                match new_link {
                    Some(id) => {
                        entry.slots.insert(slot, id);
                    }
                    None => {
                        entry.slots.remove(&slot);
                    }
                }
            }
        }
        Referrer::Socket { owner, socket } => {
            if let Some(entry) = document.blocks.get_mut(&owner) {
                match new_link {
                    Some(id) => {
                        entry.sockets.insert(socket, SocketEntry::Block(id));
                    }
                    None => {
                        entry.sockets.remove(&socket);
                    }
                }
            }
        }
    }

    if let (Some(tail), Some(successor)) = (tail, tail_successor) {
        if let Some(entry) = fragment.get_mut(&tail) {
            entry.next = Some(successor);
        }
    }
    Ok(())
}

fn find_referrer(document: &GraphDocument, block: &str) -> Option<Referrer> {
    if let Some(index) = document.entry_points.iter().position(|id| id == block) {
        return Some(Referrer::Entry(index));
    }
    for (owner, entry) in &document.blocks {
        if entry.next.as_deref() == Some(block) {
            return Some(Referrer::Next(owner.clone()));
        }
        if let Some((slot, _)) = entry.slots.iter().find(|(_, head)| head.as_str() == block) {
            return Some(Referrer::Slot {
                owner: owner.clone(),
                slot: slot.clone(),
            });
        }
        let socket = entry
            .sockets
            .iter()
            .find(|(_, socket)| matches!(socket, SocketEntry::Block(id) if id == block));
        if let Some((socket, _)) = socket {
            return Some(Referrer::Socket {
                owner: owner.clone(),
                socket: socket.clone(),
            });
        }
    }
    None
}

fn chain_tail(blocks: &BTreeMap<String, BlockEntry>, head: &str) -> String {
    let mut seen = BTreeSet::new();
    let mut current = head.to_string();
    while seen.insert(current.clone()) {
        match blocks.get(&current).and_then(|entry| entry.next.clone()) {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

/// Removes `root` and everything hanging below it. With `follow_root_next` the
/// root's successors go too.
fn remove_subtree(document: &mut GraphDocument, root: &str, follow_root_next: bool) {
    let mut doomed = BTreeSet::new();
    let mut stack = vec![root.to_string()];
    while let Some(id) = stack.pop() {
        if !doomed.insert(id.clone()) {
            continue;
        }
        let Some(entry) = document.blocks.get(&id) else {
            continue;
        };
        let skip_next = id == root && !follow_root_next;
        stack.extend(entry.sockets.values().filter_map(|socket| match socket {
            SocketEntry::Block(child) => Some(child.clone()),
            SocketEntry::Literal(_) => None,
        }));
        stack.extend(entry.slots.values().cloned());
        if !skip_next {
            stack.extend(entry.next.clone());
        }
    }
    for id in doomed {
        document.blocks.remove(&id);
    }
}

#[cfg(test)]
#[path = "splice_test.rs"]
mod tests;
