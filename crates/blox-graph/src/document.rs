use blox_core::{FieldPath, StructuredIssue};
use blox_schema::{
    validate_schema_instance, BlockKind, KindRegistry, Literal, GRAPH_DOCUMENT_SCHEMA_0_0_1,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::GraphError;
use crate::model::{describe_literal, resolve_fields, BlockId, BlockInstance, ParentLink, ProgramGraph, SocketBinding};

/// Persisted form of a program graph: blocks keyed by document-local ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub entry_points: Vec<String>,
    pub blocks: BTreeMap<String, BlockEntry>,
}

fn default_schema() -> String {
    GRAPH_DOCUMENT_SCHEMA_0_0_1.to_string()
}

impl Default for GraphDocument {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            entry_points: Vec::new(),
            blocks: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockEntry {
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slots: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sockets: BTreeMap<String, SocketEntry>,
}

impl BlockEntry {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: BTreeMap::new(),
            next: None,
            slots: BTreeMap::new(),
            sockets: BTreeMap::new(),
        }
    }

    /// Ids this entry points at: socket blocks, slot heads, then `next`.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.sockets
            .values()
            .filter_map(|socket| match socket {
                SocketEntry::Block(id) => Some(id.as_str()),
                SocketEntry::Literal(_) => None,
            })
            .chain(self.slots.values().map(String::as_str))
            .chain(self.next.as_deref())
    }

    /// Rewrites every reference through `rename`; ids it returns `None` for are kept.
    pub fn rename_references(&mut self, rename: impl Fn(&str) -> Option<String>) {
        for socket in self.sockets.values_mut() {
            if let SocketEntry::Block(id) = socket {
                if let Some(renamed) = rename(id) {
                    *id = renamed;
                }
            }
        }
        for head in self.slots.values_mut() {
            if let Some(renamed) = rename(head) {
                *head = renamed;
            }
        }
        if let Some(next) = self.next.as_mut() {
            if let Some(renamed) = rename(next) {
                *next = renamed;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketEntry {
    Literal(Literal),
    Block(String),
}

impl ProgramGraph {
    /// Tree-shaped document with ids `b1`, `b2`, ... assigned in `all_blocks` order.
    pub fn serialize(&self) -> GraphDocument {
        let order = self.all_blocks();
        let ids = order
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, format!("b{}", index + 1)))
            .collect::<BTreeMap<_, _>>();
        let name = |id: &BlockId| ids.get(id).cloned().unwrap_or_default();

        let mut blocks = BTreeMap::new();
        for id in &order {
            let Some(block) = self.block(*id) else {
                continue;
            };
            let mut entry = BlockEntry::new(block.kind());
            entry.fields = block.fields().clone();
            entry.next = block.next().map(|next| name(&next));
            for (slot, head) in block.slots() {
                if let Some(head) = head {
                    entry.slots.insert(slot.to_string(), name(&head));
                }
            }
            for (socket, binding) in block.sockets() {
                match binding {
                    SocketBinding::Empty => {}
                    SocketBinding::Literal(literal) => {
                        entry
                            .sockets
                            .insert(socket.to_string(), SocketEntry::Literal(literal.clone()));
                    }
                    SocketBinding::Block(child) => {
                        entry
                            .sockets
                            .insert(socket.to_string(), SocketEntry::Block(name(child)));
                    }
                }
            }
            blocks.insert(name(id), entry);
        }

        GraphDocument {
            schema: default_schema(),
            entry_points: self.entry_points().iter().map(name).collect(),
            blocks,
        }
    }

    /// Loads a document, all or nothing.
    pub fn deserialize(registry: Arc<KindRegistry>, document: &GraphDocument) -> Result<Self, GraphError> {
        let issues = validate_document(&registry, document);
        if issues.iter().any(StructuredIssue::is_error) {
            return Err(GraphError::Document(issues));
        }

        let mut graph = ProgramGraph::new(Arc::clone(&registry));
        let mut ids = BTreeMap::new();
        for (doc_id, entry) in &document.blocks {
            let kind = registry.get_kind(&entry.kind)?;
            let fields = resolve_fields(kind, entry.fields.clone())?;
            ids.insert(doc_id.as_str(), graph.insert_raw(BlockInstance::from_kind(kind, fields)));
        }
        let resolve = |doc_id: &str| {
            ids.get(doc_id)
                .copied()
                .ok_or_else(|| GraphError::Structure(format!("dangling reference `{doc_id}`")))
        };

        for (doc_id, entry) in &document.blocks {
            let owner = resolve(doc_id)?;
            if let Some(next) = &entry.next {
                let next = resolve(next)?;
                graph.instance_mut(owner)?.set_next(Some(next));
                graph.instance_mut(next)?.set_parent(Some(ParentLink::Chain(owner)));
            }
            for (slot, head) in &entry.slots {
                let head = resolve(head)?;
                if let Some(entry_head) = graph.instance_mut(owner)?.slot_entry(slot) {
                    *entry_head = Some(head);
                }
                graph.instance_mut(head)?.set_parent(Some(ParentLink::Slot {
                    owner,
                    slot: slot.clone(),
                }));
            }
            for (socket, value) in &entry.sockets {
                let binding = match value {
                    SocketEntry::Literal(literal) => SocketBinding::Literal(literal.clone()),
                    SocketEntry::Block(child) => {
                        let child = resolve(child)?;
                        graph.instance_mut(child)?.set_parent(Some(ParentLink::Socket {
                            owner,
                            socket: socket.clone(),
                        }));
                        SocketBinding::Block(child)
                    }
                };
                graph.instance_mut(owner)?.set_socket(socket, binding);
            }
        }
        for doc_id in &document.entry_points {
            graph.push_entry_point(resolve(doc_id)?);
        }
        Ok(graph)
    }

    /// Like `deserialize`, but starts from raw JSON and checks it against the
    /// embedded document schema first.
    pub fn deserialize_value(registry: Arc<KindRegistry>, value: &Value) -> Result<Self, GraphError> {
        let issues = validate_schema_instance(GRAPH_DOCUMENT_SCHEMA_0_0_1, value);
        if !issues.is_empty() {
            return Err(GraphError::Document(issues));
        }
        let document: GraphDocument = serde_json::from_value(value.clone()).map_err(|err| {
            GraphError::Document(vec![StructuredIssue::error(
                "structure_error",
                FieldPath::root(),
                format!("graph document decode failed: {err}"),
            )
            .with_reference("graph.decode")])
        })?;
        Self::deserialize(registry, &document)
    }
}

/// Every structural, kind, and type problem in a document, sorted stably.
pub fn validate_document(registry: &KindRegistry, document: &GraphDocument) -> Vec<StructuredIssue> {
    let mut issues = Vec::new();
    let blocks_path = FieldPath::root().key("blocks");

    if document.schema != GRAPH_DOCUMENT_SCHEMA_0_0_1 {
        issues.push(
            StructuredIssue::error(
                "structure_error",
                FieldPath::root().key("schema"),
                format!("unsupported graph schema `{}`", document.schema),
            )
            .with_reference("graph.schema"),
        );
    }

    let kinds = document
        .blocks
        .iter()
        .filter_map(|(id, entry)| registry.get_kind(&entry.kind).ok().map(|kind| (id.as_str(), kind)))
        .collect::<BTreeMap<_, _>>();
    let mut referrers: BTreeMap<&str, Vec<FieldPath>> = BTreeMap::new();

    for (id, entry) in &document.blocks {
        let path = blocks_path.key(id);
        let Some(kind) = kinds.get(id.as_str()) else {
            issues.push(
                StructuredIssue::error("unknown_kind", path.key("kind"), format!("unknown block kind `{}`", entry.kind))
                    .with_block(id.as_str())
                    .with_reference("graph.kind.unknown"),
            );
            continue;
        };
        check_entry(id, entry, kind, &kinds, document, &path, &mut issues);

        for reference in entry.references() {
            referrers.entry(reference).or_default().push(path.clone());
        }
    }

    for (index, id) in document.entry_points.iter().enumerate() {
        let path = FieldPath::root().key("entry_points").index(index);
        if !document.blocks.contains_key(id) {
            issues.push(structure(path, format!("entry point `{id}` does not exist"), "graph.entry.dangling"));
            continue;
        }
        if let Some(kind) = kinds.get(id.as_str()) {
            if !kind.is_entry_point() {
                issues.push(
                    structure(path, format!("`{}` cannot be a top-level block", kind.id), "graph.entry.kind")
                        .with_block(id.as_str()),
                );
            }
        }
        referrers.entry(id.as_str()).or_default().push(FieldPath::root().key("entry_points"));
    }
    for (id, kind) in &kinds {
        if kind.is_entry_point() && !document.entry_points.iter().any(|entry| entry == id) {
            issues.push(
                structure(
                    blocks_path.key(*id),
                    "entry-point block is not listed in entry_points".to_string(),
                    "graph.entry.unlisted",
                )
                .with_block(*id),
            );
        }
    }

    for (id, paths) in &referrers {
        if paths.len() > 1 {
            issues.push(
                structure(
                    blocks_path.key(*id),
                    format!("block `{id}` has {} parents", paths.len()),
                    "graph.reference.duplicate",
                )
                .with_block(*id),
            );
        }
    }

    if !issues.iter().any(StructuredIssue::is_error) {
        check_reachability(document, &blocks_path, &mut issues);
    }

    StructuredIssue::sort_stable(&mut issues);
    issues
}

fn check_entry(
    id: &str,
    entry: &BlockEntry,
    kind: &BlockKind,
    kinds: &BTreeMap<&str, &BlockKind>,
    document: &GraphDocument,
    path: &FieldPath,
    issues: &mut Vec<StructuredIssue>,
) {
    for (name, value) in &entry.fields {
        let field_path = path.key("fields").key(name);
        match kind.field(name) {
            None => issues.push(
                structure(field_path, format!("`{}` has no field `{name}`", kind.id), "graph.field.undeclared")
                    .with_block(id),
            ),
            Some(spec) => {
                if let Err(expected) = spec.field_type.check(value) {
                    issues.push(
                        StructuredIssue::error(
                            "type_mismatch",
                            field_path,
                            format!("expected {expected}, found {}", describe_literal(value)),
                        )
                        .with_block(id)
                        .with_reference("graph.field.type"),
                    );
                }
            }
        }
    }

    if let Some(next) = &entry.next {
        let next_path = path.key("next");
        if !kind.is_statement() {
            issues.push(
                structure(next_path.clone(), format!("`{}` has no next connection", kind.id), "graph.next.shape")
                    .with_block(id),
            );
        }
        check_statement_target(id, next, kinds, document, next_path, issues);
    }

    for (slot, head) in &entry.slots {
        let slot_path = path.key("slots").key(slot);
        if !kind.has_slot(slot) {
            issues.push(
                structure(slot_path, format!("`{}` has no slot `{slot}`", kind.id), "graph.slot.undeclared")
                    .with_block(id),
            );
            continue;
        }
        check_statement_target(id, head, kinds, document, slot_path, issues);
    }

    for (socket, value) in &entry.sockets {
        let socket_path = path.key("sockets").key(socket);
        let Some(spec) = kind.socket(socket) else {
            issues.push(
                structure(socket_path, format!("`{}` has no socket `{socket}`", kind.id), "graph.socket.undeclared")
                    .with_block(id),
            );
            continue;
        };
        match value {
            SocketEntry::Literal(literal) => {
                if !literal.is_finite() || !spec.value_type.accepts_literal(literal) {
                    issues.push(
                        StructuredIssue::error(
                            "type_mismatch",
                            socket_path,
                            format!("expected {}, found {}", spec.value_type, describe_literal(literal)),
                        )
                        .with_block(id)
                        .with_reference("graph.socket.type"),
                    );
                }
            }
            SocketEntry::Block(child) => {
                if !document.blocks.contains_key(child) {
                    issues.push(
                        structure(socket_path, format!("dangling reference `{child}`"), "graph.reference.dangling")
                            .with_block(id),
                    );
                    continue;
                }
                let Some(child_kind) = kinds.get(child.as_str()) else {
                    continue;
                };
                match child_kind.output_type() {
                    None => issues.push(
                        structure(
                            socket_path,
                            format!("`{}` does not produce a value", child_kind.id),
                            "graph.socket.shape",
                        )
                        .with_block(id),
                    ),
                    Some(output) if !spec.value_type.accepts(output) => issues.push(
                        StructuredIssue::error(
                            "type_mismatch",
                            socket_path,
                            format!("expected {}, found {output}", spec.value_type),
                        )
                        .with_block(id)
                        .with_reference("graph.socket.type"),
                    ),
                    Some(_) => {}
                }
            }
        }
    }
}

fn check_statement_target(
    id: &str,
    target: &str,
    kinds: &BTreeMap<&str, &BlockKind>,
    document: &GraphDocument,
    path: FieldPath,
    issues: &mut Vec<StructuredIssue>,
) {
    if !document.blocks.contains_key(target) {
        issues.push(structure(path, format!("dangling reference `{target}`"), "graph.reference.dangling").with_block(id));
        return;
    }
    if let Some(target_kind) = kinds.get(target) {
        if !target_kind.is_statement() {
            issues.push(
                structure(
                    path,
                    format!("`{}` cannot be chained as a statement", target_kind.id),
                    "graph.chain.shape",
                )
                .with_block(id),
            );
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Reports blocks not reachable from an entry point; unreachable blocks that
/// close a loop are reported as a cycle.
fn check_reachability(document: &GraphDocument, blocks_path: &FieldPath, issues: &mut Vec<StructuredIssue>) {
    let mut reached = BTreeSet::new();
    let mut stack = document.entry_points.iter().map(String::as_str).collect::<Vec<_>>();
    while let Some(id) = stack.pop() {
        if !reached.insert(id) {
            continue;
        }
        if let Some(entry) = document.blocks.get(id) {
            stack.extend(entry.references());
        }
    }

    let mut state = BTreeMap::<&str, Visit>::new();
    let mut in_cycle = BTreeSet::new();
    for id in document.blocks.keys() {
        if reached.contains(id.as_str()) || state.contains_key(id.as_str()) {
            continue;
        }
        let mut path = Vec::new();
        if let Some(cycle) = dfs_cycle(document, id, &mut state, &mut path) {
            let cycle_text = cycle.join(" -> ");
            for member in &cycle[..cycle.len().saturating_sub(1)] {
                if in_cycle.insert(member.to_string()) {
                    issues.push(
                        structure(
                            blocks_path.key(member),
                            format!("reference cycle detected: {cycle_text}"),
                            "graph.cycle",
                        )
                        .with_block(member.as_str()),
                    );
                }
            }
        }
    }

    for id in document.blocks.keys() {
        if !reached.contains(id.as_str()) && !in_cycle.contains(id) {
            issues.push(
                structure(
                    blocks_path.key(id),
                    format!("block `{id}` is not reachable from any entry point"),
                    "graph.unreachable",
                )
                .with_block(id.as_str()),
            );
        }
    }
}

fn dfs_cycle<'a>(
    document: &'a GraphDocument,
    id: &'a str,
    state: &mut BTreeMap<&'a str, Visit>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    match state.get(id) {
        Some(Visit::Done) => return None,
        Some(Visit::InProgress) => {
            let start = path.iter().position(|member| *member == id).unwrap_or(0);
            let mut cycle = path[start..].iter().map(|member| member.to_string()).collect::<Vec<_>>();
            cycle.push(id.to_string());
            return Some(cycle);
        }
        None => {}
    }
    state.insert(id, Visit::InProgress);
    path.push(id);
    if let Some(entry) = document.blocks.get(id) {
        for reference in entry.references() {
            if let Some(cycle) = dfs_cycle(document, reference, state, path) {
                return Some(cycle);
            }
        }
    }
    path.pop();
    state.insert(id, Visit::Done);
    None
}

fn structure(path: FieldPath, message: String, reference: &str) -> StructuredIssue {
    StructuredIssue::error("structure_error", path, message).with_reference(reference)
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
