use blox_schema::{BlockKind, KindRegistry, Literal};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::error::GraphError;

/// Opaque arena handle. Only meaningful for the graph that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketBinding {
    Empty,
    Literal(Literal),
    Block(BlockId),
}

/// Where `connect_statement` splices a chain in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    After(BlockId),
    Slot { owner: BlockId, slot: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentLink {
    /// This block is the `next` of the given block.
    Chain(BlockId),
    Slot { owner: BlockId, slot: String },
    Socket { owner: BlockId, socket: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockInstance {
    kind: String,
    fields: BTreeMap<String, Literal>,
    sockets: Vec<(String, SocketBinding)>,
    slots: Vec<(String, Option<BlockId>)>,
    next: Option<BlockId>,
    parent: Option<ParentLink>,
}

impl BlockInstance {
    pub(crate) fn from_kind(kind: &BlockKind, fields: BTreeMap<String, Literal>) -> Self {
        Self {
            kind: kind.id.clone(),
            fields,
            sockets: kind
                .sockets
                .iter()
                .map(|socket| (socket.name.clone(), SocketBinding::Empty))
                .collect(),
            slots: kind.slots.iter().map(|slot| (slot.clone(), None)).collect(),
            next: None,
            parent: None,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn field(&self, name: &str) -> Option<&Literal> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, Literal> {
        &self.fields
    }

    pub fn socket(&self, name: &str) -> Option<&SocketBinding> {
        self.sockets
            .iter()
            .find(|(socket, _)| socket == name)
            .map(|(_, binding)| binding)
    }

    /// Socket bindings in kind declaration order.
    pub fn sockets(&self) -> impl Iterator<Item = (&str, &SocketBinding)> {
        self.sockets.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    pub fn slot_head(&self, name: &str) -> Option<BlockId> {
        self.slots
            .iter()
            .find(|(slot, _)| slot == name)
            .and_then(|(_, head)| *head)
    }

    /// Slot chain heads in kind declaration order.
    pub fn slots(&self) -> impl Iterator<Item = (&str, Option<BlockId>)> {
        self.slots.iter().map(|(name, head)| (name.as_str(), *head))
    }

    pub fn next(&self) -> Option<BlockId> {
        self.next
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    pub(crate) fn set_socket(&mut self, name: &str, binding: SocketBinding) -> Option<SocketBinding> {
        self.sockets
            .iter_mut()
            .find(|(socket, _)| socket == name)
            .map(|(_, slot)| std::mem::replace(slot, binding))
    }

    pub(crate) fn slot_entry(&mut self, name: &str) -> Option<&mut Option<BlockId>> {
        self.slots
            .iter_mut()
            .find(|(slot, _)| slot == name)
            .map(|(_, head)| head)
    }

    pub(crate) fn set_next(&mut self, next: Option<BlockId>) {
        self.next = next;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ParentLink>) {
        self.parent = parent;
    }
}

/// Arena-backed program: block instances plus the ordered top-level entry points.
/// Every edge is set through a checked operation, so the graph stays acyclic and
/// each block has at most one parent.
#[derive(Debug, Clone)]
pub struct ProgramGraph {
    registry: Arc<KindRegistry>,
    blocks: BTreeMap<BlockId, BlockInstance>,
    entry_points: Vec<BlockId>,
    next_id: u32,
}

impl ProgramGraph {
    pub fn new(registry: Arc<KindRegistry>) -> Self {
        Self {
            registry,
            blocks: BTreeMap::new(),
            entry_points: Vec::new(),
            next_id: 1,
        }
    }

    pub fn registry(&self) -> &Arc<KindRegistry> {
        &self.registry
    }

    pub fn entry_points(&self) -> &[BlockId] {
        &self.entry_points
    }

    pub fn block(&self, id: BlockId) -> Option<&BlockInstance> {
        self.blocks.get(&id)
    }

    /// Number of instances in the arena, including detached ones.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn kind_of(&self, id: BlockId) -> Result<&BlockKind, GraphError> {
        let block = self.instance(id)?;
        Ok(self.registry.get_kind(&block.kind)?)
    }

    pub fn create_instance(
        &mut self,
        kind_id: &str,
        fields: BTreeMap<String, Literal>,
    ) -> Result<BlockId, GraphError> {
        let registry = Arc::clone(&self.registry);
        let kind = registry.get_kind(kind_id)?;
        let values = resolve_fields(kind, fields)?;

        let id = self.allocate();
        self.blocks.insert(id, BlockInstance::from_kind(kind, values));
        if kind.is_entry_point() {
            self.entry_points.push(id);
        }
        Ok(id)
    }

    pub fn set_field(&mut self, id: BlockId, name: &str, value: Literal) -> Result<(), GraphError> {
        let registry = Arc::clone(&self.registry);
        let kind = registry.get_kind(&self.instance(id)?.kind)?;
        let spec = kind
            .field(name)
            .ok_or_else(|| GraphError::Structure(format!("kind `{}` has no field `{name}`", kind.id)))?;
        spec.field_type
            .check(&value)
            .map_err(|expected| GraphError::TypeMismatch {
                location: format!("field `{name}` of {id}"),
                expected,
                found: describe_literal(&value),
            })?;
        self.instance_mut(id)?.fields.insert(name.to_string(), value);
        Ok(())
    }

    /// Splices the detached chain starting at `child` into `attachment`. Whatever
    /// followed the attachment point moves to the end of the spliced chain.
    pub fn connect_statement(&mut self, attachment: Attachment, child: BlockId) -> Result<(), GraphError> {
        let child_kind = self.kind_of(child)?;
        if !child_kind.is_statement() {
            return Err(GraphError::Structure(format!(
                "`{}` is not a chainable statement",
                child_kind.id
            )));
        }
        if self.instance(child)?.parent.is_some() {
            return Err(GraphError::Structure(format!(
                "block {child} is already attached; disconnect it first"
            )));
        }

        let anchor = match &attachment {
            Attachment::After(previous) => {
                let kind = self.kind_of(*previous)?;
                if !kind.is_statement() {
                    return Err(GraphError::Structure(format!(
                        "`{}` has no next connection",
                        kind.id
                    )));
                }
                *previous
            }
            Attachment::Slot { owner, slot } => {
                let kind = self.kind_of(*owner)?;
                if !kind.has_slot(slot) {
                    return Err(GraphError::Structure(format!(
                        "`{}` has no slot `{slot}`",
                        kind.id
                    )));
                }
                *owner
            }
        };
        if self.is_within(anchor, child) {
            return Err(GraphError::Structure(format!(
                "attaching {child} under {anchor} would create a cycle"
            )));
        }

        let tail = self.chain_tail(child);
        let (displaced, parent) = match attachment {
            Attachment::After(previous) => {
                let block = self.instance_mut(previous)?;
                let displaced = block.next.replace(child);
                (displaced, ParentLink::Chain(previous))
            }
            Attachment::Slot { owner, slot } => {
                let head = self
                    .instance_mut(owner)?
                    .slot_entry(&slot)
                    .ok_or_else(|| GraphError::Structure(format!("missing slot `{slot}`")))?;
                let displaced = head.replace(child);
                (displaced, ParentLink::Slot { owner, slot })
            }
        };
        self.instance_mut(child)?.parent = Some(parent);
        if let Some(displaced) = displaced {
            self.instance_mut(tail)?.next = Some(displaced);
            self.instance_mut(displaced)?.parent = Some(ParentLink::Chain(tail));
        }
        Ok(())
    }

    /// Unplugs a single statement; its predecessor (or slot) is re-linked to its
    /// successor. The block keeps its own slots and sockets. Detached blocks are a no-op.
    pub fn disconnect_statement(&mut self, block: BlockId) -> Result<(), GraphError> {
        let kind = self.kind_of(block)?;
        if !kind.is_statement() {
            return Err(GraphError::Structure(format!(
                "`{}` is not a chainable statement",
                kind.id
            )));
        }

        let instance = self.instance_mut(block)?;
        let Some(parent) = instance.parent.take() else {
            return Ok(());
        };
        let successor = instance.next.take();

        match &parent {
            ParentLink::Chain(previous) => self.instance_mut(*previous)?.next = successor,
            ParentLink::Slot { owner, slot } => {
                let head = self
                    .instance_mut(*owner)?
                    .slot_entry(slot)
                    .ok_or_else(|| GraphError::Structure(format!("missing slot `{slot}`")))?;
                *head = successor;
            }
            ParentLink::Socket { .. } => {
                return Err(GraphError::Structure(format!("statement {block} is bound to a socket")));
            }
        }
        if let Some(successor) = successor {
            self.instance_mut(successor)?.parent = Some(parent);
        }
        Ok(())
    }

    /// Binds `socket` on `owner`. A previously bound block is detached, not deleted.
    pub fn bind_socket(&mut self, owner: BlockId, socket: &str, value: SocketBinding) -> Result<(), GraphError> {
        let registry = Arc::clone(&self.registry);
        let owner_kind = registry.get_kind(&self.instance(owner)?.kind)?;
        let spec = owner_kind
            .socket(socket)
            .ok_or_else(|| GraphError::Structure(format!("`{}` has no socket `{socket}`", owner_kind.id)))?;
        let location = format!("socket `{socket}` of {owner}");

        match &value {
            SocketBinding::Empty => {}
            SocketBinding::Literal(literal) => {
                if !literal.is_finite() || !spec.value_type.accepts_literal(literal) {
                    return Err(GraphError::TypeMismatch {
                        location,
                        expected: spec.value_type.to_string(),
                        found: describe_literal(literal),
                    });
                }
            }
            SocketBinding::Block(child) => {
                let child_kind = self.kind_of(*child)?;
                let Some(output) = child_kind.output_type() else {
                    return Err(GraphError::Structure(format!(
                        "`{}` does not produce a value",
                        child_kind.id
                    )));
                };
                if !spec.value_type.accepts(output) {
                    return Err(GraphError::TypeMismatch {
                        location,
                        expected: spec.value_type.to_string(),
                        found: output.to_string(),
                    });
                }
                if self.is_within(owner, *child) {
                    return Err(GraphError::Structure(format!(
                        "binding {child} into {owner} would create a cycle"
                    )));
                }
                if self.instance(*child)?.parent.is_some() {
                    return Err(GraphError::Structure(format!("block {child} is already bound")));
                }
            }
        }

        let previous = self
            .instance_mut(owner)?
            .set_socket(socket, value.clone())
            .ok_or_else(|| GraphError::Structure(format!("missing socket `{socket}`")))?;
        if let SocketBinding::Block(previous) = previous {
            self.instance_mut(previous)?.parent = None;
        }
        if let SocketBinding::Block(child) = value {
            self.instance_mut(child)?.parent = Some(ParentLink::Socket {
                owner,
                socket: socket.to_string(),
            });
        }
        Ok(())
    }

    /// Drops a top-level instance together with everything under it.
    pub fn remove_entry_point(&mut self, block: BlockId) -> Result<(), GraphError> {
        let Some(position) = self.entry_points.iter().position(|id| *id == block) else {
            return Err(GraphError::Structure(format!("block {block} is not an entry point")));
        };
        self.entry_points.remove(position);
        let mut doomed = Vec::new();
        self.walk(block, &mut BTreeSet::new(), &mut doomed);
        for id in doomed {
            self.blocks.remove(&id);
        }
        Ok(())
    }

    /// Every reachable block in deterministic pre-order: entry points in
    /// declaration order; each block, then its sockets, then its slots, then its successor.
    pub fn all_blocks(&self) -> Vec<BlockId> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for entry in &self.entry_points {
            self.walk(*entry, &mut seen, &mut out);
        }
        out
    }

    fn walk(&self, head: BlockId, seen: &mut BTreeSet<BlockId>, out: &mut Vec<BlockId>) {
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            let Some(block) = self.blocks.get(&id) else {
                return;
            };
            if !seen.insert(id) {
                return;
            }
            out.push(id);
            for (_, binding) in &block.sockets {
                if let SocketBinding::Block(child) = binding {
                    self.walk(*child, seen, out);
                }
            }
            for (_, slot_head) in &block.slots {
                if let Some(slot_head) = slot_head {
                    self.walk(*slot_head, seen, out);
                }
            }
            cursor = block.next;
        }
    }

    /// Whether `target` is `root` or sits anywhere below it.
    fn is_within(&self, target: BlockId, root: BlockId) -> bool {
        let mut cursor = Some(target);
        let mut steps = 0;
        while let Some(id) = cursor {
            if id == root {
                return true;
            }
            steps += 1;
            if steps > self.blocks.len() {
                return false;
            }
            cursor = self.blocks.get(&id).and_then(|block| match &block.parent {
                Some(ParentLink::Chain(owner))
                | Some(ParentLink::Slot { owner, .. })
                | Some(ParentLink::Socket { owner, .. }) => Some(*owner),
                None => None,
            });
        }
        false
    }

    fn chain_tail(&self, head: BlockId) -> BlockId {
        let mut tail = head;
        while let Some(next) = self.blocks.get(&tail).and_then(|block| block.next) {
            tail = next;
        }
        tail
    }

    fn allocate(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert_raw(&mut self, instance: BlockInstance) -> BlockId {
        let id = self.allocate();
        self.blocks.insert(id, instance);
        id
    }

    pub(crate) fn push_entry_point(&mut self, id: BlockId) {
        self.entry_points.push(id);
    }

    fn instance(&self, id: BlockId) -> Result<&BlockInstance, GraphError> {
        self.blocks
            .get(&id)
            .ok_or_else(|| GraphError::Structure(format!("no block {id} in graph")))
    }

    pub(crate) fn instance_mut(&mut self, id: BlockId) -> Result<&mut BlockInstance, GraphError> {
        self.blocks
            .get_mut(&id)
            .ok_or_else(|| GraphError::Structure(format!("no block {id} in graph")))
    }
}

/// Declared defaults overlaid with the supplied values.
pub(crate) fn resolve_fields(
    kind: &BlockKind,
    supplied: BTreeMap<String, Literal>,
) -> Result<BTreeMap<String, Literal>, GraphError> {
    let mut values = kind
        .fields
        .iter()
        .map(|spec| (spec.name.clone(), spec.field_type.default_literal()))
        .collect::<BTreeMap<_, _>>();
    for (name, value) in supplied {
        let spec = kind
            .field(&name)
            .ok_or_else(|| GraphError::Structure(format!("kind `{}` has no field `{name}`", kind.id)))?;
        spec.field_type
            .check(&value)
            .map_err(|expected| GraphError::TypeMismatch {
                location: format!("field `{name}` of `{}`", kind.id),
                expected,
                found: describe_literal(&value),
            })?;
        values.insert(name, value);
    }
    Ok(values)
}

pub(crate) fn describe_literal(literal: &Literal) -> String {
    match literal {
        Literal::Boolean(value) => format!("boolean {value}"),
        Literal::Number(value) => format!("number {value}"),
        Literal::Text(value) => format!("string {value:?}"),
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
