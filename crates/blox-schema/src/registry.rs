use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use crate::catalog::builtin_kinds;
use crate::kind::{BlockKind, BlockShape, FieldType, SocketDefault};
use crate::template::{CodeTemplate, Operand};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown block kind `{0}`")]
    UnknownKind(String),
    #[error("invalid definition for kind `{kind}`: {reason}")]
    InvalidDefinition { kind: String, reason: String },
}

/// Catalog of block kinds, keyed by kind id. Read-mostly: build it once and
/// share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    kinds: BTreeMap<String, BlockKind>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        for kind in builtin_kinds() {
            registry.kinds.insert(kind.id.clone(), kind);
        }
        registry
    }

    /// Adds or replaces a kind. Returns the previous definition for that id.
    pub fn register_kind(&mut self, kind: BlockKind) -> Result<Option<BlockKind>, RegistryError> {
        check_definition(&kind).map_err(|reason| RegistryError::InvalidDefinition {
            kind: kind.id.clone(),
            reason,
        })?;
        Ok(self.kinds.insert(kind.id.clone(), kind))
    }

    pub fn get_kind(&self, id: &str) -> Result<&BlockKind, RegistryError> {
        self.kinds
            .get(id)
            .ok_or_else(|| RegistryError::UnknownKind(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.kinds.contains_key(id)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &BlockKind> {
        self.kinds.values()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Kind ids grouped by palette category.
    pub fn categories(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut out: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for kind in self.kinds.values() {
            out.entry(kind.category.as_str()).or_default().push(kind.id.as_str());
        }
        out
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid regex"))
}

fn check_definition(kind: &BlockKind) -> Result<(), String> {
    if kind.id.trim().is_empty() {
        return Err("id must be non-empty".to_string());
    }
    if kind.category.trim().is_empty() {
        return Err("category must be non-empty".to_string());
    }

    let mut names = BTreeSet::new();
    let declared = kind
        .sockets
        .iter()
        .map(|socket| socket.name.as_str())
        .chain(kind.slots.iter().map(String::as_str))
        .chain(kind.fields.iter().map(|field| field.name.as_str()));
    for name in declared {
        if name.is_empty() {
            return Err("socket, slot and field names must be non-empty".to_string());
        }
        if !names.insert(name) {
            return Err(format!("name `{name}` is declared more than once"));
        }
    }

    for socket in &kind.sockets {
        if let SocketDefault::Literal(literal) = &socket.default {
            if !socket.value_type.accepts_literal(literal) || !literal.is_finite() {
                return Err(format!(
                    "socket `{}` default {} does not fit type {}",
                    socket.name,
                    literal.type_name(),
                    socket.value_type
                ));
            }
        }
    }
    for field in &kind.fields {
        if let FieldType::Dropdown { options, default } = &field.field_type {
            if !options.contains(default) {
                return Err(format!("dropdown `{}` default `{default}` is not an option", field.name));
            }
        }
    }

    match &kind.shape {
        BlockShape::EntryPoint { callback } => {
            if !identifier_pattern().is_match(callback) {
                return Err(format!("callback `{callback}` is not a valid identifier"));
            }
            if !matches!(kind.template, CodeTemplate::Body { .. }) {
                return Err("entry points must use the body template".to_string());
            }
        }
        BlockShape::Statement => {
            if !kind.template.renders_statement() {
                return Err("template does not render as a statement".to_string());
            }
        }
        BlockShape::Value { .. } => {
            if !kind.slots.is_empty() {
                return Err("value blocks cannot declare statement slots".to_string());
            }
            if !kind.template.renders_value() {
                return Err("template does not render as a value".to_string());
            }
        }
    }

    check_template(kind, &kind.template)
}

fn check_template(kind: &BlockKind, template: &CodeTemplate) -> Result<(), String> {
    match template {
        CodeTemplate::Body { slot } => check_slot(kind, slot),
        CodeTemplate::Call { function, args } => {
            if !identifier_pattern().is_match(function) {
                return Err(format!("function `{function}` is not a valid identifier"));
            }
            args.iter().try_for_each(|arg| check_operand(kind, arg))
        }
        CodeTemplate::Binary { left, right, .. } => {
            check_operand(kind, left)?;
            check_operand(kind, right)
        }
        CodeTemplate::Prefix { operand, .. } => check_operand(kind, operand),
        CodeTemplate::Conditional {
            condition,
            then,
            otherwise,
        } => {
            check_operand(kind, condition)?;
            check_operand(kind, then)?;
            check_operand(kind, otherwise)
        }
        CodeTemplate::Member { object, property } => {
            if !identifier_pattern().is_match(property) {
                return Err(format!("property `{property}` is not a valid identifier"));
            }
            check_operand(kind, object)
        }
        CodeTemplate::Atom { code } => {
            if code.trim().is_empty() {
                return Err("atom code must be non-empty".to_string());
            }
            Ok(())
        }
        CodeTemplate::Literal { field } => check_field(kind, field).map(|_| ()),
        CodeTemplate::Variable { field } | CodeTemplate::Assign { field, .. } => {
            match check_field(kind, field)? {
                FieldType::Text { .. } => {}
                _ => return Err(format!("variable field `{field}` must be a text field")),
            }
            if let CodeTemplate::Assign { value, .. } = template {
                check_operand(kind, value)?;
            }
            Ok(())
        }
        CodeTemplate::If {
            condition,
            then_slot,
            else_slot,
        } => {
            check_operand(kind, condition)?;
            check_slot(kind, then_slot)?;
            match else_slot {
                Some(slot) => check_slot(kind, slot),
                None => Ok(()),
            }
        }
        CodeTemplate::Repeat { count: operand, body } | CodeTemplate::While { condition: operand, body } => {
            check_operand(kind, operand)?;
            check_slot(kind, body)
        }
        CodeTemplate::Switch { field, cases } => {
            let FieldType::Dropdown { options, .. } = check_field(kind, field)? else {
                return Err(format!("switch field `{field}` must be a dropdown"));
            };
            for (case, nested) in cases {
                if !options.contains(case) {
                    return Err(format!("switch case `{case}` is not an option of `{field}`"));
                }
                check_template(kind, nested)?;
            }
            Ok(())
        }
    }
}

fn check_operand(kind: &BlockKind, operand: &Operand) -> Result<(), String> {
    match operand {
        Operand::Socket(name) if kind.socket(name).is_none() => Err(format!("template references undeclared socket `{name}`")),
        Operand::Field(name) => check_field(kind, name).map(|_| ()),
        Operand::Socket(_) => Ok(()),
    }
}

fn check_field<'a>(kind: &'a BlockKind, name: &str) -> Result<&'a FieldType, String> {
    kind.field(name)
        .map(|field| &field.field_type)
        .ok_or_else(|| format!("template references undeclared field `{name}`"))
}

fn check_slot(kind: &BlockKind, name: &str) -> Result<(), String> {
    if kind.has_slot(name) {
        Ok(())
    } else {
        Err(format!("template references undeclared slot `{name}`"))
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
