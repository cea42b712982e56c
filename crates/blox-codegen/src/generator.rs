use blox_graph::{BlockId, BlockInstance, ProgramGraph, SocketBinding};
use blox_schema::{BlockKind, CodeTemplate, KindRegistry, Literal, Operand, SocketDefault};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::literal::{format_literal, sanitize_identifier};
use crate::precedence::{Fragment, Precedence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorOptions {
    /// When set, `setup` opens with `createCanvas(width, height);`.
    #[serde(default)]
    pub canvas: Option<CanvasSize>,
    #[serde(default = "default_indent")]
    pub indent: usize,
}

fn default_indent() -> usize {
    2
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            canvas: None,
            indent: default_indent(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnknownKind,
    UndeclaredSocket,
    UndeclaredField,
    MissingCase,
    ShapeMismatch,
}

/// Non-fatal problem found while generating; the offending instance emits nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationDiagnostic {
    /// Document id (`b1`, `b2`, ...) of the instance.
    pub block: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedProgram {
    pub code: String,
    pub diagnostics: Vec<GenerationDiagnostic>,
}

pub struct Generator<'r> {
    registry: &'r KindRegistry,
    options: GeneratorOptions,
}

impl<'r> Generator<'r> {
    pub fn new(registry: &'r KindRegistry, options: GeneratorOptions) -> Self {
        Self { registry, options }
    }

    /// Renders the whole sketch. Never fails; problems become diagnostics.
    pub fn generate(&self, graph: &ProgramGraph) -> GeneratedProgram {
        let ids = graph
            .all_blocks()
            .into_iter()
            .enumerate()
            .map(|(index, id)| (id, format!("b{}", index + 1)))
            .collect::<BTreeMap<_, _>>();
        let mut emitter = Emitter {
            graph,
            registry: self.registry,
            ids: &ids,
            indent: self.options.indent,
            variables: BTreeSet::new(),
            runtime_names: runtime_names(self.registry),
            loop_depth: 0,
            diagnostics: Vec::new(),
        };
        emitter.collect_variables();

        let mut callbacks: Vec<(String, String)> = Vec::new();
        for entry in graph.entry_points() {
            let Some((callback, body)) = emitter.entry_point(*entry) else {
                continue;
            };
            match callbacks.iter_mut().find(|(name, _)| *name == callback) {
                Some((_, existing)) => existing.push_str(&body),
                None => callbacks.push((callback, body)),
            }
        }

        if let Some(canvas) = self.options.canvas {
            let line = format!(
                "{}createCanvas({}, {});\n",
                " ".repeat(self.options.indent),
                canvas.width,
                canvas.height
            );
            match callbacks.iter_mut().find(|(name, _)| name == "setup") {
                Some((_, body)) => body.insert_str(0, &line),
                None => callbacks.insert(0, ("setup".to_string(), line)),
            }
        }

        let mut sections = Vec::new();
        if !emitter.variables.is_empty() {
            sections.push(
                emitter
                    .variables
                    .iter()
                    .map(|name| format!("let {name} = 0;\n"))
                    .collect::<String>(),
            );
        }
        for (callback, body) in callbacks {
            sections.push(format!("function {callback}() {{\n{body}}}\n"));
        }

        let diagnostics = emitter.diagnostics;
        for diagnostic in &diagnostics {
            tracing::warn!(block = %diagnostic.block, kind = ?diagnostic.kind, "{}", diagnostic.message);
        }
        tracing::debug!(
            blocks = ids.len(),
            diagnostics = diagnostics.len(),
            "generated sketch"
        );
        GeneratedProgram {
            code: sections.join("\n"),
            diagnostics,
        }
    }
}

/// Every name the generated sketch hands to the runtime: entry-point
/// callbacks, called functions and identifier-shaped atoms.
fn runtime_names(registry: &KindRegistry) -> BTreeSet<String> {
    let mut names = BTreeSet::from(["createCanvas".to_string()]);
    for kind in registry.kinds() {
        if let Some(callback) = kind.callback() {
            names.insert(callback.to_string());
        }
        let mut pending = vec![&kind.template];
        while let Some(template) = pending.pop() {
            match template {
                CodeTemplate::Call { function, .. } => {
                    names.insert(function.clone());
                }
                CodeTemplate::Atom { code } if is_plain_identifier(code) => {
                    names.insert(code.clone());
                }
                CodeTemplate::Switch { cases, .. } => pending.extend(cases.values()),
                _ => {}
            }
        }
    }
    names
}

fn is_plain_identifier(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$')
}

struct Emitter<'a> {
    graph: &'a ProgramGraph,
    registry: &'a KindRegistry,
    ids: &'a BTreeMap<BlockId, String>,
    indent: usize,
    variables: BTreeSet<String>,
    /// Callbacks and globals the sketch runtime owns; variables may not reuse them.
    runtime_names: BTreeSet<String>,
    loop_depth: usize,
    diagnostics: Vec<GenerationDiagnostic>,
}

impl<'a> Emitter<'a> {
    fn entry_point(&mut self, id: BlockId) -> Option<(String, String)> {
        let (block, kind) = self.lookup(id)?;
        let (Some(callback), CodeTemplate::Body { slot }) = (kind.callback(), &kind.template) else {
            self.diagnose(id, DiagnosticKind::ShapeMismatch, format!("`{}` is not an entry point", kind.id));
            return None;
        };
        Some((callback.to_string(), self.chain(block.slot_head(slot), 1)))
    }

    fn chain(&mut self, head: Option<BlockId>, depth: usize) -> String {
        let mut out = String::new();
        let mut cursor = head;
        while let Some(id) = cursor {
            out.push_str(&self.statement(id, depth).unwrap_or_default());
            cursor = self.graph.block(id).and_then(BlockInstance::next);
        }
        out
    }

    fn statement(&mut self, id: BlockId, depth: usize) -> Option<String> {
        let (block, kind) = self.lookup(id)?;
        if !kind.is_statement() {
            self.diagnose(id, DiagnosticKind::ShapeMismatch, format!("`{}` is not a statement", kind.id));
            return None;
        }
        self.statement_template(id, block, kind, &kind.template, depth)
    }

    fn statement_template(
        &mut self,
        id: BlockId,
        block: &'a BlockInstance,
        kind: &'a BlockKind,
        template: &'a CodeTemplate,
        depth: usize,
    ) -> Option<String> {
        let pad = " ".repeat(self.indent * depth);
        match template {
            CodeTemplate::Call { function, args } => {
                let args = self.arguments(id, block, kind, args)?;
                Some(format!("{pad}{function}({args});\n"))
            }
            CodeTemplate::Assign { field, operator, value } => {
                let name = self.variable_name(id, block, kind, field)?;
                let value = self
                    .operand(id, block, kind, value)?
                    .at_least(Precedence::Conditional.rank());
                Some(format!("{pad}{name} {} {value};\n", operator.symbol()))
            }
            CodeTemplate::If {
                condition,
                then_slot,
                else_slot,
            } => {
                let condition = self.operand(id, block, kind, condition)?.at_least(Precedence::Lowest.rank());
                let then_body = self.chain(block.slot_head(then_slot), depth + 1);
                let mut out = format!("{pad}if ({condition}) {{\n{then_body}{pad}}}");
                if let Some(else_slot) = else_slot {
                    let else_body = self.chain(block.slot_head(else_slot), depth + 1);
                    out.push_str(&format!(" else {{\n{else_body}{pad}}}"));
                }
                out.push('\n');
                Some(out)
            }
            CodeTemplate::Repeat { count, body } => {
                let count = self
                    .operand(id, block, kind, count)?
                    .at_least(Precedence::Relational.above());
                let counter = self.loop_counter();
                self.loop_depth += 1;
                let inner = self.chain(block.slot_head(body), depth + 1);
                self.loop_depth -= 1;
                Some(format!(
                    "{pad}for (let {counter} = 0; {counter} < {count}; {counter}++) {{\n{inner}{pad}}}\n"
                ))
            }
            CodeTemplate::While { condition, body } => {
                let condition = self.operand(id, block, kind, condition)?.at_least(Precedence::Lowest.rank());
                let inner = self.chain(block.slot_head(body), depth + 1);
                Some(format!("{pad}while ({condition}) {{\n{inner}{pad}}}\n"))
            }
            CodeTemplate::Switch { field, cases } => {
                let case = self.switch_case(id, block, kind, field, cases)?;
                self.statement_template(id, block, kind, case, depth)
            }
            _ => {
                self.diagnose(
                    id,
                    DiagnosticKind::ShapeMismatch,
                    format!("`{}` template does not render as a statement", kind.id),
                );
                None
            }
        }
    }

    fn value(&mut self, id: BlockId) -> Option<Fragment> {
        let (block, kind) = self.lookup(id)?;
        if kind.output_type().is_none() {
            self.diagnose(id, DiagnosticKind::ShapeMismatch, format!("`{}` does not produce a value", kind.id));
            return None;
        }
        self.value_template(id, block, kind, &kind.template)
    }

    fn value_template(
        &mut self,
        id: BlockId,
        block: &'a BlockInstance,
        kind: &'a BlockKind,
        template: &'a CodeTemplate,
    ) -> Option<Fragment> {
        match template {
            CodeTemplate::Call { function, args } => {
                let args = self.arguments(id, block, kind, args)?;
                Some(Fragment::new(format!("{function}({args})"), Precedence::Postfix))
            }
            CodeTemplate::Binary { operator, left, right } => {
                let precedence = Precedence::of_binary(*operator);
                let left = self.operand(id, block, kind, left)?.at_least(precedence.rank());
                let right = self.operand(id, block, kind, right)?.at_least(precedence.above());
                Some(Fragment::new(format!("{left} {} {right}", operator.symbol()), precedence))
            }
            CodeTemplate::Prefix { operator, operand } => {
                let operand = self
                    .operand(id, block, kind, operand)?
                    .at_least(Precedence::Postfix.rank());
                Some(Fragment::new(format!("{}{operand}", operator.symbol()), Precedence::Unary))
            }
            CodeTemplate::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let condition = self
                    .operand(id, block, kind, condition)?
                    .at_least(Precedence::LogicalOr.above());
                let then = self
                    .operand(id, block, kind, then)?
                    .at_least(Precedence::Conditional.rank());
                let otherwise = self
                    .operand(id, block, kind, otherwise)?
                    .at_least(Precedence::Conditional.rank());
                Some(Fragment::new(
                    format!("{condition} ? {then} : {otherwise}"),
                    Precedence::Conditional,
                ))
            }
            CodeTemplate::Member { object, property } => {
                let object = self.operand(id, block, kind, object)?.at_least(Precedence::Postfix.rank());
                Some(Fragment::new(format!("{object}.{property}"), Precedence::Postfix))
            }
            CodeTemplate::Atom { code } => Some(Fragment::new(code.clone(), Precedence::Atomic)),
            CodeTemplate::Literal { field } => {
                let literal = self.field_value(id, block, kind, field)?;
                Some(literal_fragment(&literal))
            }
            CodeTemplate::Variable { field } => {
                let name = self.variable_name(id, block, kind, field)?;
                Some(Fragment::new(name, Precedence::Atomic))
            }
            CodeTemplate::Switch { field, cases } => {
                let case = self.switch_case(id, block, kind, field, cases)?;
                self.value_template(id, block, kind, case)
            }
            _ => {
                self.diagnose(
                    id,
                    DiagnosticKind::ShapeMismatch,
                    format!("`{}` template does not render as a value", kind.id),
                );
                None
            }
        }
    }

    fn arguments(
        &mut self,
        id: BlockId,
        block: &'a BlockInstance,
        kind: &'a BlockKind,
        args: &'a [Operand],
    ) -> Option<String> {
        let mut rendered = Vec::with_capacity(args.len());
        for arg in args {
            rendered.push(self.operand(id, block, kind, arg)?.at_least(Precedence::Conditional.rank()));
        }
        Some(rendered.join(", "))
    }

    fn operand(
        &mut self,
        id: BlockId,
        block: &'a BlockInstance,
        kind: &'a BlockKind,
        operand: &'a Operand,
    ) -> Option<Fragment> {
        match operand {
            Operand::Field(name) => {
                let literal = self.field_value(id, block, kind, name)?;
                Some(literal_fragment(&literal))
            }
            Operand::Socket(name) => {
                let Some(spec) = kind.socket(name) else {
                    self.diagnose(
                        id,
                        DiagnosticKind::UndeclaredSocket,
                        format!("`{}` template references undeclared socket `{name}`", kind.id),
                    );
                    return None;
                };
                let bound = match block.socket(name) {
                    Some(SocketBinding::Literal(literal)) => Some(literal_fragment(literal)),
                    Some(SocketBinding::Block(child)) => self.value(*child),
                    Some(SocketBinding::Empty) | None => None,
                };
                Some(bound.unwrap_or_else(|| match &spec.default {
                    SocketDefault::Literal(literal) => literal_fragment(literal),
                    SocketDefault::Code(code) => Fragment::new(code.clone(), Precedence::Postfix),
                }))
            }
        }
    }

    fn field_value(&mut self, id: BlockId, block: &BlockInstance, kind: &BlockKind, name: &str) -> Option<Literal> {
        let Some(spec) = kind.field(name) else {
            self.diagnose(
                id,
                DiagnosticKind::UndeclaredField,
                format!("`{}` template references undeclared field `{name}`", kind.id),
            );
            return None;
        };
        Some(
            block
                .field(name)
                .cloned()
                .unwrap_or_else(|| spec.field_type.default_literal()),
        )
    }

    fn variable_name(&mut self, id: BlockId, block: &BlockInstance, kind: &BlockKind, field: &str) -> Option<String> {
        match self.field_value(id, block, kind, field)? {
            Literal::Text(name) => Some(self.identifier(&name)),
            other => Some(self.identifier(&format_literal(&other))),
        }
    }

    /// Sanitized variable name, prefixed with `_` until it no longer clashes
    /// with a runtime callback or global.
    fn identifier(&self, name: &str) -> String {
        let mut identifier = sanitize_identifier(name);
        while self.runtime_names.contains(&identifier) {
            identifier.insert(0, '_');
        }
        identifier
    }

    fn switch_case(
        &mut self,
        id: BlockId,
        block: &BlockInstance,
        kind: &BlockKind,
        field: &str,
        cases: &'a BTreeMap<String, CodeTemplate>,
    ) -> Option<&'a CodeTemplate> {
        let choice = match self.field_value(id, block, kind, field)? {
            Literal::Text(choice) => choice,
            other => format_literal(&other),
        };
        let case = cases.get(&choice);
        if case.is_none() {
            self.diagnose(
                id,
                DiagnosticKind::MissingCase,
                format!("`{}` has no case for {field} = `{choice}`", kind.id),
            );
        }
        case
    }

    /// Names declared at the top: every variable a reachable block reads or writes.
    fn collect_variables(&mut self) {
        for id in self.graph.all_blocks() {
            let Some(block) = self.graph.block(id) else {
                continue;
            };
            let Ok(kind) = self.registry.get_kind(block.kind()) else {
                continue;
            };
            let mut pending = vec![&kind.template];
            while let Some(template) = pending.pop() {
                match template {
                    CodeTemplate::Assign { field, .. } | CodeTemplate::Variable { field } => {
                        if let Some(Literal::Text(name)) = block.field(field) {
                            let identifier = self.identifier(name);
                            self.variables.insert(identifier);
                        }
                    }
                    CodeTemplate::Switch { cases, .. } => pending.extend(cases.values()),
                    _ => {}
                }
            }
        }
    }

    /// `i`, `j`, `k`, then `i3`, `i4`, ... skipping any name a variable already uses.
    fn loop_counter(&self) -> String {
        let mut name = match self.loop_depth {
            0 => "i".to_string(),
            1 => "j".to_string(),
            2 => "k".to_string(),
            depth => format!("i{depth}"),
        };
        while self.variables.contains(&name) {
            name.push('_');
        }
        name
    }

    fn lookup(&mut self, id: BlockId) -> Option<(&'a BlockInstance, &'a BlockKind)> {
        let graph = self.graph;
        let registry = self.registry;
        let Some(block) = graph.block(id) else {
            self.diagnose(id, DiagnosticKind::UnknownKind, format!("block {id} is missing from the graph"));
            return None;
        };
        match registry.get_kind(block.kind()) {
            Ok(kind) => Some((block, kind)),
            Err(err) => {
                self.diagnose(id, DiagnosticKind::UnknownKind, err.to_string());
                None
            }
        }
    }

    fn diagnose(&mut self, id: BlockId, kind: DiagnosticKind, message: String) {
        let block = self.ids.get(&id).cloned().unwrap_or_else(|| id.to_string());
        self.diagnostics.push(GenerationDiagnostic { block, kind, message });
    }
}

fn literal_fragment(literal: &Literal) -> Fragment {
    Fragment::new(format_literal(literal), Precedence::of_literal(literal))
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod tests;
