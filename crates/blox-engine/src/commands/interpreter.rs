use blox_codegen::{GenerationDiagnostic, Generator, GeneratorOptions};
use blox_core::{patch_first_match, render_line_view};
use blox_graph::{GraphDocument, ProgramGraph};
use blox_schema::KindRegistry;
use std::sync::Arc;

use super::splice::splice_fragment;
use super::types::{AgentCommand, CommandEffect, CommandResult, InterpreterError};
use crate::session::ProgramSnapshot;

/// Applies agent commands to a snapshot without touching it. Callers commit
/// the returned snapshot themselves.
#[derive(Debug, Clone)]
pub struct Interpreter {
    registry: Arc<KindRegistry>,
    options: GeneratorOptions,
}

impl Interpreter {
    pub fn new(registry: Arc<KindRegistry>, options: GeneratorOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &Arc<KindRegistry> {
        &self.registry
    }

    pub fn apply(&self, current: &ProgramSnapshot, command: &AgentCommand) -> Result<CommandEffect, InterpreterError> {
        match (current, command) {
            (ProgramSnapshot::Graph { graph }, AgentCommand::View { range: None }) => {
                let mut result = CommandResult::ok(format!("graph has {} block(s)", graph.blocks.len()));
                result.new_graph = Some(graph.clone());
                Ok(CommandEffect::View(result))
            }
            (ProgramSnapshot::Graph { .. }, AgentCommand::View { range: Some(_) }) => Err(InterpreterError::Structure(
                "line ranges only apply to the text buffer".to_string(),
            )),
            (ProgramSnapshot::Text { text }, AgentCommand::View { range }) => {
                let rendered = render_line_view(text, range.as_ref())?;
                let mut result = CommandResult::ok(format!("buffer has {} line(s)", text.lines().count()));
                result.new_text = Some(rendered);
                Ok(CommandEffect::View(result))
            }
            (ProgramSnapshot::Graph { .. }, AgentCommand::Create { graph }) => {
                let program = ProgramGraph::deserialize_value(self.registry.clone(), graph)?;
                Ok(self.commit_graph(&program, "graph replaced"))
            }
            (ProgramSnapshot::Graph { graph }, AgentCommand::StrReplace { target, fragment }) => {
                let spliced = splice_fragment(&self.registry, graph, target, fragment)?;
                let program = ProgramGraph::deserialize(self.registry.clone(), &spliced)?;
                Ok(self.commit_graph(&program, format!("replaced {target}")))
            }
            (ProgramSnapshot::Text { .. }, AgentCommand::Replace { text }) => Ok(commit_text(
                text.clone(),
                format!("buffer replaced ({} line(s))", text.lines().count()),
            )),
            (ProgramSnapshot::Text { text }, AgentCommand::Patch { old_text, new_text }) => {
                let patched = patch_first_match(text, old_text, new_text)?;
                let message = format!(
                    "patched line {} ({} occurrence(s) of old_text)",
                    patched.audit.start_line, patched.audit.occurrences
                );
                Ok(commit_text(patched.text, message))
            }
            (snapshot, command) => Err(InterpreterError::Structure(format!(
                "`{}` is not available in {} mode",
                command.name(),
                snapshot.mode().as_str()
            ))),
        }
    }

    /// Code and diagnostics for a snapshot. Text buffers are their own code.
    pub fn render(&self, snapshot: &ProgramSnapshot) -> Result<(String, Vec<GenerationDiagnostic>), InterpreterError> {
        match snapshot {
            ProgramSnapshot::Graph { graph } => {
                let program = ProgramGraph::deserialize(self.registry.clone(), graph)?;
                let generated = Generator::new(&self.registry, self.options.clone()).generate(&program);
                Ok((generated.code, generated.diagnostics))
            }
            ProgramSnapshot::Text { text } => Ok((text.clone(), Vec::new())),
        }
    }

    /// Runs `edit` on a working copy of `document` and returns the committed form.
    pub fn edit_graph(
        &self,
        document: &GraphDocument,
        edit: impl FnOnce(&mut ProgramGraph) -> Result<(), blox_graph::GraphError>,
    ) -> Result<CommandEffect, InterpreterError> {
        let mut program = ProgramGraph::deserialize(self.registry.clone(), document)?;
        edit(&mut program)?;
        Ok(self.commit_graph(&program, "direct edit applied"))
    }

    fn commit_graph(&self, program: &ProgramGraph, message: impl Into<String>) -> CommandEffect {
        let document = program.serialize();
        let generated = Generator::new(&self.registry, self.options.clone()).generate(program);
        let mut result = CommandResult::ok(message);
        result.new_graph = Some(document.clone());
        result.code = Some(generated.code);
        result.diagnostics = generated.diagnostics;
        CommandEffect::Commit {
            snapshot: ProgramSnapshot::Graph { graph: document },
            result,
        }
    }
}

fn commit_text(text: String, message: String) -> CommandEffect {
    let mut result = CommandResult::ok(message);
    result.new_text = Some(text.clone());
    result.code = Some(text.clone());
    CommandEffect::Commit {
        snapshot: ProgramSnapshot::Text { text },
        result,
    }
}

#[cfg(test)]
#[path = "interpreter_test.rs"]
mod tests;
