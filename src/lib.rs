pub mod diagnostic;
pub mod er_graph;
pub mod er_parser;
pub mod er_query;
pub mod er_synth;
pub mod er_validator;
pub mod error;
pub mod report;
pub mod sql_ast;
pub mod sql_renderer;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use er_graph::{Edge, EdgeKind, Graph, Node, NodeKind};
pub use error::{CompileError, GraphError, LoadError, SynthesisError};

/// Knobs for [`compile_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Prefix the document with a `--` comment header.
    pub header: bool,
    /// Let warnings block compilation like errors do.
    pub deny_warnings: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            header: true,
            deny_warnings: false,
        }
    }
}

/// Builds a graph from either the `erGraph` text format or a JSON snapshot.
pub fn load(input: &str) -> Result<Graph, LoadError> {
    let trimmed = input.trim_start();
    if trimmed.starts_with("erGraph") {
        er_parser::parse_er_graph(input)
    } else if trimmed.starts_with('{') {
        Ok(Graph::from_json(input)?)
    } else {
        let first_word = trimmed.split_whitespace().next().unwrap_or("(empty)");
        Err(LoadError::UnknownFormat(first_word.to_string()))
    }
}

pub fn validate(graph: &Graph) -> Vec<Diagnostic> {
    er_validator::validate(graph)
}

pub fn compile(graph: &Graph) -> Result<String, CompileError> {
    compile_with_options(graph, &CompileOptions::default())
}

/// Validates, then synthesizes and renders the schema. Any blocking
/// diagnostic stops the call before synthesis and all diagnostics are
/// returned.
pub fn compile_with_options(graph: &Graph, options: &CompileOptions) -> Result<String, CompileError> {
    graph.check_references()?;

    let diagnostics = validate(graph);
    let blocking = diagnostics
        .iter()
        .filter(|d| d.is_error() || (options.deny_warnings && d.severity == Severity::Warning))
        .count();
    if blocking > 0 {
        log::info!(
            "compilation blocked by {blocking} diagnostic(s): {}",
            report::summary(&diagnostics)
        );
        return Err(CompileError::Invalid(diagnostics));
    }

    let schema = er_synth::synthesize(graph)?;
    log::info!("synthesized {} table(s)", schema.tables.len());
    Ok(sql_renderer::render(&schema, options.header))
}
