use thiserror::Error;

use crate::diagnostic::Diagnostic;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("duplicate element id `{0}`")]
    DuplicateId(String),
    #[error("unknown element id `{0}`")]
    UnknownElement(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unknown document type: {0}")]
    UnknownFormat(String),
    #[error("syntax error in ER graph: unexpected `{0}`")]
    Syntax(String),
    #[error("invalid graph snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Faults raised while turning a validated graph into tables.
///
/// Validation rules out every one of these for well-formed input, so hitting
/// one means the snapshot changed shape or a rule has a gap. A fault aborts the
/// whole compile call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("edge `{edge}` references missing node `{node}`")]
    DanglingEdge { edge: String, node: String },
    #[error("unknown node `{0}`")]
    UnknownNode(String),
    #[error("node `{0}` is not an entity")]
    NotAnEntity(String),
    #[error("entity `{0}` has no primary key")]
    MissingPrimaryKey(String),
    #[error("label `{label}` of `{node}` does not follow the `name:TYPE` convention")]
    MalformedLabel { node: String, label: String },
    #[error("specialization `{0}` has no parent entity")]
    MissingParent(String),
    #[error("weak entity `{0}` has no dependency relation")]
    MissingDependency(String),
    #[error("identity of `{0}` depends on itself (cycle detected)")]
    IdentityCycle(String),
    #[error("derived attribute `{0}` has no equation")]
    MissingEquation(String),
    #[error("relation `{0}` connects fewer than two entities")]
    TooFewEntities(String),
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("graph failed validation with {} diagnostic(s)", .0.len())]
    Invalid(Vec<Diagnostic>),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}
