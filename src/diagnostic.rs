//! Diagnostics produced by the ER validator.

use std::fmt;

/// Severity level for a diagnostic.
///
/// Only `Error` blocks compilation by default; warnings block when the caller
/// asks for it through `CompileOptions::deny_warnings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Categories of ER well-formedness problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Element has no edges at all.
    Isolated,
    /// Attribute reaches no entity or relation.
    Detached,
    /// Two entities joined without a relation in between.
    EntityToEntity,
    /// Entity joined to a relation by something other than a weighted edge.
    MissingWeightedEdge,
    MissingKey,
    MultipleKeys,
    /// Key attribute where the dependency kind forbids one.
    ForbiddenKey,
    MissingDependency,
    MultipleDependencies,
    RelationToRelation,
    /// Some entity ends of a relation are not weighted.
    UnweightedEntityLink,
    TooFewEntities,
    NonBinaryRelation,
    /// Dependency relation without a clear owner/dependent pair.
    DependencyEnds,
    /// Identifying relation without exactly one key attribute.
    IdentifyingKey,
    InvalidCardinality,
    WrongNeighbor,
    WrongEdge,
    /// Attribute owned by more than one entity or relation.
    AmbiguousOwner,
    CompositeNotAllowed,
    NestedKey,
    /// Derived attribute with outgoing edges.
    NotLeaf,
    MalformedLabel,
    MissingEquation,
    MissingParent,
    MultipleParents,
    /// Entity listed as a child by more than one specialization.
    MultipleSpecializations,
    WeakSubclass,
    /// Key declared where an inherited identity wins.
    KeyIgnored,
    /// Constraint edge that contradicts the specialization kind.
    ConstraintMismatch,
    /// Weak entity reusing its owner's identity unchanged.
    SharedIdentity,
    /// Two nodes map to the same table name.
    NameClash,
}

impl DiagnosticKind {
    /// Returns the stable short label shown next to a diagnostic.
    pub fn short_label(self) -> &'static str {
        match self {
            Self::Isolated => "isolated",
            Self::Detached => "detached",
            Self::EntityToEntity => "entity-to-entity",
            Self::MissingWeightedEdge => "missing-weighted-edge",
            Self::MissingKey => "missing-key",
            Self::MultipleKeys => "multiple-keys",
            Self::ForbiddenKey => "forbidden-key",
            Self::MissingDependency => "missing-dependency",
            Self::MultipleDependencies => "multiple-dependencies",
            Self::RelationToRelation => "relation-to-relation",
            Self::UnweightedEntityLink => "unweighted-entity-link",
            Self::TooFewEntities => "too-few-entities",
            Self::NonBinaryRelation => "non-binary-relation",
            Self::DependencyEnds => "dependency-ends",
            Self::IdentifyingKey => "identifying-key",
            Self::InvalidCardinality => "invalid-cardinality",
            Self::WrongNeighbor => "wrong-neighbor",
            Self::WrongEdge => "wrong-edge",
            Self::AmbiguousOwner => "ambiguous-owner",
            Self::CompositeNotAllowed => "composite-not-allowed",
            Self::NestedKey => "nested-key",
            Self::NotLeaf => "not-leaf",
            Self::MalformedLabel => "malformed-label",
            Self::MissingEquation => "missing-equation",
            Self::MissingParent => "missing-parent",
            Self::MultipleParents => "multiple-parents",
            Self::MultipleSpecializations => "multiple-specializations",
            Self::WeakSubclass => "weak-subclass",
            Self::KeyIgnored => "key-ignored",
            Self::ConstraintMismatch => "constraint-mismatch",
            Self::SharedIdentity => "shared-identity",
            Self::NameClash => "name-clash",
        }
    }
}

/// A validation finding attached to one graph element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Id of the offending node.
    pub element_id: String,
    /// Human-readable description.
    pub description: String,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        kind: DiagnosticKind,
        element_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            element_id: element_id.into(),
            description: description.into(),
        }
    }

    pub fn error(
        kind: DiagnosticKind,
        element_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Error, kind, element_id, description)
    }

    pub fn warning(
        kind: DiagnosticKind,
        element_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, kind, element_id, description)
    }

    pub fn info(
        kind: DiagnosticKind,
        element_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Info, kind, element_id, description)
    }

    pub fn short_label(&self) -> &'static str {
        self.kind.short_label()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {}: {}",
            self.severity,
            self.short_label(),
            self.element_id,
            self.description
        )
    }
}
