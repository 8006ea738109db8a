//! Per-kind well-formedness rules for ER graphs.
//!
//! Each node kind maps to one rule function. A rule returns the first check
//! the node fails, errors before warnings before info, so a node carries at
//! most one diagnostic from its rule. [`validate`] runs every rule and then
//! the graph-wide table-name check.

use std::collections::HashMap;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::er_graph::{EdgeKind, Graph, Node, NodeKind};
use crate::er_query::{
    Cardinality, attribute_name, attribute_root_owners, cardinality_label_of, cardinality_of,
    children_of, connected_entities_of, dependencies_of, dependency_ends, key_attributes_of,
    neighbors_of, parent_specializations_of, parse_cardinality_label, parse_typed_label,
    specialization_children, specialization_parents,
};

pub type Rule = fn(&Graph, &Node) -> Option<Diagnostic>;

pub fn rule_for(kind: NodeKind) -> Rule {
    match kind {
        NodeKind::Entity => entity_rule,
        NodeKind::WeakEntity => weak_entity_rule,
        NodeKind::Relation => relation_rule,
        NodeKind::ExistenceDependentRelation | NodeKind::IdentifyingDependentRelation => {
            dependency_rule
        }
        NodeKind::PartialExclusiveSpecialization
        | NodeKind::PartialOverlappedSpecialization
        | NodeKind::TotalExclusiveSpecialization
        | NodeKind::TotalOverlappedSpecialization => specialization_rule,
        NodeKind::Attribute => attribute_rule,
        NodeKind::KeyAttribute => key_rule,
        NodeKind::AlternativeKeyAttribute => alternative_key_rule,
        NodeKind::MultiValuedAttribute => multi_valued_rule,
        NodeKind::DerivedAttribute => derived_rule,
    }
}

pub fn validate_node(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    rule_for(node.kind)(graph, node)
}

/// Runs every rule over the whole graph.
pub fn validate(graph: &Graph) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = graph
        .nodes()
        .iter()
        .filter_map(|node| validate_node(graph, node))
        .collect();
    diagnostics.extend(table_name_clashes(graph));

    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    log::debug!(
        "validated {} nodes, {} edges: {} diagnostic(s), {} error(s)",
        graph.nodes().len(),
        graph.edges().len(),
        diagnostics.len(),
        errors
    );
    diagnostics
}

fn name_of(node: &Node) -> String {
    format!("{} `{}`", node.kind.describe(), node.label)
}

fn isolated(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    graph.edges_touching(&node.id).next().is_none().then(|| {
        Diagnostic::error(
            DiagnosticKind::Isolated,
            &node.id,
            format!("{} has no edges", name_of(node)),
        )
    })
}

// Entities

fn entity_links(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    for (other, edge) in neighbors_of(graph, &node.id) {
        if other.kind.is_entity() {
            return Some(Diagnostic::error(
                DiagnosticKind::EntityToEntity,
                &node.id,
                format!(
                    "{} is linked directly to {}; use a relation in between",
                    name_of(node),
                    name_of(other)
                ),
            ));
        }
        if other.kind.is_relation() && edge.kind != EdgeKind::Weighted {
            return Some(Diagnostic::error(
                DiagnosticKind::MissingWeightedEdge,
                &node.id,
                format!(
                    "{} reaches {} through a {} edge; a weighted edge is required",
                    name_of(node),
                    name_of(other),
                    edge.kind.describe()
                ),
            ));
        }
    }
    None
}

fn entity_rule(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    if let Some(d) = isolated(graph, node).or_else(|| entity_links(graph, node)) {
        return Some(d);
    }
    let keys = key_attributes_of(graph, &node.id);
    let specializations = parent_specializations_of(graph, &node.id);
    if let [first, second, ..] = specializations.as_slice() {
        return Some(Diagnostic::error(
            DiagnosticKind::MultipleSpecializations,
            &node.id,
            format!(
                "{} is a child of both {} and {}; a subclass inherits from one specialization",
                name_of(node),
                name_of(first),
                name_of(second)
            ),
        ));
    }
    if let Some(spec) = specializations.first() {
        return (!keys.is_empty()).then(|| {
            Diagnostic::warning(
                DiagnosticKind::KeyIgnored,
                &node.id,
                format!(
                    "{} inherits its identity from {}; its own key is ignored",
                    name_of(node),
                    name_of(spec)
                ),
            )
        });
    }
    match keys.len() {
        0 => Some(Diagnostic::error(
            DiagnosticKind::MissingKey,
            &node.id,
            format!("{} has no key attribute", name_of(node)),
        )),
        1 => None,
        n => Some(Diagnostic::warning(
            DiagnosticKind::MultipleKeys,
            &node.id,
            format!("{} has {n} key attributes; only the first is used", name_of(node)),
        )),
    }
}

fn weak_entity_rule(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    if let Some(d) = isolated(graph, node).or_else(|| entity_links(graph, node)) {
        return Some(d);
    }
    let dependencies = dependencies_of(graph, &node.id);
    let dependency = match dependencies.as_slice() {
        [] => {
            return Some(Diagnostic::error(
                DiagnosticKind::MissingDependency,
                &node.id,
                format!("{} has no dependency relation", name_of(node)),
            ));
        }
        [single] => *single,
        _ => {
            return Some(Diagnostic::error(
                DiagnosticKind::MultipleDependencies,
                &node.id,
                format!(
                    "{} depends on {} owners; exactly one is allowed",
                    name_of(node),
                    dependencies.len()
                ),
            ));
        }
    };

    let keys = key_attributes_of(graph, &node.id);
    match (dependency.kind, keys.is_empty()) {
        (NodeKind::ExistenceDependentRelation, true) => {
            return Some(Diagnostic::error(
                DiagnosticKind::MissingKey,
                &node.id,
                format!(
                    "{} is existence-dependent and needs a partial key",
                    name_of(node)
                ),
            ));
        }
        (NodeKind::IdentifyingDependentRelation, false) => {
            return Some(Diagnostic::error(
                DiagnosticKind::ForbiddenKey,
                &node.id,
                format!(
                    "{} is identified through {}; it may not declare a key",
                    name_of(node),
                    name_of(dependency)
                ),
            ));
        }
        _ => {}
    }
    if keys.len() > 1 {
        return Some(Diagnostic::warning(
            DiagnosticKind::MultipleKeys,
            &node.id,
            format!(
                "{} has {} key attributes; only the first is used",
                name_of(node),
                keys.len()
            ),
        ));
    }
    (cardinality_of(graph, &dependency.id) == Cardinality::OneToOne).then(|| {
        Diagnostic::info(
            DiagnosticKind::SharedIdentity,
            &node.id,
            format!(
                "{} is 1:1 with its owner and reuses the owner's identity",
                name_of(node)
            ),
        )
    })
}

// Relations

/// Checks shared by every relation kind, up to and including cardinality labels.
fn relation_shape(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    if let Some(d) = isolated(graph, node) {
        return Some(d);
    }
    for (other, _) in neighbors_of(graph, &node.id) {
        if other.kind.is_relation() {
            return Some(Diagnostic::error(
                DiagnosticKind::RelationToRelation,
                &node.id,
                format!("{} is linked to {}", name_of(node), name_of(other)),
            ));
        }
        if other.kind.is_specialization() {
            return Some(Diagnostic::error(
                DiagnosticKind::WrongNeighbor,
                &node.id,
                format!("{} cannot be linked to {}", name_of(node), name_of(other)),
            ));
        }
    }

    let ends = connected_entities_of(graph, &node.id);
    let weighted = ends
        .iter()
        .filter(|(_, e)| e.kind == EdgeKind::Weighted)
        .count();
    if weighted != ends.len() {
        return Some(Diagnostic::error(
            DiagnosticKind::UnweightedEntityLink,
            &node.id,
            format!(
                "{} has {} entity link(s) but only {weighted} are weighted",
                name_of(node),
                ends.len()
            ),
        ));
    }
    if ends.len() < 2 {
        return Some(Diagnostic::error(
            DiagnosticKind::TooFewEntities,
            &node.id,
            format!("{} must connect at least two entity ends", name_of(node)),
        ));
    }
    for edge in graph.edges_touching(&node.id) {
        if edge.kind != EdgeKind::Weighted {
            continue;
        }
        let label = cardinality_label_of(edge);
        if parse_cardinality_label(label).is_none() {
            return Some(Diagnostic::error(
                DiagnosticKind::InvalidCardinality,
                &node.id,
                format!(
                    "edge `{}` of {} has cardinality `{label}`; expected `(min..max)`",
                    edge.id,
                    name_of(node)
                ),
            ));
        }
    }
    None
}

fn relation_rule(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    if let Some(d) = relation_shape(graph, node) {
        return Some(d);
    }
    let cardinality = cardinality_of(graph, &node.id);
    let ends = connected_entities_of(graph, &node.id).len();
    if cardinality != Cardinality::ManyToMany && ends != 2 {
        return Some(Diagnostic::error(
            DiagnosticKind::NonBinaryRelation,
            &node.id,
            format!(
                "{} is {cardinality} but has {ends} ends; only N:M relations may be n-ary",
                name_of(node)
            ),
        ));
    }
    (cardinality != Cardinality::ManyToMany && !key_attributes_of(graph, &node.id).is_empty())
        .then(|| {
            Diagnostic::warning(
                DiagnosticKind::KeyIgnored,
                &node.id,
                format!(
                    "{} is {cardinality}; a relation key only applies to N:M junction tables",
                    name_of(node)
                ),
            )
        })
}

fn dependency_rule(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    if let Some(d) = relation_shape(graph, node) {
        return Some(d);
    }
    if dependency_ends(graph, &node.id).is_none() {
        return Some(Diagnostic::error(
            DiagnosticKind::DependencyEnds,
            &node.id,
            format!(
                "{} needs exactly one owner and one weak entity as ends",
                name_of(node)
            ),
        ));
    }
    let keys = key_attributes_of(graph, &node.id);
    match node.kind {
        NodeKind::IdentifyingDependentRelation => {
            let via_transition = keys
                .iter()
                .filter(|(_, e)| e.kind == EdgeKind::Transition)
                .count();
            (keys.len() != 1 || via_transition != 1).then(|| {
                Diagnostic::error(
                    DiagnosticKind::IdentifyingKey,
                    &node.id,
                    format!(
                        "{} needs exactly one key attribute linked by a transition edge, found {}",
                        name_of(node),
                        keys.len()
                    ),
                )
            })
        }
        _ => (!keys.is_empty()).then(|| {
            Diagnostic::error(
                DiagnosticKind::ForbiddenKey,
                &node.id,
                format!("{} may not declare a key attribute", name_of(node)),
            )
        }),
    }
}

// Attributes

struct AttributeShape {
    neighbors: &'static [NodeKind],
    edges: &'static [EdgeKind],
    composite: bool,
}

const PLAIN_SHAPE: AttributeShape = AttributeShape {
    neighbors: &[
        NodeKind::Entity,
        NodeKind::WeakEntity,
        NodeKind::Relation,
        NodeKind::Attribute,
        NodeKind::KeyAttribute,
    ],
    edges: &[EdgeKind::Transition, EdgeKind::Optional],
    composite: true,
};

const KEY_SHAPE: AttributeShape = AttributeShape {
    neighbors: &[
        NodeKind::Entity,
        NodeKind::WeakEntity,
        NodeKind::Relation,
        NodeKind::ExistenceDependentRelation,
        NodeKind::IdentifyingDependentRelation,
        NodeKind::Attribute,
    ],
    edges: &[EdgeKind::Transition, EdgeKind::Optional],
    composite: true,
};

const ALTERNATIVE_KEY_SHAPE: AttributeShape = AttributeShape {
    neighbors: &[NodeKind::Entity, NodeKind::WeakEntity, NodeKind::Attribute],
    edges: &[EdgeKind::Transition, EdgeKind::Optional],
    composite: false,
};

const MULTI_VALUED_SHAPE: AttributeShape = AttributeShape {
    neighbors: &[NodeKind::Entity, NodeKind::WeakEntity, NodeKind::Attribute],
    edges: &[EdgeKind::Transition],
    composite: false,
};

const DERIVED_SHAPE: AttributeShape = AttributeShape {
    neighbors: &[NodeKind::Entity, NodeKind::WeakEntity, NodeKind::Relation],
    edges: &[EdgeKind::Transition, EdgeKind::Optional],
    composite: false,
};

fn attribute_shape(graph: &Graph, node: &Node, shape: &AttributeShape) -> Option<Diagnostic> {
    if let Some(d) = isolated(graph, node) {
        return Some(d);
    }
    let neighbors = neighbors_of(graph, &node.id);
    if let Some((other, _)) = neighbors
        .iter()
        .find(|(other, _)| !shape.neighbors.contains(&other.kind))
    {
        return Some(Diagnostic::error(
            DiagnosticKind::WrongNeighbor,
            &node.id,
            format!("{} cannot be attached to {}", name_of(node), name_of(other)),
        ));
    }
    if let Some((_, edge)) = neighbors
        .iter()
        .find(|(_, edge)| !shape.edges.contains(&edge.kind))
    {
        return Some(Diagnostic::error(
            DiagnosticKind::WrongEdge,
            &node.id,
            format!(
                "{} cannot use a {} edge (`{}`)",
                name_of(node),
                edge.kind.describe(),
                edge.id
            ),
        ));
    }
    if !shape.composite && !children_of(graph, &node.id).is_empty() {
        return Some(Diagnostic::error(
            DiagnosticKind::CompositeNotAllowed,
            &node.id,
            format!("{} cannot have member attributes", name_of(node)),
        ));
    }
    let owners = attribute_root_owners(graph, &node.id);
    match owners.len() {
        0 => Some(Diagnostic::error(
            DiagnosticKind::Detached,
            &node.id,
            format!("{} does not belong to any entity or relation", name_of(node)),
        )),
        1 => None,
        _ => Some(Diagnostic::error(
            DiagnosticKind::AmbiguousOwner,
            &node.id,
            format!(
                "{} is shared by {}",
                name_of(node),
                owners.into_iter().collect::<Vec<_>>().join(", ")
            ),
        )),
    }
}

/// Leaves become columns and must carry `name:TYPE`.
fn leaf_label(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    if !children_of(graph, &node.id).is_empty() {
        return None;
    }
    parse_typed_label(node).err().map(|e| {
        Diagnostic::error(DiagnosticKind::MalformedLabel, &node.id, e.to_string())
    })
}

fn attribute_rule(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    attribute_shape(graph, node, &PLAIN_SHAPE).or_else(|| leaf_label(graph, node))
}

fn key_rule(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    if let Some(d) = attribute_shape(graph, node, &KEY_SHAPE) {
        return Some(d);
    }
    for (other, edge) in neighbors_of(graph, &node.id) {
        if edge.kind == EdgeKind::Optional && other.kind.is_root() {
            return Some(Diagnostic::error(
                DiagnosticKind::WrongEdge,
                &node.id,
                format!(
                    "{} cannot be optional on {}",
                    name_of(node),
                    name_of(other)
                ),
            ));
        }
        if edge.target == node.id && other.kind.is_attribute() {
            return Some(Diagnostic::error(
                DiagnosticKind::NestedKey,
                &node.id,
                format!("{} cannot be nested under {}", name_of(node), name_of(other)),
            ));
        }
    }
    leaf_label(graph, node)
}

fn alternative_key_rule(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    attribute_shape(graph, node, &ALTERNATIVE_KEY_SHAPE).or_else(|| leaf_label(graph, node))
}

fn multi_valued_rule(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    attribute_shape(graph, node, &MULTI_VALUED_SHAPE).or_else(|| leaf_label(graph, node))
}

fn derived_rule(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    if let Some(d) = attribute_shape(graph, node, &DERIVED_SHAPE) {
        return Some(d);
    }
    if let Some(edge) = graph.edges_touching(&node.id).find(|e| e.source == node.id) {
        return Some(Diagnostic::error(
            DiagnosticKind::NotLeaf,
            &node.id,
            format!(
                "{} must be a leaf but has outgoing edge `{}`",
                name_of(node),
                edge.id
            ),
        ));
    }
    let has_equation = node.equation.as_deref().is_some_and(|e| !e.trim().is_empty());
    if !has_equation {
        return Some(Diagnostic::error(
            DiagnosticKind::MissingEquation,
            &node.id,
            format!("{} has no equation", name_of(node)),
        ));
    }
    leaf_label(graph, node)
}

// Specializations

fn specialization_rule(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    if let Some(d) = isolated(graph, node) {
        return Some(d);
    }
    if let Some(edge) = graph
        .edges_touching(&node.id)
        .find(|e| e.kind != EdgeKind::Transition && !e.kind.is_constraint())
    {
        return Some(Diagnostic::error(
            DiagnosticKind::WrongEdge,
            &node.id,
            format!(
                "{} only accepts transition edges, found {} edge `{}`",
                name_of(node),
                edge.kind.describe(),
                edge.id
            ),
        ));
    }
    let linked: Vec<&Node> = neighbors_of(graph, &node.id)
        .into_iter()
        .filter(|(_, e)| e.kind == EdgeKind::Transition)
        .map(|(n, _)| n)
        .collect();
    if let Some(other) = linked.iter().find(|n| !n.kind.is_entity()) {
        return Some(Diagnostic::error(
            DiagnosticKind::WrongNeighbor,
            &node.id,
            format!("{} cannot be linked to {}", name_of(node), name_of(other)),
        ));
    }
    if linked.len() < 2 {
        return Some(Diagnostic::error(
            DiagnosticKind::TooFewEntities,
            &node.id,
            format!("{} needs a parent and at least one child", name_of(node)),
        ));
    }
    match specialization_parents(graph, &node.id).len() {
        0 => {
            return Some(Diagnostic::error(
                DiagnosticKind::MissingParent,
                &node.id,
                format!("{} has no parent entity", name_of(node)),
            ));
        }
        1 => {}
        n => {
            return Some(Diagnostic::error(
                DiagnosticKind::MultipleParents,
                &node.id,
                format!("{} has {n} parent entities", name_of(node)),
            ));
        }
    }
    if let Some(weak) = specialization_children(graph, &node.id)
        .into_iter()
        .find(|c| c.kind == NodeKind::WeakEntity)
    {
        return Some(Diagnostic::error(
            DiagnosticKind::WeakSubclass,
            &node.id,
            format!("{} cannot be a subclass of {}", name_of(weak), name_of(node)),
        ));
    }
    constraint_mismatch(graph, node)
}

fn constraint_mismatch(graph: &Graph, node: &Node) -> Option<Diagnostic> {
    let (Some(exclusive), Some(total)) = (node.kind.is_exclusive(), node.kind.is_total()) else {
        return None;
    };
    graph
        .edges_touching(&node.id)
        .find(|e| match e.kind {
            EdgeKind::Exclusion | EdgeKind::Disjointness => !exclusive,
            EdgeKind::Overlap => exclusive,
            EdgeKind::Inclusion => !total,
            EdgeKind::Transition | EdgeKind::Weighted | EdgeKind::Optional => false,
        })
        .map(|e| {
            Diagnostic::warning(
                DiagnosticKind::ConstraintMismatch,
                &node.id,
                format!(
                    "{} edge `{}` contradicts {}",
                    e.kind.describe(),
                    e.id,
                    name_of(node)
                ),
            )
        })
}

// Graph-wide

/// Table name a node produces, if any.
fn table_name(graph: &Graph, node: &Node) -> Option<String> {
    match node.kind {
        NodeKind::Entity | NodeKind::WeakEntity => Some(node.safe_name()),
        NodeKind::Relation => {
            (cardinality_of(graph, &node.id) == Cardinality::ManyToMany).then(|| node.safe_name())
        }
        NodeKind::MultiValuedAttribute => {
            let owners = attribute_root_owners(graph, &node.id);
            let owner = graph.node(owners.first()?)?;
            Some(format!("{}_{}", owner.safe_name(), attribute_name(node)))
        }
        _ => None,
    }
}

fn table_name_clashes(graph: &Graph) -> Vec<Diagnostic> {
    let mut seen: HashMap<String, &Node> = HashMap::new();
    let mut diagnostics = Vec::new();
    for node in graph.nodes() {
        let Some(name) = table_name(graph, node) else {
            continue;
        };
        if name.is_empty() {
            diagnostics.push(Diagnostic::error(
                DiagnosticKind::MalformedLabel,
                &node.id,
                format!("{} `{}` needs a name to become a table", node.kind.describe(), node.id),
            ));
            continue;
        }
        if let Some(first) = seen.get(&name.to_lowercase()) {
            diagnostics.push(Diagnostic::error(
                DiagnosticKind::NameClash,
                &node.id,
                format!(
                    "{} produces table `{name}`, already produced by {}",
                    name_of(node),
                    name_of(first)
                ),
            ));
        } else {
            seen.insert(name.to_lowercase(), node);
        }
    }
    diagnostics
}
