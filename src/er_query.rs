//! Read-only traversal helpers over an ER [`Graph`].
//!
//! Every function here is a pure lookup: nothing is cached between calls and
//! the graph is never mutated.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;

use crate::er_graph::{Edge, EdgeKind, Graph, Node, NodeKind, strip_whitespace};
use crate::error::SynthesisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Unrelated,
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Unrelated => write!(f, "-"),
            Cardinality::OneToOne => write!(f, "1:1"),
            Cardinality::OneToMany => write!(f, "1:N"),
            Cardinality::ManyToMany => write!(f, "N:M"),
        }
    }
}

/// Parsed `(min..max)` cardinality label; `max == None` means `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participation {
    pub min: u32,
    pub max: Option<u32>,
}

impl Participation {
    pub fn is_mandatory(&self) -> bool {
        self.min >= 1
    }
}

/// A `name:TYPE` pair taken from an attribute label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    pub fn prefixed(&self, prefix: &str) -> Column {
        Column::new(format!("{prefix}_{}", self.name), self.data_type.clone())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.data_type)
    }
}

/// A column pointing at another table's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignColumn {
    /// Name and type in the referencing table.
    pub column: Column,
    /// Column name in the referenced table.
    pub references: String,
}

/// Where an entity's identity comes from.
#[derive(Debug, Clone, Copy)]
pub enum IdentitySource<'g> {
    /// Strong entity with its own key attribute.
    OwnKey(&'g Node),
    /// Weak entity: owner identity, plus a partial key unless the dependency is 1:1.
    Dependent {
        relation: &'g Node,
        owner: &'g Node,
        partial_key: Option<&'g Node>,
    },
    /// Specialization child: the parent's identity, unchanged.
    Subclass {
        specialization: &'g Node,
        parent: &'g Node,
    },
}

/// Opposite endpoint and edge for every edge touching `node_id`, regardless of
/// direction. Edges pointing at missing nodes are skipped.
pub fn neighbors_of<'g>(graph: &'g Graph, node_id: &str) -> Vec<(&'g Node, &'g Edge)> {
    graph
        .edges_touching(node_id)
        .filter_map(|edge| {
            let other = edge.other_end(node_id)?;
            graph.node(other).map(|n| (n, edge))
        })
        .collect()
}

pub fn connected_attributes_of<'g>(graph: &'g Graph, node_id: &str) -> Vec<(&'g Node, &'g Edge)> {
    neighbors_of(graph, node_id)
        .into_iter()
        .filter(|(n, _)| n.kind.is_attribute())
        .collect()
}

/// Relations touching `node_id`, each listed once even when several edges
/// lead to it.
pub fn connected_relations_of<'g>(graph: &'g Graph, node_id: &str) -> Vec<&'g Node> {
    let mut seen = HashSet::new();
    neighbors_of(graph, node_id)
        .into_iter()
        .filter(|(n, _)| n.kind.is_relation())
        .filter(|(n, _)| seen.insert(n.id.clone()))
        .map(|(n, _)| n)
        .collect()
}

/// Entity ends of a relation. A reflexive relation lists the same entity once
/// per edge.
pub fn connected_entities_of<'g>(graph: &'g Graph, relation_id: &str) -> Vec<(&'g Node, &'g Edge)> {
    neighbors_of(graph, relation_id)
        .into_iter()
        .filter(|(n, _)| n.kind.is_entity())
        .collect()
}

pub fn cardinality_label_of(edge: &Edge) -> &str {
    match edge.kind {
        EdgeKind::Weighted => edge.label.as_deref().unwrap_or(""),
        _ => "",
    }
}

pub fn is_many(label: &str) -> bool {
    label.contains("..N")
}

pub fn cardinality_of(graph: &Graph, relation_id: &str) -> Cardinality {
    let labels: Vec<&str> = graph
        .edges_touching(relation_id)
        .filter(|e| e.kind == EdgeKind::Weighted)
        .map(cardinality_label_of)
        .collect();
    let many = labels.iter().filter(|l| is_many(l)).count();
    match (labels.len(), many) {
        (0, _) => Cardinality::Unrelated,
        (_, m) if m >= 2 => Cardinality::ManyToMany,
        (_, 1) => Cardinality::OneToMany,
        _ => Cardinality::OneToOne,
    }
}

/// Parses `(0..N)`, `(1..1)`, `0..5` and the like.
pub fn parse_cardinality_label(label: &str) -> Option<Participation> {
    let inner = label.trim();
    let inner = inner
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(inner);
    let (min, max) = inner.split_once("..")?;
    let min: u32 = min.trim().parse().ok()?;
    let max = match max.trim() {
        "N" => None,
        digits => {
            let max: u32 = digits.parse().ok()?;
            if max == 0 || max < min {
                return None;
            }
            Some(max)
        }
    };
    Some(Participation { min, max })
}

pub fn is_mandatory(edge: &Edge) -> bool {
    parse_cardinality_label(cardinality_label_of(edge)).is_some_and(|p| p.is_mandatory())
}

pub fn key_attributes_of<'g>(graph: &'g Graph, node_id: &str) -> Vec<(&'g Node, &'g Edge)> {
    connected_attributes_of(graph, node_id)
        .into_iter()
        .filter(|(n, _)| n.kind == NodeKind::KeyAttribute)
        .collect()
}

/// First key attribute touching `node_id`. `None` is not an error here.
pub fn primary_key_of<'g>(graph: &'g Graph, node_id: &str) -> Option<&'g Node> {
    key_attributes_of(graph, node_id).first().map(|(n, _)| *n)
}

/// The entity at the other end of a binary relation. For a reflexive relation
/// that is `known_id` itself.
pub fn find_other_entity<'g>(
    graph: &'g Graph,
    relation_id: &str,
    known_id: &str,
) -> Result<&'g Node, SynthesisError> {
    let ends = connected_entities_of(graph, relation_id);
    if ends.len() < 2 {
        return Err(SynthesisError::TooFewEntities(relation_id.to_string()));
    }
    ends.iter()
        .map(|(n, _)| *n)
        .find(|n| n.id != known_id)
        .or_else(|| ends.iter().map(|(n, _)| *n).find(|n| n.id == known_id))
        .ok_or_else(|| SynthesisError::TooFewEntities(relation_id.to_string()))
}

/// `(owner, dependent)` of a dependency relation.
///
/// The dependent end is the one whose edge leaves the relation; when both or
/// neither edges do, the single weak-entity end is the dependent.
pub fn dependency_ends<'g>(graph: &'g Graph, relation_id: &str) -> Option<(&'g Node, &'g Node)> {
    let ends = connected_entities_of(graph, relation_id);
    let [(a, edge_a), (b, edge_b)] = ends.as_slice() else {
        return None;
    };
    let (a, b) = (*a, *b);
    if a.id == b.id {
        return None;
    }
    let a_out = edge_a.source == relation_id;
    let b_out = edge_b.source == relation_id;
    match (a_out, b_out) {
        (true, false) if a.kind == NodeKind::WeakEntity => return Some((b, a)),
        (false, true) if b.kind == NodeKind::WeakEntity => return Some((a, b)),
        _ => {}
    }
    match (a.kind == NodeKind::WeakEntity, b.kind == NodeKind::WeakEntity) {
        (true, false) => Some((b, a)),
        (false, true) => Some((a, b)),
        _ => None,
    }
}

/// Dependency relations for which `weak_id` is the dependent end.
pub fn dependencies_of<'g>(graph: &'g Graph, weak_id: &str) -> Vec<&'g Node> {
    connected_relations_of(graph, weak_id)
        .into_iter()
        .filter(|r| r.kind.is_dependency())
        .filter(|r| dependency_ends(graph, &r.id).is_some_and(|(_, d)| d.id == weak_id))
        .collect()
}

pub fn dependency_of<'g>(graph: &'g Graph, weak_id: &str) -> Option<&'g Node> {
    dependencies_of(graph, weak_id).into_iter().next()
}

/// Entities with an edge into the specialization.
pub fn specialization_parents<'g>(graph: &'g Graph, spec_id: &str) -> Vec<&'g Node> {
    graph
        .edges_touching(spec_id)
        .filter(|e| e.target == spec_id && !e.kind.is_constraint())
        .filter_map(|e| graph.node(&e.source))
        .filter(|n| n.kind.is_entity())
        .collect()
}

pub fn specialization_parent<'g>(graph: &'g Graph, spec_id: &str) -> Option<&'g Node> {
    specialization_parents(graph, spec_id).into_iter().next()
}

/// Entities the specialization points at, in edge order, without repeats.
pub fn specialization_children<'g>(graph: &'g Graph, spec_id: &str) -> Vec<&'g Node> {
    let mut seen = HashSet::new();
    graph
        .edges_touching(spec_id)
        .filter(|e| e.source == spec_id && e.target != spec_id && !e.kind.is_constraint())
        .filter_map(|e| graph.node(&e.target))
        .filter(|n| n.kind.is_entity())
        .filter(|n| seen.insert(n.id.clone()))
        .collect()
}

/// Specializations that list `entity_id` as a child, without repeats.
pub fn parent_specializations_of<'g>(graph: &'g Graph, entity_id: &str) -> Vec<&'g Node> {
    let mut seen = HashSet::new();
    graph
        .edges_touching(entity_id)
        .filter(|e| e.target == entity_id && !e.kind.is_constraint())
        .filter_map(|e| graph.node(&e.source))
        .filter(|n| n.kind.is_specialization())
        .filter(|n| seen.insert(n.id.clone()))
        .collect()
}

/// The specialization that lists `entity_id` as a child, if any.
pub fn parent_specialization_of<'g>(graph: &'g Graph, entity_id: &str) -> Option<&'g Node> {
    parent_specializations_of(graph, entity_id).into_iter().next()
}

/// Members of a composite attribute (edges attribute → attribute).
pub fn children_of<'g>(graph: &'g Graph, attribute_id: &str) -> Vec<(&'g Node, &'g Edge)> {
    graph
        .edges_touching(attribute_id)
        .filter(|e| e.source == attribute_id && e.target != attribute_id)
        .filter_map(|e| graph.node(&e.target).map(|n| (n, e)))
        .filter(|(n, _)| n.kind.is_attribute())
        .collect()
}

/// Ids of every entity or relation reachable from the attribute through
/// attribute nodes only.
pub fn attribute_root_owners(graph: &Graph, attribute_id: &str) -> BTreeSet<String> {
    let mut roots = BTreeSet::new();
    let mut visited = HashSet::from([attribute_id.to_string()]);
    let mut queue = VecDeque::from([attribute_id.to_string()]);
    while let Some(current) = queue.pop_front() {
        for (other, _) in neighbors_of(graph, &current) {
            if other.kind.is_root() {
                roots.insert(other.id.clone());
            } else if other.kind.is_attribute() && visited.insert(other.id.clone()) {
                queue.push_back(other.id.clone());
            }
        }
    }
    roots
}

/// Splits a `name:TYPE` label. The name loses its whitespace, the type is
/// trimmed and uppercased.
pub fn parse_typed_label(node: &Node) -> Result<Column, SynthesisError> {
    let malformed = || SynthesisError::MalformedLabel {
        node: node.id.clone(),
        label: node.label.clone(),
    };
    let (name, data_type) = node.label.split_once(':').ok_or_else(malformed)?;
    let name = strip_whitespace(name);
    let data_type = data_type.trim().to_uppercase();
    if name.is_empty() || data_type.is_empty() {
        return Err(malformed());
    }
    Ok(Column { name, data_type })
}

/// Name part of an attribute label, with or without a type.
pub fn attribute_name(node: &Node) -> String {
    match node.label.split_once(':') {
        Some((name, _)) => strip_whitespace(name),
        None => node.safe_name(),
    }
}

/// Columns an attribute expands to: itself when simple, its leaf members when
/// composite. Member names are not prefixed.
pub fn leaf_columns(graph: &Graph, attribute: &Node) -> Result<Vec<Column>, SynthesisError> {
    let mut columns = Vec::new();
    let mut visited = HashSet::new();
    collect_leaf_columns(graph, attribute, &mut visited, &mut columns)?;
    Ok(columns)
}

fn collect_leaf_columns(
    graph: &Graph,
    attribute: &Node,
    visited: &mut HashSet<String>,
    columns: &mut Vec<Column>,
) -> Result<(), SynthesisError> {
    if !visited.insert(attribute.id.clone()) {
        return Ok(());
    }
    let children = children_of(graph, &attribute.id);
    if children.is_empty() {
        columns.push(parse_typed_label(attribute)?);
    }
    for (child, _) in children {
        collect_leaf_columns(graph, child, visited, columns)?;
    }
    Ok(())
}

pub fn identity_source<'g>(
    graph: &'g Graph,
    entity: &'g Node,
) -> Result<IdentitySource<'g>, SynthesisError> {
    match entity.kind {
        NodeKind::Entity => {
            if let Some(specialization) = parent_specialization_of(graph, &entity.id) {
                let parent = specialization_parent(graph, &specialization.id)
                    .ok_or_else(|| SynthesisError::MissingParent(specialization.id.clone()))?;
                return Ok(IdentitySource::Subclass {
                    specialization,
                    parent,
                });
            }
            primary_key_of(graph, &entity.id)
                .map(IdentitySource::OwnKey)
                .ok_or_else(|| SynthesisError::MissingPrimaryKey(entity.id.clone()))
        }
        NodeKind::WeakEntity => {
            let relation = dependency_of(graph, &entity.id)
                .ok_or_else(|| SynthesisError::MissingDependency(entity.id.clone()))?;
            let owner = find_other_entity(graph, &relation.id, &entity.id)?;
            let partial_key = match cardinality_of(graph, &relation.id) {
                Cardinality::OneToOne => None,
                Cardinality::Unrelated | Cardinality::OneToMany | Cardinality::ManyToMany => {
                    let key = match relation.kind {
                        NodeKind::IdentifyingDependentRelation => primary_key_of(graph, &relation.id),
                        _ => primary_key_of(graph, &entity.id),
                    };
                    Some(key.ok_or_else(|| SynthesisError::MissingPrimaryKey(entity.id.clone()))?)
                }
            };
            Ok(IdentitySource::Dependent {
                relation,
                owner,
                partial_key,
            })
        }
        _ => Err(SynthesisError::NotAnEntity(entity.id.clone())),
    }
}

/// Identity columns of an entity as they are named in its own table,
/// ancestors first.
///
/// A strong entity contributes its key columns unqualified. A weak entity or
/// a subclass inherits the columns that reference its owner (qualified by the
/// owner's name when the owner declares its own key); a weak entity then
/// appends its partial key qualified by its own name. Fails with
/// [`SynthesisError::IdentityCycle`] when the chain loops back on itself.
pub fn identity_columns_of(graph: &Graph, entity_id: &str) -> Result<Vec<Column>, SynthesisError> {
    let mut in_progress = HashSet::new();
    resolve_identity(graph, entity_id, &mut in_progress)
}

/// Columns another table uses to reference `entity_id`'s identity.
pub fn foreign_key_columns(
    graph: &Graph,
    entity_id: &str,
) -> Result<Vec<ForeignColumn>, SynthesisError> {
    let mut in_progress = HashSet::new();
    resolve_references(graph, entity_id, &mut in_progress)
}

fn resolve_identity(
    graph: &Graph,
    entity_id: &str,
    in_progress: &mut HashSet<String>,
) -> Result<Vec<Column>, SynthesisError> {
    let entity = graph
        .node(entity_id)
        .ok_or_else(|| SynthesisError::UnknownNode(entity_id.to_string()))?;
    if !in_progress.insert(entity_id.to_string()) {
        return Err(SynthesisError::IdentityCycle(entity_id.to_string()));
    }
    let columns = match identity_source(graph, entity)? {
        IdentitySource::OwnKey(key) => leaf_columns(graph, key)?,
        IdentitySource::Dependent {
            owner, partial_key, ..
        } => {
            let mut columns: Vec<Column> = resolve_references(graph, &owner.id, in_progress)?
                .into_iter()
                .map(|f| f.column)
                .collect();
            if let Some(key) = partial_key {
                let prefix = entity.safe_name();
                columns.extend(leaf_columns(graph, key)?.iter().map(|c| c.prefixed(&prefix)));
            }
            columns
        }
        IdentitySource::Subclass { parent, .. } => resolve_references(graph, &parent.id, in_progress)?
            .into_iter()
            .map(|f| f.column)
            .collect(),
    };
    in_progress.remove(entity_id);
    Ok(columns)
}

fn resolve_references(
    graph: &Graph,
    entity_id: &str,
    in_progress: &mut HashSet<String>,
) -> Result<Vec<ForeignColumn>, SynthesisError> {
    let entity = graph
        .node(entity_id)
        .ok_or_else(|| SynthesisError::UnknownNode(entity_id.to_string()))?;
    let owns_key = matches!(identity_source(graph, entity)?, IdentitySource::OwnKey(_));
    let prefix = entity.safe_name();
    Ok(resolve_identity(graph, entity_id, in_progress)?
        .into_iter()
        .map(|c| ForeignColumn {
            column: if owns_key { c.prefixed(&prefix) } else { c.clone() },
            references: c.name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::er_graph::{Edge, EdgeKind, Graph, Node, NodeKind};

    fn graph(nodes: &[(&str, NodeKind, &str)], edges: &[(&str, &str, EdgeKind, Option<&str>)]) -> Graph {
        let mut g = Graph::new();
        for (id, kind, label) in nodes {
            g.insert_node(Node::new(*id, *kind, *label)).unwrap();
        }
        for (i, (source, target, kind, label)) in edges.iter().enumerate() {
            let mut edge = Edge::new(format!("edge-{i}"), *kind, *source, *target);
            if let Some(label) = label {
                edge = edge.with_label(*label);
            }
            g.insert_edge(edge).unwrap();
        }
        g
    }

    #[test]
    fn neighbors_are_direction_agnostic() {
        let g = graph(
            &[
                ("a", NodeKind::Entity, "A"),
                ("b", NodeKind::Attribute, "x:INT"),
                ("c", NodeKind::Attribute, "y:INT"),
            ],
            &[
                ("a", "b", EdgeKind::Transition, None),
                ("c", "a", EdgeKind::Optional, None),
            ],
        );
        let ids: Vec<&str> = neighbors_of(&g, "a").iter().map(|(n, _)| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn relations_deduplicated() {
        let g = graph(
            &[("a", NodeKind::Entity, "A"), ("r", NodeKind::Relation, "R")],
            &[
                ("a", "r", EdgeKind::Weighted, Some("(0..1)")),
                ("r", "a", EdgeKind::Weighted, Some("(0..N)")),
            ],
        );
        assert_eq!(connected_relations_of(&g, "a").len(), 1);
        assert_eq!(connected_entities_of(&g, "r").len(), 2);
    }

    #[test]
    fn cardinality_classification() {
        let cases: [(&[&str], Cardinality); 5] = [
            (&[], Cardinality::Unrelated),
            (&["(0..N)"], Cardinality::OneToMany),
            (&["(1..N)", "(1..N)"], Cardinality::ManyToMany),
            (&["(1..1)", "(0..1)"], Cardinality::OneToOne),
            (&["(1..1)", "(0..N)"], Cardinality::OneToMany),
        ];
        for (labels, expected) in cases {
            let mut nodes = vec![("r", NodeKind::Relation, "R")];
            let ids: Vec<String> = (0..labels.len()).map(|i| format!("e{i}")).collect();
            for id in &ids {
                nodes.push((id.as_str(), NodeKind::Entity, "E"));
            }
            let edges: Vec<_> = ids
                .iter()
                .zip(labels.iter())
                .map(|(id, label)| (id.as_str(), "r", EdgeKind::Weighted, Some(*label)))
                .collect();
            let g = graph(&nodes, &edges);
            assert_eq!(cardinality_of(&g, "r"), expected, "labels {labels:?}");
        }
    }

    #[test]
    fn cardinality_display() {
        assert_eq!(Cardinality::Unrelated.to_string(), "-");
        assert_eq!(Cardinality::ManyToMany.to_string(), "N:M");
    }

    #[test]
    fn cardinality_label_parsing() {
        assert_eq!(
            parse_cardinality_label("(0..N)"),
            Some(Participation { min: 0, max: None })
        );
        assert_eq!(
            parse_cardinality_label(" 1..1 "),
            Some(Participation { min: 1, max: Some(1) })
        );
        assert_eq!(parse_cardinality_label("(2..1)"), None);
        assert_eq!(parse_cardinality_label("many"), None);
        assert_eq!(parse_cardinality_label(""), None);
    }

    #[test]
    fn cardinality_label_only_on_weighted_edges() {
        let weighted = Edge::new("w", EdgeKind::Weighted, "a", "b").with_label("(0..1)");
        let plain = Edge::new("t", EdgeKind::Transition, "a", "b").with_label("(0..1)");
        assert_eq!(cardinality_label_of(&weighted), "(0..1)");
        assert_eq!(cardinality_label_of(&plain), "");
    }

    #[test]
    fn typed_label_split() {
        let node = Node::new("a", NodeKind::Attribute, "first name : varchar(20)");
        assert_eq!(parse_typed_label(&node).unwrap(), Column::new("firstname", "VARCHAR(20)"));
        let bad = Node::new("b", NodeKind::Attribute, "name");
        assert!(matches!(
            parse_typed_label(&bad),
            Err(SynthesisError::MalformedLabel { .. })
        ));
        let empty_type = Node::new("c", NodeKind::Attribute, "name:  ");
        assert!(parse_typed_label(&empty_type).is_err());
    }

    #[test]
    fn find_other_entity_needs_two_ends() {
        let g = graph(
            &[("a", NodeKind::Entity, "A"), ("r", NodeKind::Relation, "R")],
            &[("a", "r", EdgeKind::Weighted, Some("(0..1)"))],
        );
        assert_eq!(
            find_other_entity(&g, "r", "a").unwrap_err(),
            SynthesisError::TooFewEntities("r".into())
        );
    }

    #[test]
    fn find_other_entity_reflexive_returns_self() {
        let g = graph(
            &[("a", NodeKind::Entity, "A"), ("r", NodeKind::Relation, "R")],
            &[
                ("a", "r", EdgeKind::Weighted, Some("(0..1)")),
                ("a", "r", EdgeKind::Weighted, Some("(0..N)")),
            ],
        );
        assert_eq!(find_other_entity(&g, "r", "a").unwrap().id, "a");
    }

    fn weak_chain() -> Graph {
        graph(
            &[
                ("s", NodeKind::Entity, "S"),
                ("s_id", NodeKind::KeyAttribute, "id:integer"),
                ("a", NodeKind::WeakEntity, "A"),
                ("a_key", NodeKind::KeyAttribute, "num:INTEGER"),
                ("b", NodeKind::WeakEntity, "B"),
                ("b_key", NodeKind::KeyAttribute, "code:CHAR(2)"),
                ("dep_a", NodeKind::ExistenceDependentRelation, "has a"),
                ("dep_b", NodeKind::ExistenceDependentRelation, "has b"),
            ],
            &[
                ("s", "s_id", EdgeKind::Transition, None),
                ("a", "a_key", EdgeKind::Transition, None),
                ("b", "b_key", EdgeKind::Transition, None),
                ("s", "dep_a", EdgeKind::Weighted, Some("(1..1)")),
                ("dep_a", "a", EdgeKind::Weighted, Some("(0..N)")),
                ("a", "dep_b", EdgeKind::Weighted, Some("(1..1)")),
                ("dep_b", "b", EdgeKind::Weighted, Some("(0..N)")),
            ],
        )
    }

    #[test]
    fn identity_of_strong_entity_is_its_key() {
        let g = weak_chain();
        assert_eq!(
            identity_columns_of(&g, "s").unwrap(),
            vec![Column::new("id", "INTEGER")]
        );
    }

    #[test]
    fn identity_of_two_level_weak_chain() {
        let g = weak_chain();
        assert_eq!(
            identity_columns_of(&g, "b").unwrap(),
            vec![
                Column::new("S_id", "INTEGER"),
                Column::new("A_num", "INTEGER"),
                Column::new("B_code", "CHAR(2)"),
            ]
        );
    }

    #[test]
    fn dependency_ends_follow_edge_direction() {
        let g = weak_chain();
        let (owner, dependent) = dependency_ends(&g, "dep_b").unwrap();
        assert_eq!((owner.id.as_str(), dependent.id.as_str()), ("a", "b"));
        assert_eq!(dependency_of(&g, "a").unwrap().id, "dep_a");
    }

    #[test]
    fn foreign_key_columns_qualify_strong_owner() {
        let g = weak_chain();
        let refs = foreign_key_columns(&g, "s").unwrap();
        assert_eq!(refs[0].column, Column::new("S_id", "INTEGER"));
        assert_eq!(refs[0].references, "id");
        let refs = foreign_key_columns(&g, "a").unwrap();
        let names: Vec<(&str, &str)> = refs
            .iter()
            .map(|f| (f.column.name.as_str(), f.references.as_str()))
            .collect();
        assert_eq!(names, vec![("S_id", "S_id"), ("A_num", "A_num")]);
    }

    #[test]
    fn one_to_one_dependency_has_no_partial_key() {
        let mut g = weak_chain();
        let edge_id = g
            .edges()
            .iter()
            .find(|e| e.source == "dep_a" && e.target == "a")
            .unwrap()
            .id
            .clone();
        g.rename(&edge_id, "(0..1)").unwrap();
        assert_eq!(
            identity_columns_of(&g, "a").unwrap(),
            vec![Column::new("S_id", "INTEGER")]
        );
    }

    #[test]
    fn identifying_dependency_uses_relation_key() {
        let g = graph(
            &[
                ("o", NodeKind::Entity, "Order"),
                ("o_id", NodeKind::KeyAttribute, "id:INTEGER"),
                ("line", NodeKind::WeakEntity, "Line"),
                ("dep", NodeKind::IdentifyingDependentRelation, "contains"),
                ("pos", NodeKind::KeyAttribute, "pos:SMALLINT"),
            ],
            &[
                ("o", "o_id", EdgeKind::Transition, None),
                ("o", "dep", EdgeKind::Weighted, Some("(1..1)")),
                ("dep", "line", EdgeKind::Weighted, Some("(1..N)")),
                ("dep", "pos", EdgeKind::Transition, None),
            ],
        );
        assert_eq!(
            identity_columns_of(&g, "line").unwrap(),
            vec![
                Column::new("Order_id", "INTEGER"),
                Column::new("Line_pos", "SMALLINT"),
            ]
        );
    }

    #[test]
    fn weak_cycle_is_reported() {
        let g = graph(
            &[
                ("a", NodeKind::WeakEntity, "A"),
                ("a_key", NodeKind::KeyAttribute, "x:INT"),
                ("b", NodeKind::WeakEntity, "B"),
                ("b_key", NodeKind::KeyAttribute, "y:INT"),
                ("ab", NodeKind::ExistenceDependentRelation, "ab"),
                ("ba", NodeKind::ExistenceDependentRelation, "ba"),
            ],
            &[
                ("a", "a_key", EdgeKind::Transition, None),
                ("b", "b_key", EdgeKind::Transition, None),
                ("a", "ab", EdgeKind::Weighted, Some("(1..1)")),
                ("ab", "b", EdgeKind::Weighted, Some("(0..N)")),
                ("b", "ba", EdgeKind::Weighted, Some("(1..1)")),
                ("ba", "a", EdgeKind::Weighted, Some("(0..N)")),
            ],
        );
        assert!(matches!(
            identity_columns_of(&g, "a"),
            Err(SynthesisError::IdentityCycle(_))
        ));
    }

    #[test]
    fn subclass_inherits_parent_identity() {
        let g = graph(
            &[
                ("v", NodeKind::Entity, "Vehicle"),
                ("vin", NodeKind::KeyAttribute, "vin:CHAR(17)"),
                ("spec", NodeKind::TotalExclusiveSpecialization, "kind"),
                ("car", NodeKind::Entity, "Car"),
                ("sedan_spec", NodeKind::PartialOverlappedSpecialization, "body"),
                ("sedan", NodeKind::Entity, "Sedan"),
            ],
            &[
                ("v", "vin", EdgeKind::Transition, None),
                ("v", "spec", EdgeKind::Transition, None),
                ("spec", "car", EdgeKind::Transition, None),
                ("car", "sedan_spec", EdgeKind::Transition, None),
                ("sedan_spec", "sedan", EdgeKind::Transition, None),
            ],
        );
        assert_eq!(
            identity_columns_of(&g, "car").unwrap(),
            vec![Column::new("Vehicle_vin", "CHAR(17)")]
        );
        let refs = foreign_key_columns(&g, "sedan").unwrap();
        assert_eq!(refs[0].column.name, "Vehicle_vin");
        assert_eq!(refs[0].references, "Vehicle_vin");
    }

    #[test]
    fn composite_key_expands_members() {
        let g = graph(
            &[
                ("p", NodeKind::Entity, "Person"),
                ("k", NodeKind::KeyAttribute, "full name"),
                ("f", NodeKind::Attribute, "first:VARCHAR(20)"),
                ("l", NodeKind::Attribute, "last:VARCHAR(20)"),
            ],
            &[
                ("p", "k", EdgeKind::Transition, None),
                ("k", "f", EdgeKind::Transition, None),
                ("k", "l", EdgeKind::Transition, None),
            ],
        );
        let key = primary_key_of(&g, "p").unwrap();
        let names: Vec<String> = leaf_columns(&g, key).unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["first", "last"]);
    }

    #[test]
    fn root_owners_cross_composites() {
        let g = graph(
            &[
                ("a", NodeKind::Entity, "A"),
                ("b", NodeKind::Entity, "B"),
                ("addr", NodeKind::Attribute, "address"),
                ("street", NodeKind::Attribute, "street:TEXT"),
            ],
            &[
                ("a", "addr", EdgeKind::Transition, None),
                ("addr", "street", EdgeKind::Transition, None),
                ("b", "street", EdgeKind::Transition, None),
            ],
        );
        let owners: Vec<String> = attribute_root_owners(&g, "street").into_iter().collect();
        assert_eq!(owners, vec!["a", "b"]);
    }
}
