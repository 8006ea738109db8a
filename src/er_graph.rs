use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, SynthesisError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Entity,
    WeakEntity,
    Relation,
    ExistenceDependentRelation,
    IdentifyingDependentRelation,
    PartialExclusiveSpecialization,
    PartialOverlappedSpecialization,
    TotalExclusiveSpecialization,
    TotalOverlappedSpecialization,
    Attribute,
    KeyAttribute,
    AlternativeKeyAttribute,
    MultiValuedAttribute,
    DerivedAttribute,
}

impl NodeKind {
    pub fn is_entity(self) -> bool {
        matches!(self, NodeKind::Entity | NodeKind::WeakEntity)
    }

    pub fn is_relation(self) -> bool {
        matches!(
            self,
            NodeKind::Relation
                | NodeKind::ExistenceDependentRelation
                | NodeKind::IdentifyingDependentRelation
        )
    }

    pub fn is_dependency(self) -> bool {
        matches!(
            self,
            NodeKind::ExistenceDependentRelation | NodeKind::IdentifyingDependentRelation
        )
    }

    pub fn is_specialization(self) -> bool {
        matches!(
            self,
            NodeKind::PartialExclusiveSpecialization
                | NodeKind::PartialOverlappedSpecialization
                | NodeKind::TotalExclusiveSpecialization
                | NodeKind::TotalOverlappedSpecialization
        )
    }

    pub fn is_attribute(self) -> bool {
        matches!(
            self,
            NodeKind::Attribute
                | NodeKind::KeyAttribute
                | NodeKind::AlternativeKeyAttribute
                | NodeKind::MultiValuedAttribute
                | NodeKind::DerivedAttribute
        )
    }

    /// Entity or relation: the elements attributes hang off.
    pub fn is_root(self) -> bool {
        self.is_entity() || self.is_relation()
    }

    /// `Some(true)` for exclusive specializations, `Some(false)` for
    /// overlapped ones, `None` for every other kind.
    pub fn is_exclusive(self) -> Option<bool> {
        match self {
            NodeKind::PartialExclusiveSpecialization | NodeKind::TotalExclusiveSpecialization => {
                Some(true)
            }
            NodeKind::PartialOverlappedSpecialization | NodeKind::TotalOverlappedSpecialization => {
                Some(false)
            }
            NodeKind::Entity
            | NodeKind::WeakEntity
            | NodeKind::Relation
            | NodeKind::ExistenceDependentRelation
            | NodeKind::IdentifyingDependentRelation
            | NodeKind::Attribute
            | NodeKind::KeyAttribute
            | NodeKind::AlternativeKeyAttribute
            | NodeKind::MultiValuedAttribute
            | NodeKind::DerivedAttribute => None,
        }
    }

    /// `Some(true)` for total specializations, `Some(false)` for partial
    /// ones, `None` for every other kind.
    pub fn is_total(self) -> Option<bool> {
        match self {
            NodeKind::TotalExclusiveSpecialization | NodeKind::TotalOverlappedSpecialization => {
                Some(true)
            }
            NodeKind::PartialExclusiveSpecialization | NodeKind::PartialOverlappedSpecialization => {
                Some(false)
            }
            NodeKind::Entity
            | NodeKind::WeakEntity
            | NodeKind::Relation
            | NodeKind::ExistenceDependentRelation
            | NodeKind::IdentifyingDependentRelation
            | NodeKind::Attribute
            | NodeKind::KeyAttribute
            | NodeKind::AlternativeKeyAttribute
            | NodeKind::MultiValuedAttribute
            | NodeKind::DerivedAttribute => None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            NodeKind::Entity => "entity",
            NodeKind::WeakEntity => "weak entity",
            NodeKind::Relation => "relation",
            NodeKind::ExistenceDependentRelation => "existence-dependent relation",
            NodeKind::IdentifyingDependentRelation => "identifying-dependent relation",
            NodeKind::PartialExclusiveSpecialization => "partial exclusive specialization",
            NodeKind::PartialOverlappedSpecialization => "partial overlapped specialization",
            NodeKind::TotalExclusiveSpecialization => "total exclusive specialization",
            NodeKind::TotalOverlappedSpecialization => "total overlapped specialization",
            NodeKind::Attribute => "attribute",
            NodeKind::KeyAttribute => "key attribute",
            NodeKind::AlternativeKeyAttribute => "alternative key attribute",
            NodeKind::MultiValuedAttribute => "multi-valued attribute",
            NodeKind::DerivedAttribute => "derived attribute",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    #[default]
    Transition,
    Weighted,
    Optional,
    Exclusion,
    Inclusion,
    Disjointness,
    Overlap,
}

impl EdgeKind {
    /// Specialization constraint markers; never consumed by synthesis.
    pub fn is_constraint(self) -> bool {
        matches!(
            self,
            EdgeKind::Exclusion | EdgeKind::Inclusion | EdgeKind::Disjointness | EdgeKind::Overlap
        )
    }

    pub fn describe(self) -> &'static str {
        match self {
            EdgeKind::Transition => "transition",
            EdgeKind::Weighted => "weighted",
            EdgeKind::Optional => "optional",
            EdgeKind::Exclusion => "exclusion",
            EdgeKind::Inclusion => "inclusion",
            EdgeKind::Disjointness => "disjointness",
            EdgeKind::Overlap => "overlap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equation: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            equation: None,
        }
    }

    pub fn with_equation(mut self, equation: impl Into<String>) -> Self {
        self.equation = Some(equation.into());
        self
    }

    /// Label with all whitespace removed; used for table and column names.
    pub fn safe_name(&self) -> String {
        strip_whitespace(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    #[serde(default)]
    pub kind: EdgeKind,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        kind: EdgeKind,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            source: source.into(),
            target: target.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The endpoint opposite to `node_id`, or `None` when the edge does not
    /// touch it. A self-loop returns the node itself.
    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.source == node_id {
            Some(&self.target)
        } else if self.target == node_id {
            Some(&self.source)
        } else {
            None
        }
    }
}

pub fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// One diagram snapshot: owns every node and edge, everything else refers to
/// them by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "GraphDocument", into = "GraphDocument")]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_index: HashMap<String, usize>,
    edge_index: HashMap<String, usize>,
    adjacency: HashMap<String, Vec<usize>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GraphDocument {
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl TryFrom<GraphDocument> for Graph {
    type Error = GraphError;

    fn try_from(doc: GraphDocument) -> Result<Self, Self::Error> {
        let mut graph = Graph::new();
        for node in doc.nodes {
            graph.insert_node(node)?;
        }
        for edge in doc.edges {
            graph.insert_edge(edge)?;
        }
        Ok(graph)
    }
}

impl From<Graph> for GraphDocument {
    fn from(graph: Graph) -> Self {
        GraphDocument {
            nodes: graph.nodes,
            edges: graph.edges,
        }
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_index.get(id).map(|&i| &self.edges[i])
    }

    /// Edges with `node_id` as source or target, in insertion order.
    pub fn edges_touching<'g>(&'g self, node_id: &str) -> impl Iterator<Item = &'g Edge> + use<'g> {
        self.adjacency
            .get(node_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.node_index.contains_key(&node.id) {
            return Err(GraphError::DuplicateId(node.id));
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Endpoints are not required to exist yet; see [`Graph::check_references`].
    pub fn insert_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if self.edge_index.contains_key(&edge.id) {
            return Err(GraphError::DuplicateId(edge.id));
        }
        let index = self.edges.len();
        self.edge_index.insert(edge.id.clone(), index);
        self.adjacency.entry(edge.source.clone()).or_default().push(index);
        if edge.target != edge.source {
            self.adjacency.entry(edge.target.clone()).or_default().push(index);
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Removes a node together with every edge touching it, or a single edge.
    /// Node ids and edge ids are separate namespaces; a node wins when both
    /// carry `id`.
    pub fn remove_element(&mut self, id: &str) -> Result<(), GraphError> {
        if self.node_index.contains_key(id) {
            self.nodes.retain(|n| n.id != id);
            self.edges.retain(|e| e.source != id && e.target != id);
        } else if self.edge_index.contains_key(id) {
            self.edges.retain(|e| e.id != id);
        } else {
            return Err(GraphError::UnknownElement(id.to_string()));
        }
        self.reindex();
        Ok(())
    }

    /// Renames a node, or relabels an edge (its cardinality text). Nodes are
    /// looked up first, as in [`Graph::remove_element`].
    pub fn rename(&mut self, id: &str, label: impl Into<String>) -> Result<(), GraphError> {
        if let Some(&i) = self.node_index.get(id) {
            self.nodes[i].label = label.into();
        } else if let Some(&i) = self.edge_index.get(id) {
            self.edges[i].label = Some(label.into());
        } else {
            return Err(GraphError::UnknownElement(id.to_string()));
        }
        Ok(())
    }

    /// Fails on the first edge whose source or target is not a node.
    pub fn check_references(&self) -> Result<(), SynthesisError> {
        for edge in &self.edges {
            for end in [&edge.source, &edge.target] {
                if !self.node_index.contains_key(end) {
                    return Err(SynthesisError::DanglingEdge {
                        edge: edge.id.clone(),
                        node: end.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn reindex(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        self.edge_index.clear();
        self.adjacency.clear();
        for (i, edge) in self.edges.iter().enumerate() {
            self.edge_index.insert(edge.id.clone(), i);
            self.adjacency.entry(edge.source.clone()).or_default().push(i);
            if edge.target != edge.source {
                self.adjacency.entry(edge.target.clone()).or_default().push(i);
            }
        }
    }
}
