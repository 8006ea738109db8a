//! Turns a validated ER graph into relational tables.
//!
//! Tables come out in a fixed order: strong entities, weak entities, N:M
//! junction tables, multi-valued attribute tables. Binary relations and
//! specializations add columns and constraints to tables already built.

use std::collections::HashMap;

use crate::er_graph::{Edge, EdgeKind, Graph, Node, NodeKind};
use crate::er_query::{
    Cardinality, Column, ForeignColumn, IdentitySource, attribute_name, attribute_root_owners,
    cardinality_label_of, cardinality_of, connected_attributes_of, connected_entities_of,
    foreign_key_columns, identity_columns_of, identity_source, is_mandatory, is_many,
    leaf_columns, parse_typed_label, primary_key_of, specialization_children,
    specialization_parent,
};
use crate::error::SynthesisError;
use crate::sql_ast::{ColumnDef, InlineKey, Schema, TableConstraint, TableDef};

pub fn synthesize(graph: &Graph) -> Result<Schema, SynthesisError> {
    let mut synth = Synthesizer::new(graph);

    for kind in [NodeKind::Entity, NodeKind::WeakEntity] {
        for entity in graph.nodes().iter().filter(|n| n.kind == kind) {
            synth.entity_table(entity)?;
        }
    }
    for relation in graph.nodes().iter().filter(|n| n.kind == NodeKind::Relation) {
        match cardinality_of(graph, &relation.id) {
            Cardinality::OneToOne | Cardinality::OneToMany => synth.relation_foreign_key(relation)?,
            Cardinality::ManyToMany => synth.junction_table(relation)?,
            Cardinality::Unrelated => {
                log::warn!("relation `{}` has no weighted edges, skipping", relation.id);
            }
        }
    }
    for attribute in graph
        .nodes()
        .iter()
        .filter(|n| n.kind == NodeKind::MultiValuedAttribute)
    {
        synth.multi_valued_table(attribute)?;
    }
    for specialization in graph.nodes().iter().filter(|n| n.kind.is_specialization()) {
        synth.specialization(specialization)?;
    }

    Ok(Schema {
        tables: synth.tables,
    })
}

/// Per-call state: the tables built so far and where each entity's table sits.
struct Synthesizer<'g> {
    graph: &'g Graph,
    tables: Vec<TableDef>,
    by_entity: HashMap<String, usize>,
}

impl<'g> Synthesizer<'g> {
    fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            tables: Vec::new(),
            by_entity: HashMap::new(),
        }
    }

    fn push(&mut self, table: TableDef) {
        log::debug!(
            "table `{}`: {} column(s), {} constraint(s)",
            table.name,
            table.columns.len(),
            table.constraints.len()
        );
        self.tables.push(table);
    }

    fn entity_table_mut(&mut self, entity_id: &str) -> Result<&mut TableDef, SynthesisError> {
        let index = *self
            .by_entity
            .get(entity_id)
            .ok_or_else(|| SynthesisError::UnknownNode(entity_id.to_string()))?;
        Ok(&mut self.tables[index])
    }

    fn entity_table(&mut self, entity: &Node) -> Result<(), SynthesisError> {
        let mut table = TableDef::new(entity.safe_name());
        self.identity(&mut table, entity)?;
        self.alternate_keys(&mut table, entity)?;
        let prefix = entity.safe_name();
        for column in attribute_columns(self.graph, &entity.id, false)? {
            push_column(&mut table, column, &prefix);
        }
        self.by_entity.insert(entity.id.clone(), self.tables.len());
        self.push(table);
        Ok(())
    }

    fn identity(&self, table: &mut TableDef, entity: &Node) -> Result<(), SynthesisError> {
        match identity_source(self.graph, entity)? {
            IdentitySource::OwnKey(key) => {
                let columns = leaf_columns(self.graph, key)?;
                if let [single] = columns.as_slice() {
                    table
                        .columns
                        .push(column_def(single).inline(InlineKey::PrimaryKey));
                } else {
                    table.columns.extend(columns.iter().map(column_def));
                    table
                        .constraints
                        .push(TableConstraint::PrimaryKey(names(&columns)));
                }
            }
            IdentitySource::Dependent {
                owner, partial_key, ..
            } => {
                let refs = foreign_key_columns(self.graph, &owner.id)?;
                let mut key: Vec<Column> = refs.iter().map(|f| f.column.clone()).collect();
                if let Some(partial_key) = partial_key {
                    let prefix = entity.safe_name();
                    key.extend(
                        leaf_columns(self.graph, partial_key)?
                            .iter()
                            .map(|c| c.prefixed(&prefix)),
                    );
                }
                table.columns.extend(key.iter().map(column_def));
                table
                    .constraints
                    .push(TableConstraint::PrimaryKey(names(&key)));
                table
                    .constraints
                    .push(foreign_key(&refs, Vec::new(), owner, true));
            }
            IdentitySource::Subclass { .. } => {
                // Foreign key to the parent is added with the specialization.
                let key = identity_columns_of(self.graph, &entity.id)?;
                table.columns.extend(key.iter().map(column_def));
                table
                    .constraints
                    .push(TableConstraint::PrimaryKey(names(&key)));
            }
        }
        Ok(())
    }

    /// All alternative keys of an entity form one unique key. Each member is
    /// nullable when its own edge is optional.
    fn alternate_keys(&self, table: &mut TableDef, entity: &Node) -> Result<(), SynthesisError> {
        let members: Vec<(&Node, &Edge)> = connected_attributes_of(self.graph, &entity.id)
            .into_iter()
            .filter(|(n, _)| n.kind == NodeKind::AlternativeKeyAttribute)
            .collect();
        let mut columns = Vec::with_capacity(members.len());
        for (member, edge) in &members {
            let column = parse_typed_label(member)?;
            columns.push((column, edge.kind == EdgeKind::Optional));
        }
        match columns.as_slice() {
            [] => {}
            [(single, nullable)] => table.columns.push(
                column_def(single)
                    .nullable(*nullable)
                    .inline(InlineKey::Unique),
            ),
            _ => {
                table.columns.extend(
                    columns
                        .iter()
                        .map(|(c, nullable)| column_def(c).nullable(*nullable)),
                );
                table.constraints.push(TableConstraint::Unique(
                    columns.iter().map(|(c, _)| c.name.clone()).collect(),
                ));
            }
        }
        Ok(())
    }

    /// `name`, or the first `name_<n>` free in every listed entity table. Used
    /// for columns that must be spelled alike on both ends of a foreign key.
    fn shared_name(&self, entity_ids: &[&str], name: &str) -> Result<String, SynthesisError> {
        let tables = entity_ids
            .iter()
            .map(|id| {
                self.by_entity
                    .get(*id)
                    .map(|&i| &self.tables[i])
                    .ok_or_else(|| SynthesisError::UnknownNode(id.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let taken = |candidate: &str| tables.iter().any(|t| t.has_column(candidate));
        if !taken(name) {
            return Ok(name.to_string());
        }
        Ok((2..)
            .map(|n| format!("{name}_{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| name.to_string()))
    }

    /// 1:1 and 1:N relations become a foreign key on one of the two entity
    /// tables, together with the relation's own attributes.
    fn relation_foreign_key(&mut self, relation: &Node) -> Result<(), SynthesisError> {
        let graph = self.graph;
        let ends = connected_entities_of(graph, &relation.id);
        let [(a, edge_a), (b, edge_b), ..] = ends.as_slice() else {
            return Err(SynthesisError::TooFewEntities(relation.id.clone()));
        };
        let cardinality = cardinality_of(graph, &relation.id);
        let ((holder, holder_edge), target) = match cardinality {
            Cardinality::OneToMany if is_many(cardinality_label_of(edge_a)) => ((*a, *edge_a), *b),
            Cardinality::OneToMany => ((*b, *edge_b), *a),
            _ => match (is_mandatory(edge_a), is_mandatory(edge_b)) {
                (true, false) => ((*a, *edge_a), *b),
                (false, true) => ((*b, *edge_b), *a),
                _ if a.id <= b.id => ((*a, *edge_a), *b),
                _ => ((*b, *edge_b), *a),
            },
        };
        let reflexive = holder.id == target.id;
        let nullable = reflexive || !is_mandatory(holder_edge);
        log::debug!(
            "relation `{}` ({cardinality}): foreign key on `{}` to `{}`",
            relation.id,
            holder.id,
            target.id
        );

        let refs = foreign_key_columns(graph, &target.id)?;
        let extra = attribute_columns(graph, &relation.id, nullable)?;
        let rel_name = relation.safe_name();
        let table = self.entity_table_mut(&holder.id)?;

        let mut columns = Vec::with_capacity(refs.len());
        for f in &refs {
            let name = if reflexive {
                unique_name(table, &format!("{rel_name}_{}", f.references))
            } else {
                free_name(table, &f.column.name, &rel_name)
            };
            columns.push(ForeignColumn {
                column: Column::new(name, f.column.data_type.clone()),
                references: f.references.clone(),
            });
        }

        let unique = cardinality == Cardinality::OneToOne;
        let single = columns.len() == 1;
        for f in &columns {
            let mut def = column_def(&f.column).nullable(nullable);
            if unique && single {
                def = def.inline(InlineKey::Unique);
            }
            table.columns.push(def);
        }
        if unique && !single {
            table.constraints.push(TableConstraint::Unique(
                columns.iter().map(|f| f.column.name.clone()).collect(),
            ));
        }
        table
            .constraints
            .push(foreign_key(&columns, Vec::new(), target, false));
        for column in extra {
            push_column(table, column, &rel_name);
        }
        Ok(())
    }

    fn junction_table(&mut self, relation: &Node) -> Result<(), SynthesisError> {
        let graph = self.graph;
        let mut table = TableDef::new(relation.safe_name());
        let mut fk_names = Vec::new();

        for (entity, _) in connected_entities_of(graph, &relation.id) {
            let refs: Vec<ForeignColumn> = foreign_key_columns(graph, &entity.id)?
                .into_iter()
                .map(|f| {
                    let name = unique_name(&table, &f.column.name);
                    ForeignColumn {
                        column: Column::new(name, f.column.data_type),
                        references: f.references,
                    }
                })
                .collect();
            for f in &refs {
                table.columns.push(column_def(&f.column));
                fk_names.push(f.column.name.clone());
            }
            table
                .constraints
                .push(foreign_key(&refs, Vec::new(), entity, true));
        }

        match primary_key_of(graph, &relation.id) {
            Some(key) => {
                let columns = leaf_columns(graph, key)?;
                if let [single] = columns.as_slice() {
                    table
                        .columns
                        .push(column_def(single).inline(InlineKey::PrimaryKey));
                } else {
                    table.columns.extend(columns.iter().map(column_def));
                    table
                        .constraints
                        .push(TableConstraint::PrimaryKey(names(&columns)));
                }
            }
            None => table.constraints.push(TableConstraint::PrimaryKey(fk_names)),
        }
        let prefix = relation.safe_name();
        for column in attribute_columns(graph, &relation.id, false)? {
            push_column(&mut table, column, &prefix);
        }
        self.push(table);
        Ok(())
    }

    /// A multi-valued attribute gets its own table keyed by the owner's
    /// identity plus the value.
    fn multi_valued_table(&mut self, attribute: &Node) -> Result<(), SynthesisError> {
        let graph = self.graph;
        let owners = attribute_root_owners(graph, &attribute.id);
        let owner_id = owners
            .first()
            .ok_or_else(|| SynthesisError::UnknownNode(attribute.id.clone()))?;
        let owner = graph
            .node(owner_id)
            .ok_or_else(|| SynthesisError::UnknownNode(owner_id.clone()))?;
        if !owner.kind.is_entity() {
            return Err(SynthesisError::NotAnEntity(owner.id.clone()));
        }

        let mut table = TableDef::new(format!(
            "{}_{}",
            owner.safe_name(),
            attribute_name(attribute)
        ));
        let refs = foreign_key_columns(graph, &owner.id)?;
        table
            .columns
            .extend(refs.iter().map(|f| column_def(&f.column)));
        let value = parse_typed_label(attribute)?;
        let value = Column::new(unique_name(&table, &value.name), value.data_type);
        table.columns.push(column_def(&value));

        let mut key: Vec<String> = refs.iter().map(|f| f.column.name.clone()).collect();
        key.push(value.name.clone());
        table.constraints.push(TableConstraint::PrimaryKey(key));
        table
            .constraints
            .push(foreign_key(&refs, Vec::new(), owner, true));
        self.push(table);
        Ok(())
    }

    /// Adds the discriminator to the parent and ties every child back to the
    /// parent's identity plus discriminator.
    fn specialization(&mut self, spec: &Node) -> Result<(), SynthesisError> {
        let graph = self.graph;
        let (Some(exclusive), Some(total)) = (spec.kind.is_exclusive(), spec.kind.is_total())
        else {
            return Err(SynthesisError::UnknownNode(spec.id.clone()));
        };
        let parent = specialization_parent(graph, &spec.id)
            .ok_or_else(|| SynthesisError::MissingParent(spec.id.clone()))?;
        let children = specialization_children(graph, &spec.id);
        let refs = foreign_key_columns(graph, &parent.id)?;
        let identity: Vec<String> = refs.iter().map(|f| f.references.clone()).collect();
        log::debug!(
            "specialization `{}`: {} child(ren) of `{}`, exclusive={exclusive}, total={total}",
            spec.id,
            children.len(),
            parent.id
        );

        if exclusive {
            let wanted = match spec.safe_name() {
                name if name.is_empty() => format!("{}_type", parent.safe_name()),
                name => name,
            };
            let mut owners = vec![parent.id.as_str()];
            owners.extend(children.iter().map(|c| c.id.as_str()));
            let discriminator = self.shared_name(&owners, &wanted)?;
            let values: Vec<String> = children.iter().map(|c| c.safe_name()).collect();
            let width = values.iter().map(|v| v.chars().count()).max().unwrap_or(1).max(1);
            let data_type = format!("VARCHAR({width})");

            let parent_table = self.entity_table_mut(&parent.id)?;
            parent_table
                .columns
                .push(ColumnDef::new(&discriminator, &data_type).nullable(!total));
            parent_table.constraints.push(TableConstraint::Check(format!(
                "{discriminator} IN ({})",
                values
                    .iter()
                    .map(|v| sql_literal(v))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
            parent_table
                .constraints
                .push(TableConstraint::Unique(with(&identity, &discriminator)));

            for (child, value) in children.iter().zip(&values) {
                let child_table = self.entity_table_mut(&child.id)?;
                child_table.columns.push(
                    ColumnDef::new(&discriminator, &data_type)
                        .default_value(sql_literal(value))
                        .check(format!("{discriminator} = {}", sql_literal(value))),
                );
                child_table.constraints.push(foreign_key(
                    &refs,
                    vec![discriminator.clone()],
                    parent,
                    true,
                ));
            }
        } else {
            let mut flags = Vec::with_capacity(children.len());
            for child in &children {
                let wanted = format!("is_{}", child.safe_name());
                flags.push(self.shared_name(&[parent.id.as_str(), child.id.as_str()], &wanted)?);
            }

            let parent_table = self.entity_table_mut(&parent.id)?;
            for flag in &flags {
                parent_table.columns.push(
                    ColumnDef::new(flag, "BOOLEAN").default_value("FALSE"),
                );
                parent_table
                    .constraints
                    .push(TableConstraint::Unique(with(&identity, flag)));
            }
            if total && !flags.is_empty() {
                parent_table
                    .constraints
                    .push(TableConstraint::Check(flags.join(" OR ")));
            }

            for (child, flag) in children.iter().zip(&flags) {
                let child_table = self.entity_table_mut(&child.id)?;
                child_table.columns.push(
                    ColumnDef::new(flag, "BOOLEAN")
                        .default_value("TRUE")
                        .check(flag.clone()),
                );
                child_table
                    .constraints
                    .push(foreign_key(&refs, vec![flag.clone()], parent, true));
            }
        }
        Ok(())
    }
}

/// Plain and derived attribute columns of an entity or relation.
fn attribute_columns(
    graph: &Graph,
    owner_id: &str,
    force_nullable: bool,
) -> Result<Vec<ColumnDef>, SynthesisError> {
    let mut columns = Vec::new();
    for (attribute, edge) in connected_attributes_of(graph, owner_id) {
        let nullable = force_nullable || edge.kind == EdgeKind::Optional;
        match attribute.kind {
            NodeKind::Attribute => columns.extend(
                leaf_columns(graph, attribute)?
                    .iter()
                    .map(|c| column_def(c).nullable(nullable)),
            ),
            NodeKind::DerivedAttribute => {
                let equation = attribute
                    .equation
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .ok_or_else(|| SynthesisError::MissingEquation(attribute.id.clone()))?;
                columns.push(column_def(&parse_typed_label(attribute)?).generated(equation));
            }
            NodeKind::KeyAttribute
            | NodeKind::AlternativeKeyAttribute
            | NodeKind::MultiValuedAttribute => {}
            NodeKind::Entity
            | NodeKind::WeakEntity
            | NodeKind::Relation
            | NodeKind::ExistenceDependentRelation
            | NodeKind::IdentifyingDependentRelation
            | NodeKind::PartialExclusiveSpecialization
            | NodeKind::PartialOverlappedSpecialization
            | NodeKind::TotalExclusiveSpecialization
            | NodeKind::TotalOverlappedSpecialization => {}
        }
    }
    Ok(columns)
}

fn column_def(column: &Column) -> ColumnDef {
    ColumnDef::new(&column.name, &column.data_type)
}

fn names(columns: &[Column]) -> Vec<String> {
    columns.iter().map(|c| c.name.clone()).collect()
}

fn with(columns: &[String], extra: &str) -> Vec<String> {
    let mut all = columns.to_vec();
    all.push(extra.to_string());
    all
}

/// Foreign key from `refs` (plus `shared`, named alike on both sides) to
/// `target`'s table.
fn foreign_key(
    refs: &[ForeignColumn],
    shared: Vec<String>,
    target: &Node,
    on_delete_cascade: bool,
) -> TableConstraint {
    let mut columns: Vec<String> = refs.iter().map(|f| f.column.name.clone()).collect();
    let mut references: Vec<String> = refs.iter().map(|f| f.references.clone()).collect();
    columns.extend(shared.iter().cloned());
    references.extend(shared);
    TableConstraint::ForeignKey {
        columns,
        table: target.safe_name(),
        references,
        on_delete_cascade,
    }
}

/// `name` if the table lacks it, otherwise `<prefix>_<name>` made unique.
fn free_name(table: &TableDef, name: &str, prefix: &str) -> String {
    if table.has_column(name) {
        unique_name(table, &format!("{prefix}_{name}"))
    } else {
        name.to_string()
    }
}

fn push_column(table: &mut TableDef, mut column: ColumnDef, prefix: &str) {
    column.name = free_name(table, &column.name, prefix);
    table.columns.push(column);
}

/// `name`, or `name_2`, `name_3`, ... if the table already has it.
fn unique_name(table: &TableDef, name: &str) -> String {
    if !table.has_column(name) {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{name}_{n}"))
        .find(|candidate| !table.has_column(candidate))
        .unwrap_or_else(|| name.to_string())
}

fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::er_graph::Edge;

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
    fn single_key_is_inline_primary_key() {
        let g = graph(
            &[
                ("p", NodeKind::Entity, "Person"),
                ("id", NodeKind::KeyAttribute, "id:integer"),
                ("nick", NodeKind::Attribute, "nick:TEXT"),
            ],
            &[
                ("p", "id", EdgeKind::Transition, None),
                ("p", "nick", EdgeKind::Optional, None),
            ],
        );
        let schema = synthesize(&g).unwrap();
        let table = schema.table("Person").unwrap();
        assert_eq!(table.columns[0].inline, InlineKey::PrimaryKey);
        assert_eq!(table.columns[0].data_type, "INTEGER");
        assert!(table.column("nick").unwrap().nullable);
        assert!(table.constraints.is_empty());
    }

    #[test]
    fn composite_alternate_key_is_table_level() {
        let g = graph(
            &[
                ("p", NodeKind::Entity, "Person"),
                ("id", NodeKind::KeyAttribute, "id:INTEGER"),
                ("a1", NodeKind::AlternativeKeyAttribute, "country:CHAR(2)"),
                ("a2", NodeKind::AlternativeKeyAttribute, "passport:VARCHAR(20)"),
            ],
            &[
                ("p", "id", EdgeKind::Transition, None),
                ("p", "a1", EdgeKind::Transition, None),
                ("p", "a2", EdgeKind::Optional, None),
            ],
        );
        let schema = synthesize(&g).unwrap();
        let table = schema.table("Person").unwrap();
        assert_eq!(
            table.constraints,
            vec![TableConstraint::Unique(vec!["country".into(), "passport".into()])]
        );
        assert!(!table.column("country").unwrap().nullable);
        assert!(table.column("passport").unwrap().nullable);
    }

    #[test]
    fn relation_attribute_clashing_with_holder_column_is_renamed() {
        let g = graph(
            &[
                ("d", NodeKind::Entity, "Dept"),
                ("dk", NodeKind::KeyAttribute, "id:INTEGER"),
                ("e", NodeKind::Entity, "Emp"),
                ("ek", NodeKind::KeyAttribute, "id:INTEGER"),
                ("en", NodeKind::Attribute, "name:TEXT"),
                ("w", NodeKind::Relation, "works"),
                ("wn", NodeKind::Attribute, "name:TEXT"),
            ],
            &[
                ("d", "dk", EdgeKind::Transition, None),
                ("e", "ek", EdgeKind::Transition, None),
                ("e", "en", EdgeKind::Transition, None),
                ("d", "w", EdgeKind::Weighted, Some("(0..1)")),
                ("e", "w", EdgeKind::Weighted, Some("(0..N)")),
                ("w", "wn", EdgeKind::Transition, None),
            ],
        );
        let schema = synthesize(&g).unwrap();
        let emp = schema.table("Emp").unwrap();
        let names: Vec<&str> = emp.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "Dept_id", "works_name"]);
        assert!(emp.column("works_name").unwrap().nullable);
    }

    #[test]
    fn discriminator_avoids_existing_child_column() {
        let g = graph(
            &[
                ("v", NodeKind::Entity, "Vehicle"),
                ("vin", NodeKind::KeyAttribute, "vin:CHAR(17)"),
                ("s", NodeKind::TotalExclusiveSpecialization, "kind"),
                ("car", NodeKind::Entity, "Car"),
                ("ck", NodeKind::Attribute, "kind:TEXT"),
                ("truck", NodeKind::Entity, "Truck"),
            ],
            &[
                ("v", "vin", EdgeKind::Transition, None),
                ("v", "s", EdgeKind::Transition, None),
                ("s", "car", EdgeKind::Transition, None),
                ("s", "truck", EdgeKind::Transition, None),
                ("car", "ck", EdgeKind::Transition, None),
            ],
        );
        let schema = synthesize(&g).unwrap();
        for table in ["Vehicle", "Car", "Truck"] {
            assert!(schema.table(table).unwrap().has_column("kind_2"), "{table}");
        }
        let car = schema.table("Car").unwrap();
        assert_eq!(car.columns.iter().filter(|c| c.name == "kind").count(), 1);
        assert!(car.constraints.contains(&TableConstraint::ForeignKey {
            columns: vec!["Vehicle_vin".into(), "kind_2".into()],
            table: "Vehicle".into(),
            references: vec!["vin".into(), "kind_2".into()],
            on_delete_cascade: true,
        }));
    }

    #[test]
    fn one_to_many_puts_key_on_many_side() {
        let g = graph(
            &[
                ("d", NodeKind::Entity, "Dept"),
                ("dk", NodeKind::KeyAttribute, "id:INTEGER"),
                ("e", NodeKind::Entity, "Emp"),
                ("ek", NodeKind::KeyAttribute, "id:INTEGER"),
                ("w", NodeKind::Relation, "works"),
                ("since", NodeKind::Attribute, "since:DATE"),
            ],
            &[
                ("d", "dk", EdgeKind::Transition, None),
                ("e", "ek", EdgeKind::Transition, None),
                ("d", "w", EdgeKind::Weighted, Some("(0..1)")),
                ("e", "w", EdgeKind::Weighted, Some("(1..N)")),
                ("w", "since", EdgeKind::Transition, None),
            ],
        );
        let schema = synthesize(&g).unwrap();
        let emp = schema.table("Emp").unwrap();
        let fk = emp.column("Dept_id").unwrap();
        assert!(!fk.nullable);
        assert!(emp.has_column("since"));
        assert!(schema.table("Dept").unwrap().column("Emp_id").is_none());
    }

    #[test]
    fn reflexive_relation_names_columns_after_relation() {
        let g = graph(
            &[
                ("e", NodeKind::Entity, "Emp"),
                ("ek", NodeKind::KeyAttribute, "id:INTEGER"),
                ("m", NodeKind::Relation, "manager"),
            ],
            &[
                ("e", "ek", EdgeKind::Transition, None),
                ("e", "m", EdgeKind::Weighted, Some("(0..1)")),
                ("e", "m", EdgeKind::Weighted, Some("(0..N)")),
            ],
        );
        let schema = synthesize(&g).unwrap();
        let emp = schema.table("Emp").unwrap();
        assert!(emp.column("manager_id").unwrap().nullable);
        assert_eq!(
            emp.constraints,
            vec![TableConstraint::ForeignKey {
                columns: vec!["manager_id".into()],
                table: "Emp".into(),
                references: vec!["id".into()],
                on_delete_cascade: false,
            }]
        );
    }

    #[test]
    fn weak_entity_key_is_table_level_with_cascade() {
        let g = graph(
            &[
                ("o", NodeKind::Entity, "Orders"),
                ("ok", NodeKind::KeyAttribute, "id:INTEGER"),
                ("l", NodeKind::WeakEntity, "Line"),
                ("lk", NodeKind::KeyAttribute, "no:SMALLINT"),
                ("has", NodeKind::ExistenceDependentRelation, "has"),
            ],
            &[
                ("o", "ok", EdgeKind::Transition, None),
                ("l", "lk", EdgeKind::Transition, None),
                ("o", "has", EdgeKind::Weighted, Some("(1..1)")),
                ("has", "l", EdgeKind::Weighted, Some("(0..N)")),
            ],
        );
        let schema = synthesize(&g).unwrap();
        let line = schema.table("Line").unwrap();
        assert!(line.columns.iter().all(|c| c.inline == InlineKey::None));
        assert_eq!(
            line.constraints[0],
            TableConstraint::PrimaryKey(vec!["Orders_id".into(), "Line_no".into()])
        );
        assert!(matches!(
            &line.constraints[1],
            TableConstraint::ForeignKey { on_delete_cascade: true, table, .. } if table == "Orders"
        ));
    }

    #[test]
    fn multi_valued_attribute_gets_own_table() {
        let g = graph(
            &[
                ("p", NodeKind::Entity, "Person"),
                ("id", NodeKind::KeyAttribute, "id:INTEGER"),
                ("ph", NodeKind::MultiValuedAttribute, "phone:VARCHAR(20)"),
            ],
            &[
                ("p", "id", EdgeKind::Transition, None),
                ("p", "ph", EdgeKind::Transition, None),
            ],
        );
        let schema = synthesize(&g).unwrap();
        let phones = schema.table("Person_phone").unwrap();
        assert_eq!(
            phones.constraints[0],
            TableConstraint::PrimaryKey(vec!["Person_id".into(), "phone".into()])
        );
        assert!(!schema.table("Person").unwrap().has_column("phone"));
    }

    #[test]
    fn exclusive_specialization_discriminator() {
        let g = graph(
            &[
                ("v", NodeKind::Entity, "Vehicle"),
                ("vin", NodeKind::KeyAttribute, "vin:CHAR(17)"),
                ("s", NodeKind::PartialExclusiveSpecialization, ""),
                ("car", NodeKind::Entity, "Car"),
                ("truck", NodeKind::Entity, "Truck"),
            ],
            &[
                ("v", "vin", EdgeKind::Transition, None),
                ("v", "s", EdgeKind::Transition, None),
                ("s", "car", EdgeKind::Transition, None),
                ("s", "truck", EdgeKind::Transition, None),
            ],
        );
        let schema = synthesize(&g).unwrap();
        let vehicle = schema.table("Vehicle").unwrap();
        let disc = vehicle.column("Vehicle_type").unwrap();
        assert_eq!(disc.data_type, "VARCHAR(5)");
        assert!(disc.nullable);
        assert!(vehicle
            .constraints
            .contains(&TableConstraint::Check("Vehicle_type IN ('Car', 'Truck')".into())));

        let car = schema.table("Car").unwrap();
        let disc = car.column("Vehicle_type").unwrap();
        assert_eq!(disc.default.as_deref(), Some("'Car'"));
        assert!(car.constraints.contains(&TableConstraint::ForeignKey {
            columns: vec!["Vehicle_vin".into(), "Vehicle_type".into()],
            table: "Vehicle".into(),
            references: vec!["vin".into(), "Vehicle_type".into()],
            on_delete_cascade: true,
        }));
    }

    #[test]
    fn total_overlapped_specialization_flags() {
        let g = graph(
            &[
                ("p", NodeKind::Entity, "Person"),
                ("id", NodeKind::KeyAttribute, "id:INTEGER"),
                ("s", NodeKind::TotalOverlappedSpecialization, "role"),
                ("st", NodeKind::Entity, "Student"),
                ("tc", NodeKind::Entity, "Lecturer"),
            ],
            &[
                ("p", "id", EdgeKind::Transition, None),
                ("p", "s", EdgeKind::Transition, None),
                ("s", "st", EdgeKind::Transition, None),
                ("s", "tc", EdgeKind::Transition, None),
            ],
        );
        let schema = synthesize(&g).unwrap();
        let person = schema.table("Person").unwrap();
        assert_eq!(person.column("is_Student").unwrap().default.as_deref(), Some("FALSE"));
        assert!(person
            .constraints
            .contains(&TableConstraint::Check("is_Student OR is_Lecturer".into())));
        let lecturer = schema.table("Lecturer").unwrap();
        assert_eq!(lecturer.column("is_Lecturer").unwrap().check.as_deref(), Some("is_Lecturer"));
    }

    #[test]
    fn unique_name_appends_counter() {
        let mut table = TableDef::new("t");
        table.columns.push(ColumnDef::new("id", "INT"));
        table.columns.push(ColumnDef::new("id_2", "INT"));
        assert_eq!(unique_name(&table, "id"), "id_3");
        assert_eq!(unique_name(&table, "name"), "name");
    }

    #[test]
    fn literals_escape_quotes() {
        assert_eq!(sql_literal("O'Neil"), "'O''Neil'");
    }
}
