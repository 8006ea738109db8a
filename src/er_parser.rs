use winnow::prelude::*;
use winnow::ascii::{line_ending, multispace0, space0, space1};
use winnow::combinator::{alt, delimited, eof, opt, preceded, repeat};
use winnow::token::take_while;

use crate::er_graph::{Edge, EdgeKind, Graph, Node, NodeKind};
use crate::error::LoadError;

pub fn parse_er_graph(input: &str) -> Result<Graph, LoadError> {
    let mut input = input;
    let lines = er_graph(&mut input).map_err(|_| {
        let context = input.lines().next().unwrap_or("").trim();
        let context_display = if context.chars().count() > 40 {
            format!("{}...", context.chars().take(40).collect::<String>())
        } else {
            context.to_string()
        };
        LoadError::Syntax(context_display)
    })?;

    let mut graph = Graph::new();
    let mut edge_count = 0;
    for line in lines {
        match line {
            ErLine::Node(node) => graph.insert_node(node)?,
            ErLine::Edge(edge) => {
                edge_count += 1;
                let mut built = Edge::new(
                    format!("edge-{edge_count}"),
                    edge.kind,
                    edge.source,
                    edge.target,
                );
                built.label = edge.label;
                graph.insert_edge(built)?;
            }
            ErLine::Blank => {}
        }
    }
    log::debug!(
        "parsed ER graph: {} nodes, {} edges",
        graph.nodes().len(),
        graph.edges().len()
    );
    Ok(graph)
}

#[derive(Debug, PartialEq)]
struct EdgeLine {
    source: String,
    kind: EdgeKind,
    target: String,
    label: Option<String>,
}

#[derive(Debug, PartialEq)]
enum ErLine {
    Node(Node),
    Edge(EdgeLine),
    Blank,
}

fn er_graph(input: &mut &str) -> winnow::Result<Vec<ErLine>> {
    multispace0.parse_next(input)?;
    "erGraph".parse_next(input)?;
    line_end.parse_next(input)?;

    let lines: Vec<ErLine> = repeat(0.., er_line).parse_next(input)?;

    multispace0.parse_next(input)?;
    eof.parse_next(input)?;
    Ok(lines)
}

fn er_line(input: &mut &str) -> winnow::Result<ErLine> {
    alt((
        comment_line.map(|_| ErLine::Blank),
        blank_line.map(|_| ErLine::Blank),
        node_line.map(ErLine::Node),
        edge_line.map(ErLine::Edge),
    ))
    .parse_next(input)
}

fn line_end(input: &mut &str) -> winnow::Result<()> {
    space0.parse_next(input)?;
    alt((line_ending, eof)).parse_next(input)?;
    Ok(())
}

fn blank_line(input: &mut &str) -> winnow::Result<()> {
    space0.parse_next(input)?;
    line_ending.parse_next(input)?;
    Ok(())
}

fn comment_line(input: &mut &str) -> winnow::Result<()> {
    space0.parse_next(input)?;
    "%%".parse_next(input)?;
    take_while(0.., |c: char| c != '\n' && c != '\r').parse_next(input)?;
    opt(line_ending).parse_next(input)?;
    Ok(())
}

fn er_identifier<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(1.., |c: char| {
        c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
    })
    .parse_next(input)
}

fn quoted<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    delimited(
        '"',
        take_while(0.., |c: char| c != '"' && c != '\n' && c != '\r'),
        '"',
    )
    .parse_next(input)
}

fn node_kind(input: &mut &str) -> winnow::Result<NodeKind> {
    let keyword = er_identifier.parse_next(input)?;
    let kind = match keyword {
        "entity" => NodeKind::Entity,
        "weak-entity" => NodeKind::WeakEntity,
        "relation" => NodeKind::Relation,
        "existence-relation" => NodeKind::ExistenceDependentRelation,
        "identifying-relation" => NodeKind::IdentifyingDependentRelation,
        "partial-exclusive" => NodeKind::PartialExclusiveSpecialization,
        "partial-overlapped" => NodeKind::PartialOverlappedSpecialization,
        "total-exclusive" => NodeKind::TotalExclusiveSpecialization,
        "total-overlapped" => NodeKind::TotalOverlappedSpecialization,
        "attribute" => NodeKind::Attribute,
        "key" => NodeKind::KeyAttribute,
        "alt-key" => NodeKind::AlternativeKeyAttribute,
        "multi-valued" => NodeKind::MultiValuedAttribute,
        "derived" => NodeKind::DerivedAttribute,
        _ => return Err(winnow::error::ParserError::from_input(input)),
    };
    Ok(kind)
}

fn node_line(input: &mut &str) -> winnow::Result<Node> {
    space0.parse_next(input)?;
    let kind = node_kind.parse_next(input)?;
    space1.parse_next(input)?;
    let id = er_identifier.parse_next(input)?;
    space1.parse_next(input)?;
    let label = quoted.parse_next(input)?;
    let equation = opt(preceded((space0, '=', space0), quoted)).parse_next(input)?;
    line_end.parse_next(input)?;

    let node = Node::new(id, kind, label);
    Ok(match equation {
        Some(equation) => node.with_equation(equation),
        None => node,
    })
}

fn edge_line(input: &mut &str) -> winnow::Result<EdgeLine> {
    space0.parse_next(input)?;
    let source = er_identifier.parse_next(input)?;
    space1.parse_next(input)?;
    let (kind, label) = arrow.parse_next(input)?;
    space1.parse_next(input)?;
    let target = er_identifier.parse_next(input)?;
    line_end.parse_next(input)?;

    Ok(EdgeLine {
        source: source.to_string(),
        kind,
        target: target.to_string(),
        label,
    })
}

fn arrow(input: &mut &str) -> winnow::Result<(EdgeKind, Option<String>)> {
    if let Some(kind) = opt(plain_arrow).parse_next(input)? {
        return Ok((kind, None));
    }
    let card = weighted_arrow.parse_next(input)?;
    Ok((EdgeKind::Weighted, Some(card)))
}

fn plain_arrow(input: &mut &str) -> winnow::Result<EdgeKind> {
    alt((
        "-->".value(EdgeKind::Transition),
        "-?->".value(EdgeKind::Optional),
        "-x->".value(EdgeKind::Exclusion),
        "-i->".value(EdgeKind::Inclusion),
        "-d->".value(EdgeKind::Disjointness),
        "-o->".value(EdgeKind::Overlap),
    ))
    .parse_next(input)
}

/// `-(0..N)->`, yielding the label `(0..N)`.
fn weighted_arrow(input: &mut &str) -> winnow::Result<String> {
    "-(".parse_next(input)?;
    let card: &str =
        take_while(1.., |c: char| c != ')' && c != '\n' && c != '\r').parse_next(input)?;
    ")->".parse_next(input)?;
    Ok(format!("({})", card.trim()))
}
