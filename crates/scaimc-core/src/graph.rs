//! BEL graph export.
//!
//! Each association becomes one directed `association` edge from its miRNA
//! node to its disease-or-gene node. Nodes are keyed by entity reference, so
//! an entity shared by several associations appears once.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use uuid::Uuid;

use crate::association::AssociationRecord;
use crate::entity::{EntityKind, EntityRecord, EntityRef};
use crate::{Error, Result};

/// Namespace written into exported BEL terms.
pub const NAMESPACE: &str = "SCAIMC";

pub const RELATION: &str = "association";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BelNode {
    pub entity: EntityRef,
    pub kind: EntityKind,
    pub name: String,
}

impl BelNode {
    /// BEL term, e.g. `m(SCAIMC:"miR-21")`.
    #[must_use]
    pub fn to_bel(&self) -> String {
        format!(
            "{}({}:\"{}\")",
            self.kind.bel_function(),
            NAMESPACE,
            escape(&self.name)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BelEdge {
    pub association: Uuid,
    pub relation: &'static str,
    pub label: String,
    pub interaction: String,
    pub interaction_type: String,
    pub pubmed_id: String,
    pub pair_id: String,
    pub evidence: String,
}

impl BelEdge {
    fn from_association(rec: &AssociationRecord) -> Self {
        Self {
            association: rec.id,
            relation: RELATION,
            label: rec.label().to_string(),
            interaction: rec.interaction.clone(),
            interaction_type: rec.interaction_type.clone(),
            pubmed_id: rec.pubmed_id.clone(),
            pair_id: rec.pair_id.clone(),
            evidence: rec.sentence.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BelGraph {
    graph: DiGraph<BelNode, BelEdge>,
    nodes: HashMap<EntityRef, NodeIndex>,
}

impl BelGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node for `entity`, or return the existing one.
    pub fn add_entity(&mut self, entity: &EntityRecord) -> NodeIndex {
        if let Some(idx) = self.nodes.get(&entity.id) {
            return *idx;
        }

        let idx = self.graph.add_node(BelNode {
            entity: entity.id,
            kind: entity.kind,
            name: entity.term.clone(),
        });
        self.nodes.insert(entity.id, idx);
        idx
    }

    pub fn add_association(
        &mut self,
        rec: &AssociationRecord,
        entities: &HashMap<EntityRef, EntityRecord>,
    ) -> Result<()> {
        let source = self.add_entity(lookup(entities, rec.e1, EntityKind::Mirna)?);
        let target = self.add_entity(lookup(entities, rec.e2, EntityKind::DiseaseOrGene)?);

        self.graph
            .add_edge(source, target, BelEdge::from_association(rec));
        Ok(())
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &BelNode> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &BelEdge> {
        self.graph.edge_weights()
    }

    /// `(source, edge, target)` for every edge, in insertion order.
    pub fn triples(&self) -> impl Iterator<Item = (&BelNode, &BelEdge, &BelNode)> {
        self.graph
            .edge_references()
            .map(|e| (&self.graph[e.source()], e.weight(), &self.graph[e.target()]))
    }

    #[must_use]
    pub fn node(&self, entity: EntityRef) -> Option<&BelNode> {
        self.nodes.get(&entity).map(|idx| &self.graph[*idx])
    }

    #[must_use]
    pub fn inner(&self) -> &DiGraph<BelNode, BelEdge> {
        &self.graph
    }

    /// Render as a BEL script: one statement per edge, each preceded by its
    /// citation and evidence annotations.
    pub fn to_bel_script(&self) -> std::result::Result<String, fmt::Error> {
        let mut out = String::new();
        writeln!(out, "SET DOCUMENT Name = \"SCAI miRNA Corpus\"")?;
        writeln!(out, "DEFINE NAMESPACE {NAMESPACE} AS PATTERN \".*\"")?;
        writeln!(out, "DEFINE ANNOTATION InteractionType AS PATTERN \".*\"")?;

        for (source, edge, target) in self.triples() {
            writeln!(out)?;
            writeln!(out, "SET Citation = {{\"PubMed\", \"{}\"}}", escape(&edge.pubmed_id))?;
            writeln!(out, "SET Evidence = \"{}\"", escape(&edge.evidence))?;
            if !edge.interaction_type.is_empty() {
                writeln!(
                    out,
                    "SET InteractionType = \"{}\"",
                    escape(&edge.interaction_type)
                )?;
            }
            writeln!(out, "{} {} {}", source.to_bel(), edge.relation, target.to_bel())?;
            writeln!(out, "UNSET ALL")?;
        }

        Ok(out)
    }

    /// Node-link JSON with `source`/`target` as node positions.
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Link<'a> {
            source: usize,
            target: usize,
            #[serde(flatten)]
            edge: &'a BelEdge,
        }

        #[derive(Serialize)]
        struct NodeLink<'a> {
            directed: bool,
            nodes: Vec<&'a BelNode>,
            links: Vec<Link<'a>>,
        }

        let doc = NodeLink {
            directed: true,
            nodes: self.graph.node_weights().collect(),
            links: self
                .graph
                .edge_references()
                .map(|e| Link {
                    source: e.source().index(),
                    target: e.target().index(),
                    edge: e.weight(),
                })
                .collect(),
        };

        serde_json::to_string_pretty(&doc)
    }
}

/// Project `associations` into a graph, resolving their entity keys through
/// `entities`.
pub fn to_graph(
    associations: &[AssociationRecord],
    entities: &HashMap<EntityRef, EntityRecord>,
) -> Result<BelGraph> {
    let mut graph = BelGraph::new();
    for rec in associations {
        graph.add_association(rec, entities)?;
    }
    Ok(graph)
}

fn lookup(
    entities: &HashMap<EntityRef, EntityRecord>,
    id: EntityRef,
    kind: EntityKind,
) -> Result<&EntityRecord> {
    entities
        .get(&id)
        .filter(|e| e.kind == kind)
        .ok_or(Error::EntityNotFound {
            kind,
            id: id.as_uuid(),
        })
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
