// aiops-core/src/core/graph.rs
// ============================================================================
// Module: Evidence Graph Model
// Description: Node/edge types for the evidence graph store (C1).
// Purpose: Typed, key-addressed graph entities with idempotent upsert
//          semantics; external adjacency storage rather than object
//          references (§9 "Graph cycles").
// Dependencies: serde, crate::core::{identifiers, evidence}
// ============================================================================

//! ## Overview
//! The evidence graph links an incident to the infrastructure entities it
//! touches and the evidence collected about them: `Incident -AFFECTS-> Pod`,
//! `Pod -PART_OF-> Deployment`, `Pod -SCHEDULED_ON-> Node`,
//! `Deployment -SCALED_BY-> HPA`, `Incident -HAS_EVIDENCE-> Evidence`,
//! `Evidence -ABOUT-> Entity` (§3). Nodes are keyed by
//! `(cluster, namespace, kind, name)` and upserts on that key are idempotent;
//! concurrent upserts converge to one node with merged attributes
//! (last-writer-wins on scalars, union on sets) — see
//! [`EntityAttributes::merge`].
//!
//! Represented as nodes and edges with external adjacency (an
//! implementation's store owns the adjacency index), not Rust object
//! references, so the near-acyclic graph never needs `Rc`/`RefCell` ownership
//! tangles (§9 "Graph cycles").

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::EdgeId;
use crate::core::identifiers::EvidenceId;
use crate::core::identifiers::IncidentId;
use crate::core::identifiers::NodeId;

// ============================================================================
// SECTION: Entity Kind & Key
// ============================================================================

/// The kind of infrastructure entity a graph node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A pod.
    Pod,
    /// A deployment.
    Deployment,
    /// A ReplicaSet.
    ReplicaSet,
    /// A node.
    Node,
    /// A HorizontalPodAutoscaler.
    Hpa,
    /// An evidence record surfaced as a graph node.
    Evidence,
}

/// The idempotency key a graph node is upserted on: `(cluster, namespace,
/// kind, name)` (§4.1).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    /// Cluster the entity lives in.
    pub cluster: String,
    /// Namespace the entity lives in (empty for cluster-scoped entities like
    /// nodes).
    pub namespace: String,
    /// Entity kind.
    pub kind: EntityKind,
    /// Entity name.
    pub name: String,
}

impl EntityKey {
    /// Derives the stable [`NodeId`] for this key.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        NodeId::new(format!(
            "{}/{}/{:?}/{}",
            self.cluster, self.namespace, self.kind, self.name
        ))
    }
}

// ============================================================================
// SECTION: Entity Attributes
// ============================================================================

/// A scalar or set-valued attribute attached to a graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A single scalar value; last-writer-wins on merge.
    Scalar(String),
    /// A set of values; union on merge.
    Set(BTreeSet<String>),
}

impl AttributeValue {
    /// Merges `incoming` into `self` per §4.1: scalars are last-writer-wins
    /// (incoming replaces existing), sets are unioned. Mismatched variants
    /// fall back to last-writer-wins.
    pub fn merge(&mut self, incoming: Self) {
        match (&mut *self, incoming) {
            (Self::Set(existing), Self::Set(incoming)) => existing.extend(incoming),
            (_, incoming) => *self = incoming,
        }
    }
}

/// The attribute bag attached to a graph node, keyed by attribute name.
pub type EntityAttributes = BTreeMap<String, AttributeValue>;

/// Merges `incoming` into `base` per the node-upsert convergence rule in
/// §4.1 and §8: scalar attributes are last-writer-wins, set attributes are
/// unioned, and the result is independent of the order the two updates were
/// observed in (commutative).
pub fn merge_attributes(base: &mut EntityAttributes, incoming: EntityAttributes) {
    for (key, value) in incoming {
        base.entry(key).and_modify(|existing| existing.merge(value.clone())).or_insert(value);
    }
}

// ============================================================================
// SECTION: Graph Node & Edge
// ============================================================================

/// A single evidence graph node.
///
/// # Invariants
/// - `id` is always `key.node_id()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Node identifier, derived from `key`.
    pub id: NodeId,
    /// The idempotency key this node was upserted on.
    pub key: EntityKey,
    /// Merged attribute bag.
    pub attributes: EntityAttributes,
}

/// The relationship kind an edge carries (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// `Incident -AFFECTS-> Pod`
    Affects,
    /// `Pod -PART_OF-> Deployment`
    PartOf,
    /// `Pod -SCHEDULED_ON-> Node`
    ScheduledOn,
    /// `Deployment -SCALED_BY-> HPA`
    ScaledBy,
    /// `Incident -HAS_EVIDENCE-> Evidence`
    HasEvidence,
    /// `Evidence -ABOUT-> Entity`
    About,
}

/// An edge in the evidence graph, keyed by its endpoints and relation for
/// idempotent linking (§4.1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Edge identifier, derived from `(from, to, relation)`.
    pub id: EdgeId,
    /// Source node.
    pub from: NodeId,
    /// Destination node.
    pub to: NodeId,
    /// Relationship kind.
    pub relation: RelationKind,
}

impl GraphEdge {
    /// Builds an edge, deriving its [`EdgeId`] from its endpoints and
    /// relation so that linking the same triple twice is idempotent.
    #[must_use]
    pub fn new(from: NodeId, to: NodeId, relation: RelationKind) -> Self {
        let id = EdgeId::new(format!("{from}->{to}:{relation:?}"));
        Self { id, from, to, relation }
    }
}

/// A reference from an incident to an evidence record surfaced as a graph
/// node, carrying the evidence id so callers can join back to the full
/// [`crate::core::evidence::Evidence`] record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceLink {
    /// The owning incident.
    pub incident_id: IncidentId,
    /// The linked evidence record.
    pub evidence_id: EvidenceId,
    /// The entity the evidence is about.
    pub about: NodeId,
}

// ============================================================================
// SECTION: Subgraph
// ============================================================================

/// The result of a bounded `subgraph(incident_id, depth)` query (§4.1):
/// depth is capped at 3.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    /// Nodes reachable within the requested depth.
    pub nodes: Vec<GraphNode>,
    /// Edges among the returned nodes.
    pub edges: Vec<GraphEdge>,
}

/// The maximum BFS depth a `subgraph` query may request (§4.1).
pub const MAX_SUBGRAPH_DEPTH: u8 = 3;

#[cfg(test)]
#[allow(
    clippy::panic,
    reason = "test-only assertions are permitted to use panic via let-else for clearer failure messages"
)]
mod tests {
    use super::merge_attributes;
    use super::AttributeValue;
    use super::EntityKey;
    use super::EntityKind;
    use std::collections::BTreeSet;

    #[test]
    fn node_id_is_stable_for_the_same_key() {
        let key = EntityKey {
            cluster: "us-east-1".to_owned(),
            namespace: "payments".to_owned(),
            kind: EntityKind::Pod,
            name: "checkout-7f".to_owned(),
        };
        assert_eq!(key.node_id(), key.node_id());
    }

    #[test]
    fn scalar_merge_is_last_writer_wins() {
        let mut base = super::EntityAttributes::new();
        base.insert("phase".to_owned(), AttributeValue::Scalar("Running".to_owned()));
        let mut incoming = super::EntityAttributes::new();
        incoming.insert("phase".to_owned(), AttributeValue::Scalar("CrashLoopBackOff".to_owned()));
        merge_attributes(&mut base, incoming);
        assert_eq!(base["phase"], AttributeValue::Scalar("CrashLoopBackOff".to_owned()));
    }

    #[test]
    fn set_merge_is_commutative_union() {
        let mut a = super::EntityAttributes::new();
        a.insert(
            "waiting_reasons".to_owned(),
            AttributeValue::Set(BTreeSet::from(["CrashLoopBackOff".to_owned()])),
        );
        let mut b = super::EntityAttributes::new();
        b.insert(
            "waiting_reasons".to_owned(),
            AttributeValue::Set(BTreeSet::from(["OOMKilled".to_owned()])),
        );

        let mut merged_ab = a.clone();
        merge_attributes(&mut merged_ab, b.clone());
        let mut merged_ba = b;
        merge_attributes(&mut merged_ba, a);

        assert_eq!(merged_ab, merged_ba);
        let AttributeValue::Set(union) = &merged_ab["waiting_reasons"] else {
            panic!("expected a set attribute");
        };
        assert_eq!(union.len(), 2);
    }
}
