// aiops-store-sqlite/src/graph_store.rs
// ============================================================================
// Module: Evidence Graph Store Implementation (C1)
// Description: Persists the evidence graph model (aiops_core::core::graph)
//              into the `nodes`/`edges` tables. C1.
// Dependencies: rusqlite, serde_json, aiops-core
// ============================================================================

//! ## Overview
//! Incidents are not themselves `EntityKind` nodes (the graph's node kinds
//! are infrastructure entities and evidence), so an incident is represented
//! by a synthetic node id, `incident:<id>`, that never appears in the
//! `nodes` table and is never returned from [`aiops_core::GraphStore::subgraph`]
//! as a node — only as the BFS's starting point. [`attach_evidence`] does
//! not emit an `Evidence -ABOUT-> Entity` edge: the trait signature gives it
//! no target entity id or kind to build one from, so only the
//! `Incident -HAS_EVIDENCE-> Evidence` edge is written (see `DESIGN.md`).
//!
//! `attach_evidence`'s round-trip requirement (the data and signal strength
//! survive into a later `subgraph` read) is met by flattening the evidence's
//! typed payload into scalar string attributes on an `EntityKind::Evidence`
//! node rather than a dedicated evidence table, since [`GraphNode`] only
//! carries an [`EntityAttributes`] bag.

use std::collections::BTreeSet;
use std::collections::VecDeque;

use aiops_core::merge_attributes;
use aiops_core::AttributeValue;
use aiops_core::EntityAttributes;
use aiops_core::EntityKey;
use aiops_core::EntityKind;
use aiops_core::Evidence;
use aiops_core::GraphEdge;
use aiops_core::GraphNode;
use aiops_core::GraphStore;
use aiops_core::GraphStoreError;
use aiops_core::IncidentId;
use aiops_core::NodeId;
use aiops_core::RelationKind;
use aiops_core::Subgraph;
use aiops_core::MAX_SUBGRAPH_DEPTH;
use rusqlite::params;
use rusqlite::OptionalExtension;

use crate::store::SqliteStore;

/// Builds the synthetic node id an incident is addressed by in the graph.
fn incident_node_id(incident_id: &IncidentId) -> NodeId {
    NodeId::new(format!("incident:{}", incident_id.as_str()))
}

impl GraphStore for SqliteStore {
    fn upsert_entity(&self, key: EntityKey, attrs: EntityAttributes) -> Result<NodeId, GraphStoreError> {
        let node_id = key.node_id();
        let guard = self.connection.lock().map_err(|_| GraphStoreError::Io("sqlite mutex poisoned".to_owned()))?;
        let existing: Option<String> = guard
            .query_row("SELECT data_json FROM nodes WHERE id = ?1", params![node_id.as_str()], |row| row.get(0))
            .optional()
            .map_err(|err| GraphStoreError::Io(err.to_string()))?;
        let mut node = match existing {
            Some(data_json) => {
                serde_json::from_str::<GraphNode>(&data_json).map_err(|err| GraphStoreError::Invalid(err.to_string()))?
            }
            None => GraphNode { id: node_id.clone(), key, attributes: EntityAttributes::new() },
        };
        merge_attributes(&mut node.attributes, attrs);
        let data_json = serde_json::to_string(&node).map_err(|err| GraphStoreError::Invalid(err.to_string()))?;
        guard
            .execute(
                "INSERT INTO nodes (id, data_json) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET data_json = excluded.data_json",
                params![node_id.as_str(), data_json],
            )
            .map_err(|err| GraphStoreError::Io(err.to_string()))?;
        Ok(node_id)
    }

    fn link_incident_to_entity(
        &self,
        incident_id: &IncidentId,
        entity_id: &NodeId,
        relation: RelationKind,
    ) -> Result<(), GraphStoreError> {
        let edge = GraphEdge::new(incident_node_id(incident_id), entity_id.clone(), relation);
        insert_edge(self, &edge)
    }

    fn attach_evidence(&self, incident_id: &IncidentId, evidence: &Evidence) -> Result<(), GraphStoreError> {
        let key = EntityKey {
            cluster: String::new(),
            namespace: evidence.entity_namespace.clone(),
            kind: EntityKind::Evidence,
            name: evidence.id.as_str().to_owned(),
        };
        let data_json =
            serde_json::to_string(&evidence.data).map_err(|err| GraphStoreError::Invalid(err.to_string()))?;
        let collected_at_json =
            serde_json::to_string(&evidence.collected_at).map_err(|err| GraphStoreError::Invalid(err.to_string()))?;
        let mut attrs = EntityAttributes::new();
        attrs.insert("data_json".to_owned(), AttributeValue::Scalar(data_json));
        attrs.insert("signal_strength".to_owned(), AttributeValue::Scalar(evidence.signal_strength.to_string()));
        attrs.insert("source".to_owned(), AttributeValue::Scalar(format!("{:?}", evidence.source)));
        attrs.insert("entity_name".to_owned(), AttributeValue::Scalar(evidence.entity_name.clone()));
        attrs.insert("entity_namespace".to_owned(), AttributeValue::Scalar(evidence.entity_namespace.clone()));
        attrs.insert("partial".to_owned(), AttributeValue::Scalar(evidence.partial.to_string()));
        attrs.insert("collected_at".to_owned(), AttributeValue::Scalar(collected_at_json));

        let evidence_node_id = self.upsert_entity(key, attrs)?;
        let edge = GraphEdge::new(incident_node_id(incident_id), evidence_node_id, RelationKind::HasEvidence);
        insert_edge(self, &edge)
    }

    fn subgraph(&self, incident_id: &IncidentId, depth: u8) -> Result<Subgraph, GraphStoreError> {
        if depth > MAX_SUBGRAPH_DEPTH {
            return Err(GraphStoreError::DepthExceeded { requested: depth, max: MAX_SUBGRAPH_DEPTH });
        }
        let guard = self.connection.lock().map_err(|_| GraphStoreError::Io("sqlite mutex poisoned".to_owned()))?;

        let mut visited_nodes: BTreeSet<String> = BTreeSet::new();
        let mut visited_edges: BTreeSet<String> = BTreeSet::new();
        let mut result = Subgraph::default();
        let mut frontier = VecDeque::new();
        frontier.push_back((incident_node_id(incident_id), 0u8));

        while let Some((current, hops)) = frontier.pop_front() {
            if hops >= depth {
                continue;
            }
            let mut statement = guard
                .prepare("SELECT id, to_node, relation, data_json FROM edges WHERE from_node = ?1")
                .map_err(|err| GraphStoreError::Io(err.to_string()))?;
            let rows = statement
                .query_map(params![current.as_str()], |row| {
                    let edge_id: String = row.get(0)?;
                    let to_node: String = row.get(1)?;
                    let data_json: String = row.get(3)?;
                    Ok((edge_id, to_node, data_json))
                })
                .map_err(|err| GraphStoreError::Io(err.to_string()))?;

            for row in rows {
                let (edge_id, to_node, edge_data_json) = row.map_err(|err| GraphStoreError::Io(err.to_string()))?;
                if visited_edges.insert(edge_id) {
                    let edge: GraphEdge = serde_json::from_str(&edge_data_json)
                        .map_err(|err| GraphStoreError::Invalid(err.to_string()))?;
                    result.edges.push(edge);
                }
                let to_node_id = NodeId::new(to_node.clone());
                if visited_nodes.insert(to_node.clone()) {
                    if let Some(data_json) = guard
                        .query_row("SELECT data_json FROM nodes WHERE id = ?1", params![to_node], |row| row.get::<_, String>(0))
                        .optional()
                        .map_err(|err| GraphStoreError::Io(err.to_string()))?
                    {
                        let node: GraphNode = serde_json::from_str(&data_json)
                            .map_err(|err| GraphStoreError::Invalid(err.to_string()))?;
                        result.nodes.push(node);
                    }
                }
                frontier.push_back((to_node_id, hops + 1));
            }
        }

        Ok(result)
    }
}

/// Inserts `edge`, idempotent on its derived id.
fn insert_edge(store: &SqliteStore, edge: &GraphEdge) -> Result<(), GraphStoreError> {
    let guard = store.connection.lock().map_err(|_| GraphStoreError::Io("sqlite mutex poisoned".to_owned()))?;
    let data_json = serde_json::to_string(edge).map_err(|err| GraphStoreError::Invalid(err.to_string()))?;
    guard
        .execute(
            "INSERT INTO edges (id, from_node, to_node, relation, data_json) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO NOTHING",
            params![edge.id.as_str(), edge.from.as_str(), edge.to.as_str(), format!("{:?}", edge.relation), data_json],
        )
        .map_err(|err| GraphStoreError::Io(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test setup only")]
mod tests {
    use aiops_core::AttributeValue;
    use aiops_core::EntityAttributes;
    use aiops_core::EntityKey;
    use aiops_core::EntityKind;
    use aiops_core::Evidence;
    use aiops_core::EvidenceData;
    use aiops_core::EvidenceId;
    use aiops_core::EvidenceSource;
    use aiops_core::GraphStore;
    use aiops_core::IncidentId;
    use aiops_core::RelationKind;
    use aiops_core::TimeWindow;
    use aiops_core::Timestamp;
    use tempfile::tempdir;

    use crate::store::SqliteStore;

    fn sample_evidence(incident_id: &IncidentId) -> Evidence {
        Evidence {
            id: EvidenceId::new("ev-1"),
            incident_id: incident_id.clone(),
            source: EvidenceSource::K8s,
            entity_name: "checkout-7f".to_owned(),
            entity_namespace: "payments".to_owned(),
            data: EvidenceData::Events(std::collections::BTreeSet::new()),
            signal_strength: 0.8,
            collected_at: Timestamp::Logical(1),
            time_window: TimeWindow { start: Timestamp::Logical(0), end: Timestamp::Logical(1) },
            partial: false,
        }
    }

    #[test]
    fn upsert_entity_converges_attributes_across_two_writes() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        let key = EntityKey {
            cluster: "us-east-1".to_owned(),
            namespace: "payments".to_owned(),
            kind: EntityKind::Pod,
            name: "checkout-7f".to_owned(),
        };
        let mut first = EntityAttributes::new();
        first.insert("phase".to_owned(), AttributeValue::Scalar("Running".to_owned()));
        let id_a = store.upsert_entity(key.clone(), first).unwrap();

        let mut second = EntityAttributes::new();
        second.insert("phase".to_owned(), AttributeValue::Scalar("CrashLoopBackOff".to_owned()));
        let id_b = store.upsert_entity(key, second).unwrap();
        assert_eq!(id_a, id_b);
    }

    #[test]
    fn attach_evidence_round_trips_data_and_signal_strength() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        let incident_id = IncidentId::new("inc-1");
        let evidence = sample_evidence(&incident_id);
        store.attach_evidence(&incident_id, &evidence).unwrap();

        let subgraph = store.subgraph(&incident_id, 1).unwrap();
        assert_eq!(subgraph.nodes.len(), 1);
        let node = &subgraph.nodes[0];
        let AttributeValue::Scalar(data_json) = &node.attributes["data_json"] else {
            panic!("expected scalar data_json attribute");
        };
        let decoded: EvidenceData = serde_json::from_str(data_json).unwrap();
        assert_eq!(decoded, evidence.data);
        let AttributeValue::Scalar(signal_strength) = &node.attributes["signal_strength"] else {
            panic!("expected scalar signal_strength attribute");
        };
        assert_eq!(signal_strength.parse::<f64>().unwrap(), evidence.signal_strength);
    }

    #[test]
    fn subgraph_rejects_depth_past_the_maximum() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        let incident_id = IncidentId::new("inc-1");
        let err = store.subgraph(&incident_id, 4).unwrap_err();
        assert!(matches!(err, aiops_core::GraphStoreError::DepthExceeded { requested: 4, max: 3 }));
    }

    #[test]
    fn link_incident_to_entity_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        let incident_id = IncidentId::new("inc-1");
        let key = EntityKey {
            cluster: "us-east-1".to_owned(),
            namespace: "payments".to_owned(),
            kind: EntityKind::Pod,
            name: "checkout-7f".to_owned(),
        };
        let node_id = store.upsert_entity(key, EntityAttributes::new()).unwrap();
        store.link_incident_to_entity(&incident_id, &node_id, RelationKind::Affects).unwrap();
        store.link_incident_to_entity(&incident_id, &node_id, RelationKind::Affects).unwrap();

        let subgraph = store.subgraph(&incident_id, 1).unwrap();
        assert_eq!(subgraph.edges.len(), 1);
    }
}
