//! Graph database client (spec §4.5 step 6, §5, §6): validated target and
//! candidate nodes, MERGE-keyed by stable external IDs so replayed writes
//! are idempotent.
//!
//! The spec's origin treats the driver as blocking and calls for a worker
//! pool so graph writes never block the scheduler; `neo4rs` is actually
//! async-native, so the pool here is a bounded `Semaphore` gate around
//! spawned write tasks rather than a literal thread pool — same isolation
//! goal, idiomatic for an async driver.

use std::sync::Arc;

use neo4rs::{Graph, query};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::RepurposeError;

const DEFAULT_MAX_CONCURRENT_WRITES: usize = 8;

#[derive(Clone)]
pub struct GraphDbClient {
    graph: Arc<Graph>,
    permits: Arc<Semaphore>,
}

impl GraphDbClient {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, RepurposeError> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|err| RepurposeError::GraphDb(err.to_string()))?;
        Ok(Self {
            graph: Arc::new(graph),
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_WRITES)),
        })
    }

    pub async fn merge_target(
        &self,
        ensembl_id: &str,
        symbol: &str,
        biotype: &str,
    ) -> Result<(), RepurposeError> {
        let q = query(
            "MERGE (t:Target {ensembl_id: $ensembl_id}) \
             SET t.symbol = $symbol, t.biotype = $biotype",
        )
        .param("ensembl_id", ensembl_id)
        .param("symbol", symbol)
        .param("biotype", biotype);
        self.run(q).await
    }

    pub async fn merge_target_disease_edge(
        &self,
        ensembl_id: &str,
        disease_id: &str,
        score: f64,
    ) -> Result<(), RepurposeError> {
        let q = query(
            "MATCH (t:Target {ensembl_id: $ensembl_id}) \
             MERGE (d:Disease {ontology_id: $disease_id}) \
             MERGE (t)-[r:ASSOCIATED_WITH]->(d) \
             SET r.score = $score",
        )
        .param("ensembl_id", ensembl_id)
        .param("disease_id", disease_id)
        .param("score", score);
        self.run(q).await
    }

    pub async fn merge_candidate(
        &self,
        drug_id: &str,
        drug_name: &str,
        ensembl_id: &str,
        proposed_indication: &str,
    ) -> Result<(), RepurposeError> {
        let q = query(
            "MERGE (c:Candidate {drug_id: $drug_id}) \
             SET c.drug_name = $drug_name, c.proposed_indication = $proposed_indication \
             WITH c \
             MATCH (t:Target {ensembl_id: $ensembl_id}) \
             MERGE (c)-[:MODULATES]->(t)",
        )
        .param("drug_id", drug_id)
        .param("drug_name", drug_name)
        .param("ensembl_id", ensembl_id)
        .param("proposed_indication", proposed_indication);
        self.run(q).await
    }

    async fn run(&self, q: neo4rs::Query) -> Result<(), RepurposeError> {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore never closed");
        self.graph
            .run(q)
            .await
            .map_err(|err| RepurposeError::GraphDb(err.to_string()))
    }

    /// Runs a batch of writes under the bounded worker pool, logging (never
    /// propagating) individual failures — spec §7: "graph-DB write error:
    /// logged; the run continues with in-memory state."
    pub async fn merge_targets_batch(&self, targets: &[(String, String, String)]) {
        let mut set = JoinSet::new();
        for (ensembl_id, symbol, biotype) in targets.iter().cloned() {
            let client = self.clone();
            set.spawn(async move { client.merge_target(&ensembl_id, &symbol, &biotype).await });
        }
        while let Some(result) = set.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(error = %err, "graph-db target merge failed"),
                Err(join_err) => tracing::warn!(error = %join_err, "graph-db write task panicked"),
            }
        }
    }
}
