//! Chain execution: persists a chain's DAG once at `POST
//! /chains/<id>/execute`, submits its root jobs, and advances blocked
//! dependents as the poll loop folds in each `JobOutcome`. `DependencyMachine`
//! itself is pure and in-memory (§C7); this module is the durable shell
//! around it — reconstructing the machine from `job_chains.edges` on every
//! advance rather than keeping it resident, since a chain's lifetime spans
//! many poll cycles.

use std::collections::{HashMap, HashSet};

use ingestion_jobs::{DependencyMachine, EdgeCondition, JobCompleted, JobStatus};
use job_engine::Machine;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ChainNodeSpec {
    pub node_id: String,
    pub source: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ChainEdgeSpec {
    pub from: String,
    pub to: String,
    pub condition: ChainEdgeCondition,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainEdgeCondition {
    OnSuccess,
    OnFailure,
    OnCompletion,
}

impl From<ChainEdgeCondition> for EdgeCondition {
    fn from(value: ChainEdgeCondition) -> Self {
        match value {
            ChainEdgeCondition::OnSuccess => EdgeCondition::OnSuccess,
            ChainEdgeCondition::OnFailure => EdgeCondition::OnFailure,
            ChainEdgeCondition::OnCompletion => EdgeCondition::OnCompletion,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChainDefinition {
    pub nodes: Vec<ChainNodeSpec>,
    pub edges: Vec<ChainEdgeSpec>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("chain contains a cycle")]
    Cycle,
    #[error("edge references unknown node id: {0}")]
    UnknownNode(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Creates the chain's job rows (roots PENDING, dependents BLOCKED),
/// persists the edge list keyed by node id, and returns the chain id plus
/// every node's freshly minted job id. `max_retries_for` looks up each
/// node's own declared retry budget from its registered adapter, the same
/// as a standalone `POST /sources/<src>/ingest` submission does.
pub async fn execute(
    pool: &PgPool,
    chain_id: Uuid,
    definition: ChainDefinition,
    max_retries_for: impl Fn(&str) -> Option<u32>,
) -> Result<Vec<Uuid>, ChainError> {
    let node_ids: Vec<Uuid> = (0..definition.nodes.len()).map(|_| Uuid::new_v4()).collect();
    let by_node_id: HashMap<&str, Uuid> =
        definition.nodes.iter().zip(&node_ids).map(|(n, id)| (n.node_id.as_str(), *id)).collect();

    let mut edges: Vec<(Uuid, Uuid, EdgeCondition)> = Vec::with_capacity(definition.edges.len());
    for e in &definition.edges {
        let from = *by_node_id.get(e.from.as_str()).ok_or_else(|| ChainError::UnknownNode(e.from.clone()))?;
        let to = *by_node_id.get(e.to.as_str()).ok_or_else(|| ChainError::UnknownNode(e.to.clone()))?;
        edges.push((from, to, e.condition.into()));
    }

    let machine = DependencyMachine::new(node_ids.clone(), edges).map_err(|_| ChainError::Cycle)?;
    let roots: HashSet<Uuid> = machine.roots().into_iter().collect();

    let edges_json: Vec<(String, String, ChainEdgeCondition)> =
        definition.edges.iter().map(|e| (e.from.clone(), e.to.clone(), e.condition)).collect();
    let node_index: HashMap<String, Uuid> =
        definition.nodes.iter().zip(&node_ids).map(|(n, id)| (n.node_id.clone(), *id)).collect();

    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO job_chains (id, edges) VALUES ($1, $2)")
        .bind(chain_id)
        .bind(serde_json::json!({ "edges": edges_json, "node_index": node_index }))
        .execute(&mut *tx)
        .await?;

    for (node, job_id) in definition.nodes.iter().zip(&node_ids) {
        let status = if roots.contains(job_id) { "pending" } else { "blocked" };
        let max_retries = max_retries_for(&node.source).map(|n| n as i32);
        sqlx::query(
            "INSERT INTO ingestion_jobs (id, source, payload, status, chain_id, chain_node_id, max_retries) \
             VALUES ($1, $2, $3, $4, $5, $6, coalesce($7, 3))",
        )
        .bind(job_id)
        .bind(&node.source)
        .bind(&node.payload)
        .bind(status)
        .bind(chain_id)
        .bind(&node.node_id)
        .bind(max_retries)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(node_ids)
}

/// Called after a job completes: reconstructs the owning chain's
/// `DependencyMachine`, decides which BLOCKED dependents just became
/// eligible, and flips them to PENDING for the next poll cycle to claim.
pub async fn advance(pool: &PgPool, job_id: Uuid, succeeded: bool) -> Result<(), ChainError> {
    let Some(job) = sqlx::query("SELECT chain_id FROM ingestion_jobs WHERE id = $1").bind(job_id).fetch_optional(pool).await? else {
        return Ok(());
    };
    let Some(chain_id): Option<Uuid> = job.get("chain_id") else { return Ok(()) };

    let chain_row = sqlx::query("SELECT edges FROM job_chains WHERE id = $1").bind(chain_id).fetch_one(pool).await?;
    let raw: serde_json::Value = chain_row.get("edges");
    let edges_raw: Vec<(String, String, ChainEdgeCondition)> =
        serde_json::from_value(raw["edges"].clone()).unwrap_or_default();
    let node_index: HashMap<String, Uuid> = serde_json::from_value(raw["node_index"].clone()).unwrap_or_default();

    let nodes: Vec<Uuid> = node_index.values().copied().collect();
    let edges: Vec<(Uuid, Uuid, EdgeCondition)> = edges_raw
        .iter()
        .filter_map(|(from, to, cond)| Some((*node_index.get(from)?, *node_index.get(to)?, (*cond).into())))
        .collect();

    let mut machine = DependencyMachine::new(nodes, edges).map_err(|_| ChainError::Cycle)?;
    let status = if succeeded { JobStatus::Success } else { JobStatus::Failed };
    let commands = machine.decide(&JobCompleted { job_id, status });

    for command in commands {
        sqlx::query("UPDATE ingestion_jobs SET status = 'pending' WHERE id = $1 AND status = 'blocked'")
            .bind(command.job_id)
            .execute(pool)
            .await?;
    }
    Ok(())
}
