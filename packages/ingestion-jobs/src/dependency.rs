//! Dependency Engine (C7): a `job-engine` `Machine` over a job chain's DAG.
//! PENDING for no-dependency steps at chain start, BLOCKED otherwise;
//! advancing a dependent to PENDING once every incoming edge's condition is
//! satisfied. Cycle detection is a one-time topological sort (Kahn's
//! algorithm) at chain-definition time, not per-event.

use std::collections::{HashMap, HashSet, VecDeque};

use job_engine::Machine;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeCondition {
    OnSuccess,
    OnFailure,
    OnCompletion,
}

impl EdgeCondition {
    fn satisfied_by(&self, status: JobStatus) -> bool {
        match self {
            EdgeCondition::OnSuccess => status == JobStatus::Success,
            EdgeCondition::OnFailure => status == JobStatus::Failed,
            EdgeCondition::OnCompletion => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobCompleted {
    pub job_id: Uuid,
    pub status: JobStatus,
}

#[derive(Debug, Clone)]
pub struct SubmitJob {
    pub job_id: Uuid,
}

#[derive(Debug, Clone)]
struct Edge {
    from: Uuid,
    to: Uuid,
    condition: EdgeCondition,
}

/// One job chain's DAG. Built once per chain, cycle-checked at
/// construction, then driven purely by `JobCompleted` events.
pub struct DependencyMachine {
    edges: Vec<Edge>,
    /// Incoming edges still unsatisfied, per node.
    pending_incoming: HashMap<Uuid, usize>,
    submitted: HashSet<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("job chain contains a cycle")]
    Cycle,
}

impl DependencyMachine {
    /// `nodes` is every job in the chain; `edges` is `(from, to, condition)`
    /// — `to` becomes eligible once `from` completes and `condition` holds.
    pub fn new(nodes: Vec<Uuid>, edges: Vec<(Uuid, Uuid, EdgeCondition)>) -> Result<Self, DependencyError> {
        let edges: Vec<Edge> = edges.into_iter().map(|(from, to, condition)| Edge { from, to, condition }).collect();
        detect_cycle(&nodes, &edges)?;

        let mut pending_incoming = HashMap::new();
        for node in &nodes {
            pending_incoming.insert(*node, 0);
        }
        for edge in &edges {
            *pending_incoming.entry(edge.to).or_insert(0) += 1;
        }

        Ok(Self { edges, pending_incoming, submitted: HashSet::new() })
    }

    /// Jobs with no incoming edges: PENDING immediately at chain start.
    pub fn roots(&self) -> Vec<Uuid> {
        self.pending_incoming
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| *node)
            .collect()
    }

    /// Every node is terminal (submitted) or permanently blocked (no
    /// satisfied path will ever reach it).
    pub fn is_complete(&self, terminal: &HashSet<Uuid>) -> bool {
        self.pending_incoming.keys().all(|node| terminal.contains(node) || self.submitted.contains(node))
    }
}

fn detect_cycle(nodes: &[Uuid], edges: &[Edge]) -> Result<(), DependencyError> {
    let mut in_degree: HashMap<Uuid, usize> = nodes.iter().map(|n| (*n, 0)).collect();
    let mut adjacency: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for edge in edges {
        *in_degree.entry(edge.to).or_insert(0) += 1;
        adjacency.entry(edge.from).or_default().push(edge.to);
    }

    let mut queue: VecDeque<Uuid> = in_degree.iter().filter(|(_, d)| **d == 0).map(|(n, _)| *n).collect();
    let mut visited = 0;
    while let Some(node) = queue.pop_front() {
        visited += 1;
        if let Some(children) = adjacency.get(&node) {
            for child in children {
                let degree = in_degree.get_mut(child).expect("child present in in_degree map");
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*child);
                }
            }
        }
    }

    if visited == nodes.len() {
        Ok(())
    } else {
        Err(DependencyError::Cycle)
    }
}

impl Machine for DependencyMachine {
    type Event = JobCompleted;
    type Command = SubmitJob;

    fn decide(&mut self, event: &JobCompleted) -> Vec<SubmitJob> {
        let mut commands = Vec::new();
        let satisfied_targets: Vec<Uuid> = self
            .edges
            .iter()
            .filter(|edge| edge.from == event.job_id && edge.condition.satisfied_by(event.status))
            .map(|edge| edge.to)
            .collect();

        for target in satisfied_targets {
            if let Some(count) = self.pending_incoming.get_mut(&target) {
                *count = count.saturating_sub(1);
                if *count == 0 && !self.submitted.contains(&target) {
                    self.submitted.insert(target);
                    commands.push(SubmitJob { job_id: target });
                }
            }
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(n: u8) -> Uuid {
        Uuid::from_bytes([n; 16])
    }

    #[test]
    fn roots_have_no_incoming_edges() {
        let (a, b, c) = (uuid(1), uuid(2), uuid(3));
        let machine =
            DependencyMachine::new(vec![a, b, c], vec![(a, b, EdgeCondition::OnSuccess)]).unwrap();
        let mut roots = machine.roots();
        roots.sort();
        let mut expected = vec![a, c];
        expected.sort();
        assert_eq!(roots, expected);
    }

    #[test]
    fn dependent_unblocks_on_success() {
        let (a, b) = (uuid(1), uuid(2));
        let mut machine =
            DependencyMachine::new(vec![a, b], vec![(a, b, EdgeCondition::OnSuccess)]).unwrap();
        let commands = machine.decide(&JobCompleted { job_id: a, status: JobStatus::Success });
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].job_id, b);
    }

    #[test]
    fn on_success_edge_does_not_fire_on_failure() {
        let (a, b) = (uuid(1), uuid(2));
        let mut machine =
            DependencyMachine::new(vec![a, b], vec![(a, b, EdgeCondition::OnSuccess)]).unwrap();
        let commands = machine.decide(&JobCompleted { job_id: a, status: JobStatus::Failed });
        assert!(commands.is_empty());
    }

    #[test]
    fn dependent_with_multiple_edges_waits_for_all() {
        let (a, b, c) = (uuid(1), uuid(2), uuid(3));
        let mut machine = DependencyMachine::new(
            vec![a, b, c],
            vec![(a, c, EdgeCondition::OnSuccess), (b, c, EdgeCondition::OnSuccess)],
        )
        .unwrap();
        let first = machine.decide(&JobCompleted { job_id: a, status: JobStatus::Success });
        assert!(first.is_empty());
        let second = machine.decide(&JobCompleted { job_id: b, status: JobStatus::Success });
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].job_id, c);
    }

    #[test]
    fn cycle_is_rejected_at_construction() {
        let (a, b) = (uuid(1), uuid(2));
        let result = DependencyMachine::new(
            vec![a, b],
            vec![(a, b, EdgeCondition::OnSuccess), (b, a, EdgeCondition::OnSuccess)],
        );
        assert!(matches!(result, Err(DependencyError::Cycle)));
    }
}
