//! Task-code interning and the dependency DAG induced by a task selection.
//!
//! Both the scheduler and the critical path analyzer build a [`TaskGraph`]
//! restricted to their task set and walk it in topological order.

use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use crate::error::PlanningError;
use crate::models::DependencyEdge;

/// Interned task index (u32 for compact storage and fast hashing).
pub type TaskIdx = u32;

/// Maps task code strings to dense integer indices in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TaskCodeIndex {
    to_idx: FxHashMap<String, TaskIdx>,
    codes: Vec<String>,
}

impl TaskCodeIndex {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_idx: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            codes: Vec::with_capacity(capacity),
        }
    }

    /// Intern a code, returning its index. Re-interning returns the existing index.
    pub fn intern(&mut self, code: &str) -> TaskIdx {
        if let Some(&idx) = self.to_idx.get(code) {
            return idx;
        }
        let idx = self.codes.len() as TaskIdx;
        self.codes.push(code.to_string());
        self.to_idx.insert(code.to_string(), idx);
        idx
    }

    #[inline]
    pub fn get(&self, code: &str) -> Option<TaskIdx> {
        self.to_idx.get(code).copied()
    }

    #[inline]
    pub fn contains(&self, code: &str) -> bool {
        self.to_idx.contains_key(code)
    }

    /// The code for an index. Panics on an index this map never produced.
    #[inline]
    pub fn code(&self, idx: TaskIdx) -> &str {
        &self.codes[idx as usize]
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Adjacency lists as (neighbour, edge) pairs, indexed by task index.
type Adjacency<'e> = Vec<Vec<(TaskIdx, &'e DependencyEdge)>>;

/// Dependency graph restricted to a task set and the edges between its members.
#[derive(Debug, Clone)]
pub struct TaskGraph<'e> {
    index: TaskCodeIndex,
    incoming: Adjacency<'e>,
    outgoing: Adjacency<'e>,
    edge_count: usize,
}

impl<'e> TaskGraph<'e> {
    /// Build the subgraph induced by `task_codes`.
    ///
    /// Node order follows `task_codes` (duplicates collapse to the first
    /// occurrence). Edges with an endpoint outside the set are ignored.
    pub fn induced<'c, I>(task_codes: I, edges: &'e [DependencyEdge]) -> Self
    where
        I: IntoIterator<Item = &'c str>,
    {
        let mut index = TaskCodeIndex::default();
        for code in task_codes {
            index.intern(code);
        }

        let n = index.len();
        let mut incoming: Adjacency<'e> = vec![Vec::new(); n];
        let mut outgoing: Adjacency<'e> = vec![Vec::new(); n];
        let mut edge_count = 0;

        for edge in edges {
            let (Some(pred), Some(succ)) = (
                index.get(&edge.predecessor_task_code),
                index.get(&edge.successor_task_code),
            ) else {
                continue;
            };
            outgoing[pred as usize].push((succ, edge));
            incoming[succ as usize].push((pred, edge));
            edge_count += 1;
        }

        Self {
            index,
            incoming,
            outgoing,
            edge_count,
        }
    }

    pub fn index(&self) -> &TaskCodeIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Edges into a task, as (predecessor, edge).
    pub fn incoming(&self, idx: TaskIdx) -> &[(TaskIdx, &'e DependencyEdge)] {
        &self.incoming[idx as usize]
    }

    /// Edges out of a task, as (successor, edge).
    pub fn outgoing(&self, idx: TaskIdx) -> &[(TaskIdx, &'e DependencyEdge)] {
        &self.outgoing[idx as usize]
    }

    /// Topological order using Kahn's algorithm.
    ///
    /// Sources are seeded in node order and the queue is FIFO, so the result is
    /// deterministic for a given input order.
    ///
    /// # Returns
    /// * `Err(PlanningError::CircularDependency)` naming every task that sits on
    ///   or behind a cycle.
    pub fn topological_order(&self) -> Result<Vec<TaskIdx>, PlanningError> {
        let n = self.len();
        let mut in_degree: Vec<usize> = self.incoming.iter().map(Vec::len).collect();

        let mut queue: VecDeque<TaskIdx> = (0..n as TaskIdx)
            .filter(|&idx| in_degree[idx as usize] == 0)
            .collect();
        let mut order = Vec::with_capacity(n);

        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            for &(succ, _) in self.outgoing(idx) {
                let degree = &mut in_degree[succ as usize];
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(succ);
                }
            }
        }

        if order.len() != n {
            let mut tasks: Vec<String> = (0..n as TaskIdx)
                .filter(|&idx| in_degree[idx as usize] > 0)
                .map(|idx| self.index.code(idx).to_string())
                .collect();
            tasks.sort();
            return Err(PlanningError::CircularDependency { tasks });
        }

        Ok(order)
    }
}
