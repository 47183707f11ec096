//! The task graph container.

use std::collections::{HashMap, VecDeque};

use super::types::{GraphError, TaskId, TaskSpec};

/// A directed acyclic graph of tasks.
///
/// Tasks keep their insertion order, which also breaks ties in
/// `topological_order`.
#[derive(Debug, Clone)]
pub struct Graph {
    dag_id: String,
    tasks: Vec<TaskSpec>,
    index: HashMap<TaskId, usize>,
    upstream: Vec<Vec<usize>>,
    downstream: Vec<Vec<usize>>,
}

impl Graph {
    pub fn new(dag_id: impl Into<String>) -> Self {
        Self {
            dag_id: dag_id.into(),
            tasks: Vec::new(),
            index: HashMap::new(),
            upstream: Vec::new(),
            downstream: Vec::new(),
        }
    }

    pub fn dag_id(&self) -> &str {
        &self.dag_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    /// Add a task; ids must be unique.
    pub fn add_task(&mut self, task: TaskSpec) -> Result<TaskId, GraphError> {
        if self.index.contains_key(&task.id) {
            return Err(GraphError::DuplicateTask(task.id));
        }
        let id = task.id.clone();
        self.index.insert(id.clone(), self.tasks.len());
        self.tasks.push(task);
        self.upstream.push(Vec::new());
        self.downstream.push(Vec::new());
        Ok(id)
    }

    pub(crate) fn position(&self, id: &str) -> Result<usize, GraphError> {
        self.index
            .get(&TaskId::from(id))
            .copied()
            .ok_or_else(|| GraphError::UnknownTask(TaskId::from(id)))
    }

    pub fn task(&self, id: &str) -> Option<&TaskSpec> {
        self.position(id).ok().map(|i| &self.tasks[i])
    }

    /// `from` must finish successfully before `to` starts.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        let from_idx = self.position(from)?;
        let to_idx = self.position(to)?;

        if from_idx == to_idx {
            return Err(GraphError::SelfLoop(TaskId::from(from)));
        }
        if self.downstream[from_idx].contains(&to_idx) {
            return Err(GraphError::DuplicateEdge(TaskId::from(from), TaskId::from(to)));
        }

        self.downstream[from_idx].push(to_idx);
        self.upstream[to_idx].push(from_idx);
        Ok(())
    }

    /// `a >> b >> c ...`
    pub fn chain(&mut self, ids: &[&str]) -> Result<(), GraphError> {
        for pair in ids.windows(2) {
            self.add_edge(pair[0], pair[1])?;
        }
        Ok(())
    }

    /// `from >> [to, ...]`
    pub fn fan_out(&mut self, from: &str, to: &[&str]) -> Result<(), GraphError> {
        to.iter().try_for_each(|t| self.add_edge(from, t))
    }

    /// `[from, ...] >> to`
    pub fn fan_in(&mut self, from: &[&str], to: &str) -> Result<(), GraphError> {
        from.iter().try_for_each(|f| self.add_edge(f, to))
    }

    pub fn upstream(&self, id: &str) -> Result<Vec<&TaskId>, GraphError> {
        let idx = self.position(id)?;
        Ok(self.upstream[idx].iter().map(|&i| &self.tasks[i].id).collect())
    }

    pub fn downstream(&self, id: &str) -> Result<Vec<&TaskId>, GraphError> {
        let idx = self.position(id)?;
        Ok(self.downstream[idx].iter().map(|&i| &self.tasks[i].id).collect())
    }

    pub(crate) fn upstream_indices(&self, idx: usize) -> &[usize] {
        &self.upstream[idx]
    }

    pub(crate) fn downstream_indices(&self, idx: usize) -> &[usize] {
        &self.downstream[idx]
    }

    /// Task indices in dependency order (Kahn's algorithm).
    pub(crate) fn topological_indices(&self) -> Result<Vec<usize>, GraphError> {
        let mut in_degree: Vec<usize> = self.upstream.iter().map(|u| u.len()).collect();
        let mut ready: VecDeque<usize> = (0..self.tasks.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.tasks.len());

        while let Some(idx) = ready.pop_front() {
            order.push(idx);
            for &next in &self.downstream[idx] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if order.len() != self.tasks.len() {
            let stuck = (0..self.tasks.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.tasks[i].id.clone())
                .collect();
            return Err(GraphError::Cycle(stuck));
        }

        Ok(order)
    }

    /// Tasks in an order where every task follows all of its upstreams.
    pub fn topological_order(&self) -> Result<Vec<&TaskSpec>, GraphError> {
        Ok(self
            .topological_indices()?
            .into_iter()
            .map(|i| &self.tasks[i])
            .collect())
    }

    /// Reject cycles.
    pub fn validate(&self) -> Result<(), GraphError> {
        self.topological_indices().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TaskKind;

    fn graph_with(ids: &[&str]) -> Graph {
        let mut graph = Graph::new("test");
        for id in ids {
            graph.add_task(TaskSpec::new(*id, TaskKind::Empty)).unwrap();
        }
        graph
    }

    fn order(graph: &Graph) -> Vec<String> {
        graph
            .topological_order()
            .unwrap()
            .iter()
            .map(|t| t.id.to_string())
            .collect()
    }

    #[test]
    fn test_duplicate_task_rejected() {
        let mut graph = graph_with(&["a"]);
        let err = graph.add_task(TaskSpec::new("a", TaskKind::Empty)).unwrap_err();
        assert_eq!(err, GraphError::DuplicateTask(TaskId::from("a")));
    }

    #[test]
    fn test_edge_errors() {
        let mut graph = graph_with(&["a", "b"]);
        assert_eq!(
            graph.add_edge("a", "missing").unwrap_err(),
            GraphError::UnknownTask(TaskId::from("missing"))
        );
        assert_eq!(
            graph.add_edge("a", "a").unwrap_err(),
            GraphError::SelfLoop(TaskId::from("a"))
        );
        graph.add_edge("a", "b").unwrap();
        assert!(matches!(
            graph.add_edge("a", "b"),
            Err(GraphError::DuplicateEdge(_, _))
        ));
    }

    #[test]
    fn test_topological_order_respects_edges() {
        let mut graph = graph_with(&["join", "left", "right", "start"]);
        graph.fan_out("start", &["left", "right"]).unwrap();
        graph.fan_in(&["left", "right"], "join").unwrap();

        assert_eq!(order(&graph), vec!["start", "left", "right", "join"]);
        assert_eq!(graph.upstream("join").unwrap().len(), 2);
        assert_eq!(graph.downstream("start").unwrap().len(), 2);
    }

    #[test]
    fn test_chain() {
        let mut graph = graph_with(&["c", "b", "a"]);
        graph.chain(&["a", "b", "c"]).unwrap();
        assert_eq!(order(&graph), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = graph_with(&["a", "b", "c", "d"]);
        graph.chain(&["a", "b", "c"]).unwrap();
        graph.add_edge("c", "b").unwrap();

        match graph.validate().unwrap_err() {
            GraphError::Cycle(ids) => {
                assert_eq!(ids, vec![TaskId::from("b"), TaskId::from("c")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_graph_is_valid() {
        let graph = Graph::new("empty");
        assert!(graph.is_empty());
        assert!(graph.validate().is_ok());
    }
}
