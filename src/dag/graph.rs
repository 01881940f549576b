// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::task::{TaskBody, TaskId, TaskInfo, TaskName, TaskNode, TaskSpec, TaskState};
use crate::errors::{BootError, Result};

/// Frozen dependency graph for one startup run.
///
/// Nodes are addressed by [`TaskId`]; names resolve through a registry built
/// at registration time. Edges are declared on the [`GraphBuilder`] and wired
/// in [`GraphBuilder::build`]; a built graph is read-only, so no edge can be
/// added once a task may have started.
#[derive(Debug)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    index: HashMap<TaskName, TaskId>,
    frontier: Vec<TaskId>,
}

impl TaskGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve a task name to its id.
    pub fn id_of(&self, name: &str) -> Option<TaskId> {
        self.index.get(name).copied()
    }

    pub fn info(&self, id: TaskId) -> &TaskInfo {
        &self.nodes[id.0].info
    }

    pub fn state(&self, id: TaskId) -> TaskState {
        self.nodes[id.0].state()
    }

    /// Predecessors of `id` that have not finished yet.
    pub fn pending_dependencies(&self, id: TaskId) -> usize {
        self.nodes[id.0].pending()
    }

    pub fn predecessors(&self, id: TaskId) -> &[TaskId] {
        &self.nodes[id.0].predecessors
    }

    /// Successors of `id`, in the order they are released (ascending priority).
    pub fn successors(&self, id: TaskId) -> &[TaskId] {
        &self.nodes[id.0].successors
    }

    /// Tasks with no dependencies, in ascending priority order.
    pub fn frontier(&self) -> &[TaskId] {
        &self.frontier
    }

    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        (0..self.nodes.len()).map(TaskId)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.info.name.as_str())
    }

    /// Tasks that have not reached [`TaskState::Finished`].
    pub fn unfinished(&self) -> Vec<TaskName> {
        self.nodes
            .iter()
            .filter(|n| n.state() != TaskState::Finished)
            .map(|n| n.info.name.clone())
            .collect()
    }

    /// Wire `dependency` as a predecessor of `task`.
    ///
    /// Bumps the pending count of `task` and appends `task` to the successor
    /// list of `dependency`. Both halves of the edge are written together.
    /// Only called from [`GraphBuilder::build`], while every task is idle.
    fn link(&mut self, task: TaskId, dependency: TaskId) -> Result<()> {
        if task == dependency {
            return Err(BootError::SelfDependency(self.nodes[task.0].info.name.clone()));
        }
        debug_assert_eq!(self.nodes[task.0].state(), TaskState::Idle);

        let node = &mut self.nodes[task.0];
        node.add_pending();
        node.predecessors.push(dependency);
        self.nodes[dependency.0].successors.push(task);
        Ok(())
    }

    pub(crate) fn node(&self, id: TaskId) -> &TaskNode {
        &self.nodes[id.0]
    }

    /// Stable sort by priority: ties keep their relative order.
    fn sort_by_priority(nodes: &[TaskNode], ids: &mut [TaskId]) {
        ids.sort_by_key(|id| nodes[id.0].info.priority);
    }
}

/// Collects task registrations and turns them into a [`TaskGraph`].
///
/// Registration rejects empty names and duplicate names immediately;
/// everything that needs the full task set (dependency resolution, cycle
/// detection, the start frontier) happens in [`GraphBuilder::build`]. A
/// broken graph is therefore always rejected before any task runs.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    specs: Vec<TaskSpec>,
    index: HashMap<TaskName, TaskId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Register a task.
    pub fn add(&mut self, spec: TaskSpec) -> Result<TaskId> {
        if spec.name.trim().is_empty() {
            return Err(BootError::EmptyTaskName);
        }
        if self.index.contains_key(&spec.name) {
            return Err(BootError::DuplicateTask(spec.name));
        }

        let id = TaskId(self.specs.len());
        self.index.insert(spec.name.clone(), id);
        self.specs.push(spec);
        Ok(id)
    }

    /// Declare that `task` depends on `dependency`, on top of the names the
    /// task was registered with.
    ///
    /// `task` must already be registered. `dependency` is resolved in
    /// [`GraphBuilder::build`] like any other dependency name, so cycles and an
    /// empty frontier are still rejected there.
    pub fn add_dependency(&mut self, task: &str, dependency: impl Into<TaskName>) -> Result<()> {
        let dependency = dependency.into();
        let id = self
            .index
            .get(task)
            .copied()
            .ok_or_else(|| BootError::TaskNotFound(task.to_string()))?;
        if dependency == task {
            return Err(BootError::SelfDependency(task.to_string()));
        }

        let spec = &mut self.specs[id.0];
        if !spec.after.contains(&dependency) {
            spec.after.push(dependency);
        }
        Ok(())
    }

    /// Resolve every dependency name, wire edges and compute the frontier.
    pub fn build(self) -> Result<TaskGraph> {
        let mut deps_by_task: Vec<Vec<TaskName>> = Vec::with_capacity(self.specs.len());
        let mut nodes: Vec<TaskNode> = Vec::with_capacity(self.specs.len());

        for spec in self.specs {
            let (info, after, body): (TaskInfo, Vec<TaskName>, TaskBody) = spec.into_parts();
            nodes.push(TaskNode::new(info, body));
            deps_by_task.push(after);
        }

        let mut graph = TaskGraph {
            nodes,
            index: self.index,
            frontier: Vec::new(),
        };

        for (idx, deps) in deps_by_task.iter().enumerate() {
            let task = TaskId(idx);
            for dep in deps {
                let dependency =
                    graph
                        .id_of(dep)
                        .ok_or_else(|| BootError::UnregisteredDependency {
                            task: graph.info(task).name.clone(),
                            dependency: dep.clone(),
                        })?;
                graph.link(task, dependency)?;
            }
        }

        let mut frontier: Vec<TaskId> = graph
            .ids()
            .filter(|id| graph.predecessors(*id).is_empty())
            .collect();

        if frontier.is_empty() && !graph.is_empty() {
            return Err(BootError::EmptyFrontier);
        }

        ensure_acyclic(&graph)?;

        TaskGraph::sort_by_priority(&graph.nodes, &mut frontier);
        for idx in 0..graph.nodes.len() {
            let mut successors = std::mem::take(&mut graph.nodes[idx].successors);
            TaskGraph::sort_by_priority(&graph.nodes, &mut successors);
            graph.nodes[idx].successors = successors;
        }
        graph.frontier = frontier;

        let roots: Vec<&str> = graph
            .frontier
            .iter()
            .map(|id| graph.info(*id).name.as_str())
            .collect();
        debug!(tasks = graph.len(), ?roots, "task graph built");

        Ok(graph)
    }
}

/// Reject graphs where some task (transitively) depends on itself.
///
/// Edge direction: dependency -> task.
fn ensure_acyclic(graph: &TaskGraph) -> Result<()> {
    let mut dag: DiGraphMap<usize, ()> = DiGraphMap::new();

    for id in graph.ids() {
        dag.add_node(id.0);
    }
    for id in graph.ids() {
        for dep in graph.predecessors(id) {
            dag.add_edge(dep.0, id.0, ());
        }
    }

    match toposort(&dag, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let name = &graph.info(TaskId(cycle.node_id())).name;
            Err(BootError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                name
            )))
        }
    }
}
