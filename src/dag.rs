//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Qi.
//! The Qi project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Block Graph
//!
//! Arena-backed directed graph over block names. Nodes are addressed by a
//! stable [`QiNodeId`] (their insertion index); edges are kept as adjacency
//! lists in both directions so arity checks, topological sorting and
//! downstream propagation are all cheap.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::errors::{QiError, Result};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct QiNodeId(pub usize);

impl fmt::Display for QiNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, Default)]
pub struct QiDAG {
    names: Vec<String>,
    index: HashMap<String, QiNodeId>,
    successors: Vec<Vec<QiNodeId>>,
    predecessors: Vec<Vec<QiNodeId>>,
}

impl QiDAG {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node; names must be unique.
    pub fn add_node(&mut self, name: impl Into<String>) -> Result<QiNodeId> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(QiError::DuplicateName {
                what: "block".into(),
                name,
            });
        }
        let id = QiNodeId(self.names.len());
        self.index.insert(name.clone(), id);
        self.names.push(name);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        Ok(id)
    }

    /// Adds an edge between two named nodes.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        let from_id = self.require(from)?;
        let to_id = self.require(to)?;
        if self.successors[from_id.0].contains(&to_id) {
            return Err(QiError::edge(from, to, "edge declared twice"));
        }
        self.successors[from_id.0].push(to_id);
        self.predecessors[to_id.0].push(from_id);
        Ok(())
    }

    pub fn node_id(&self, name: &str) -> Option<QiNodeId> {
        self.index.get(name).copied()
    }

    fn require(&self, name: &str) -> Result<QiNodeId> {
        self.node_id(name)
            .ok_or_else(|| QiError::UnknownBlock { name: name.into() })
    }

    pub fn name(&self, id: QiNodeId) -> &str {
        &self.names[id.0]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn successors(&self, id: QiNodeId) -> &[QiNodeId] {
        &self.successors[id.0]
    }

    pub fn predecessors(&self, id: QiNodeId) -> &[QiNodeId] {
        &self.predecessors[id.0]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = QiNodeId> + '_ {
        (0..self.names.len()).map(QiNodeId)
    }

    /// Returns a node lying on a cycle, if the graph has one.
    ///
    /// Iterative depth-first search; the target of the first back edge found
    /// is on the cycle.
    pub fn find_cycle(&self) -> Option<QiNodeId> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            Active,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.len()];
        for root in self.node_ids() {
            if marks[root.0] != Mark::Unvisited {
                continue;
            }
            let mut stack: Vec<(QiNodeId, usize)> = vec![(root, 0)];
            marks[root.0] = Mark::Active;
            while let Some((node, next)) = stack.last_mut() {
                let node = *node;
                match self.successors[node.0].get(*next) {
                    Some(&succ) => {
                        *next += 1;
                        match marks[succ.0] {
                            Mark::Active => return Some(succ),
                            Mark::Unvisited => {
                                marks[succ.0] = Mark::Active;
                                stack.push((succ, 0));
                            }
                            Mark::Done => {}
                        }
                    }
                    None => {
                        marks[node.0] = Mark::Done;
                        stack.pop();
                    }
                }
            }
        }
        None
    }

    /// Topological order (Kahn), ties broken by insertion order.
    pub fn topological_sort(&self) -> Result<Vec<QiNodeId>> {
        if let Some(node) = self.find_cycle() {
            return Err(QiError::CyclicPipeline {
                block: self.name(node).to_string(),
            });
        }

        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut queue: VecDeque<QiNodeId> = self
            .node_ids()
            .filter(|id| in_degree[id.0] == 0)
            .collect();
        let mut sorted = Vec::with_capacity(self.len());

        while let Some(node) = queue.pop_front() {
            sorted.push(node);
            for &succ in &self.successors[node.0] {
                in_degree[succ.0] -= 1;
                if in_degree[succ.0] == 0 {
                    queue.push_back(succ);
                }
            }
        }

        if sorted.len() != self.len() {
            return Err(QiError::internal("topological sort left nodes unvisited"));
        }
        Ok(sorted)
    }

    /// Splits `order` into weakly connected components, each keeping the
    /// relative order of `order`. Components are listed by first appearance.
    pub fn components(&self, order: &[QiNodeId]) -> Vec<Vec<QiNodeId>> {
        let mut component_of = vec![usize::MAX; self.len()];
        let mut count = 0;
        for start in self.node_ids() {
            if component_of[start.0] != usize::MAX {
                continue;
            }
            let mut queue = VecDeque::from([start]);
            component_of[start.0] = count;
            while let Some(node) = queue.pop_front() {
                let neighbours = self.successors[node.0]
                    .iter()
                    .chain(self.predecessors[node.0].iter());
                for &next in neighbours {
                    if component_of[next.0] == usize::MAX {
                        component_of[next.0] = count;
                        queue.push_back(next);
                    }
                }
            }
            count += 1;
        }

        let mut components: Vec<Vec<QiNodeId>> = Vec::new();
        let mut slot: HashMap<usize, usize> = HashMap::new();
        for &node in order {
            let component = component_of[node.0];
            let position = *slot.entry(component).or_insert_with(|| {
                components.push(Vec::new());
                components.len() - 1
            });
            components[position].push(node);
        }
        components
    }

    /// Every node reachable from `id`, excluding `id` itself.
    pub fn downstream(&self, id: QiNodeId) -> Vec<QiNodeId> {
        let mut seen = vec![false; self.len()];
        let mut queue = VecDeque::from([id]);
        let mut out = Vec::new();
        while let Some(node) = queue.pop_front() {
            for &succ in &self.successors[node.0] {
                if !seen[succ.0] {
                    seen[succ.0] = true;
                    out.push(succ);
                    queue.push_back(succ);
                }
            }
        }
        out
    }
}
