#![forbid(unsafe_code)]

//! Dependency graph of figure, grid and panel rectangles.
//!
//! # Design
//!
//! The graph is what a constrained-layout solver consumes: every node carries
//! its current rectangle in normalized figure coordinates, and an edge
//! `child → parent` records that the child's placement is derived from the
//! parent's region. The figure itself is the single root.
//!
//! ```text
//! Figure
//!  ├── Grid G1 (2x2)
//!  │    ├── Panel P1
//!  │    └── Grid G2 (nested in a G1 slot)
//!  │         └── Panel P2
//!  └── Panel P3 (free rectangle)
//! ```
//!
//! ## Data Structure: Per-Node Adjacency Lists
//!
//! Forward edges (`depends on`) and reverse edges (`depended on by`) are
//! stored per node, so both directions are O(degree).
//!
//! | Operation           | Time         |
//! |---------------------|--------------|
//! | Add node            | O(1) amort.  |
//! | Add dependency edge | O(V+E) cycle |
//! | Pre-order traversal | O(V+E)       |
//!
//! # Cycle Detection
//!
//! Before adding `A → B` the graph checks that `B` cannot already reach `A`.
//! Cycles would make a solve order undefined and are rejected with
//! [`CycleError`].
//!
//! # Deterministic Traversal
//!
//! [`ConstraintGraph::pre_order`] visits parents before children and
//! children in insertion order, so solvers see the same order every pass.

use std::fmt;

use figlay_core::{GridId, PanelId, Rect, geometry};
use rustc_hash::FxHashMap;

/// Handle into the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The figure root.
    pub const ROOT: Self = Self(0);

    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// What a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Figure,
    Grid { id: GridId, nrows: u16, ncols: u16 },
    Panel(PanelId),
}

/// A node and its current rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub kind: NodeKind,
    pub rect: Rect,
}

/// Adding an edge would create a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub from: NodeId,
    pub to: NodeId,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "layout cycle detected: {} → {} would create a cycle",
            self.from, self.to
        )
    }
}

impl std::error::Error for CycleError {}

/// Figure → grid → panel dependency graph.
#[derive(Debug, Clone)]
pub struct ConstraintGraph {
    nodes: Vec<LayoutNode>,
    /// `fwd_adj[i]`: nodes that node `i` depends on.
    fwd_adj: Vec<Vec<NodeId>>,
    /// `rev_adj[i]`: nodes that depend on node `i`.
    rev_adj: Vec<Vec<NodeId>>,
    grids: FxHashMap<GridId, NodeId>,
    panels: FxHashMap<PanelId, NodeId>,
}

impl Default for ConstraintGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintGraph {
    /// Graph holding only the figure root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![LayoutNode {
                kind: NodeKind::Figure,
                rect: geometry::UNIT,
            }],
            fwd_adj: vec![Vec::new()],
            rev_adj: vec![Vec::new()],
            grids: FxHashMap::default(),
            panels: FxHashMap::default(),
        }
    }

    fn push(&mut self, node: LayoutNode) -> NodeId {
        // The graph never approaches u32::MAX nodes; saturate rather than wrap.
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(node);
        self.fwd_adj.push(Vec::new());
        self.rev_adj.push(Vec::new());
        id
    }

    /// Add a grid region depending on `parent`. Re-adding a known grid
    /// returns its existing node.
    pub fn add_grid(
        &mut self,
        id: GridId,
        geometry: (u16, u16),
        rect: Rect,
        parent: NodeId,
    ) -> Result<NodeId, CycleError> {
        if let Some(&node) = self.grids.get(&id) {
            return Ok(node);
        }
        let node = self.push(LayoutNode {
            kind: NodeKind::Grid {
                id,
                nrows: geometry.0,
                ncols: geometry.1,
            },
            rect,
        });
        self.add_edge(node, parent)?;
        self.grids.insert(id, node);
        Ok(node)
    }

    /// Add a panel depending on `parent`. Re-adding a known panel returns its
    /// existing node.
    pub fn add_panel(
        &mut self,
        id: PanelId,
        rect: Rect,
        parent: NodeId,
    ) -> Result<NodeId, CycleError> {
        if let Some(&node) = self.panels.get(&id) {
            return Ok(node);
        }
        let node = self.push(LayoutNode {
            kind: NodeKind::Panel(id),
            rect,
        });
        self.add_edge(node, parent)?;
        self.panels.insert(id, node);
        Ok(node)
    }

    /// Add a dependency edge: `from` depends on `to`.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<(), CycleError> {
        let known = from.index() < self.nodes.len() && to.index() < self.nodes.len();
        if !known || from == to || self.can_reach(to, from) {
            return Err(CycleError { from, to });
        }
        self.fwd_adj[from.index()].push(to);
        self.rev_adj[to.index()].push(from);
        Ok(())
    }

    fn can_reach(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            let idx = current.index();
            if idx >= self.nodes.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;
            stack.extend(self.fwd_adj[idx].iter().copied());
        }
        false
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&LayoutNode> {
        self.nodes.get(id.index())
    }

    #[must_use]
    pub fn grid_node(&self, id: GridId) -> Option<NodeId> {
        self.grids.get(&id).copied()
    }

    #[must_use]
    pub fn panel_node(&self, id: PanelId) -> Option<NodeId> {
        self.panels.get(&id).copied()
    }

    /// Nodes `id` depends on.
    #[must_use]
    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        self.fwd_adj.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Nodes depending on `id`.
    #[must_use]
    pub fn dependents(&self, id: NodeId) -> &[NodeId] {
        self.rev_adj.get(id.index()).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the figure root is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Panel ids and rectangles, in insertion order.
    pub fn panels(&self) -> impl Iterator<Item = (PanelId, Rect)> + '_ {
        self.nodes.iter().filter_map(|n| match n.kind {
            NodeKind::Panel(id) => Some((id, n.rect)),
            _ => None,
        })
    }

    /// All nodes reachable from the root, parents first (DFS pre-order).
    #[must_use]
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            let idx = id.index();
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            order.push(id);
            // Reverse so the first-added child is visited first.
            for &child in self.rev_adj[idx].iter().rev() {
                if !visited[child.index()] {
                    stack.push(child);
                }
            }
        }
        order
    }
}
