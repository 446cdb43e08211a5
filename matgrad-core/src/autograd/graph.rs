//! # Computation Graph
//!
//! The graph is an arena: a [`ComputationGraph`] handle owns every [`Node`] in a
//! `Vec`, and nodes name their parents by [`NodeId`] (an index into that `Vec`).
//! A parent shared by several children is therefore stored once and released once,
//! when the last handle to the graph is dropped. Tracked matrices hold a
//! [`NodeRef`] (graph handle + id), which keeps the graph alive while they exist.
//!
//! Parents are always created before their children, so ids grow along every edge
//! and the graph cannot contain a cycle.
//!
//! Gradients flow in three explicit steps: seed the root ([`ComputationGraph::seed`]
//! or [`ComputationGraph::seed_ones`]), run [`ComputationGraph::backward`], then read
//! [`ComputationGraph::grad`] for the nodes of interest. The [`Dag`] view bundles a
//! graph with its root for the common case.
//!
//! The graph is single-threaded (`Rc<RefCell<_>>`); all gradient accumulation happens
//! on the thread that owns it.

use crate::autograd::backward_op::BackwardInputs;
use crate::autograd::op::Op;
use crate::error::MatGradError;
use crate::matrix::Matrix;
use log::{debug, trace, warn};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Index of a node inside its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in creation order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One recorded value and how it was derived.
#[derive(Debug)]
pub struct Node {
    /// Untracked copy of the forward value.
    value: Matrix,
    op: Op,
    parents: [Option<NodeId>; 2],
    /// Scalar operand of a scalar multiplication.
    scalar: Option<f64>,
    /// Gradient accumulator, same shape as `value`.
    grad: Matrix,
}

impl Node {
    pub fn value(&self) -> &Matrix {
        &self.value
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn parents(&self) -> [Option<NodeId>; 2] {
        self.parents
    }

    pub fn scalar(&self) -> Option<f64> {
        self.scalar
    }

    pub fn grad(&self) -> &Matrix {
        &self.grad
    }

    /// A node without parents.
    pub fn is_leaf(&self) -> bool {
        self.parents.iter().all(Option::is_none)
    }
}

#[derive(Debug, Default)]
struct GraphArena {
    nodes: Vec<Node>,
}

impl GraphArena {
    fn node(&self, id: NodeId, operation: &str) -> Result<&Node, MatGradError> {
        self.nodes.get(id.0).ok_or_else(|| unknown_node(id, operation))
    }

    fn node_mut(&mut self, id: NodeId, operation: &str) -> Result<&mut Node, MatGradError> {
        self.nodes.get_mut(id.0).ok_or_else(|| unknown_node(id, operation))
    }

    /// `grad[id] += contribution`.
    fn accumulate(&mut self, id: NodeId, contribution: &Matrix, source: Op) -> Result<(), MatGradError> {
        let node = self.node_mut(id, "accumulate gradient")?;
        if node.grad.shape() != contribution.shape() {
            return Err(MatGradError::shape_mismatch(
                &node.grad.shape(),
                &contribution.shape(),
                &format!("{} backward accumulation", source),
            ));
        }
        for (acc, add) in node.grad.data.iter_mut().zip(&contribution.data) {
            *acc += add;
        }
        Ok(())
    }
}

fn unknown_node(id: NodeId, operation: &str) -> MatGradError {
    MatGradError::NullArgument {
        operation: operation.to_string(),
        argument: format!("node {}", id),
    }
}

/// Shared handle to a graph arena. Cloning the handle does not copy the nodes.
#[derive(Clone, Default)]
pub struct ComputationGraph {
    arena: Rc<RefCell<GraphArena>>,
}

impl fmt::Debug for ComputationGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arena.try_borrow() {
            Ok(arena) => write!(f, "ComputationGraph(nodes={})", arena.nodes.len()),
            Err(_) => write!(f, "ComputationGraph(<borrowed>)"),
        }
    }
}

impl ComputationGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `self` and `other` are handles to the same arena.
    pub fn same_graph(&self, other: &ComputationGraph) -> bool {
        Rc::ptr_eq(&self.arena, &other.arena)
    }

    /// Number of nodes ever created in this graph.
    pub fn len(&self) -> usize {
        self.arena.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records a node for `value`, produced by `op` from the given parents.
    ///
    /// A missing `parent2` (or both parents, for a leaf) is stored as "no parent".
    /// The gradient accumulator starts as a zero matrix of the value's shape.
    ///
    /// # Errors
    /// `NullArgument` if a parent id does not belong to this graph,
    /// `AllocationFailure` if the accumulator cannot be allocated.
    pub fn create_node(
        &self,
        value: &Matrix,
        op: Op,
        parent1: Option<NodeId>,
        parent2: Option<NodeId>,
    ) -> Result<NodeId, MatGradError> {
        self.create_node_with_scalar(value, op, parent1, parent2, None)
    }

    /// [`create_node`](Self::create_node) with the scalar operand of a scalar `Mul`.
    ///
    /// # Errors
    /// `UnsupportedOperation` for a `Mul` node with a single parent and no scalar
    /// (its backward rule would have nothing to scale by), `InvalidArgument` for a
    /// scalar on any other kind of node.
    pub fn create_node_with_scalar(
        &self,
        value: &Matrix,
        op: Op,
        parent1: Option<NodeId>,
        parent2: Option<NodeId>,
        scalar: Option<f64>,
    ) -> Result<NodeId, MatGradError> {
        let scalar_form = op == Op::Mul && parent1.is_some() && parent2.is_none();
        match (scalar_form, scalar) {
            (true, None) => {
                return Err(MatGradError::UnsupportedOperation(
                    "mul node with a single parent needs a scalar operand".to_string(),
                ))
            }
            (false, Some(s)) => {
                return Err(MatGradError::InvalidArgument(format!(
                    "scalar {} given for a {} node with parents {:?}",
                    s,
                    op,
                    [parent1, parent2]
                )))
            }
            _ => {}
        }
        self.push_node(value, op, [parent1, parent2], scalar)
    }

    /// Replaces the recorded value of leaf `id` with `data`.
    ///
    /// Returns `false` and leaves the node untouched when `id` is not a leaf.
    pub(crate) fn refresh_leaf(&self, id: NodeId, data: &[f64]) -> bool {
        let mut arena = self.arena.borrow_mut();
        match arena.nodes.get_mut(id.0) {
            Some(node) if node.op == Op::Leaf && node.value.data.len() == data.len() => {
                node.value.data.copy_from_slice(data);
                true
            }
            _ => false,
        }
    }

    fn push_node(
        &self,
        value: &Matrix,
        op: Op,
        parents: [Option<NodeId>; 2],
        scalar: Option<f64>,
    ) -> Result<NodeId, MatGradError> {
        let mut arena = self.arena.borrow_mut();
        for parent in parents.iter().flatten() {
            arena.node(*parent, "create_node")?;
        }
        let grad = Matrix::zeros_like(value)?;
        let id = NodeId(arena.nodes.len());
        arena.nodes.push(Node {
            value: value.detached(),
            op,
            parents,
            scalar,
            grad,
        });
        trace!(
            "create_node: {} op={} shape={:?} parents={:?}",
            id,
            op,
            value.shape(),
            parents
        );
        Ok(id)
    }

    /// Registers `matrix` as a leaf of this graph and attaches the node to it.
    ///
    /// A matrix already tracked by this graph keeps its node and that id is returned.
    ///
    /// # Errors
    /// `GraphMismatch` if the matrix is tracked by another graph.
    pub fn track(&self, matrix: &mut Matrix) -> Result<NodeId, MatGradError> {
        if let Some(node) = matrix.node() {
            if node.graph.same_graph(self) {
                return Ok(node.id);
            }
            return Err(MatGradError::GraphMismatch {
                operation: "track".to_string(),
            });
        }
        let id = self.create_node(matrix, Op::Leaf, None, None)?;
        matrix.set_node(Some(self.node_ref(id)));
        Ok(id)
    }

    /// Handle naming node `id` of this graph.
    pub fn node_ref(&self, id: NodeId) -> NodeRef {
        NodeRef {
            graph: self.clone(),
            id,
        }
    }

    /// Untracked copy of the forward value stored on `id`.
    pub fn value(&self, id: NodeId) -> Result<Matrix, MatGradError> {
        Ok(self.arena.borrow().node(id, "value")?.value.clone())
    }

    /// Copy of the gradient accumulated on `id`.
    pub fn grad(&self, id: NodeId) -> Result<Matrix, MatGradError> {
        Ok(self.arena.borrow().node(id, "grad")?.grad.clone())
    }

    pub fn op(&self, id: NodeId) -> Result<Op, MatGradError> {
        Ok(self.arena.borrow().node(id, "op")?.op)
    }

    pub fn parents(&self, id: NodeId) -> Result<[Option<NodeId>; 2], MatGradError> {
        Ok(self.arena.borrow().node(id, "parents")?.parents)
    }

    /// Runs `f` with a borrow of node `id`.
    pub fn with_node<R>(&self, id: NodeId, f: impl FnOnce(&Node) -> R) -> Result<R, MatGradError> {
        let arena = self.arena.borrow();
        Ok(f(arena.node(id, "with_node")?))
    }

    /// Sets the gradient accumulator of `root` to `grad`.
    ///
    /// # Errors
    /// `ShapeMismatch` if `grad` does not have the root value's shape.
    pub fn seed(&self, root: NodeId, grad: &Matrix) -> Result<(), MatGradError> {
        let mut arena = self.arena.borrow_mut();
        let node = arena.node_mut(root, "seed")?;
        if node.value.shape() != grad.shape() {
            return Err(MatGradError::shape_mismatch(
                &node.value.shape(),
                &grad.shape(),
                "seed",
            ));
        }
        node.grad = grad.detached();
        Ok(())
    }

    /// Sets the gradient accumulator of `root` to all ones.
    pub fn seed_ones(&self, root: NodeId) -> Result<(), MatGradError> {
        let mut arena = self.arena.borrow_mut();
        let node = arena.node_mut(root, "seed_ones")?;
        node.grad.fill(1.0);
        Ok(())
    }

    /// Resets every gradient accumulator to zero.
    pub fn zero_grad(&self) {
        for node in self.arena.borrow_mut().nodes.iter_mut() {
            node.grad.fill(0.0);
        }
    }

    /// Every node reachable from `root`, each placed after both of its parents.
    ///
    /// Post-order depth-first search visiting parent 0, then parent 1, then the node.
    /// The visited set is local to the call, so the order can be recomputed at will.
    pub fn topological_order(&self, root: NodeId) -> Result<Vec<NodeId>, MatGradError> {
        let arena = self.arena.borrow();
        arena.node(root, "topological_order")?;

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut order = Vec::new();
        // (node, parents already scheduled)
        let mut stack: Vec<(NodeId, bool)> = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.push((id, true));
            // Pushed in reverse so parent 0 is explored first.
            for parent in arena.nodes[id.0].parents.iter().rev().flatten() {
                if !visited.contains(parent) {
                    stack.push((*parent, false));
                }
            }
        }
        debug!("topological_order: {} nodes reachable from {}", order.len(), root);
        Ok(order)
    }

    /// Propagates the seeded gradient of `root` to every node reachable from it.
    ///
    /// Nodes are processed in reverse topological order, so a node's accumulator is
    /// complete before its own rule pushes contributions into its parents.
    /// Contributions are added, never assigned. The root must have been seeded by the
    /// caller; calling this twice without [`zero_grad`](Self::zero_grad) accumulates
    /// twice.
    pub fn backward(&self, root: NodeId) -> Result<(), MatGradError> {
        let order = self.topological_order(root)?;
        let mut arena = self.arena.borrow_mut();

        {
            let root_node = arena.node(root, "backward")?;
            if root_node.op == Op::Leaf {
                debug!("backward() called on a leaf node. No operation to perform.");
            } else if root_node.grad.as_slice().iter().all(|&g| g == 0.0) {
                warn!("backward({}): root gradient is all zeros, was the root seeded?", root);
            }
        }

        for &id in order.iter().rev() {
            let node = &arena.nodes[id.0];
            let Some(rule) = node.op.backward_op() else {
                continue;
            };
            let op = node.op;
            let parents = node.parents;
            let contributions = {
                let inputs = BackwardInputs {
                    output: &node.value,
                    parents: [
                        parents[0].map(|p| &arena.nodes[p.0].value),
                        parents[1].map(|p| &arena.nodes[p.0].value),
                    ],
                    scalar: node.scalar,
                };
                rule.backward(&inputs, &node.grad)?
            };
            trace!("backward: {} op={} parents={:?}", id, op, parents);
            for (parent, contribution) in parents.into_iter().zip(contributions) {
                match (parent, contribution) {
                    (Some(parent), Some(contribution)) => {
                        arena.accumulate(parent, &contribution, op)?;
                    }
                    (None, Some(_)) => {
                        return Err(MatGradError::NullArgument {
                            operation: format!("{} backward", op),
                            argument: format!("parent of node {}", id),
                        });
                    }
                    _ => {}
                }
            }
        }
        debug!("backward: propagated through {} nodes from {}", order.len(), root);
        Ok(())
    }

    /// Rooted view over this graph.
    pub fn dag(&self, root: NodeId) -> Result<Dag, MatGradError> {
        Dag::new(self.clone(), root)
    }

    /// Drops this handle. Nodes are released once no handle and no tracked matrix
    /// refers to the graph any more.
    pub fn release(self) {
        drop(self);
    }
}

/// A graph node as seen from a tracked matrix.
#[derive(Clone)]
pub struct NodeRef {
    graph: ComputationGraph,
    id: NodeId,
}

impl NodeRef {
    pub fn graph(&self) -> &ComputationGraph {
        &self.graph
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn op(&self) -> Result<Op, MatGradError> {
        self.graph.op(self.id)
    }

    /// Gradient accumulated on this node.
    pub fn grad(&self) -> Result<Matrix, MatGradError> {
        self.graph.grad(self.id)
    }

    /// Forward value recorded on this node.
    pub fn value(&self) -> Result<Matrix, MatGradError> {
        self.graph.value(self.id)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({}, {:?})", self.id, self.graph)
    }
}

/// The graph rooted at the final output of a chain of operations.
#[derive(Debug, Clone)]
pub struct Dag {
    graph: ComputationGraph,
    root: NodeId,
}

impl Dag {
    pub fn new(graph: ComputationGraph, root: NodeId) -> Result<Self, MatGradError> {
        graph.arena.borrow().node(root, "Dag::new")?;
        Ok(Dag { graph, root })
    }

    /// Rooted view at the node attached to `output`.
    ///
    /// # Errors
    /// `NullArgument` if `output` is not tracked.
    pub fn from_matrix(output: &Matrix) -> Result<Self, MatGradError> {
        let node = output.node().ok_or_else(|| MatGradError::NullArgument {
            operation: "Dag::from_matrix".to_string(),
            argument: "graph node of output".to_string(),
        })?;
        Dag::new(node.graph.clone(), node.id)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn graph(&self) -> &ComputationGraph {
        &self.graph
    }

    /// Number of nodes reachable from the root.
    pub fn num_nodes(&self) -> Result<usize, MatGradError> {
        Ok(self.topological_order()?.len())
    }

    pub fn topological_order(&self) -> Result<Vec<NodeId>, MatGradError> {
        self.graph.topological_order(self.root)
    }

    /// Seeds the root with ones and runs the backward pass.
    pub fn compute_gradients(&self) -> Result<(), MatGradError> {
        self.graph.seed_ones(self.root)?;
        self.graph.backward(self.root)
    }

    /// Seeds the root with `seed` and runs the backward pass.
    pub fn compute_gradients_with(&self, seed: &Matrix) -> Result<(), MatGradError> {
        self.graph.seed(self.root, seed)?;
        self.graph.backward(self.root)
    }

    pub fn release(self) {
        drop(self);
    }
}

/// Resolves the graph an operation's result belongs to.
///
/// Returns `None` when no operand is tracked.
pub(crate) fn resolve_graph(
    operands: &[&Matrix],
    operation: &str,
) -> Result<Option<ComputationGraph>, MatGradError> {
    let mut graph: Option<&ComputationGraph> = None;
    for node in operands.iter().filter_map(|m| m.node()) {
        match graph {
            None => graph = Some(&node.graph),
            Some(g) if g.same_graph(&node.graph) => {}
            Some(_) => {
                return Err(MatGradError::GraphMismatch {
                    operation: operation.to_string(),
                })
            }
        }
    }
    Ok(graph.cloned())
}

/// Attaches a node for `out` to `graph`, or clears `out`'s node when untracked.
///
/// Untracked operands of a tracked operation become fresh constant leaves so that
/// every backward rule can read their values.
pub(crate) fn record(
    graph: Option<ComputationGraph>,
    out: &mut Matrix,
    op: Op,
    operands: &[&Matrix],
    scalar: Option<f64>,
) -> Result<(), MatGradError> {
    let Some(graph) = graph else {
        out.set_node(None);
        return Ok(());
    };
    let mut parents = [None, None];
    for (slot, operand) in parents.iter_mut().zip(operands) {
        *slot = Some(match operand.node() {
            Some(node) => node.id,
            None => graph.create_node(operand, Op::Leaf, None, None)?,
        });
    }
    let id = graph.push_node(out, op, parents, scalar)?;
    out.set_node(Some(graph.node_ref(id)));
    Ok(())
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
