//! Operation descriptors: unevaluated graph nodes.
//!
//! A [`Descriptor`] is created by [`Engine::operation`](crate::Engine::operation)
//! and represents exactly one node of a graph before evaluation. Properties
//! are written with [`Descriptor::set`] and read with [`Descriptor::get`];
//! neither ever runs an operation.
//!
//! # Lifecycle
//!
//! ```text
//! Created --set--> Wired --build--> Built
//!    |               |                |
//!    +---------------+--- drop -------+--> released
//! ```
//!
//! Dropping a descriptor releases it. If a downstream node still holds a
//! deferred reference to its output, the node stays alive (and counted)
//! until that reference is gone too.

use crate::error::{FusionError, FusionResult};
use crate::operation::Operation;
use crate::value::{Deferred, ImageRef, Value, ValueKind};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};
use vfx_core::{Lease, ResourceKind, ResourceTracker};

/// Process-unique id of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Descriptor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// No property set yet.
    Created,
    /// At least one property set.
    Wired,
    /// Evaluated by a successful build; properties are frozen.
    Built,
}

struct NodeInner {
    props: BTreeMap<String, Value>,
    state: NodeState,
}

/// Shared node storage. Owned by its descriptor and by every deferred
/// reference to one of its outputs.
pub(crate) struct Node {
    id: NodeId,
    op: Arc<dyn Operation>,
    inner: Mutex<NodeInner>,
    _lease: Lease,
}

impl Node {
    fn lock(&self) -> MutexGuard<'_, NodeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn operation(&self) -> &Arc<dyn Operation> {
        &self.op
    }

    pub(crate) fn state(&self) -> NodeState {
        self.lock().state
    }

    /// Copy of the current property map.
    pub(crate) fn snapshot(&self) -> BTreeMap<String, Value> {
        self.lock().props.clone()
    }

    pub(crate) fn mark_built(&self) {
        self.lock().state = NodeState::Built;
    }

    /// Nodes referenced by deferred inputs.
    fn upstream(&self) -> Vec<Arc<Node>> {
        self.lock()
            .props
            .values()
            .filter_map(Value::as_deferred)
            .map(|d| Arc::clone(d.node()))
            .collect()
    }

    /// Returns `true` if `target` is this node or one of its ancestors.
    fn reaches(self: &Arc<Self>, target: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![Arc::clone(self)];
        while let Some(node) = stack.pop() {
            if node.id == target {
                return true;
            }
            if seen.insert(node.id) {
                stack.extend(node.upstream());
            }
        }
        false
    }
}

impl Node {
    /// Empties the property map, returning the nodes it kept alive.
    fn take_upstream(&mut self) -> Vec<Arc<Node>> {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut inner.props)
            .into_values()
            .filter_map(|v| match v {
                Value::Image(ImageRef::Deferred(d)) => Some(d.into_node()),
                _ => None,
            })
            .collect()
    }
}

impl Drop for Node {
    // Upstream nodes are released from a worklist so that dropping the
    // end of a long chain does not recurse once per stage.
    fn drop(&mut self) {
        trace!(node = %self.id, operation = self.op.name(), "release descriptor");
        let mut pending = self.take_upstream();
        while let Some(node) = pending.pop() {
            if let Some(mut node) = Arc::into_inner(node) {
                pending.append(&mut node.take_upstream());
            }
        }
    }
}

/// Handle to one unevaluated operation.
///
/// `Descriptor` is `Send` but mutated only through `&mut self`, so one
/// graph is owned by one thread at a time.
pub struct Descriptor {
    node: Arc<Node>,
}

impl Descriptor {
    pub(crate) fn new(op: Arc<dyn Operation>, tracker: &Arc<ResourceTracker>) -> Self {
        let node = Node {
            id: NodeId::next(),
            op,
            inner: Mutex::new(NodeInner {
                props: BTreeMap::new(),
                state: NodeState::Created,
            }),
            _lease: tracker.acquire(ResourceKind::Descriptor),
        };
        debug!(node = %node.id, operation = node.op.name(), "create descriptor");
        Self { node: Arc::new(node) }
    }

    /// Node id.
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Operation name.
    pub fn operation(&self) -> &str {
        self.node.op.name()
    }

    /// Current state.
    pub fn state(&self) -> NodeState {
        self.node.state()
    }

    pub(crate) fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// Writes an input property.
    ///
    /// The value is moved in. Deferred image references become graph
    /// edges; nothing is evaluated.
    ///
    /// # Errors
    ///
    /// - [`FusionError::Sealed`] after a successful build
    /// - [`FusionError::InvalidProperty`] for unknown names and outputs
    /// - [`FusionError::TypeMismatch`] if the value kind differs from the
    ///   declared kind
    /// - [`FusionError::Cycle`] if a deferred reference would close a loop
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> FusionResult<()> {
        let value = value.into();
        let op_name = self.operation();

        if self.state() == NodeState::Built {
            return Err(FusionError::Sealed {
                operation: op_name.to_string(),
            });
        }
        let arg = self
            .node
            .op
            .argument(name)
            .filter(|a| a.is_input())
            .ok_or_else(|| FusionError::invalid_property(op_name, name))?;
        if arg.kind != value.kind() {
            return Err(FusionError::TypeMismatch {
                operation: op_name.to_string(),
                property: name.to_string(),
                expected: arg.kind,
                found: value.kind(),
            });
        }
        // A node nobody references yet cannot be anyone's ancestor.
        let referenced = Arc::strong_count(&self.node) > 1;
        if let Some(deferred) = value.as_deferred().filter(|_| referenced) {
            if deferred.node().reaches(self.node.id) {
                return Err(FusionError::Cycle {
                    operation: op_name.to_string(),
                    property: name.to_string(),
                });
            }
        }

        trace!(node = %self.node.id, operation = op_name, property = name, value = %value, "set");
        let mut inner = self.node.lock();
        inner.props.insert(name.to_string(), value);
        inner.state = NodeState::Wired;
        Ok(())
    }

    /// Reads a property.
    ///
    /// Image outputs return a deferred reference without evaluating
    /// anything. Inputs return the stored value or the declared default.
    ///
    /// # Errors
    ///
    /// - [`FusionError::InvalidProperty`] for unknown names
    /// - [`FusionError::NotBuilt`] for non-image outputs
    /// - [`FusionError::Unset`] for inputs with no value and no default
    pub fn get(&self, name: &str) -> FusionResult<Value> {
        let op_name = self.operation();
        let arg = self
            .node
            .op
            .argument(name)
            .ok_or_else(|| FusionError::invalid_property(op_name, name))?;

        if arg.is_output() {
            if arg.kind != ValueKind::Image {
                return Err(FusionError::NotBuilt {
                    operation: op_name.to_string(),
                    property: name.to_string(),
                });
            }
            return Ok(Value::Image(ImageRef::Deferred(Deferred::new(
                Arc::clone(&self.node),
                arg.name,
            ))));
        }

        if let Some(v) = self.node.lock().props.get(name) {
            return Ok(v.clone());
        }
        arg.default.clone().ok_or_else(|| FusionError::Unset {
            operation: op_name.to_string(),
            property: name.to_string(),
        })
    }

    /// Deferred reference to an image output.
    pub fn output(&self, name: &str) -> FusionResult<Deferred> {
        match self.get(name)? {
            Value::Image(ImageRef::Deferred(d)) => Ok(d),
            _ => Err(FusionError::invalid_property(self.operation(), name)),
        }
    }

    /// Names of properties set so far.
    pub fn set_properties(&self) -> Vec<String> {
        self.node.lock().props.keys().cloned().collect()
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("id", &self.id())
            .field("operation", &self.operation())
            .field("state", &self.state())
            .finish()
    }
}
