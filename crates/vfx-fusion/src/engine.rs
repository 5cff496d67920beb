//! Graph builder/executor.
//!
//! [`Engine::build`] evaluates the whole graph reachable from a terminal
//! descriptor in one blocking call:
//!
//! 1. Plan the DAG ([`Graph::from_terminal`])
//! 2. Per node, in topological order: resolve deferred inputs to the
//!    upstream results, apply defaults, check ranges
//! 3. Execute (or serve from the operation cache)
//! 4. Hand the terminal's outputs to a new [`BuiltOperation`]
//!
//! Intermediate results live only inside the build and are dropped as soon
//! as their last consumer has run. A failure anywhere returns one
//! [`FusionError::BuildError`] and nothing else: no partial images escape.

use crate::built::BuiltOperation;
use crate::cache::{CacheKey, OperationCache};
use crate::config::EngineConfig;
use crate::descriptor::{Descriptor, NodeId};
use crate::error::{FusionError, FusionResult};
use crate::graph::{Graph, PlannedNode};
use crate::operation::{Context, Operation, Outputs};
use crate::registry::OperationRegistry;
use crate::value::{ImageRef, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, trace, warn};
use vfx_core::{Image, ResourceCounts, ResourceKind, ResourceTracker};

/// Operation engine: registry, cache, resource tracker and optional pool.
///
/// `Engine` is `Send + Sync`; share it by reference or `Arc` and build
/// independent graphs from any number of threads.
pub struct Engine {
    registry: Arc<OperationRegistry>,
    cache: OperationCache,
    tracker: Arc<ResourceTracker>,
    pool: Option<rayon::ThreadPool>,
    config: EngineConfig,
}

/// Engine with [`EngineConfig::default`], so the operation cache is on.
///
/// Cached entries keep their input and output images alive, so
/// [`Engine::counts`] stays above its baseline until
/// [`OperationCache::clear`] is called. Use
/// [`EngineConfig::without_cache`] when counts must return to baseline.
impl Default for Engine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            registry: OperationRegistry::global(),
            cache: OperationCache::new(config.cache_max_operations),
            tracker: ResourceTracker::new(),
            pool: None,
            config,
        }
    }
}

impl Engine {
    /// Creates an engine over the global registry.
    pub fn new(config: EngineConfig) -> FusionResult<Self> {
        Self::with_registry(OperationRegistry::global(), config)
    }

    /// Creates an engine from `VFX_*` environment settings.
    pub fn from_env() -> FusionResult<Self> {
        Self::new(EngineConfig::from_env())
    }

    /// Creates an engine over a custom registry.
    pub fn with_registry(registry: Arc<OperationRegistry>, config: EngineConfig) -> FusionResult<Self> {
        config.validate()?;
        let pool = match config.threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("vfx-fusion-{i}"))
                    .build()
                    .map_err(|e| FusionError::Config(e.to_string()))?,
            ),
            None => None,
        };
        debug!(
            cache_max = config.cache_max_operations,
            threads = ?config.threads,
            operations = registry.len(),
            "engine created"
        );
        Ok(Self {
            registry,
            cache: OperationCache::new(config.cache_max_operations),
            tracker: ResourceTracker::new(),
            pool,
            config,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Operation registry.
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// Operation cache.
    pub fn cache(&self) -> &OperationCache {
        &self.cache
    }

    /// Live-object tracker for this engine.
    pub fn tracker(&self) -> &Arc<ResourceTracker> {
        &self.tracker
    }

    /// Snapshot of live descriptors, built operations and images.
    ///
    /// Images held by the operation cache are included. With the cache
    /// enabled, counts return to their baseline only after
    /// `self.cache().clear()`.
    pub fn counts(&self) -> ResourceCounts {
        self.tracker.counts()
    }

    /// Creates a descriptor for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::UnknownOperation`] if `name` is not registered.
    pub fn operation(&self, name: &str) -> FusionResult<Descriptor> {
        let op = self.registry.lookup(name)?;
        Ok(Descriptor::new(op, &self.tracker))
    }

    /// Creates an image accounted by this engine.
    ///
    /// The image counts toward [`Engine::counts`] until its last clone is
    /// dropped.
    pub fn image_from_f32(&self, data: Vec<f32>, width: u32, height: u32, bands: u32) -> FusionResult<Image> {
        let lease = self.tracker.acquire(ResourceKind::Image);
        Ok(Image::from_f32_tracked(data, width, height, bands, lease)?)
    }

    /// Plans the graph `terminal` would evaluate, without running it.
    pub fn plan(&self, terminal: &Descriptor) -> FusionResult<Graph> {
        Graph::from_terminal(terminal)
    }

    /// Evaluates the full graph reachable from `terminal`.
    ///
    /// Every node runs at most once, even when several consumers share it.
    /// On success all nodes of the graph move to
    /// [`NodeState::Built`](crate::NodeState::Built).
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::BuildError`] naming the failing operation
    /// when an input is missing or out of range, or a kernel fails.
    pub fn build(&self, terminal: &Descriptor) -> FusionResult<BuiltOperation> {
        let graph = Graph::from_terminal(terminal)?;
        debug!(terminal = %graph.terminal(), nodes = graph.len(), "build start");
        if self.config.trace_graphs {
            trace!(dot = %graph.to_dot(), "planned graph");
        }

        let mut results = match &self.pool {
            Some(pool) => pool.install(|| self.evaluate(&graph)),
            None => self.evaluate(&graph),
        }
        .inspect_err(|e| warn!(error = %e, "build failed"))?;

        for planned in graph.planned() {
            planned.node.mark_built();
        }
        let outputs = results
            .remove(&graph.terminal())
            .ok_or_else(|| FusionError::build(terminal.operation(), "terminal produced no outputs"))?;
        debug!(terminal = %graph.terminal(), "build done");

        Ok(BuiltOperation::new(
            terminal.operation(),
            outputs,
            self.tracker.acquire(ResourceKind::BuiltOperation),
        ))
    }

    /// Runs one operation as a single-node graph.
    ///
    /// # Example
    ///
    /// ```rust
    /// use vfx_fusion::{Engine, Value, extract_output};
    /// use vfx_core::Image;
    ///
    /// let engine = Engine::default();
    /// let img = Image::filled(8, 8, 3, 0.5);
    /// let built = engine.call("resize", [("in", Value::from(&img)), ("scale", Value::from(0.5))]).unwrap();
    /// assert_eq!(extract_output(&built).unwrap().dimensions(), (4, 4, 3));
    /// ```
    pub fn call<I, K, V>(&self, name: &str, props: I) -> FusionResult<BuiltOperation>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut desc = self.operation(name)?;
        for (k, v) in props {
            desc.set(k.as_ref(), v)?;
        }
        self.build(&desc)
    }

    fn evaluate(&self, graph: &Graph) -> FusionResult<HashMap<NodeId, Outputs>> {
        let terminal = graph.terminal();
        let mut pending: HashMap<NodeId, usize> = HashMap::with_capacity(graph.len());
        for edge in graph.edges() {
            *pending.entry(edge.from).or_default() += 1;
        }
        let mut results: HashMap<NodeId, Outputs> = HashMap::with_capacity(graph.len());

        for planned in graph.planned() {
            let op = planned.node.operation();
            let args = resolve(&**op, planned, &results)?;

            // Release upstream results nobody else needs.
            for d in planned.props.values().filter_map(Value::as_deferred) {
                let id = d.node_id();
                if let Some(left) = pending.get_mut(&id) {
                    *left = left.saturating_sub(1);
                    if *left == 0 && id != terminal {
                        results.remove(&id);
                    }
                }
            }

            let outputs = self.execute(&**op, &args)?;
            results.insert(planned.id(), outputs);
        }
        Ok(results)
    }

    fn execute(&self, op: &dyn Operation, args: &BTreeMap<String, Value>) -> FusionResult<Outputs> {
        let key = if op.cacheable() { CacheKey::new(op.name(), args) } else { None };
        if let Some(hit) = key.as_ref().and_then(|k| self.cache.get(k)) {
            return Ok(hit);
        }

        trace!(operation = op.name(), "execute");
        let outputs = op
            .execute(&Context::new(args, &self.tracker))
            .map_err(|e| FusionError::build(op.name(), e.to_string()))?;

        for arg in op.arguments().iter().filter(|a| a.is_output()) {
            match outputs.get(arg.name) {
                Some(v) if v.kind() == arg.kind && !v.is_deferred() => {}
                _ => {
                    return Err(FusionError::build(
                        op.name(),
                        format!("output '{}' missing or not a {}", arg.name, arg.kind),
                    ));
                }
            }
        }

        if let Some(key) = key {
            let inputs = args.values().filter_map(Value::as_image).cloned().collect();
            self.cache.insert(key, inputs, outputs.clone());
        }
        Ok(outputs)
    }
}

/// Resolves a node's inputs against upstream results.
fn resolve(
    op: &dyn Operation,
    planned: &PlannedNode,
    results: &HashMap<NodeId, Outputs>,
) -> FusionResult<BTreeMap<String, Value>> {
    let mut args = BTreeMap::new();
    for arg in op.arguments().iter().filter(|a| a.is_input()) {
        let value = match planned.props.get(arg.name) {
            Some(Value::Image(ImageRef::Deferred(d))) => results
                .get(&d.node_id())
                .and_then(|o| o.get(d.output()))
                .cloned()
                .ok_or_else(|| {
                    FusionError::build(op.name(), format!("no value for '{}' from {}", arg.name, d.node_id()))
                })?,
            Some(v) => v.clone(),
            None => match &arg.default {
                Some(d) => d.clone(),
                None if arg.required => {
                    return Err(FusionError::build(
                        op.name(),
                        format!("required input '{}' is not set", arg.name),
                    ));
                }
                None => continue,
            },
        };

        if let (Some((min, max)), Some(x)) = (arg.range, value.as_number()) {
            if !(min..=max).contains(&x) {
                return Err(FusionError::build(
                    op.name(),
                    format!("'{}' = {} is outside [{}, {}]", arg.name, x, min, max),
                ));
            }
        }
        args.insert(arg.name.to_string(), value);
    }
    Ok(args)
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("tracker", &self.tracker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::built::extract_output;
    use crate::descriptor::NodeState;
    use crate::link::link;
    use crate::operation::Argument;
    use crate::value::ValueKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vfx_ops::OpsResult;

    fn uncached() -> Engine {
        Engine::new(EngineConfig::default().without_cache()).unwrap()
    }

    #[test]
    fn test_build_chain() {
        let engine = uncached();
        let img = Image::filled(16, 16, 3, 0.5);
        let mut resize = engine.operation("resize").unwrap();
        resize.set("in", &img).unwrap();
        resize.set("scale", 0.5).unwrap();
        let mut sharpen = engine.operation("sharpen").unwrap();
        link(&resize, "out", &mut sharpen, "in").unwrap();
        sharpen.set("sigma", 1.5).unwrap();

        let built = engine.build(&sharpen).unwrap();
        let out = extract_output(&built).unwrap();
        assert_eq!(out.dimensions(), (8, 8, 3));
        assert_eq!(resize.state(), NodeState::Built);
        assert_eq!(sharpen.state(), NodeState::Built);
        assert!(matches!(sharpen.set("sigma", 2.0), Err(FusionError::Sealed { .. })));
    }

    #[test]
    fn test_missing_required_input() {
        let engine = uncached();
        let mut d = engine.operation("resize").unwrap();
        d.set("scale", 0.5).unwrap();
        let err = engine.build(&d).unwrap_err();
        assert!(err.is_build_error());
        assert!(err.build_message().unwrap().contains("'in'"));
        assert_eq!(d.state(), NodeState::Wired);
    }

    #[test]
    fn test_range_violation() {
        let engine = uncached();
        let err = engine
            .call("resize", [("in", Value::from(Image::filled(4, 4, 1, 0.0))), ("scale", Value::from(-0.5))])
            .unwrap_err();
        assert!(err.is_build_error());
        assert!(err.to_string().contains("scale"));
    }

    #[test]
    fn test_kernel_error_becomes_build_error() {
        let engine = uncached();
        let err = engine
            .call(
                "flip",
                [("in", Value::from(Image::filled(2, 2, 1, 0.0))), ("direction", Value::from("diagonal"))],
            )
            .unwrap_err();
        assert!(matches!(&err, FusionError::BuildError { operation, .. } if operation == "flip"));
        assert!(err.build_message().unwrap().contains("diagonal"));
    }

    #[test]
    fn test_unknown_operation() {
        assert!(uncached().operation("frobnicate").unwrap_err().is_unknown_operation());
    }

    #[test]
    fn test_cache_serves_repeat_calls() {
        let engine = Engine::default();
        let img = Image::filled(8, 8, 1, 0.5);
        let first = extract_output(&engine.call("invert", [("in", &img)]).unwrap()).unwrap();
        let second = extract_output(&engine.call("invert", [("in", &img)]).unwrap()).unwrap();
        assert!(first.same_buffer(&second));
        assert_eq!(engine.cache().stats().hits, 1);

        engine.cache().clear();
        drop((first, second));
        assert!(engine.counts().is_zero());
    }

    #[test]
    fn test_counts_return_to_zero() {
        let engine = uncached();
        let img = Image::filled(8, 8, 1, 0.5);
        {
            let mut a = engine.operation("invert").unwrap();
            a.set("in", &img).unwrap();
            let mut b = engine.operation("copy").unwrap();
            link(&a, "out", &mut b, "in").unwrap();
            let built = engine.build(&b).unwrap();
            let out = extract_output(&built).unwrap();
            let counts = engine.counts();
            assert_eq!((counts.descriptors, counts.built_operations, counts.images), (2, 1, 1));
            drop(out);
        }
        assert!(engine.counts().is_zero());
    }

    struct Probe {
        args: Vec<Argument>,
        runs: Arc<AtomicUsize>,
    }

    impl Operation for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn arguments(&self) -> &[Argument] {
            &self.args
        }

        fn cacheable(&self) -> bool {
            false
        }

        fn execute(&self, ctx: &Context<'_>) -> OpsResult<Outputs> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let src = ctx.image("in")?;
            let (w, h, b) = src.dimensions();
            let out = ctx.alloc(src.to_vec(), w as usize, h as usize, b as usize)?;
            Ok(Outputs::new().with("out", out))
        }
    }

    #[test]
    fn test_shared_node_runs_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(OperationRegistry::with_builtins());
        registry.register(Arc::new(Probe {
            args: vec![
                Argument::input("in", ValueKind::Image),
                Argument::output("out", ValueKind::Image),
            ],
            runs: Arc::clone(&runs),
        }));
        let engine = Engine::with_registry(registry, EngineConfig::default().without_cache()).unwrap();

        let img = Image::filled(4, 4, 1, 0.25);
        let mut probe = engine.operation("probe").unwrap();
        probe.set("in", &img).unwrap();
        let mut left = engine.operation("invert").unwrap();
        let mut right = engine.operation("copy").unwrap();
        let mut sum = engine.operation("add").unwrap();
        link(&probe, "out", &mut left, "in").unwrap();
        link(&probe, "out", &mut right, "in").unwrap();
        link(&left, "out", &mut sum, "left").unwrap();
        link(&right, "out", &mut sum, "right").unwrap();

        let out = extract_output(&engine.build(&sum).unwrap()).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        // (1 - x) + x == 1
        assert!(out.data().iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_image_from_f32_is_counted() {
        let engine = uncached();
        let img = engine.image_from_f32(vec![0.25; 12], 2, 2, 3).unwrap();
        let copy = img.clone();
        assert_eq!(engine.counts().images, 1);

        let built = engine.call("invert", [("in", &img)]).unwrap();
        let out = extract_output(&built).unwrap();
        assert_eq!(out.data(), vec![0.75f32; 12].as_slice());
        assert_eq!(engine.counts().images, 2);

        drop((img, copy, built, out));
        assert!(engine.counts().is_zero());
        assert!(engine.image_from_f32(vec![0.0; 5], 2, 2, 1).is_err());
        assert!(engine.counts().is_zero());
    }

    #[test]
    fn test_dedicated_pool() {
        let engine = Engine::new(EngineConfig::default().with_threads(2)).unwrap();
        let img = Image::filled(8, 8, 3, 0.5);
        let built = engine.call("gaussblur", [("in", Value::from(&img)), ("sigma", Value::from(1.0))]).unwrap();
        assert_eq!(extract_output(&built).unwrap().dimensions(), (8, 8, 3));
        assert!(Engine::new(EngineConfig::default().with_threads(0)).is_err());
    }
}
