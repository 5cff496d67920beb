//! Wiring one descriptor's output into another's input.

use crate::descriptor::Descriptor;
use crate::error::{FusionError, FusionResult};
use tracing::debug;

/// Links `upstream.output` into `downstream.input` without evaluating.
///
/// The deferred value read from `upstream` is moved into `downstream`, so
/// the transient carrier is consumed by the call and the reference it held
/// now belongs to the downstream property.
///
/// # Example
///
/// ```rust
/// use vfx_fusion::{Engine, link};
///
/// let engine = Engine::default();
/// let resize = engine.operation("resize").unwrap();
/// let mut sharpen = engine.operation("sharpen").unwrap();
/// link(&resize, "out", &mut sharpen, "in").unwrap();
/// assert!(sharpen.get("in").unwrap().is_deferred());
/// ```
pub fn link(upstream: &Descriptor, output: &str, downstream: &mut Descriptor, input: &str) -> FusionResult<()> {
    let value = upstream.get(output)?;
    if !value.is_deferred() {
        return Err(FusionError::invalid_property(upstream.operation(), output));
    }
    debug!(
        from = %upstream.id(),
        to = %downstream.id(),
        "link {}.{} -> {}.{}",
        upstream.operation(),
        output,
        downstream.operation(),
        input
    );
    downstream.set(input, value)
}
