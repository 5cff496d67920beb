//! Built-in operations of the reference engine.
//!
//! Each operation is a table entry (name, arguments, kernel function) that
//! dispatches to a `vfx-ops` kernel. Every produced image is allocated
//! through the build [`Context`], so it is accounted by the engine.
//!
//! | Name | Inputs | Output |
//! |------|--------|--------|
//! | `resize` | `in`, `scale`, `vscale`?, `kernel` | `out` image |
//! | `sharpen` | `in`, `sigma`, `amount`, `threshold` | `out` image |
//! | `gaussblur` | `in`, `sigma` | `out` image |
//! | `linear` | `in`, `a`, `b` | `out` image |
//! | `invert` | `in` | `out` image |
//! | `flip` | `in`, `direction` | `out` image |
//! | `extract_area` | `in`, `left`, `top`, `width`, `height` | `out` image |
//! | `copy` | `in` | `out` image |
//! | `add`, `subtract` | `left`, `right` | `out` image |
//! | `abs` | `in` | `out` image |
//! | `avg` | `in` | `out` double |

use crate::operation::{Argument, Context, Operation, Outputs};
use crate::value::{Value, ValueKind};
use std::sync::Arc;
use vfx_core::Image;
use vfx_ops::{Direction, Filter, OpsError, OpsResult, arithmetic, filter, resize, transform};

const MAX_SCALE: f64 = 1.0e7;
const MAX_SIGMA: f64 = 1.0e4;
const MAX_COORD: f64 = 1.0e7;

type Kernel = fn(&Context<'_>) -> OpsResult<Outputs>;

struct Builtin {
    name: &'static str,
    description: &'static str,
    args: Vec<Argument>,
    kernel: Kernel,
}

impl Operation for Builtin {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn arguments(&self) -> &[Argument] {
        &self.args
    }

    fn execute(&self, ctx: &Context<'_>) -> OpsResult<Outputs> {
        (self.kernel)(ctx)
    }
}

fn op(name: &'static str, description: &'static str, args: Vec<Argument>, kernel: Kernel) -> Arc<dyn Operation> {
    Arc::new(Builtin {
        name,
        description,
        args,
        kernel,
    })
}

fn image_in() -> Argument {
    Argument::input("in", ValueKind::Image).describe("Input image")
}

fn image_out() -> Argument {
    Argument::output("out", ValueKind::Image).describe("Output image")
}

/// All built-in operations.
pub(crate) fn all() -> Vec<Arc<dyn Operation>> {
    vec![
        op(
            "resize",
            "Resample an image by a scale factor",
            vec![
                image_in(),
                Argument::input("scale", ValueKind::Double)
                    .range(0.0, MAX_SCALE)
                    .describe("Horizontal scale factor"),
                Argument::input("vscale", ValueKind::Double)
                    .optional()
                    .range(0.0, MAX_SCALE)
                    .describe("Vertical scale factor (defaults to scale)"),
                Argument::input("kernel", ValueKind::Str)
                    .default_value("lanczos3")
                    .describe("nearest, linear, cubic or lanczos3"),
                image_out(),
            ],
            resize_kernel,
        ),
        op(
            "sharpen",
            "Unsharp-mask sharpening",
            vec![
                image_in(),
                Argument::input("sigma", ValueKind::Double)
                    .default_value(0.5)
                    .range(1.0e-6, MAX_SIGMA)
                    .describe("Sigma of the mask blur"),
                Argument::input("amount", ValueKind::Double)
                    .default_value(1.0)
                    .range(0.0, 100.0)
                    .describe("Sharpening strength"),
                Argument::input("threshold", ValueKind::Double)
                    .default_value(0.0)
                    .range(0.0, 100.0)
                    .describe("Minimum difference to sharpen"),
                image_out(),
            ],
            sharpen_kernel,
        ),
        op(
            "gaussblur",
            "Gaussian blur",
            vec![
                image_in(),
                Argument::input("sigma", ValueKind::Double).range(1.0e-6, MAX_SIGMA),
                image_out(),
            ],
            gaussblur_kernel,
        ),
        op(
            "linear",
            "out = in * a + b",
            vec![
                image_in(),
                Argument::input("a", ValueKind::Double).default_value(1.0),
                Argument::input("b", ValueKind::Double).default_value(0.0),
                image_out(),
            ],
            linear_kernel,
        ),
        op("invert", "out = 1 - in", vec![image_in(), image_out()], invert_kernel),
        op(
            "flip",
            "Mirror horizontally or vertically",
            vec![
                image_in(),
                Argument::input("direction", ValueKind::Str).describe("horizontal or vertical"),
                image_out(),
            ],
            flip_kernel,
        ),
        op(
            "extract_area",
            "Copy out a rectangle",
            vec![
                image_in(),
                Argument::input("left", ValueKind::Int).range(0.0, MAX_COORD),
                Argument::input("top", ValueKind::Int).range(0.0, MAX_COORD),
                Argument::input("width", ValueKind::Int).range(1.0, MAX_COORD),
                Argument::input("height", ValueKind::Int).range(1.0, MAX_COORD),
                image_out(),
            ],
            extract_area_kernel,
        ),
        op("copy", "Copy pixels to a new buffer", vec![image_in(), image_out()], copy_kernel),
        op("add", "out = left + right", pair_args(), add_kernel),
        op("subtract", "out = left - right", pair_args(), subtract_kernel),
        op("abs", "out = |in|", vec![image_in(), image_out()], abs_kernel),
        op(
            "avg",
            "Mean of all samples",
            vec![
                image_in(),
                Argument::output("out", ValueKind::Double).describe("Mean value"),
            ],
            avg_kernel,
        ),
    ]
}

fn pair_args() -> Vec<Argument> {
    vec![
        Argument::input("left", ValueKind::Image),
        Argument::input("right", ValueKind::Image),
        image_out(),
    ]
}

fn dims(img: &Image) -> (usize, usize, usize) {
    (img.width() as usize, img.height() as usize, img.bands() as usize)
}

/// Wraps `data` with the geometry of `like` and its format metadata.
fn emit(ctx: &Context<'_>, like: &Image, data: Vec<f32>) -> OpsResult<Outputs> {
    let (w, h, b) = dims(like);
    let out = ctx.alloc(data, w, h, b)?.with_formats_of(like);
    Ok(Outputs::new().with("out", out))
}

fn resize_kernel(ctx: &Context<'_>) -> OpsResult<Outputs> {
    let src = ctx.image("in")?;
    let hscale = ctx.f64("scale")?;
    let vscale = ctx.opt_f64("vscale").unwrap_or(hscale);
    let name = ctx.str("kernel")?;
    let filter = Filter::from_name(name)
        .ok_or_else(|| OpsError::InvalidParameter(format!("unknown resize kernel '{name}'")))?;

    let (w, h, b) = dims(src);
    let (data, dw, dh) = resize::resize_scale(src.data(), w, h, b, hscale, vscale, filter)?;
    let out = ctx.alloc(data, dw, dh, b)?.with_formats_of(src);
    Ok(Outputs::new().with("out", out))
}

fn sharpen_kernel(ctx: &Context<'_>) -> OpsResult<Outputs> {
    let src = ctx.image("in")?;
    let (w, h, b) = dims(src);
    let data = filter::unsharp_mask(
        src.data(),
        w,
        h,
        b,
        ctx.f64("sigma")?,
        ctx.f64("amount")?,
        ctx.f64("threshold")?,
    )?;
    emit(ctx, src, data)
}

fn gaussblur_kernel(ctx: &Context<'_>) -> OpsResult<Outputs> {
    let src = ctx.image("in")?;
    let (w, h, b) = dims(src);
    let data = filter::gaussian_blur(src.data(), w, h, b, ctx.f64("sigma")?)?;
    emit(ctx, src, data)
}

fn linear_kernel(ctx: &Context<'_>) -> OpsResult<Outputs> {
    let src = ctx.image("in")?;
    let data = arithmetic::linear(src.data(), ctx.f64("a")?, ctx.f64("b")?)?;
    emit(ctx, src, data)
}

fn invert_kernel(ctx: &Context<'_>) -> OpsResult<Outputs> {
    let src = ctx.image("in")?;
    emit(ctx, src, arithmetic::invert(src.data()))
}

fn flip_kernel(ctx: &Context<'_>) -> OpsResult<Outputs> {
    let src = ctx.image("in")?;
    let name = ctx.str("direction")?;
    let direction = Direction::from_name(name)
        .ok_or_else(|| OpsError::InvalidParameter(format!("unknown flip direction '{name}'")))?;
    let (w, h, b) = dims(src);
    emit(ctx, src, transform::flip(src.data(), w, h, b, direction)?)
}

fn extract_area_kernel(ctx: &Context<'_>) -> OpsResult<Outputs> {
    let src = ctx.image("in")?;
    let coord = |name: &str| -> OpsResult<usize> {
        let v = ctx.i64(name)?;
        usize::try_from(v).map_err(|_| OpsError::InvalidParameter(format!("{name} must be >= 0, got {v}")))
    };
    let (left, top, aw, ah) = (coord("left")?, coord("top")?, coord("width")?, coord("height")?);
    let (w, h, b) = dims(src);
    let data = transform::extract_area(src.data(), w, h, b, left, top, aw, ah)?;
    let out = ctx.alloc(data, aw, ah, b)?.with_formats_of(src);
    Ok(Outputs::new().with("out", out))
}

fn copy_kernel(ctx: &Context<'_>) -> OpsResult<Outputs> {
    let src = ctx.image("in")?;
    emit(ctx, src, src.to_vec())
}

fn pair<'c>(ctx: &'c Context<'_>) -> OpsResult<(&'c Image, &'c Image)> {
    let left = ctx.image("left")?;
    let right = ctx.image("right")?;
    left.ensure_same_geometry(right)
        .map_err(|e| OpsError::SizeMismatch(e.to_string()))?;
    Ok((left, right))
}

fn add_kernel(ctx: &Context<'_>) -> OpsResult<Outputs> {
    let (left, right) = pair(ctx)?;
    emit(ctx, left, arithmetic::add(left.data(), right.data())?)
}

fn subtract_kernel(ctx: &Context<'_>) -> OpsResult<Outputs> {
    let (left, right) = pair(ctx)?;
    emit(ctx, left, arithmetic::subtract(left.data(), right.data())?)
}

fn abs_kernel(ctx: &Context<'_>) -> OpsResult<Outputs> {
    let src = ctx.image("in")?;
    emit(ctx, src, arithmetic::abs(src.data()))
}

fn avg_kernel(ctx: &Context<'_>) -> OpsResult<Outputs> {
    let src = ctx.image("in")?;
    Ok(Outputs::new().with("out", Value::Double(arithmetic::average(src.data())?)))
}
