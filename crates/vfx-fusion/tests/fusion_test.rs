//! End-to-end tests of the fused graph protocol.

use proptest::prelude::*;
use std::sync::Arc;
use vfx_core::{Image, ImageType};
use vfx_fusion::{
    Engine, EngineConfig, FusionError, NodeState, Pipeline, Stage, Value, extract_output, fused_pipeline, link,
};

fn engine() -> Engine {
    Engine::new(EngineConfig::default().without_cache()).unwrap()
}

/// Deterministic gradient with some texture so sharpening has edges to work on.
fn gradient(width: u32, height: u32, bands: u32) -> Image {
    let mut data = Vec::with_capacity((width * height * bands) as usize);
    for y in 0..height {
        for x in 0..width {
            for b in 0..bands {
                let v = (x as f32 / width as f32) * 0.6 + (y as f32 / height as f32) * 0.3 + b as f32 * 0.05;
                let checker = if (x / 3 + y / 3) % 2 == 0 { 0.05 } else { 0.0 };
                data.push(v + checker);
            }
        }
    }
    Image::from_f32(data, width, height, bands).unwrap()
}

fn sequential(engine: &Engine, input: &Image, scale: f64, sigma: f64) -> Image {
    let resized = extract_output(
        &engine
            .call(
                "resize",
                [("in", Value::from(input)), ("scale", Value::from(scale)), ("kernel", Value::from("lanczos3"))],
            )
            .unwrap(),
    )
    .unwrap();
    extract_output(
        &engine
            .call("sharpen", [("in", Value::from(&resized)), ("sigma", Value::from(sigma))])
            .unwrap(),
    )
    .unwrap()
}

fn mean_abs_diff(engine: &Engine, a: &Image, b: &Image) -> f64 {
    let diff = engine
        .call("subtract", [("left", a), ("right", b)])
        .and_then(|built| extract_output(&built))
        .unwrap();
    let abs = extract_output(&engine.call("abs", [("in", &diff)]).unwrap()).unwrap();
    let avg = engine.call("avg", [("in", &abs)]).unwrap();
    avg.get("out").unwrap().as_f64().unwrap()
}

fn resize_sharpen(scale: f64, sigma: f64) -> [Stage; 2] {
    [
        Stage::new("resize").set("scale", scale).set("kernel", "lanczos3"),
        Stage::new("sharpen").set("sigma", sigma),
    ]
}

#[test]
fn fused_matches_sequential() {
    let engine = engine();
    let input = gradient(64, 48, 3).with_formats(ImageType::Png, ImageType::Jpeg);

    let fused = fused_pipeline(&engine, &input, &resize_sharpen(0.5, 1.5)).unwrap();
    let reference = sequential(&engine, &input, 0.5, 1.5);

    assert_eq!(fused.dimensions(), reference.dimensions());
    assert_eq!(fused.dimensions(), (32, 24, 3));
    assert!(mean_abs_diff(&engine, &fused, &reference) < 0.001);
    assert_eq!(fused.format(), ImageType::Png);
    assert_eq!(fused.original_format(), ImageType::Jpeg);
}

#[test]
fn manual_protocol_matches_pipeline() {
    let engine = engine();
    let input = gradient(40, 40, 1);

    let mut resize = engine.operation("resize").unwrap();
    resize.set("in", &input).unwrap();
    resize.set("scale", 0.5).unwrap();
    let mut sharpen = engine.operation("sharpen").unwrap();
    link(&resize, "out", &mut sharpen, "in").unwrap();
    sharpen.set("sigma", 1.5).unwrap();
    let built = engine.build(&sharpen).unwrap();
    let manual = extract_output(&built).unwrap();

    let piped = fused_pipeline(&engine, &input, &resize_sharpen(0.5, 1.5)).unwrap();
    assert_eq!(manual.data(), piped.data());
}

#[test]
fn resource_counts_return_to_baseline() {
    let engine = engine();
    let input = gradient(32, 32, 3);
    let baseline = engine.counts();

    for i in 0..25 {
        let out = fused_pipeline(&engine, &input, &resize_sharpen(0.5, 1.0)).unwrap();
        assert_eq!(out.dimensions(), (16, 16, 3));
        drop(out);

        // Failing calls clean up too
        let err = fused_pipeline(&engine, &input, &resize_sharpen(-0.5, 1.0)).unwrap_err();
        assert!(err.is_build_error(), "iteration {i}: {err}");
        let err = fused_pipeline(&engine, &input, &[Stage::new("resize"), Stage::new("nope")]).unwrap_err();
        assert!(err.is_unknown_operation());
    }

    assert_eq!(engine.counts(), baseline);
    assert!(engine.counts().is_zero());
}

#[test]
fn cached_results_released_by_clear() {
    let engine = Engine::default();
    let input = gradient(16, 16, 1);
    for _ in 0..5 {
        fused_pipeline(&engine, &input, &resize_sharpen(0.5, 1.0)).unwrap();
    }
    assert!(engine.cache().stats().hits >= 8);
    assert!(engine.counts().images > 0);

    engine.cache().clear();
    assert!(engine.counts().is_zero());
}

#[test]
fn single_stage_equals_direct_call() {
    let engine = engine();
    let input = gradient(20, 10, 3);

    let fused = fused_pipeline(&engine, &input, &[Stage::new("gaussblur").set("sigma", 2.0)]).unwrap();
    let direct = extract_output(
        &engine
            .call("gaussblur", [("in", Value::from(&input)), ("sigma", Value::from(2.0))])
            .unwrap(),
    )
    .unwrap();
    assert_eq!(fused.data(), direct.data());
}

#[test]
fn long_chain_builds_in_one_call() {
    let engine = engine();
    let input = gradient(32, 32, 3);
    let pipeline = Pipeline::new()
        .stage(Stage::new("resize").set("scale", 0.5))
        .stage(Stage::new("gaussblur").set("sigma", 0.8))
        .stage(Stage::new("linear").set("a", 2.0).set("b", -0.25))
        .stage(Stage::new("flip").set("direction", "horizontal"))
        .stage(Stage::new("extract_area").set("left", 2).set("top", 4).set("width", 8).set("height", 6))
        .stage(Stage::new("sharpen").set("sigma", 1.0));

    let graph = pipeline.plan(&engine, &input).unwrap();
    assert_eq!(graph.len(), 6);
    assert_eq!(graph.edges().len(), 5);
    drop(graph);

    let out = pipeline.run(&engine, &input).unwrap();
    assert_eq!(out.dimensions(), (8, 6, 3));
    assert!(out.data().iter().all(|v| v.is_finite()));
    assert!(engine.counts().descriptors == 0 && engine.counts().built_operations == 0);
}

#[test]
fn very_long_chain_builds_and_releases() {
    let engine = engine();
    let input = Image::filled(1, 1, 1, 0.5);
    let pipeline: Pipeline = (0..50_000).map(|_| Stage::new("copy")).collect();

    let out = pipeline.run(&engine, &input).unwrap();
    assert_eq!(out.data(), [0.5f32].as_slice());
    drop(out);
    assert!(engine.counts().is_zero());
}

#[test]
fn oversized_resize_is_a_build_error() {
    let engine = engine();
    let input = Image::filled(10, 10, 1, 0.5);
    let err = fused_pipeline(&engine, &input, &[Stage::new("resize").set("scale", 1.0e5)]).unwrap_err();
    assert!(err.is_build_error(), "{err}");
    assert!(engine.counts().is_zero());
}

#[test]
fn invalid_parameter_fails_atomically() {
    let engine = engine();
    let input = gradient(16, 16, 3);

    let mut resize = engine.operation("resize").unwrap();
    resize.set("in", &input).unwrap();
    resize.set("scale", -0.5).unwrap();
    let mut sharpen = engine.operation("sharpen").unwrap();
    link(&resize, "out", &mut sharpen, "in").unwrap();

    let err = engine.build(&sharpen).unwrap_err();
    match &err {
        FusionError::BuildError { operation, message } => {
            assert_eq!(operation, "resize");
            assert!(!message.is_empty());
        }
        other => panic!("expected BuildError, got {other:?}"),
    }
    // Nothing was produced and nothing was sealed
    assert_eq!(engine.counts().images, 0);
    assert_eq!(engine.counts().built_operations, 0);
    assert_eq!(sharpen.state(), NodeState::Wired);

    drop((resize, sharpen));
    assert!(engine.counts().is_zero());
}

#[test]
fn failure_in_late_stage_drops_earlier_intermediates() {
    let engine = engine();
    let input = gradient(8, 8, 1);
    let stages = [
        Stage::new("resize").set("scale", 2.0),
        Stage::new("invert"),
        Stage::new("extract_area").set("left", 10).set("top", 0).set("width", 8).set("height", 8),
    ];
    let err = fused_pipeline(&engine, &input, &stages).unwrap_err();
    assert!(err.is_build_error());
    assert!(err.build_message().is_some_and(|m| !m.is_empty()));
    assert!(engine.counts().is_zero());
}

#[test]
fn type_mismatch_before_evaluation() {
    let engine = engine();
    let input = gradient(4, 4, 1);

    let mut resize = engine.operation("resize").unwrap();
    assert!(resize.set("scale", &input).unwrap_err().is_type_mismatch());
    assert!(resize.set("in", 0.5).unwrap_err().is_type_mismatch());
    assert!(resize.set("kernel", 3).unwrap_err().is_type_mismatch());

    let avg = engine.operation("avg").unwrap();
    let mut sharpen = engine.operation("sharpen").unwrap();
    // Scalar outputs cannot be linked as images
    assert!(link(&avg, "out", &mut sharpen, "in").is_err());

    assert_eq!(engine.counts().images, 0);
    assert_eq!(engine.counts().built_operations, 0);
}

#[test]
fn output_survives_release_of_everything_else() {
    let engine = engine();
    let input = gradient(24, 24, 3);

    let mut resize = engine.operation("resize").unwrap();
    resize.set("in", &input).unwrap();
    resize.set("scale", 0.5).unwrap();
    let mut sharpen = engine.operation("sharpen").unwrap();
    link(&resize, "out", &mut sharpen, "in").unwrap();
    let built = engine.build(&sharpen).unwrap();
    let output = extract_output(&built).unwrap();
    let snapshot = output.to_vec();

    drop(built);
    drop(sharpen);
    drop(resize);
    drop(input);

    assert_eq!(output.ref_count(), 1);
    assert_eq!(output.data(), snapshot.as_slice());
    assert_eq!(output.pixel(11, 11).unwrap().len(), 3);
    let counts = engine.counts();
    assert_eq!((counts.descriptors, counts.built_operations, counts.images), (0, 0, 1));
}

#[test]
fn upstream_descriptor_dropped_before_build() {
    let engine = engine();
    let input = gradient(16, 16, 1);

    let mut sharpen = engine.operation("sharpen").unwrap();
    {
        let mut resize = engine.operation("resize").unwrap();
        resize.set("in", &input).unwrap();
        resize.set("scale", 0.5).unwrap();
        link(&resize, "out", &mut sharpen, "in").unwrap();
    }
    // The deferred reference keeps the upstream node alive
    assert_eq!(engine.counts().descriptors, 2);
    let out = extract_output(&engine.build(&sharpen).unwrap()).unwrap();
    assert_eq!(out.dimensions(), (8, 8, 1));
}

#[test]
fn independent_graphs_on_many_threads() {
    let engine = Arc::new(engine());
    let input = gradient(32, 32, 3);
    let reference = fused_pipeline(&engine, &input, &resize_sharpen(0.5, 1.5)).unwrap();

    std::thread::scope(|s| {
        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            let input = input.clone();
            let reference = reference.clone();
            s.spawn(move || {
                for _ in 0..5 {
                    let out = fused_pipeline(&engine, &input, &resize_sharpen(0.5, 1.5)).unwrap();
                    assert_eq!(out.data(), reference.data());
                }
            });
        }
    });

    drop(reference);
    assert!(engine.counts().is_zero());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_fused_equals_sequential(
        width in 4u32..40,
        height in 4u32..40,
        bands in 1u32..4,
        scale in 0.2f64..2.0,
        sigma in 0.3f64..3.0,
    ) {
        let engine = engine();
        let input = gradient(width, height, bands);

        let fused = fused_pipeline(&engine, &input, &resize_sharpen(scale, sigma)).unwrap();
        let reference = sequential(&engine, &input, scale, sigma);

        prop_assert_eq!(fused.dimensions(), reference.dimensions());
        prop_assert!(mean_abs_diff(&engine, &fused, &reference) < 0.001);
    }
}
