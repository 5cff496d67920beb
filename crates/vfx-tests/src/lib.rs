//! Integration tests for the fused operation graph crates.
//!
//! These tests check that graphs built through `vfx-fusion` produce the
//! same pixels as calling the `vfx-ops` kernels directly, and that the
//! pieces of the workspace agree on geometry and format metadata.

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use vfx_core::{Image, ImageType};
    use vfx_fusion::{Engine, EngineConfig, PipelineSpec, Stage, fused_pipeline};
    use vfx_ops::{Direction, Filter, arithmetic, filter, resize, transform};

    fn engine() -> Engine {
        Engine::new(EngineConfig::default().without_cache()).unwrap()
    }

    fn ramp(width: u32, height: u32, bands: u32) -> Image {
        let n = (width * height * bands) as usize;
        let data: Vec<f32> = (0..n).map(|i| ((i * 7) % 101) as f32 / 100.0).collect();
        Image::from_f32(data, width, height, bands).unwrap()
    }

    /// Fused resize -> sharpen equals the two kernels applied in sequence
    #[test]
    fn test_fused_matches_kernels() {
        let input = ramp(48, 32, 3);
        let out = fused_pipeline(
            &engine(),
            &input,
            &[
                Stage::new("resize").set("scale", 0.5),
                Stage::new("sharpen").set("sigma", 1.5),
            ],
        )
        .unwrap();

        let (small, w, h) = resize::resize_scale(input.data(), 48, 32, 3, 0.5, 0.5, Filter::Lanczos3).unwrap();
        let expected = filter::unsharp_mask(&small, w, h, 3, 1.5, 1.0, 0.0).unwrap();

        assert_eq!(out.dimensions(), (w as u32, h as u32, 3));
        for (a, b) in out.data().iter().zip(&expected) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_geometry_chain_matches_kernels() {
        let input = ramp(10, 8, 2);
        let out = fused_pipeline(
            &engine(),
            &input,
            &[
                Stage::new("flip").set("direction", "vertical"),
                Stage::new("extract_area").set("left", 1).set("top", 2).set("width", 4).set("height", 3),
                Stage::new("invert"),
            ],
        )
        .unwrap();

        let flipped = transform::flip(input.data(), 10, 8, 2, Direction::Vertical).unwrap();
        let area = transform::extract_area(&flipped, 10, 8, 2, 1, 2, 4, 3).unwrap();
        let expected = arithmetic::invert(&area);

        assert_eq!(out.dimensions(), (4, 3, 2));
        assert_eq!(out.data(), expected.as_slice());
    }

    #[test]
    fn test_avg_matches_kernel() {
        let engine = engine();
        let input = ramp(16, 16, 1);
        let built = engine.call("avg", [("in", &input)]).unwrap();
        let avg = built.get("out").unwrap().as_f64().unwrap();
        assert_relative_eq!(avg, arithmetic::average(input.data()).unwrap());
    }

    #[test]
    fn test_yaml_pipeline_end_to_end() {
        let yaml = "
stages:
  - op: resize
    properties: { scale: 0.25, kernel: linear }
  - op: linear
    properties: { a: 0.5, b: 0.25 }
";
        let doc = PipelineSpec::from_yaml(yaml).unwrap();
        let input = ramp(32, 32, 3).with_formats(ImageType::Tiff, ImageType::Exr);
        let engine = engine();
        let out = doc.to_pipeline().run(&engine, &input).unwrap();

        let (small, _, _) = resize::resize_scale(input.data(), 32, 32, 3, 0.25, 0.25, Filter::Linear).unwrap();
        let expected = arithmetic::linear(&small, 0.5, 0.25).unwrap();
        assert_eq!(out.dimensions(), (8, 8, 3));
        assert_eq!(out.data(), expected.as_slice());
        assert_eq!(out.format(), ImageType::Tiff);
        assert_eq!(out.original_format(), ImageType::Exr);
        drop(out);
        assert!(engine.counts().is_zero());
    }

    #[test]
    fn test_kernel_validation_surfaces_verbatim() {
        let input = ramp(4, 4, 1);
        let err = fused_pipeline(&engine(), &input, &[Stage::new("gaussblur").set("sigma", 0.0)]).unwrap_err();
        assert!(err.is_build_error());
        assert!(err.build_message().unwrap().contains("sigma"));

        let err = fused_pipeline(&engine(), &input, &[Stage::new("resize").set("scale", 1.0).set("kernel", "box")])
            .unwrap_err();
        assert!(err.build_message().unwrap().contains("box"));
    }
}
