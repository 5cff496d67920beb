//! Linear pipelines: the caller-facing entry point.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s. Running it creates one
//! descriptor per stage, links each stage's output into the next stage's
//! declared input, builds the last descriptor once and extracts its image.
//! Every descriptor and the built operation are released before the image
//! is returned; on failure they are released while the error propagates.
//!
//! # Example
//!
//! ```rust
//! use vfx_fusion::{Engine, Stage, fused_pipeline};
//! use vfx_core::{Image, ImageType};
//!
//! let engine = Engine::default();
//! let input = Image::filled(32, 32, 3, 0.5).with_formats(ImageType::Png, ImageType::Jpeg);
//!
//! let stages = [
//!     Stage::new("resize").set("scale", 0.5),
//!     Stage::new("sharpen").set("sigma", 1.5),
//! ];
//! let out = fused_pipeline(&engine, &input, &stages).unwrap();
//! assert_eq!(out.dimensions(), (16, 16, 3));
//! assert_eq!(out.original_format(), ImageType::Jpeg);
//! ```
//!
//! Pipelines can also be described in YAML:
//!
//! ```yaml
//! stages:
//!   - op: resize
//!     properties: { scale: 0.5, kernel: cubic }
//!   - op: sharpen
//!     properties: { sigma: 1.5 }
//! ```

use crate::descriptor::Descriptor;
use crate::engine::Engine;
use crate::error::{FusionError, FusionResult};
use crate::graph::Graph;
use crate::link::link;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use vfx_core::Image;

const DEFAULT_INPUT: &str = "in";
const DEFAULT_OUTPUT: &str = "out";

/// One operation of a pipeline.
#[derive(Debug, Clone)]
pub struct Stage {
    operation: String,
    input: String,
    output: String,
    properties: Vec<(String, Value)>,
}

impl Stage {
    /// Stage running `operation`, fed through `in`, producing `out`.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            input: DEFAULT_INPUT.to_string(),
            output: DEFAULT_OUTPUT.to_string(),
            properties: Vec::new(),
        }
    }

    /// Property that receives the upstream image.
    ///
    /// The pipeline owns this property: also passing it to [`Stage::set`]
    /// makes [`Pipeline::assemble`] fail with
    /// [`FusionError::InvalidProperty`].
    pub fn input(mut self, name: impl Into<String>) -> Self {
        self.input = name.into();
        self
    }

    /// Property passed downstream.
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.output = name.into();
        self
    }

    /// Adds a property.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    /// Operation name.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Input property name.
    pub fn input_name(&self) -> &str {
        &self.input
    }

    /// Output property name.
    pub fn output_name(&self) -> &str {
        &self.output
    }

    fn describe(&self, engine: &Engine) -> FusionResult<Descriptor> {
        let mut desc = engine.operation(&self.operation)?;
        for (name, value) in &self.properties {
            desc.set(name, value.clone())?;
        }
        Ok(desc)
    }
}

/// Ordered chain of stages.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends a stage in place.
    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// Stages in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if there are no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Creates and links one descriptor per stage.
    ///
    /// The first stage's input is set to `input`; each later stage's input
    /// is linked to the previous stage's output. A stage that also sets its
    /// input property explicitly is rejected.
    pub fn assemble(&self, engine: &Engine, input: &Image) -> FusionResult<Vec<Descriptor>> {
        if self.stages.is_empty() {
            return Err(FusionError::EmptyPipeline);
        }
        let mut descriptors: Vec<Descriptor> = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            if stage.properties.iter().any(|(name, _)| *name == stage.input) {
                return Err(FusionError::invalid_property(&stage.operation, &stage.input));
            }
            let mut desc = stage.describe(engine)?;
            match descriptors.last() {
                None => desc.set(&stage.input, input)?,
                Some(prev) => {
                    let prev_stage = &self.stages[descriptors.len() - 1];
                    link(prev, &prev_stage.output, &mut desc, &stage.input)?;
                }
            }
            descriptors.push(desc);
        }
        Ok(descriptors)
    }

    /// Plans the graph without building it.
    pub fn plan(&self, engine: &Engine, input: &Image) -> FusionResult<Graph> {
        let descriptors = self.assemble(engine, input)?;
        match descriptors.last() {
            Some(terminal) => engine.plan(terminal),
            None => Err(FusionError::EmptyPipeline),
        }
    }

    /// Builds the chain in one call and returns the final image.
    ///
    /// The result inherits `input`'s file-format metadata.
    pub fn run(&self, engine: &Engine, input: &Image) -> FusionResult<Image> {
        let descriptors = self.assemble(engine, input)?;
        let (Some(terminal), Some(last)) = (descriptors.last(), self.stages.last()) else {
            return Err(FusionError::EmptyPipeline);
        };
        debug!(stages = self.stages.len(), "run pipeline");

        let built = engine.build(terminal)?;
        let image = built.image(&last.output)?.with_formats_of(input);
        drop(built);
        drop(descriptors);
        Ok(image)
    }
}

impl FromIterator<Stage> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}

/// Builds and runs `stages` over `input` as one fused graph.
pub fn fused_pipeline(engine: &Engine, input: &Image, stages: &[Stage]) -> FusionResult<Image> {
    stages.iter().cloned().collect::<Pipeline>().run(engine, input)
}

/// Scalar property value in a pipeline file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// `true` / `false`.
    Bool(bool),
    /// Integer literal. Write `1.0`, not `1`, for double properties.
    Int(i64),
    /// Float literal.
    Double(f64),
    /// Any other string.
    Str(String),
}

impl From<ScalarValue> for Value {
    fn from(v: ScalarValue) -> Self {
        match v {
            ScalarValue::Bool(b) => Value::Bool(b),
            ScalarValue::Int(i) => Value::Int(i),
            ScalarValue::Double(d) => Value::Double(d),
            ScalarValue::Str(s) => Value::Str(s),
        }
    }
}

fn default_input() -> String {
    DEFAULT_INPUT.to_string()
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

/// Serialized stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Operation name.
    pub op: String,
    /// Property receiving the upstream image.
    #[serde(default = "default_input")]
    pub input: String,
    /// Property passed downstream.
    #[serde(default = "default_output")]
    pub output: String,
    /// Scalar properties.
    #[serde(default)]
    pub properties: BTreeMap<String, ScalarValue>,
}

/// Serialized pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Stages in order.
    pub stages: Vec<StageSpec>,
}

impl PipelineSpec {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> FusionResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serializes to YAML.
    pub fn to_yaml(&self) -> FusionResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to a runnable pipeline.
    pub fn to_pipeline(&self) -> Pipeline {
        self.stages
            .iter()
            .map(|s| {
                s.properties.iter().fold(
                    Stage::new(s.op.clone()).input(s.input.clone()).output(s.output.clone()),
                    |stage, (k, v)| stage.set(k.clone(), v.clone()),
                )
            })
            .collect()
    }
}
