//! Pipeline runner for composing and executing correction steps.

use crate::algorithm::AlgorithmRegistry;
use crate::analyze::analyze_spikes;
use crate::correct::{
    add_spike, spikes_drop, spikes_fix_interp, spikes_multi_spike_fix, spikes_only,
    FailurePolicy, InterpKind, MultiSpikeParams, DEFAULT_WINDOW,
};
use crate::data::{NamedResults, Spectrum};
use crate::error::{DespikeError, Result};
use serde::{Deserialize, Serialize};

fn default_window() -> usize {
    DEFAULT_WINDOW
}

/// A step in the correction pipeline.
///
/// Algorithm names are plain strings resolved through the registry when the
/// pipeline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineStep {
    // === Analysis ===
    /// Record scores and flagged positions without changing the spectrum.
    Detect {
        method: String,
        #[serde(default)]
        threshold: Option<f64>,
    },

    // === Correction ===
    /// Remove flagged samples.
    Drop {
        method: String,
        #[serde(default)]
        threshold: Option<f64>,
    },
    /// Interpolate over flagged samples.
    FixInterp {
        method: String,
        #[serde(default)]
        threshold: Option<f64>,
        #[serde(default)]
        kind: InterpKind,
    },
    /// Windowed repair of flagged samples.
    MultiSpikeFix {
        method: String,
        #[serde(default)]
        threshold: Option<f64>,
        #[serde(default = "default_window")]
        window: usize,
        #[serde(default)]
        kind: InterpKind,
        #[serde(default)]
        on_failure: FailurePolicy,
    },
    /// Keep only the spike contribution.
    SpikesOnly {
        method: String,
        #[serde(default)]
        threshold: Option<f64>,
    },

    // === Synthesis ===
    /// Add known values around an axis location.
    AddSpike { location: f64, values: Vec<f64> },
}

impl PipelineStep {
    /// Short step label used in result names and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Detect { .. } => "detect",
            Self::Drop { .. } => "drop",
            Self::FixInterp { .. } => "fix_interp",
            Self::MultiSpikeFix { .. } => "multi_spike_fix",
            Self::SpikesOnly { .. } => "spikes_only",
            Self::AddSpike { .. } => "add_spike",
        }
    }

    /// Algorithm name the step refers to, if any.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Detect { method, .. }
            | Self::Drop { method, .. }
            | Self::FixInterp { method, .. }
            | Self::MultiSpikeFix { method, .. }
            | Self::SpikesOnly { method, .. } => Some(method),
            Self::AddSpike { .. } => None,
        }
    }
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Steps to execute.
    pub steps: Vec<PipelineStep>,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(DespikeError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(DespikeError::from)
    }
}

/// Final spectrum plus the named results collected along the way.
///
/// Result names are prefixed with the 1-based step number and label, e.g.
/// `1_detect.spike_indices`.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub spectrum: Spectrum,
    pub results: NamedResults,
}

/// Builder for constructing and running correction pipelines.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    name: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            name: "unnamed".to_string(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            name: config.name.clone(),
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Record scores and flags of an algorithm.
    pub fn detect(mut self, method: &str, threshold: Option<f64>) -> Self {
        self.steps.push(PipelineStep::Detect {
            method: method.to_string(),
            threshold,
        });
        self
    }

    /// Remove flagged samples.
    pub fn drop_spikes(mut self, method: &str, threshold: Option<f64>) -> Self {
        self.steps.push(PipelineStep::Drop {
            method: method.to_string(),
            threshold,
        });
        self
    }

    /// Interpolate over flagged samples.
    pub fn fix_interp(mut self, method: &str, threshold: Option<f64>, kind: InterpKind) -> Self {
        self.steps.push(PipelineStep::FixInterp {
            method: method.to_string(),
            threshold,
            kind,
        });
        self
    }

    /// Windowed repair of flagged samples.
    pub fn multi_spike_fix(
        mut self,
        method: &str,
        threshold: Option<f64>,
        params: MultiSpikeParams,
    ) -> Self {
        self.steps.push(PipelineStep::MultiSpikeFix {
            method: method.to_string(),
            threshold,
            window: params.window,
            kind: params.kind,
            on_failure: params.on_failure,
        });
        self
    }

    /// Keep only the spike contribution.
    pub fn spikes_only(mut self, method: &str, threshold: Option<f64>) -> Self {
        self.steps.push(PipelineStep::SpikesOnly {
            method: method.to_string(),
            threshold,
        });
        self
    }

    /// Add known spike values around an axis location.
    pub fn add_spike(mut self, location: f64, values: &[f64]) -> Self {
        self.steps.push(PipelineStep::AddSpike {
            location,
            values: values.to_vec(),
        });
        self
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            steps: self.steps.clone(),
        }
    }

    /// Check every algorithm name against the registry without running.
    pub fn validate(&self, registry: &AlgorithmRegistry) -> Result<()> {
        for (i, step) in self.steps.iter().enumerate() {
            if let Some(method) = step.method() {
                registry.lookup(method).map_err(|e| {
                    let label = step.label();
                    DespikeError::Pipeline(format!("Step {} ({}) failed: {}", i + 1, label, e))
                })?;
            }
        }
        Ok(())
    }

    /// Run the pipeline on a spectrum.
    pub fn run(&self, registry: &AlgorithmRegistry, spectrum: &Spectrum) -> Result<PipelineOutput> {
        log::info!(
            "Running pipeline '{}' ({} steps) on {} samples",
            self.name,
            self.steps.len(),
            spectrum.len()
        );
        let mut state = PipelineState::new(spectrum.clone());

        for (i, step) in self.steps.iter().enumerate() {
            state = state.apply(registry, i + 1, step).map_err(|e| {
                DespikeError::Pipeline(format!("Step {} ({:?}) failed: {}", i + 1, step, e))
            })?;
        }

        Ok(PipelineOutput {
            spectrum: state.spectrum,
            results: state.results,
        })
    }
}

/// Internal state during pipeline execution.
struct PipelineState {
    spectrum: Spectrum,
    results: NamedResults,
}

impl PipelineState {
    fn new(spectrum: Spectrum) -> Self {
        Self {
            spectrum,
            results: NamedResults::new(),
        }
    }

    fn record(&mut self, number: usize, step: &PipelineStep, results: NamedResults) {
        let prefix = format!("{}_{}", number, step.label());
        for (name, value) in results.iter() {
            self.results
                .insert(&format!("{}.{}", prefix, name), value.clone());
        }
    }

    fn apply(
        mut self,
        registry: &AlgorithmRegistry,
        number: usize,
        step: &PipelineStep,
    ) -> Result<Self> {
        match step {
            // === Analysis ===
            PipelineStep::Detect { method, threshold } => {
                let report = analyze_spikes(registry, &self.spectrum, method, *threshold)?;
                log::info!("{}: {} samples flagged", method, report.n_flagged());
                self.record(number, step, report.to_named_results());
            }

            // === Correction ===
            PipelineStep::Drop { method, threshold } => {
                let before = self.spectrum.len();
                self.spectrum = spikes_drop(registry, &self.spectrum, method, *threshold)?;
                let removed = (before - self.spectrum.len()) as f64;
                self.record(number, step, NamedResults::new().with("n_removed", removed));
            }
            PipelineStep::FixInterp {
                method,
                threshold,
                kind,
            } => {
                self.spectrum =
                    spikes_fix_interp(registry, &self.spectrum, method, *threshold, *kind)?;
            }
            PipelineStep::MultiSpikeFix {
                method,
                threshold,
                window,
                kind,
                on_failure,
            } => {
                let params = MultiSpikeParams {
                    window: *window,
                    kind: *kind,
                    on_failure: *on_failure,
                };
                let fixed =
                    spikes_multi_spike_fix(registry, &self.spectrum, method, *threshold, &params)?;
                self.record(
                    number,
                    step,
                    NamedResults::new()
                        .with("spike_indices", fixed.flagged.iter().copied().collect::<Vec<_>>())
                        .with("skipped_indices", fixed.skipped.clone()),
                );
                self.spectrum = fixed.spectrum;
            }
            PipelineStep::SpikesOnly { method, threshold } => {
                self.spectrum = spikes_only(registry, &self.spectrum, method, *threshold)?;
            }

            // === Synthesis ===
            PipelineStep::AddSpike { location, values } => {
                let (spectrum, injection) = add_spike(&self.spectrum, *location, values)?;
                self.spectrum = spectrum;
                self.record(number, step, injection.to_named_results());
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ResultValue;
    use approx::assert_relative_eq;

    fn create_test_spectrum() -> Spectrum {
        let x: Vec<f64> = (0..60).map(|i| 200.0 + i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 50.0 + 0.1 * v).collect();
        Spectrum::new(x, y).unwrap().with_metadata("sample", "test")
    }

    #[test]
    fn test_pipeline_builder() {
        let pipeline = Pipeline::new()
            .name("test")
            .add_spike(230.0, &[80.0])
            .detect("gg_1spike", None)
            .fix_interp("gg_1spike", None, InterpKind::Linear);

        let config = pipeline.to_config(Some("Test pipeline"));
        assert_eq!(config.steps.len(), 3);
        assert_eq!(config.name, "test");
    }

    #[test]
    fn test_pipeline_run_recovers_signal() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        let spe = create_test_spectrum();

        let output = Pipeline::new()
            .name("test")
            .add_spike(230.0, &[80.0])
            .detect("gg_1spike", None)
            .fix_interp("gg_1spike", None, InterpKind::Linear)
            .run(&registry, &spe)
            .unwrap();

        for (a, b) in output.spectrum.y().iter().zip(spe.y().iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
        assert_eq!(
            output.results.get("2_detect.spike_indices"),
            Some(&ResultValue::Indices(vec![30]))
        );
        assert!(output.results.get("1_add_spike.spike_index").is_some());
        assert_eq!(output.spectrum.history.len(), 2);
        assert_eq!(
            output.spectrum.metadata.get("sample").map(String::as_str),
            Some("test")
        );
    }

    #[test]
    fn test_pipeline_multi_spike_fix_records_results() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        let spe = create_test_spectrum();

        let output = Pipeline::new()
            .add_spike(220.0, &[60.0])
            .multi_spike_fix("gg_1spike", None, MultiSpikeParams::default())
            .run(&registry, &spe)
            .unwrap();

        assert_eq!(
            output.results.get("2_multi_spike_fix.spike_indices"),
            Some(&ResultValue::Indices(vec![20]))
        );
        assert_relative_eq!(output.spectrum.y()[20], spe.y()[20], epsilon = 1e-9);
    }

    #[test]
    fn test_pipeline_config_yaml() {
        let pipeline = Pipeline::new()
            .name("example")
            .detect("gg_lr_n2o1_n2o2_and", Some(150.0))
            .drop_spikes("gg_1spike", None)
            .multi_spike_fix(
                "gg_1spike_2spike_extend",
                None,
                MultiSpikeParams::default()
                    .with_window(5)
                    .with_kind(InterpKind::Cubic)
                    .with_policy(FailurePolicy::Skip),
            )
            .spikes_only("laplacian", None);

        let config = pipeline.to_config(Some("Example despike pipeline"));
        let yaml = config.to_yaml().unwrap();

        let parsed = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.name, "example");
        assert_eq!(parsed.steps, pipeline.steps().to_vec());
    }

    #[test]
    fn test_pipeline_config_defaults() {
        let yaml = r#"
name: minimal
description: null
steps:
  - !MultiSpikeFix
    method: gg_1spike
  - !FixInterp
    method: gg_1spike
    kind: cubic
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config.steps[0],
            PipelineStep::MultiSpikeFix {
                method: "gg_1spike".to_string(),
                threshold: None,
                window: DEFAULT_WINDOW,
                kind: InterpKind::Linear,
                on_failure: FailurePolicy::Abort,
            }
        );
        assert_eq!(
            config.steps[1],
            PipelineStep::FixInterp {
                method: "gg_1spike".to_string(),
                threshold: None,
                kind: InterpKind::Cubic,
            }
        );
    }

    #[test]
    fn test_pipeline_error_handling() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        let spe = create_test_spectrum();

        let pipeline = Pipeline::new()
            .detect("gg_1spike", None)
            .drop_spikes("not_registered", None);

        let err = pipeline.run(&registry, &spe).unwrap_err();
        match err {
            DespikeError::Pipeline(msg) => {
                assert!(msg.starts_with("Step 2"));
                assert!(msg.contains("not_registered"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(pipeline.validate(&registry).is_err());
    }

    #[test]
    fn test_algorithm_names_resolved_at_run_time() {
        use crate::algorithm::MetricAlgorithm;

        let pipeline = Pipeline::new().detect("custom", None);
        let spe = create_test_spectrum();

        // Unknown in the built-in registry...
        let builtin = AlgorithmRegistry::builtin().unwrap();
        assert!(pipeline.run(&builtin, &spe).is_err());

        // ...but the same pipeline runs against a registry that has it.
        let custom = AlgorithmRegistry::new()
            .register(MetricAlgorithm::new("custom", crate::metric::gg_1spike, 12.0))
            .unwrap();
        assert!(pipeline.run(&custom, &spe).is_ok());
    }
}
