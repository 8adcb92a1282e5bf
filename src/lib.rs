//! Composable spike detection and correction for 1-D spectra.
//!
//! Narrow single-sample or few-sample artifacts (cosmic-ray spikes, detector
//! glitches) are located with a family of anomaly metrics and then removed,
//! interpolated over, or isolated.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Spectrum snapshots and named analysis results
//! - **metric**: Per-sample anomaly scores
//! - **algorithm**: Named detectors, combinators and the registry
//! - **correct**: Drop, interpolate, windowed repair, spike isolation, injection
//! - **analyze**: Detection reports as named results
//! - **pipeline**: Pipeline composition and execution
//! - **benchmark**: Synthetic spectra with known spikes and detector scoring
//!
//! # Example
//!
//! ```no_run
//! use spectral_despike::prelude::*;
//!
//! let registry = AlgorithmRegistry::builtin().unwrap();
//! let spectrum = Spectrum::from_tsv("raman.tsv").unwrap();
//!
//! let output = Pipeline::new()
//!     .detect("gg_1spike", None)
//!     .fix_interp("gg_1spike", None, InterpKind::Linear)
//!     .run(&registry, &spectrum)
//!     .unwrap();
//! ```

pub mod algorithm;
pub mod analyze;
pub mod benchmark;
pub mod correct;
pub mod data;
pub mod error;
pub mod metric;
pub mod pipeline;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::algorithm::{
        AlgorithmRegistry, AndCombinator, ExtendCombinator, MetricAlgorithm, OrCombinator,
        SpikeAlgorithm,
    };
    pub use crate::analyze::{analyze_spikes, spikes_indices, spikes_metric, SpikeReport};
    pub use crate::benchmark::{
        benchmark_registry, evaluate_detection, generate_synthetic, DetectionEvaluation,
        SyntheticConfig, SyntheticSpectrum,
    };
    pub use crate::correct::{
        add_spike, spikes_drop, spikes_fix_interp, spikes_multi_spike_fix, spikes_only,
        FailurePolicy, InterpKind, MultiSpikeFix, MultiSpikeParams, SpikeInjection,
    };
    pub use crate::data::{IndexSet, NamedResults, ResultValue, Spectrum};
    pub use crate::error::{DespikeError, Result};
    pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineOutput, PipelineStep};
}
