//! Benchmarking utilities for evaluating spike detectors.
//!
//! This module generates synthetic spectra with known spike positions and
//! scores each detector's precision, recall, and repair error on them.

mod evaluate;
mod generate;

pub use evaluate::{benchmark_registry, evaluate_detection, DetectionEvaluation};
pub use generate::{generate_synthetic, PeakLine, SyntheticConfig, SyntheticSpectrum};
