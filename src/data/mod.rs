//! Data structures: spectrum snapshots and named analysis results.

mod named;
mod spectrum;

pub use named::{NamedResults, ResultValue};
pub use spectrum::{
    validate_indices, validate_pair, validate_signal, IndexSet, Spectrum, MIN_SAMPLES,
};
