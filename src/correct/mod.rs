//! Correction strategies for flagged samples.
//!
//! Each strategy comes in two forms: a pure function over `(x, y, flagged)`
//! slices, and a spectrum-level wrapper that resolves an algorithm name through
//! an [`AlgorithmRegistry`](crate::algorithm::AlgorithmRegistry), flags the
//! spectrum, and derives a new spectrum from the result.

mod drop;
mod fix;
mod inject;
pub mod interp;
mod only;

pub use drop::{drop_indices, spikes_drop};
pub use fix::{
    interpolate_fix, multi_spike_fix, spikes_fix_interp, spikes_multi_spike_fix, FailurePolicy,
    MultiSpikeFix, MultiSpikeOutcome, MultiSpikeParams, DEFAULT_WINDOW,
};
pub use inject::{add_spike, inject_values, nearest_index, SpikeInjection};
pub use interp::{InterpKind, Interpolator, OutOfRange};
pub use only::{spikes_only, spikes_only_signal};
