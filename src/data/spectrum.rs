//! Spectrum snapshot: an axis, a signal, and the fields carried along with them.

use crate::error::{DespikeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Flagged sample positions. Iteration is always ascending.
pub type IndexSet = BTreeSet<usize>;

/// Minimum number of samples any metric can work with.
pub const MIN_SAMPLES: usize = 3;

/// An immutable (axis, signal) pair with metadata and processing history.
///
/// Every transformation produces a new `Spectrum` through [`Spectrum::derive`];
/// the source snapshot is never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpectrum")]
pub struct Spectrum {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Free-form key/value metadata copied to every derived spectrum.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Names of the processing steps applied so far, oldest first.
    #[serde(default)]
    pub history: Vec<String>,
}

/// Unvalidated serialized form; converted through [`Spectrum::new`] checks.
#[derive(Deserialize)]
struct RawSpectrum {
    x: Vec<f64>,
    y: Vec<f64>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    history: Vec<String>,
}

impl TryFrom<RawSpectrum> for Spectrum {
    type Error = DespikeError;

    fn try_from(raw: RawSpectrum) -> Result<Self> {
        validate_pair(&raw.x, &raw.y)?;
        Ok(Self {
            x: raw.x,
            y: raw.y,
            metadata: raw.metadata,
            history: raw.history,
        })
    }
}

/// Serialized row of a spectrum TSV file.
#[derive(Debug, Serialize, Deserialize)]
struct SpectrumRow {
    x: f64,
    y: f64,
}

impl Spectrum {
    /// Create a spectrum, validating the axis/signal pair.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        validate_pair(&x, &y)?;
        Ok(Self {
            x,
            y,
            metadata: BTreeMap::new(),
            history: Vec::new(),
        })
    }

    /// Create a spectrum whose axis is the sample index `0..y.len()`.
    pub fn from_signal(y: Vec<f64>) -> Result<Self> {
        let x = (0..y.len()).map(|i| i as f64).collect();
        Self::new(x, y)
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Load a spectrum from a two-column TSV file with an `x`/`y` header.
    ///
    /// Lines starting with `#` are ignored.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut x = Vec::new();
        let mut y = Vec::new();
        for row in reader.deserialize() {
            let row: SpectrumRow = row?;
            x.push(row.x);
            y.push(row.y);
        }

        let spectrum = Self::new(x, y)?;
        Ok(spectrum.with_metadata("source", &path.display().to_string()))
    }

    /// Write the spectrum as a two-column TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;
        for (&x, &y) in self.x.iter().zip(self.y.iter()) {
            writer.serialize(SpectrumRow { x, y })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// The axis values.
    #[inline]
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// The signal values.
    #[inline]
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Always false for a validated spectrum; provided for API completeness.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Build a sibling spectrum from a pure `(x, y) -> (x, y)` transformation.
    ///
    /// Metadata and history are copied and `step` is appended to the history.
    /// The output pair is validated like any other spectrum.
    pub fn derive<F>(&self, step: &str, transform: F) -> Result<Spectrum>
    where
        F: FnOnce(&[f64], &[f64]) -> Result<(Vec<f64>, Vec<f64>)>,
    {
        let (x, y) = transform(&self.x, &self.y)?;
        validate_pair(&x, &y)?;
        let mut history = self.history.clone();
        history.push(step.to_string());
        Ok(Spectrum {
            x,
            y,
            metadata: self.metadata.clone(),
            history,
        })
    }

    /// Like [`Spectrum::derive`] but only the signal changes.
    pub fn derive_signal<F>(&self, step: &str, transform: F) -> Result<Spectrum>
    where
        F: FnOnce(&[f64], &[f64]) -> Result<Vec<f64>>,
    {
        self.derive(step, |x, y| {
            let new_y = transform(x, y)?;
            Ok((x.to_vec(), new_y))
        })
    }
}

/// Check the preconditions shared by every (axis, signal) pair.
///
/// Length equality is checked first, then the minimum length, then that the
/// axis is finite and strictly monotonic.
pub fn validate_pair(x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(DespikeError::DimensionMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    validate_signal(y)?;
    if x.iter().any(|v| !v.is_finite()) {
        return Err(DespikeError::InvalidInput(
            "Axis contains non-finite values".to_string(),
        ));
    }
    let increasing = x.windows(2).all(|w| w[1] > w[0]);
    let decreasing = x.windows(2).all(|w| w[1] < w[0]);
    if !increasing && !decreasing {
        return Err(DespikeError::InvalidInput(
            "Axis must be strictly monotonic".to_string(),
        ));
    }
    Ok(())
}

/// Check that every flagged position lies inside a signal of `n` samples.
pub fn validate_indices(flagged: &IndexSet, n: usize) -> Result<()> {
    match flagged.last() {
        Some(&i) if i >= n => Err(DespikeError::InvalidInput(format!(
            "Flagged index {} out of bounds for {} samples",
            i, n
        ))),
        _ => Ok(()),
    }
}

/// Check that a signal is long enough for boundary-safe metrics.
pub fn validate_signal(y: &[f64]) -> Result<()> {
    if y.len() < MIN_SAMPLES {
        return Err(DespikeError::InvalidInput(format!(
            "Signal has {} samples, at least {} required",
            y.len(),
            MIN_SAMPLES
        )));
    }
    Ok(())
}
