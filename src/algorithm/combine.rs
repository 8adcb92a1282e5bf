//! Composite detectors built from other registered algorithms.

use super::{resolve_threshold, SpikeAlgorithm};
use crate::data::IndexSet;
use crate::error::{DespikeError, Result};
use std::sync::Arc;

/// Default fraction of the grow detector's threshold used while extending.
pub const DEFAULT_RELAX: f64 = 0.5;

/// Default maximum number of samples added on each side of a base flag.
pub const DEFAULT_MAX_EXTEND: usize = 3;

fn elementwise<F>(a: Vec<f64>, b: Vec<f64>, f: F) -> Result<Vec<f64>>
where
    F: Fn(f64, f64) -> f64,
{
    if a.len() != b.len() {
        return Err(DespikeError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(a.into_iter().zip(b).map(|(x, y)| f(x, y)).collect())
}

/// Flags positions that both constituents flag.
///
/// With a single shared threshold the metric (element-wise minimum) and the
/// flagged set agree exactly.
#[derive(Debug, Clone)]
pub struct AndCombinator {
    name: String,
    first: Arc<dyn SpikeAlgorithm>,
    second: Arc<dyn SpikeAlgorithm>,
    default_threshold: f64,
    description: String,
}

impl AndCombinator {
    pub fn new(
        name: &str,
        first: Arc<dyn SpikeAlgorithm>,
        second: Arc<dyn SpikeAlgorithm>,
        default_threshold: f64,
    ) -> Self {
        let description = format!("{} AND {}", first.name(), second.name());
        Self {
            name: name.to_string(),
            first,
            second,
            default_threshold,
            description,
        }
    }

    /// Flag positions with independent thresholds for each constituent.
    ///
    /// A missing override falls back to this combinator's default threshold,
    /// not to the constituent's own default.
    pub fn indices_split(
        &self,
        y: &[f64],
        first_threshold: Option<f64>,
        second_threshold: Option<f64>,
    ) -> Result<IndexSet> {
        let t1 = resolve_threshold(first_threshold, self.default_threshold)?;
        let t2 = resolve_threshold(second_threshold, self.default_threshold)?;
        let a = self.first.indices(y, Some(t1))?;
        let b = self.second.indices(y, Some(t2))?;
        Ok(a.intersection(&b).copied().collect())
    }
}

impl SpikeAlgorithm for AndCombinator {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_threshold(&self) -> f64 {
        self.default_threshold
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn metric(&self, y: &[f64]) -> Result<Vec<f64>> {
        elementwise(self.first.metric(y)?, self.second.metric(y)?, f64::min)
    }

    fn indices(&self, y: &[f64], threshold: Option<f64>) -> Result<IndexSet> {
        let t = resolve_threshold(threshold, self.default_threshold)?;
        self.indices_split(y, Some(t), Some(t))
    }
}

/// Flags positions that either constituent flags.
#[derive(Debug, Clone)]
pub struct OrCombinator {
    name: String,
    first: Arc<dyn SpikeAlgorithm>,
    second: Arc<dyn SpikeAlgorithm>,
    default_threshold: f64,
    description: String,
}

impl OrCombinator {
    pub fn new(
        name: &str,
        first: Arc<dyn SpikeAlgorithm>,
        second: Arc<dyn SpikeAlgorithm>,
        default_threshold: f64,
    ) -> Self {
        let description = format!("{} OR {}", first.name(), second.name());
        Self {
            name: name.to_string(),
            first,
            second,
            default_threshold,
            description,
        }
    }
}

impl SpikeAlgorithm for OrCombinator {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_threshold(&self) -> f64 {
        self.default_threshold
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn metric(&self, y: &[f64]) -> Result<Vec<f64>> {
        elementwise(self.first.metric(y)?, self.second.metric(y)?, f64::max)
    }

    fn indices(&self, y: &[f64], threshold: Option<f64>) -> Result<IndexSet> {
        let t = resolve_threshold(threshold, self.default_threshold)?;
        let mut flagged = self.first.indices(y, Some(t))?;
        flagged.extend(self.second.indices(y, Some(t))?);
        Ok(flagged)
    }
}

/// Grows every flag of a base detector into neighbouring samples.
///
/// Starting from each base flag, samples to the left and right are added while
/// the grow detector's score exceeds `grow.default_threshold() * relax`. At most
/// `max_extend` samples are added per side, so growth never runs across a broad
/// real peak. The result always contains the base set.
#[derive(Debug, Clone)]
pub struct ExtendCombinator {
    name: String,
    base: Arc<dyn SpikeAlgorithm>,
    grow: Arc<dyn SpikeAlgorithm>,
    relax: f64,
    max_extend: usize,
    description: String,
}

impl ExtendCombinator {
    pub fn new(name: &str, base: Arc<dyn SpikeAlgorithm>, grow: Arc<dyn SpikeAlgorithm>) -> Self {
        let description = format!("{} extended by {}", base.name(), grow.name());
        Self {
            name: name.to_string(),
            base,
            grow,
            relax: DEFAULT_RELAX,
            max_extend: DEFAULT_MAX_EXTEND,
            description,
        }
    }

    /// Set the relaxation factor applied to the grow threshold, in (0, 1].
    pub fn with_relax(mut self, relax: f64) -> Result<Self> {
        if !(relax > 0.0 && relax <= 1.0) {
            return Err(DespikeError::InvalidParameter(format!(
                "Extend relax factor must be in (0, 1], got {}",
                relax
            )));
        }
        self.relax = relax;
        Ok(self)
    }

    /// Set the maximum number of samples added per side.
    pub fn with_max_extend(mut self, max_extend: usize) -> Self {
        self.max_extend = max_extend;
        self
    }

    /// Threshold the grow detector's score must exceed to extend a run.
    pub fn grow_threshold(&self) -> f64 {
        self.grow.default_threshold() * self.relax
    }

    /// Maximum number of samples added per side.
    pub fn max_extend(&self) -> usize {
        self.max_extend
    }

    fn extend(&self, base: &IndexSet, grow_scores: &[f64]) -> IndexSet {
        let t = self.grow_threshold();
        let n = grow_scores.len();
        let mut flagged = base.clone();
        for &i in base {
            // Left
            let mut j = i;
            for _ in 0..self.max_extend {
                if j == 0 || grow_scores[j - 1] <= t {
                    break;
                }
                j -= 1;
                flagged.insert(j);
            }
            // Right
            let mut j = i;
            for _ in 0..self.max_extend {
                if j + 1 >= n || grow_scores[j + 1] <= t {
                    break;
                }
                j += 1;
                flagged.insert(j);
            }
        }
        flagged
    }
}

impl SpikeAlgorithm for ExtendCombinator {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_threshold(&self) -> f64 {
        self.base.default_threshold()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn metric(&self, y: &[f64]) -> Result<Vec<f64>> {
        self.base.metric(y)
    }

    fn indices(&self, y: &[f64], threshold: Option<f64>) -> Result<IndexSet> {
        let base = self.base.indices(y, threshold)?;
        if base.is_empty() {
            return Ok(base);
        }
        let grow_scores = self.grow.metric(y)?;
        Ok(self.extend(&base, &grow_scores))
    }
}
