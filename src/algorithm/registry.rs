//! Name → algorithm lookup.

use super::combine::{AndCombinator, ExtendCombinator, OrCombinator};
use super::{MetricAlgorithm, SpikeAlgorithm};
use crate::error::{DespikeError, Result};
use crate::metric;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable mapping of algorithm names to detectors.
///
/// Built once, then shared by reference. Lookup is exact: no prefix matching
/// and no case folding.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmRegistry {
    algorithms: BTreeMap<String, Arc<dyn SpikeAlgorithm>>,
}

impl AlgorithmRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an algorithm under its own name.
    ///
    /// Fails if the name is already taken.
    pub fn register<A>(self, algorithm: A) -> Result<Self>
    where
        A: SpikeAlgorithm + 'static,
    {
        self.register_arc(Arc::new(algorithm))
    }

    /// Register an already shared algorithm.
    pub fn register_arc(mut self, algorithm: Arc<dyn SpikeAlgorithm>) -> Result<Self> {
        let name = algorithm.name().to_string();
        if self.algorithms.contains_key(&name) {
            return Err(DespikeError::InvalidParameter(format!(
                "Algorithm '{}' is already registered",
                name
            )));
        }
        self.algorithms.insert(name, algorithm);
        Ok(self)
    }

    /// Look up an algorithm by exact name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn SpikeAlgorithm>> {
        self.algorithms
            .get(name)
            .cloned()
            .ok_or_else(|| DespikeError::UnknownAlgorithm(name.to_string()))
    }

    /// Check if a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.algorithms.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.algorithms.keys().map(String::as_str).collect()
    }

    /// Iterate over registered algorithms in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SpikeAlgorithm>> {
        self.algorithms.values()
    }

    /// Number of registered algorithms.
    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    /// Registry with every built-in detector.
    pub fn builtin() -> Result<Self> {
        let single =
            |name: &str, f: metric::MetricFn, t: f64, desc: &str| -> Arc<dyn SpikeAlgorithm> {
                Arc::new(MetricAlgorithm::new(name, f, t).with_description(desc))
            };

        let gg_1spike = single(
            "gg_1spike",
            metric::gg_1spike,
            12.0,
            "Curvature minus central-difference asymmetry",
        );
        let gg_2spike = single(
            "gg_2spike",
            metric::gg_2spike,
            12.0,
            "Two-sample curvature minus outer asymmetry",
        );
        let lr_n2o1 = single(
            "gg_lr_n2o1",
            metric::gg_lr_n2o1,
            100.0,
            "Squared residual, linear fit on 2 neighbours per side",
        );
        let lr_n2o2 = single(
            "gg_lr_n2o2",
            metric::gg_lr_n2o2,
            100.0,
            "Squared residual, quadratic fit on 2 neighbours per side",
        );
        let lr_n3o1 = single(
            "gg_lr_n3o1",
            metric::gg_lr_n3o1,
            100.0,
            "Squared residual, linear fit on 3 neighbours per side",
        );
        let lr_n3o2 = single(
            "gg_lr_n3o2",
            metric::gg_lr_n3o2,
            100.0,
            "Squared residual, quadratic fit on 3 neighbours per side",
        );

        let n2o1_n2o2_and: Arc<dyn SpikeAlgorithm> = Arc::new(AndCombinator::new(
            "gg_lr_n2o1_n2o2_and",
            lr_n2o1.clone(),
            lr_n2o2.clone(),
            100.0,
        ));
        let n2o1_n2o2_mix: Arc<dyn SpikeAlgorithm> = Arc::new(OrCombinator::new(
            "gg_lr_n2o1_n2o2_mix",
            lr_n2o1.clone(),
            lr_n2o2.clone(),
            100.0,
        ));

        Self::new()
            .register_arc(single(
                "first_derivative",
                metric::first_derivative,
                12.0,
                "Backward first-difference magnitude",
            ))?
            .register_arc(single(
                "laplacian",
                metric::laplacian,
                12.0,
                "Five-point second-derivative magnitude",
            ))?
            .register_arc(single(
                "mod_z_scores",
                metric::mod_z_scores,
                3.5,
                "Modified z-score of first differences over a local window",
            ))?
            .register_arc(single(
                "gg_lin_reg_extrap",
                metric::gg_lin_reg_extrap,
                12.0,
                "Deviation from linear extrapolation of both neighbour pairs",
            ))?
            .register_arc(gg_1spike.clone())?
            .register_arc(gg_2spike.clone())?
            .register_arc(lr_n2o1.clone())?
            .register_arc(lr_n2o2.clone())?
            .register_arc(lr_n3o1.clone())?
            .register_arc(lr_n3o2.clone())?
            .register_arc(n2o1_n2o2_and.clone())?
            .register_arc(n2o1_n2o2_mix.clone())?
            .register(AndCombinator::new(
                "gg_lr_n2o2_n3o1",
                lr_n2o2.clone(),
                lr_n3o1,
                100.0,
            ))?
            .register(ExtendCombinator::new(
                "gg_1spike_2spike_extend",
                gg_1spike.clone(),
                gg_2spike,
            ))?
            .register(ExtendCombinator::new(
                "gg_1spike_n2o2_extend",
                gg_1spike,
                lr_n2o2.clone(),
            ))?
            .register(ExtendCombinator::new(
                "gg_lr_n2o1_n2o2_extend",
                lr_n2o1.clone(),
                lr_n2o2.clone(),
            ))?
            .register(ExtendCombinator::new(
                "gg_lr_n2o1_n2o2_and_extend",
                n2o1_n2o2_and,
                lr_n2o2,
            ))?
            .register(ExtendCombinator::new(
                "gg_lr_n2o1_n2o2_mix_extend",
                n2o1_n2o2_mix,
                lr_n2o1,
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::IndexSet;

    #[derive(Debug)]
    struct FlagAll;

    impl SpikeAlgorithm for FlagAll {
        fn name(&self) -> &str {
            "flag_all"
        }

        fn default_threshold(&self) -> f64 {
            1.0
        }

        fn metric(&self, y: &[f64]) -> Result<Vec<f64>> {
            Ok(vec![2.0; y.len()])
        }
    }

    #[test]
    fn test_builtin_contains_reference_algorithms() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        assert_eq!(registry.len(), 18);
        for name in ["gg_1spike", "gg_lr_n2o1_n2o2_and", "gg_1spike_2spike_extend"] {
            assert!(registry.contains(name));
            assert_eq!(registry.lookup(name).unwrap().name(), name);
        }
        assert_eq!(registry.lookup("gg_1spike").unwrap().default_threshold(), 12.0);
        assert_eq!(
            registry.lookup("gg_lr_n2o1_n2o2_and").unwrap().default_threshold(),
            100.0
        );
    }

    #[test]
    fn test_lookup_is_exact() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        for name in ["GG_1SPIKE", "gg_1spik", "gg_1spike ", ""] {
            assert!(matches!(
                registry.lookup(name),
                Err(DespikeError::UnknownAlgorithm(n)) if n == name
            ));
        }
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = AlgorithmRegistry::new()
            .register(FlagAll)
            .unwrap()
            .register(FlagAll);
        assert!(matches!(result, Err(DespikeError::InvalidParameter(_))));
    }

    #[test]
    fn test_local_registry_is_isolated() {
        let registry = AlgorithmRegistry::new().register(FlagAll).unwrap();
        assert_eq!(registry.names(), vec!["flag_all"]);
        assert!(registry.lookup("gg_1spike").is_err());

        let idx = registry
            .lookup("flag_all")
            .unwrap()
            .indices(&[1.0, 2.0, 3.0], None)
            .unwrap();
        assert_eq!(idx, (0..3).collect::<IndexSet>());
    }

    #[test]
    fn test_every_builtin_keeps_length_and_neutral_edges() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        let mut y: Vec<f64> = (0..64).map(|i| 100.0 + 20.0 * (i as f64 * 0.2).sin()).collect();
        y[0] += 500.0;
        y[1] -= 300.0;
        y[30] += 80.0;
        y[62] += 400.0;
        y[63] -= 200.0;

        for alg in registry.iter() {
            let m = alg.metric(&y).unwrap();
            assert_eq!(m.len(), y.len(), "{}", alg.name());
            assert_eq!(&m[..2], &[0.0, 0.0], "{}", alg.name());
            assert_eq!(&m[62..], &[0.0, 0.0], "{}", alg.name());
            assert!(m.iter().all(|v| v.is_finite()), "{}", alg.name());

            let idx = alg.indices(&y, None).unwrap();
            assert!(idx.iter().all(|&i| i < y.len()), "{}", alg.name());
        }
    }

    #[test]
    fn test_every_builtin_handles_minimum_length() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        for alg in registry.iter() {
            let m = alg.metric(&[1.0, 5.0, 1.0]).unwrap();
            assert_eq!(m, vec![0.0; 3], "{}", alg.name());
            assert!(alg.metric(&[1.0, 5.0]).is_err(), "{}", alg.name());
        }
    }
}
