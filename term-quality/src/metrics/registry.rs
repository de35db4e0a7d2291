//! The metric registry.

use super::composed::composed_metrics;
use super::spec::MetricSpec;
use super::standard::static_metrics;
use crate::error::{Result, TermError};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

static STANDARD_REGISTRY: Lazy<Arc<MetricRegistry>> = Lazy::new(|| {
    let mut registry = MetricRegistry::new();
    for spec in static_metrics().into_iter().chain(composed_metrics()) {
        registry.register(spec);
    }
    Arc::new(registry)
});

/// Maps metric names to their specifications.
///
/// A registry is populated before it is shared and read-only afterwards;
/// [`MetricRegistry::standard`] is the process-wide instance.
#[derive(Debug, Clone, Default)]
pub struct MetricRegistry {
    specs: HashMap<&'static str, MetricSpec>,
}

impl MetricRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in metrics.
    pub fn standard() -> Arc<Self> {
        Arc::clone(&STANDARD_REGISTRY)
    }

    /// Adds or replaces a metric.
    pub fn register(&mut self, spec: MetricSpec) {
        self.specs.insert(spec.name, spec);
    }

    /// Looks up a metric by name.
    pub fn resolve(&self, name: &str) -> Result<&MetricSpec> {
        self.specs
            .get(name)
            .ok_or_else(|| TermError::UnknownMetric(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.keys().copied()
    }

    /// Expands `names` with their transitive dependencies, dependencies first.
    ///
    /// Requested order is preserved where dependencies allow. Fails with
    /// [`TermError::UnknownMetric`] or [`TermError::MetricCycle`].
    pub fn resolution_order(&self, names: &[&str]) -> Result<Vec<&MetricSpec>> {
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut visiting = HashSet::new();
        for name in names {
            self.visit(name, &mut visiting, &mut done, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        visiting: &mut HashSet<&'static str>,
        done: &mut HashSet<&'static str>,
        order: &mut Vec<&'a MetricSpec>,
    ) -> Result<()> {
        let spec = self.resolve(name)?;
        if done.contains(spec.name) {
            return Ok(());
        }
        if !visiting.insert(spec.name) {
            return Err(TermError::MetricCycle(spec.name.to_string()));
        }
        for dependency in spec.required_metric_names() {
            let dep = self.resolve(dependency)?;
            if dep.level != spec.level {
                return Err(TermError::Configuration(format!(
                    "Metric '{}' ({} level) depends on '{}' ({} level)",
                    spec.name, spec.level, dep.name, dep.level
                )));
            }
            self.visit(dependency, visiting, done, order)?;
        }
        visiting.remove(spec.name);
        done.insert(spec.name);
        order.push(spec);
        Ok(())
    }

    /// Checks that every dependency is registered and the graph is acyclic.
    pub fn validate(&self) -> Result<()> {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        self.resolution_order(&names).map(|_| ())
    }
}
