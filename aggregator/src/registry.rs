//! Aggregation registry
//!
//! Built once at process start and passed explicitly into the scheduler.
//! Registration order is kept so "run everything" has a stable order.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::aggregations::Aggregation;
use crate::error::AggregatorError;

#[derive(Default)]
pub struct AggregationRegistry {
    aggregations: Vec<Box<dyn Aggregation>>,
    by_name: HashMap<String, usize>,
}

impl AggregationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an aggregation kind
    ///
    /// Rejects duplicate names and inserts that would overwrite on conflict.
    pub fn register<A: Aggregation + 'static>(
        &mut self,
        aggregation: A,
    ) -> Result<(), AggregatorError> {
        let name = aggregation.name().to_string();

        if self.by_name.contains_key(&name) {
            return Err(AggregatorError::Configuration(format!(
                "Aggregation {} is registered twice",
                name
            )));
        }

        if !is_conflict_tolerant(aggregation.insert_sql()) {
            return Err(AggregatorError::Configuration(format!(
                "Insert for {} must end with ON CONFLICT DO NOTHING",
                name
            )));
        }

        debug!("Registered aggregation {}", name);
        self.by_name.insert(name, self.aggregations.len());
        self.aggregations.push(Box::new(aggregation));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Aggregation> {
        self.by_name
            .get(name)
            .map(|&idx| self.aggregations[idx].as_ref())
    }

    pub fn len(&self) -> usize {
        self.aggregations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregations.is_empty()
    }

    /// Aggregations in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Aggregation> {
        self.aggregations.iter().map(|a| a.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.iter().map(|a| a.name().to_string()).collect()
    }

    /// Dependencies-first execution order for `name`, each aggregation once
    ///
    /// Depth-first post-order over declared dependencies. A name reached
    /// again while still on the stack is a cycle.
    pub fn execution_plan(&self, name: &str) -> Result<Vec<&dyn Aggregation>, AggregatorError> {
        let mut plan = Vec::new();
        let mut done = HashSet::new();
        let mut visiting = Vec::new();
        self.visit(name, &mut visiting, &mut done, &mut plan)?;
        Ok(plan)
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        visiting: &mut Vec<String>,
        done: &mut HashSet<String>,
        plan: &mut Vec<&'a dyn Aggregation>,
    ) -> Result<(), AggregatorError> {
        if done.contains(name) {
            return Ok(());
        }

        if let Some(start) = visiting.iter().position(|n| n == name) {
            let mut path = visiting[start..].to_vec();
            path.push(name.to_string());
            return Err(AggregatorError::DependencyCycle { path });
        }

        let aggregation = self
            .get(name)
            .ok_or_else(|| AggregatorError::UnknownAggregation(name.to_string()))?;

        visiting.push(name.to_string());
        for dependency in aggregation.dependencies() {
            self.visit(dependency, visiting, done, plan)?;
        }
        visiting.pop();

        done.insert(name.to_string());
        plan.push(aggregation);
        Ok(())
    }

    /// Resolve every registered aggregation, failing on the first bad graph
    pub fn validate(&self) -> Result<(), AggregatorError> {
        for aggregation in self.iter() {
            self.execution_plan(aggregation.name())?;
        }
        Ok(())
    }
}

fn is_conflict_tolerant(insert_sql: &str) -> bool {
    let normalized = insert_sql
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    normalized.ends_with("ON CONFLICT DO NOTHING")
        || normalized.ends_with("ON CONFLICT DO NOTHING;")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        name: &'static str,
        dependencies: &'static [&'static str],
        insert: &'static str,
    }

    impl Stub {
        fn new(name: &'static str, dependencies: &'static [&'static str]) -> Self {
            Self {
                name,
                dependencies,
                insert: "INSERT INTO t VALUES ($1) ON CONFLICT DO NOTHING",
            }
        }
    }

    impl Aggregation for Stub {
        fn name(&self) -> &str {
            self.name
        }

        fn dependencies(&self) -> &[&'static str] {
            self.dependencies
        }

        fn create_table_sql(&self) -> &str {
            "CREATE TABLE IF NOT EXISTS t (v BIGINT PRIMARY KEY)"
        }

        fn select_sql(&self) -> &str {
            "SELECT 1 WHERE $1::bigint < $2::bigint"
        }

        fn insert_sql(&self) -> &str {
            self.insert
        }
    }

    fn plan_names(registry: &AggregationRegistry, name: &str) -> Vec<String> {
        registry
            .execution_plan(name)
            .unwrap()
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = AggregationRegistry::new();
        registry.register(Stub::new("a", &[])).unwrap();

        let result = registry.register(Stub::new("a", &[]));
        assert!(matches!(result, Err(AggregatorError::Configuration(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_overwriting_insert_rejected() {
        let mut registry = AggregationRegistry::new();
        let stub = Stub {
            insert: "INSERT INTO t VALUES ($1) ON CONFLICT (v) DO UPDATE SET v = EXCLUDED.v",
            ..Stub::new("a", &[])
        };

        assert!(matches!(
            registry.register(stub),
            Err(AggregatorError::Configuration(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_plan_puts_dependencies_first() {
        let mut registry = AggregationRegistry::new();
        registry.register(Stub::new("counts", &["unique"])).unwrap();
        registry.register(Stub::new("unique", &["deployed"])).unwrap();
        registry.register(Stub::new("deployed", &[])).unwrap();

        assert_eq!(plan_names(&registry, "counts"), ["deployed", "unique", "counts"]);
    }

    #[test]
    fn test_diamond_resolved_once() {
        let mut registry = AggregationRegistry::new();
        registry.register(Stub::new("base", &[])).unwrap();
        registry.register(Stub::new("left", &["base"])).unwrap();
        registry.register(Stub::new("right", &["base"])).unwrap();
        registry.register(Stub::new("top", &["left", "right"])).unwrap();

        assert_eq!(plan_names(&registry, "top"), ["base", "left", "right", "top"]);
    }

    #[test]
    fn test_cycle_reported_with_path() {
        let mut registry = AggregationRegistry::new();
        registry.register(Stub::new("a", &["b"])).unwrap();
        registry.register(Stub::new("b", &["c"])).unwrap();
        registry.register(Stub::new("c", &["b"])).unwrap();

        match registry.execution_plan("a") {
            Err(AggregatorError::DependencyCycle { path }) => {
                assert_eq!(path, ["b", "c", "b"]);
            }
            other => panic!("Expected DependencyCycle, got {:?}", other.map(|p| p.len())),
        }
        assert!(registry.validate().is_err());
    }

    #[test]
    fn test_unknown_dependency() {
        let mut registry = AggregationRegistry::new();
        registry.register(Stub::new("a", &["missing"])).unwrap();

        assert!(matches!(
            registry.execution_plan("a"),
            Err(AggregatorError::UnknownAggregation(name)) if name == "missing"
        ));
    }
}
