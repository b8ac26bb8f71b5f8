use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::ServiceSpec;

/// Service dependency edges in both directions.
///
/// `dependents_by_service["malaphor-db"]` lists the services that call the
/// database, which is the direction cascades travel in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    pub dependencies_by_service: BTreeMap<String, BTreeSet<String>>,
    pub dependents_by_service: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Services that list `service` as a direct dependency, sorted by name.
    pub fn dependents_of(&self, service: &str) -> Vec<String> {
        self.dependents_by_service
            .get(service)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

pub fn build_dependency_graph(specs: &[ServiceSpec]) -> DependencyGraph {
    let mut graph = DependencyGraph::empty();
    let known = specs
        .iter()
        .map(|spec| spec.name.clone())
        .collect::<BTreeSet<_>>();

    for spec in specs {
        graph
            .dependencies_by_service
            .entry(spec.name.clone())
            .or_default();
        graph
            .dependents_by_service
            .entry(spec.name.clone())
            .or_default();
    }

    for spec in specs {
        for dependency in &spec.dependencies {
            add_edge_if_valid(&mut graph, &spec.name, dependency, &known);
        }
    }

    graph
}

fn add_edge_if_valid(
    graph: &mut DependencyGraph,
    service: &str,
    dependency: &str,
    known: &BTreeSet<String>,
) {
    if service == dependency {
        return;
    }
    if !known.contains(service) || !known.contains(dependency) {
        return;
    }

    graph
        .dependencies_by_service
        .entry(service.to_string())
        .or_default()
        .insert(dependency.to_string());
    graph
        .dependents_by_service
        .entry(dependency.to_string())
        .or_default()
        .insert(service.to_string());
}

#[cfg(test)]
mod tests {
    use super::{build_dependency_graph, DependencyGraph};
    use crate::catalog::{Catalog, ServiceSpec};

    fn spec(name: &str, dependencies: &[&str]) -> ServiceSpec {
        ServiceSpec {
            name: name.to_string(),
            service_type: "api".to_string(),
            dependencies: dependencies.iter().map(|d| (*d).to_string()).collect(),
        }
    }

    #[test]
    fn reverse_edges_list_direct_dependents() {
        let graph = build_dependency_graph(&[
            spec("db", &[]),
            spec("api", &["db"]),
            spec("web", &["api"]),
            spec("worker", &["db"]),
        ]);

        assert_eq!(graph.dependents_of("db"), vec!["api", "worker"]);
        assert_eq!(graph.dependents_of("api"), vec!["web"]);
        assert!(graph.dependents_of("web").is_empty());
        assert!(graph.dependencies_by_service["web"].contains("api"));
    }

    #[test]
    fn ignores_self_edges_and_unknown_services() {
        let graph = build_dependency_graph(&[spec("api", &["api", "ghost"]), spec("db", &[])]);
        assert!(graph.dependencies_by_service["api"].is_empty());
        assert!(graph.dependents_of("ghost").is_empty());
        assert!(!graph.dependents_by_service.contains_key("ghost"));
    }

    #[test]
    fn unknown_service_has_no_edges() {
        let graph = DependencyGraph::empty();
        assert!(graph.dependents_of("anything").is_empty());
    }

    #[test]
    fn default_catalog_api_dependents() {
        let graph = build_dependency_graph(&Catalog::default().services);
        assert_eq!(
            graph.dependents_of("malaphor-api"),
            vec!["malaphor-gateway", "malaphor-notifier", "malaphor-web"]
        );
    }
}
