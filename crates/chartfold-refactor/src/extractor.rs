//! Cross-service pattern extraction
//!
//! The extractor receives the complete set of resources of one kind and
//! computes the union feature set: which optional blocks occur anywhere,
//! in which shape variants, and which container names exist. A block used
//! by a single service out of fifty is still observed - deriving the
//! template from one sample service is exactly the failure this stage
//! exists to prevent.
//!
//! Extraction never fails: malformed or missing sub-structure degrades to
//! "feature absent".

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

use chartfold_core::resource::is_empty_value;
use chartfold_core::{Lookup, Resource, ResourceKind};

use crate::catalog::{self, BlockForm, BlockScope, BlockSpec};

/// Observed usage of one block across the service set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockUsage {
    pub scope: BlockScope,
    pub form: BlockForm,
    /// Templated as an iteration over the values collection
    pub repeats: bool,
    /// Observed shape variants (probe handlers, port item fields)
    pub variants: BTreeSet<String>,
    /// Services in which the block occurs
    pub services: BTreeSet<String>,
    /// Discovered outside the catalog
    pub dynamic: bool,
}

impl BlockUsage {
    fn for_spec(spec: &BlockSpec) -> Self {
        Self {
            scope: spec.scope,
            form: spec.form,
            repeats: spec.repeats,
            variants: BTreeSet::new(),
            services: BTreeSet::new(),
            dynamic: false,
        }
    }

    fn dynamic(scope: BlockScope) -> Self {
        Self {
            scope,
            // Shape is unknown, so the generator must use pass-through
            form: BlockForm::Block,
            repeats: false,
            variants: BTreeSet::new(),
            services: BTreeSet::new(),
            dynamic: true,
        }
    }
}

/// The union feature set for one resource kind
#[derive(Debug, Clone)]
pub struct FeatureDescriptor {
    pub kind: ResourceKind,
    /// Observed blocks: catalog entries first (catalog order), then
    /// dynamic discoveries (sorted) - the template emission order.
    pub blocks: IndexMap<String, BlockUsage>,
    /// Container names observed across all services
    pub container_keys: BTreeSet<String>,
    /// Number of resources inspected
    pub resource_count: usize,
}

impl FeatureDescriptor {
    fn empty(kind: ResourceKind) -> Self {
        Self {
            kind,
            blocks: IndexMap::new(),
            container_keys: BTreeSet::new(),
            resource_count: 0,
        }
    }

    pub fn observed(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    /// Blocks at one scope, in emission order
    pub fn blocks_at(&self, scope: BlockScope) -> impl Iterator<Item = (&str, &BlockUsage)> {
        self.blocks
            .iter()
            .filter(move |(_, usage)| usage.scope == scope)
            .map(|(id, usage)| (id.as_str(), usage))
    }
}

/// Compute the union feature set for `kind` across the full service set
///
/// All resources must share `kind`; others are skipped. An empty input
/// yields an empty-but-valid descriptor.
pub fn extract(resources: &[&Resource], kind: ResourceKind) -> FeatureDescriptor {
    let mut descriptor = FeatureDescriptor::empty(kind);
    let resources: Vec<&Resource> = resources
        .iter()
        .copied()
        .filter(|r| r.kind() == kind)
        .collect();
    descriptor.resource_count = resources.len();

    if resources.is_empty() {
        return descriptor;
    }

    // Catalog pass: fixed candidates, fixed order
    for spec in catalog::blocks_for(kind) {
        let mut usage = BlockUsage::for_spec(spec);

        for resource in &resources {
            for value in occurrences(resource, spec.scope, spec.key) {
                if is_empty_value(value) {
                    continue;
                }
                usage.services.insert(resource.service_name().to_string());
                record_variants(&mut usage, spec, value);
            }
        }

        if !usage.services.is_empty() {
            descriptor.blocks.insert(spec.id.to_string(), usage);
        }
    }

    // Dynamic pass: fields outside the catalog still become observed
    // blocks, keeping the descriptor a strict superset of every resource.
    let mut dynamic: BTreeMap<(BlockScope, String), BlockUsage> = BTreeMap::new();

    for resource in &resources {
        match kind {
            ResourceKind::Deployment => sweep_deployment(resource, &mut dynamic),
            ResourceKind::Service => sweep_service(resource, &mut dynamic),
            ResourceKind::ServiceAccount => sweep_service_account(resource, &mut dynamic),
            ResourceKind::Other => {}
        }
    }

    for ((scope, id), usage) in dynamic {
        if let Some(existing) = descriptor.blocks.get_mut(&id) {
            // Same key surfaced at two scopes; keep the first, remember who
            // uses it, and let the transformer report any real conflict.
            tracing::warn!(
                block = %id,
                kept = existing.scope.label(),
                also = scope.label(),
                "block id observed at two scopes"
            );
            existing.services.extend(usage.services);
        } else {
            descriptor.blocks.insert(id, usage);
        }
    }

    // Container names, across every service
    if kind == ResourceKind::Deployment {
        for resource in &resources {
            for container in containers_of(resource) {
                if let Some(name) = container.get("name").and_then(|n| n.as_str()) {
                    descriptor.container_keys.insert(name.to_string());
                }
            }
        }
    }

    tracing::debug!(
        kind = %kind,
        blocks = descriptor.blocks.len(),
        containers = descriptor.container_keys.len(),
        "extracted feature descriptor"
    );

    descriptor
}

/// All values a (scope, key) pair takes within one resource
///
/// Non-container scopes go through the typed field accessor, so a tree
/// with an unexpected shape at any step reads as absent instead of
/// panicking mid-extraction.
fn occurrences<'a>(
    resource: &'a Resource,
    scope: BlockScope,
    key: &str,
) -> Vec<&'a JsonValue> {
    match scope {
        BlockScope::Container => containers_of(resource)
            .filter_map(|container| container.get(key))
            .collect(),
        _ => {
            let path = format!("{}{}", scope_prefix(scope), key);
            match resource.lookup(&path) {
                Ok(Lookup::Present(value)) => vec![value],
                _ => Vec::new(),
            }
        }
    }
}

/// Field path prefix for a scope
fn scope_prefix(scope: BlockScope) -> &'static str {
    match scope {
        BlockScope::Resource => "",
        BlockScope::Metadata => "metadata.",
        BlockScope::Spec => "spec.",
        BlockScope::PodMetadata => "spec.template.metadata.",
        BlockScope::PodSpec => "spec.template.spec.",
        BlockScope::Container => "",
    }
}

/// The mapping a scope addresses into, when the resource has that shape
fn scope_map(resource: &Resource, scope: BlockScope) -> Option<&serde_json::Map<String, JsonValue>> {
    let body = resource.body();
    let value = match scope {
        BlockScope::Resource => Some(body),
        BlockScope::Metadata => body.get("metadata"),
        BlockScope::Spec => body.get("spec"),
        BlockScope::PodMetadata => body
            .get("spec")
            .and_then(|s| s.get("template"))
            .and_then(|t| t.get("metadata")),
        BlockScope::PodSpec => body
            .get("spec")
            .and_then(|s| s.get("template"))
            .and_then(|t| t.get("spec")),
        BlockScope::Container => None,
    };
    value.and_then(|v| v.as_object())
}

/// Container entries of a Deployment that are mappings
fn containers_of(resource: &Resource) -> impl Iterator<Item = &serde_json::Map<String, JsonValue>> {
    scope_map(resource, BlockScope::PodSpec)
        .and_then(|pod| pod.get("containers"))
        .and_then(|c| c.as_array())
        .into_iter()
        .flatten()
        .filter_map(|item| item.as_object())
}

/// Record shape variants for an observed block value
///
/// Probes record whichever mutually-exclusive handler key is present.
/// Repeating collections record the union of per-item optional fields.
/// Incompatible variants across services are all retained - the template
/// passes structure through, so conflicts never need resolution here.
fn record_variants(usage: &mut BlockUsage, spec: &BlockSpec, value: &JsonValue) {
    if spec.repeats {
        if let Some(items) = value.as_array() {
            for item in items.iter().filter_map(|i| i.as_object()) {
                for key in item.keys() {
                    if !spec.item_mandatory.contains(&key.as_str()) {
                        usage.variants.insert(key.clone());
                    }
                }
            }
        }
    } else if !spec.variants.is_empty() {
        if let Some(map) = value.as_object() {
            for candidate in spec.variants {
                if map.contains_key(*candidate) {
                    usage.variants.insert((*candidate).to_string());
                }
            }
        }
    }
}

// =============================================================================
// Dynamic sweeps
// =============================================================================

fn note_dynamic(
    dynamic: &mut BTreeMap<(BlockScope, String), BlockUsage>,
    scope: BlockScope,
    key: &str,
    value: &JsonValue,
    service: &str,
) {
    if is_empty_value(value) {
        return;
    }
    dynamic
        .entry((scope, key.to_string()))
        .or_insert_with(|| BlockUsage::dynamic(scope))
        .services
        .insert(service.to_string());
}

fn sweep_scope(
    resource: &Resource,
    scope: BlockScope,
    skeleton: &phf::Set<&'static str>,
    kind: ResourceKind,
    dynamic: &mut BTreeMap<(BlockScope, String), BlockUsage>,
) {
    let Some(map) = scope_map(resource, scope) else {
        return;
    };
    let known = catalog::catalog_keys(kind, scope);

    for (key, value) in map {
        if skeleton.contains(key.as_str()) || known.contains(&key.as_str()) {
            continue;
        }
        note_dynamic(dynamic, scope, key, value, resource.service_name());
    }
}

fn sweep_deployment(
    resource: &Resource,
    dynamic: &mut BTreeMap<(BlockScope, String), BlockUsage>,
) {
    let kind = ResourceKind::Deployment;
    sweep_scope(resource, BlockScope::Resource, &catalog::ROOT_SKELETON_KEYS, kind, dynamic);
    sweep_scope(resource, BlockScope::Metadata, &catalog::METADATA_SKELETON_KEYS, kind, dynamic);
    sweep_scope(resource, BlockScope::Spec, &catalog::DEPLOYMENT_SPEC_SKELETON_KEYS, kind, dynamic);
    sweep_scope(resource, BlockScope::PodMetadata, &catalog::POD_METADATA_SKELETON_KEYS, kind, dynamic);
    sweep_scope(resource, BlockScope::PodSpec, &catalog::POD_SPEC_SKELETON_KEYS, kind, dynamic);

    let known_container = catalog::catalog_keys(kind, BlockScope::Container);
    for container in containers_of(resource) {
        for (key, value) in container {
            if catalog::MANDATORY_CONTAINER_FIELDS.contains(key.as_str())
                || known_container.contains(&key.as_str())
            {
                continue;
            }
            note_dynamic(
                dynamic,
                BlockScope::Container,
                key,
                value,
                resource.service_name(),
            );
        }
    }
}

fn sweep_service(resource: &Resource, dynamic: &mut BTreeMap<(BlockScope, String), BlockUsage>) {
    let kind = ResourceKind::Service;
    sweep_scope(resource, BlockScope::Resource, &catalog::ROOT_SKELETON_KEYS, kind, dynamic);
    sweep_scope(resource, BlockScope::Metadata, &catalog::METADATA_SKELETON_KEYS, kind, dynamic);
    sweep_scope(resource, BlockScope::Spec, &catalog::SERVICE_SPEC_SKELETON_KEYS, kind, dynamic);
}

fn sweep_service_account(
    resource: &Resource,
    dynamic: &mut BTreeMap<(BlockScope, String), BlockUsage>,
) {
    let kind = ResourceKind::ServiceAccount;
    // ServiceAccounts have no spec; extras sit at the document root
    let root_skeleton: &phf::Set<&'static str> = &catalog::ROOT_SKELETON_KEYS;
    sweep_scope(resource, BlockScope::Resource, root_skeleton, kind, dynamic);
    sweep_scope(resource, BlockScope::Metadata, &catalog::METADATA_SKELETON_KEYS, kind, dynamic);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment(service: &str, body: JsonValue) -> Resource {
        let source = serde_yaml::to_string(&body).unwrap();
        Resource::from_document(service, body, source)
    }

    fn probe_deployment(service: &str, container: JsonValue) -> Resource {
        deployment(
            service,
            json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": {"name": service, "labels": {"app": service}},
                "spec": {
                    "selector": {"matchLabels": {"app": service}},
                    "template": {
                        "metadata": {"labels": {"app": service}},
                        "spec": {"containers": [container]}
                    }
                }
            }),
        )
    }

    #[test]
    fn test_empty_input_yields_valid_descriptor() {
        let descriptor = extract(&[], ResourceKind::Deployment);
        assert_eq!(descriptor.resource_count, 0);
        assert!(descriptor.blocks.is_empty());
        assert!(descriptor.container_keys.is_empty());
    }

    #[test]
    fn test_superset_over_probe_variants() {
        // One service exposes a grpc liveness probe, the other httpGet
        // liveness plus tcpSocket readiness - everything must be observed.
        let a = probe_deployment(
            "adservice",
            json!({
                "name": "server",
                "image": "adservice:v1",
                "livenessProbe": {"grpc": {"port": 9555}}
            }),
        );
        let b = probe_deployment(
            "cartservice",
            json!({
                "name": "server",
                "image": "cartservice:v1",
                "livenessProbe": {"httpGet": {"path": "/health", "port": 8080}},
                "readinessProbe": {"tcpSocket": {"port": 6379}}
            }),
        );

        let descriptor = extract(&[&a, &b], ResourceKind::Deployment);

        let liveness = &descriptor.blocks["livenessProbe"];
        let observed: Vec<_> = liveness.variants.iter().map(String::as_str).collect();
        assert_eq!(observed, vec!["grpc", "httpGet"]);
        assert_eq!(liveness.services.len(), 2);

        let readiness = &descriptor.blocks["readinessProbe"];
        assert_eq!(
            readiness.variants.iter().collect::<Vec<_>>(),
            vec!["tcpSocket"]
        );
        // Observed even though only one of two services uses it
        assert_eq!(readiness.services.len(), 1);
    }

    #[test]
    fn test_single_service_block_is_never_omitted() {
        let mut resources = Vec::new();
        for i in 0..5 {
            resources.push(probe_deployment(
                &format!("svc{}", i),
                json!({"name": "server", "image": "x:v1"}),
            ));
        }
        resources.push(probe_deployment(
            "special",
            json!({"name": "server", "image": "x:v1", "resources": {"limits": {"cpu": "100m"}}}),
        ));

        let refs: Vec<&Resource> = resources.iter().collect();
        let descriptor = extract(&refs, ResourceKind::Deployment);

        assert!(descriptor.observed("resources"));
        assert_eq!(descriptor.blocks["resources"].services.len(), 1);
    }

    #[test]
    fn test_empty_collections_do_not_register() {
        let resource = deployment(
            "web",
            json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": {"name": "web"},
                "spec": {
                    "template": {
                        "spec": {
                            "containers": [{"name": "server", "image": "x:v1", "env": []}],
                            "volumes": []
                        }
                    }
                }
            }),
        );

        let descriptor = extract(&[&resource], ResourceKind::Deployment);
        assert!(!descriptor.observed("env"));
        assert!(!descriptor.observed("volumes"));
    }

    #[test]
    fn test_unknown_fields_become_dynamic_blocks() {
        let resource = probe_deployment(
            "web",
            json!({
                "name": "server",
                "image": "x:v1",
                "terminationMessagePath": "/dev/termination-log"
            }),
        );

        let descriptor = extract(&[&resource], ResourceKind::Deployment);
        let usage = &descriptor.blocks["terminationMessagePath"];
        assert!(usage.dynamic);
        assert_eq!(usage.scope, BlockScope::Container);
        assert_eq!(usage.form, BlockForm::Block);
    }

    #[test]
    fn test_container_keys_union() {
        let a = probe_deployment("a", json!({"name": "server", "image": "x"}));
        let b = deployment(
            "b",
            json!({
                "kind": "Deployment",
                "metadata": {"name": "b"},
                "spec": {"template": {"spec": {"containers": [
                    {"name": "server", "image": "y"},
                    {"name": "sidecar", "image": "z"}
                ]}}}
            }),
        );

        let descriptor = extract(&[&a, &b], ResourceKind::Deployment);
        assert_eq!(
            descriptor.container_keys.iter().collect::<Vec<_>>(),
            vec!["server", "sidecar"]
        );
    }

    #[test]
    fn test_service_port_item_fields_are_recorded() {
        let body = json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "web", "labels": {"app": "web"}},
            "spec": {
                "selector": {"app": "web"},
                "type": "NodePort",
                "ports": [
                    {"port": 80, "targetPort": 8080, "name": "http"},
                    {"port": 443, "nodePort": 30443}
                ]
            }
        });
        let resource = Resource::from_document("web", body.clone(), String::new());

        let descriptor = extract(&[&resource], ResourceKind::Service);

        let ports = &descriptor.blocks["ports"];
        assert!(ports.repeats);
        assert_eq!(
            ports.variants.iter().collect::<Vec<_>>(),
            vec!["name", "nodePort", "targetPort"]
        );
        assert!(descriptor.observed("type"));
    }

    #[test]
    fn test_extraction_is_order_independent() {
        let a = probe_deployment(
            "a",
            json!({"name": "server", "image": "x", "livenessProbe": {"grpc": {"port": 1}}}),
        );
        let b = probe_deployment(
            "b",
            json!({"name": "server", "image": "y", "resources": {"limits": {"cpu": "1"}}}),
        );

        let forward = extract(&[&a, &b], ResourceKind::Deployment);
        let reversed = extract(&[&b, &a], ResourceKind::Deployment);

        let forward_ids: Vec<_> = forward.blocks.keys().collect();
        let reversed_ids: Vec<_> = reversed.blocks.keys().collect();
        assert_eq!(forward_ids, reversed_ids);
        assert_eq!(forward.blocks, reversed.blocks);
    }

    #[test]
    fn test_mismatched_kind_resources_are_skipped() {
        let service = Resource::from_document(
            "web",
            json!({"kind": "Service", "metadata": {"name": "web"}}),
            String::new(),
        );
        let descriptor = extract(&[&service], ResourceKind::Deployment);
        assert_eq!(descriptor.resource_count, 0);
    }
}
