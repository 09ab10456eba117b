//! Values restructuring
//!
//! Relocates each service's concrete settings into the canonical shape the
//! shared templates read: container fields grouped under a keyed
//! `containers` mapping, pod- and spec-level blocks lifted to the top
//! level, Service and ServiceAccount extras alongside them. Every leaf
//! value is copied unchanged - only its structural position moves.
//!
//! The only fields not relocated are the skeleton-owned ones (apiVersion,
//! kind, metadata name/labels, selectors, pod template labels), which the
//! template reconstructs from the service name and chart helpers.

use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

use chartfold_core::Values;

use crate::catalog;
use crate::error::TransformError;
use crate::parser::ServiceResources;

/// Restructure one service's resources into its values tree
///
/// Fails on type-incompatible positions (a scalar where the canonical
/// shape needs a mapping, two fields relocating to the same key with
/// different content). Failures are per-service; the caller keeps
/// processing other services.
pub fn transform(service: &ServiceResources) -> Result<Values, TransformError> {
    let mut relocator = Relocator::new(service.service_name.clone());

    if let Some(deployment) = &service.deployment {
        relocate_deployment(&mut relocator, deployment.body())?;
    }
    if let Some(svc) = &service.service {
        relocate_service(&mut relocator, svc.body())?;
    }
    if let Some(account) = &service.service_account {
        relocate_service_account(&mut relocator, account.body())?;
    }

    tracing::debug!(
        service = %service.service_name,
        keys = relocator.out.len(),
        "transformed values"
    );

    Ok(Values(JsonValue::Object(relocator.out)))
}

/// Collects relocated values and remembers where each one came from
struct Relocator {
    service: String,
    out: Map<String, JsonValue>,
    origins: HashMap<String, String>,
}

impl Relocator {
    fn new(service: String) -> Self {
        Self {
            service,
            out: Map::new(),
            origins: HashMap::new(),
        }
    }

    /// Insert a top-level values key
    ///
    /// Re-inserting identical content is fine (e.g. the same namespace on
    /// both the Deployment and the Service); different content at the same
    /// key is a structural conflict.
    fn insert(
        &mut self,
        target: &str,
        value: JsonValue,
        source: &str,
    ) -> Result<(), TransformError> {
        match self.out.get(target) {
            Some(existing) if *existing == value => Ok(()),
            Some(_) => Err(TransformError::RelocationConflict {
                service: self.service.clone(),
                existing: self
                    .origins
                    .get(target)
                    .cloned()
                    .unwrap_or_else(|| "<unknown>".to_string()),
                incoming: source.to_string(),
                target: target.to_string(),
            }),
            None => {
                self.out.insert(target.to_string(), value);
                self.origins.insert(target.to_string(), source.to_string());
                Ok(())
            }
        }
    }

    fn mismatch(
        &self,
        path: &str,
        expected: &str,
        found: &JsonValue,
    ) -> TransformError {
        TransformError::ShapeMismatch {
            service: self.service.clone(),
            path: path.to_string(),
            expected: expected.to_string(),
            found: type_name(found).to_string(),
        }
    }

    fn absent(&self, path: &str, expected: &str) -> TransformError {
        TransformError::ShapeMismatch {
            service: self.service.clone(),
            path: path.to_string(),
            expected: expected.to_string(),
            found: "absent".to_string(),
        }
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "sequence",
        JsonValue::Object(_) => "mapping",
    }
}

fn as_object<'a>(
    relocator: &Relocator,
    path: &str,
    value: &'a JsonValue,
) -> Result<&'a Map<String, JsonValue>, TransformError> {
    value
        .as_object()
        .ok_or_else(|| relocator.mismatch(path, "mapping", value))
}

// =============================================================================
// Deployment
// =============================================================================

fn relocate_deployment(
    relocator: &mut Relocator,
    body: &JsonValue,
) -> Result<(), TransformError> {
    let root = as_object(relocator, "", body)?;

    relocate_metadata(relocator, root, "annotations")?;
    relocate_root_extras(relocator, root)?;

    let Some(spec_value) = root.get("spec") else {
        return Ok(());
    };
    let spec = as_object(relocator, "spec", spec_value)?;

    for (key, value) in spec {
        if catalog::DEPLOYMENT_SPEC_SKELETON_KEYS.contains(key.as_str()) {
            continue;
        }
        relocator.insert(key, value.clone(), &format!("spec.{}", key))?;
    }

    let Some(template_value) = spec.get("template") else {
        return Ok(());
    };
    let template = as_object(relocator, "spec.template", template_value)?;

    if let Some(meta_value) = template.get("metadata") {
        let meta = as_object(relocator, "spec.template.metadata", meta_value)?;
        for (key, value) in meta {
            let source = format!("spec.template.metadata.{}", key);
            match key.as_str() {
                "labels" => {}
                "annotations" => relocator.insert("podAnnotations", value.clone(), &source)?,
                _ => relocator.insert(key, value.clone(), &source)?,
            }
        }
    }

    let Some(pod_value) = template.get("spec") else {
        return Ok(());
    };
    let pod = as_object(relocator, "spec.template.spec", pod_value)?;

    for (key, value) in pod {
        let source = format!("spec.template.spec.{}", key);
        match key.as_str() {
            "containers" => relocate_containers(relocator, value, &source)?,
            "securityContext" => {
                relocator.insert("podSecurityContext", value.clone(), &source)?
            }
            // The template re-derives the account name from the fullname
            // convention; the values carry only a flag.
            "serviceAccountName" => {
                relocator.insert("serviceAccountName", JsonValue::Bool(true), &source)?
            }
            _ => relocator.insert(key, value.clone(), &source)?,
        }
    }

    Ok(())
}

fn relocate_containers(
    relocator: &mut Relocator,
    value: &JsonValue,
    source: &str,
) -> Result<(), TransformError> {
    let items = value
        .as_array()
        .ok_or_else(|| relocator.mismatch(source, "sequence", value))?;

    let mut containers = Map::new();

    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", source, i);
        let container = as_object(relocator, &item_path, item)?;

        let name = match container.get("name") {
            Some(JsonValue::String(name)) => name.clone(),
            Some(other) => return Err(relocator.mismatch(&format!("{}.name", item_path), "string", other)),
            None => return Err(relocator.absent(&format!("{}.name", item_path), "string")),
        };

        if container.get("image").is_none() {
            return Err(relocator.absent(&format!("{}.image", item_path), "string"));
        }

        if containers.contains_key(&name) {
            return Err(TransformError::RelocationConflict {
                service: relocator.service.clone(),
                existing: format!("{}.name", source),
                incoming: format!("{}.name", item_path),
                target: format!("containers.{}", name),
            });
        }

        let mut fields = Map::new();
        for (key, field_value) in container {
            if key == "name" {
                continue;
            }
            fields.insert(key.clone(), field_value.clone());
        }
        containers.insert(name, JsonValue::Object(fields));
    }

    relocator.insert("containers", JsonValue::Object(containers), source)
}

// =============================================================================
// Service
// =============================================================================

fn relocate_service(relocator: &mut Relocator, body: &JsonValue) -> Result<(), TransformError> {
    let root = as_object(relocator, "", body)?;

    relocate_metadata(relocator, root, "serviceAnnotations")?;
    relocate_root_extras(relocator, root)?;

    let Some(spec_value) = root.get("spec") else {
        return Ok(());
    };
    let spec = as_object(relocator, "spec", spec_value)?;

    for (key, value) in spec {
        if catalog::SERVICE_SPEC_SKELETON_KEYS.contains(key.as_str()) {
            continue;
        }
        relocator.insert(key, value.clone(), &format!("spec.{}", key))?;
    }

    Ok(())
}

// =============================================================================
// ServiceAccount
// =============================================================================

fn relocate_service_account(
    relocator: &mut Relocator,
    body: &JsonValue,
) -> Result<(), TransformError> {
    let root = as_object(relocator, "", body)?;
    let mut account = Map::new();

    if let Some(meta_value) = root.get("metadata") {
        let meta = as_object(relocator, "metadata", meta_value)?;
        for (key, value) in meta {
            if catalog::METADATA_SKELETON_KEYS.contains(key.as_str()) {
                continue;
            }
            account.insert(key.clone(), value.clone());
        }
    }

    for (key, value) in root {
        if catalog::ROOT_SKELETON_KEYS.contains(key.as_str()) {
            continue;
        }
        account.insert(key.clone(), value.clone());
    }

    if !account.is_empty() {
        relocator.insert("serviceAccount", JsonValue::Object(account), "metadata")?;
    }
    relocator.insert("serviceAccountName", JsonValue::Bool(true), "kind")?;

    Ok(())
}

// =============================================================================
// Shared pieces
// =============================================================================

/// Relocate non-skeleton metadata keys; annotations go to `annotations_id`
fn relocate_metadata(
    relocator: &mut Relocator,
    root: &Map<String, JsonValue>,
    annotations_id: &str,
) -> Result<(), TransformError> {
    let Some(meta_value) = root.get("metadata") else {
        return Ok(());
    };
    let meta = as_object(relocator, "metadata", meta_value)?;

    for (key, value) in meta {
        if catalog::METADATA_SKELETON_KEYS.contains(key.as_str()) {
            continue;
        }
        let source = format!("metadata.{}", key);
        let target = if key == "annotations" { annotations_id } else { key.as_str() };
        relocator.insert(target, value.clone(), &source)?;
    }

    Ok(())
}

/// Relocate document-root keys outside the skeleton
fn relocate_root_extras(
    relocator: &mut Relocator,
    root: &Map<String, JsonValue>,
) -> Result<(), TransformError> {
    for (key, value) in root {
        if catalog::ROOT_SKELETON_KEYS.contains(key.as_str()) {
            continue;
        }
        relocator.insert(key, value.clone(), key)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartfold_core::Resource;
    use serde_json::json;

    fn service_with(
        name: &str,
        deployment: Option<JsonValue>,
        svc: Option<JsonValue>,
        account: Option<JsonValue>,
    ) -> ServiceResources {
        let to_resource =
            |body: JsonValue| Resource::from_document(name, body, String::new());
        ServiceResources {
            service_name: name.to_string(),
            deployment: deployment.map(to_resource),
            service: svc.map(to_resource),
            service_account: account.map(to_resource),
            others: Vec::new(),
        }
    }

    fn full_deployment() -> JsonValue {
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "cartservice", "labels": {"app": "cartservice"}},
            "spec": {
                "replicas": 2,
                "selector": {"matchLabels": {"app": "cartservice"}},
                "template": {
                    "metadata": {"labels": {"app": "cartservice"}},
                    "spec": {
                        "serviceAccountName": "cartservice",
                        "terminationGracePeriodSeconds": 5,
                        "containers": [
                            {
                                "name": "server",
                                "image": "cartservice:v1",
                                "ports": [{"containerPort": 7070}],
                                "env": [{"name": "REDIS_ADDR", "value": "redis:6379"}],
                                "resources": {"limits": {"cpu": "300m"}},
                                "readinessProbe": {"tcpSocket": {"port": 7070}}
                            },
                            {
                                "name": "redis",
                                "image": "redis:alpine"
                            }
                        ],
                        "volumes": [{"name": "data", "emptyDir": {}}]
                    }
                }
            }
        })
    }

    #[test]
    fn test_containers_group_under_keyed_mapping() {
        // Two containers, resources on one only - the other must not
        // inherit anything.
        let service = service_with("cartservice", Some(full_deployment()), None, None);
        let values = transform(&service).unwrap();

        assert_eq!(values.get("containers.server.image").unwrap(), "cartservice:v1");
        assert_eq!(values.get("containers.redis.image").unwrap(), "redis:alpine");
        assert_eq!(
            values.get("containers.server.resources.limits.cpu").unwrap(),
            "300m"
        );
        assert!(values.get("containers.redis.resources").is_none());
        assert_eq!(
            values
                .get("containers.server.readinessProbe.tcpSocket.port")
                .unwrap(),
            7070
        );
    }

    #[test]
    fn test_pod_level_blocks_lift_to_top_level() {
        let service = service_with("cartservice", Some(full_deployment()), None, None);
        let values = transform(&service).unwrap();

        assert_eq!(values.get("replicas").unwrap(), 2);
        assert_eq!(values.get("terminationGracePeriodSeconds").unwrap(), 5);
        assert_eq!(values.get("volumes").unwrap()[0]["name"], "data");
        // serviceAccountName becomes a flag; the name is re-derived
        assert_eq!(values.get("serviceAccountName").unwrap(), true);
    }

    #[test]
    fn test_leaf_values_survive_relocation() {
        let service = service_with("cartservice", Some(full_deployment()), None, None);
        let values = transform(&service).unwrap();

        // Every env entry arrives verbatim, list order intact
        assert_eq!(values.get("containers.server.env").unwrap()[0]["name"], "REDIS_ADDR");
        assert_eq!(
            values.get("containers.server.env").unwrap()[0]["value"],
            "redis:6379"
        );
        assert_eq!(
            values.get("containers.server.ports").unwrap()[0]["containerPort"],
            7070
        );
    }

    #[test]
    fn test_service_fields_relocate() {
        let svc = json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {
                "name": "frontend",
                "labels": {"app": "frontend"},
                "annotations": {"cloud.google.com/neg": "{\"ingress\": true}"}
            },
            "spec": {
                "type": "LoadBalancer",
                "selector": {"app": "frontend"},
                "ports": [{"port": 80, "targetPort": 8080}]
            }
        });
        let service = service_with("frontend", None, Some(svc), None);
        let values = transform(&service).unwrap();

        assert_eq!(values.get("type").unwrap(), "LoadBalancer");
        assert_eq!(values.get("ports").unwrap()[0]["targetPort"], 8080);
        assert_eq!(
            values.get("serviceAnnotations").unwrap()["cloud.google.com/neg"],
            "{\"ingress\": true}"
        );
        // Skeleton-owned selector is not relocated
        assert!(values.get("selector").is_none());
    }

    #[test]
    fn test_service_account_nests_and_flags() {
        let account = json!({
            "apiVersion": "v1",
            "kind": "ServiceAccount",
            "metadata": {
                "name": "cartservice",
                "annotations": {"iam.gke.io/gcp-service-account": "cart@demo.iam"}
            },
            "automountServiceAccountToken": false
        });
        let service = service_with("cartservice", None, None, Some(account));
        let values = transform(&service).unwrap();

        assert_eq!(values.get("serviceAccountName").unwrap(), true);
        assert_eq!(
            values
                .get("serviceAccount.annotations")
                .unwrap()["iam.gke.io/gcp-service-account"],
            "cart@demo.iam"
        );
        assert_eq!(
            values.get("serviceAccount.automountServiceAccountToken").unwrap(),
            false
        );
    }

    #[test]
    fn test_containers_must_be_a_sequence() {
        let broken = json!({
            "kind": "Deployment",
            "metadata": {"name": "web"},
            "spec": {"template": {"spec": {"containers": "oops"}}}
        });
        let service = service_with("web", Some(broken), None, None);

        let err = transform(&service).unwrap_err();
        match err {
            TransformError::ShapeMismatch { path, expected, found, .. } => {
                assert_eq!(path, "spec.template.spec.containers");
                assert_eq!(expected, "sequence");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_container_without_image_is_rejected() {
        let broken = json!({
            "kind": "Deployment",
            "metadata": {"name": "web"},
            "spec": {"template": {"spec": {"containers": [{"name": "server"}]}}}
        });
        let service = service_with("web", Some(broken), None, None);

        let err = transform(&service).unwrap_err();
        assert!(err.to_string().contains("image"));
        assert!(err.to_string().contains("absent"));
    }

    #[test]
    fn test_duplicate_container_names_conflict() {
        let broken = json!({
            "kind": "Deployment",
            "metadata": {"name": "web"},
            "spec": {"template": {"spec": {"containers": [
                {"name": "server", "image": "a:v1"},
                {"name": "server", "image": "b:v1"}
            ]}}}
        });
        let service = service_with("web", Some(broken), None, None);

        let err = transform(&service).unwrap_err();
        assert!(matches!(err, TransformError::RelocationConflict { .. }));
    }

    #[test]
    fn test_colliding_relocations_are_reported() {
        // A deployment spec field and a service spec field landing on the
        // same values key with different content.
        let deployment = json!({
            "kind": "Deployment",
            "metadata": {"name": "web"},
            "spec": {
                "ports": ["bogus"],
                "template": {"spec": {"containers": [{"name": "s", "image": "x"}]}}
            }
        });
        let svc = json!({
            "kind": "Service",
            "metadata": {"name": "web"},
            "spec": {"ports": [{"port": 80}]}
        });
        let service = service_with("web", Some(deployment), Some(svc), None);

        let err = transform(&service).unwrap_err();
        match err {
            TransformError::RelocationConflict { target, .. } => assert_eq!(target, "ports"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_identical_relocations_merge_quietly() {
        // namespace appears on both resources with the same value
        let deployment = json!({
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "shop"},
            "spec": {"template": {"spec": {"containers": [{"name": "s", "image": "x"}]}}}
        });
        let svc = json!({
            "kind": "Service",
            "metadata": {"name": "web", "namespace": "shop"},
            "spec": {"ports": [{"port": 80}]}
        });
        let service = service_with("web", Some(deployment), Some(svc), None);

        let values = transform(&service).unwrap();
        assert_eq!(values.get("namespace").unwrap(), "shop");
    }

    /// `spec.template.spec.containers[i].name` - names become mapping keys
    fn is_container_name(path: &str) -> bool {
        path.strip_prefix("spec.template.spec.containers[")
            .and_then(|rest| rest.split_once(']'))
            .is_some_and(|(idx, rest)| idx.chars().all(|c| c.is_ascii_digit()) && rest == ".name")
    }

    #[test]
    fn test_no_leaf_value_is_lost() {
        let service = service_with("cartservice", Some(full_deployment()), None, None);
        let values = transform(&service).unwrap();
        let output_leaves: Vec<JsonValue> =
            values.leaf_paths().into_iter().map(|(_, v)| v).collect();

        // Skeleton-owned fields are reconstructed from the service name;
        // everything else must survive relocation with its value intact.
        let skeleton_prefixes = [
            "apiVersion",
            "kind",
            "metadata.",
            "spec.selector.",
            "spec.template.metadata.",
        ];

        let deployment = service.deployment.as_ref().unwrap();
        for (path, value) in deployment.leaf_paths() {
            if skeleton_prefixes
                .iter()
                .any(|p| path.starts_with(p) || path == p.trim_end_matches('.'))
            {
                continue;
            }
            if is_container_name(&path) || path == "spec.template.spec.serviceAccountName" {
                continue;
            }
            assert!(
                output_leaves.contains(&value),
                "leaf {} = {:?} missing from transformed values",
                path,
                value
            );
        }
    }

    #[test]
    fn test_transform_is_independent_and_repeatable() {
        let service = service_with("cartservice", Some(full_deployment()), None, None);

        let first = transform(&service).unwrap();
        let second = transform(&service).unwrap();
        assert_eq!(first.inner(), second.inner());
    }
}
