//! Input directory parsing
//!
//! Reads a directory of per-service manifest files (chart-generation tool
//! output), splits multi-document YAML, and groups resources by service.
//! Malformed documents are reported per file and never abort the scan.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;
use walkdir::WalkDir;

use chartfold_core::{ChartInfo, Resource, ResourceKind, Values};

use crate::error::{RefactorError, RefactorWarning, Result};

/// Detects template directives in documents that failed YAML parsing
static TEMPLATE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{-?\s").expect("valid regex"));

/// Top-level values keys kept as chart globals rather than service config
const GLOBAL_VALUE_KEYS: &[&str] = &["global", "kubernetesClusterDomain"];

/// All resources belonging to one logical service
#[derive(Debug, Clone)]
pub struct ServiceResources {
    pub service_name: String,
    pub deployment: Option<Resource>,
    pub service: Option<Resource>,
    pub service_account: Option<Resource>,
    /// ConfigMaps, Secrets, duplicates - carried through verbatim
    pub others: Vec<Resource>,
}

impl ServiceResources {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            deployment: None,
            service: None,
            service_account: None,
            others: Vec::new(),
        }
    }

    pub fn has_deployment(&self) -> bool {
        self.deployment.is_some()
    }

    pub fn has_service(&self) -> bool {
        self.service.is_some()
    }

    pub fn has_service_account(&self) -> bool {
        self.service_account.is_some()
    }

    /// Human-readable list of what the service carries
    pub fn resource_summary(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if self.has_deployment() {
            parts.push("Deployment".to_string());
        }
        if self.has_service() {
            parts.push("Service".to_string());
        }
        if self.has_service_account() {
            parts.push("ServiceAccount".to_string());
        }
        if !self.others.is_empty() {
            parts.push(format!("{} other", self.others.len()));
        }
        parts
    }
}

/// Everything the parser hands to the rest of the pipeline
#[derive(Debug)]
pub struct ParsedChart {
    /// Services ordered by name
    pub services: Vec<ServiceResources>,
    pub chart: ChartInfo,
    /// Chart-global values retained from the input values.yaml
    pub globals: Values,
    pub warnings: Vec<RefactorWarning>,
}

/// Parse all manifest files in a chart directory
pub fn parse_directory(input: &Path) -> Result<ParsedChart> {
    if !input.is_dir() {
        return Err(RefactorError::DirectoryNotFound(input.to_path_buf()));
    }

    let mut warnings = Vec::new();
    let chart = load_chart_info(input, &mut warnings);
    let globals = load_globals(input, &mut warnings);

    let mut services: BTreeMap<String, ServiceResources> = BTreeMap::new();

    let files: Vec<PathBuf> = WalkDir::new(input)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_manifest_file(p))
        .collect();

    for path in files {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warnings.push(RefactorWarning::parse_error(
                    path.clone(),
                    format!("failed to read file: {}", e),
                ));
                continue;
            }
        };

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("service")
            .to_string();

        for doc_text in split_documents(&content) {
            if doc_text.trim().is_empty() {
                continue;
            }

            let body: JsonValue = match serde_yaml::from_str(&doc_text) {
                Ok(body) => body,
                Err(e) => {
                    if TEMPLATE_DIRECTIVE.is_match(&doc_text) {
                        warnings.push(RefactorWarning::templated_input(path.clone()));
                    } else {
                        warnings.push(RefactorWarning::parse_error(path.clone(), e.to_string()));
                    }
                    continue;
                }
            };

            if !body.is_object() {
                warnings.push(RefactorWarning::parse_error(
                    path.clone(),
                    "document is not a mapping",
                ));
                continue;
            }

            assign_document(&mut services, &chart, &path, &stem, body, doc_text, &mut warnings);
        }
    }

    tracing::debug!(
        services = services.len(),
        warnings = warnings.len(),
        "parsed chart directory"
    );

    Ok(ParsedChart {
        services: services.into_values().collect(),
        chart,
        globals,
        warnings,
    })
}

/// Place one parsed document into its service's slot
fn assign_document(
    services: &mut BTreeMap<String, ServiceResources>,
    chart: &ChartInfo,
    path: &Path,
    stem: &str,
    body: JsonValue,
    source: String,
    warnings: &mut Vec<RefactorWarning>,
) {
    let kind = body
        .get("kind")
        .and_then(|k| k.as_str())
        .map(ResourceKind::from_kind_str)
        .unwrap_or(ResourceKind::Other);

    let app_label = body
        .get("metadata")
        .and_then(|m| m.get("labels"))
        .and_then(|l| l.get("app"))
        .and_then(|a| a.as_str());

    let mut service_name = app_label.unwrap_or(stem).to_string();

    // A second Service in the same file (an externally-exposed twin like
    // `frontend-external`) becomes its own service, keyed by its own name.
    if kind == ResourceKind::Service
        && services
            .get(&service_name)
            .is_some_and(|s| s.service.is_some())
    {
        if let Some(own_name) = body
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(|n| n.as_str())
        {
            let prefix = format!("{}-", chart.name);
            let stripped = own_name.strip_prefix(&prefix).unwrap_or(own_name);
            if stripped != service_name {
                service_name = stripped.to_string();
            }
        }
    }

    let resource = Resource::from_document(service_name.clone(), body, source);
    let entry = services
        .entry(service_name.clone())
        .or_insert_with(|| ServiceResources::new(&service_name));

    match resource.kind() {
        ResourceKind::Deployment if entry.deployment.is_none() => {
            entry.deployment = Some(resource);
        }
        ResourceKind::Service if entry.service.is_none() => {
            entry.service = Some(resource);
        }
        ResourceKind::ServiceAccount if entry.service_account.is_none() => {
            entry.service_account = Some(resource);
        }
        kind => {
            let label = if kind == ResourceKind::Other {
                resource
                    .body()
                    .get("kind")
                    .and_then(|k| k.as_str())
                    .unwrap_or("unknown kind")
                    .to_string()
            } else {
                format!("duplicate {}", kind)
            };
            warnings.push(RefactorWarning::passthrough(
                path.to_path_buf(),
                &service_name,
                format!("{} carried through unchanged", label),
            ));
            entry.others.push(resource);
        }
    }
}

/// Split a file into `---`-separated documents
fn split_documents(content: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim_end() == "---" {
            if !current.is_empty() {
                documents.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        documents.push(current.join("\n"));
    }

    documents
}

fn is_manifest_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name == "Chart.yaml" || name == "values.yaml" || name.starts_with('_') {
        return false;
    }
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn load_chart_info(input: &Path, warnings: &mut Vec<RefactorWarning>) -> ChartInfo {
    let chart_file = input.join("Chart.yaml");

    let Ok(content) = fs::read_to_string(&chart_file) else {
        warnings.push(RefactorWarning::chart(
            chart_file,
            "Chart.yaml not found, using defaults",
        ));
        return ChartInfo::default();
    };

    match ChartInfo::parse(&content) {
        Ok(chart) => {
            if chart.semver_version().is_none() {
                warnings.push(RefactorWarning::chart(
                    chart_file,
                    format!("chart version '{}' is not valid SemVer", chart.version),
                ));
            }
            chart
        }
        Err(e) => {
            warnings.push(RefactorWarning::chart(
                chart_file,
                format!("could not parse Chart.yaml: {}", e),
            ));
            ChartInfo::default()
        }
    }
}

fn load_globals(input: &Path, warnings: &mut Vec<RefactorWarning>) -> Values {
    let values_file = input.join("values.yaml");
    if !values_file.exists() {
        return Values::new();
    }

    let parsed = match Values::from_file(&values_file) {
        Ok(values) => values,
        Err(e) => {
            warnings.push(RefactorWarning::chart(
                values_file,
                format!("could not parse values.yaml: {}", e),
            ));
            return Values::new();
        }
    };

    let mut globals = Values::new();
    for key in GLOBAL_VALUE_KEYS {
        if let Some(value) = parsed.get(key) {
            // set() only fails on path syntax; these keys are plain
            let _ = globals.set(key, value.clone());
        }
    }
    globals
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn create_test_chart(dir: &Path) {
        write(
            dir,
            "Chart.yaml",
            "apiVersion: v2\nname: boutique\nversion: 0.1.0\n",
        );
        write(
            dir,
            "values.yaml",
            "kubernetesClusterDomain: cluster.local\nadservice:\n  replicas: 1\n",
        );
        write(
            dir,
            "adservice.yaml",
            r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: boutique-adservice
  labels:
    app: adservice
spec:
  template:
    spec:
      containers:
        - name: server
          image: adservice:v1
---
apiVersion: v1
kind: Service
metadata:
  name: boutique-adservice
  labels:
    app: adservice
spec:
  ports:
    - port: 9555
---
apiVersion: v1
kind: ServiceAccount
metadata:
  name: boutique-adservice
  labels:
    app: adservice
"#,
        );
        write(
            dir,
            "cartservice.yaml",
            r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: boutique-cartservice
  labels:
    app: cartservice
spec:
  template:
    spec:
      containers:
        - name: server
          image: cartservice:v1
"#,
        );
    }

    #[test]
    fn test_parse_directory_groups_by_service() {
        let dir = TempDir::new().unwrap();
        create_test_chart(dir.path());

        let parsed = parse_directory(dir.path()).unwrap();

        assert_eq!(parsed.chart.name, "boutique");
        assert_eq!(
            parsed.globals.get("kubernetesClusterDomain").unwrap(),
            "cluster.local"
        );
        // Service-scoped values keys are not globals
        assert!(parsed.globals.get("adservice").is_none());

        let names: Vec<_> = parsed.services.iter().map(|s| s.service_name.as_str()).collect();
        assert_eq!(names, vec!["adservice", "cartservice"]);

        let ad = &parsed.services[0];
        assert!(ad.has_deployment());
        assert!(ad.has_service());
        assert!(ad.has_service_account());

        let cart = &parsed.services[1];
        assert!(cart.has_deployment());
        assert!(!cart.has_service());
    }

    #[test]
    fn test_malformed_documents_do_not_abort() {
        let dir = TempDir::new().unwrap();
        create_test_chart(dir.path());
        write(dir.path(), "broken.yaml", ": not yaml\n\t???");

        let parsed = parse_directory(dir.path()).unwrap();

        assert_eq!(parsed.services.len(), 2);
        assert!(parsed
            .warnings
            .iter()
            .any(|w| w.category == crate::error::WarningCategory::Parse));
    }

    #[test]
    fn test_templated_documents_get_dedicated_warning() {
        let dir = TempDir::new().unwrap();
        create_test_chart(dir.path());
        write(
            dir.path(),
            "frontend.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: {{ include \"x.fullname\" . }}\n",
        );

        let parsed = parse_directory(dir.path()).unwrap();
        assert!(parsed
            .warnings
            .iter()
            .any(|w| w.message.contains("template directives")));
    }

    #[test]
    fn test_second_service_document_becomes_own_service() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Chart.yaml", "name: boutique\nversion: 0.1.0\n");
        write(
            dir.path(),
            "frontend.yaml",
            r#"apiVersion: v1
kind: Service
metadata:
  name: boutique-frontend
  labels:
    app: frontend
spec:
  type: ClusterIP
---
apiVersion: v1
kind: Service
metadata:
  name: boutique-frontend-external
  labels:
    app: frontend
spec:
  type: LoadBalancer
"#,
        );

        let parsed = parse_directory(dir.path()).unwrap();
        let names: Vec<_> = parsed.services.iter().map(|s| s.service_name.as_str()).collect();
        assert_eq!(names, vec!["frontend", "frontend-external"]);
    }

    #[test]
    fn test_unknown_kinds_pass_through() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Chart.yaml", "name: demo\nversion: 0.1.0\n");
        write(
            dir.path(),
            "web.yaml",
            r#"apiVersion: v1
kind: ConfigMap
metadata:
  name: web-config
  labels:
    app: web
data:
  key: value
"#,
        );

        let parsed = parse_directory(dir.path()).unwrap();
        assert_eq!(parsed.services.len(), 1);
        assert_eq!(parsed.services[0].others.len(), 1);
        assert!(parsed
            .warnings
            .iter()
            .any(|w| w.message.contains("ConfigMap")));
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let err = parse_directory(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, RefactorError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_helper_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Chart.yaml", "name: demo\nversion: 0.1.0\n");
        write(dir.path(), "_helpers.yaml", "kind: Deployment\n");

        let parsed = parse_directory(dir.path()).unwrap();
        assert!(parsed.services.is_empty());
    }
}
