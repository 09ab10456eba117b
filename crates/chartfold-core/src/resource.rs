//! Loss-preserving manifest resource model
//!
//! A `Resource` holds one parsed manifest document in full: every field of
//! the original document, known to the pipeline or not, survives in `body`
//! verbatim (mapping key order may be normalized, values never change). All
//! downstream stages read resources through the typed `lookup` accessor and
//! never mutate one in place - restructuring always produces new values.

use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::path::FieldPath;
use crate::values;

/// Resource kinds the pipeline understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Deployment,
    Service,
    ServiceAccount,
    /// Anything else - carried through untouched
    Other,
}

impl ResourceKind {
    /// Map a manifest `kind:` value
    pub fn from_kind_str(kind: &str) -> Self {
        match kind {
            "Deployment" => Self::Deployment,
            "Service" => Self::Service,
            "ServiceAccount" => Self::ServiceAccount,
            _ => Self::Other,
        }
    }

    /// Display name matching the manifest `kind:` value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::Service => "Service",
            Self::ServiceAccount => "ServiceAccount",
            Self::Other => "Other",
        }
    }

    /// The shared template identifier for this kind
    pub fn define_name(&self) -> Option<&'static str> {
        match self {
            Self::Deployment => Some("microservice.deployment.helmify"),
            Self::Service => Some("microservice.service.helmify"),
            Self::ServiceAccount => Some("microservice.serviceaccount.helmify"),
            Self::Other => None,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a typed optional-field lookup
///
/// Replaces has-key probing on loosely structured data: callers branch on
/// the tag instead of re-testing types at every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Present(&'a JsonValue),
    Absent,
}

impl<'a> Lookup<'a> {
    pub fn is_present(&self) -> bool {
        matches!(self, Lookup::Present(_))
    }

    /// Present with actual content
    ///
    /// An empty mapping or sequence counts as absent, so a `key: {}`
    /// leftover in a manifest never produces a spurious conditional.
    pub fn is_populated(&self) -> bool {
        match self {
            Lookup::Present(value) => !is_empty_value(value),
            Lookup::Absent => false,
        }
    }

    pub fn value(&self) -> Option<&'a JsonValue> {
        match self {
            Lookup::Present(value) => Some(value),
            Lookup::Absent => None,
        }
    }
}

/// True for `{}`, `[]`, and `null`
pub fn is_empty_value(value: &JsonValue) -> bool {
    match value {
        JsonValue::Object(map) => map.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Null => true,
        _ => false,
    }
}

/// One parsed manifest document
#[derive(Debug, Clone)]
pub struct Resource {
    kind: ResourceKind,
    service_name: String,
    body: JsonValue,
    source: String,
}

impl Resource {
    /// Build a resource from a parsed document and its original text
    ///
    /// The kind is read from the document's `kind:` field; anything
    /// unrecognized becomes `Other`.
    pub fn from_document(service_name: impl Into<String>, body: JsonValue, source: String) -> Self {
        let kind = body
            .get("kind")
            .and_then(|k| k.as_str())
            .map(ResourceKind::from_kind_str)
            .unwrap_or(ResourceKind::Other);

        Self {
            kind,
            service_name: service_name.into(),
            body,
            source,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn body(&self) -> &JsonValue {
        &self.body
    }

    /// The original document text, for pass-through re-emission
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Typed lookup at a parsed field path
    pub fn lookup_path(&self, path: &FieldPath) -> Lookup<'_> {
        match path.resolve(&self.body) {
            Some(value) => Lookup::Present(value),
            None => Lookup::Absent,
        }
    }

    /// Typed lookup at a dot/bracket path string
    pub fn lookup(&self, path: &str) -> Result<Lookup<'_>> {
        Ok(self.lookup_path(&FieldPath::parse(path)?))
    }

    /// `metadata.name` when present
    pub fn name(&self) -> Option<&str> {
        self.body
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(|n| n.as_str())
    }

    /// `metadata.labels.app` when present
    pub fn app_label(&self) -> Option<&str> {
        self.body
            .get("metadata")
            .and_then(|m| m.get("labels"))
            .and_then(|l| l.get("app"))
            .and_then(|a| a.as_str())
    }

    /// Every scalar leaf of the document as `(path, value)` pairs
    pub fn leaf_paths(&self) -> Vec<(String, JsonValue)> {
        let mut leaves = Vec::new();
        values::collect_leaves(&self.body, String::new(), &mut leaves);
        leaves
    }

    /// Re-serialize the document body
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.body)?)
    }
}
