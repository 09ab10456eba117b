//! Per-service template files
//!
//! Each service gets a thin file that invokes the shared templates with
//! its own values subtree; resources the pipeline does not template are
//! appended verbatim from their original text.

use chartfold_core::ResourceKind;

use crate::parser::ServiceResources;

/// Render the per-service file content
pub fn service_file(service: &ServiceResources) -> String {
    let mut parts = Vec::new();

    if service.has_deployment() {
        parts.push(include_line(ResourceKind::Deployment, &service.service_name));
    }
    if service.has_service() {
        parts.push(include_line(ResourceKind::Service, &service.service_name));
    }
    if service.has_service_account() {
        parts.push(include_line(ResourceKind::ServiceAccount, &service.service_name));
    }
    for other in &service.others {
        parts.push(other.source().trim().to_string());
    }

    parts.join("\n---\n") + "\n"
}

fn include_line(kind: ResourceKind, service_name: &str) -> String {
    format!(
        "{{{{- include \"{}\" (dict \"Values\" {} \"root\" . \"serviceName\" \"{}\") }}}}",
        kind.define_name().expect("templated kinds have define names"),
        values_ref(service_name),
        service_name
    )
}

/// Values subtree reference; dotted access only works for identifier-like
/// names, anything else needs `index`
fn values_ref(service_name: &str) -> String {
    let mut chars = service_name.chars();
    let identifier = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if identifier {
        format!(".Values.{}", service_name)
    } else {
        format!("(index .Values \"{}\")", service_name)
    }
}
