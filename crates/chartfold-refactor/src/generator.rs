//! Template generation
//!
//! Turns a feature descriptor into one shared Helm template per resource
//! kind: a fixed skeleton interleaved with one conditionally-gated segment
//! per observed block, in catalog order.
//!
//! The load-bearing rule: a conditional segment passes its block through
//! whole (`toYaml`), never reconstructing sub-fields one by one - a
//! sub-field the generator forgot would be silent data loss. Scalars are
//! gated on `hasKey` so present-but-falsy values (`hostNetwork: false`,
//! `replicas: 0`) still render, and an absent block renders nothing at
//! all, not even an empty key.

use chartfold_core::{ChartInfo, ResourceKind};

use crate::catalog::{BlockForm, BlockScope};
use crate::error::GenerateError;
use crate::extractor::{BlockUsage, FeatureDescriptor};

/// One generated shared template
#[derive(Debug, Clone)]
pub struct TemplateUnit {
    pub kind: ResourceKind,
    pub define_name: String,
    pub text: String,
}

/// Generate the shared template for a kind
///
/// Fails only when the kind has no registered skeleton; identical
/// descriptors always produce byte-identical text.
pub fn generate(
    descriptor: &FeatureDescriptor,
    chart: &ChartInfo,
) -> Result<TemplateUnit, GenerateError> {
    let text = match descriptor.kind {
        ResourceKind::Deployment => deployment_template(descriptor, chart),
        ResourceKind::Service => service_template(descriptor, chart),
        ResourceKind::ServiceAccount => service_account_template(descriptor, chart),
        ResourceKind::Other => {
            return Err(GenerateError::UnsupportedKind {
                kind: descriptor.kind.as_str().to_string(),
            });
        }
    };

    // Other is rejected above, so a define name always exists
    let define_name = descriptor
        .kind
        .define_name()
        .expect("known kinds have a define name")
        .to_string();

    Ok(TemplateUnit {
        kind: descriptor.kind,
        define_name,
        text,
    })
}

/// Combine template units into the shared helpers file
pub fn helpers_file(units: &[TemplateUnit]) -> String {
    let mut parts = vec![
        "{{/*".to_string(),
        "Shared base templates for microservices.".to_string(),
        "Built from the chart's full service set: every optional field used by".to_string(),
        "any service has a conditional block, and each service renders only the".to_string(),
        "blocks its own values provide.".to_string(),
        "*/}}".to_string(),
    ];

    for unit in units {
        parts.push(String::new());
        parts.push(unit.text.trim_end().to_string());
    }

    parts.join("\n") + "\n"
}

// =============================================================================
// Deployment
// =============================================================================

fn deployment_template(descriptor: &FeatureDescriptor, chart: &ChartInfo) -> String {
    let chart_name = &chart.name;
    let mut lines = Vec::new();

    lines.push("{{/*".to_string());
    lines.push("Shared Deployment template for microservices.".to_string());
    lines.push("*/}}".to_string());
    lines.push(format!(
        "{{{{- define \"{}\" -}}}}",
        ResourceKind::Deployment.define_name().expect("registered kind")
    ));
    lines.push("apiVersion: apps/v1".to_string());
    lines.push("kind: Deployment".to_string());
    push_metadata_skeleton(&mut lines, chart_name);
    push_scope_blocks(&mut lines, descriptor, BlockScope::Metadata, 2, ".Values");

    lines.push("spec:".to_string());
    push_scope_blocks(&mut lines, descriptor, BlockScope::Spec, 2, ".Values");

    lines.push("  selector:".to_string());
    lines.push("    matchLabels:".to_string());
    lines.push("      app: {{ .serviceName }}".to_string());
    lines.push(format!(
        "    {{{{- include \"{}.selectorLabels\" .root | nindent 6 }}}}",
        chart_name
    ));
    lines.push("  template:".to_string());
    lines.push("    metadata:".to_string());
    lines.push("      labels:".to_string());
    lines.push("        app: {{ .serviceName }}".to_string());
    lines.push(format!(
        "      {{{{- include \"{}.selectorLabels\" .root | nindent 8 }}}}",
        chart_name
    ));
    push_scope_blocks(&mut lines, descriptor, BlockScope::PodMetadata, 6, ".Values");

    lines.push("    spec:".to_string());

    // initContainers render before the containers section
    if let Some(usage) = descriptor.blocks.get("initContainers") {
        push_conditional(&mut lines, 6, ".Values", "initContainers", "initContainers", usage);
    }

    lines.push("      containers:".to_string());
    lines.push("      {{- range $name, $container := .Values.containers }}".to_string());
    lines.push("      - name: {{ $name }}".to_string());
    lines.push("        image: {{ $container.image }}".to_string());
    push_scope_blocks(&mut lines, descriptor, BlockScope::Container, 8, "$container");
    lines.push("      {{- end }}".to_string());

    for (id, usage) in descriptor.blocks_at(BlockScope::PodSpec) {
        if id == "initContainers" {
            continue;
        }
        if id == "serviceAccountName" {
            // The account is renamed by the fullname convention, so the
            // values carry a flag rather than the original string.
            lines.push("      {{- if .Values.serviceAccountName }}".to_string());
            lines.push(format!(
                "      serviceAccountName: {{{{ include \"{}.fullname\" .root }}}}-{{{{ .serviceName }}}}",
                chart_name
            ));
            lines.push("      {{- end }}".to_string());
            continue;
        }
        push_conditional(&mut lines, 6, ".Values", block_key(descriptor, id), id, usage);
    }

    push_scope_blocks(&mut lines, descriptor, BlockScope::Resource, 0, ".Values");

    lines.push("{{- end }}".to_string());
    lines.join("\n") + "\n"
}

// =============================================================================
// Service
// =============================================================================

fn service_template(descriptor: &FeatureDescriptor, chart: &ChartInfo) -> String {
    let chart_name = &chart.name;
    let mut lines = Vec::new();

    lines.push("{{/*".to_string());
    lines.push("Shared Service template for microservices.".to_string());
    lines.push("*/}}".to_string());
    lines.push(format!(
        "{{{{- define \"{}\" -}}}}",
        ResourceKind::Service.define_name().expect("registered kind")
    ));
    lines.push("apiVersion: v1".to_string());
    lines.push("kind: Service".to_string());
    push_metadata_skeleton(&mut lines, chart_name);
    push_scope_blocks(&mut lines, descriptor, BlockScope::Metadata, 2, ".Values");

    lines.push("spec:".to_string());

    for (id, usage) in descriptor.blocks_at(BlockScope::Spec) {
        if usage.repeats {
            continue;
        }
        push_conditional(&mut lines, 2, ".Values", block_key(descriptor, id), id, usage);
    }

    lines.push("  selector:".to_string());
    lines.push("    app: {{ .serviceName }}".to_string());
    lines.push(format!(
        "  {{{{- include \"{}.selectorLabels\" .root | nindent 4 }}}}",
        chart_name
    ));

    if let Some(usage) = descriptor.blocks.get("ports") {
        lines.push("  {{- with .Values.ports }}".to_string());
        lines.push("  ports:".to_string());
        lines.push("  {{- range . }}".to_string());
        lines.push("  - port: {{ .port }}".to_string());
        for field in &usage.variants {
            lines.push(format!("    {{{{- if hasKey . \"{}\" }}}}", field));
            lines.push(format!("    {}: {{{{ {} }}}}", field, value_expr(".", field)));
            lines.push("    {{- end }}".to_string());
        }
        lines.push("  {{- end }}".to_string());
        lines.push("  {{- end }}".to_string());
    }

    push_scope_blocks(&mut lines, descriptor, BlockScope::Resource, 0, ".Values");

    lines.push("{{- end }}".to_string());
    lines.join("\n") + "\n"
}

// =============================================================================
// ServiceAccount
// =============================================================================

fn service_account_template(descriptor: &FeatureDescriptor, chart: &ChartInfo) -> String {
    let chart_name = &chart.name;
    let mut lines = Vec::new();

    lines.push("{{/*".to_string());
    lines.push("Shared ServiceAccount template for microservices.".to_string());
    lines.push("*/}}".to_string());
    lines.push(format!(
        "{{{{- define \"{}\" -}}}}",
        ResourceKind::ServiceAccount.define_name().expect("registered kind")
    ));
    lines.push("apiVersion: v1".to_string());
    lines.push("kind: ServiceAccount".to_string());
    push_metadata_skeleton(&mut lines, chart_name);

    // ServiceAccount extras live under .Values.serviceAccount; the wrapper
    // keeps field access nil-safe for services without an account.
    let metadata_blocks: Vec<_> = descriptor.blocks_at(BlockScope::Metadata).collect();
    if !metadata_blocks.is_empty() {
        lines.push("  {{- with .Values.serviceAccount }}".to_string());
        for (id, usage) in metadata_blocks {
            push_conditional(&mut lines, 2, ".", block_key(descriptor, id), id, usage);
        }
        lines.push("  {{- end }}".to_string());
    }

    let root_blocks: Vec<_> = descriptor.blocks_at(BlockScope::Resource).collect();
    if !root_blocks.is_empty() {
        lines.push("{{- with .Values.serviceAccount }}".to_string());
        for (id, usage) in root_blocks {
            push_conditional(&mut lines, 0, ".", block_key(descriptor, id), id, usage);
        }
        lines.push("{{- end }}".to_string());
    }

    lines.push("{{- end }}".to_string());
    lines.join("\n") + "\n"
}

// =============================================================================
// Emission helpers
// =============================================================================

fn push_metadata_skeleton(lines: &mut Vec<String>, chart_name: &str) {
    lines.push("metadata:".to_string());
    lines.push(format!(
        "  name: {{{{ include \"{}.fullname\" .root }}}}-{{{{ .serviceName }}}}",
        chart_name
    ));
    lines.push("  labels:".to_string());
    lines.push("    app: {{ .serviceName }}".to_string());
    lines.push(format!(
        "  {{{{- include \"{}.labels\" .root | nindent 4 }}}}",
        chart_name
    ));
}

fn push_scope_blocks(
    lines: &mut Vec<String>,
    descriptor: &FeatureDescriptor,
    scope: BlockScope,
    indent: usize,
    base: &str,
) {
    for (id, usage) in descriptor.blocks_at(scope) {
        push_conditional(lines, indent, base, block_key(descriptor, id), id, usage);
    }
}

/// The YAML key a block emits; differs from the values id for entries
/// like `podSecurityContext` (key `securityContext`)
fn block_key<'a>(descriptor: &FeatureDescriptor, id: &'a str) -> &'a str {
    match crate::catalog::lookup(descriptor.kind, id) {
        Some(spec) => spec.key,
        None => id,
    }
}

/// Emit one conditionally-gated segment
fn push_conditional(
    lines: &mut Vec<String>,
    indent: usize,
    base: &str,
    key: &str,
    value_key: &str,
    usage: &BlockUsage,
) {
    let pad = " ".repeat(indent);
    let expr = value_expr(base, value_key);

    if usage.dynamic {
        // Unknown shape: gate on key presence, pass the value through whole
        lines.push(format!("{}{{{{- if hasKey {} \"{}\" }}}}", pad, base, value_key));
        lines.push(format!("{}{}:", pad, key));
        lines.push(format!(
            "{}  {{{{- toYaml {} | nindent {} }}}}",
            pad,
            expr,
            indent + 2
        ));
        lines.push(format!("{}{{{{- end }}}}", pad));
        return;
    }

    match usage.form {
        BlockForm::Scalar => {
            lines.push(format!("{}{{{{- if hasKey {} \"{}\" }}}}", pad, base, value_key));
            lines.push(format!("{}{}: {{{{ {} }}}}", pad, key, expr));
            lines.push(format!("{}{{{{- end }}}}", pad));
        }
        BlockForm::Block => {
            lines.push(format!("{}{{{{- with {} }}}}", pad, expr));
            lines.push(format!("{}{}:", pad, key));
            lines.push(format!(
                "{}  {{{{- toYaml . | nindent {} }}}}",
                pad,
                indent + 2
            ));
            lines.push(format!("{}{{{{- end }}}}", pad));
        }
    }
}

/// Template expression for a key on a base reference
///
/// Uses dotted access for identifier-like keys, `index` otherwise.
fn value_expr(base: &str, key: &str) -> String {
    if is_identifier(key) {
        if base == "." {
            format!(".{}", key)
        } else {
            format!("{}.{}", base, key)
        }
    } else {
        format!("(index {} \"{}\")", base, key)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
