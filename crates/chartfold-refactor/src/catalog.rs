//! Catalog of known optional blocks
//!
//! The catalog is the single registry of manifest fields the pipeline
//! understands: one entry per optional block, in the order the template
//! generator emits them. Supporting a new Kubernetes field is a table
//! edit here - extractor and generator control flow never change.
//!
//! Fields outside the catalog are still carried: the extractor discovers
//! them as dynamic blocks and the generator gates them with the same
//! pass-through conditionals.

use chartfold_core::ResourceKind;
use phf::{phf_set, Set};

/// Bump when entries are added or their meaning changes
pub const CATALOG_VERSION: u32 = 1;

/// Where a block's key lives in the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockScope {
    /// Under `metadata`
    Metadata,
    /// Under `spec`
    Spec,
    /// Under `spec.template.metadata`
    PodMetadata,
    /// Under `spec.template.spec`
    PodSpec,
    /// A key of one container entry
    Container,
    /// At the document root
    Resource,
}

impl BlockScope {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Spec => "spec",
            Self::PodMetadata => "pod metadata",
            Self::PodSpec => "pod spec",
            Self::Container => "container",
            Self::Resource => "resource",
        }
    }
}

/// How a block renders in the template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockForm {
    /// Single scalar value, emitted inline
    Scalar,
    /// Sub-structure, emitted as a whole via pass-through
    Block,
}

/// One catalog entry
pub struct BlockSpec {
    /// Values key the block relocates to
    pub id: &'static str,
    /// Manifest key at its scope
    pub key: &'static str,
    pub scope: BlockScope,
    pub form: BlockForm,
    /// Templated as an iteration over the values collection
    pub repeats: bool,
    /// Mutually-exclusive sub-keys to record as shape variants
    pub variants: &'static [&'static str],
    /// Mandatory per-item fields of a repeating collection
    pub item_mandatory: &'static [&'static str],
}

const fn block(id: &'static str, key: &'static str, scope: BlockScope, form: BlockForm) -> BlockSpec {
    BlockSpec {
        id,
        key,
        scope,
        form,
        repeats: false,
        variants: &[],
        item_mandatory: &[],
    }
}

/// Probe handler sub-keys - exactly one is present per probe
pub static PROBE_VARIANTS: &[&str] = &["httpGet", "grpc", "tcpSocket", "exec"];

const fn probe(id: &'static str) -> BlockSpec {
    BlockSpec {
        id,
        key: id,
        scope: BlockScope::Container,
        form: BlockForm::Block,
        repeats: false,
        variants: PROBE_VARIANTS,
        item_mandatory: &[],
    }
}

/// Deployment blocks, in template emission order
pub static DEPLOYMENT_BLOCKS: &[BlockSpec] = &[
    block("annotations", "annotations", BlockScope::Metadata, BlockForm::Block),
    block("replicas", "replicas", BlockScope::Spec, BlockForm::Scalar),
    block("strategy", "strategy", BlockScope::Spec, BlockForm::Block),
    block("minReadySeconds", "minReadySeconds", BlockScope::Spec, BlockForm::Scalar),
    block("revisionHistoryLimit", "revisionHistoryLimit", BlockScope::Spec, BlockForm::Scalar),
    block("progressDeadlineSeconds", "progressDeadlineSeconds", BlockScope::Spec, BlockForm::Scalar),
    block("podAnnotations", "annotations", BlockScope::PodMetadata, BlockForm::Block),
    block("initContainers", "initContainers", BlockScope::PodSpec, BlockForm::Block),
    block("imagePullPolicy", "imagePullPolicy", BlockScope::Container, BlockForm::Scalar),
    block("command", "command", BlockScope::Container, BlockForm::Block),
    block("args", "args", BlockScope::Container, BlockForm::Block),
    block("workingDir", "workingDir", BlockScope::Container, BlockForm::Block),
    block("ports", "ports", BlockScope::Container, BlockForm::Block),
    block("env", "env", BlockScope::Container, BlockForm::Block),
    block("envFrom", "envFrom", BlockScope::Container, BlockForm::Block),
    probe("livenessProbe"),
    probe("readinessProbe"),
    probe("startupProbe"),
    block("resources", "resources", BlockScope::Container, BlockForm::Block),
    block("volumeMounts", "volumeMounts", BlockScope::Container, BlockForm::Block),
    block("lifecycle", "lifecycle", BlockScope::Container, BlockForm::Block),
    block("securityContext", "securityContext", BlockScope::Container, BlockForm::Block),
    block("podSecurityContext", "securityContext", BlockScope::PodSpec, BlockForm::Block),
    block("serviceAccountName", "serviceAccountName", BlockScope::PodSpec, BlockForm::Scalar),
    block("terminationGracePeriodSeconds", "terminationGracePeriodSeconds", BlockScope::PodSpec, BlockForm::Scalar),
    block("hostNetwork", "hostNetwork", BlockScope::PodSpec, BlockForm::Scalar),
    block("dnsPolicy", "dnsPolicy", BlockScope::PodSpec, BlockForm::Scalar),
    block("priorityClassName", "priorityClassName", BlockScope::PodSpec, BlockForm::Scalar),
    block("nodeSelector", "nodeSelector", BlockScope::PodSpec, BlockForm::Block),
    block("affinity", "affinity", BlockScope::PodSpec, BlockForm::Block),
    block("tolerations", "tolerations", BlockScope::PodSpec, BlockForm::Block),
    block("imagePullSecrets", "imagePullSecrets", BlockScope::PodSpec, BlockForm::Block),
    block("volumes", "volumes", BlockScope::PodSpec, BlockForm::Block),
];

/// Service blocks, in template emission order
pub static SERVICE_BLOCKS: &[BlockSpec] = &[
    block("serviceAnnotations", "annotations", BlockScope::Metadata, BlockForm::Block),
    block("type", "type", BlockScope::Spec, BlockForm::Scalar),
    block("clusterIP", "clusterIP", BlockScope::Spec, BlockForm::Scalar),
    block("sessionAffinity", "sessionAffinity", BlockScope::Spec, BlockForm::Scalar),
    block("externalTrafficPolicy", "externalTrafficPolicy", BlockScope::Spec, BlockForm::Scalar),
    block("loadBalancerIP", "loadBalancerIP", BlockScope::Spec, BlockForm::Scalar),
    BlockSpec {
        id: "ports",
        key: "ports",
        scope: BlockScope::Spec,
        form: BlockForm::Block,
        repeats: true,
        variants: &[],
        item_mandatory: &["port"],
    },
];

/// ServiceAccount blocks; values for these nest under `serviceAccount`
pub static SERVICE_ACCOUNT_BLOCKS: &[BlockSpec] = &[
    block("annotations", "annotations", BlockScope::Metadata, BlockForm::Block),
    block("imagePullSecrets", "imagePullSecrets", BlockScope::Resource, BlockForm::Block),
    block("secrets", "secrets", BlockScope::Resource, BlockForm::Block),
    block("automountServiceAccountToken", "automountServiceAccountToken", BlockScope::Resource, BlockForm::Scalar),
];

/// Catalog for a resource kind; `Other` has none
pub fn blocks_for(kind: ResourceKind) -> &'static [BlockSpec] {
    match kind {
        ResourceKind::Deployment => DEPLOYMENT_BLOCKS,
        ResourceKind::Service => SERVICE_BLOCKS,
        ResourceKind::ServiceAccount => SERVICE_ACCOUNT_BLOCKS,
        ResourceKind::Other => &[],
    }
}

// =============================================================================
// SKELETON-OWNED KEYS
// =============================================================================
//
// These fields are reconstructed by the template skeleton from the service
// name and the chart helpers; they are never relocated into values and the
// dynamic sweep skips them.

/// Always-present container fields emitted by the skeleton
pub static MANDATORY_CONTAINER_FIELDS: Set<&'static str> = phf_set! {"name", "image"};

/// Document-root keys owned by every skeleton
pub static ROOT_SKELETON_KEYS: Set<&'static str> = phf_set! {"apiVersion", "kind", "metadata", "spec"};

/// Metadata keys owned by every skeleton
pub static METADATA_SKELETON_KEYS: Set<&'static str> = phf_set! {"name", "labels"};

/// Deployment `spec` keys owned by the skeleton
pub static DEPLOYMENT_SPEC_SKELETON_KEYS: Set<&'static str> = phf_set! {"selector", "template"};

/// Pod template `spec` keys owned by the skeleton
pub static POD_SPEC_SKELETON_KEYS: Set<&'static str> = phf_set! {"containers"};

/// Pod template `metadata` keys owned by the skeleton
pub static POD_METADATA_SKELETON_KEYS: Set<&'static str> = phf_set! {"labels"};

/// Service `spec` keys owned by the skeleton
pub static SERVICE_SPEC_SKELETON_KEYS: Set<&'static str> = phf_set! {"selector"};

/// Catalog keys registered for a scope, used to separate dynamic discoveries
pub fn catalog_keys(kind: ResourceKind, scope: BlockScope) -> Vec<&'static str> {
    blocks_for(kind)
        .iter()
        .filter(|spec| spec.scope == scope)
        .map(|spec| spec.key)
        .collect()
}

/// Find a catalog entry by id
pub fn lookup(kind: ResourceKind, id: &str) -> Option<&'static BlockSpec> {
    blocks_for(kind).iter().find(|spec| spec.id == id)
}
