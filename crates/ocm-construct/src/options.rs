//! Engine configuration: provider registries, concurrency and conflict
//! policies, and the callback hooks observers can plug into a build (§4.E,
//! §4.G, §5).

use std::sync::Arc;

use ocm_spec::{ComponentDescriptor, Identity};

use crate::providers::{
    CredentialProvider, ExternalComponentRepository, KindRegistry, ProbeRegistry,
    ResourceDigestProcessor, ResourceInputMethod, ResourceRepository, SourceInputMethod,
    TargetRepository,
};

/// What to do when the target repository already holds a component version
/// the current build is about to produce (§4.E).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Fail the whole build (default).
    AbortAndFail,
    /// Leave the existing version untouched and treat the component as done.
    Skip,
    /// Overwrite the existing version.
    Replace,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self::AbortAndFail
    }
}

/// What to do when a `copyPolicy: byValue` resource has no registered
/// `ResourceRepository` able to download it (§4.F).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternalCopyPolicy {
    /// Leave the resource by-reference instead of copying it (default, §4.G).
    Skip,
    /// Fail the build.
    CopyOrFail,
}

impl Default for ExternalCopyPolicy {
    fn default() -> Self {
        Self::Skip
    }
}

/// Observer hooks invoked as the build progresses. All methods have empty
/// default bodies; implement only the ones you care about.
pub trait Callbacks: Send + Sync {
    fn on_component_resolved(&self, _identity: &Identity) {}
    fn on_conflict(&self, _identity: &Identity, _policy: ConflictPolicy) {}
    fn on_component_built(&self, _descriptor: &ComponentDescriptor) {}
    fn on_component_skipped(&self, _identity: &Identity) {}
}

/// The provider set and policy knobs for a single `Construct` invocation.
/// Built with [`ConstructOptionsBuilder`].
pub struct ConstructOptions {
    pub(crate) target: Arc<dyn TargetRepository>,
    pub(crate) external_components: Option<Arc<dyn ExternalComponentRepository>>,
    pub(crate) credentials: Option<Arc<dyn CredentialProvider>>,
    pub(crate) resource_input_methods: KindRegistry<dyn ResourceInputMethod>,
    pub(crate) source_input_methods: KindRegistry<dyn SourceInputMethod>,
    pub(crate) resource_repositories: ProbeRegistry<dyn ResourceRepository>,
    pub(crate) digest_processors: ProbeRegistry<dyn ResourceDigestProcessor>,
    pub(crate) concurrency_limit: usize,
    pub(crate) conflict_policy: ConflictPolicy,
    pub(crate) external_copy_policy: ExternalCopyPolicy,
    pub(crate) callbacks: Option<Arc<dyn Callbacks>>,
}

impl ConstructOptions {
    pub fn builder(target: Arc<dyn TargetRepository>) -> ConstructOptionsBuilder {
        ConstructOptionsBuilder::new(target)
    }

    /// Effective concurrency budget: `0` means "default to the number of
    /// logical CPUs" (§5).
    pub(crate) fn effective_concurrency_limit(&self) -> usize {
        if self.concurrency_limit == 0 {
            num_cpus::get().max(1)
        } else {
            self.concurrency_limit
        }
    }
}

pub struct ConstructOptionsBuilder {
    target: Arc<dyn TargetRepository>,
    external_components: Option<Arc<dyn ExternalComponentRepository>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    resource_input_methods: KindRegistry<dyn ResourceInputMethod>,
    source_input_methods: KindRegistry<dyn SourceInputMethod>,
    resource_repositories: ProbeRegistry<dyn ResourceRepository>,
    digest_processors: ProbeRegistry<dyn ResourceDigestProcessor>,
    concurrency_limit: usize,
    conflict_policy: ConflictPolicy,
    external_copy_policy: ExternalCopyPolicy,
    callbacks: Option<Arc<dyn Callbacks>>,
}

impl ConstructOptionsBuilder {
    pub fn new(target: Arc<dyn TargetRepository>) -> Self {
        Self {
            target,
            external_components: None,
            credentials: None,
            resource_input_methods: KindRegistry::new(),
            source_input_methods: KindRegistry::new(),
            resource_repositories: ProbeRegistry::new(),
            digest_processors: ProbeRegistry::new(),
            concurrency_limit: 0,
            conflict_policy: ConflictPolicy::default(),
            external_copy_policy: ExternalCopyPolicy::default(),
            callbacks: None,
        }
    }

    pub fn external_components(mut self, repo: Arc<dyn ExternalComponentRepository>) -> Self {
        self.external_components = Some(repo);
        self
    }

    pub fn credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    pub fn resource_input_method(mut self, provider: Arc<dyn ResourceInputMethod>) -> Self {
        self.resource_input_methods.insert(provider);
        self
    }

    pub fn source_input_method(mut self, provider: Arc<dyn SourceInputMethod>) -> Self {
        self.source_input_methods.insert(provider);
        self
    }

    pub fn resource_repository(mut self, repo: Arc<dyn ResourceRepository>) -> Self {
        self.resource_repositories.push(repo);
        self
    }

    pub fn digest_processor(mut self, processor: Arc<dyn ResourceDigestProcessor>) -> Self {
        self.digest_processors.push(processor);
        self
    }

    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn external_copy_policy(mut self, policy: ExternalCopyPolicy) -> Self {
        self.external_copy_policy = policy;
        self
    }

    pub fn callbacks(mut self, callbacks: Arc<dyn Callbacks>) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    pub fn build(self) -> ConstructOptions {
        ConstructOptions {
            target: self.target,
            external_components: self.external_components,
            credentials: self.credentials,
            resource_input_methods: self.resource_input_methods,
            source_input_methods: self.source_input_methods,
            resource_repositories: self.resource_repositories,
            digest_processors: self.digest_processors,
            concurrency_limit: self.concurrency_limit,
            conflict_policy: self.conflict_policy,
            external_copy_policy: self.external_copy_policy,
            callbacks: self.callbacks,
        }
    }
}
