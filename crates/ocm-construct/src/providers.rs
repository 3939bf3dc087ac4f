//! The plugin surface (§6): everything the engine delegates to rather than
//! implements itself. `ocm-construct` only ever sees these trait objects —
//! concrete implementations (filesystem CTF, OCI, git, env-var credentials,
//! ...) live downstream, e.g. in `ocm-cli`.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use ocm_spec::{Access, ComponentDescriptor, Digest, Identity, Input};
use tokio::io::AsyncRead;

use crate::error::ProviderError;

/// An asynchronously-readable artifact. Input methods and `ResourceRepository`
/// downloads hand the engine a `Blob` rather than a `Vec<u8>` so large
/// artifacts never have to be buffered in memory end to end.
pub type BoxAsyncRead = Pin<Box<dyn AsyncRead + Send + Unpin>>;

#[async_trait]
pub trait Blob: Send + Sync {
    /// Open a fresh reader positioned at the start of the content. May be
    /// called more than once (e.g. once to upload, once to digest).
    async fn reader(&self) -> Result<BoxAsyncRead, ProviderError>;

    /// Exact size in bytes, if known without reading the content.
    fn size_hint(&self) -> Option<u64> {
        None
    }

    /// The media type the blob should be stored/uploaded under, if the
    /// producer knows one more specific than the caller's default.
    fn media_type(&self) -> Option<&str> {
        None
    }
}

/// Resolved secret material for a single provider invocation. Opaque
/// key/value pairs; providers agree on the keys they expect out of band.
pub type Credentials = HashMap<String, String>;

/// Resolves credentials for a `type`-tagged access or input payload (§4.F:
/// "best effort — absence of a provider, or of the credentials themselves, is
/// not fatal unless the method actually requires them").
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(&self, kind: &str, hint: &serde_json::Value) -> Result<Credentials, ProviderError>;
}

/// The result of running an input method: either the method already knows
/// where the artifact lives (`Access`), or it produced new bytes that the
/// engine must store as a local blob before it can build an `Access`.
pub enum InputOutcome {
    Access(Access),
    Blob {
        media_type: Option<String>,
        blob: Box<dyn Blob>,
    },
}

/// Builds a resource artifact from an `input` recipe (§4.F). One
/// implementation per `type` tag; the engine dispatches by `kind()`.
#[async_trait]
pub trait ResourceInputMethod: Send + Sync {
    fn kind(&self) -> &str;
    async fn process(&self, input: &Input, credentials: &Credentials) -> Result<InputOutcome, ProviderError>;
}

/// Builds a source artifact from an `input` recipe. Distinct from
/// `ResourceInputMethod` because sources never carry `relation`/`copyPolicy`
/// (§4.A), even though most kinds (e.g. `utf8`, `file`) make sense for both.
#[async_trait]
pub trait SourceInputMethod: Send + Sync {
    fn kind(&self) -> &str;
    async fn process(&self, input: &Input, credentials: &Credentials) -> Result<InputOutcome, ProviderError>;
}

/// Downloads the bytes behind a by-reference `access`, used when
/// `copyPolicy: byValue` asks the engine to pull external content into the
/// target repository as a local blob.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    fn handles(&self, access: &Access) -> bool;
    async fn download(&self, access: &Access, credentials: &Credentials) -> Result<Box<dyn Blob>, ProviderError>;
}

/// Computes a content digest for a by-reference `access` that is staying
/// by-reference (i.e. `copyPolicy` is unset), so the descriptor can still
/// pin the exact content without copying it.
#[async_trait]
pub trait ResourceDigestProcessor: Send + Sync {
    fn handles(&self, access: &Access) -> bool;
    async fn digest(&self, access: &Access, credentials: &Credentials) -> Result<Digest, ProviderError>;
}

/// Resolves a `Reference` that points outside the current constructor
/// document, by fetching the target component's descriptor from wherever it
/// was already published.
#[async_trait]
pub trait ExternalComponentRepository: Send + Sync {
    async fn get_component_version(&self, identity: &Identity) -> Result<ComponentDescriptor, ProviderError>;
}

/// The output side: where built component versions and their local blobs are
/// persisted (§4.G). `get_component_version` returns the `NotFoundError`
/// sentinel (boxed) when absent, distinguishing "not built yet" from any
/// other repository failure.
#[async_trait]
pub trait TargetRepository: Send + Sync {
    async fn get_component_version(&self, identity: &Identity) -> Result<ComponentDescriptor, ProviderError>;

    async fn add_component_version(&self, descriptor: &ComponentDescriptor) -> Result<(), ProviderError>;

    /// Store `blob`'s content under `component`, returning the `localBlob`
    /// access to record on the descriptor (invariant I4: empty media type is
    /// the repository's responsibility to default, handled by
    /// `Access::local_blob`).
    async fn add_local_blob(
        &self,
        component: &Identity,
        media_type: &str,
        blob: &dyn Blob,
    ) -> Result<Access, ProviderError>;
}

/// Looks a registered provider up by the `type` tag it declares via
/// `kind()`. One registry per provider family, built once per `Construct`
/// invocation from whatever the caller passed in `ConstructOptions`.
pub struct KindRegistry<T: ?Sized> {
    by_kind: HashMap<String, Arc<T>>,
}

impl<T> KindRegistry<T>
where
    T: ?Sized,
{
    pub fn new() -> Self {
        Self {
            by_kind: HashMap::new(),
        }
    }

    pub fn get(&self, kind: &str) -> Option<Arc<T>> {
        self.by_kind.get(kind).cloned()
    }
}

impl<T: ?Sized> Default for KindRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! kind_registry_insert {
    ($trait:ident) => {
        impl KindRegistry<dyn $trait> {
            pub fn insert(&mut self, provider: Arc<dyn $trait>) -> &mut Self {
                self.by_kind.insert(provider.kind().to_string(), provider);
                self
            }
        }
    };
}

kind_registry_insert!(ResourceInputMethod);
kind_registry_insert!(SourceInputMethod);

/// Registry for providers selected by probing `handles()` in registration
/// order, since they aren't keyed by a single tag (an access's shape alone
/// decides which repository/digest-processor claims it).
pub struct ProbeRegistry<T: ?Sized> {
    providers: Vec<Arc<T>>,
}

impl<T> ProbeRegistry<T>
where
    T: ?Sized,
{
    pub fn new() -> Self {
        Self { providers: Vec::new() }
    }

    pub fn push(&mut self, provider: Arc<T>) -> &mut Self {
        self.providers.push(provider);
        self
    }
}

impl<T: ?Sized> Default for ProbeRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeRegistry<dyn ResourceRepository> {
    pub fn find(&self, access: &Access) -> Option<Arc<dyn ResourceRepository>> {
        self.providers.iter().find(|p| p.handles(access)).cloned()
    }
}

impl ProbeRegistry<dyn ResourceDigestProcessor> {
    pub fn find(&self, access: &Access) -> Option<Arc<dyn ResourceDigestProcessor>> {
        self.providers.iter().find(|p| p.handles(access)).cloned()
    }
}
