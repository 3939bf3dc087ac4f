//! In-memory provider test doubles shared by the integration tests below.
//! None of these are part of the engine's public API — they exist only to
//! drive `ocm_construct::construct` end to end without any real filesystem
//! or network access.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use async_trait::async_trait;
use ocm_spec::{Access, ComponentDescriptor, Digest, Identity, Input};
use ocm_construct::error::{NotFoundError, ProviderError};
use ocm_construct::providers::{
    Blob, BoxAsyncRead, Credentials, CredentialProvider, ExternalComponentRepository,
    InputOutcome, ResourceDigestProcessor, ResourceInputMethod, ResourceRepository,
    SourceInputMethod, TargetRepository,
};
use sha2::{Digest as _, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

/// A `Blob` backed by an in-memory byte vector.
pub struct MemoryBlob {
    bytes: Vec<u8>,
    media_type: Option<String>,
}

impl MemoryBlob {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: None,
        }
    }

    pub fn with_media_type(bytes: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: Some(media_type.into()),
        }
    }
}

struct MemoryReader {
    bytes: Vec<u8>,
    position: usize,
}

impl AsyncRead for MemoryReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let remaining = &self.bytes[self.position..];
        let amount = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..amount]);
        self.position += amount;
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl Blob for MemoryBlob {
    async fn reader(&self) -> Result<BoxAsyncRead, ProviderError> {
        Ok(Box::pin(MemoryReader {
            bytes: self.bytes.clone(),
            position: 0,
        }))
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.bytes.len() as u64)
    }

    fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }
}

async fn read_all(blob: &dyn Blob) -> Result<Vec<u8>, ProviderError> {
    let mut reader = blob.reader().await?;
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .await
        .map_err(|err| Box::new(err) as ProviderError)?;
    Ok(buf)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// A `TargetRepository` that keeps built descriptors and local blobs in
/// memory, standing in for the filesystem CTF reference implementation.
#[derive(Default)]
pub struct InMemoryTargetRepository {
    descriptors: Mutex<HashMap<String, ComponentDescriptor>>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryTargetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, descriptor: ComponentDescriptor) {
        let identity = descriptor.to_identity().canonical_string();
        self.descriptors.lock().unwrap().insert(identity, descriptor);
    }

    pub fn component_count(&self) -> usize {
        self.descriptors.lock().unwrap().len()
    }
}

#[async_trait]
impl TargetRepository for InMemoryTargetRepository {
    async fn get_component_version(&self, identity: &Identity) -> Result<ComponentDescriptor, ProviderError> {
        self.descriptors
            .lock()
            .unwrap()
            .get(&identity.canonical_string())
            .cloned()
            .ok_or_else(|| {
                Box::new(NotFoundError::new(
                    identity.name().unwrap_or_default(),
                    identity.version().unwrap_or_default(),
                )) as ProviderError
            })
    }

    async fn add_component_version(&self, descriptor: &ComponentDescriptor) -> Result<(), ProviderError> {
        let identity = descriptor.to_identity().canonical_string();
        self.descriptors.lock().unwrap().insert(identity, descriptor.clone());
        Ok(())
    }

    async fn add_local_blob(
        &self,
        _component: &Identity,
        media_type: &str,
        blob: &dyn Blob,
    ) -> Result<Access, ProviderError> {
        let bytes = read_all(blob).await?;
        let reference = format!("sha256:{}", sha256_hex(&bytes));
        self.blobs.lock().unwrap().insert(reference.clone(), bytes);
        Ok(Access::local_blob(media_type, reference, None))
    }
}

/// A `ResourceInputMethod`/`SourceInputMethod` handling `"test/v1"` inputs by
/// echoing back a fixed payload as a local blob, or failing if configured to.
pub struct EchoInputMethod {
    pub should_fail: bool,
}

impl EchoInputMethod {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn failing() -> Self {
        Self { should_fail: true }
    }
}

fn echo_payload(input: &Input) -> Vec<u8> {
    input
        .as_value()
        .get("payload")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .as_bytes()
        .to_vec()
}

#[async_trait]
impl ResourceInputMethod for EchoInputMethod {
    fn kind(&self) -> &str {
        "test/v1"
    }

    async fn process(&self, input: &Input, _credentials: &Credentials) -> Result<InputOutcome, ProviderError> {
        if self.should_fail {
            return Err("echo input method configured to fail".into());
        }
        Ok(InputOutcome::Blob {
            media_type: Some("text/plain".to_string()),
            blob: Box::new(MemoryBlob::new(echo_payload(input))),
        })
    }
}

#[async_trait]
impl SourceInputMethod for EchoInputMethod {
    fn kind(&self) -> &str {
        "test/v1"
    }

    async fn process(&self, input: &Input, _credentials: &Credentials) -> Result<InputOutcome, ProviderError> {
        if self.should_fail {
            return Err("echo input method configured to fail".into());
        }
        Ok(InputOutcome::Blob {
            media_type: Some("text/plain".to_string()),
            blob: Box::new(MemoryBlob::new(echo_payload(input))),
        })
    }
}

/// An `ExternalComponentRepository` backed by a fixed in-memory map, standing
/// in for an already-published upstream component.
#[derive(Default)]
pub struct InMemoryExternalRepository {
    descriptors: HashMap<String, ComponentDescriptor>,
}

impl InMemoryExternalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, descriptor: ComponentDescriptor) -> Self {
        let identity = descriptor.to_identity().canonical_string();
        self.descriptors.insert(identity, descriptor);
        self
    }
}

#[async_trait]
impl ExternalComponentRepository for InMemoryExternalRepository {
    async fn get_component_version(&self, identity: &Identity) -> Result<ComponentDescriptor, ProviderError> {
        self.descriptors
            .get(&identity.canonical_string())
            .cloned()
            .ok_or_else(|| {
                Box::new(NotFoundError::new(
                    identity.name().unwrap_or_default(),
                    identity.version().unwrap_or_default(),
                )) as ProviderError
            })
    }
}

/// Claims every `access`, returning a digest derived from its JSON form, so
/// by-reference resources/sources in tests don't silently end up with no
/// digest.
pub struct FixedDigestProcessor;

#[async_trait]
impl ResourceDigestProcessor for FixedDigestProcessor {
    fn handles(&self, _access: &Access) -> bool {
        true
    }

    async fn digest(&self, access: &Access, _credentials: &Credentials) -> Result<Digest, ProviderError> {
        let bytes = serde_json::to_vec(access.as_value()).unwrap_or_default();
        Ok(Digest {
            hash_algorithm: "SHA-256".to_string(),
            normalisation_algorithm: None,
            value: sha256_hex(&bytes),
        })
    }
}

/// Claims no resource repository, forcing `copyPolicy: byValue` resources
/// through the external-copy-policy path in tests.
pub struct NoResourceRepositories;

#[async_trait]
impl ResourceRepository for NoResourceRepositories {
    fn handles(&self, _access: &Access) -> bool {
        false
    }

    async fn download(&self, _access: &Access, _credentials: &Credentials) -> Result<Box<dyn Blob>, ProviderError> {
        unreachable!("handles() always returns false")
    }
}

/// A no-op credential provider returning an empty map, used where tests
/// don't exercise credential resolution at all.
#[derive(Default)]
pub struct NoCredentials;

#[async_trait]
impl CredentialProvider for NoCredentials {
    async fn resolve(&self, _kind: &str, _hint: &serde_json::Value) -> Result<Credentials, ProviderError> {
        Ok(Credentials::new())
    }
}
