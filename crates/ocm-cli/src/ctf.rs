//! A filesystem-backed "common transport format" `TargetRepository`: each
//! component version lives at `<root>/<name>/<version>/descriptor.json`, and
//! local blobs live in a shared `<root>/blobs/<algorithm>/<digest>` content
//! pool addressed by their own hash, so two components sharing a blob only
//! ever store it once.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use ocm_construct::providers::{Blob, TargetRepository};
use ocm_construct::{NotFoundError, ProviderError};
use ocm_spec::{Access, ComponentDescriptor, Identity};
use sha2::{Digest as _, Sha256};
use tokio::io::AsyncReadExt;

pub struct FilesystemCtf {
    root: Utf8PathBuf,
}

impl FilesystemCtf {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn component_dir(&self, identity: &Identity) -> Utf8PathBuf {
        self.root
            .join(sanitize(identity.name().unwrap_or_default()))
            .join(sanitize(identity.version().unwrap_or_default()))
    }

    fn descriptor_path(&self, identity: &Identity) -> Utf8PathBuf {
        self.component_dir(identity).join("descriptor.json")
    }

    fn blob_path(&self, local_reference: &str) -> Utf8PathBuf {
        let (algorithm, digest) = local_reference.split_once(':').unwrap_or(("sha256", local_reference));
        self.root.join("blobs").join(algorithm).join(digest)
    }

    /// Bundles the whole repository root into a `.tar` archive, e.g. for
    /// handing off to something that pushes it to an OCI registry.
    pub fn export_tar(&self, destination: &Utf8Path) -> std::io::Result<()> {
        let file = fs_err::File::create(destination)?;
        let mut builder = tar::Builder::new(file);
        builder.append_dir_all(".", self.root.as_std_path())?;
        builder.finish()
    }
}

/// Component names are typically reverse-DNS-like (`ocm.software/app`) and
/// contain path separators; replace them so each identity component maps to
/// exactly one directory segment.
fn sanitize(segment: &str) -> String {
    segment.replace('/', "_")
}

/// Writes `contents` to `path` only if it doesn't already hold exactly those
/// bytes, so re-running a build that changed nothing doesn't touch mtimes.
fn persist_if_changed(path: &Utf8Path, contents: &[u8]) -> std::io::Result<()> {
    if let Ok(existing) = fs_err::read(path) {
        if existing == contents {
            return Ok(());
        }
    }
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path, contents)
}

#[async_trait]
impl TargetRepository for FilesystemCtf {
    async fn get_component_version(&self, identity: &Identity) -> Result<ComponentDescriptor, ProviderError> {
        let path = self.descriptor_path(identity);
        let name = identity.name().unwrap_or_default().to_string();
        let version = identity.version().unwrap_or_default().to_string();
        tokio::task::spawn_blocking(move || match fs_err::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| Box::new(err) as ProviderError),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Box::new(NotFoundError::new(name, version)) as ProviderError)
            }
            Err(err) => Err(Box::new(err) as ProviderError),
        })
        .await
        .map_err(|err| Box::new(std::io::Error::other(err.to_string())) as ProviderError)?
    }

    async fn add_component_version(&self, descriptor: &ComponentDescriptor) -> Result<(), ProviderError> {
        let path = self.descriptor_path(&descriptor.to_identity());
        let bytes = serde_json::to_vec_pretty(descriptor).map_err(|err| Box::new(err) as ProviderError)?;
        tokio::task::spawn_blocking(move || persist_if_changed(&path, &bytes))
            .await
            .map_err(|err| Box::new(std::io::Error::other(err.to_string())) as ProviderError)?
            .map_err(|err| Box::new(err) as ProviderError)
    }

    async fn add_local_blob(
        &self,
        component: &Identity,
        media_type: &str,
        blob: &dyn Blob,
    ) -> Result<Access, ProviderError> {
        let mut reader = blob.reader().await?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .await
            .map_err(|err| Box::new(err) as ProviderError)?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let local_reference = format!("sha256:{}", hex::encode(hasher.finalize()));

        let path = self.blob_path(&local_reference);
        tokio::task::spawn_blocking(move || persist_if_changed(&path, &bytes))
            .await
            .map_err(|err| Box::new(std::io::Error::other(err.to_string())) as ProviderError)?
            .map_err(|err| Box::new(err) as ProviderError)?;

        tracing::debug!(component = %component, local_reference, "stored local blob");
        Ok(Access::local_blob(media_type, local_reference, None))
    }
}
