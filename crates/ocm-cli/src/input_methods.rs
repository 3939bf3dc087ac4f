//! Reference `ResourceInputMethod`/`SourceInputMethod` implementations:
//! `utf8/v1` embeds a literal string, `file/v1` reads a local file lazily.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use camino::Utf8PathBuf;
use ocm_construct::providers::{Blob, BoxAsyncRead, Credentials, InputOutcome, ResourceInputMethod, SourceInputMethod};
use ocm_construct::ProviderError;
use ocm_spec::Input;
use serde::Deserialize;
use tokio::io::{AsyncRead, ReadBuf};

struct BytesBlob {
    bytes: Vec<u8>,
    media_type: Option<String>,
}

struct BytesReader {
    bytes: Vec<u8>,
    position: usize,
}

impl AsyncRead for BytesReader {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        let remaining = &self.bytes[self.position..];
        let amount = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..amount]);
        self.position += amount;
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl Blob for BytesBlob {
    async fn reader(&self) -> Result<BoxAsyncRead, ProviderError> {
        Ok(Box::pin(BytesReader {
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

struct FileBlob {
    path: Utf8PathBuf,
    media_type: Option<String>,
}

#[async_trait]
impl Blob for FileBlob {
    async fn reader(&self) -> Result<BoxAsyncRead, ProviderError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|err| format!("opening `{}`: {err}", self.path))?;
        Ok(Box::pin(file))
    }

    fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Utf8Shape {
    content: String,
    #[serde(default)]
    media_type: Option<String>,
}

fn parse_utf8(input: &Input) -> Result<Utf8Shape, ProviderError> {
    serde_json::from_value(input.as_value().clone()).map_err(|err| format!("invalid utf8/v1 input: {err}").into())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileShape {
    path: Utf8PathBuf,
    #[serde(default)]
    media_type: Option<String>,
}

fn parse_file(input: &Input) -> Result<FileShape, ProviderError> {
    serde_json::from_value(input.as_value().clone()).map_err(|err| format!("invalid file/v1 input: {err}").into())
}

/// `{"type": "utf8/v1", "content": "...", "mediaType": "..."}`: the input's
/// bytes are the UTF-8 encoding of `content` itself.
pub struct Utf8InputMethod;

#[async_trait]
impl ResourceInputMethod for Utf8InputMethod {
    fn kind(&self) -> &str {
        "utf8/v1"
    }

    async fn process(&self, input: &Input, _credentials: &Credentials) -> Result<InputOutcome, ProviderError> {
        let shape = parse_utf8(input)?;
        Ok(InputOutcome::Blob {
            media_type: shape.media_type,
            blob: Box::new(BytesBlob {
                bytes: shape.content.into_bytes(),
                media_type: None,
            }),
        })
    }
}

#[async_trait]
impl SourceInputMethod for Utf8InputMethod {
    fn kind(&self) -> &str {
        "utf8/v1"
    }

    async fn process(&self, input: &Input, _credentials: &Credentials) -> Result<InputOutcome, ProviderError> {
        ResourceInputMethod::process(self, input, _credentials).await
    }
}

/// `{"type": "file/v1", "path": "...", "mediaType": "..."}`: the input's
/// bytes are the content of the local file at `path`, read lazily when the
/// engine actually uploads it.
pub struct FileInputMethod;

#[async_trait]
impl ResourceInputMethod for FileInputMethod {
    fn kind(&self) -> &str {
        "file/v1"
    }

    async fn process(&self, input: &Input, _credentials: &Credentials) -> Result<InputOutcome, ProviderError> {
        let shape = parse_file(input)?;
        Ok(InputOutcome::Blob {
            media_type: shape.media_type,
            blob: Box::new(FileBlob {
                path: shape.path,
                media_type: None,
            }),
        })
    }
}

#[async_trait]
impl SourceInputMethod for FileInputMethod {
    fn kind(&self) -> &str {
        "file/v1"
    }

    async fn process(&self, input: &Input, _credentials: &Credentials) -> Result<InputOutcome, ProviderError> {
        ResourceInputMethod::process(self, input, _credentials).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn utf8_input_embeds_the_content_verbatim() {
        let input = Input::new(serde_json::json!({"type": "utf8/v1", "content": "hello"}));
        let outcome = ResourceInputMethod::process(&Utf8InputMethod, &input, &Credentials::new())
            .await
            .unwrap();
        let InputOutcome::Blob { blob, .. } = outcome else {
            panic!("expected a Blob outcome");
        };
        let mut reader = blob.reader().await.unwrap();
        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buf).await.unwrap();
        assert_eq!(buf, b"hello");
    }

    #[tokio::test]
    async fn file_input_reads_the_file_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.txt");
        std::fs::write(&path, b"from disk").unwrap();
        let input = Input::new(serde_json::json!({
            "type": "file/v1",
            "path": path.to_str().unwrap(),
        }));
        let outcome = ResourceInputMethod::process(&FileInputMethod, &input, &Credentials::new())
            .await
            .unwrap();
        let InputOutcome::Blob { blob, .. } = outcome else {
            panic!("expected a Blob outcome");
        };
        let mut reader = blob.reader().await.unwrap();
        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buf).await.unwrap();
        assert_eq!(buf, b"from disk");
    }
}
