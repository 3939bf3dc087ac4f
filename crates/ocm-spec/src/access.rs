use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A typed, opaque locator for an artifact that already exists somewhere, or a
/// typed, opaque recipe for producing one at build time.
///
/// Both `access` and `input` are open-world sum types keyed by a `type:
/// "<kind>/<version>"` tag (§9 of the spec). The engine never inspects the
/// concrete kind or payload — only the provider registered for that kind does —
/// so both wrap a raw JSON value rather than a closed Rust enum. `serde_json::Value`
/// implements `Deserialize`/`Serialize` generically, so this works unmodified
/// whether the surrounding document was parsed as JSON or YAML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypedValue(Value);

impl TypedValue {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The `<kind>/<version>` tag, e.g. `"ociArtifact/v1"`.
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// A typed locator for an artifact that already exists somewhere.
pub type Access = TypedValue;

/// A typed recipe for producing an artifact at build time.
pub type Input = TypedValue;

pub const LOCAL_BLOB_KIND: &str = "localBlob/v1";
pub const DEFAULT_LOCAL_BLOB_MEDIA_TYPE: &str = "application/octet-stream";

/// An access pointing at a blob stored inside the target repository, addressed
/// by local reference and media type (§3 Descriptor, §4.F).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalBlobShape {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default = "default_media_type")]
    media_type: String,
    local_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    global_access: Option<TypedValue>,
}

fn default_media_type() -> String {
    DEFAULT_LOCAL_BLOB_MEDIA_TYPE.to_string()
}

impl Access {
    /// Build a local-blob access, defaulting an empty media type to
    /// `application/octet-stream` per invariant I4.
    pub fn local_blob(
        media_type: impl Into<String>,
        local_reference: impl Into<String>,
        global_access: Option<Access>,
    ) -> Self {
        let media_type = {
            let m = media_type.into();
            if m.is_empty() {
                DEFAULT_LOCAL_BLOB_MEDIA_TYPE.to_string()
            } else {
                m
            }
        };
        let shape = LocalBlobShape {
            kind: LOCAL_BLOB_KIND.to_string(),
            media_type,
            local_reference: local_reference.into(),
            global_access,
        };
        TypedValue(serde_json::to_value(shape).expect("LocalBlobShape always serializes"))
    }

    pub fn is_local_blob(&self) -> bool {
        self.kind() == Some(LOCAL_BLOB_KIND)
    }

    pub fn local_blob_media_type(&self) -> Option<&str> {
        if !self.is_local_blob() {
            return None;
        }
        self.0.get("mediaType").and_then(Value::as_str)
    }

    pub fn local_blob_reference(&self) -> Option<&str> {
        if !self.is_local_blob() {
            return None;
        }
        self.0.get("localReference").and_then(Value::as_str)
    }
}
