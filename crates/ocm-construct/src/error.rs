/// The error type returned by any provider implementation (`TargetRepository`,
/// input methods, credential/digest/external providers). Boxed so the engine
/// never has to know about concrete provider error types.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The sentinel `NotFound` error (§7), checkable by equality so callers can
/// distinguish "absent" from any other repository failure without downcasting
/// through `dyn Error`'s `Any` machinery at every call site.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("component version `{component}:{version}` not found")]
pub struct NotFoundError {
    pub component: String,
    pub version: String,
}

impl NotFoundError {
    pub fn new(component: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            version: version.into(),
        }
    }

    /// Check whether a boxed provider error is (or wraps) a `NotFoundError`.
    pub fn matches(err: &ProviderError) -> bool {
        err.downcast_ref::<NotFoundError>().is_some()
    }
}

/// All failure modes of the construction engine (§7). Variants carry the
/// component/element identity involved, per the requirement that error
/// messages surface that identity to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ConstructError {
    #[error(transparent)]
    InvalidSpec(#[from] ocm_spec::InvalidSpec),

    #[error("reference cycle detected: {}", .identities.join(" -> "))]
    CycleDetected { identities: Vec<String> },

    #[error("component version `{identity}` not found in the constructor or any external repository")]
    NotFound { identity: String },

    #[error("component version `{identity}` already exists in the target repository")]
    AlreadyExists { identity: String },

    #[error(
        "no input method registered for input kind `{kind}` (element `{element}` of component `{component}`)"
    )]
    UnresolvableInputMethod {
        component: String,
        element: String,
        kind: String,
    },

    #[error(
        "element `{element}` of component `{component}` has `copyPolicy: byValue` but no registered resource repository can download its access, and the external-copy policy is `copyOrFail`"
    )]
    NoResourceRepository { component: String, element: String },

    #[error("input method failed for element `{element}` of component `{component}`")]
    InputMethodFailed {
        component: String,
        element: String,
        #[source]
        source: ProviderError,
    },

    #[error("download failed for element `{element}` of component `{component}`")]
    DownloadFailed {
        component: String,
        element: String,
        #[source]
        source: ProviderError,
    },

    #[error("digest processing failed for element `{element}` of component `{component}`")]
    DigestProcessingFailed {
        component: String,
        element: String,
        #[source]
        source: ProviderError,
    },

    #[error("uploading component `{component}` failed")]
    UploadFailed {
        component: String,
        #[source]
        source: ProviderError,
    },

    #[error(
        "element `{element}` of component `{component}` has neither `access` nor `input` set"
    )]
    NoAccessOrInput { component: String, element: String },

    #[error("build cancelled after an earlier failure")]
    Cancelled,

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("repository error for component `{identity}`")]
    Repository {
        identity: String,
        #[source]
        source: ProviderError,
    },
}

pub type ConstructResult<T> = Result<T, ConstructError>;
