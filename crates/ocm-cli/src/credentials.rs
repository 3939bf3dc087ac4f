use async_trait::async_trait;
use ocm_construct::providers::{CredentialProvider, Credentials};
use ocm_construct::ProviderError;

const ENV_PREFIX: &str = "OCM_CRED_";

/// Reads credentials from `OCM_CRED_<KEY>` environment variables, lower-cased
/// into `<key>` entries of the returned map. Credentials are process-wide
/// rather than scoped to a particular access/input `kind` — providers that
/// need a specific key agree on its name with whoever populates the
/// environment.
#[derive(Default)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn resolve(&self, _kind: &str, _hint: &serde_json::Value) -> Result<Credentials, ProviderError> {
        let mut credentials = Credentials::new();
        for (key, value) in std::env::vars() {
            if let Some(suffix) = key.strip_prefix(ENV_PREFIX) {
                credentials.insert(suffix.to_lowercase(), value);
            }
        }
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_env_vars_yield_an_empty_map() {
        let provider = EnvCredentialProvider::new();
        let credentials = provider.resolve("anything/v1", &serde_json::Value::Null).await.unwrap();
        assert!(credentials.get("definitely-unset-test-key").is_none());
    }

    #[tokio::test]
    async fn prefixed_env_vars_are_collected_lowercased() {
        // SAFETY: test-only process-wide env mutation, scoped to this test's own key.
        unsafe {
            std::env::set_var("OCM_CRED_TOKEN", "s3cr3t");
        }
        let provider = EnvCredentialProvider::new();
        let credentials = provider.resolve("ociArtifact/v1", &serde_json::Value::Null).await.unwrap();
        unsafe {
            std::env::remove_var("OCM_CRED_TOKEN");
        }
        assert_eq!(credentials.get("token"), Some(&"s3cr3t".to_string()));
    }
}
