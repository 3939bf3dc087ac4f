//! Per-element processing (§4.F): turning one resource or source's `input`
//! or `access` into a descriptor entry with a concrete, uploaded-if-needed
//! `access` and (where applicable) a digest.

use ocm_spec::{
    Access, AccessOrInputElement, CopyPolicy, ElementMeta, Identity, Relation, Resource, ResourceDescriptor, Source,
    SourceDescriptor,
};
use tokio::sync::Semaphore;

use crate::error::ConstructError;
use crate::options::{ConstructOptions, ExternalCopyPolicy};
use crate::providers::{Credentials, InputOutcome};

async fn resolve_credentials(
    options: &ConstructOptions,
    kind: &str,
    hint: &serde_json::Value,
    component: &Identity,
    element: &str,
) -> Credentials {
    let Some(provider) = &options.credentials else {
        return Credentials::new();
    };
    match provider.resolve(kind, hint).await {
        Ok(credentials) => credentials,
        Err(err) => {
            tracing::warn!(
                component = %component,
                element,
                kind,
                error = %err,
                "credential resolution failed; continuing without credentials"
            );
            Credentials::new()
        }
    }
}

/// An element without an explicit `version` inherits the enclosing
/// component's version (I5, §4.F).
fn with_inherited_version(mut meta: ElementMeta, component: &Identity) -> ElementMeta {
    if meta.version.is_none() {
        meta.version = component.version().map(str::to_string);
    }
    meta
}

async fn access_from_outcome(
    options: &ConstructOptions,
    component: &Identity,
    element: &str,
    outcome: InputOutcome,
) -> Result<Access, ConstructError> {
    match outcome {
        InputOutcome::Access(access) => Ok(access),
        InputOutcome::Blob { media_type, blob } => {
            let media_type = media_type.unwrap_or_default();
            options
                .target
                .add_local_blob(component, &media_type, blob.as_ref())
                .await
                .map_err(|source| ConstructError::UploadFailed {
                    component: component.canonical_string(),
                    source,
                })
        }
    }
}

/// Builds the resolved `access` for a resource, dispatching on `input` vs.
/// `access` per invariant I3 (exactly one is set — already validated at
/// parse time, so the `NoAccessOrInput` branch here is a defence against
/// callers that construct a `Resource` by hand rather than via the wire
/// format).
pub async fn process_resource(
    component: &Identity,
    resource: &Resource,
    options: &ConstructOptions,
    semaphore: &Semaphore,
) -> Result<ResourceDescriptor, ConstructError> {
    let _permit = semaphore
        .acquire()
        .await
        .expect("semaphore is never closed while the build is running");
    let element = resource.meta.name.as_str();

    let from_input = resource.input().is_some();
    let access = if let Some(input) = resource.input() {
        let kind = input.kind().unwrap_or_default().to_string();
        let method = options
            .resource_input_methods
            .get(&kind)
            .ok_or_else(|| ConstructError::UnresolvableInputMethod {
                component: component.canonical_string(),
                element: element.to_string(),
                kind: kind.clone(),
            })?;
        let credentials = resolve_credentials(options, &kind, input.as_value(), component, element).await;
        let outcome = method
            .process(input, &credentials)
            .await
            .map_err(|source| ConstructError::InputMethodFailed {
                component: component.canonical_string(),
                element: element.to_string(),
                source,
            })?;
        access_from_outcome(options, component, element, outcome).await?
    } else if let Some(access) = resource.access() {
        access.clone()
    } else {
        return Err(ConstructError::NoAccessOrInput {
            component: component.canonical_string(),
            element: element.to_string(),
        });
    };

    let (access, digest) = if access.is_local_blob() {
        (access, None)
    } else {
        match resource.copy_policy {
            Some(CopyPolicy::ByValue) => copy_by_value(component, element, access, options).await?,
            None => {
                let digest = digest_access(component, element, &access, options).await?;
                (access, digest)
            }
        }
    };

    // I6: an `input`-built resource defaults to `local`; a by-reference
    // (`access`) resource defaults to `external` (§3, §4.F).
    let default_relation = if from_input { Relation::Local } else { Relation::External };

    Ok(ResourceDescriptor {
        meta: with_inherited_version(resource.meta.clone(), component),
        type_: resource.type_.clone(),
        relation: resource.relation.unwrap_or(default_relation),
        copy_policy: None,
        access,
        digest,
    })
}

async fn copy_by_value(
    component: &Identity,
    element: &str,
    access: Access,
    options: &ConstructOptions,
) -> Result<(Access, Option<ocm_spec::Digest>), ConstructError> {
    let Some(repository) = options.resource_repositories.find(&access) else {
        return match options.external_copy_policy {
            ExternalCopyPolicy::Skip => {
                let digest = digest_access(component, element, &access, options).await?;
                Ok((access, digest))
            }
            ExternalCopyPolicy::CopyOrFail => Err(ConstructError::NoResourceRepository {
                component: component.canonical_string(),
                element: element.to_string(),
            }),
        };
    };

    let kind = access.kind().unwrap_or_default().to_string();
    let credentials = resolve_credentials(options, &kind, access.as_value(), component, element).await;
    let blob = repository
        .download(&access, &credentials)
        .await
        .map_err(|source| ConstructError::DownloadFailed {
            component: component.canonical_string(),
            element: element.to_string(),
            source,
        })?;
    let media_type = blob.media_type().map(str::to_string).unwrap_or_default();
    let local_access = options
        .target
        .add_local_blob(component, &media_type, blob.as_ref())
        .await
        .map_err(|source| ConstructError::UploadFailed {
            component: component.canonical_string(),
            source,
        })?;
    Ok((local_access, None))
}

async fn digest_access(
    component: &Identity,
    element: &str,
    access: &Access,
    options: &ConstructOptions,
) -> Result<Option<ocm_spec::Digest>, ConstructError> {
    let Some(processor) = options.digest_processors.find(access) else {
        return Ok(None);
    };
    let kind = access.kind().unwrap_or_default().to_string();
    let credentials = resolve_credentials(options, &kind, access.as_value(), component, element).await;
    processor
        .digest(access, &credentials)
        .await
        .map(Some)
        .map_err(|source| ConstructError::DigestProcessingFailed {
            component: component.canonical_string(),
            element: element.to_string(),
            source,
        })
}

/// Sources never carry `relation`/`copyPolicy` (§4.A), so their processing is
/// the input/access dispatch plus a best-effort digest, without the
/// by-value-copy branch `process_resource` has.
pub async fn process_source(
    component: &Identity,
    source: &Source,
    options: &ConstructOptions,
    semaphore: &Semaphore,
) -> Result<SourceDescriptor, ConstructError> {
    let _permit = semaphore
        .acquire()
        .await
        .expect("semaphore is never closed while the build is running");
    let element = source.meta.name.as_str();

    let access = if let Some(input) = source.input() {
        let kind = input.kind().unwrap_or_default().to_string();
        let method = options
            .source_input_methods
            .get(&kind)
            .ok_or_else(|| ConstructError::UnresolvableInputMethod {
                component: component.canonical_string(),
                element: element.to_string(),
                kind: kind.clone(),
            })?;
        let credentials = resolve_credentials(options, &kind, input.as_value(), component, element).await;
        let outcome = method
            .process(input, &credentials)
            .await
            .map_err(|source| ConstructError::InputMethodFailed {
                component: component.canonical_string(),
                element: element.to_string(),
                source,
            })?;
        access_from_outcome(options, component, element, outcome).await?
    } else if let Some(access) = source.access() {
        access.clone()
    } else {
        return Err(ConstructError::NoAccessOrInput {
            component: component.canonical_string(),
            element: element.to_string(),
        });
    };

    let digest = if access.is_local_blob() {
        None
    } else {
        digest_access(component, element, &access, options).await?
    };

    Ok(SourceDescriptor {
        meta: with_inherited_version(source.meta.clone(), component),
        type_: source.type_.clone(),
        access,
        digest,
    })
}
