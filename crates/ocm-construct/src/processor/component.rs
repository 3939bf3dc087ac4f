//! Per-component processing (§4.E): conflict handling against the target
//! repository, fanning resources and sources out to the element processor,
//! assembling the references array, and persisting the finished descriptor.

use std::collections::HashMap;
use std::sync::Arc;

use ocm_spec::{Component, ComponentDescriptor, Identity, ReferenceDescriptor};
use tokio::sync::Semaphore;

use crate::dag::{Dag, Vertex, VertexId, VertexSource};
use crate::digest::descriptor_digest;
use crate::discover::Resolver;
use crate::error::ConstructError;
use crate::options::{ConflictPolicy, ConstructOptions};
use crate::processor::element::{process_resource, process_source};

/// Resolves one DAG vertex to a built or already-known `ComponentDescriptor`.
/// `dependencies` holds the already-resolved descriptors of every vertex
/// `vertex` points at by reference; the caller guarantees they were
/// processed first (§4.D: reverse-topological order).
pub async fn process(
    vertex: &Vertex,
    dag: &Dag,
    dependencies: &HashMap<VertexId, ComponentDescriptor>,
    resolver: &Resolver<'_>,
    options: &Arc<ConstructOptions>,
    semaphore: &Arc<Semaphore>,
) -> Result<ComponentDescriptor, ConstructError> {
    match &vertex.source {
        VertexSource::External => resolver.resolve_external(&vertex.identity).await,
        VertexSource::Local(component) => {
            process_local(component, &vertex.identity, dag, dependencies, resolver, options, semaphore).await
        }
    }
}

async fn process_local(
    component: &Component,
    identity: &Identity,
    dag: &Dag,
    dependencies: &HashMap<VertexId, ComponentDescriptor>,
    resolver: &Resolver<'_>,
    options: &Arc<ConstructOptions>,
    semaphore: &Arc<Semaphore>,
) -> Result<ComponentDescriptor, ConstructError> {
    if let Some(existing) = resolver.existing(identity).await? {
        match options.conflict_policy {
            ConflictPolicy::AbortAndFail => {
                return Err(ConstructError::AlreadyExists {
                    identity: identity.canonical_string(),
                })
            }
            ConflictPolicy::Skip => {
                if let Some(callbacks) = &options.callbacks {
                    callbacks.on_component_skipped(identity);
                }
                return Ok(existing);
            }
            ConflictPolicy::Replace => {
                if let Some(callbacks) = &options.callbacks {
                    callbacks.on_conflict(identity, ConflictPolicy::Replace);
                }
            }
        }
    }
    if let Some(callbacks) = &options.callbacks {
        callbacks.on_component_resolved(identity);
    }

    let resources = fan_out_resources(identity, component, options, semaphore).await?;
    let sources = fan_out_sources(identity, component, options, semaphore).await?;
    let references = build_references(component, dag, dependencies)?;

    let descriptor = ComponentDescriptor {
        name: component.name.clone(),
        version: component.version.clone(),
        provider: component.provider.clone(),
        labels: component.labels.clone(),
        resources,
        sources,
        references,
        creation_time: component.creation_time.clone(),
    };

    {
        let _permit = semaphore
            .acquire()
            .await
            .expect("semaphore is never closed while the build is running");
        options
            .target
            .add_component_version(&descriptor)
            .await
            .map_err(|source| ConstructError::UploadFailed {
                component: identity.canonical_string(),
                source,
            })?;
    }

    if let Some(callbacks) = &options.callbacks {
        callbacks.on_component_built(&descriptor);
    }

    tracing::debug!(component = %identity, "component version built");
    Ok(descriptor)
}

async fn fan_out_resources(
    identity: &Identity,
    component: &Component,
    options: &Arc<ConstructOptions>,
    semaphore: &Arc<Semaphore>,
) -> Result<Vec<ocm_spec::ResourceDescriptor>, ConstructError> {
    let mut handles = Vec::with_capacity(component.resources.len());
    for resource in component.resources.clone() {
        let identity = identity.clone();
        let options = Arc::clone(options);
        let semaphore = Arc::clone(semaphore);
        handles.push(tokio::spawn(async move {
            process_resource(&identity, &resource, options.as_ref(), semaphore.as_ref()).await
        }));
    }
    let mut resources = Vec::with_capacity(handles.len());
    for handle in handles {
        let result = handle
            .await
            .map_err(|err| ConstructError::Internal(format!("resource task panicked: {err}")))?;
        resources.push(result?);
    }
    Ok(resources)
}

async fn fan_out_sources(
    identity: &Identity,
    component: &Component,
    options: &Arc<ConstructOptions>,
    semaphore: &Arc<Semaphore>,
) -> Result<Vec<ocm_spec::SourceDescriptor>, ConstructError> {
    let mut handles = Vec::with_capacity(component.sources.len());
    for source in component.sources.clone() {
        let identity = identity.clone();
        let options = Arc::clone(options);
        let semaphore = Arc::clone(semaphore);
        handles.push(tokio::spawn(async move {
            process_source(&identity, &source, options.as_ref(), semaphore.as_ref()).await
        }));
    }
    let mut sources = Vec::with_capacity(handles.len());
    for handle in handles {
        let result = handle
            .await
            .map_err(|err| ConstructError::Internal(format!("source task panicked: {err}")))?;
        sources.push(result?);
    }
    Ok(sources)
}

fn build_references(
    component: &Component,
    dag: &Dag,
    dependencies: &HashMap<VertexId, ComponentDescriptor>,
) -> Result<Vec<ReferenceDescriptor>, ConstructError> {
    let mut references = Vec::with_capacity(component.references.len());
    for reference in &component.references {
        let target_identity = reference.to_component_identity();
        let target_id = dag.find(&target_identity).ok_or_else(|| {
            ConstructError::Internal(format!(
                "reference target `{target_identity}` missing from the dependency graph"
            ))
        })?;
        let target_descriptor = dependencies.get(&target_id).ok_or_else(|| {
            ConstructError::Internal(format!(
                "reference target `{target_identity}` was not resolved before its dependent"
            ))
        })?;
        references.push(ReferenceDescriptor {
            meta: reference.meta.clone(),
            component: reference.component.clone(),
            version: reference.version.clone(),
            digest: Some(descriptor_digest(target_descriptor)),
        });
    }
    Ok(references)
}
