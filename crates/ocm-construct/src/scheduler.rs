//! Bounded-concurrency orchestration over the dependency graph (§4.D, §5): a
//! single shared semaphore bounds how much component- and element-level work
//! runs at once, an async-aware memo cell per vertex lets fan-in dependents
//! share one resolution, and a cancellation signal stops unstarted work once
//! any branch fails outright.

use std::collections::HashMap;
use std::sync::Arc;

use ocm_spec::ComponentDescriptor;
use tokio::sync::{OnceCell, Semaphore};

use crate::cancel::Cancellation;
use crate::dag::{Dag, VertexId};
use crate::discover::Resolver;
use crate::error::ConstructError;
use crate::options::ConstructOptions;
use crate::processor::component;

type Cell = Arc<OnceCell<Result<ComponentDescriptor, ConstructError>>>;
type Cells = Arc<HashMap<VertexId, Cell>>;

/// Runs every vertex in `dag` to completion. Returns the descriptors of the
/// vertices defined in the original constructor document, in the order
/// [`Dag::build`] assigned them (i.e. the order components were given in).
pub async fn run(
    dag: Dag,
    options: Arc<ConstructOptions>,
) -> Result<Vec<ComponentDescriptor>, ConstructError> {
    let dag = Arc::new(dag);
    let cancellation = Arc::new(Cancellation::new());
    let semaphore = Arc::new(Semaphore::new(options.effective_concurrency_limit()));
    let cells: Cells = Arc::new(
        (0..dag.len() as VertexId)
            .map(|id| (id, Arc::new(OnceCell::new())))
            .collect(),
    );

    let local_ids: Vec<VertexId> = (0..dag.len() as VertexId)
        .filter(|&id| dag.vertex(id).is_local())
        .collect();

    let mut handles = Vec::with_capacity(local_ids.len());
    for id in &local_ids {
        let id = *id;
        let dag = Arc::clone(&dag);
        let options = Arc::clone(&options);
        let cancellation = Arc::clone(&cancellation);
        let semaphore = Arc::clone(&semaphore);
        let cells = Arc::clone(&cells);
        handles.push(tokio::spawn(async move {
            resolve(id, dag, options, cancellation, semaphore, cells).await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let result = handle
            .await
            .map_err(|err| ConstructError::Internal(format!("component task panicked: {err}")))?;
        results.push(result?);
    }
    Ok(results)
}

/// Resolves `id`, sharing the result with any other caller racing to resolve
/// the same vertex via its `OnceCell`.
fn resolve(
    id: VertexId,
    dag: Arc<Dag>,
    options: Arc<ConstructOptions>,
    cancellation: Arc<Cancellation>,
    semaphore: Arc<Semaphore>,
    cells: Cells,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<ComponentDescriptor, ConstructError>> + Send>> {
    Box::pin(async move {
        let cell = Arc::clone(cells.get(&id).expect("every vertex has a cell"));
        cell.get_or_init(|| async {
            resolve_uncached(id, &dag, &options, &cancellation, &semaphore, &cells).await
        })
        .await
        .clone()
    })
}

async fn resolve_uncached(
    id: VertexId,
    dag: &Arc<Dag>,
    options: &Arc<ConstructOptions>,
    cancellation: &Arc<Cancellation>,
    semaphore: &Arc<Semaphore>,
    cells: &Cells,
) -> Result<ComponentDescriptor, ConstructError> {
    let mut dependencies = HashMap::new();
    for dep_id in dag.dependencies(id) {
        let descriptor = resolve(
            dep_id,
            Arc::clone(dag),
            Arc::clone(options),
            Arc::clone(cancellation),
            Arc::clone(semaphore),
            Arc::clone(cells),
        )
        .await?;
        dependencies.insert(dep_id, descriptor);
    }

    if cancellation.is_cancelled() {
        return Err(ConstructError::Cancelled);
    }

    let vertex = dag.vertex(id);
    let resolver = Resolver::from_options(options);
    let result = component::process(vertex, dag, &dependencies, &resolver, options, semaphore).await;

    if let Err(err) = &result {
        if !matches!(err, ConstructError::Cancelled) {
            tracing::warn!(component = %vertex.identity, error = %err, "component resolution failed, cancelling remaining unstarted work");
            cancellation.cancel();
        }
    }

    result
}
