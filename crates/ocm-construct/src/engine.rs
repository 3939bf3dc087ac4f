use std::sync::Arc;

use ocm_spec::{ComponentConstructor, ComponentDescriptor};

use crate::dag::Dag;
use crate::error::ConstructError;
use crate::options::ConstructOptions;
use crate::scheduler;

/// Builds every component in `constructor`, returning their descriptors in
/// the order the components were given in the document.
///
/// This is the engine's single public entry point (§2): it validates the
/// constructor document (I3/I7), builds and acyclicity-checks the reference
/// graph (I1), then runs the bounded-concurrency scheduler over it (§4.D,
/// §5), persisting each built descriptor through `options`'s
/// `TargetRepository`.
#[tracing::instrument(skip_all, fields(components = constructor.components.len()))]
pub async fn construct(
    constructor: ComponentConstructor,
    options: ConstructOptions,
) -> Result<Vec<ComponentDescriptor>, ConstructError> {
    for component in &constructor.components {
        component.validate()?;
    }
    let dag = Dag::build(constructor.components)?;
    scheduler::run(dag, Arc::new(options)).await
}
