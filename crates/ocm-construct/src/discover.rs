//! Resolution of component versions the current build doesn't define itself
//! (§4.B "Discoverer/Resolver"): reference targets outside the constructor
//! document, and conflict checks against versions the target repository
//! already holds.

use ocm_spec::{ComponentDescriptor, Identity};

use crate::error::{ConstructError, NotFoundError};
use crate::options::ConstructOptions;
use crate::providers::{ExternalComponentRepository, TargetRepository};

pub struct Resolver<'a> {
    target: &'a dyn TargetRepository,
    external: Option<&'a dyn ExternalComponentRepository>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        target: &'a dyn TargetRepository,
        external: Option<&'a dyn ExternalComponentRepository>,
    ) -> Self {
        Self { target, external }
    }

    pub fn from_options(options: &'a ConstructOptions) -> Self {
        Self::new(options.target.as_ref(), options.external_components.as_deref())
    }

    pub fn target(&self) -> &'a dyn TargetRepository {
        self.target
    }

    /// Resolve a reference target that has no definition in the constructor
    /// document: first check whether the target repository already built
    /// it, then fall back to the external component repository if one was
    /// configured. Returns [`ConstructError::NotFound`] if neither has it.
    pub async fn resolve_external(&self, identity: &Identity) -> Result<ComponentDescriptor, ConstructError> {
        match self.target.get_component_version(identity).await {
            Ok(descriptor) => return Ok(descriptor),
            Err(err) if NotFoundError::matches(&err) => {}
            Err(err) => {
                return Err(ConstructError::Repository {
                    identity: identity.canonical_string(),
                    source: err,
                })
            }
        }

        let Some(external) = self.external else {
            return Err(ConstructError::NotFound {
                identity: identity.canonical_string(),
            });
        };

        external.get_component_version(identity).await.map_err(|err| {
            if NotFoundError::matches(&err) {
                ConstructError::NotFound {
                    identity: identity.canonical_string(),
                }
            } else {
                ConstructError::Repository {
                    identity: identity.canonical_string(),
                    source: err,
                }
            }
        })
    }

    /// Look up a version already present in the target repository, for
    /// conflict-policy decisions over a locally-defined component (§4.E).
    /// `Ok(None)` means there is nothing to conflict with.
    pub async fn existing(&self, identity: &Identity) -> Result<Option<ComponentDescriptor>, ConstructError> {
        match self.target.get_component_version(identity).await {
            Ok(descriptor) => Ok(Some(descriptor)),
            Err(err) if NotFoundError::matches(&err) => Ok(None),
            Err(err) => Err(ConstructError::Repository {
                identity: identity.canonical_string(),
                source: err,
            }),
        }
    }
}
