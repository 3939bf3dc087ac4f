use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::access::{Access, Input};
use crate::error::InvalidSpec;
use crate::identity::Identity;

/// A label attached to a component or element. The value is an open JSON value,
/// matching the descriptor format's treatment of labels as opaque payloads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub name: String,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing: Option<bool>,
}

/// Identity-bearing metadata shared by resources, sources and references.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra_identity: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
}

impl ElementMeta {
    /// `toIdentity()`: `{name, version} ∪ extraIdentity`.
    pub fn to_identity(&self) -> Identity {
        let mut id = Identity::new();
        id.insert("name", &self.name);
        if let Some(version) = &self.version {
            id.insert("version", version);
        }
        for (k, v) in &self.extra_identity {
            id.insert(k.clone(), v.clone());
        }
        id
    }
}

/// `relation ∈ {local, external, ""}`. `None` models the unset `""` state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Local,
    External,
}

/// `copyPolicy ∈ {"", byValue}`. `None` models the unset `""` state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CopyPolicy {
    ByValue,
}

/// Shared behaviour of elements that carry exactly one of `access`/`input`
/// (§4.A: `hasInput()`/`hasAccess()` are mutually exclusive).
pub trait AccessOrInputElement {
    fn access(&self) -> Option<&Access>;
    fn input(&self) -> Option<&Input>;

    fn has_access(&self) -> bool {
        self.access().is_some()
    }

    fn has_input(&self) -> bool {
        self.input().is_some()
    }
}

fn validate_exclusivity(
    component: &str,
    element: &str,
    access: Option<&Access>,
    input: Option<&Input>,
) -> Result<(), InvalidSpec> {
    match (access, input) {
        (Some(_), Some(_)) => Err(InvalidSpec::BothAccessAndInput {
            component: component.to_string(),
            element: element.to_string(),
        }),
        (None, None) => Err(InvalidSpec::NeitherAccessNorInput {
            component: component.to_string(),
            element: element.to_string(),
        }),
        _ => Ok(()),
    }
}

/// A data artifact attached to a component, built from an `input` recipe or
/// pointed at by an `access` locator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(flatten)]
    pub meta: ElementMeta,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_policy: Option<CopyPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Input>,
}

impl AccessOrInputElement for Resource {
    fn access(&self) -> Option<&Access> {
        self.access.as_ref()
    }

    fn input(&self) -> Option<&Input> {
        self.input.as_ref()
    }
}

impl Resource {
    /// Validates I3/I7: exactly one of `access`/`input`, and `copyPolicy` is
    /// only legal alongside `access`.
    pub fn validate(&self, component: &str) -> Result<(), InvalidSpec> {
        validate_exclusivity(component, &self.meta.name, self.access.as_ref(), self.input.as_ref())?;
        if self.input.is_some() {
            if let Some(policy) = self.copy_policy {
                return Err(match policy {
                    CopyPolicy::ByValue => InvalidSpec::ByValueWithInput {
                        component: component.to_string(),
                        element: self.meta.name.clone(),
                    },
                });
            }
        }
        Ok(())
    }
}

/// Provenance information (e.g. a Git reference) attached to a component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(flatten)]
    pub meta: ElementMeta,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Input>,
}

impl AccessOrInputElement for Source {
    fn access(&self) -> Option<&Access> {
        self.access.as_ref()
    }

    fn input(&self) -> Option<&Input> {
        self.input.as_ref()
    }
}

impl Source {
    pub fn validate(&self, component: &str) -> Result<(), InvalidSpec> {
        validate_exclusivity(component, &self.meta.name, self.access.as_ref(), self.input.as_ref())
    }
}

/// A typed pointer from one component version to another.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(flatten)]
    pub meta: ElementMeta,
    /// The target component's name.
    pub component: String,
    /// The target component's version.
    pub version: String,
}

impl Reference {
    /// `toComponentIdentity()`: `{name: ref.component, version: ref.version}`.
    pub fn to_component_identity(&self) -> Identity {
        Identity::component(self.component.clone(), self.version.clone())
    }
}

/// A named, versioned bundle of resources, sources and references, as given by
/// the user in the constructor document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
}

impl Component {
    /// `toIdentity()`/`toComponentIdentity()` for a component: `{name, version}`.
    pub fn to_identity(&self) -> Identity {
        Identity::component(self.name.clone(), self.version.clone())
    }

    /// Validates every resource and source, surfacing the first structural
    /// violation found.
    pub fn validate(&self) -> Result<(), InvalidSpec> {
        for resource in &self.resources {
            resource.validate(&self.name)?;
        }
        for source in &self.sources {
            source.validate(&self.name)?;
        }
        Ok(())
    }
}
