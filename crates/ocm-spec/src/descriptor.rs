use serde::{Deserialize, Serialize};

use crate::access::Access;
use crate::constructor::{ElementMeta, Label, Relation};

/// A content digest, attached to a by-reference element after digest
/// processing (§4.F) or used to pin a reference entry to the content of the
/// child component version it points at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Digest {
    pub hash_algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalisation_algorithm: Option<String>,
    pub value: String,
}

/// A resource entry in an output descriptor. `access` is always populated
/// (invariant I2); `input` never appears (invariant I3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    #[serde(flatten)]
    pub meta: ElementMeta,
    #[serde(rename = "type")]
    pub type_: String,
    pub relation: Relation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_policy: Option<crate::constructor::CopyPolicy>,
    pub access: Access,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
}

/// A source entry in an output descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    #[serde(flatten)]
    pub meta: ElementMeta,
    #[serde(rename = "type")]
    pub type_: String,
    pub access: Access,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
}

/// A reference entry in an output descriptor, carrying the digest information
/// needed to identify the exact content of the component version it points at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDescriptor {
    #[serde(flatten)]
    pub meta: ElementMeta,
    pub component: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
}

/// The output metadata document representing a built component version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
}

impl ComponentDescriptor {
    pub fn to_identity(&self) -> crate::identity::Identity {
        crate::identity::Identity::component(self.name.clone(), self.version.clone())
    }
}
