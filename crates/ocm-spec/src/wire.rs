use serde::{Deserialize, Deserializer, Serialize};

use crate::constructor::Component;

/// The root of a constructor document. Two shapes are accepted on the wire: a
/// `{ "components": [...] }` object, or a single bare `Component`, which is
/// transparently wrapped into a one-element array.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComponentConstructor {
    pub components: Vec<Component>,
}

impl ComponentConstructor {
    pub fn new(components: Vec<Component>) -> Self {
        Self { components }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Root {
    Wrapped { components: Vec<Component> },
    Single(Component),
}

impl<'de> Deserialize<'de> for ComponentConstructor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Root::deserialize(deserializer)? {
            Root::Wrapped { components } => ComponentConstructor { components },
            Root::Single(component) => ComponentConstructor {
                components: vec![component],
            },
        })
    }
}
