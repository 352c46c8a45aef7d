use serde::{Deserialize, Serialize};

/// A relation that the backend returns either as an id or populated inline
///
/// List endpoints populate `property`, `owner`, `assignee` and friends with a
/// few fields; create endpoints usually return the raw id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference<T> {
    Id(String),
    Expanded(T),
}

impl<T> Reference<T> {
    /// The populated document, if present
    pub fn expanded(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Expanded(value) => Some(value),
        }
    }
}

/// Documents that carry their own id
pub trait Identified {
    fn id(&self) -> &str;
}

impl<T: Identified> Reference<T> {
    /// Id of the referenced document in either form
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Expanded(value) => value.id(),
        }
    }
}
