use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Category tag of a submitted name.
///
/// Only `punny` and `serious` can be chosen for new records. Any other value
/// found in a stored document is kept verbatim so rewriting the document
/// never loses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Punny,
    Serious,
    Other(String),
}

impl Category {
    pub const RECOGNIZED: [Category; 2] = [Category::Punny, Category::Serious];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Punny => "punny",
            Category::Serious => "serious",
            Category::Other(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Category::Other(_))
    }
}

impl Default for Category {
    fn default() -> Self { Category::Other(String::new()) }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "punny" => Category::Punny,
            "serious" => Category::Serious,
            _ => Category::Other(raw),
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        match c {
            Category::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Strict parse used for user input: only recognized categories pass.
impl FromStr for Category {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let c = Category::from(s.trim().to_ascii_lowercase());
        if c.is_recognized() {
            Ok(c)
        } else {
            Err(ModelError::Validation(format!(
                "unknown category '{}' (expected punny or serious)",
                s.trim()
            )))
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
