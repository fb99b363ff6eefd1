use serde::{Deserialize, Serialize};

/// Path decomposition settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathSettings {
    /// Extensions of files that get a file name and package.
    pub source_extensions: Vec<String>,
    /// Package name of files directly under a source root.
    pub default_package: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            source_extensions: vec![".java".to_string()],
            default_package: "(default package)".to_string(),
        }
    }
}
