use serde::{Deserialize, Serialize};

/// Delimiters that stop keystroke combining: whitespace and common punctuation.
pub const DEFAULT_DELIMITERS: &str = "\n\r \t,.;()[]{}";

/// When adjacent document edits are merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CombineMode {
    /// Merge edits whose text contains none of the delimiters.
    #[default]
    Delimited,
    /// Never merge; one macro per observed change.
    Never,
    /// Merge every adjacent edit regardless of its text.
    Always,
}

impl std::str::FromStr for CombineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delimited" => Ok(Self::Delimited),
            "never" => Ok(Self::Never),
            "always" => Ok(Self::Always),
            other => Err(format!("unknown combine mode: {other}")),
        }
    }
}

/// Combining policy of a recorder or listener.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CombinatorSettings {
    /// When to merge.
    pub mode: CombineMode,
    /// Delimiter chars for [`CombineMode::Delimited`].
    pub delimiters: String,
}

impl Default for CombinatorSettings {
    fn default() -> Self {
        Self {
            mode: CombineMode::Delimited,
            delimiters: DEFAULT_DELIMITERS.to_string(),
        }
    }
}

impl CombinatorSettings {
    /// Policy that never merges.
    pub fn never() -> Self {
        Self {
            mode: CombineMode::Never,
            ..Self::default()
        }
    }

    /// Policy that merges every adjacent edit.
    pub fn always() -> Self {
        Self {
            mode: CombineMode::Always,
            ..Self::default()
        }
    }

    /// Policy with a custom delimiter set.
    pub fn delimited(delimiters: impl Into<String>) -> Self {
        Self {
            mode: CombineMode::Delimited,
            delimiters: delimiters.into(),
        }
    }
}
