use serde::{Deserialize, Serialize};

/// How host commands are classified.
///
/// Category and command identifiers default to the Eclipse platform's.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandSettings {
    /// Category-id suffixes of commands that are recorded.
    pub recordable_categories: Vec<String>,
    /// Category-id suffix of refactoring commands.
    pub refactoring_category: String,
    /// Commands that cut text.
    pub cut: Vec<String>,
    /// Commands that paste text.
    pub paste: Vec<String>,
    /// Commands that save files.
    pub save: Vec<String>,
    /// Commands that copy text.
    pub copy: Vec<String>,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            recordable_categories: vec![
                "category.file".to_string(),
                "category.edit".to_string(),
                "category.textEdit".to_string(),
                "category.refactoring".to_string(),
            ],
            refactoring_category: "category.refactoring".to_string(),
            cut: vec!["org.eclipse.ui.edit.cut".to_string()],
            paste: vec!["org.eclipse.ui.edit.paste".to_string()],
            save: vec![
                "org.eclipse.ui.file.save".to_string(),
                "org.eclipse.ui.file.saveAll".to_string(),
            ],
            copy: vec![
                "org.eclipse.ui.edit.copy".to_string(),
                "org.eclipse.jdt.ui.edit.text.java.copy.qualified.name".to_string(),
            ],
        }
    }
}

impl CommandSettings {
    /// Whether commands in `category` are recorded.
    pub fn is_recordable(&self, category: &str) -> bool {
        self.recordable_categories
            .iter()
            .any(|suffix| category.ends_with(suffix.as_str()))
    }

    /// Whether `category` is the refactoring category.
    pub fn is_refactoring(&self, category: &str) -> bool {
        !self.refactoring_category.is_empty() && category.ends_with(&self.refactoring_category)
    }

    /// Whether `command_id` cuts text.
    pub fn is_cut(&self, command_id: &str) -> bool {
        self.cut.iter().any(|c| c == command_id)
    }

    /// Whether `command_id` pastes text.
    pub fn is_paste(&self, command_id: &str) -> bool {
        self.paste.iter().any(|c| c == command_id)
    }

    /// Whether `command_id` saves files.
    pub fn is_save(&self, command_id: &str) -> bool {
        self.save.iter().any(|c| c == command_id)
    }

    /// Whether `command_id` copies text.
    pub fn is_copy(&self, command_id: &str) -> bool {
        self.copy.iter().any(|c| c == command_id)
    }
}
