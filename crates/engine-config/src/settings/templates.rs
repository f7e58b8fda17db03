use crate::settings::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("Capitalize", "Capitalize all text in this cell."),
    ("To Uppercase", "Convert all text to uppercase."),
    ("To Lowercase", "Convert all text to lowercase."),
    (
        "Remove Extra Spaces",
        "Remove all extra whitespace, including double spaces and leading/trailing spaces.",
    ),
    ("Format Date", "Format this as a standard date (YYYY-MM-DD)."),
    ("Format Phone Number", "Format this as a standard phone number."),
    ("Format Currency", "Format this as a standard currency value."),
    ("Extract Numbers", "Extract all numbers from this text."),
    (
        "Format Email",
        "Format this as a proper email address (lowercase, no extra spaces).",
    ),
    ("Summarize", "Summarize this text in one sentence."),
    ("Fix Grammar", "Fix any grammar or spelling errors in this text."),
    (
        "Formalize",
        "Rewrite this text in a more formal, professional tone.",
    ),
    ("Translate to English", "Translate this text to English."),
    (
        "Remove HTML Tags",
        "Remove all HTML tags from this text, keeping only the content.",
    ),
    (
        "Fill Blank",
        "Complete the blank or missing information in this cell based on context from surrounding cells.",
    ),
    (
        "Format Name",
        "Format this name with proper capitalization and spacing.",
    ),
];

/// Named user-prompt instructions.
///
/// The built-in set is always present after loading; entries from the
/// settings file are layered on top and win on name clashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct TemplateLibrary {
    entries: BTreeMap<String, String>,
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        let entries = BUILTIN_TEMPLATES
            .iter()
            .map(|(name, prompt)| (name.to_string(), prompt.to_string()))
            .collect();
        TemplateLibrary { entries }
    }
}

impl From<BTreeMap<String, String>> for TemplateLibrary {
    fn from(user: BTreeMap<String, String>) -> Self {
        let mut library = TemplateLibrary::default();
        library.entries.extend(user);
        library
    }
}

impl From<TemplateLibrary> for BTreeMap<String, String> {
    fn from(library: TemplateLibrary) -> Self {
        library.entries
    }
}

impl TemplateLibrary {
    pub fn empty() -> Self {
        TemplateLibrary {
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Exact lookup first, then a case-insensitive match.
    pub fn find(&self, name: &str) -> Option<&str> {
        self.get(name).or_else(|| {
            self.entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn resolve(&self, name: &str) -> Result<&str, SettingsError> {
        self.find(name)
            .ok_or_else(|| SettingsError::UnknownTemplate(name.to_string()))
    }

    pub fn add(
        &mut self,
        name: impl Into<String>,
        prompt: impl Into<String>,
        overwrite: bool,
    ) -> Result<(), SettingsError> {
        let name = name.into();
        if !overwrite && self.entries.contains_key(&name) {
            return Err(SettingsError::DuplicateTemplate(name));
        }
        self.entries.insert(name, prompt.into());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<String, SettingsError> {
        self.entries
            .remove(name)
            .ok_or_else(|| SettingsError::UnknownTemplate(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
