use std::collections::HashMap;

/// String-by-key lookup for editor UI text.
///
/// Ships a small built-in English table for the keys the grid core uses
/// (`pe.tabs.<name>`, `pe.<propertyName>`, `pe.propertyIsEmpty`, locale
/// display names, `qt.<cellType>`, `pv.<value>`); hosts override or extend
/// it with [`Localization::set`]. Unknown property and tab names fall back
/// to a humanized form of the key.
#[derive(Debug, Clone)]
pub struct Localization {
    strings: HashMap<String, String>,
}

impl Default for Localization {
    fn default() -> Self {
        let mut strings = HashMap::new();
        for (key, value) in [
            ("pe.propertyIsEmpty", "Please enter a value"),
            ("pe.conditionSelectQuestion", "Select question..."),
            ("pe.tabs.general", "General"),
            ("pe.tabs.data", "Data"),
            ("pe.tabs.logic", "Logic"),
            ("pe.tabs.layout", "Layout"),
            ("pe.tabs.validation", "Validation"),
            ("pe.tabs.choices", "Choices"),
            ("pe.tabs.columns", "Columns"),
            ("pe.name", "Name"),
            ("pe.title", "Title"),
            ("pe.description", "Description"),
            ("pe.visible", "Is visible"),
            ("pe.isRequired", "Is required"),
            ("pe.readOnly", "Is read-only"),
            ("pe.cellType", "Cell type"),
            ("pe.choices", "Choices"),
            ("pe.page", "Page"),
            ("locale.en", "English"),
            ("locale.de", "Deutsch"),
            ("locale.fr", "Français"),
            ("qt.text", "Single Input"),
            ("qt.dropdown", "Dropdown"),
            ("qt.checkbox", "Checkbox"),
            ("qt.boolean", "Boolean"),
        ] {
            strings.insert(key.to_string(), value.to_string());
        }
        Self { strings }
    }
}

impl Localization {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    /// Overrides or adds one entry.
    pub fn set(&mut self, key: &str, value: &str) {
        self.strings.insert(key.to_string(), value.to_string());
    }

    /// Tab title: `pe.tabs.<name>` lookup, humanized name otherwise.
    pub fn tab_title(&self, name: &str) -> String {
        self.get(&format!("pe.tabs.{name}"))
            .map(str::to_string)
            .unwrap_or_else(|| humanize(name))
    }

    /// Property title: `pe.<name>` lookup, humanized name otherwise.
    pub fn property_name(&self, name: &str) -> String {
        self.get(&format!("pe.{name}"))
            .map(str::to_string)
            .unwrap_or_else(|| humanize(name))
    }

    /// Display text for an enumerated property value, if any.
    pub fn property_value(&self, value: &str) -> Option<String> {
        self.get(&format!("pv.{value}")).map(str::to_string)
    }

    /// Display name of a locale code, if known.
    pub fn locale_name(&self, code: &str) -> Option<String> {
        self.get(&format!("locale.{code}")).map(str::to_string)
    }

    /// Display name of a question/cell type, if known.
    pub fn question_type_name(&self, type_name: &str) -> Option<String> {
        self.get(&format!("qt.{type_name}")).map(str::to_string)
    }

    /// Error text for a required property left empty.
    pub fn property_is_empty(&self) -> String {
        self.get("pe.propertyIsEmpty")
            .unwrap_or("Please enter a value")
            .to_string()
    }
}

/// `camelCaseName` → `Camel case name`.
fn humanize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if i == 0 {
            out.extend(ch.to_uppercase());
        } else if ch.is_uppercase() {
            out.push(' ');
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanize_camel_case() {
        assert_eq!(humanize("cellType"), "Cell type");
        assert_eq!(humanize("showOtherItem"), "Show other item");
        assert_eq!(humanize("name"), "Name");
    }

    #[test]
    fn tab_title_prefers_table() {
        let loc = Localization::default();
        assert_eq!(loc.tab_title("general"), "General");
        assert_eq!(loc.tab_title("myCustomTab"), "My custom tab");
    }

    #[test]
    fn override_wins() {
        let mut loc = Localization::default();
        loc.set("pe.tabs.general", "Allgemein");
        assert_eq!(loc.tab_title("general"), "Allgemein");
    }
}
