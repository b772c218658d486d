//! Declarative field and form descriptions.
//!
//! These are plain serializable records: the form generator assembles
//! them, the host form surface instantiates them. Nothing here holds live
//! state or callbacks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use propgrid_model::ChoiceItem;

/// Rendering kind of a generated field, in the host form's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Boolean,
    Text,
    Comment,
    Dropdown,
    Tagbox,
    Checkbox,
    MatrixDynamic,
}

/// Declarative description of one rendered input, merged from a strategy's
/// output plus the generator's generic overrides (name, visibility,
/// read-only, required, title).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visible: bool,
    pub is_read_only: bool,
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_as: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_update_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_options_caption: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_select_all: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnDescriptor>,
    /// Row detail panel for matrix-shaped fields, generated from a
    /// representative element with nested flattening.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<FormDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_row_count: Option<usize>,
}

impl FieldDescriptor {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            name: String::new(),
            title: None,
            description: None,
            visible: true,
            is_read_only: false,
            is_required: false,
            is_unique: false,
            default_value: None,
            input_type: None,
            render_as: None,
            title_location: None,
            text_update_mode: None,
            min: None,
            max: None,
            choices: Vec::new(),
            options_caption: None,
            show_options_caption: None,
            has_select_all: None,
            columns: Vec::new(),
            detail: None,
            max_row_count: None,
        }
    }

    /// Converts a generated field into the host's matrix-column
    /// vocabulary: `type` becomes `cellType`, `isReadOnly` becomes
    /// `readOnly`.
    pub fn into_column(self) -> ColumnDescriptor {
        ColumnDescriptor {
            name: self.name,
            cell_type: self.kind,
            title: self.title,
            read_only: self.is_read_only,
            is_required: self.is_required,
            is_unique: self.is_unique,
            visible: self.visible,
            input_type: self.input_type,
            choices: self.choices,
        }
    }
}

/// Column of a matrix-shaped field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    pub cell_type: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_unique: bool,
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceItem>,
}

/// Initial expansion state of a category panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelState {
    Expanded,
    Collapsed,
}

/// A named, titled, collapsible grouping of fields (one category/tab).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelDescriptor {
    pub name: String,
    pub title: String,
    pub state: PanelState,
    pub elements: Vec<FieldDescriptor>,
}

impl PanelDescriptor {
    pub fn new(name: &str, title: String, is_first: bool) -> Self {
        Self {
            name: name.to_string(),
            title,
            state: if is_first {
                PanelState::Expanded
            } else {
                PanelState::Collapsed
            },
            elements: Vec::new(),
        }
    }
}

/// Top-level element of a form description. Nested generation splices the
/// first category's fields directly at this level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormElement {
    Panel(PanelDescriptor),
    Field(FieldDescriptor),
}

/// Ordered description of a whole generated form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormDescription {
    pub elements: Vec<FormElement>,
}

impl FormDescription {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All field descriptors, panel contents flattened in order.
    pub fn fields(&self) -> Vec<&FieldDescriptor> {
        let mut out = Vec::new();
        for element in &self.elements {
            match element {
                FormElement::Field(f) => out.push(f),
                FormElement::Panel(p) => out.extend(p.elements.iter()),
            }
        }
        out
    }

    pub fn panels(&self) -> Vec<&PanelDescriptor> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                FormElement::Panel(p) => Some(p),
                FormElement::Field(_) => None,
            })
            .collect()
    }
}
