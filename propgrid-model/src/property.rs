use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::object::ObjectRef;

/// Declared type tag of a property. Flat so the serialized form stays a
/// plain string (`"string_array"`, `"question_value"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Boolean,
    Switch,
    String,
    Number,
    Text,
    Html,
    Color,
    Set,
    StringArray,
    Question,
    QuestionSelectBase,
    QuestionValue,
    /// Collection of simple choice items, edited as matrix rows.
    ItemValues,
    /// Collection of column definitions, edited as matrix rows.
    Columns,
}

/// Restricts where a property appears: the full form, or only the column
/// ("list") rendering of a collection. `None` on the descriptor means both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowMode {
    Form,
    List,
}

/// One selectable choice for a choice-bearing property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceItem {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ChoiceItem {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            text: None,
        }
    }

    pub fn with_text(value: impl Into<Value>, text: &str) -> Self {
        Self {
            value: value.into(),
            text: Some(text.to_string()),
        }
    }

    /// Display text, falling back to the raw value.
    pub fn display_text(&self) -> String {
        match &self.text {
            Some(t) => t.clone(),
            None => match &self.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }
}

/// Completion callback handed to a dynamic choice provider. Invoking it
/// later repopulates the live field's choice list in place; the grid tags
/// each sink with its generation, so a sink outliving its form is a
/// harmless no-op.
pub type ChoiceSink = Box<dyn Fn(Vec<ChoiceItem>)>;

/// Dynamic choice provider. May return choices synchronously, or keep the
/// sink and call it once choices are known (or both — the eager return is
/// tried first).
pub type ChoiceProviderFn = Rc<dyn Fn(&ObjectRef, ChoiceSink) -> Option<Vec<ChoiceItem>>>;

/// Where a property's choices come from.
#[derive(Clone, Default)]
pub enum ChoiceSource {
    #[default]
    None,
    Static(Vec<ChoiceItem>),
    Dynamic(ChoiceProviderFn),
}

impl ChoiceSource {
    pub fn has_choices(&self) -> bool {
        !matches!(self, ChoiceSource::None)
    }

    /// Resolves choices for `obj`. Static sources ignore the sink; dynamic
    /// sources receive it and may answer now, later, or both.
    pub fn load(&self, obj: &ObjectRef, sink: ChoiceSink) -> Option<Vec<ChoiceItem>> {
        match self {
            ChoiceSource::None => None,
            ChoiceSource::Static(items) => Some(items.clone()),
            ChoiceSource::Dynamic(provider) => provider(obj, sink),
        }
    }
}

impl fmt::Debug for ChoiceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceSource::None => write!(f, "ChoiceSource::None"),
            ChoiceSource::Static(items) => f.debug_tuple("ChoiceSource::Static").field(items).finish(),
            ChoiceSource::Dynamic(_) => write!(f, "ChoiceSource::Dynamic(..)"),
        }
    }
}

/// Conditional-visibility predicate, evaluated against the edited object
/// every time the field's visibility is read. An explicit object replaces
/// the original design's ambient expression-function registry.
#[derive(Clone)]
pub struct VisibleIf(Rc<dyn Fn(&ObjectRef) -> bool>);

impl VisibleIf {
    pub fn new(predicate: impl Fn(&ObjectRef) -> bool + 'static) -> Self {
        Self(Rc::new(predicate))
    }

    pub fn eval(&self, obj: &ObjectRef) -> bool {
        (self.0)(obj)
    }
}

impl fmt::Debug for VisibleIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VisibleIf(..)")
    }
}

/// Immutable metadata for one property of one object class.
///
/// Supplied by the [`MetadataRegistry`](crate::MetadataRegistry); the grid
/// core reads it but never mutates it. `id` is assigned when the owning
/// class is registered and keys the editor-registry fit cache.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub id: u64,
    pub name: String,
    pub property_type: PropertyType,
    /// Category ("tab") this property belongs to; `None` lands in `general`.
    pub category: Option<String>,
    pub visible: bool,
    pub show_mode: Option<ShowMode>,
    pub read_only: bool,
    pub is_required: bool,
    pub is_unique: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub choices: ChoiceSource,
    /// Explicit per-property title override (tab-definition title).
    pub title: Option<String>,
    pub display_name: Option<String>,
    pub visible_if: Option<VisibleIf>,
    /// Element class for collection-typed properties.
    pub class_name: Option<String>,
    /// Element properties rendered as matrix columns.
    pub column_names: Vec<String>,
    pub default_value: Option<Value>,
}

impl PropertyDescriptor {
    pub fn new(name: &str, property_type: PropertyType) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            property_type,
            category: None,
            visible: true,
            show_mode: None,
            read_only: false,
            is_required: false,
            is_unique: false,
            min_value: None,
            max_value: None,
            choices: ChoiceSource::None,
            title: None,
            display_name: None,
            visible_if: None,
            class_name: None,
            column_names: Vec::new(),
            default_value: None,
        }
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, PropertyType::Boolean)
    }

    pub fn switch(name: &str) -> Self {
        Self::new(name, PropertyType::Switch)
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, PropertyType::String)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, PropertyType::Number)
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, PropertyType::Text)
    }

    pub fn html(name: &str) -> Self {
        Self::new(name, PropertyType::Html)
    }

    pub fn color(name: &str) -> Self {
        Self::new(name, PropertyType::Color)
    }

    pub fn set(name: &str, choices: Vec<ChoiceItem>) -> Self {
        Self::new(name, PropertyType::Set).with_choices(choices)
    }

    pub fn string_array(name: &str) -> Self {
        Self::new(name, PropertyType::StringArray)
    }

    pub fn question(name: &str) -> Self {
        Self::new(name, PropertyType::Question)
    }

    pub fn question_select_base(name: &str) -> Self {
        Self::new(name, PropertyType::QuestionSelectBase)
    }

    pub fn question_value(name: &str) -> Self {
        Self::new(name, PropertyType::QuestionValue)
    }

    /// Collection of choice items (`itemvalue` descendants).
    pub fn item_values(name: &str, element_class: &str) -> Self {
        let mut p = Self::new(name, PropertyType::ItemValues);
        p.class_name = Some(element_class.to_string());
        p
    }

    /// Collection of column definitions (`matrixdropdowncolumn` descendants).
    pub fn columns(name: &str, element_class: &str) -> Self {
        let mut p = Self::new(name, PropertyType::Columns);
        p.class_name = Some(element_class.to_string());
        p
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_choices(mut self, choices: Vec<ChoiceItem>) -> Self {
        self.choices = ChoiceSource::Static(choices);
        self
    }

    pub fn with_choice_provider(
        mut self,
        provider: impl Fn(&ObjectRef, ChoiceSink) -> Option<Vec<ChoiceItem>> + 'static,
    ) -> Self {
        self.choices = ChoiceSource::Dynamic(Rc::new(provider));
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.to_string());
        self
    }

    pub fn with_visible_if(mut self, predicate: impl Fn(&ObjectRef) -> bool + 'static) -> Self {
        self.visible_if = Some(VisibleIf::new(predicate));
        self
    }

    pub fn with_show_mode(mut self, mode: ShowMode) -> Self {
        self.show_mode = Some(mode);
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    pub fn with_column_names(mut self, names: &[&str]) -> Self {
        self.column_names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn has_choices(&self) -> bool {
        self.choices.has_choices()
    }
}
