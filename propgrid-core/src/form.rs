//! The host-form capability surface.
//!
//! The real form engine (rendering, widgets, reactive bindings) is outside
//! this crate; what the grid needs from it is a live model it can build
//! from a [`FormDescription`] and drive through a direct method contract:
//! named fields with value transcoding, panels with expansion state,
//! matrix rows owning their editing objects, and a disposal switch.
//!
//! Reads are one-directional: a field re-queries its bound object on every
//! access, so external object mutations show up on the next read without
//! any push machinery. All writes go through the grid model, which owns
//! validation and policy.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use propgrid_model::{ChoiceItem, ObjectRef, PropertyDescriptor};

use crate::field::{FieldDescriptor, FieldKind, FormDescription, FormElement, PanelState};

/// Form mode: normal editing or read-only display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    Edit,
    Display,
}

/// Base configuration applied to every form the grid instantiates.
#[derive(Debug, Clone)]
pub struct FormSettings {
    pub show_navigation: bool,
    pub show_page_titles: bool,
    pub show_question_numbers: bool,
    pub text_update_mode: Option<String>,
    pub required_text: String,
    pub mode: FormMode,
}

impl FormSettings {
    fn base() -> Self {
        Self {
            show_navigation: false,
            show_page_titles: false,
            show_question_numbers: false,
            text_update_mode: Some("on_typing".to_string()),
            required_text: String::new(),
            mode: FormMode::Edit,
        }
    }

    /// Settings for the top-level property grid form. Unlike setup
    /// editors, the grid drops the typing update mode and validates on
    /// value changing instead.
    pub fn for_property_grid() -> Self {
        let mut s = Self::base();
        s.text_update_mode = None;
        s
    }

    /// Settings for a modal setup editor's sub-form.
    pub fn for_setup_editor() -> Self {
        Self::base()
    }
}

/// Value transcoder installed by an editor strategy (`onCreated`):
/// `value_from_data` maps the stored object value to the displayed field
/// value, `value_to_data` maps an edited field value back.
pub type ValueTranscoder = Rc<dyn Fn(&Value) -> Value>;

/// Shared handle to one live field.
pub type FieldHandle = Rc<RefCell<FieldState>>;

/// Per-cell state of one matrix row.
#[derive(Debug, Clone)]
pub struct CellState {
    pub column: String,
    pub read_only: bool,
    pub error: Option<String>,
}

/// One row of a matrix-shaped field. The row owns a reference to its own
/// editing object; cell edits are scoped to it.
#[derive(Debug, Clone)]
pub struct MatrixRow {
    pub obj: ObjectRef,
    pub cells: Vec<CellState>,
}

impl MatrixRow {
    pub fn cell(&self, column: &str) -> Option<&CellState> {
        self.cells.iter().find(|c| c.column == column)
    }

    pub fn cell_mut(&mut self, column: &str) -> Option<&mut CellState> {
        self.cells.iter_mut().find(|c| c.column == column)
    }
}

/// Live state of one instantiated field, bound to its originating
/// property descriptor and target object by the generator's second pass.
pub struct FieldState {
    pub descriptor: FieldDescriptor,
    pub property: Option<PropertyDescriptor>,
    pub obj: Option<ObjectRef>,
    /// Static visibility combined with the policy callback at bind time.
    pub visible: bool,
    pub read_only: bool,
    pub error: Option<String>,
    pub choices: Vec<ChoiceItem>,
    pub value_from_data: Option<ValueTranscoder>,
    pub value_to_data: Option<ValueTranscoder>,
    pub rows: Vec<MatrixRow>,
}

impl FieldState {
    fn new(descriptor: FieldDescriptor) -> Self {
        Self {
            visible: descriptor.visible,
            read_only: descriptor.is_read_only,
            choices: descriptor.choices.clone(),
            descriptor,
            property: None,
            obj: None,
            error: None,
            value_from_data: None,
            value_to_data: None,
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn is_matrix(&self) -> bool {
        self.descriptor.kind == FieldKind::MatrixDynamic
    }

    /// Effective visibility: the bound static/policy result combined with
    /// the live `visibleIf` predicate, evaluated on every read.
    pub fn is_visible(&self) -> bool {
        if !self.visible {
            return false;
        }
        match (&self.property, &self.obj) {
            (Some(p), Some(o)) => p.visible_if.as_ref().is_none_or(|v| v.eval(o)),
            _ => true,
        }
    }

    /// Raw stored value, re-queried from the bound object.
    pub fn raw_value(&self) -> Value {
        let (Some(property), Some(obj)) = (&self.property, &self.obj) else {
            return self.descriptor.default_value.clone().unwrap_or(Value::Null);
        };
        if self.is_matrix() {
            let rows: Vec<Value> = obj
                .children(&property.name)
                .iter()
                .map(|c| c.get("value"))
                .collect();
            return Value::Array(rows);
        }
        let stored = obj.get(&property.name);
        if stored.is_null() {
            self.descriptor.default_value.clone().unwrap_or(Value::Null)
        } else {
            stored
        }
    }

    /// Displayed value: the raw value run through the from-data
    /// transcoder when one is installed.
    pub fn value(&self) -> Value {
        let raw = self.raw_value();
        match &self.value_from_data {
            Some(f) => f(&raw),
            None => raw,
        }
    }

    /// Writes a field value to the bound object, applying the to-data
    /// transcoder. Returns the value actually stored.
    pub fn commit(&self, value: Value) -> Value {
        let stored = match &self.value_to_data {
            Some(f) => f(&value),
            None => value,
        };
        if let (Some(property), Some(obj)) = (&self.property, &self.obj) {
            obj.set(&property.name, stored.clone());
        }
        stored
    }
}

impl std::fmt::Debug for FieldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldState")
            .field("name", &self.descriptor.name)
            .field("kind", &self.descriptor.kind)
            .field("visible", &self.visible)
            .field("read_only", &self.read_only)
            .field("error", &self.error)
            .field("rows", &self.rows.len())
            .finish_non_exhaustive()
    }
}

/// Live panel (category) of an instantiated form.
#[derive(Debug, Clone)]
pub struct PanelInstance {
    pub name: String,
    pub title: String,
    pub expanded: bool,
    pub field_names: Vec<String>,
}

/// A live host form instance: one page of panels and fields built from a
/// [`FormDescription`]. Owned exclusively by one grid model and disposed
/// before any replacement is created.
#[derive(Debug)]
pub struct FormModel {
    pub settings: FormSettings,
    panels: Vec<PanelInstance>,
    fields: Vec<FieldHandle>,
    by_name: HashMap<String, usize>,
    editing_obj: RefCell<Option<ObjectRef>>,
    disposed: Cell<bool>,
}

impl FormModel {
    pub fn from_description(description: &FormDescription, settings: FormSettings) -> Self {
        let mut panels = Vec::new();
        let mut fields: Vec<FieldHandle> = Vec::new();
        let mut by_name = HashMap::new();

        let mut push_field = |descriptor: &FieldDescriptor,
                              fields: &mut Vec<FieldHandle>,
                              by_name: &mut HashMap<String, usize>| {
            by_name.insert(descriptor.name.clone(), fields.len());
            fields.push(Rc::new(RefCell::new(FieldState::new(descriptor.clone()))));
        };

        for element in &description.elements {
            match element {
                FormElement::Field(descriptor) => {
                    push_field(descriptor, &mut fields, &mut by_name);
                }
                FormElement::Panel(panel) => {
                    let field_names = panel.elements.iter().map(|f| f.name.clone()).collect();
                    for descriptor in &panel.elements {
                        push_field(descriptor, &mut fields, &mut by_name);
                    }
                    panels.push(PanelInstance {
                        name: panel.name.clone(),
                        title: panel.title.clone(),
                        expanded: panel.state == PanelState::Expanded,
                        field_names,
                    });
                }
            }
        }

        Self {
            settings,
            panels,
            fields,
            by_name,
            editing_obj: RefCell::new(None),
            disposed: Cell::new(false),
        }
    }

    pub fn empty(settings: FormSettings) -> Self {
        Self::from_description(&FormDescription::default(), settings)
    }

    pub fn get_field(&self, name: &str) -> Option<FieldHandle> {
        self.by_name.get(name).map(|&i| self.fields[i].clone())
    }

    pub fn fields(&self) -> &[FieldHandle] {
        &self.fields
    }

    pub fn set_editing_obj(&self, obj: Option<ObjectRef>) {
        *self.editing_obj.borrow_mut() = obj;
    }

    pub fn editing_obj(&self) -> Option<ObjectRef> {
        self.editing_obj.borrow().clone()
    }

    pub fn panel(&self, name: &str) -> Option<&PanelInstance> {
        self.panels.iter().find(|p| p.name == name)
    }

    pub fn panels(&self) -> &[PanelInstance] {
        &self.panels
    }

    /// Unknown panel names are a no-op.
    pub fn set_panel_expanded(&mut self, name: &str, expanded: bool) {
        if let Some(panel) = self.panels.iter_mut().find(|p| p.name == name) {
            panel.expanded = expanded;
        }
    }

    pub fn set_all_panels_expanded(&mut self, expanded: bool) {
        for panel in &mut self.panels {
            panel.expanded = expanded;
        }
    }

    /// True when any field or matrix cell currently carries an error.
    pub fn has_errors(&self) -> bool {
        self.fields.iter().any(|f| {
            let field = f.borrow();
            field.error.is_some()
                || field
                    .rows
                    .iter()
                    .any(|r| r.cells.iter().any(|c| c.error.is_some()))
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Releases the form: clears object bindings so any handle kept by the
    /// host can no longer write through to the object.
    pub fn dispose(&self) {
        self.disposed.set(true);
        *self.editing_obj.borrow_mut() = None;
        for field in &self.fields {
            let mut field = field.borrow_mut();
            field.obj = None;
            field.rows.clear();
        }
    }
}
