//! Title actions and modal setup editors.
//!
//! A field's title row can carry up to two actions: clear-value, which
//! resets the property through the owning editor, and setup, which opens
//! a modal sub-editor built around a scratch object so cancelling leaves
//! the real object untouched.

use std::rc::Rc;

use serde_json::Value;

use propgrid_model::{is_value_empty, ObjectInstance, ObjectRef, PropertyDescriptor};

use crate::field::{FieldDescriptor, FieldKind, FormDescription, FormElement};
use crate::form::{FieldHandle, FormModel, FormSettings};
use crate::registry::{EditorContext, PropertyEditor};

/// A modal sub-editor for one property. The host renders `form`, drives
/// edits through its field handles (which write to a scratch object), and
/// calls `apply` on confirmation.
pub trait PropertyEditorSetup {
    /// The sub-editor's live form.
    fn form(&self) -> &FormModel;

    fn has_errors(&self) -> bool {
        self.form().has_errors()
    }

    /// Commits the scratch edits to the real object. Returns `false` when
    /// the edits are invalid and nothing was written.
    fn apply(&mut self) -> bool;
}

/// Setup editor for string-list properties: the whole list as one
/// multiline text blob, one item per line.
pub struct StringListSetup {
    obj: ObjectRef,
    property: PropertyDescriptor,
    scratch: ObjectRef,
    form: FormModel,
}

impl StringListSetup {
    pub fn new(obj: ObjectRef, property: PropertyDescriptor) -> Self {
        let scratch = ObjectInstance::new(obj.class_name());
        scratch.set(&property.name, obj.get(&property.name));

        let mut field = FieldDescriptor::new(FieldKind::Comment);
        field.name = property.name.clone();
        field.title = property.display_name.clone().or_else(|| property.title.clone());
        let description = FormDescription {
            elements: vec![FormElement::Field(field)],
        };

        let form = FormModel::from_description(&description, FormSettings::for_setup_editor());
        form.set_editing_obj(Some(scratch.clone()));
        if let Some(handle) = form.get_field(&property.name) {
            let mut state = handle.borrow_mut();
            state.obj = Some(scratch.clone());
            state.property = Some(property.clone());
            state.value_from_data = Some(Rc::new(|value| {
                let Some(items) = value.as_array() else {
                    return Value::String(String::new());
                };
                let lines: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                Value::String(lines.join("\n"))
            }));
            state.value_to_data = Some(Rc::new(|value| match value {
                Value::Array(_) => value.clone(),
                Value::String(s) if !s.is_empty() => Value::Array(
                    s.split('\n')
                        .map(|line| Value::String(line.to_string()))
                        .collect(),
                ),
                _ => Value::Array(Vec::new()),
            }));
        }

        Self {
            obj,
            property,
            scratch,
            form,
        }
    }
}

impl PropertyEditorSetup for StringListSetup {
    fn form(&self) -> &FormModel {
        &self.form
    }

    fn has_errors(&self) -> bool {
        if self.form.has_errors() {
            return true;
        }
        self.property.is_required && is_value_empty(&self.scratch.get(&self.property.name))
    }

    fn apply(&mut self) -> bool {
        if self.has_errors() {
            return false;
        }
        self.obj.set(&self.property.name, self.scratch.get(&self.property.name));
        true
    }
}

/// What a title action does when invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleActionKind {
    ClearValue,
    SetupEditor,
}

/// One action attached to a field's title row.
#[derive(Debug, Clone)]
pub struct TitleAction {
    pub id: &'static str,
    pub icon: &'static str,
    pub enabled: bool,
    pub kind: TitleActionKind,
}

/// One action an editor contributes to a matrix row, such as a drill-in
/// edit command. `run` hands the row's editing object to the action's
/// behavior; a host that wants to drill in re-points its grid at that
/// object.
#[derive(Clone)]
pub struct MatrixRowAction {
    pub id: &'static str,
    pub icon: &'static str,
    pub enabled: bool,
    on_run: Rc<dyn Fn(&ObjectRef)>,
}

impl MatrixRowAction {
    pub fn new(id: &'static str, icon: &'static str, on_run: impl Fn(&ObjectRef) + 'static) -> Self {
        Self {
            id,
            icon,
            enabled: true,
            on_run: Rc::new(on_run),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Disabled actions are inert.
    pub fn run(&self, row_obj: &ObjectRef) {
        if self.enabled {
            (self.on_run)(row_obj);
        }
    }
}

impl std::fmt::Debug for MatrixRowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixRowAction")
            .field("id", &self.id)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Actions the resolved editor contributes for one field. Clear-value and
/// setup are both disabled while the field is read-only.
pub(crate) fn actions_for(
    editor: &Rc<dyn PropertyEditor>,
    ctx: &EditorContext<'_>,
    field: &FieldHandle,
) -> Vec<TitleAction> {
    let read_only = field.borrow().read_only;
    let mut actions = Vec::new();
    if editor.can_clear_value() {
        actions.push(TitleAction {
            id: "property-grid-clear",
            icon: "icon-clear",
            enabled: !read_only,
            kind: TitleActionKind::ClearValue,
        });
    }
    if editor.has_setup() {
        actions.push(TitleAction {
            id: "property-grid-setup",
            icon: "icon-wizard",
            enabled: !read_only && editor.is_setup_enabled(ctx, field),
            kind: TitleActionKind::SetupEditor,
        });
    }
    actions
}
