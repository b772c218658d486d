//! The property grid model: the synchronizer between a target object and
//! its generated form.
//!
//! All writes flow through here — value edits, matrix row lifecycle,
//! clear-value and setup actions — so validation, policy callbacks, and
//! change notification happen in exactly one place. Reads stay live: the
//! form's fields re-query the object, so external mutations need no push.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use propgrid_model::{
    is_value_empty, MetadataRegistry, ObjectInstance, ObjectRef, PropertyDescriptor, PropertyType,
};

use crate::actions::{actions_for, MatrixRowAction, TitleAction, TitleActionKind};
use crate::form::{CellState, FieldHandle, FormMode, FormModel, FormSettings, MatrixRow};
use crate::generator::{property_read_only, FormGenerator};
use crate::options::{GridOptions, ValueChangingEvent};
use crate::registry::{EditorContext, EditorRegistry, Generation, MatrixCellEvent, PropertyEditor};

pub struct PropertyGridModel {
    metadata: Rc<MetadataRegistry>,
    registry: Rc<EditorRegistry>,
    options: Rc<GridOptions>,
    form: Option<FormModel>,
    obj: Option<ObjectRef>,
    class_name_property: Option<String>,
    class_name_value: Option<String>,
    /// Re-entrancy guard: matrix cell edits fired while rows are being
    /// materialized are not user edits and must not re-trigger the
    /// validation pipeline.
    cell_creating: Cell<bool>,
    generation: Rc<Cell<u64>>,
    on_object_changed: Option<Box<dyn Fn(&PropertyGridModel)>>,
}

impl PropertyGridModel {
    pub fn new(
        metadata: Rc<MetadataRegistry>,
        registry: Rc<EditorRegistry>,
        options: Rc<GridOptions>,
    ) -> Self {
        Self {
            metadata,
            registry,
            options,
            form: None,
            obj: None,
            class_name_property: None,
            class_name_value: None,
            cell_creating: Cell::new(false),
            generation: Rc::new(Cell::new(0)),
            on_object_changed: None,
        }
    }

    /// Called after every rebuild (object switch or discriminant change)
    /// with the grid carrying its fresh form.
    pub fn set_on_object_changed(&mut self, f: impl Fn(&PropertyGridModel) + 'static) {
        self.on_object_changed = Some(Box::new(f));
    }

    // ---- object binding ------------------------------------------------

    /// Points the grid at a new target. Setting the same object again is
    /// a no-op; `None` disposes the current form and leaves the grid
    /// empty.
    pub fn set_object(&mut self, obj: Option<ObjectRef>) {
        if let (Some(current), Some(next)) = (&self.obj, &obj) {
            if Rc::ptr_eq(current, next) {
                return;
            }
        }
        if self.obj.is_none() && obj.is_none() {
            return;
        }
        self.obj = obj;
        self.rebuild();
    }

    pub fn obj(&self) -> Option<ObjectRef> {
        self.obj.clone()
    }

    pub fn form(&self) -> Option<&FormModel> {
        self.form.as_ref()
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    /// Full rebuild: bumps the generation (stale async completions become
    /// no-ops), disposes the old form, and generates a fresh one.
    fn rebuild(&mut self) {
        self.generation.set(self.generation.get() + 1);
        if let Some(old) = self.form.take() {
            old.dispose();
        }
        self.class_name_property = None;
        self.class_name_value = None;

        let Some(obj) = self.obj.clone() else {
            if let Some(f) = &self.on_object_changed {
                f(self);
            }
            return;
        };
        debug!(class = obj.class_name(), "rebuilding property grid");

        let mut settings = FormSettings::for_property_grid();
        if self.options.read_only {
            settings.mode = FormMode::Display;
        }

        let generator = FormGenerator::new(obj.clone(), &self.metadata, &self.registry, &self.options);
        let description = generator.generate(false);
        let form = FormModel::from_description(&description, settings);
        form.set_editing_obj(Some(obj.clone()));
        generator.setup_fields(&form, &Generation::snapshot(&self.generation));

        self.form = Some(form);
        self.sync_all_matrix_rows(&obj);

        self.class_name_property = self.metadata.class_name_property(obj.class_name());
        self.class_name_value = self
            .class_name_property
            .as_deref()
            .and_then(|p| obj.get_str(p));

        if let Some(f) = &self.on_object_changed {
            f(self);
        }
    }

    // ---- value pipeline ------------------------------------------------

    /// Current displayed value of a field, `Value::Null` when unknown.
    pub fn value(&self, name: &str) -> Value {
        self.field(name).map_or(Value::Null, |f| f.borrow().value())
    }

    /// Applies a value edit through the full pipeline: read-only check,
    /// host interception, required/custom validation, commit, change
    /// notification, and a discriminant-triggered rebuild. Returns the
    /// validation error that blocked the commit, if any.
    pub fn set_value(&mut self, name: &str, value: Value) -> Option<String> {
        let obj = self.obj.clone()?;
        let field = self.field(name)?;
        let (property, read_only) = {
            let state = field.borrow();
            (state.property.clone()?, state.read_only)
        };
        if self.options.read_only || read_only {
            return None;
        }

        let mut event = ValueChangingEvent {
            obj: obj.clone(),
            property_name: property.name.clone(),
            old_value: obj.get(&property.name),
            new_value: value,
        };
        self.options.value_changing(&mut event);
        let value = event.new_value;

        if let Some(error) = self.validate_value(&property, &obj, &value) {
            field.borrow_mut().error = Some(error.clone());
            return Some(error);
        }
        field.borrow_mut().error = None;

        let stored = field.borrow().commit(value);
        self.options.property_value_changed(&property, &obj, &stored);

        if self.class_name_property.as_deref() == Some(property.name.as_str()) {
            let current = obj.get_str(&property.name);
            if current != self.class_name_value {
                debug!(property = %property.name, "discriminant changed; rebuilding");
                self.rebuild();
            }
        }
        None
    }

    fn validate_value(
        &self,
        property: &PropertyDescriptor,
        obj: &ObjectRef,
        value: &Value,
    ) -> Option<String> {
        if property.is_required && is_value_empty(value) {
            return Some(self.options.localization.property_is_empty());
        }
        self.options.error_text(&property.name, obj, value)
    }

    /// Validates every visible field and matrix cell, recording errors on
    /// the form. True when the form is clean.
    pub fn validate(&self) -> bool {
        let Some(obj) = self.obj.clone() else {
            return true;
        };
        let Some(form) = &self.form else {
            return true;
        };
        for handle in form.fields() {
            let (property, visible, is_matrix) = {
                let state = handle.borrow();
                (state.property.clone(), state.is_visible(), state.is_matrix())
            };
            let Some(property) = property else { continue };
            if !visible {
                continue;
            }
            if is_matrix {
                self.validate_matrix(handle, &property);
            } else {
                let value = handle.borrow().raw_value();
                handle.borrow_mut().error = self.validate_value(&property, &obj, &value);
            }
        }
        !form.has_errors()
    }

    fn validate_matrix(&self, handle: &FieldHandle, property: &PropertyDescriptor) {
        let element_class = element_class_of(property);
        let mut state = handle.borrow_mut();
        for row in &mut state.rows {
            for cell in &mut row.cells {
                let Some(column) = self.metadata.find_property(&element_class, &cell.column) else {
                    continue;
                };
                cell.error = self.validate_value(&column, &row.obj, &row.obj.get(&cell.column));
            }
        }
    }

    // ---- matrix row lifecycle ------------------------------------------

    /// Appends a row to a matrix field: creates the element object,
    /// applies metadata defaults (auto-numbering choice items), and
    /// notifies the host. `None` when the field is unknown, read-only, or
    /// the row cap is reached.
    pub fn add_matrix_row(&mut self, name: &str) -> Option<ObjectRef> {
        if self.options.read_only {
            return None;
        }
        let obj = self.obj.clone()?;
        let field = self.field(name)?;
        let property = {
            let state = field.borrow();
            if !state.is_matrix() || state.read_only {
                return None;
            }
            state.property.clone()?
        };
        let count = obj.child_count(&property.name);
        if let Some(max) = self.options.maximum_rows {
            if count >= max {
                debug!(property = %property.name, max, "row cap reached");
                return None;
            }
        }

        let element_class = element_class_of(&property);
        let child = ObjectInstance::new(&element_class);
        for p in self.metadata.properties_of_class(&element_class) {
            if let Some(default) = &p.default_value {
                child.set(&p.name, default.clone());
            }
        }
        if self.metadata.is_descendant_of(&element_class, "itemvalue")
            && child.get("value").is_null()
        {
            child.set("value", Value::String(next_item_name(&obj, &property.name)));
        }
        obj.add_child(&property.name, child.clone());

        self.append_row(&field, &property, &child);

        let count = obj.child_count(&property.name);
        if self.metadata.is_descendant_of(&element_class, "matrixdropdowncolumn") {
            self.options.column_added(&obj, &child, count);
        } else {
            self.options.item_value_added(&obj, &property.name, &child, count);
        }
        Some(child)
    }

    /// Removes a matrix row, subject to the triple veto: the owning
    /// editor, the collection-deleting callback, and the per-item policy
    /// must all allow it.
    pub fn remove_matrix_row(&mut self, name: &str, index: usize) -> bool {
        if self.options.read_only {
            return false;
        }
        let Some(obj) = self.obj.clone() else {
            return false;
        };
        let Some(field) = self.field(name) else {
            return false;
        };
        let property = {
            let state = field.borrow();
            if state.read_only {
                return false;
            }
            match &state.property {
                Some(p) => p.clone(),
                None => return false,
            }
        };
        let items = obj.children(&property.name);
        let Some(row_obj) = items.get(index).cloned() else {
            return false;
        };

        let editor_allows = match self.registry.resolve(&property) {
            Some(editor) => {
                let ctx = self.context(&obj, &property);
                editor.allows_remove_row(&ctx, &row_obj)
            }
            None => true,
        };
        let allowed = editor_allows
            && self
                .options
                .collection_item_deleting(&obj, &property, &items, &row_obj)
            && self.options.can_delete_item(&obj, &row_obj, true);
        if !allowed {
            return false;
        }

        obj.remove_child(&property.name, index);
        let mut state = field.borrow_mut();
        if index < state.rows.len() {
            state.rows.remove(index);
        }
        true
    }

    /// Applies a matrix cell edit: validation against the column property,
    /// commit to the row's own object, then the editor and host change
    /// hooks. Returns the blocking error, if any. No-op while rows are
    /// being materialized.
    pub fn set_matrix_cell(
        &mut self,
        name: &str,
        row_index: usize,
        column: &str,
        value: Value,
    ) -> Option<String> {
        if self.cell_creating.get() {
            return None;
        }
        let obj = self.obj.clone()?;
        let field = self.field(name)?;
        let property = field.borrow().property.clone()?;
        let element_class = element_class_of(&property);

        let (row_obj, cell_read_only) = {
            let state = field.borrow();
            let row = state.rows.get(row_index)?;
            let read_only = row.cell(column).is_some_and(|c| c.read_only);
            (row.obj.clone(), read_only)
        };
        if self.options.read_only || cell_read_only {
            return None;
        }

        // Same interception point as top-level edits, scoped to the row's
        // own editing object.
        let mut event = ValueChangingEvent {
            obj: row_obj.clone(),
            property_name: column.to_string(),
            old_value: row_obj.get(column),
            new_value: value,
        };
        self.options.value_changing(&mut event);
        let value = event.new_value;

        let column_property = self.metadata.find_property(&element_class, column);
        if let Some(column_property) = &column_property {
            if let Some(error) = self.validate_value(column_property, &row_obj, &value) {
                set_cell_error(&field, row_index, column, Some(error.clone()));
                return Some(error);
            }
        }
        set_cell_error(&field, row_index, column, None);

        row_obj.set(column, value.clone());

        if let Some(editor) = self.registry.resolve(&property) {
            let ctx = self.context(&obj, &property);
            let event = MatrixCellEvent {
                row_obj: &row_obj,
                column_name: column,
                value: &value,
            };
            editor.on_matrix_cell_value_changed(&ctx, &event);
        }
        if let Some(column_property) = &column_property {
            self.options.property_value_changed(column_property, &row_obj, &value);
        }
        None
    }

    fn sync_all_matrix_rows(&self, obj: &ObjectRef) {
        let Some(form) = &self.form else { return };
        for handle in form.fields() {
            let property = {
                let state = handle.borrow();
                if !state.is_matrix() {
                    continue;
                }
                state.property.clone()
            };
            let Some(property) = property else { continue };
            handle.borrow_mut().rows.clear();
            for child in obj.children(&property.name) {
                self.append_row(handle, &property, &child);
            }
        }
    }

    /// Materializes one row: builds per-cell state with the computed
    /// read-only policy and dispatches the editor's cell-created hook
    /// under the re-entrancy guard.
    fn append_row(&self, field: &FieldHandle, property: &PropertyDescriptor, row_obj: &ObjectRef) {
        let obj = match &self.obj {
            Some(o) => o.clone(),
            None => return,
        };
        let element_class = element_class_of(property);
        let columns: Vec<String> = field
            .borrow()
            .descriptor
            .columns
            .iter()
            .map(|c| c.name.clone())
            .collect();

        self.cell_creating.set(true);
        let mut cells = Vec::with_capacity(columns.len());
        for column in &columns {
            let read_only = self
                .metadata
                .find_property(&element_class, column)
                .map(|p| {
                    property_read_only(&p, &self.options, row_obj, Some(&obj), Some(property))
                })
                .unwrap_or(false);
            cells.push(CellState {
                column: column.clone(),
                read_only,
                error: None,
            });
        }
        field.borrow_mut().rows.push(MatrixRow {
            obj: row_obj.clone(),
            cells,
        });

        if let Some(editor) = self.registry.resolve(property) {
            let ctx = self.context(&obj, property);
            for column in &columns {
                let value = row_obj.get(column);
                let event = MatrixCellEvent {
                    row_obj,
                    column_name: column,
                    value: &value,
                };
                editor.on_matrix_cell_created(&ctx, &event);
            }
        }
        self.cell_creating.set(false);
    }

    // ---- categories ----------------------------------------------------

    /// Unknown categories are a no-op.
    pub fn expand_category(&mut self, name: &str) {
        if let Some(form) = &mut self.form {
            form.set_panel_expanded(name, true);
        }
    }

    pub fn collapse_category(&mut self, name: &str) {
        if let Some(form) = &mut self.form {
            form.set_panel_expanded(name, false);
        }
    }

    pub fn expand_all_categories(&mut self) {
        if let Some(form) = &mut self.form {
            form.set_all_panels_expanded(true);
        }
    }

    pub fn collapse_all_categories(&mut self) {
        if let Some(form) = &mut self.form {
            form.set_all_panels_expanded(false);
        }
    }

    // ---- title actions -------------------------------------------------

    /// Actions contributed by a field's resolved editor.
    pub fn title_actions(&self, name: &str) -> Vec<TitleAction> {
        let Some(obj) = self.obj.clone() else {
            return Vec::new();
        };
        let Some(field) = self.field(name) else {
            return Vec::new();
        };
        let Some(property) = field.borrow().property.clone() else {
            return Vec::new();
        };
        let Some(editor) = self.registry.resolve(&property) else {
            return Vec::new();
        };
        let ctx = self.context(&obj, &property);
        actions_for(&editor, &ctx, &field)
    }

    /// Actions a matrix field's resolved editor contributes to one row.
    /// Unknown field, missing row, or no editor all yield an empty list.
    pub fn matrix_row_actions(&self, name: &str, row_index: usize) -> Vec<MatrixRowAction> {
        let Some(obj) = self.obj.clone() else {
            return Vec::new();
        };
        let Some(field) = self.field(name) else {
            return Vec::new();
        };
        let (property, row_obj) = {
            let state = field.borrow();
            let Some(property) = state.property.clone() else {
                return Vec::new();
            };
            let Some(row) = state.rows.get(row_index) else {
                return Vec::new();
            };
            (property, row.obj.clone())
        };
        let Some(editor) = self.registry.resolve(&property) else {
            return Vec::new();
        };
        let ctx = self.context(&obj, &property);
        editor.matrix_row_actions(&ctx, &row_obj)
    }

    /// Runs a title action. Clear resets the property through the editor;
    /// setup opens the modal sub-editor and applies it on confirmation.
    /// Returns whether the action took effect.
    pub fn run_title_action(&mut self, name: &str, kind: TitleActionKind) -> bool {
        let Some(obj) = self.obj.clone() else {
            return false;
        };
        let Some(field) = self.field(name) else {
            return false;
        };
        let (property, read_only) = {
            let state = field.borrow();
            match &state.property {
                Some(p) => (p.clone(), state.read_only),
                None => return false,
            }
        };
        if read_only || self.options.read_only {
            return false;
        }
        let Some(editor) = self.registry.resolve(&property) else {
            return false;
        };

        match kind {
            TitleActionKind::ClearValue => {
                if !editor.can_clear_value() {
                    return false;
                }
                let ctx = self.context(&obj, &property);
                editor.clear_value(&ctx, &field);
                if field.borrow().is_matrix() {
                    field.borrow_mut().rows.clear();
                }
                true
            }
            TitleActionKind::SetupEditor => {
                if !editor.has_setup() {
                    return false;
                }
                let mut setup = {
                    let ctx = self.context(&obj, &property);
                    if !editor.is_setup_enabled(&ctx, &field) {
                        return false;
                    }
                    match editor.create_setup(&ctx, &field) {
                        Some(s) => s,
                        None => return false,
                    }
                };
                match self.options.show_modal(setup.as_mut()) {
                    Some(true) => setup.apply(),
                    _ => false,
                }
            }
        }
    }

    /// Post-mount hook relay for the host renderer.
    pub fn after_render(&self, name: &str) {
        let Some(obj) = self.obj.clone() else { return };
        let Some(field) = self.field(name) else { return };
        let Some(property) = field.borrow().property.clone() else {
            return;
        };
        if let Some(editor) = self.registry.resolve(&property) {
            let ctx = self.context(&obj, &property);
            editor.on_after_render(&ctx, &field);
        }
    }

    // ---- plumbing ------------------------------------------------------

    fn field(&self, name: &str) -> Option<FieldHandle> {
        self.form.as_ref()?.get_field(name)
    }

    fn context<'a>(&'a self, obj: &'a ObjectRef, property: &'a PropertyDescriptor) -> EditorContext<'a> {
        EditorContext {
            obj,
            property,
            options: &self.options,
            metadata: &self.metadata,
            registry: &self.registry,
            generation: Generation::snapshot(&self.generation),
            parent: None,
        }
    }
}

impl std::fmt::Debug for PropertyGridModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyGridModel")
            .field("class", &self.obj.as_ref().map(|o| o.class_name().to_string()))
            .field("fields", &self.form.as_ref().map_or(0, |f| f.fields().len()))
            .finish_non_exhaustive()
    }
}

/// Element class for a collection property: the declared class, or the
/// canonical element class for the property type.
fn element_class_of(property: &PropertyDescriptor) -> String {
    property.class_name.clone().unwrap_or_else(|| {
        match property.property_type {
            PropertyType::Columns => "matrixdropdowncolumn",
            _ => "itemvalue",
        }
        .to_string()
    })
}

/// First unused `item{N}` value among existing rows.
fn next_item_name(owner: &ObjectRef, property_name: &str) -> String {
    let existing: Vec<String> = owner
        .children(property_name)
        .iter()
        .filter_map(|c| c.get_str("value"))
        .collect();
    let mut n = existing.len() + 1;
    loop {
        let candidate = format!("item{n}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn set_cell_error(field: &FieldHandle, row_index: usize, column: &str, error: Option<String>) {
    let mut state = field.borrow_mut();
    if let Some(row) = state.rows.get_mut(row_index) {
        if let Some(cell) = row.cell_mut(column) {
            cell.error = error;
        }
    }
}
