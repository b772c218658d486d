//! The editor registry: ordered (fit predicate → strategy) pairs.
//!
//! Resolution is an explicit linear scan in reverse registration order —
//! the most recently registered editor wins, which is the extension-point
//! contract: host code overrides a built-in by registering after it. A
//! second pass picks the first default-flagged editor when nothing fits.
//! Results are memoized per property id until [`EditorRegistry::clear_cache`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use propgrid_model::{MetadataRegistry, ObjectRef, PropertyDescriptor};

use crate::actions::{MatrixRowAction, PropertyEditorSetup};
use crate::field::FieldDescriptor;
use crate::form::FieldHandle;
use crate::options::GridOptions;

/// Build-generation tag. Asynchronous choice completions capture one and
/// become no-ops once the grid has rebuilt or moved to another object.
#[derive(Debug, Clone)]
pub struct Generation {
    current: Rc<Cell<u64>>,
    snapshot: u64,
}

impl Generation {
    /// Snapshot of the grid's current generation counter.
    pub fn snapshot(current: &Rc<Cell<u64>>) -> Self {
        Self {
            current: current.clone(),
            snapshot: current.get(),
        }
    }

    /// A generation that never goes stale (standalone generator use).
    pub fn detached() -> Self {
        Self {
            current: Rc::new(Cell::new(0)),
            snapshot: 0,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.current.get() != self.snapshot
    }
}

/// Everything an editor strategy sees when building or wiring a field.
pub struct EditorContext<'a> {
    pub obj: &'a ObjectRef,
    pub property: &'a PropertyDescriptor,
    pub options: &'a GridOptions,
    pub metadata: &'a MetadataRegistry,
    pub registry: &'a EditorRegistry,
    pub generation: Generation,
    pub parent: Option<(&'a ObjectRef, &'a PropertyDescriptor)>,
}

/// Matrix-cell event payload forwarded to per-editor hooks.
pub struct MatrixCellEvent<'a> {
    pub row_obj: &'a ObjectRef,
    pub column_name: &'a str,
    pub value: &'a Value,
}

/// A registered rule mapping property shape to a rendering recipe.
///
/// `fit` is the type/shape predicate; `build` produces the declarative
/// field descriptor; the remaining hooks are optional lifecycle
/// extensions dispatched by the generator and grid model.
pub trait PropertyEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool;

    /// Fallback editor used when nothing fits.
    fn is_default(&self) -> bool {
        false
    }

    fn build(&self, ctx: &EditorContext<'_>) -> FieldDescriptor;

    /// Called after the host instantiates the field widget: populate
    /// choices, install value transcoders, adjust rendering.
    fn on_created(&self, ctx: &EditorContext<'_>, field: &FieldHandle) {
        let _ = (ctx, field);
    }

    /// Post-mount adjustment hook for widgets that need it.
    fn on_after_render(&self, ctx: &EditorContext<'_>, field: &FieldHandle) {
        let _ = (ctx, field);
    }

    fn on_matrix_cell_created(&self, ctx: &EditorContext<'_>, event: &MatrixCellEvent<'_>) {
        let _ = (ctx, event);
    }

    fn on_matrix_cell_value_changed(&self, ctx: &EditorContext<'_>, event: &MatrixCellEvent<'_>) {
        let _ = (ctx, event);
    }

    /// Row-scoped actions this editor contributes to one matrix row
    /// (drill-in edit and the like). The grid relays these through
    /// [`PropertyGridModel::matrix_row_actions`](crate::PropertyGridModel::matrix_row_actions).
    fn matrix_row_actions(
        &self,
        ctx: &EditorContext<'_>,
        row_obj: &ObjectRef,
    ) -> Vec<MatrixRowAction> {
        let _ = (ctx, row_obj);
        Vec::new()
    }

    /// Editor-level veto on removing a matrix row.
    fn allows_remove_row(&self, ctx: &EditorContext<'_>, row_obj: &ObjectRef) -> bool {
        let _ = (ctx, row_obj);
        true
    }

    /// Whether this editor offers a clear-value title action.
    fn can_clear_value(&self) -> bool {
        false
    }

    fn clear_value(&self, ctx: &EditorContext<'_>, field: &FieldHandle) {
        let _ = (ctx, field);
    }

    /// Whether this editor offers a modal setup sub-editor.
    fn has_setup(&self) -> bool {
        false
    }

    fn create_setup(
        &self,
        ctx: &EditorContext<'_>,
        field: &FieldHandle,
    ) -> Option<Box<dyn PropertyEditorSetup>> {
        let _ = (ctx, field);
        None
    }

    fn is_setup_enabled(&self, ctx: &EditorContext<'_>, field: &FieldHandle) -> bool {
        let _ = (ctx, field);
        true
    }
}

/// Ordered collection of editor strategies with a per-property fit cache.
///
/// Built explicitly and threaded by reference into the generator and grid
/// model — there is no process-wide singleton. Callers that re-register
/// editors at runtime must call [`clear_cache`](Self::clear_cache) to
/// avoid stale resolutions.
#[derive(Default)]
pub struct EditorRegistry {
    editors: Vec<Rc<dyn PropertyEditor>>,
    fit_cache: RefCell<HashMap<u64, usize>>,
}

impl EditorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in editor set.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::editors::register_builtins(&mut registry);
        registry
    }

    /// Appends an editor; later registrations take priority.
    pub fn register(&mut self, editor: impl PropertyEditor + 'static) {
        self.editors.push(Rc::new(editor));
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    /// Resolves a property to exactly one editor: cached result if any,
    /// else first fit scanning last-to-first, else first default-flagged
    /// editor, else `None` (the property is omitted from the form).
    pub fn resolve(&self, property: &PropertyDescriptor) -> Option<Rc<dyn PropertyEditor>> {
        if property.id != 0 {
            if let Some(&index) = self.fit_cache.borrow().get(&property.id) {
                return self.editors.get(index).cloned();
            }
        }
        let found = self
            .scan(|e| e.fit(property))
            .or_else(|| self.scan(|e| e.is_default()));
        match found {
            Some(index) => {
                if property.id != 0 {
                    self.fit_cache.borrow_mut().insert(property.id, index);
                }
                Some(self.editors[index].clone())
            }
            None => {
                debug!(property = %property.name, "no editor fits; property will be omitted");
                None
            }
        }
    }

    /// Drops the fit cache. Required after re-registering editors or
    /// redefining properties at runtime.
    pub fn clear_cache(&self) {
        self.fit_cache.borrow_mut().clear();
    }

    fn scan(&self, mut accept: impl FnMut(&Rc<dyn PropertyEditor>) -> bool) -> Option<usize> {
        (0..self.editors.len())
            .rev()
            .find(|&i| accept(&self.editors[i]))
    }
}

impl std::fmt::Debug for EditorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorRegistry")
            .field("editors", &self.editors.len())
            .field("cached", &self.fit_cache.borrow().len())
            .finish()
    }
}
