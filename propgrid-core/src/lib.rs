//! Metadata-driven property grid core.
//!
//! Given an object and the property metadata registered for its class
//! (`propgrid-model`), this crate generates a categorized editing form,
//! keeps it synchronized with the object, and routes every edit through a
//! validation and policy pipeline:
//!
//! - [`EditorRegistry`] maps property shapes to editor strategies; hosts
//!   override built-ins by registering after them.
//! - [`FormGenerator`] turns metadata into a declarative [`FormDescription`]
//!   and binds the instantiated [`FormModel`] back to the object.
//! - [`PropertyGridModel`] owns the live form: value edits, matrix row
//!   lifecycle, validation, category expansion, and title actions.
//! - [`GridOptions`] is the host's policy seam — read-only and visibility
//!   callbacks, value interception, deletion vetoes, the modal surface.
//!
//! Everything is single-threaded by design; handles are `Rc`-shared and
//! state lives behind `RefCell`.

mod actions;
mod editors;
mod field;
mod form;
mod generator;
mod grid;
mod options;
mod registry;

pub use actions::{
    MatrixRowAction, PropertyEditorSetup, StringListSetup, TitleAction, TitleActionKind,
};
pub use editors::{
    register_builtins, BooleanEditor, ColorEditor, ColumnListEditor, DropdownEditor, HtmlEditor,
    ItemValueListEditor, NumberEditor, PageEditor, QuestionEditor, QuestionSelectBaseEditor,
    QuestionValueEditor, SetEditor, StringArrayEditor, StringEditor, TextEditor,
};
pub use field::{
    ColumnDescriptor, FieldDescriptor, FieldKind, FormDescription, FormElement, PanelDescriptor,
    PanelState,
};
pub use form::{
    CellState, FieldHandle, FieldState, FormMode, FormModel, FormSettings, MatrixRow,
    PanelInstance, ValueTranscoder,
};
pub use generator::{property_read_only, FormGenerator};
pub use grid::PropertyGridModel;
pub use options::{GridOptions, ValueChangingEvent};
pub use registry::{
    EditorContext, EditorRegistry, Generation, MatrixCellEvent, PropertyEditor,
};
