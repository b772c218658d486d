//! The policy callback bundle.
//!
//! This is the seam through which the surrounding application customizes
//! every synchronization decision: read-only and visibility policy, value
//! interception, change notification, collection-item vetoes, help text,
//! and the modal surface. Every callback is optional and defaults to a
//! permissive no-op.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use propgrid_model::{Localization, ObjectRef, PropertyDescriptor, ShowMode};

use crate::actions::PropertyEditorSetup;

/// Pre-commit notification for a value edit. The host may rewrite
/// `new_value` before it is applied.
#[derive(Debug, Clone)]
pub struct ValueChangingEvent {
    pub obj: ObjectRef,
    pub property_name: String,
    pub old_value: Value,
    pub new_value: Value,
}

type ReadOnlyFn =
    dyn Fn(&ObjectRef, &PropertyDescriptor, bool, Option<&ObjectRef>, Option<&PropertyDescriptor>) -> bool;
type CanShowFn = dyn Fn(
    &ObjectRef,
    &PropertyDescriptor,
    Option<ShowMode>,
    Option<&ObjectRef>,
    Option<&PropertyDescriptor>,
) -> bool;
type ErrorTextFn = dyn Fn(&str, &ObjectRef, &Value) -> Option<String>;
type ValueChangingFn = dyn Fn(&mut ValueChangingEvent);
type ValueChangedFn = dyn Fn(&PropertyDescriptor, &ObjectRef, &Value);
type ItemAddedFn = dyn Fn(&ObjectRef, &str, &ObjectRef, usize);
type ColumnAddedFn = dyn Fn(&ObjectRef, &ObjectRef, usize);
type ItemDeletingFn = dyn Fn(&ObjectRef, &PropertyDescriptor, &[ObjectRef], &ObjectRef) -> bool;
type CanDeleteFn = dyn Fn(&ObjectRef, &ObjectRef, bool) -> bool;
type HelpTextFn = dyn Fn(&ObjectRef, &PropertyDescriptor) -> Option<String>;
type ShowModalFn = dyn Fn(&mut dyn PropertyEditorSetup) -> bool;

/// Host-supplied options and policy callbacks for one grid.
#[derive(Default)]
pub struct GridOptions {
    /// Renders the whole grid in display mode.
    pub read_only: bool,
    /// Question-reference choices show rendered titles instead of names.
    pub show_titles_in_expressions: bool,
    /// Cap on matrix row count for collection properties.
    pub maximum_rows: Option<usize>,
    pub localization: Rc<Localization>,

    on_is_property_read_only: Option<Box<ReadOnlyFn>>,
    on_can_show_property: Option<Box<CanShowFn>>,
    on_get_error_text: Option<Box<ErrorTextFn>>,
    on_value_changing: Option<Box<ValueChangingFn>>,
    on_property_value_changed: Option<Box<ValueChangedFn>>,
    on_item_value_added: Option<Box<ItemAddedFn>>,
    on_column_added: Option<Box<ColumnAddedFn>>,
    on_collection_item_deleting: Option<Box<ItemDeletingFn>>,
    on_can_delete_item: Option<Box<CanDeleteFn>>,
    on_get_help_text: Option<Box<HelpTextFn>>,
    on_show_modal: Option<Box<ShowModalFn>>,
}

impl GridOptions {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- setters -------------------------------------------------------

    pub fn set_on_is_property_read_only(
        &mut self,
        f: impl Fn(&ObjectRef, &PropertyDescriptor, bool, Option<&ObjectRef>, Option<&PropertyDescriptor>) -> bool
        + 'static,
    ) {
        self.on_is_property_read_only = Some(Box::new(f));
    }

    pub fn set_on_can_show_property(
        &mut self,
        f: impl Fn(
            &ObjectRef,
            &PropertyDescriptor,
            Option<ShowMode>,
            Option<&ObjectRef>,
            Option<&PropertyDescriptor>,
        ) -> bool
        + 'static,
    ) {
        self.on_can_show_property = Some(Box::new(f));
    }

    pub fn set_on_get_error_text(
        &mut self,
        f: impl Fn(&str, &ObjectRef, &Value) -> Option<String> + 'static,
    ) {
        self.on_get_error_text = Some(Box::new(f));
    }

    pub fn set_on_value_changing(&mut self, f: impl Fn(&mut ValueChangingEvent) + 'static) {
        self.on_value_changing = Some(Box::new(f));
    }

    pub fn set_on_property_value_changed(
        &mut self,
        f: impl Fn(&PropertyDescriptor, &ObjectRef, &Value) + 'static,
    ) {
        self.on_property_value_changed = Some(Box::new(f));
    }

    pub fn set_on_item_value_added(&mut self, f: impl Fn(&ObjectRef, &str, &ObjectRef, usize) + 'static) {
        self.on_item_value_added = Some(Box::new(f));
    }

    pub fn set_on_column_added(&mut self, f: impl Fn(&ObjectRef, &ObjectRef, usize) + 'static) {
        self.on_column_added = Some(Box::new(f));
    }

    pub fn set_on_collection_item_deleting(
        &mut self,
        f: impl Fn(&ObjectRef, &PropertyDescriptor, &[ObjectRef], &ObjectRef) -> bool + 'static,
    ) {
        self.on_collection_item_deleting = Some(Box::new(f));
    }

    pub fn set_on_can_delete_item(&mut self, f: impl Fn(&ObjectRef, &ObjectRef, bool) -> bool + 'static) {
        self.on_can_delete_item = Some(Box::new(f));
    }

    pub fn set_on_get_help_text(
        &mut self,
        f: impl Fn(&ObjectRef, &PropertyDescriptor) -> Option<String> + 'static,
    ) {
        self.on_get_help_text = Some(Box::new(f));
    }

    /// Modal surface for setup editors. The callback shows the sub-editor
    /// and returns whether the user confirmed.
    pub fn set_on_show_modal(&mut self, f: impl Fn(&mut dyn PropertyEditorSetup) -> bool + 'static) {
        self.on_show_modal = Some(Box::new(f));
    }

    // ---- dispatch (permissive defaults) --------------------------------

    pub fn is_property_read_only(
        &self,
        obj: &ObjectRef,
        property: &PropertyDescriptor,
        default: bool,
        parent_obj: Option<&ObjectRef>,
        parent_property: Option<&PropertyDescriptor>,
    ) -> bool {
        match &self.on_is_property_read_only {
            Some(f) => f(obj, property, default, parent_obj, parent_property),
            None => default,
        }
    }

    pub fn can_show_property(
        &self,
        obj: &ObjectRef,
        property: &PropertyDescriptor,
        show_mode: Option<ShowMode>,
        parent_obj: Option<&ObjectRef>,
        parent_property: Option<&PropertyDescriptor>,
    ) -> bool {
        match &self.on_can_show_property {
            Some(f) => f(obj, property, show_mode, parent_obj, parent_property),
            None => true,
        }
    }

    pub fn error_text(&self, property_name: &str, obj: &ObjectRef, value: &Value) -> Option<String> {
        self.on_get_error_text
            .as_ref()
            .and_then(|f| f(property_name, obj, value))
    }

    pub fn value_changing(&self, event: &mut ValueChangingEvent) {
        if let Some(f) = &self.on_value_changing {
            f(event);
        }
    }

    pub fn property_value_changed(&self, property: &PropertyDescriptor, obj: &ObjectRef, value: &Value) {
        if let Some(f) = &self.on_property_value_changed {
            f(property, obj, value);
        }
    }

    pub fn item_value_added(&self, owner: &ObjectRef, property_name: &str, item: &ObjectRef, count: usize) {
        if let Some(f) = &self.on_item_value_added {
            f(owner, property_name, item, count);
        }
    }

    pub fn column_added(&self, owner: &ObjectRef, column: &ObjectRef, count: usize) {
        if let Some(f) = &self.on_column_added {
            f(owner, column, count);
        }
    }

    pub fn collection_item_deleting(
        &self,
        owner: &ObjectRef,
        property: &PropertyDescriptor,
        items: &[ObjectRef],
        item: &ObjectRef,
    ) -> bool {
        match &self.on_collection_item_deleting {
            Some(f) => f(owner, property, items, item),
            None => true,
        }
    }

    pub fn can_delete_item(&self, owner: &ObjectRef, item: &ObjectRef, allow: bool) -> bool {
        match &self.on_can_delete_item {
            Some(f) => f(owner, item, allow),
            None => allow,
        }
    }

    pub fn help_text(&self, obj: &ObjectRef, property: &PropertyDescriptor) -> Option<String> {
        self.on_get_help_text.as_ref().and_then(|f| f(obj, property))
    }

    /// Shows a setup editor in the host's modal surface. `None` when no
    /// surface is installed.
    pub fn show_modal(&self, setup: &mut dyn PropertyEditorSetup) -> Option<bool> {
        self.on_show_modal.as_ref().map(|f| f(setup))
    }
}

impl fmt::Debug for GridOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridOptions")
            .field("read_only", &self.read_only)
            .field("show_titles_in_expressions", &self.show_titles_in_expressions)
            .field("maximum_rows", &self.maximum_rows)
            .finish_non_exhaustive()
    }
}
