//! The form generator: object metadata in, form description out.
//!
//! Enumerates an object's declared properties, groups them into category
//! panels, resolves one editor strategy per property, and composes field
//! descriptors. A second pass ([`FormGenerator::setup_fields`]) binds the
//! instantiated fields back to their descriptors and objects, applies the
//! computed visibility/read-only policy, and dispatches `on_created`.

use tracing::debug;

use propgrid_model::{
    CategoryTab, Localization, MetadataRegistry, ObjectRef, PropertyDescriptor, ShowMode,
};

use crate::field::{ColumnDescriptor, FieldDescriptor, FormDescription, FormElement, PanelDescriptor};
use crate::form::FormModel;
use crate::options::GridOptions;
use crate::registry::{EditorContext, EditorRegistry, Generation};

/// Effective read-only state of a property: the static flag filtered
/// through the host's read-only policy callback, with the parent
/// object/property as context for nested-rule decisions.
pub fn property_read_only(
    property: &PropertyDescriptor,
    options: &GridOptions,
    obj: &ObjectRef,
    parent_obj: Option<&ObjectRef>,
    parent_property: Option<&PropertyDescriptor>,
) -> bool {
    options.is_property_read_only(obj, property, property.read_only, parent_obj, parent_property)
}

pub struct FormGenerator<'a> {
    obj: ObjectRef,
    metadata: &'a MetadataRegistry,
    registry: &'a EditorRegistry,
    options: &'a GridOptions,
    parent: Option<(ObjectRef, PropertyDescriptor)>,
}

impl<'a> FormGenerator<'a> {
    pub fn new(
        obj: ObjectRef,
        metadata: &'a MetadataRegistry,
        registry: &'a EditorRegistry,
        options: &'a GridOptions,
    ) -> Self {
        Self {
            obj,
            metadata,
            registry,
            options,
            parent: None,
        }
    }

    /// Generator for an object nested inside a parent's collection
    /// property; the parent pair is passed to policy callbacks.
    pub fn with_parent(
        obj: ObjectRef,
        metadata: &'a MetadataRegistry,
        registry: &'a EditorRegistry,
        options: &'a GridOptions,
        parent: (ObjectRef, PropertyDescriptor),
    ) -> Self {
        Self {
            obj,
            metadata,
            registry,
            options,
            parent: Some(parent),
        }
    }

    /// Builds the form description for the target object. With `nested`
    /// set, the first category's fields are spliced into the top level
    /// instead of being wrapped in a panel (detail panels stay compact).
    ///
    /// An object whose class has no registered metadata yields an empty
    /// description — misuse never raises here.
    pub fn generate(&self, nested: bool) -> FormDescription {
        let tabs = self.metadata.tabs_of(&self.obj);
        if tabs.is_empty() {
            debug!(class = self.obj.class_name(), "no metadata; generating empty form");
        }
        let mut description = FormDescription::default();
        for (index, tab) in tabs.iter().enumerate() {
            let panel = self.create_panel(tab, index == 0);
            if nested && index == 0 {
                description
                    .elements
                    .extend(panel.elements.into_iter().map(FormElement::Field));
            } else {
                description.elements.push(FormElement::Panel(panel));
            }
        }
        description
    }

    /// Lightweight column descriptors for a fixed set of named properties
    /// on a class. Columns whose visibility policy rejects the `list`
    /// show-mode are skipped.
    pub fn create_columns(&self, class_name: &str, names: &[String]) -> Vec<ColumnDescriptor> {
        let mut columns = Vec::new();
        for name in names {
            let Some(property) = self.metadata.find_property(class_name, name) else {
                continue;
            };
            let Some(field) = self.create_field(&property, true) else {
                continue;
            };
            columns.push(field.into_column());
        }
        columns
    }

    /// Second pass: binds instantiated fields to (object, property,
    /// options), applies computed visibility and read-only state, attaches
    /// help text, and runs each editor's `on_created` hook.
    pub fn setup_fields(&self, form: &FormModel, generation: &Generation) {
        let properties = self.metadata.properties_of(&self.obj);
        for handle in form.fields() {
            let property = {
                let field = handle.borrow();
                properties.iter().find(|p| p.name == field.name()).cloned()
            };
            let Some(property) = property else { continue };

            let parent = self.parent_refs();
            let event_visibility = self.options.can_show_property(
                &self.obj,
                &property,
                None,
                parent.map(|(o, _)| o),
                parent.map(|(_, p)| p),
            );
            let help_text = self.options.help_text(&self.obj, &property);
            {
                let mut field = handle.borrow_mut();
                field.read_only = property_read_only(
                    &property,
                    self.options,
                    &self.obj,
                    parent.map(|(o, _)| o),
                    parent.map(|(_, p)| p),
                );
                field.visible = field.descriptor.visible && event_visibility;
                if let Some(text) = help_text {
                    field.descriptor.description = Some(text);
                }
                field.obj = Some(self.obj.clone());
                field.property = Some(property.clone());
            }
            if let Some(editor) = self.registry.resolve(&property) {
                let ctx = self.context(&property, generation.clone());
                editor.on_created(&ctx, handle);
            }
        }
    }

    pub(crate) fn context<'b>(
        &'b self,
        property: &'b PropertyDescriptor,
        generation: Generation,
    ) -> EditorContext<'b> {
        EditorContext {
            obj: &self.obj,
            property,
            options: self.options,
            metadata: self.metadata,
            registry: self.registry,
            generation,
            parent: self.parent_refs(),
        }
    }

    fn parent_refs(&self) -> Option<(&ObjectRef, &PropertyDescriptor)> {
        self.parent.as_ref().map(|(o, p)| (o, p))
    }

    fn create_panel(&self, tab: &CategoryTab, is_first: bool) -> PanelDescriptor {
        let title = self.panel_title(tab);
        let mut panel = PanelDescriptor::new(&tab.name, title, is_first);
        for property in &tab.properties {
            if !self.is_property_visible(property, Some(ShowMode::Form)) {
                continue;
            }
            if let Some(field) = self.create_field(property, false) {
                panel.elements.push(field);
            }
        }
        panel
    }

    /// One field descriptor for one property: the resolved strategy's
    /// output merged with generic overrides. `None` omits the property.
    fn create_field(&self, property: &PropertyDescriptor, is_column: bool) -> Option<FieldDescriptor> {
        if is_column {
            if !self.is_property_visible(property, Some(ShowMode::List)) {
                return None;
            }
            let parent = self.parent_refs();
            if !self.options.can_show_property(
                &self.obj,
                property,
                Some(ShowMode::List),
                parent.map(|(o, _)| o),
                parent.map(|(_, p)| p),
            ) {
                return None;
            }
        }
        let editor = self.registry.resolve(property)?;
        let ctx = self.context(property, Generation::detached());
        let mut field = editor.build(&ctx);
        field.name = property.name.clone();
        field.visible = property.visible;
        field.is_read_only = property.read_only;
        field.is_required = property.is_required;
        field.is_unique = property.is_unique;
        field.title = Some(self.field_title(property));
        // Metadata defaults override whatever the strategy baked in.
        field.default_value = property.default_value.clone().or(field.default_value.take());
        Some(field)
    }

    fn is_property_visible(&self, property: &PropertyDescriptor, show_mode: Option<ShowMode>) -> bool {
        if !property.visible {
            return false;
        }
        match (show_mode, property.show_mode) {
            (Some(wanted), Some(declared)) => wanted == declared,
            _ => true,
        }
    }

    fn panel_title(&self, tab: &CategoryTab) -> String {
        match &tab.title {
            Some(title) if !title.is_empty() => title.clone(),
            _ => self.localization().tab_title(&tab.name),
        }
    }

    /// Title resolution: explicit override (unless it is just the bare
    /// property name) → display name metadata → localized lookup.
    fn field_title(&self, property: &PropertyDescriptor) -> String {
        if let Some(title) = &property.title {
            if !title.is_empty() && title != &property.name {
                return title.clone();
            }
        }
        if let Some(display_name) = &property.display_name {
            return display_name.clone();
        }
        self.localization().property_name(&property.name)
    }

    fn localization(&self) -> &Localization {
        &self.options.localization
    }
}
