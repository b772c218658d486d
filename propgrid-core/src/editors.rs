//! Built-in editor strategies, one per property shape.
//!
//! Registration order matters: the registry scans last-to-first, so the
//! specializations registered after [`DropdownEditor`] (set, page) win for
//! the shapes they recognize, and host code can override any of these by
//! registering its own editor afterwards.

use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use propgrid_model::{
    ChoiceItem, ChoiceSink, Localization, ObjectInstance, ObjectRef, PropertyDescriptor,
    PropertyType, ShowMode,
};

use crate::actions::{PropertyEditorSetup, StringListSetup};
use crate::field::{FieldDescriptor, FieldKind};
use crate::form::FieldHandle;
use crate::generator::FormGenerator;
use crate::registry::{EditorContext, EditorRegistry, PropertyEditor};

/// Registers the built-in set in canonical order.
pub fn register_builtins(registry: &mut EditorRegistry) {
    registry.register(BooleanEditor);
    registry.register(StringEditor);
    registry.register(NumberEditor);
    registry.register(ColorEditor);
    registry.register(TextEditor);
    registry.register(HtmlEditor);
    registry.register(DropdownEditor);
    registry.register(SetEditor);
    registry.register(PageEditor);
    registry.register(StringArrayEditor);
    registry.register(QuestionEditor);
    registry.register(QuestionValueEditor);
    registry.register(QuestionSelectBaseEditor);
    registry.register(ItemValueListEditor);
    registry.register(ColumnListEditor);
}

// ---- choice population --------------------------------------------------

/// Populates a field's choice list from the property's choice source.
///
/// The synchronous return value is applied eagerly; the sink handed to a
/// dynamic provider repopulates the field in place if invoked later, and
/// is a no-op once the grid's generation has moved on.
fn populate_choices(ctx: &EditorContext<'_>, field: &FieldHandle, allow_button_group: bool) {
    let weak = Rc::downgrade(field);
    let generation = ctx.generation.clone();
    let property = ctx.property.clone();
    let localization = ctx.options.localization.clone();
    let sink: ChoiceSink = Box::new(move |items| {
        if generation.is_stale() {
            debug!(property = %property.name, "ignoring stale choice completion");
            return;
        }
        if let Some(handle) = weak.upgrade() {
            apply_choices(&handle, &property, &localization, items, allow_button_group);
        }
    });
    if let Some(items) = ctx.property.choices.load(ctx.obj, sink) {
        apply_choices(
            field,
            ctx.property,
            &ctx.options.localization,
            items,
            allow_button_group,
        );
    }
}

/// Empty lists never overwrite existing choices.
fn apply_choices(
    field: &FieldHandle,
    property: &PropertyDescriptor,
    localization: &Localization,
    items: Vec<ChoiceItem>,
    allow_button_group: bool,
) {
    if items.is_empty() {
        return;
    }
    let choices: Vec<ChoiceItem> = items
        .into_iter()
        .map(|item| localize_choice(property, localization, item))
        .collect();
    let mut state = field.borrow_mut();
    if allow_button_group && choices.len() < 5 {
        state.descriptor.render_as = Some("button-group".to_string());
    }
    state.choices = choices;
}

fn localize_choice(
    property: &PropertyDescriptor,
    localization: &Localization,
    item: ChoiceItem,
) -> ChoiceItem {
    if item.text.is_some() {
        return item;
    }
    let Some(raw) = item.value.as_str() else {
        return item;
    };
    let text = match property.name.as_str() {
        "locale" => localization.locale_name(raw),
        "cellType" => localization.question_type_name(raw),
        _ => None,
    }
    .or_else(|| localization.property_value(raw));
    match text {
        Some(t) if t != raw => ChoiceItem::with_text(item.value.clone(), &t),
        _ => item,
    }
}

// ---- survey navigation helpers ------------------------------------------

/// Root of the object's parent chain, when it is a survey.
pub(crate) fn root_survey(obj: &ObjectRef) -> Option<ObjectRef> {
    let root = obj.root();
    (root.class_name() == "survey").then_some(root)
}

/// All questions of a survey, page order preserved.
pub(crate) fn survey_questions(survey: &ObjectRef) -> Vec<ObjectRef> {
    survey
        .children("pages")
        .iter()
        .flat_map(|page| page.children("elements"))
        .collect()
}

/// Question-reference choices: candidate questions mapped to choice items
/// and sorted case-insensitively by display text.
fn question_choices(
    ctx: &EditorContext<'_>,
    accept: impl Fn(&EditorContext<'_>, &ObjectRef) -> bool,
    item_value: impl Fn(&ObjectRef) -> Value,
) -> Vec<ChoiceItem> {
    let Some(survey) = root_survey(ctx.obj) else {
        return Vec::new();
    };
    let mut items: Vec<ChoiceItem> = survey_questions(&survey)
        .into_iter()
        .filter(|q| accept(ctx, q))
        .map(|q| {
            let name = q.get_str("name").unwrap_or_default();
            let text = if ctx.options.show_titles_in_expressions {
                q.get_str("title").filter(|t| !t.is_empty()).unwrap_or_else(|| name.clone())
            } else {
                name.clone()
            };
            ChoiceItem::with_text(item_value(&q), &text)
        })
        .collect();
    items.sort_by_key(|item| item.display_text().to_lowercase());
    items
}

// ---- scalar editors ------------------------------------------------------

pub struct BooleanEditor;

impl PropertyEditor for BooleanEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        matches!(
            property.property_type,
            PropertyType::Boolean | PropertyType::Switch
        )
    }

    fn build(&self, _ctx: &EditorContext<'_>) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(FieldKind::Boolean);
        field.default_value = Some(Value::Bool(false));
        field.render_as = Some("checkbox".to_string());
        field.title_location = Some("hidden".to_string());
        field
    }
}

pub struct StringEditor;

impl PropertyEditor for StringEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == PropertyType::String
    }

    fn is_default(&self) -> bool {
        true
    }

    fn build(&self, _ctx: &EditorContext<'_>) -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::Text)
    }
}

pub struct NumberEditor;

impl PropertyEditor for NumberEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == PropertyType::Number
    }

    fn build(&self, ctx: &EditorContext<'_>) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(FieldKind::Text);
        field.input_type = Some("number".to_string());
        field.min = ctx.property.min_value;
        field.max = ctx.property.max_value;
        field
    }
}

pub struct TextEditor;

impl PropertyEditor for TextEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == PropertyType::Text
    }

    fn build(&self, _ctx: &EditorContext<'_>) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(FieldKind::Comment);
        field.text_update_mode = Some("on_typing".to_string());
        field
    }
}

pub struct HtmlEditor;

impl PropertyEditor for HtmlEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == PropertyType::Html
    }

    fn build(&self, _ctx: &EditorContext<'_>) -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::Comment)
    }
}

pub struct ColorEditor;

impl PropertyEditor for ColorEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == PropertyType::Color
    }

    fn build(&self, _ctx: &EditorContext<'_>) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(FieldKind::Text);
        field.input_type = Some("color".to_string());
        field
    }
}

// ---- choice-bearing editors ----------------------------------------------

/// Generic dropdown: fits any choice-bearing property; the fallback all
/// the choice specializations layer on.
pub struct DropdownEditor;

impl PropertyEditor for DropdownEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.has_choices()
    }

    fn build(&self, _ctx: &EditorContext<'_>) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(FieldKind::Dropdown);
        field.show_options_caption = Some(false);
        field
    }

    fn on_created(&self, ctx: &EditorContext<'_>, field: &FieldHandle) {
        populate_choices(ctx, field, true);
    }
}

/// Multi-select set: tagbox when the host metadata knows the widget,
/// otherwise a checkbox list with select-all.
pub struct SetEditor;

impl PropertyEditor for SetEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == PropertyType::Set
    }

    fn build(&self, ctx: &EditorContext<'_>) -> FieldDescriptor {
        let has_tagbox = ctx.metadata.find_class("tagbox").is_some();
        let mut field = FieldDescriptor::new(if has_tagbox {
            FieldKind::Tagbox
        } else {
            FieldKind::Checkbox
        });
        field.has_select_all = Some(!has_tagbox);
        field.show_options_caption = Some(false);
        field
    }

    fn on_created(&self, ctx: &EditorContext<'_>, field: &FieldHandle) {
        populate_choices(ctx, field, false);
    }
}

/// Page reference: a choice list of page names, transcoded so a name that
/// no longer resolves against the root survey's pages stores as null.
pub struct PageEditor;

impl PropertyEditor for PageEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.has_choices() && property.name == "page"
    }

    fn build(&self, _ctx: &EditorContext<'_>) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(FieldKind::Dropdown);
        field.show_options_caption = Some(false);
        field
    }

    fn on_created(&self, ctx: &EditorContext<'_>, field: &FieldHandle) {
        populate_choices(ctx, field, false);
        let obj = ctx.obj.clone();
        field.borrow_mut().value_to_data = Some(Rc::new(move |value| {
            let Some(name) = value.as_str() else {
                return Value::Null;
            };
            let found = root_survey(&obj).and_then(|survey| {
                survey
                    .children("pages")
                    .into_iter()
                    .find(|p| p.get_str("name").as_deref() == Some(name))
            });
            match found {
                Some(_) => Value::String(name.to_string()),
                None => Value::Null,
            }
        }));
    }
}

/// String list edited as a multiline blob, one item per line.
pub struct StringArrayEditor;

impl PropertyEditor for StringArrayEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == PropertyType::StringArray
    }

    fn build(&self, _ctx: &EditorContext<'_>) -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::Comment)
    }

    fn on_created(&self, _ctx: &EditorContext<'_>, field: &FieldHandle) {
        let mut state = field.borrow_mut();
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

    fn can_clear_value(&self) -> bool {
        true
    }

    fn clear_value(&self, ctx: &EditorContext<'_>, field: &FieldHandle) {
        ctx.obj.set(&ctx.property.name, Value::Array(Vec::new()));
        field.borrow_mut().error = None;
    }

    fn has_setup(&self) -> bool {
        true
    }

    fn create_setup(
        &self,
        ctx: &EditorContext<'_>,
        _field: &FieldHandle,
    ) -> Option<Box<dyn PropertyEditorSetup>> {
        Some(Box::new(StringListSetup::new(
            ctx.obj.clone(),
            ctx.property.clone(),
        )))
    }
}

// ---- question references -------------------------------------------------

pub struct QuestionEditor;

impl PropertyEditor for QuestionEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == PropertyType::Question
    }

    fn build(&self, ctx: &EditorContext<'_>) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(FieldKind::Dropdown);
        field.options_caption = Some(
            ctx.options
                .localization
                .get("pe.conditionSelectQuestion")
                .unwrap_or("Select question...")
                .to_string(),
        );
        field.choices = question_choices(ctx, |_, _| true, |q| {
            Value::String(q.get_str("name").unwrap_or_default())
        });
        field
    }
}

/// Question reference restricted to select-base descendants, excluding
/// the edited object itself.
pub struct QuestionSelectBaseEditor;

impl PropertyEditor for QuestionSelectBaseEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == PropertyType::QuestionSelectBase
    }

    fn build(&self, ctx: &EditorContext<'_>) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(FieldKind::Dropdown);
        field.options_caption = Some(
            ctx.options
                .localization
                .get("pe.conditionSelectQuestion")
                .unwrap_or("Select question...")
                .to_string(),
        );
        field.choices = question_choices(
            ctx,
            |ctx, q| {
                !Rc::ptr_eq(q, ctx.obj) && ctx.metadata.is_descendant_of(q.class_name(), "selectbase")
            },
            |q| Value::String(q.get_str("name").unwrap_or_default()),
        );
        field
    }
}

/// Question reference transcoding to the question's value name rather
/// than its bare name.
pub struct QuestionValueEditor;

impl PropertyEditor for QuestionValueEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == PropertyType::QuestionValue
    }

    fn build(&self, ctx: &EditorContext<'_>) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(FieldKind::Dropdown);
        field.choices = question_choices(ctx, |_, _| true, |q| {
            let value_name = q
                .get_str("valueName")
                .filter(|v| !v.is_empty())
                .or_else(|| q.get_str("name"))
                .unwrap_or_default();
            Value::String(value_name)
        });
        field
    }
}

// ---- collection editors --------------------------------------------------

/// Matrix field shared by the collection editors: columns from the
/// element class's declared column properties, detail panel from a
/// representative element generated with nested flattening.
fn build_matrix(ctx: &EditorContext<'_>, fallback_class: &str) -> FieldDescriptor {
    let element_class = ctx
        .property
        .class_name
        .clone()
        .unwrap_or_else(|| fallback_class.to_string());
    let parent = (ctx.obj.clone(), ctx.property.clone());

    let mut field = FieldDescriptor::new(FieldKind::MatrixDynamic);
    let generator = FormGenerator::with_parent(
        ctx.obj.clone(),
        ctx.metadata,
        ctx.registry,
        ctx.options,
        parent.clone(),
    );
    field.columns = generator.create_columns(&element_class, &column_names(ctx, &element_class));

    let sample = ObjectInstance::new(&element_class);
    let detail_generator =
        FormGenerator::with_parent(sample, ctx.metadata, ctx.registry, ctx.options, parent);
    let detail = detail_generator.generate(true);
    if !detail.is_empty() {
        field.detail = Some(detail);
    }
    field.max_row_count = ctx.options.maximum_rows;
    field
}

/// Declared column names, defaulting to every element property not marked
/// form-only.
fn column_names(ctx: &EditorContext<'_>, element_class: &str) -> Vec<String> {
    if !ctx.property.column_names.is_empty() {
        return ctx.property.column_names.clone();
    }
    ctx.metadata
        .properties_of_class(element_class)
        .iter()
        .filter(|p| p.show_mode != Some(ShowMode::Form))
        .map(|p| p.name.clone())
        .collect()
}

/// Collection of simple choice items (`itemvalue` descendants) edited as
/// matrix rows.
pub struct ItemValueListEditor;

impl PropertyEditor for ItemValueListEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == PropertyType::ItemValues
    }

    fn build(&self, ctx: &EditorContext<'_>) -> FieldDescriptor {
        build_matrix(ctx, "itemvalue")
    }

    fn can_clear_value(&self) -> bool {
        true
    }

    fn clear_value(&self, ctx: &EditorContext<'_>, field: &FieldHandle) {
        ctx.obj.clear_children(&ctx.property.name);
        let mut state = field.borrow_mut();
        state.rows.clear();
        state.error = None;
    }
}

/// Collection of column definitions (`matrixdropdowncolumn` descendants).
pub struct ColumnListEditor;

impl PropertyEditor for ColumnListEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == PropertyType::Columns
    }

    fn build(&self, ctx: &EditorContext<'_>) -> FieldDescriptor {
        build_matrix(ctx, "matrixdropdowncolumn")
    }
}
