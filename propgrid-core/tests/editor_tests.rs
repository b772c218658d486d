use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use propgrid_model::{
    ChoiceItem, ChoiceSink, ClassMetadata, MetadataRegistry, ObjectInstance, ObjectRef,
    PropertyDescriptor,
};
use propgrid_core::{
    EditorRegistry, FieldKind, GridOptions, PropertyGridModel, TitleActionKind,
};

fn grid_for(metadata: MetadataRegistry, options: GridOptions) -> PropertyGridModel {
    PropertyGridModel::new(
        Rc::new(metadata),
        Rc::new(EditorRegistry::with_builtins()),
        Rc::new(options),
    )
}

fn question_metadata(extra: PropertyDescriptor) -> MetadataRegistry {
    let mut metadata = MetadataRegistry::new();
    metadata
        .register_class(
            ClassMetadata::new("question")
                .with_property(PropertyDescriptor::string("name"))
                .with_property(extra),
        )
        .unwrap();
    metadata
}

/// survey → one page → questions with the given (class, name) pairs.
fn survey_with_questions(questions: &[(&str, &str)]) -> (ObjectRef, ObjectRef) {
    let survey = ObjectInstance::new("survey");
    let page = ObjectInstance::new("page");
    page.set("name", json!("page1"));
    survey.add_child("pages", page.clone());
    let mut first = None;
    for (class, name) in questions {
        let q = ObjectInstance::new(class);
        q.set("name", json!(name));
        page.add_child("elements", q.clone());
        first.get_or_insert(q);
    }
    (survey, first.expect("at least one question"))
}

// ── dropdown choices ─────────────────────────────────────────────

#[test]
fn few_choices_render_as_button_group() {
    let metadata = question_metadata(PropertyDescriptor::string("size").with_choices(vec![
        ChoiceItem::new("small"),
        ChoiceItem::new("medium"),
        ChoiceItem::new("large"),
    ]));
    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(ObjectInstance::new("question")));

    let field = grid.form().unwrap().get_field("size").unwrap();
    let state = field.borrow();
    assert_eq!(state.descriptor.kind, FieldKind::Dropdown);
    assert_eq!(state.descriptor.render_as.as_deref(), Some("button-group"));
    assert_eq!(state.choices.len(), 3);
}

#[test]
fn many_choices_stay_a_dropdown() {
    let choices = (1..=5).map(|n| ChoiceItem::new(format!("v{n}"))).collect();
    let metadata = question_metadata(PropertyDescriptor::string("size").with_choices(choices));
    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(ObjectInstance::new("question")));

    let field = grid.form().unwrap().get_field("size").unwrap();
    assert_eq!(field.borrow().descriptor.render_as, None);
}

#[test]
fn locale_choices_get_display_names() {
    let metadata = question_metadata(
        PropertyDescriptor::string("locale")
            .with_choices(vec![ChoiceItem::new("en"), ChoiceItem::new("xx")]),
    );
    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(ObjectInstance::new("question")));

    let field = grid.form().unwrap().get_field("locale").unwrap();
    let state = field.borrow();
    assert_eq!(state.choices[0].display_text(), "English");
    // Unknown codes keep the raw value.
    assert_eq!(state.choices[1].display_text(), "xx");
}

// ── asynchronous choice completion ───────────────────────────────

type SinkSlot = Rc<RefCell<Option<ChoiceSink>>>;

fn deferred_choice_property(name: &str, slot: &SinkSlot) -> PropertyDescriptor {
    let slot = slot.clone();
    PropertyDescriptor::string(name).with_choice_provider(move |_obj, sink| {
        *slot.borrow_mut() = Some(sink);
        None
    })
}

#[test]
fn deferred_completion_populates_the_field() {
    let slot: SinkSlot = Rc::new(RefCell::new(None));
    let metadata = question_metadata(deferred_choice_property("currency", &slot));
    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(ObjectInstance::new("question")));

    let field = grid.form().unwrap().get_field("currency").unwrap();
    assert!(field.borrow().choices.is_empty());

    let sink = slot.borrow_mut().take().unwrap();
    sink(vec![ChoiceItem::new("EUR"), ChoiceItem::new("USD")]);
    assert_eq!(field.borrow().choices.len(), 2);
}

#[test]
fn stale_completion_is_ignored() {
    let slot: SinkSlot = Rc::new(RefCell::new(None));
    let metadata = question_metadata(deferred_choice_property("currency", &slot));
    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(ObjectInstance::new("question")));

    let stale_sink = slot.borrow_mut().take().unwrap();

    // Rebuild for a new object; the old sink now belongs to a dead form.
    grid.set_object(Some(ObjectInstance::new("question")));
    stale_sink(vec![ChoiceItem::new("EUR")]);

    let field = grid.form().unwrap().get_field("currency").unwrap();
    assert!(field.borrow().choices.is_empty());

    // The fresh sink still works.
    let sink = slot.borrow_mut().take().unwrap();
    sink(vec![ChoiceItem::new("EUR")]);
    assert_eq!(field.borrow().choices.len(), 1);
}

#[test]
fn empty_completion_keeps_existing_choices() {
    let slot: SinkSlot = Rc::new(RefCell::new(None));
    let slot2 = slot.clone();
    let metadata = question_metadata(PropertyDescriptor::string("currency").with_choice_provider(
        move |_obj, sink| {
            *slot2.borrow_mut() = Some(sink);
            Some(vec![ChoiceItem::new("EUR")])
        },
    ));
    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(ObjectInstance::new("question")));

    let field = grid.form().unwrap().get_field("currency").unwrap();
    assert_eq!(field.borrow().choices.len(), 1);

    let sink = slot.borrow_mut().take().unwrap();
    sink(Vec::new());
    assert_eq!(field.borrow().choices.len(), 1);
}

// ── set editor ───────────────────────────────────────────────────

#[test]
fn set_without_tagbox_widget_is_a_checkbox() {
    let metadata = question_metadata(PropertyDescriptor::set(
        "commentFields",
        vec![ChoiceItem::new("a"), ChoiceItem::new("b")],
    ));
    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(ObjectInstance::new("question")));

    let field = grid.form().unwrap().get_field("commentFields").unwrap();
    let state = field.borrow();
    assert_eq!(state.descriptor.kind, FieldKind::Checkbox);
    assert_eq!(state.descriptor.has_select_all, Some(true));
}

#[test]
fn set_with_tagbox_widget_is_a_tagbox() {
    let mut metadata = question_metadata(PropertyDescriptor::set(
        "commentFields",
        vec![ChoiceItem::new("a")],
    ));
    metadata.register_class(ClassMetadata::new("tagbox")).unwrap();
    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(ObjectInstance::new("question")));

    let field = grid.form().unwrap().get_field("commentFields").unwrap();
    let state = field.borrow();
    assert_eq!(state.descriptor.kind, FieldKind::Tagbox);
    assert_eq!(state.descriptor.has_select_all, Some(false));
}

// ── page editor ──────────────────────────────────────────────────

fn page_property() -> PropertyDescriptor {
    PropertyDescriptor::string("page").with_choice_provider(|obj, _sink| {
        let root = obj.root();
        Some(
            root.children("pages")
                .iter()
                .filter_map(|p| p.get_str("name"))
                .map(ChoiceItem::new)
                .collect(),
        )
    })
}

#[test]
fn page_value_stores_the_page_name() {
    let metadata = question_metadata(page_property());
    let (_survey, question) = survey_with_questions(&[("question", "q1")]);

    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(question.clone()));

    assert_eq!(grid.set_value("page", json!("page1")), None);
    assert_eq!(question.get("page"), json!("page1"));
}

#[test]
fn unknown_page_name_stores_null() {
    let metadata = question_metadata(page_property());
    let (_survey, question) = survey_with_questions(&[("question", "q1")]);

    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(question.clone()));

    grid.set_value("page", json!("page1"));
    grid.set_value("page", json!("ghost"));
    assert_eq!(question.get("page"), Value::Null);
}

// ── question references ──────────────────────────────────────────

#[test]
fn question_choices_are_sorted_case_insensitively() {
    let metadata = question_metadata(PropertyDescriptor::question("enableIf"));
    let (_survey, first) =
        survey_with_questions(&[("question", "zeta"), ("question", "Alpha"), ("question", "beta")]);

    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(first));

    let field = grid.form().unwrap().get_field("enableIf").unwrap();
    let state = field.borrow();
    let texts: Vec<String> = state.choices.iter().map(|c| c.display_text()).collect();
    assert_eq!(texts, ["Alpha", "beta", "zeta"]);
    assert_eq!(
        state.descriptor.options_caption.as_deref(),
        Some("Select question...")
    );
}

#[test]
fn question_titles_shown_when_enabled() {
    let metadata = question_metadata(PropertyDescriptor::question("enableIf"));
    let (_survey, first) = survey_with_questions(&[("question", "q1"), ("question", "q2")]);
    first.root().children("pages")[0].children("elements")[1].set("title", json!("Second one"));

    let mut options = GridOptions::new();
    options.show_titles_in_expressions = true;
    let mut grid = grid_for(metadata, options);
    grid.set_object(Some(first));

    let field = grid.form().unwrap().get_field("enableIf").unwrap();
    let state = field.borrow();
    let texts: Vec<String> = state.choices.iter().map(|c| c.display_text()).collect();
    assert_eq!(texts, ["q1", "Second one"]);
    // Values stay names regardless of displayed text.
    assert_eq!(state.choices[1].value, json!("q2"));
}

#[test]
fn select_base_reference_excludes_self_and_other_kinds() {
    let mut metadata =
        question_metadata(PropertyDescriptor::question_select_base("choicesFromQuestion"));
    metadata
        .register_class(ClassMetadata::new("selectbase").with_base("question"))
        .unwrap();
    metadata
        .register_class(ClassMetadata::new("dropdown").with_base("selectbase"))
        .unwrap();

    // Edit a dropdown: it must not offer itself as a source, and plain
    // text questions never qualify.
    let (_survey, editing) = survey_with_questions(&[
        ("dropdown", "colors"),
        ("dropdown", "sizes"),
        ("text", "freeform"),
    ]);

    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(editing));

    let field = grid.form().unwrap().get_field("choicesFromQuestion").unwrap();
    let texts: Vec<String> = field
        .borrow()
        .choices
        .iter()
        .map(|c| c.display_text())
        .collect();
    assert_eq!(texts, ["sizes"]);
}

#[test]
fn question_value_prefers_value_name() {
    let metadata = question_metadata(PropertyDescriptor::question_value("bindTo"));
    let (_survey, first) = survey_with_questions(&[("question", "q1"), ("question", "q2")]);
    first.root().children("pages")[0].children("elements")[1].set("valueName", json!("answer"));

    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(first));

    let field = grid.form().unwrap().get_field("bindTo").unwrap();
    let values: Vec<Value> = field.borrow().choices.iter().map(|c| c.value.clone()).collect();
    assert_eq!(values, [json!("q1"), json!("answer")]);
}

#[test]
fn question_reference_outside_a_survey_has_no_choices() {
    let metadata = question_metadata(PropertyDescriptor::question("enableIf"));
    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(ObjectInstance::new("question")));

    let field = grid.form().unwrap().get_field("enableIf").unwrap();
    assert!(field.borrow().choices.is_empty());
}

// ── string arrays ────────────────────────────────────────────────

#[test]
fn string_array_round_trips_through_newlines() {
    let metadata = question_metadata(PropertyDescriptor::string_array("tags"));
    let mut grid = grid_for(metadata, GridOptions::new());
    let obj = ObjectInstance::new("question");
    obj.set("tags", json!(["item1", "item2"]));
    grid.set_object(Some(obj.clone()));

    assert_eq!(grid.value("tags"), json!("item1\nitem2"));

    grid.set_value("tags", json!("alpha\nbeta\ngamma"));
    assert_eq!(obj.get("tags"), json!(["alpha", "beta", "gamma"]));

    grid.set_value("tags", json!(""));
    assert_eq!(obj.get("tags"), json!([]));
}

#[test]
fn string_array_offers_clear_and_setup_actions() {
    let metadata = question_metadata(PropertyDescriptor::string_array("tags"));
    let mut grid = grid_for(metadata, GridOptions::new());
    let obj = ObjectInstance::new("question");
    obj.set("tags", json!(["a"]));
    grid.set_object(Some(obj.clone()));

    let actions = grid.title_actions("tags");
    let ids: Vec<&str> = actions.iter().map(|a| a.id).collect();
    assert_eq!(ids, ["property-grid-clear", "property-grid-setup"]);
    assert!(actions.iter().all(|a| a.enabled));

    assert!(grid.run_title_action("tags", TitleActionKind::ClearValue));
    assert_eq!(obj.get("tags"), json!([]));

    // Clearing twice is idempotent.
    assert!(grid.run_title_action("tags", TitleActionKind::ClearValue));
    assert_eq!(obj.get("tags"), json!([]));
}

#[test]
fn plain_string_fields_have_no_title_actions() {
    let metadata = question_metadata(PropertyDescriptor::string("title"));
    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(ObjectInstance::new("question")));

    assert!(grid.title_actions("name").is_empty());
}

#[test]
fn actions_disabled_on_read_only_fields() {
    let metadata = question_metadata(PropertyDescriptor::string_array("tags").read_only());
    let mut grid = grid_for(metadata, GridOptions::new());
    let obj = ObjectInstance::new("question");
    obj.set("tags", json!(["a"]));
    grid.set_object(Some(obj.clone()));

    assert!(grid.title_actions("tags").iter().all(|a| !a.enabled));
    assert!(!grid.run_title_action("tags", TitleActionKind::ClearValue));
    assert_eq!(obj.get("tags"), json!(["a"]));
}

// ── setup editors ────────────────────────────────────────────────

#[test]
fn confirmed_setup_applies_scratch_edits() {
    let metadata = question_metadata(PropertyDescriptor::string_array("tags"));
    let mut options = GridOptions::new();
    options.set_on_show_modal(|setup| {
        let field = setup.form().get_field("tags").unwrap();
        // The modal edits one multiline blob.
        assert_eq!(field.borrow().value(), json!("a\nb"));
        field.borrow().commit(json!("one\ntwo"));
        true
    });

    let mut grid = grid_for(metadata, options);
    let obj = ObjectInstance::new("question");
    obj.set("tags", json!(["a", "b"]));
    grid.set_object(Some(obj.clone()));

    assert!(grid.run_title_action("tags", TitleActionKind::SetupEditor));
    assert_eq!(obj.get("tags"), json!(["one", "two"]));
}

#[test]
fn cancelled_setup_leaves_the_object_alone() {
    let metadata = question_metadata(PropertyDescriptor::string_array("tags"));
    let mut options = GridOptions::new();
    options.set_on_show_modal(|setup| {
        let field = setup.form().get_field("tags").unwrap();
        field.borrow().commit(json!("discarded"));
        false
    });

    let mut grid = grid_for(metadata, options);
    let obj = ObjectInstance::new("question");
    obj.set("tags", json!(["a"]));
    grid.set_object(Some(obj.clone()));

    assert!(!grid.run_title_action("tags", TitleActionKind::SetupEditor));
    assert_eq!(obj.get("tags"), json!(["a"]));
}

#[test]
fn setup_without_modal_surface_is_inert() {
    let metadata = question_metadata(PropertyDescriptor::string_array("tags"));
    let mut grid = grid_for(metadata, GridOptions::new());
    let obj = ObjectInstance::new("question");
    grid.set_object(Some(obj));

    assert!(!grid.run_title_action("tags", TitleActionKind::SetupEditor));
}

// ── matrix details ───────────────────────────────────────────────

#[test]
fn matrix_fields_carry_columns_and_detail() {
    let mut metadata = MetadataRegistry::new();
    metadata
        .register_class(
            ClassMetadata::new("itemvalue")
                .with_property(PropertyDescriptor::string("value").required())
                .with_property(PropertyDescriptor::string("text")),
        )
        .unwrap();
    metadata
        .register_class(ClassMetadata::new("dropdown").with_property(
            PropertyDescriptor::item_values("choices", "itemvalue"),
        ))
        .unwrap();

    let mut grid = grid_for(metadata, GridOptions::new());
    grid.set_object(Some(ObjectInstance::new("dropdown")));

    let field = grid.form().unwrap().get_field("choices").unwrap();
    let state = field.borrow();
    // Declared columns default to every element property.
    let columns: Vec<&str> = state.descriptor.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, ["value", "text"]);

    let detail = state.descriptor.detail.as_ref().unwrap();
    let detail_fields: Vec<&str> = detail.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(detail_fields, ["value", "text"]);
}

#[test]
fn cell_read_only_policy_blocks_cell_edits() {
    let mut metadata = MetadataRegistry::new();
    metadata
        .register_class(
            ClassMetadata::new("itemvalue")
                .with_property(PropertyDescriptor::string("value"))
                .with_property(PropertyDescriptor::string("text")),
        )
        .unwrap();
    metadata
        .register_class(ClassMetadata::new("dropdown").with_property(
            PropertyDescriptor::item_values("choices", "itemvalue"),
        ))
        .unwrap();

    let mut options = GridOptions::new();
    options.set_on_is_property_read_only(|_obj, property, default, _po, parent_property| {
        // Lock the text column of collection rows only.
        if parent_property.is_some() && property.name == "text" {
            return true;
        }
        default
    });

    let mut grid = grid_for(metadata, options);
    let obj = ObjectInstance::new("dropdown");
    grid.set_object(Some(obj.clone()));
    grid.add_matrix_row("choices");

    assert_eq!(grid.set_matrix_cell("choices", 0, "text", json!("nope")), None);
    assert_eq!(obj.children("choices")[0].get("text"), Value::Null);

    grid.set_matrix_cell("choices", 0, "value", json!("yes"));
    assert_eq!(obj.children("choices")[0].get("value"), json!("yes"));
}
