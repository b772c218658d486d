use std::rc::Rc;

use propgrid_model::{
    ClassMetadata, MetadataRegistry, ObjectInstance, PropertyDescriptor, PropertyType,
};
use propgrid_core::{
    EditorContext, EditorRegistry, FieldDescriptor, FieldKind, Generation, GridOptions,
    PropertyEditor,
};

struct MarkedEditor {
    marker: &'static str,
    fit_type: PropertyType,
    default: bool,
}

impl PropertyEditor for MarkedEditor {
    fn fit(&self, property: &PropertyDescriptor) -> bool {
        property.property_type == self.fit_type
    }

    fn is_default(&self) -> bool {
        self.default
    }

    fn build(&self, _ctx: &EditorContext<'_>) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(FieldKind::Text);
        field.render_as = Some(self.marker.to_string());
        field
    }
}

fn build_with(registry: &EditorRegistry, property: &PropertyDescriptor) -> Option<String> {
    let metadata = MetadataRegistry::new();
    let options = GridOptions::new();
    let obj = ObjectInstance::new("question");
    let editor = registry.resolve(property)?;
    let ctx = EditorContext {
        obj: &obj,
        property,
        options: &options,
        metadata: &metadata,
        registry,
        generation: Generation::detached(),
        parent: None,
    };
    editor.build(&ctx).render_as
}

// ── resolution order ─────────────────────────────────────────────

#[test]
fn last_registered_wins() {
    let mut registry = EditorRegistry::new();
    registry.register(MarkedEditor {
        marker: "first",
        fit_type: PropertyType::String,
        default: false,
    });
    registry.register(MarkedEditor {
        marker: "second",
        fit_type: PropertyType::String,
        default: false,
    });

    let property = PropertyDescriptor::string("name");
    assert_eq!(build_with(&registry, &property).as_deref(), Some("second"));
}

#[test]
fn host_editor_overrides_builtin() {
    let mut registry = EditorRegistry::with_builtins();
    registry.register(MarkedEditor {
        marker: "custom",
        fit_type: PropertyType::Color,
        default: false,
    });

    let property = PropertyDescriptor::color("background");
    assert_eq!(build_with(&registry, &property).as_deref(), Some("custom"));
}

#[test]
fn default_editor_catches_unfit_properties() {
    let mut registry = EditorRegistry::new();
    registry.register(MarkedEditor {
        marker: "fallback",
        fit_type: PropertyType::String,
        default: true,
    });

    // Nothing fits a number here; the default takes it.
    let property = PropertyDescriptor::number("width");
    assert_eq!(build_with(&registry, &property).as_deref(), Some("fallback"));
}

#[test]
fn no_fit_and_no_default_resolves_to_none() {
    let registry = EditorRegistry::new();
    let property = PropertyDescriptor::string("name");
    assert!(registry.resolve(&property).is_none());
    assert!(registry.is_empty());
}

#[test]
fn fit_beats_default_regardless_of_order() {
    let mut registry = EditorRegistry::new();
    registry.register(MarkedEditor {
        marker: "fitting",
        fit_type: PropertyType::String,
        default: false,
    });
    registry.register(MarkedEditor {
        marker: "fallback",
        fit_type: PropertyType::Number,
        default: true,
    });

    let property = PropertyDescriptor::string("name");
    assert_eq!(build_with(&registry, &property).as_deref(), Some("fitting"));
}

// ── fit cache ────────────────────────────────────────────────────

#[test]
fn cached_resolution_survives_re_registration() {
    let mut registry = EditorRegistry::new();
    registry.register(MarkedEditor {
        marker: "old",
        fit_type: PropertyType::String,
        default: false,
    });

    let mut property = PropertyDescriptor::string("name");
    property.id = 7;
    assert_eq!(build_with(&registry, &property).as_deref(), Some("old"));

    registry.register(MarkedEditor {
        marker: "new",
        fit_type: PropertyType::String,
        default: false,
    });
    // Stale until the cache is dropped.
    assert_eq!(build_with(&registry, &property).as_deref(), Some("old"));

    registry.clear_cache();
    assert_eq!(build_with(&registry, &property).as_deref(), Some("new"));
}

#[test]
fn zero_id_is_never_cached() {
    let mut registry = EditorRegistry::new();
    registry.register(MarkedEditor {
        marker: "old",
        fit_type: PropertyType::String,
        default: false,
    });

    let property = PropertyDescriptor::string("name");
    assert_eq!(property.id, 0);
    assert_eq!(build_with(&registry, &property).as_deref(), Some("old"));

    registry.register(MarkedEditor {
        marker: "new",
        fit_type: PropertyType::String,
        default: false,
    });
    assert_eq!(build_with(&registry, &property).as_deref(), Some("new"));
}

#[test]
fn registered_ids_cache_independently() {
    let mut metadata = MetadataRegistry::new();
    metadata
        .register_class(
            ClassMetadata::new("question")
                .with_property(PropertyDescriptor::string("name"))
                .with_property(PropertyDescriptor::string("title")),
        )
        .unwrap();
    let registry = EditorRegistry::with_builtins();

    for property in metadata.properties_of_class("question") {
        let first = registry.resolve(&property).unwrap();
        let second = registry.resolve(&property).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }
}

// ── builtin coverage ─────────────────────────────────────────────

#[test]
fn builtins_fit_every_property_type() {
    let registry = EditorRegistry::with_builtins();
    for property in [
        PropertyDescriptor::boolean("a"),
        PropertyDescriptor::switch("b"),
        PropertyDescriptor::string("c"),
        PropertyDescriptor::number("d"),
        PropertyDescriptor::text("e"),
        PropertyDescriptor::html("f"),
        PropertyDescriptor::color("g"),
        PropertyDescriptor::string_array("h"),
        PropertyDescriptor::question("i"),
        PropertyDescriptor::question_select_base("j"),
        PropertyDescriptor::question_value("k"),
        PropertyDescriptor::item_values("l", "itemvalue"),
        PropertyDescriptor::columns("m", "matrixdropdowncolumn"),
        PropertyDescriptor::set("n", vec![]),
    ] {
        assert!(
            registry.resolve(&property).is_some(),
            "no editor for {}",
            property.name
        );
    }
}
