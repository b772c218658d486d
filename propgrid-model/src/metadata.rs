use std::cell::Cell;
use std::collections::HashMap;

use tracing::warn;

use crate::error::{Error, Result};
use crate::object::ObjectRef;
use crate::property::PropertyDescriptor;

/// Metadata for one registered object class: ordered property descriptors,
/// an optional base class, and an optional discriminant property whose
/// value selects a class-specific override (`"type@value"`).
#[derive(Debug, Clone)]
pub struct ClassMetadata {
    pub name: String,
    pub base: Option<String>,
    pub class_name_property: Option<String>,
    pub properties: Vec<PropertyDescriptor>,
}

impl ClassMetadata {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            base: None,
            class_name_property: None,
            properties: Vec::new(),
        }
    }

    pub fn with_base(mut self, base: &str) -> Self {
        self.base = Some(base.to_string());
        self
    }

    /// Declares the discriminant property: when its value changes, the
    /// object's effective property set changes with it.
    pub fn with_class_name_property(mut self, name: &str) -> Self {
        self.class_name_property = Some(name.to_string());
        self
    }

    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_properties(mut self, properties: Vec<PropertyDescriptor>) -> Self {
        self.properties.extend(properties);
        self
    }
}

/// One category ("tab") of an object's form: a name, an optional explicit
/// title, and the properties it groups in declaration order.
#[derive(Debug, Clone)]
pub struct CategoryTab {
    pub name: String,
    pub title: Option<String>,
    pub properties: Vec<PropertyDescriptor>,
}

/// The read-only metadata provider the grid core consumes.
///
/// Handles inheritance (base-class chains) and class-specific overrides
/// keyed by discriminant value. Property descriptors receive a unique id
/// on registration; the editor registry's fit cache is keyed on it.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    classes: HashMap<String, ClassMetadata>,
    category_titles: HashMap<(String, String), String>,
    next_property_id: Cell<u64>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
            category_titles: HashMap::new(),
            next_property_id: Cell::new(1),
        }
    }

    pub fn register_class(&mut self, mut class: ClassMetadata) -> Result<()> {
        if self.classes.contains_key(&class.name) {
            return Err(Error::DuplicateClass(class.name));
        }
        for property in &mut class.properties {
            property.id = self.take_property_id();
        }
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    pub fn find_class(&self, name: &str) -> Option<&ClassMetadata> {
        self.classes.get(name)
    }

    /// Effective class name for an object: `"type@discriminant"` when a
    /// discriminant property is declared, has a value, and that override
    /// class is registered; otherwise the plain type name.
    pub fn effective_class_name(&self, obj: &ObjectRef) -> String {
        let base = obj.class_name().to_string();
        if let Some(disc) = self.class_name_property(&base) {
            if let Some(value) = obj.get_str(&disc) {
                let qualified = format!("{base}@{value}");
                if self.classes.contains_key(&qualified) {
                    return qualified;
                }
            }
        }
        base
    }

    /// The discriminant property name declared for a class (or inherited
    /// from its base chain).
    pub fn class_name_property(&self, class_name: &str) -> Option<String> {
        for class in self.chain(class_name) {
            if let Some(p) = &class.class_name_property {
                return Some(p.clone());
            }
        }
        None
    }

    /// Finds a property by name on a class, walking the base chain.
    /// `"type@value"` names fall back to `"type"` when no override exists.
    pub fn find_property(&self, class_name: &str, name: &str) -> Option<PropertyDescriptor> {
        for class in self.chain(class_name) {
            if let Some(p) = class.properties.iter().find(|p| p.name == name) {
                return Some(p.clone());
            }
        }
        None
    }

    /// Ordered property descriptors for an object's effective class:
    /// base-chain properties first, derived classes overriding by name
    /// in place.
    pub fn properties_of(&self, obj: &ObjectRef) -> Vec<PropertyDescriptor> {
        self.properties_of_class(&self.effective_class_name(obj))
    }

    pub fn properties_of_class(&self, class_name: &str) -> Vec<PropertyDescriptor> {
        let chain: Vec<&ClassMetadata> = self.chain(class_name).collect();
        let mut result: Vec<PropertyDescriptor> = Vec::new();
        // Root-most class first so derived declarations override in place.
        for class in chain.iter().rev() {
            for property in &class.properties {
                if let Some(existing) = result.iter_mut().find(|p| p.name == property.name) {
                    *existing = property.clone();
                } else {
                    result.push(property.clone());
                }
            }
        }
        result
    }

    /// True when `class_name` is `base_name` or inherits from it.
    /// Discriminant-qualified names (`"type@value"`) test their base type.
    pub fn is_descendant_of(&self, class_name: &str, base_name: &str) -> bool {
        self.chain(class_name).any(|c| c.name == base_name)
            || class_name.split('@').next() == Some(base_name)
    }

    /// Categories for an object in first-appearance order, `general`
    /// always first. Properties keep declaration order inside each tab.
    pub fn tabs_of(&self, obj: &ObjectRef) -> Vec<CategoryTab> {
        let class_name = self.effective_class_name(obj);
        let mut tabs: Vec<CategoryTab> = Vec::new();
        for property in self.properties_of_class(&class_name) {
            let category = property.category.clone().unwrap_or_else(|| "general".to_string());
            match tabs.iter_mut().find(|t| t.name == category) {
                Some(tab) => tab.properties.push(property),
                None => tabs.push(CategoryTab {
                    title: self.category_title(&class_name, obj.class_name(), &category),
                    name: category,
                    properties: vec![property],
                }),
            }
        }
        if let Some(pos) = tabs.iter().position(|t| t.name == "general") {
            let general = tabs.remove(pos);
            tabs.insert(0, general);
        }
        tabs
    }

    pub fn set_category_title(&mut self, class_name: &str, category: &str, title: &str) {
        self.category_titles.insert(
            (class_name.to_string(), category.to_string()),
            title.to_string(),
        );
    }

    /// Adds a property to a registered class at runtime (test-only hook).
    /// Resolutions cached by the editor registry must be cleared by the
    /// caller afterwards.
    pub fn add_property(&mut self, class_name: &str, mut property: PropertyDescriptor) -> Result<()> {
        property.id = self.take_property_id();
        let class = self
            .classes
            .get_mut(class_name)
            .ok_or_else(|| Error::UnknownClass(class_name.to_string()))?;
        if class.properties.iter().any(|p| p.name == property.name) {
            warn!(class = class_name, property = %property.name, "replacing existing property");
            class.properties.retain(|p| p.name != property.name);
        }
        class.properties.push(property);
        Ok(())
    }

    /// Removes a property from a registered class (test-only hook).
    pub fn remove_property(&mut self, class_name: &str, name: &str) -> Result<()> {
        let class = self
            .classes
            .get_mut(class_name)
            .ok_or_else(|| Error::UnknownClass(class_name.to_string()))?;
        let before = class.properties.len();
        class.properties.retain(|p| p.name != name);
        if class.properties.len() == before {
            return Err(Error::UnknownProperty {
                class: class_name.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn category_title(&self, effective: &str, base: &str, category: &str) -> Option<String> {
        self.category_titles
            .get(&(effective.to_string(), category.to_string()))
            .or_else(|| self.category_titles.get(&(base.to_string(), category.to_string())))
            .cloned()
    }

    fn take_property_id(&self) -> u64 {
        let id = self.next_property_id.get();
        self.next_property_id.set(id + 1);
        id
    }

    /// Iterator over a class and its base chain, derived-most first.
    fn chain<'a>(&'a self, class_name: &str) -> impl Iterator<Item = &'a ClassMetadata> {
        let mut next = self
            .classes
            .get(class_name)
            .or_else(|| self.classes.get(class_name.split('@').next().unwrap_or(class_name)));
        std::iter::from_fn(move || {
            let current = next?;
            next = current.base.as_deref().and_then(|b| self.classes.get(b));
            Some(current)
        })
    }
}
