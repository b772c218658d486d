use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

/// Shared handle to an object being edited. Identity matters: the grid
/// compares objects with `Rc::ptr_eq`, so clones of the handle refer to
/// the same instance.
pub type ObjectRef = Rc<ObjectInstance>;

/// A runtime object with a registered class, a JSON bag of property
/// values, and child collections for collection-typed properties.
///
/// Scalar property values live in `values` as arbitrary JSON. Sub-objects
/// (matrix rows, pages, questions) live in `children`, keyed by the owning
/// property name, so they keep their identity across edits.
pub struct ObjectInstance {
    class_name: String,
    values: RefCell<BTreeMap<String, Value>>,
    children: RefCell<BTreeMap<String, Vec<ObjectRef>>>,
    parent: RefCell<Weak<ObjectInstance>>,
}

impl ObjectInstance {
    pub fn new(class_name: &str) -> ObjectRef {
        Rc::new(Self {
            class_name: class_name.to_string(),
            values: RefCell::new(BTreeMap::new()),
            children: RefCell::new(BTreeMap::new()),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Current value of a property, `Value::Null` when unset.
    pub fn get(&self, name: &str) -> Value {
        self.values
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn set(&self, name: &str, value: Value) {
        if value.is_null() {
            self.values.borrow_mut().remove(name);
        } else {
            self.values.borrow_mut().insert(name.to_string(), value);
        }
    }

    /// Extract a string property value.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.values
            .borrow()
            .get(name)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Extract a boolean property value.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.borrow().get(name).and_then(|v| v.as_bool())
    }

    /// Extract a numeric property value.
    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.values.borrow().get(name).and_then(|v| v.as_f64())
    }

    /// Sub-objects held by a collection-typed property, in order.
    pub fn children(&self, name: &str) -> Vec<ObjectRef> {
        self.children
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn child_count(&self, name: &str) -> usize {
        self.children.borrow().get(name).map_or(0, Vec::len)
    }

    /// Appends a sub-object to a collection property and records this
    /// instance as its parent.
    pub fn add_child(self: &Rc<Self>, name: &str, child: ObjectRef) {
        *child.parent.borrow_mut() = Rc::downgrade(self);
        self.children
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .push(child);
    }

    /// Removes the sub-object at `index`, returning it if present.
    pub fn remove_child(&self, name: &str, index: usize) -> Option<ObjectRef> {
        let mut children = self.children.borrow_mut();
        let list = children.get_mut(name)?;
        if index >= list.len() {
            return None;
        }
        let removed = list.remove(index);
        *removed.parent.borrow_mut() = Weak::new();
        Some(removed)
    }

    /// Drops every sub-object of a collection property.
    pub fn clear_children(&self, name: &str) {
        if let Some(list) = self.children.borrow_mut().get_mut(name) {
            for child in list.drain(..) {
                *child.parent.borrow_mut() = Weak::new();
            }
        }
    }

    pub fn parent(&self) -> Option<ObjectRef> {
        self.parent.borrow().upgrade()
    }

    /// Walks parent links to the topmost object.
    pub fn root(self: &Rc<Self>) -> ObjectRef {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }
}

impl fmt::Debug for ObjectInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectInstance")
            .field("class_name", &self.class_name)
            .field("values", &self.values.borrow())
            .finish_non_exhaustive()
    }
}

/// Emptiness check used by required-field validation: null, empty string,
/// empty array, and empty object all count as empty.
pub fn is_value_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
