//! Object model and property metadata for the propgrid editor engine.
//!
//! Defines the types the grid core consumes but never owns:
//! - [`ObjectInstance`] / [`ObjectRef`] — a runtime object being edited
//!   (class name, JSON property bag, child collections, parent backlink)
//! - [`PropertyDescriptor`] — immutable metadata for one property of one
//!   object type (type tag, visibility, choices, bounds, display name)
//! - [`MetadataRegistry`] — class lookup, inheritance walking, category
//!   ("tab") enumeration, descendant-of tests
//! - [`Localization`] — string-by-key lookup with a built-in default table
//!
//! Everything here is single-threaded by design; shared state uses
//! `Rc`/`RefCell`, not locks.

mod error;
mod localization;
mod metadata;
mod object;
mod property;

pub use error::{Error, Result};
pub use localization::Localization;
pub use metadata::{CategoryTab, ClassMetadata, MetadataRegistry};
pub use object::{ObjectInstance, ObjectRef, is_value_empty};
pub use property::{
    ChoiceItem, ChoiceProviderFn, ChoiceSink, ChoiceSource, PropertyDescriptor, PropertyType,
    ShowMode, VisibleIf,
};
