//! # trellis-validator
//!
//! Group-aware constraint validation for JSON object graphs.
//!
//! Constraints are plain serializable data. Each one belongs to one or more
//! validation groups; a single [`Validator`] call evaluates one
//! [`GroupLayer`] and returns every [`Violation`] it finds, addressed by a
//! [`PropertyPath`] relative to the validated root.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use trellis_validator::prelude::*;
//!
//! let metadata = MetadataRegistry::new()
//!     .with(
//!         "Author",
//!         ClassMetadata::new()
//!             .add_property_constraint("firstName", Constraint::not_blank())
//!             .add_property_constraint("lastName", Constraint::min_length(2)),
//!     )
//!     .unwrap();
//!
//! let validator = Validator::new(metadata);
//! let violations = validator.validate_object(
//!     &json!({"firstName": "", "lastName": "Doe"}),
//!     "Author",
//!     &GroupLayer::default(),
//!     &PropertyPath::new(),
//! );
//!
//! assert_eq!(violations.len(), 1);
//! assert_eq!(violations[0].property_path.to_string(), "firstName");
//! ```
//!
//! ## Groups
//!
//! Constraints without groups belong to [`DEFAULT_GROUP`]. A
//! [`GroupSequence`] expands into one layer per group; callers evaluate the
//! layers in order and stop at the first one that fails.

pub mod constraint;
pub mod error;
pub mod group;
pub mod metadata;
pub mod path;
pub mod prelude;
pub mod validator;
pub mod violation;

pub use constraint::{Constraint, ConstraintKind, is_blank};
pub use error::ValidatorError;
pub use group::{DEFAULT_GROUP, GroupLayer, GroupSequence};
pub use metadata::{ClassMetadata, MetadataRegistry};
pub use path::{PathElement, PropertyPath};
pub use validator::Validator;
pub use violation::{Severity, Violation, ViolationCause};
