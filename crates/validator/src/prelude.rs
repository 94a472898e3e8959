//! Prelude module for convenient imports.
//!
//! ```rust
//! use trellis_validator::prelude::*;
//!
//! let layer = GroupLayer::single("Registration");
//! assert!(Constraint::not_blank().in_groups(["Registration"]).selected_by(&layer));
//! ```

pub use crate::constraint::{Constraint, ConstraintKind};
pub use crate::error::ValidatorError;
pub use crate::group::{DEFAULT_GROUP, GroupLayer, GroupSequence};
pub use crate::metadata::{ClassMetadata, MetadataRegistry};
pub use crate::path::{PathElement, PropertyPath};
pub use crate::validator::Validator;
pub use crate::violation::{Severity, Violation, ViolationCause};
