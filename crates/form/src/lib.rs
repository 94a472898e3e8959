//! # trellis-form
//!
//! Form trees that bind submitted data, validate it with validation groups and
//! attach every violation to the node it belongs to.
//!
//! ```rust
//! use serde_json::json;
//! use trellis_form::prelude::*;
//! use trellis_validator::Constraint;
//!
//! let config = FormConfig::compound()
//!     .validation_groups(ValidationGroups::sequence(["First", "Second"]))
//!     .with_field(
//!         "field",
//!         FormConfig::field()
//!             .constraint(Constraint::min_length(10).in_groups(["First"]))
//!             .constraint(Constraint::not_blank().in_groups(["Second"])),
//!     );
//!
//! let factory = FormFactory::new().with_metadata(Default::default());
//! let mut form = factory.create("form", config).unwrap();
//! form.submit(json!({"field": "wrong"})).unwrap();
//!
//! let errors = form.get_errors(true);
//! assert_eq!(errors.len(), 1);
//! assert!(errors[0].is_caused_by("length"));
//! ```
//!
//! ## Pieces
//!
//! - [`FormNode`]: the tree, built from a [`FormConfig`].
//! - binding: [`FormNode::set_data`], [`FormNode::submit`] and
//!   [`FormNode::submit_partial`], including collection resizing and
//!   reindexing.
//! - [`GroupResolver`]: turns `validation_groups` into a [`GroupPlan`].
//! - [`ConstraintEvaluator`]: the validation service; [`FormValidator`] is the
//!   metadata-backed implementation.
//! - [`ViolationMapper`]: attaches property-path-addressed violations to nodes.
//! - [`FormFactory`]: builds roots that validate themselves when submitted.

mod binder;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod extension;
pub mod groups;
pub mod mapper;
pub mod node;
pub mod sync;

pub use config::{CollectionConfig, FormConfig, FormKind};
pub use error::FormError;
pub use evaluator::{ConstraintEvaluator, FormValidator};
pub use extension::{FormFactory, ValidationReport};
pub use groups::{DynamicGroups, GroupPlan, GroupResolver, ValidationGroups};
pub use mapper::{MapOutcome, ViolationMapper};
pub use node::{FormNode, FormState};
pub use sync::{DataSync, IdentitySync, NumberSync, SyncError, SyncStrategy};

pub mod prelude {
    pub use crate::config::{CollectionConfig, FormConfig, FormKind};
    pub use crate::error::FormError;
    pub use crate::evaluator::{ConstraintEvaluator, FormValidator};
    pub use crate::extension::{FormFactory, ValidationReport};
    pub use crate::groups::{GroupPlan, GroupResolver, ValidationGroups};
    pub use crate::mapper::{MapOutcome, ViolationMapper};
    pub use crate::node::{FormNode, FormState};
    pub use crate::sync::{DataSync, SyncStrategy};
}
