//! Object catalog, category resolution, and exclusion rules.
//!
//! - [`catalog`]: the set of buildable categories, loaded from records or JSON.
//! - [`query`]: [`GroupQuery`], what a slot asks for.
//! - [`resolver`]: [`CategoryResolver`], query + filter + generator → category.
//! - [`exclusion`]: wildcard exclusion rules, combination matrices, and the
//!   container [`SimilarityTable`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod exclusion;
pub mod query;
pub mod resolver;

pub use catalog::{Catalog, CategoryRecord, ALL_GROUP, IN_CONTAINER_GROUP};
pub use exclusion::{
    complement_combos, excluded_container_combos, is_excluded, ExclusionRule, Pattern,
    SimilarityTable,
};
pub use query::GroupQuery;
pub use resolver::{CategoryResolver, ResolveFilter, Resolution};
