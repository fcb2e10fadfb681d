//! # Zinc Field Cache
//!
//! Location-keyed evaluation of computed fields over a finite element region.
//!
//! ## Features
//!
//! - **Locations** - time, node, element chart point (with optional parent
//!   element) or prescribed values for one field
//! - **Field cache** - shared, reference-counted evaluation context with a
//!   generation counter bumped on every location change
//! - **Memoization** - each field remembers one value per cache together with
//!   the generation it was computed for, so shared sources in a field DAG are
//!   evaluated once per location and caches never evict each other's values
//! - **Teardown sweep** - releasing the last cache handle clears every field's
//!   value cache in the region exactly once
//!
//! ## Architecture
//!
//! ```text
//! Region
//!     │
//!     ├──> Mesh (nodes, elements with linear Lagrange nodes)
//!     │
//!     ├──> Field Graph (petgraph)
//!     │      ├─ Nodes: Field (name, components, FieldCore, memo per cache)
//!     │      └─ Edges: source ──> dependent
//!     │
//!     └──> FieldModule
//!            ├─ create_* field constructors
//!            ├─ create_cache ──> FieldCache (Location + generation)
//!            └─ evaluate_real / assign_real against a FieldCache
//! ```
//!
//! ## Example
//!
//! ```rust
//! use zinc_fieldcache::Region;
//!
//! let region = Region::new("body");
//! let module = region.field_module();
//! let a = module.create_constant("a", &[1.0, 2.0]).unwrap();
//! let b = module.create_constant("b", &[3.0, 4.0]).unwrap();
//! let sum = module.create_add("sum", a, b).unwrap();
//!
//! let cache = module.create_cache();
//! cache.set_time(1.5).unwrap();
//! assert_eq!(module.evaluate_real(sum, &cache).unwrap(), vec![4.0, 6.0]);
//! assert_eq!(cache.generation(), 1);
//! ```

mod cache;
mod config;
mod error;
mod field;
pub mod fields;
mod location;
mod module;
mod region;
mod types;

pub use cache::{CacheSnapshot, FieldCache};
pub use config::FieldModuleConfig;
pub use error::{FieldCacheError, Result};
pub use field::{EvaluationContext, FieldCore};
pub use location::{ChartCoordinates, Location, LocationKind};
pub use module::FieldModule;
pub use region::Region;
pub use types::{CacheId, Element, ElementId, FieldId, NodeId, MAXIMUM_ELEMENT_XI_DIMENSIONS};
