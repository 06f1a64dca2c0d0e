//! Per-unit analysis of Python source.
//!
//! Each input file becomes one unit. The unit is parsed once and the
//! resulting tree feeds three passes:
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐
//! │ SourceLoader │────▶│ ImportMap      │──┐
//! └──────────────┘  │  └────────────────┘  │   ┌──────────────────┐     ┌───────────┐
//!                   │                      ├──▶│ CallGraphBuilder │────▶│ UnitGraph │
//!                   │  ┌────────────────┐  │   └──────────────────┘     └───────────┘
//!                   └─▶│ ConstantTable  │──┘
//!                      └────────────────┘
//! ```
//!
//! Units never see each other here; merging happens in [`crate::graph`].

mod builder;
mod constants;
mod facts;
mod imports;
mod loader;
mod patterns;
mod resolve;

pub use builder::{analyze_unit, CallGraphBuilder};
pub use constants::{ConstantClass, ConstantTable};
pub use facts::{
    leaf_name, qualify, root_module, CallEdge, DatabaseEdge, Declaration, DeclarationKind, EdgeKind,
    Symbol, UnitGraph,
};
pub use imports::ImportMap;
pub use loader::{module_name, LoadOutcome, ParsedUnit, SourceLoader};
pub use patterns::{
    database_identifier, sql_operation, EXECUTION_PRIMITIVES, GENERIC_OPERATION,
    UNRESOLVED_DATABASE,
};
pub use resolve::{resolve_target, CallShape, ClassIndex, ResolveContext, Target};
