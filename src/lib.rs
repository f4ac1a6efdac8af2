//! Typed artifacts from annotated Helm `values.yaml` files.
//!
//! Comment annotations (`@param`, `@typedef`, `@field`, `@enum`, ...) are
//! scanned into a type graph, resolved, checked against the values in the
//! same file, and rendered as Go declarations, an OpenAPI schema and README
//! parameter tables. [`context::ResolutionContext`] runs the whole pipeline
//! for one file.
pub mod cli;
pub mod context;
pub mod defaults;
pub mod error;
pub mod graph;
pub mod ir;
pub mod path_de;
pub mod render;
pub mod resolve;
pub mod scan;
pub mod type_expr;
pub mod validate;

pub use context::{Artifacts, Request, ResolutionContext};
pub use error::{Error, Result};
