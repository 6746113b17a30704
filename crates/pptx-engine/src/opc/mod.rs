//! Open Packaging Conventions layer: zip container, content types, relationships

pub mod constants;
mod package;
pub mod rels;

pub use package::{Package, Part};
pub use rels::{relative_target, rels_part_name, resolve_target, Relationship, Relationships};
