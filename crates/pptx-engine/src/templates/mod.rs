//! Built-in default template and on-disk template lookup

pub mod embedded;
pub mod layouts;
pub mod registry;

pub use embedded::{default_package, timestamp};
pub use registry::{list_templates, resolve_template, TemplateInfo};
