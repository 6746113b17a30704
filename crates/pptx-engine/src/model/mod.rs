//! Presentation object model over the OPC package

pub mod layout;
pub mod presentation;
pub mod shape;
pub mod slide;
pub mod text;

pub use layout::{Layout, LayoutInfo, Master};
pub use presentation::{Presentation, DEFAULT_SLIDE_SIZE};
pub use shape::{ConnectorRoute, Placeholder, Shape, ShapeKind};
pub use slide::Slide;
pub use text::RunFormat;
