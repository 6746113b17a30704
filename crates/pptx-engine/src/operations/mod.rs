//! Deck mutations used by the tools and by batch updates

pub mod batch;
pub mod mutate;

pub use batch::{apply_batch, BatchReply, BatchRequest, BatchResponse, ObjectReply};
pub use mutate::{
    add_connector, add_picture, add_shape, add_textbox, delete_shape, modify_shape,
    set_title_and_content, ModifyShapeRequest, PictureRequest, ShapeRequest, TextboxRequest,
};
