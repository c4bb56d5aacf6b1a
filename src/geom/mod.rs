//! 2D geometry primitives: transforms, axis-aligned rectangles, oriented boxes.

pub mod rect;
pub mod rect_box;
pub mod transform;

pub use rect::OrthoRect;
pub use rect_box::RectBox;
pub use transform::Transform2;
