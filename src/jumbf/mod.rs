//! JUMBF (JPEG Universal Metadata Box Format) codec (C3).
//!
//! A recursive, typed binary box container. [`super_box::SuperBox`] is the
//! recursive node type; [`reader`] and [`writer`] convert between it and
//! raw bytes; [`uri`] assigns and resolves `self#jumbf=...` box addresses
//! once a tree is fully parsed.

pub mod box_type;
pub mod data_box;
pub mod description_box;
pub mod reader;
pub mod super_box;
pub mod uri;
pub mod writer;

pub use box_type::BoxType;
pub use description_box::DescriptionBox;
pub use reader::parse;
pub use super_box::{JumbfBox, SuperBox};
pub use writer::{measure, serialize};
