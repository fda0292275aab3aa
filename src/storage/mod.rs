pub mod media;

pub use media::{MediaName, MediaStore};
