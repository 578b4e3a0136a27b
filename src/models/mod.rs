//! Models for the image cache
//!
//! The decoded image resource class and serializable snapshot DTOs.

pub mod image;
pub mod snapshot;

// Re-export commonly used types
pub use image::DecodedImage;
pub use snapshot::{CacheSnapshot, EntryInfo, GenerationInfo};
