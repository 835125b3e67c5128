pub mod encoder;
pub mod services;

pub use encoder::{EncodedImage, EncodingError, ImageEncoder, ImageRef};
