pub mod error;
pub mod resource;

pub use error::{ResourceError, ResourceResult};
