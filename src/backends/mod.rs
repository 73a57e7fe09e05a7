//! One [`crate::backend::Backend`] implementation per format family.

mod apple;
mod json;
mod xliff;

pub use apple::AppleBackend;
pub use json::JsonBackend;
pub use xliff::XliffBackend;
