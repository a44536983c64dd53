pub mod errors;

pub use errors::{ScribeError, ScribeResult};
