pub mod error;
pub mod value;

pub use error::{ModelError, OutcomeExt, Result};
pub use value::Value;
