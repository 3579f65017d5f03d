pub mod error;
pub mod types;
pub mod value;

pub use error::{ModelError, Result};
pub use types::CastType;
pub use value::Value;
