pub mod error;

pub use error::{SqlRestError, SqlRestResult};
