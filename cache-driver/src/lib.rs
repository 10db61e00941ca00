//! Driver interface for commit cache backends.

mod driver;
mod error;

pub use driver::Driver;
pub use driver::Record;
pub use error::{CacheError, CacheErrorBuilder, CacheErrorKind};
