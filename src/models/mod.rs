pub mod dataset;
pub mod field;
pub mod payload;
pub mod query;

pub use dataset::*;
pub use field::*;
pub use payload::*;
pub use query::*;
