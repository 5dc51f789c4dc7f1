pub mod sql_validator;

pub use sql_validator::{validate_dataset_name, SqlValidator};
