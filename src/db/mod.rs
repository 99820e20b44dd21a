mod repository;
mod schema;

pub use repository::{fmt_datetime, Repository};
