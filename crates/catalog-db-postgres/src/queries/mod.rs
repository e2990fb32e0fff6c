//! SQL query implementations for the catalog entities.
//!
//! Each module holds free functions over a `PgPool`, one per storage operation.

pub mod category;
pub mod product;
pub mod tag;
