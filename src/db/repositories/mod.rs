//! Query methods on [`Database`](crate::db::Database), one file per table.

mod collections;
mod models;
mod prompts;
