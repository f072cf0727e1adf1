//! Post store implementations - in-memory and PostgREST.
//! The SeaORM store lives in `crate::database`.

mod memory;

pub use memory::InMemoryPostStore;

#[cfg(feature = "rest")]
mod rest;
#[cfg(feature = "rest")]
pub use rest::{RestConfig, RestPostStore};
