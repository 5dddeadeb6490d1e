//! Black-box integration tests, driven only through
//! [`kg::Executor::dispatch`] (and, where a behavior lives below the tool
//! protocol surface, the lower-level `kg-store`/`kg-index` crates
//! directly) — never through a single crate's own `#[cfg(test)]` module.

#[path = "../common/mod.rs"]
mod common;

mod scenarios;
