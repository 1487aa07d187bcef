//! Language server for workflow config files, backed by the `flowls-core` cache.

pub mod server;

pub use server::run;
