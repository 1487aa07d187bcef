pub mod analysis;
pub mod cli;
pub mod config;
pub mod convert;
mod entry;
pub mod format;
mod handlers;
pub mod hover;
mod state;

pub use entry::run;
