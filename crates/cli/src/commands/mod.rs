//! CLI subcommands

pub mod evaluate;
pub mod predict;
pub mod schema;
pub mod sites;
pub mod train;
