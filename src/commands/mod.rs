//! Command implementations for kinship

pub mod analyze;
pub mod clusters;
pub mod config;
pub mod dispatch;
pub mod duplicates;
pub mod format;
pub mod graph;
pub mod related;
