//! Iskra library exports: the Archive/Shadow memory core and the persona engines.

pub mod config;
pub mod memory;
pub mod persona;
pub mod telemetry;
