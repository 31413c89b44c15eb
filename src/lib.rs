//! `gamma-sed` library crate.
//!
//! The binary (`gsed`) is a thin wrapper around this library so that:
//!
//! - core logic (spectral models, EBL correction, the MCMC engine, the
//!   adaptive light-curve splitter) is testable without spawning processes
//! - modules are reusable by other pipelines that already have SED or
//!   light-curve tables in memory
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod ebl;
pub mod error;
pub mod fusion;
pub mod io;
pub mod lightcurve;
pub mod math;
pub mod mcmc;
pub mod models;
pub mod plot;
pub mod report;
