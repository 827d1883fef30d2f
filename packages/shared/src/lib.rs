//! Shared utilities for the DentalChat client packages.

pub mod logger;
pub mod time;
