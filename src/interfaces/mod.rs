//! Batch IO for the command line driver.

pub mod csv;
