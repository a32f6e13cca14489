//! Species input formats
//!
//! This module reads species frequency data from the eBird barchart text
//! download and from the JSON forms produced by earlier pipeline runs.

mod barchart;
mod species_input;

pub use barchart::*;
pub use species_input::*;
