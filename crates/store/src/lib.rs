//! Static variable storage for clibars.
//!
//! Holds the user-confirmed variable values in a JSON file in the config
//! directory. See [`StaticStore`].

pub mod atomic;
pub mod static_store;

pub use static_store::{AddOutcome, StaticStore};
