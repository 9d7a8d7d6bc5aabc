//! Route-authorization gate between a client-side router and the
//! application's authentication logic.
//!
//! Every navigation is either allowed, sent to the login destination (with the
//! requested URL remembered and resumed after login), or sent to the
//! access-denied destination.

pub mod adapters;
pub mod auth;
pub mod config;
pub mod error;
pub mod routing;
pub mod startup;
pub mod utils;

pub use error::VisorError;
pub use startup::Visor;
