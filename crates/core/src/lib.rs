//! Domain types and pure logic for the raffle client.
//!
//! Nothing in this crate performs I/O. Every function that depends on the
//! current time takes "now" as a parameter.

pub mod countdown;
pub mod error;
pub mod event_names;
pub mod notification;
pub mod session;
pub mod types;
