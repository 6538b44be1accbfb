//! `raffle-client` library crate.
//!
//! Notification store access, the notification sync engine, the WebSocket
//! push listener, and the countdown ticker. The `raffle-notify` binary
//! entrypoint lives in `main.rs`.

pub mod api;
pub mod config;
pub mod push;
pub mod store;
pub mod sync;
pub mod ticker;
