//! Line-based chat client built around two pumps.
//!
//! A session runs two loops over one TCP connection: the inbound pump copies
//! what the server sends to the user's output, the outbound pump copies what
//! the user types to the server. Both watch one shared run flag; whichever
//! loop hits end of stream, an I/O error, or the leave command clears it, the
//! other one follows, and the session then closes the connection once.
//!
//! - [`run_state`] is the shared flag.
//! - [`pump`] is the generic forwarding loop both directions are built on.
//! - [`inbound`] and [`outbound`] are the two directions.
//! - [`session`] owns the connection, runs the pumps and cleans up after them.
//! - [`user_io`] holds the front-end seams (console and channel based).
//! - [`codec`] and [`message`] define what travels on the wire.
//! - [`cli`] and [`client`] wire everything to a terminal.

pub mod cli;
pub mod client;
pub mod codec;
pub mod connection;
pub mod error;
pub mod inbound;
pub mod message;
pub mod outbound;
pub mod pump;
pub mod run_state;
pub mod session;
pub mod user_io;
