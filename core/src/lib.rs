//! Domain logic for the Parley relay, free of I/O.
//!
//! The HTTP service (`parley-api`) owns transport and configuration; this
//! crate owns what is sent upstream, how replies are read back, and how
//! expense records are validated.

pub mod chat;
pub mod error;
pub mod negotiate;
pub mod records;
pub mod reply;
pub mod shapes;
