//! Outbound SSH shells
//!
//! [`SshConnector`] dials a host with `russh`, authenticates with a
//! password, allocates a PTY and starts a login shell. A driver task per
//! shell owns the russh channel and exposes it as plain byte pipes, so the
//! rest of the gateway only sees `AsyncRead`/`AsyncWrite` handles.

mod channel;
mod connector;

pub use connector::SshConnector;
