//! Core trait definitions

mod shell;

pub use shell::{SessionRequest, ShellConnector, ShellControl, ShellHandles, ShellInput, ShellOutput};
