//! Operator CLI for CareSync
//!
//! Stands in for the clinic UI: records visits into the local store, shows
//! what is still pending, and drives reconciliation against the server.
//!
//! # Example Usage
//!
//! ```bash
//! caresync add --patient-name "Jane Doe" --diagnosis Flu --treatment Rest \
//!     --date 2024-03-02 --created-by nurse-7
//! caresync list --unsynced
//! caresync sync
//! caresync watch --interval 10
//! ```

pub mod cli;
pub mod commands;
pub mod settings;

pub use cli::{Cli, Command};
pub use settings::{CliSettings, SyncSettings};
