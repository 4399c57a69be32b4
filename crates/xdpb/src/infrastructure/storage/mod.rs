//! Storage infrastructure: the configuration file.
//!
//! The `config` sub-module finds the TOML file (explicit path or the XDG
//! config directory), parses it, and falls back to defaults when no file
//! exists.

pub mod config;
