//! # beanqd
//!
//! Loads the TOML configuration, sets up logging and runs the
//! [`beanq_core::Server`] until Ctrl-C.

pub mod config;
