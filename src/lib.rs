//! `ewsharvest`: download inbox attachments from an Exchange server.
//!
//! The library is split the way a run flows: credentials are collected
//! ([`prompt`]), a session is opened ([`session`]), and the inbox is walked
//! and qualifying attachments are written to disk ([`harvest`]).

pub mod config;
pub mod error;
pub mod ews;
pub mod harvest;
pub mod mailbox;
pub mod model;
pub mod prompt;
pub mod session;
