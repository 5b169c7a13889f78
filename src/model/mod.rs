//! Core data model types for mail items, attachments, and credentials.

pub mod attachment;
pub mod credentials;
pub mod item;
