//! Exchange Web Services (EWS) transport.
//!
//! Only the handful of SOAP operations the harvester needs: `GetFolder`,
//! `FindItem`, `GetItem` (attachment lists), and `GetAttachment`.

pub mod client;
pub mod response;
pub mod soap;
pub mod xml;

pub use client::EwsClient;
