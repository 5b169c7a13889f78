//! Operator credentials, held in memory for one run.

use secrecy::{ExposeSecret, SecretString};

/// Identity used to open the mailbox session.
///
/// The secret is wrapped in [`SecretString`], so `Debug` output never shows it.
#[derive(Debug)]
pub struct Credentials {
    /// Account identifier used for authentication.
    pub username: String,
    /// Optional mailbox address. Empty means "same as `username`".
    pub email: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// The mailbox to open: the address if given, otherwise the username.
    pub fn mailbox_address(&self) -> &str {
        if self.email.is_empty() {
            &self.username
        } else {
            &self.email
        }
    }

    /// The secret, for handing to the transport.
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}
