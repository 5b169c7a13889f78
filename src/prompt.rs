//! Credential collection.

use std::io::{BufRead, StdinLock, Stdout, Write};

use crate::error::{HarvestError, Result};
use crate::model::credentials::Credentials;

/// Source of the credentials for a run.
pub trait CredentialProvider {
    fn obtain(&mut self) -> Result<Credentials>;
}

/// Fixed credentials, for automation and tests.
pub struct FixedCredentials {
    username: String,
    email: String,
    password: String,
}

impl FixedCredentials {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

impl CredentialProvider for FixedCredentials {
    fn obtain(&mut self) -> Result<Credentials> {
        Ok(Credentials::new(
            self.username.clone(),
            self.email.clone(),
            self.password.clone(),
        ))
    }
}

/// Where the password is read from.
enum SecretSource {
    /// The controlling terminal, with echo disabled.
    Terminal,
    /// The same reader as the other prompts.
    Input,
}

/// Interactive prompt for username, optional email, and password.
///
/// Username and password are asked for again until they are non-empty.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
    secret: SecretSource,
}

impl TerminalPrompt<StdinLock<'static>, Stdout> {
    /// Prompt on stdin/stdout, reading the password without echo.
    pub fn stdio() -> Self {
        Self {
            input: std::io::stdin().lock(),
            output: std::io::stdout(),
            secret: SecretSource::Terminal,
        }
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    /// Prompt on arbitrary streams. The password is read from `input` as well.
    pub fn with_io(input: R, output: W) -> Self {
        Self {
            input,
            output,
            secret: SecretSource::Input,
        }
    }

    /// Print `label` and read one line without its line terminator.
    ///
    /// Returns `None` at end of input.
    fn ask(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }

    fn ask_secret(&mut self, label: &str) -> Result<Option<String>> {
        match self.secret {
            SecretSource::Input => self.ask(label),
            SecretSource::Terminal => {
                write!(self.output, "{label}")?;
                self.output.flush()?;
                Ok(Some(rpassword::read_password()?))
            }
        }
    }
}

impl<R: BufRead, W: Write> CredentialProvider for TerminalPrompt<R, W> {
    fn obtain(&mut self) -> Result<Credentials> {
        let username = loop {
            let line = self
                .ask("Enter username: ")?
                .ok_or(HarvestError::InputClosed)?;
            let line = line.trim();
            if !line.is_empty() {
                break line.to_string();
            }
        };

        // End of input here just means "no email".
        let email = self
            .ask("Enter email (optional if username is email): ")?
            .map(|line| line.trim().to_string())
            .unwrap_or_default();

        let password = loop {
            let line = self
                .ask_secret("Enter password: ")?
                .ok_or(HarvestError::InputClosed)?;
            if !line.is_empty() {
                break line;
            }
        };

        tracing::debug!(username = %username, "Collected credentials");
        Ok(Credentials::new(username, email, password))
    }
}
