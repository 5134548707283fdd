//! File-transfer sessions
//!
//! The download workers only talk to the [`Transport`] and [`Session`] traits.
//! [`FtpTransport`] is the production implementation; tests plug in in-memory
//! transports.
//!
//! Session calls are blocking and are always made from
//! `tokio::task::spawn_blocking`.

mod ftp;

pub use ftp::FtpTransport;

use crate::config::ServerConfig;
use crate::error::TransferError;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

/// Opens sessions to a remote file server
pub trait Transport: Send + Sync {
    /// Dial `server` and return an unauthenticated session
    fn connect(
        &self,
        server: &ServerConfig,
        timeout: Duration,
    ) -> Result<Box<dyn Session>, TransferError>;
}

/// A connection to a remote file server, owned by exactly one worker
pub trait Session: Send {
    /// Authenticate with the given credentials
    fn login(&mut self, username: &str, password: &str) -> Result<(), TransferError>;

    /// Change the remote working directory
    fn change_dir(&mut self, path: &str) -> Result<(), TransferError>;

    /// Stream the named remote file into `sink`, returning the number of bytes copied
    fn retrieve(&mut self, remote_name: &str, sink: &mut dyn Write) -> Result<u64, TransferError>;

    /// Close the session
    fn quit(&mut self) -> Result<(), TransferError>;
}

/// Scoped ownership of a [`Session`]
///
/// The session is closed when the guard is dropped, whichever way the
/// transfer exits.
pub struct SessionGuard {
    session: Box<dyn Session>,
}

impl SessionGuard {
    /// Take ownership of an open session
    pub fn new(session: Box<dyn Session>) -> Self {
        Self { session }
    }
}

impl Deref for SessionGuard {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Err(e) = self.session.quit() {
            tracing::debug!(error = %e, "error closing session");
        }
    }
}
