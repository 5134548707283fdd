//! FTP sessions backed by `suppaftp`

use super::{Session, Transport};
use crate::config::ServerConfig;
use crate::error::TransferError;
use std::io::Write;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::debug;

/// Production [`Transport`] that dials plain FTP servers
#[derive(Clone, Copy, Debug, Default)]
pub struct FtpTransport;

impl FtpTransport {
    /// Create a new FTP transport
    pub fn new() -> Self {
        Self
    }
}

/// Resolve `host:port` to the first socket address
fn resolve(server: &ServerConfig) -> Result<SocketAddr, TransferError> {
    let address = server.address();
    (server.host.as_str(), server.port)
        .to_socket_addrs()
        .map_err(|e| TransferError::Connect {
            address: address.clone(),
            reason: format!("failed to resolve host: {}", e),
        })?
        .next()
        .ok_or_else(|| TransferError::Connect {
            address,
            reason: "host resolved to no addresses".to_string(),
        })
}

impl Transport for FtpTransport {
    fn connect(
        &self,
        server: &ServerConfig,
        timeout: Duration,
    ) -> Result<Box<dyn Session>, TransferError> {
        let addr = resolve(server)?;
        debug!(address = %server.address(), ?timeout, "dialing FTP server");

        let stream = FtpStream::connect_timeout(addr, timeout).map_err(|e| {
            TransferError::Connect {
                address: server.address(),
                reason: e.to_string(),
            }
        })?;

        Ok(Box::new(FtpSession {
            stream,
            address: server.address(),
        }))
    }
}

/// One authenticated FTP control connection
struct FtpSession {
    stream: FtpStream,
    address: String,
}

impl Session for FtpSession {
    fn login(&mut self, username: &str, password: &str) -> Result<(), TransferError> {
        self.stream
            .login(username, password)
            .map_err(|e| TransferError::Auth {
                username: username.to_string(),
                reason: e.to_string(),
            })?;

        // Retrieved files are written byte for byte
        self.stream
            .transfer_type(FileType::Binary)
            .map_err(|e| TransferError::Connect {
                address: self.address.clone(),
                reason: format!("failed to switch to binary mode: {}", e),
            })
    }

    fn change_dir(&mut self, path: &str) -> Result<(), TransferError> {
        self.stream
            .cwd(path)
            .map_err(|e| TransferError::NotFound {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    fn retrieve(&mut self, remote_name: &str, sink: &mut dyn Write) -> Result<u64, TransferError> {
        self.stream
            .retr(remote_name, |reader| {
                std::io::copy(reader, &mut *sink).map_err(FtpError::ConnectionError)
            })
            .map_err(|e| match e {
                FtpError::ConnectionError(io) => TransferError::Connect {
                    address: self.address.clone(),
                    reason: format!("data connection failed: {}", io),
                },
                other => TransferError::NotFound {
                    path: remote_name.to_string(),
                    reason: other.to_string(),
                },
            })
    }

    fn quit(&mut self) -> Result<(), TransferError> {
        self.stream.quit().map_err(|e| TransferError::Connect {
            address: self.address.clone(),
            reason: format!("failed to close session: {}", e),
        })
    }
}
