//! Bridge between the external SMTP session library and the envelope.
//!
//! `mailin_embedded` owns the wire protocol and drives one handler per
//! connection from its own threads; the handler maps the session
//! lifecycle onto [`Envelope`] calls, entering the async runtime for
//! the two authority round-trips. Rejections become the corresponding
//! SMTP responses.

use std::net::IpAddr;

use mailin_embedded::response::{INTERNAL_ERROR, OK};
use mailin_embedded::{Handler, Response, Server, SslConfig};
use tracing::{error, info};

use crate::authority::AuthorityHandle;
use crate::config::Config;
use crate::mail::{Envelope, Rejection};
use crate::{PostgateError, Result};

/// SMTP server accepting inbound mail transactions.
pub struct SmtpServer {
    host: String,
    port: u16,
    domain: String,
    max_size: usize,
    authority: AuthorityHandle,
    runtime: tokio::runtime::Handle,
}

impl SmtpServer {
    /// Create a server from the configuration.
    ///
    /// Must be called from within the tokio runtime so the handler can
    /// re-enter it from the session library's threads.
    pub fn new(config: &Config, authority: AuthorityHandle) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            domain: config.server.domain.clone(),
            max_size: config.limits.max_message_size,
            authority,
            runtime: tokio::runtime::Handle::current(),
        }
    }

    /// Run the SMTP server. Blocks the calling thread.
    pub fn serve(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        info!("SMTP server listening on {} for domain {}", addr, self.domain);

        let name = self.domain.clone();
        let handler = SessionHandler {
            domain: self.domain,
            max_size: self.max_size,
            authority: self.authority,
            runtime: self.runtime,
            envelope: None,
        };

        let mut server = Server::new(handler);
        server.with_name(name);
        server
            .with_ssl(SslConfig::None)
            .map_err(|e| PostgateError::Server(e.to_string()))?;
        server
            .with_addr(addr)
            .map_err(|e| PostgateError::Server(e.to_string()))?;
        server
            .serve()
            .map_err(|e| PostgateError::Server(e.to_string()))
    }
}

/// Per-connection session state.
#[derive(Clone)]
struct SessionHandler {
    domain: String,
    max_size: usize,
    authority: AuthorityHandle,
    runtime: tokio::runtime::Handle,
    envelope: Option<Envelope>,
}

fn rejection_response(rejection: Rejection) -> Response {
    Response::custom(rejection.code(), rejection.message().to_string())
}

impl Handler for SessionHandler {
    fn mail(&mut self, _ip: IpAddr, _domain: &str, from: &str) -> Response {
        self.envelope = Some(Envelope::begin(
            self.authority.clone(),
            self.domain.clone(),
            from,
            self.max_size,
        ));
        OK
    }

    fn rcpt(&mut self, to: &str) -> Response {
        let Some(envelope) = self.envelope.as_mut() else {
            return INTERNAL_ERROR;
        };
        match self.runtime.block_on(envelope.add_recipient(to)) {
            Ok(()) => OK,
            Err(rejection) => rejection_response(rejection),
        }
    }

    fn data(&mut self, buf: &[u8]) -> std::io::Result<()> {
        if let Some(envelope) = self.envelope.as_mut() {
            // An oversized transaction keeps reading and is rejected at
            // data_end; dropping the connection here would hide the 552.
            let _ = envelope.write(buf);
        }
        Ok(())
    }

    fn data_end(&mut self) -> Response {
        let Some(envelope) = self.envelope.take() else {
            return INTERNAL_ERROR;
        };
        match self.runtime.block_on(envelope.close()) {
            Ok(()) => OK,
            Err(rejection) => {
                if rejection.is_permanent() {
                    error!(%rejection, "transaction rejected");
                }
                rejection_response(rejection)
            }
        }
    }
}
