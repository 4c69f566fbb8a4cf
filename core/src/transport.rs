//! The single place that performs network I/O.
//!
//! # Design
//! `Transport::send` executes a prepared `HttpRequest` and hands back status
//! and raw body. Interpreting them is left to `decode`. `UreqTransport` keeps
//! one `ureq::Agent` (and with it the connection pool) for the lifetime of
//! the client, creating it on first use and dropping it on `close`.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes HTTP requests. Methods take `&mut self`: one call in flight per
/// instance.
pub trait Transport {
    /// Send `request` and return the status code and body. Fails only on
    /// network-level errors; non-2xx statuses are returned as data.
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse>;

    /// Release pooled connections. Sending again afterwards is allowed.
    fn close(&mut self) {}
}

/// Blocking transport backed by `ureq`.
pub struct UreqTransport {
    connect_timeout: Duration,
    read_timeout: Duration,
    agent: Option<ureq::Agent>,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            agent: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.agent.is_some()
    }

    fn agent(&mut self) -> &ureq::Agent {
        let (connect, read) = (self.connect_timeout, self.read_timeout);
        self.agent.get_or_insert_with(|| {
            debug!(?connect, ?read, "creating HTTP agent");
            ureq::Agent::config_builder()
                .timeout_connect(Some(connect))
                .timeout_recv_response(Some(read))
                .timeout_recv_body(Some(read))
                .http_status_as_error(false)
                .build()
                .new_agent()
        })
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("connected", &self.agent.is_some())
            .finish()
    }
}

impl Transport for UreqTransport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
        debug!(
            method = request.method.as_str(),
            url = %request.url,
            body_len = request.body.as_ref().map_or(0, String::len),
            "sending request"
        );
        let agent = self.agent();

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = agent.get(request.url.as_str());
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = agent.post(request.url.as_str());
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(transport_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_vec().map_err(transport_error)?;
        debug!(status, bytes = body.len(), "received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn close(&mut self) {
        if self.agent.take().is_some() {
            debug!("released HTTP agent");
        }
    }
}

fn transport_error(err: ureq::Error) -> Error {
    Error::Transport {
        message: err.to_string(),
    }
}
