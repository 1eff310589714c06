//! HTTP transport posting command documents to the commanded application

use super::common::{ANSWER_HOST_HEADER, ANSWER_PORT_HEADER};
use super::error::rejection_from_response;
use async_trait::async_trait;
use log::{debug, trace};
use restcmd::{CommandDescriptor, CommandTransport, ReplyAddress, TransportAck, TransportError};

/// Where commands are posted, and how to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub host: String,
    pub port: u16,
    pub route: String,
    /// `host:port` of a SOCKS5 proxy; host names are resolved by the proxy.
    pub proxy: Option<String>,
}

impl TargetConfig {
    pub fn url(&self) -> String {
        format!(
            "http://{}:{}/{}",
            self.host,
            self.port,
            self.route.trim_start_matches('/')
        )
    }
}

pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(target: &TargetConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = &target.proxy {
            let proxy = reqwest::Proxy::all(format!("socks5h://{proxy}")).map_err(|e| {
                TransportError::Setup {
                    reason: format!("invalid proxy '{proxy}': {e}"),
                }
            })?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().map_err(|e| TransportError::Setup {
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            url: target.url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CommandTransport for HttpTransport {
    async fn send(
        &self,
        command: &CommandDescriptor,
        reply_to: &ReplyAddress,
    ) -> Result<TransportAck, TransportError> {
        debug!("POST {} command '{}'", self.url, command.id());
        let mut request = self
            .client
            .post(&self.url)
            .json(command.payload())
            .header(ANSWER_PORT_HEADER, reply_to.port.to_string());
        if let Some(host) = &reply_to.host {
            request = request.header(ANSWER_HOST_HEADER, host);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Connection {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection_from_response(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connection {
                url: self.url.clone(),
                reason: format!("failed to read acknowledgment: {e}"),
            })?;
        trace!("POST {} - {} {}", self.url, status, body.trim());
        Ok(TransportAck {
            status: status.as_u16(),
            body,
        })
    }
}
