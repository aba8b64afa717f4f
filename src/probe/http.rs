//! reqwest-backed prober issuing one HEAD request per URL.

use std::time::Duration;

use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};

use super::{ProbeOutcome, Prober};

/// Production [`Prober`] sending a HEAD request through a shared reqwest client.
///
/// The client carries the User-Agent, per-request timeout and redirect limit,
/// so every probe gets identical transport settings. The response body is
/// never read.
#[derive(Clone, Debug)]
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    /// Build a prober from probe settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpClient`](crate::Error::HttpClient) if the TLS
    /// backend cannot be initialised.
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let parsed = url::Url::parse(url).map_err(|e| ProbeError::InvalidUrl(e.to_string()))?;

        match self.client.head(parsed).send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(e) => Err(ProbeError::from_reqwest(&e, self.timeout)),
        }
    }
}
