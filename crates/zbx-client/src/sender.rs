//! Trapper client: pushes measurements the way `zabbix_sender` does.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use zbx_proto::{Payload, ProtocolRequest};
use zbx_types::{Measurement, TrapperSummary};

use crate::error::Result;
use crate::protocol::{Exchange, ProtocolClient};
use crate::settings::TrapperSettings;

fn info_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"processed:\s*(\d+);\s*failed:\s*(\d+);\s*total:\s*(\d+);\s*seconds spent:\s*([\d.]+)",
        )
        .expect("trapper info pattern is valid")
    })
}

/// Sends measurements of trapper items.
///
/// Every call to [`transmit`](Self::transmit) opens exactly one connection,
/// however many measurements it carries. The target items must exist and be
/// of type "Zabbix trapper" on the server.
#[derive(Debug, Clone)]
pub struct Sender {
    client: ProtocolClient,
    zabbix_host: String,
}

impl Sender {
    #[must_use]
    pub fn new(settings: &TrapperSettings) -> Self {
        Self {
            client: ProtocolClient::new(settings.host.clone(), settings.port, settings.timeout()),
            zabbix_host: settings.zabbix_host.clone(),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.client = self.client.with_cancellation(token);
        self
    }

    #[must_use]
    pub fn client(&self) -> &ProtocolClient {
        &self.client
    }

    /// Host that measurements without their own `host` are filed under
    #[must_use]
    pub fn zabbix_host(&self) -> &str {
        &self.zabbix_host
    }

    pub fn set_zabbix_host(&mut self, zabbix_host: impl Into<String>) {
        self.zabbix_host = zabbix_host.into();
    }

    /// Fill in this sender's default host when the measurement has none.
    #[must_use]
    pub fn format_measurement(&self, mut measurement: Measurement) -> Measurement {
        if measurement.host.is_none() {
            measurement.host = Some(self.zabbix_host.clone());
        }
        measurement
    }

    /// Send a batch of measurements over one connection.
    ///
    /// An empty batch is still sent; the trapper answers it with a summary
    /// of zero processed values.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the trapper cannot be reached, or a
    /// framing error if it replies with something other than a binary JSON
    /// frame.
    pub async fn transmit<I>(&self, measurements: I) -> Result<TrapperSummary>
    where
        I: IntoIterator<Item = Measurement>,
    {
        let measurements: Vec<Measurement> = measurements.into_iter().collect();
        self.client.request(self, measurements).await
    }
}

impl Exchange for Sender {
    type Input = Vec<Measurement>;
    type Output = TrapperSummary;

    fn create_request(&self, measurements: &Vec<Measurement>) -> Result<ProtocolRequest> {
        let data: Vec<Measurement> = measurements
            .iter()
            .cloned()
            .map(|m| self.format_measurement(m))
            .collect();
        Ok(ProtocolRequest::sender_data(&data)?)
    }

    fn handle_response(
        &self,
        payload: Payload,
        measurements: Vec<Measurement>,
    ) -> Result<TrapperSummary> {
        let summary = parse_summary(&payload);

        match summary.info.as_deref() {
            Some(info) if summary.is_success() => {
                debug!("Trapper accepted {} measurements: {}", measurements.len(), info);
            }
            info => warn!(
                "Trapper replied '{}' to {} measurements: {}",
                summary.response.as_deref().unwrap_or("<none>"),
                measurements.len(),
                info.unwrap_or("<no info>")
            ),
        }

        Ok(summary)
    }
}

/// Read the status and info string of a trapper reply.
pub(crate) fn parse_summary(payload: &Payload) -> TrapperSummary {
    let text = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);
    let mut summary = TrapperSummary {
        response: text("response"),
        info: text("info"),
        ..TrapperSummary::default()
    };

    if let Some(caps) = summary.info.as_deref().and_then(|info| info_pattern().captures(info)) {
        summary.processed = caps[1].parse().ok();
        summary.failed = caps[2].parse().ok();
        summary.total = caps[3].parse().ok();
        summary.seconds_spent = caps[4].parse().ok();
    }

    summary
}
