use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use super::ConnectivityObserver;

/// Background task that derives the connectivity signal by polling a URL.
///
/// Any HTTP response below 500 means the API is reachable. Transport
/// errors, timeouts and 5xx responses mean it is not.
pub struct ConnectivityProbe {
    observer: Arc<ConnectivityObserver>,
    client: reqwest::Client,
    url: String,
    interval: Duration,
    timeout: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl ConnectivityProbe {
    pub fn new(
        observer: Arc<ConnectivityObserver>,
        url: impl Into<String>,
        interval: Duration,
        timeout: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            observer,
            client: reqwest::Client::new(),
            url: url.into(),
            interval,
            timeout,
            shutdown,
        }
    }

    /// Probe until the shutdown signal fires
    pub async fn run(mut self) {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            url = %self.url,
            interval_ms = self.interval.as_millis() as u64,
            "Connectivity probe started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Connectivity probe received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    let reachable = self.probe_once().await;
                    self.observer.update(reachable);
                }
            }
        }

        tracing::info!("Connectivity probe stopped");
    }

    /// One reachability check
    pub async fn probe_once(&self) -> bool {
        match self.client.get(&self.url).timeout(self.timeout).send().await {
            Ok(resp) => {
                let reachable = !resp.status().is_server_error();
                if !reachable {
                    tracing::debug!(status = %resp.status(), "Probe got server error");
                }
                reachable
            }
            Err(e) => {
                tracing::debug!(error = %e, url = %self.url, "Probe failed");
                false
            }
        }
    }
}
