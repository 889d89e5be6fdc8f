//! Dependency reachability.
//!
//! A probe has three outcomes, not two: a service that answers with an error
//! status is up but broken, which calls for a different fix than a service
//! that does not answer at all.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Observed state of one external dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    /// Answered with a success status.
    Healthy,
    /// Answered, but with a non-success status.
    Unhealthy,
    /// No answer: refused, DNS failure or timeout.
    Unreachable,
}

/// Aggregate health of this service and its dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub api: DependencyStatus,
    pub ocr: DependencyStatus,
    pub inference: DependencyStatus,
}

impl HealthReport {
    pub fn new(ocr: DependencyStatus, inference: DependencyStatus) -> Self {
        Self {
            api: DependencyStatus::Healthy,
            ocr,
            inference,
        }
    }

    /// True only when every dependency is healthy.
    pub fn all_healthy(&self) -> bool {
        [self.api, self.ocr, self.inference]
            .iter()
            .all(|s| *s == DependencyStatus::Healthy)
    }
}

/// `GET url` with a short timeout and classify the outcome. Never fails.
pub async fn probe(client: &reqwest::Client, url: &str, timeout: Duration) -> DependencyStatus {
    match client.get(url).timeout(timeout).send().await {
        Ok(resp) if resp.status().is_success() => DependencyStatus::Healthy,
        Ok(resp) => {
            debug!("Probe {} answered {}", url, resp.status());
            DependencyStatus::Unhealthy
        }
        Err(e) => {
            debug!("Probe {} failed: {}", url, e);
            DependencyStatus::Unreachable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serialises_tri_state() {
        let r = HealthReport::new(DependencyStatus::Unreachable, DependencyStatus::Unhealthy);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["api"], "healthy");
        assert_eq!(v["ocr"], "unreachable");
        assert_eq!(v["inference"], "unhealthy");
        assert!(!r.all_healthy());
    }

    #[test]
    fn all_healthy_needs_both_dependencies() {
        use DependencyStatus::*;
        assert!(HealthReport::new(Healthy, Healthy).all_healthy());
        assert!(!HealthReport::new(Healthy, Unreachable).all_healthy());
        assert!(!HealthReport::new(Unhealthy, Healthy).all_healthy());
    }

    #[tokio::test]
    async fn probe_of_closed_port_is_unreachable() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let client = reqwest::Client::new();
        let status = probe(
            &client,
            &format!("http://127.0.0.1:{port}/health"),
            Duration::from_secs(2),
        )
        .await;
        assert_eq!(status, DependencyStatus::Unreachable);
    }
}
