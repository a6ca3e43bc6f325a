//! Credential report retrieval and parsing.
//!
//! The provider generates the report asynchronously, so retrieval is a
//! generate-then-poll sequence. The poll is bounded by [`WaitPolicy`]: the
//! fixed 2 second interval matches the service's own guidance, and the
//! deadline turns an indefinitely delayed report into a typed error instead
//! of blocking forever.

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, ToolError};
use crate::iam::{IamApi, ReportState};
use crate::model::parse_timestamp;

/// How long and how often to wait for report generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        WaitPolicy {
            interval: Duration::from_secs(2),
            deadline: Duration::from_secs(300),
        }
    }
}

/// Raw cells consumed from one report row. Timestamp-like columns stay
/// strings here; normalisation happens when the row is merged.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "user")]
    pub user_name: String,
    pub password_enabled: String,
    pub password_last_used: String,
    pub password_last_changed: String,
    pub access_key_1_last_used_date: String,
    pub access_key_2_last_used_date: String,
}

impl ReportRow {
    pub fn password_last_used_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.password_last_used)
    }

    pub fn password_last_changed_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.password_last_changed)
    }

    pub fn access_key_1_last_used_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.access_key_1_last_used_date)
    }

    pub fn access_key_2_last_used_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.access_key_2_last_used_date)
    }
}

/// The report as a username-keyed lookup table.
#[derive(Debug, Default)]
pub struct CredentialReport {
    rows: HashMap<String, ReportRow>,
}

impl CredentialReport {
    /// Parses the decoded CSV content of a credential report.
    pub fn from_csv(content: &[u8]) -> Result<CredentialReport> {
        let mut reader = csv::Reader::from_reader(content);
        let mut rows = HashMap::new();
        for record in reader.deserialize() {
            let row: ReportRow = record?;
            rows.insert(row.user_name.clone(), row);
        }
        Ok(CredentialReport { rows })
    }

    pub fn get(&self, user_name: &str) -> Option<&ReportRow> {
        self.rows.get(user_name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Triggers report generation and polls until the content is available or
/// the wait policy's deadline passes.
pub fn fetch_credential_report(
    client: &dyn IamApi,
    wait: &WaitPolicy,
) -> Result<CredentialReport> {
    info!("generating credential report");
    client.generate_credential_report()?;

    let started = Instant::now();
    loop {
        match client.get_credential_report()? {
            ReportState::Ready(content) => {
                let report = CredentialReport::from_csv(&content)?;
                info!(entries = report.len(), "credential report retrieved");
                return Ok(report);
            }
            ReportState::NotReady => {
                let waited = started.elapsed();
                if waited >= wait.deadline {
                    return Err(ToolError::ReportDeadline { waited });
                }
                debug!(waited_secs = waited.as_secs(), "credential report not ready");
                thread::sleep(wait.interval);
            }
        }
    }
}
