//! The identity-service seam.
//!
//! [`IamApi`] covers exactly the calls the exporter and applier need; the
//! production implementation in [`http`] speaks the IAM Query API, while the
//! tests substitute a recording mock. Both tools take the client as an
//! explicit argument rather than reaching for process-wide state.

pub mod http;
pub mod report;
mod sign;

use chrono::NaiveDateTime;

use crate::error::Result;

pub use http::IamClient;
pub use report::{CredentialReport, WaitPolicy};

/// A user row as returned by account listing.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub user_name: String,
    pub user_id: String,
    pub arn: String,
    pub create_date: Option<NaiveDateTime>,
}

/// Metadata for one access key attached to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessKey {
    pub access_key_id: String,
    pub status: KeyStatus,
}

/// Activation state of an access key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Active,
    Inactive,
}

impl KeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::Active => "Active",
            KeyStatus::Inactive => "Inactive",
        }
    }

    pub fn from_str(text: &str) -> KeyStatus {
        if text.eq_ignore_ascii_case("active") {
            KeyStatus::Active
        } else {
            KeyStatus::Inactive
        }
    }
}

/// A managed policy attached to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedPolicy {
    pub policy_name: String,
    pub policy_arn: String,
}

/// Outcome of a credential report fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportState {
    /// Generation is still in progress; the only retryable condition.
    NotReady,
    /// The decoded CSV content of the report.
    Ready(Vec<u8>),
}

/// The nine read capabilities and six mutations the tools rely on.
///
/// Implementations are expected to be strictly sequential: every method
/// blocks until the service answers.
pub trait IamApi {
    /// Lists every user account, exhausting pagination.
    fn list_users(&self) -> Result<Vec<UserSummary>>;

    /// Whether the user has a console login profile. A provider
    /// `NoSuchEntity` answer means `false`, not an error.
    fn has_login_profile(&self, user_name: &str) -> Result<bool>;

    /// Serial numbers of the MFA devices registered for the user.
    fn list_mfa_devices(&self, user_name: &str) -> Result<Vec<String>>;

    fn list_access_keys(&self, user_name: &str) -> Result<Vec<AccessKey>>;

    /// Last-used instant of a single access key; `None` if never used.
    fn access_key_last_used(&self, access_key_id: &str) -> Result<Option<NaiveDateTime>>;

    fn list_attached_policies(&self, user_name: &str) -> Result<Vec<AttachedPolicy>>;

    /// Names of the groups the user currently belongs to.
    fn list_groups(&self, user_name: &str) -> Result<Vec<String>>;

    fn add_user_to_group(&self, user_name: &str, group_name: &str) -> Result<()>;

    fn remove_user_from_group(&self, user_name: &str, group_name: &str) -> Result<()>;

    fn attach_user_policy(&self, user_name: &str, policy_arn: &str) -> Result<()>;

    fn detach_user_policy(&self, user_name: &str, policy_arn: &str) -> Result<()>;

    fn update_access_key(
        &self,
        user_name: &str,
        access_key_id: &str,
        status: KeyStatus,
    ) -> Result<()>;

    fn delete_user(&self, user_name: &str) -> Result<()>;

    fn generate_credential_report(&self) -> Result<()>;

    fn get_credential_report(&self) -> Result<ReportState>;
}
