use std::path::Path;

use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::iam::report::{self, CredentialReport, WaitPolicy};
use crate::iam::{IamApi, KeyStatus, UserSummary};
use crate::io::excel_write;
use crate::model::{UserRecord, join_list};

/// Exports every IAM user to a workbook at `output`, overwriting any
/// existing file.
///
/// The credential report is fetched first so every user row can be merged
/// against it; report retrieval failures abort the export, while a failure
/// collecting one user's details only skips that user.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub fn export_users(client: &dyn IamApi, output: &Path, wait: &WaitPolicy) -> Result<()> {
    let report = report::fetch_credential_report(client, wait)?;
    let records = build_records(client, &report)?;
    info!(user_count = records.len(), "writing workbook");
    excel_write::write_records(output, &records)
}

/// Collects one [`UserRecord`] per listed user, merged with the credential
/// report. Users whose detail calls fail are logged and skipped so a single
/// broken account cannot sink the whole snapshot.
pub fn build_records(client: &dyn IamApi, report: &CredentialReport) -> Result<Vec<UserRecord>> {
    let users = client.list_users()?;
    info!(user_count = users.len(), "collecting user details");

    let mut records = Vec::with_capacity(users.len());
    for user in &users {
        match collect_user(client, user, report) {
            Ok(record) => {
                info!(user = %user.user_name, "collected user details");
                records.push(record);
            }
            Err(error) => {
                warn!(user = %user.user_name, %error, "skipping user after collection failure");
            }
        }
    }
    Ok(records)
}

/// Gathers identity, access, policy, and group attributes for one user.
fn collect_user(
    client: &dyn IamApi,
    user: &UserSummary,
    report: &CredentialReport,
) -> Result<UserRecord> {
    let console_access = client.has_login_profile(&user.user_name)?;
    let mfa_devices = client.list_mfa_devices(&user.user_name)?;

    let keys = client.list_access_keys(&user.user_name)?;
    let active_keys = keys
        .iter()
        .filter(|key| key.status == KeyStatus::Active)
        .count();
    // Last-used info is only fetched for the first-listed key; the column
    // reflects that one key, not an aggregate.
    let last_key_used = match keys.first() {
        Some(key) => client.access_key_last_used(&key.access_key_id)?,
        None => None,
    };

    let policies = client.list_attached_policies(&user.user_name)?;
    let policy_names: Vec<String> = policies
        .iter()
        .map(|policy| policy.policy_name.clone())
        .collect();
    let groups = client.list_groups(&user.user_name)?;

    let report_row = report.get(&user.user_name);
    Ok(UserRecord {
        user_name: user.user_name.clone(),
        user_id: user.user_id.clone(),
        arn: user.arn.clone(),
        create_date: user.create_date,
        console_access,
        mfa_enabled: !mfa_devices.is_empty(),
        access_keys: keys.len(),
        active_keys,
        last_key_used,
        attached_policies: join_list(&policy_names),
        groups: join_list(&groups),
        password_enabled: report_row.map(|row| row.password_enabled.clone()),
        password_last_used: report_row.and_then(|row| row.password_last_used_at()),
        password_last_changed: report_row.and_then(|row| row.password_last_changed_at()),
        last_console_login: report_row.and_then(|row| row.password_last_used_at()),
        access_key_1_last_used: report_row.and_then(|row| row.access_key_1_last_used_at()),
        access_key_2_last_used: report_row.and_then(|row| row.access_key_2_last_used_at()),
        action: String::new(),
        new_groups: String::new(),
        new_policies: String::new(),
    })
}
