use std::path::Path;

use tracing::{info, instrument, warn};

use crate::error::{Result, ToolError};
use crate::iam::{IamApi, KeyStatus};
use crate::io::excel_read;
use crate::model::{Action, MANAGED_POLICY_PREFIX, RowInput};

/// Replays operator intent from an edited workbook onto the identity
/// service, one row at a time.
///
/// Rows are processed strictly in sheet order and independently: a failure
/// inside one row is logged and the next row is still processed. There is no
/// rollback of sub-steps already applied within a failed row.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn apply_changes(client: &dyn IamApi, input: &Path) -> Result<()> {
    if !input.exists() {
        return Err(ToolError::MissingInput(input.to_path_buf()));
    }

    let rows = excel_read::read_rows(input)?;
    for row in &rows {
        let Some(action) = row.action else {
            continue;
        };
        info!(user = %row.user_name, action = action.as_str(), "processing row");
        if let Err(error) = apply_row(client, action, row) {
            warn!(
                user = %row.user_name,
                action = action.as_str(),
                %error,
                "row failed; continuing"
            );
        }
    }
    info!("finished applying changes");
    Ok(())
}

/// Performs the single operation a row's action selects.
pub fn apply_row(client: &dyn IamApi, action: Action, row: &RowInput) -> Result<()> {
    let user = row.user_name.as_str();
    match action {
        Action::ChangeGroups => {
            for group in client.list_groups(user)? {
                client.remove_user_from_group(user, &group)?;
                info!(user, group, "removed from group");
            }
            for group in &row.new_groups {
                client.add_user_to_group(user, group)?;
                info!(user, group, "added to group");
            }
        }
        Action::AddGroup => {
            for group in &row.new_groups {
                client.add_user_to_group(user, group)?;
                info!(user, group, "added to group");
            }
        }
        Action::RemoveGroup => {
            for group in &row.new_groups {
                client.remove_user_from_group(user, group)?;
                info!(user, group, "removed from group");
            }
        }
        Action::AddPolicy => {
            for policy in &row.new_policies {
                client.attach_user_policy(user, &managed_policy_arn(policy))?;
                info!(user, policy, "attached policy");
            }
        }
        Action::RemovePolicy => {
            for policy in &row.new_policies {
                client.detach_user_policy(user, &managed_policy_arn(policy))?;
                info!(user, policy, "detached policy");
            }
        }
        Action::Deactivate => {
            for key in client.list_access_keys(user)? {
                if key.status == KeyStatus::Active {
                    client.update_access_key(user, &key.access_key_id, KeyStatus::Inactive)?;
                    info!(user, key = %key.access_key_id, "deactivated access key");
                }
            }
        }
        Action::Delete => {
            // Memberships and attachments must be gone before DeleteUser
            // succeeds. NewGroups/NewPolicies are ignored for this action.
            for group in client.list_groups(user)? {
                client.remove_user_from_group(user, &group)?;
            }
            for policy in client.list_attached_policies(user)? {
                client.detach_user_policy(user, &policy.policy_arn)?;
            }
            client.delete_user(user)?;
            info!(user, "deleted user");
        }
    }
    Ok(())
}

/// Builds the reference string for a provider-managed policy short name.
fn managed_policy_arn(policy_name: &str) -> String {
    format!("{MANAGED_POLICY_PREFIX}{policy_name}")
}
