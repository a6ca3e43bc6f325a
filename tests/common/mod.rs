#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use iam_audit_tools::error::{Result, ToolError};
use iam_audit_tools::iam::{
    AccessKey, AttachedPolicy, IamApi, KeyStatus, ReportState, UserSummary,
};
use iam_audit_tools::model::UserRecord;

/// One recorded mutation, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AddToGroup { user: String, group: String },
    RemoveFromGroup { user: String, group: String },
    AttachPolicy { user: String, arn: String },
    DetachPolicy { user: String, arn: String },
    UpdateKey { user: String, key: String, status: KeyStatus },
    DeleteUser { user: String },
}

/// In-memory identity service that records every mutation call.
///
/// Read state is plain fields the test sets up front; `fail_users` injects an
/// API error for selected usernames on their first touched call.
#[derive(Default)]
pub struct MockIam {
    pub users: Vec<UserSummary>,
    pub login_profiles: HashSet<String>,
    pub mfa: HashMap<String, Vec<String>>,
    pub access_keys: HashMap<String, Vec<AccessKey>>,
    pub key_last_used: HashMap<String, Option<NaiveDateTime>>,
    pub policies: HashMap<String, Vec<AttachedPolicy>>,
    pub groups: HashMap<String, Vec<String>>,
    pub report_csv: Vec<u8>,
    pub not_ready_polls: Cell<u32>,
    pub fail_users: HashSet<String>,
    pub calls: RefCell<Vec<Call>>,
}

impl MockIam {
    pub fn with_users(names: &[&str]) -> MockIam {
        MockIam {
            users: names.iter().map(|name| user(name)).collect(),
            ..MockIam::default()
        }
    }

    pub fn recorded(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn check_failure(&self, user_name: &str) -> Result<()> {
        if self.fail_users.contains(user_name) {
            Err(injected_failure(user_name))
        } else {
            Ok(())
        }
    }
}

impl IamApi for MockIam {
    fn list_users(&self) -> Result<Vec<UserSummary>> {
        Ok(self.users.clone())
    }

    fn has_login_profile(&self, user_name: &str) -> Result<bool> {
        self.check_failure(user_name)?;
        Ok(self.login_profiles.contains(user_name))
    }

    fn list_mfa_devices(&self, user_name: &str) -> Result<Vec<String>> {
        Ok(self.mfa.get(user_name).cloned().unwrap_or_default())
    }

    fn list_access_keys(&self, user_name: &str) -> Result<Vec<AccessKey>> {
        Ok(self.access_keys.get(user_name).cloned().unwrap_or_default())
    }

    fn access_key_last_used(&self, access_key_id: &str) -> Result<Option<NaiveDateTime>> {
        Ok(self
            .key_last_used
            .get(access_key_id)
            .copied()
            .flatten())
    }

    fn list_attached_policies(&self, user_name: &str) -> Result<Vec<AttachedPolicy>> {
        Ok(self.policies.get(user_name).cloned().unwrap_or_default())
    }

    fn list_groups(&self, user_name: &str) -> Result<Vec<String>> {
        Ok(self.groups.get(user_name).cloned().unwrap_or_default())
    }

    fn add_user_to_group(&self, user_name: &str, group_name: &str) -> Result<()> {
        self.check_failure(user_name)?;
        self.record(Call::AddToGroup {
            user: user_name.to_string(),
            group: group_name.to_string(),
        });
        Ok(())
    }

    fn remove_user_from_group(&self, user_name: &str, group_name: &str) -> Result<()> {
        self.record(Call::RemoveFromGroup {
            user: user_name.to_string(),
            group: group_name.to_string(),
        });
        Ok(())
    }

    fn attach_user_policy(&self, user_name: &str, policy_arn: &str) -> Result<()> {
        self.record(Call::AttachPolicy {
            user: user_name.to_string(),
            arn: policy_arn.to_string(),
        });
        Ok(())
    }

    fn detach_user_policy(&self, user_name: &str, policy_arn: &str) -> Result<()> {
        self.record(Call::DetachPolicy {
            user: user_name.to_string(),
            arn: policy_arn.to_string(),
        });
        Ok(())
    }

    fn update_access_key(
        &self,
        user_name: &str,
        access_key_id: &str,
        status: KeyStatus,
    ) -> Result<()> {
        self.record(Call::UpdateKey {
            user: user_name.to_string(),
            key: access_key_id.to_string(),
            status,
        });
        Ok(())
    }

    fn delete_user(&self, user_name: &str) -> Result<()> {
        self.record(Call::DeleteUser {
            user: user_name.to_string(),
        });
        Ok(())
    }

    fn generate_credential_report(&self) -> Result<()> {
        Ok(())
    }

    fn get_credential_report(&self) -> Result<ReportState> {
        if self.not_ready_polls.get() > 0 {
            self.not_ready_polls.set(self.not_ready_polls.get() - 1);
            return Ok(ReportState::NotReady);
        }
        Ok(ReportState::Ready(self.report_csv.clone()))
    }
}

pub fn user(name: &str) -> UserSummary {
    UserSummary {
        user_name: name.to_string(),
        user_id: format!("AIDA{}", name.to_ascii_uppercase()),
        arn: format!("arn:aws:iam::111122223333:user/{name}"),
        create_date: None,
    }
}

pub fn active_key(id: &str) -> AccessKey {
    AccessKey {
        access_key_id: id.to_string(),
        status: KeyStatus::Active,
    }
}

pub fn inactive_key(id: &str) -> AccessKey {
    AccessKey {
        access_key_id: id.to_string(),
        status: KeyStatus::Inactive,
    }
}

pub fn attached_policy(name: &str) -> AttachedPolicy {
    AttachedPolicy {
        policy_name: name.to_string(),
        policy_arn: format!("arn:aws:iam::aws:policy/{name}"),
    }
}

fn injected_failure(user_name: &str) -> ToolError {
    ToolError::Api {
        code: "ServiceFailure".to_string(),
        message: format!("injected failure for {user_name}"),
    }
}

/// A blank exported row for `name` with the given operator inputs, matching
/// what the exporter writes before an operator edits it.
pub fn operator_row(name: &str, action: &str, new_groups: &str, new_policies: &str) -> UserRecord {
    UserRecord {
        user_name: name.to_string(),
        user_id: format!("AIDA{}", name.to_ascii_uppercase()),
        arn: format!("arn:aws:iam::111122223333:user/{name}"),
        create_date: None,
        console_access: false,
        mfa_enabled: false,
        access_keys: 0,
        active_keys: 0,
        last_key_used: None,
        attached_policies: String::new(),
        groups: String::new(),
        password_enabled: None,
        password_last_used: None,
        password_last_changed: None,
        last_console_login: None,
        access_key_1_last_used: None,
        access_key_2_last_used: None,
        action: action.to_string(),
        new_groups: new_groups.to_string(),
        new_policies: new_policies.to_string(),
    }
}

/// Credential report content covering the given usernames with fixed
/// activity values.
pub fn report_csv(names: &[&str]) -> Vec<u8> {
    let mut content = String::from(
        "user,arn,user_creation_time,password_enabled,password_last_used,\
         password_last_changed,password_next_rotation,mfa_active,\
         access_key_1_active,access_key_1_last_rotated,access_key_1_last_used_date,\
         access_key_2_active,access_key_2_last_rotated,access_key_2_last_used_date\n",
    );
    for name in names {
        content.push_str(&format!(
            "{name},arn:aws:iam::111122223333:user/{name},2023-01-02T03:04:05+00:00,\
             true,2024-03-01T12:30:00+00:00,2023-06-01T00:00:00+00:00,N/A,true,\
             true,2023-06-01T00:00:00+00:00,2024-02-28T08:00:00+00:00,false,N/A,N/A\n"
        ));
    }
    content.into_bytes()
}
