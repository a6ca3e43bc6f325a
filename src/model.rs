use chrono::{DateTime, NaiveDateTime};

/// Cell text standing in for an absent or unparsable value. Written verbatim
/// so a merged-but-missing field is distinguishable from an operator-cleared
/// cell.
pub const NULL_MARKER: &str = "N/A";

/// Prefix every provider-managed policy reference is built from.
pub const MANAGED_POLICY_PREFIX: &str = "arn:aws:iam::aws:policy/";

/// Name of the single data sheet in the workbook.
pub const USERS_SHEET: &str = "Users";

/// Workbook header row, one entry per [`UserRecord`] field.
pub const COLUMNS: [&str; 20] = [
    "UserName",
    "UserId",
    "Arn",
    "CreateDate",
    "ConsoleAccess",
    "MFAEnabled",
    "AccessKeys",
    "ActiveKeys",
    "LastKeyUsed",
    "AttachedPolicies",
    "Groups",
    "PasswordEnabled",
    "PasswordLastUsed",
    "PasswordLastChanged",
    "LastConsoleLogin",
    "AccessKey1LastUsed",
    "AccessKey2LastUsed",
    "Action",
    "NewGroups",
    "NewPolicies",
];

/// One exported row: the point-in-time snapshot of a single IAM user plus
/// the blank operator-input columns.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub user_name: String,
    pub user_id: String,
    pub arn: String,
    pub create_date: Option<NaiveDateTime>,
    pub console_access: bool,
    pub mfa_enabled: bool,
    pub access_keys: usize,
    pub active_keys: usize,
    /// Last-used timestamp of the first-listed access key only.
    pub last_key_used: Option<NaiveDateTime>,
    pub attached_policies: String,
    pub groups: String,
    pub password_enabled: Option<String>,
    pub password_last_used: Option<NaiveDateTime>,
    pub password_last_changed: Option<NaiveDateTime>,
    pub last_console_login: Option<NaiveDateTime>,
    pub access_key_1_last_used: Option<NaiveDateTime>,
    pub access_key_2_last_used: Option<NaiveDateTime>,
    pub action: String,
    pub new_groups: String,
    pub new_policies: String,
}

impl UserRecord {
    /// Serialises the record into cell text, one entry per [`COLUMNS`] header.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.user_name.clone(),
            self.user_id.clone(),
            self.arn.clone(),
            format_timestamp(self.create_date),
            self.console_access.to_string(),
            self.mfa_enabled.to_string(),
            self.access_keys.to_string(),
            self.active_keys.to_string(),
            format_timestamp(self.last_key_used),
            self.attached_policies.clone(),
            self.groups.clone(),
            self.password_enabled
                .clone()
                .unwrap_or_else(|| NULL_MARKER.to_string()),
            format_timestamp(self.password_last_used),
            format_timestamp(self.password_last_changed),
            format_timestamp(self.last_console_login),
            format_timestamp(self.access_key_1_last_used),
            format_timestamp(self.access_key_2_last_used),
            self.action.clone(),
            self.new_groups.clone(),
            self.new_policies.clone(),
        ]
    }
}

/// Closed set of operator actions. Anything else in the `Action` column means
/// the row is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ChangeGroups,
    AddGroup,
    RemoveGroup,
    AddPolicy,
    RemovePolicy,
    Deactivate,
    Delete,
}

impl Action {
    /// Parses an operator-supplied action cell. Matching is case-insensitive
    /// after trimming; empty and unrecognised text both yield `None`.
    pub fn parse(text: &str) -> Option<Action> {
        match text.trim().to_ascii_lowercase().as_str() {
            "change_groups" => Some(Action::ChangeGroups),
            "add_group" => Some(Action::AddGroup),
            "remove_group" => Some(Action::RemoveGroup),
            "add_policy" => Some(Action::AddPolicy),
            "remove_policy" => Some(Action::RemovePolicy),
            "deactivate" => Some(Action::Deactivate),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ChangeGroups => "change_groups",
            Action::AddGroup => "add_group",
            Action::RemoveGroup => "remove_group",
            Action::AddPolicy => "add_policy",
            Action::RemovePolicy => "remove_policy",
            Action::Deactivate => "deactivate",
            Action::Delete => "delete",
        }
    }
}

/// One parsed applier row: the username plus the operator-input columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RowInput {
    pub user_name: String,
    pub action: Option<Action>,
    pub new_groups: Vec<String>,
    pub new_policies: Vec<String>,
}

/// Splits a comma-separated cell into trimmed, non-empty entries.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Joins entity names the way the exporter presents multi-valued columns.
pub fn join_list(entries: &[String]) -> String {
    entries.join(", ")
}

/// Parses a timestamp-like value into a timezone-naive UTC instant.
///
/// The identity service and the credential report both emit RFC 3339, but the
/// report also carries sentinels such as `N/A` and `no_information`. Anything
/// unparsable normalises to `None` instead of failing the export.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(instant.naive_utc());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Formats a naive timestamp for the workbook; absent values take the
/// explicit null marker.
pub fn format_timestamp(value: Option<NaiveDateTime>) -> String {
    match value {
        Some(instant) => instant.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => NULL_MARKER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parsing_is_case_insensitive() {
        assert_eq!(Action::parse("Add_Group"), Some(Action::AddGroup));
        assert_eq!(Action::parse("  DELETE  "), Some(Action::Delete));
        assert_eq!(Action::parse("change_groups"), Some(Action::ChangeGroups));
    }

    #[test]
    fn empty_and_unknown_actions_are_skipped() {
        assert_eq!(Action::parse(""), None);
        assert_eq!(Action::parse("   "), None);
        assert_eq!(Action::parse("promote"), None);
    }

    #[test]
    fn split_list_drops_blank_entries() {
        assert_eq!(split_list("g1, g2 ,,g3 "), vec!["g1", "g2", "g3"]);
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn timestamps_parse_tolerantly() {
        let parsed = parse_timestamp("2024-03-01T12:30:00+00:00").expect("rfc3339");
        assert_eq!(format_timestamp(Some(parsed)), "2024-03-01 12:30:00");

        assert!(parse_timestamp("no_information").is_none());
        assert!(parse_timestamp("N/A").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn null_marker_fills_absent_cells() {
        assert_eq!(format_timestamp(None), NULL_MARKER);
    }
}
