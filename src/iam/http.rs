//! Blocking client for the IAM Query API.
//!
//! Every call is a SigV4-signed, form-encoded POST against the service root;
//! responses are XML. Credentials and the endpoint come from the ambient
//! environment, matching how the tools are deployed.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{NaiveDateTime, Utc};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::iam::sign::{self, SigningContext};
use crate::iam::{AccessKey, AttachedPolicy, IamApi, KeyStatus, ReportState, UserSummary};
use crate::model::parse_timestamp;

const API_VERSION: &str = "2010-05-08";
const DEFAULT_ENDPOINT: &str = "https://iam.amazonaws.com";
const DEFAULT_REGION: &str = "us-east-1";

const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
const ENV_REGION: &str = "AWS_REGION";
const ENV_ENDPOINT: &str = "AWS_ENDPOINT_URL_IAM";

/// Production [`IamApi`] implementation backed by `reqwest::blocking`.
pub struct IamClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    host: String,
    path: String,
    region: String,
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl IamClient {
    /// Builds a client from ambient environment configuration.
    pub fn from_env() -> Result<IamClient> {
        let endpoint =
            std::env::var(ENV_ENDPOINT).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Ok(IamClient {
            http: reqwest::blocking::Client::new(),
            host: host_of(&endpoint),
            path: path_of(&endpoint),
            endpoint,
            region: std::env::var(ENV_REGION).unwrap_or_else(|_| DEFAULT_REGION.to_string()),
            access_key_id: require_env(ENV_ACCESS_KEY_ID)?,
            secret_access_key: require_env(ENV_SECRET_ACCESS_KEY)?,
            session_token: std::env::var(ENV_SESSION_TOKEN).ok(),
        })
    }

    /// Issues one signed Query API call and returns the response body on
    /// success.
    fn call(&self, action: &str, params: &[(&str, String)]) -> Result<String> {
        let mut body = format!("Action={action}&Version={API_VERSION}");
        for (key, value) in params {
            body.push('&');
            body.push_str(key);
            body.push('=');
            body.push_str(&urlencoding::encode(value));
        }

        let context = SigningContext {
            access_key_id: &self.access_key_id,
            secret_access_key: &self.secret_access_key,
            session_token: self.session_token.as_deref(),
            region: &self.region,
            service: "iam",
            host: &self.host,
            path: &self.path,
        };
        let headers = sign::sign_request(&context, Utc::now(), &body)?;

        debug!(action, "calling IAM");
        let mut request = self.http.post(&self.endpoint).body(body);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send()?;
        let status = response.status();
        let text = response.text()?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(parse_api_error(&text, status.as_u16()))
        }
    }
}

impl IamApi for IamClient {
    fn list_users(&self) -> Result<Vec<UserSummary>> {
        let mut users = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut params = Vec::new();
            if let Some(marker) = &marker {
                params.push(("Marker", marker.clone()));
            }
            let body = self.call("ListUsers", &params)?;
            let document = roxmltree::Document::parse(&body)?;

            for member in members(&document) {
                users.push(UserSummary {
                    user_name: child_text(member, "UserName").unwrap_or_default(),
                    user_id: child_text(member, "UserId").unwrap_or_default(),
                    arn: child_text(member, "Arn").unwrap_or_default(),
                    create_date: child_text(member, "CreateDate")
                        .as_deref()
                        .and_then(parse_timestamp),
                });
            }

            let truncated = child_text(document.root(), "IsTruncated")
                .is_some_and(|value| value == "true");
            marker = child_text(document.root(), "Marker");
            if !truncated || marker.is_none() {
                break;
            }
        }
        Ok(users)
    }

    fn has_login_profile(&self, user_name: &str) -> Result<bool> {
        match self.call("GetLoginProfile", &[("UserName", user_name.to_string())]) {
            Ok(_) => Ok(true),
            Err(error) if error.api_code() == Some("NoSuchEntity") => Ok(false),
            Err(error) => Err(error),
        }
    }

    fn list_mfa_devices(&self, user_name: &str) -> Result<Vec<String>> {
        let body = self.call("ListMFADevices", &[("UserName", user_name.to_string())])?;
        let document = roxmltree::Document::parse(&body)?;
        Ok(members(&document)
            .filter_map(|member| child_text(member, "SerialNumber"))
            .collect())
    }

    fn list_access_keys(&self, user_name: &str) -> Result<Vec<AccessKey>> {
        let body = self.call("ListAccessKeys", &[("UserName", user_name.to_string())])?;
        let document = roxmltree::Document::parse(&body)?;
        Ok(members(&document)
            .filter_map(|member| {
                let access_key_id = child_text(member, "AccessKeyId")?;
                let status = child_text(member, "Status")?;
                Some(AccessKey {
                    access_key_id,
                    status: KeyStatus::from_str(&status),
                })
            })
            .collect())
    }

    fn access_key_last_used(&self, access_key_id: &str) -> Result<Option<NaiveDateTime>> {
        let body = self.call(
            "GetAccessKeyLastUsed",
            &[("AccessKeyId", access_key_id.to_string())],
        )?;
        let document = roxmltree::Document::parse(&body)?;
        Ok(child_text(document.root(), "LastUsedDate")
            .as_deref()
            .and_then(parse_timestamp))
    }

    fn list_attached_policies(&self, user_name: &str) -> Result<Vec<AttachedPolicy>> {
        let body = self.call(
            "ListAttachedUserPolicies",
            &[("UserName", user_name.to_string())],
        )?;
        let document = roxmltree::Document::parse(&body)?;
        Ok(members(&document)
            .filter_map(|member| {
                Some(AttachedPolicy {
                    policy_name: child_text(member, "PolicyName")?,
                    policy_arn: child_text(member, "PolicyArn")?,
                })
            })
            .collect())
    }

    fn list_groups(&self, user_name: &str) -> Result<Vec<String>> {
        let body = self.call("ListGroupsForUser", &[("UserName", user_name.to_string())])?;
        let document = roxmltree::Document::parse(&body)?;
        Ok(members(&document)
            .filter_map(|member| child_text(member, "GroupName"))
            .collect())
    }

    fn add_user_to_group(&self, user_name: &str, group_name: &str) -> Result<()> {
        self.call(
            "AddUserToGroup",
            &[
                ("UserName", user_name.to_string()),
                ("GroupName", group_name.to_string()),
            ],
        )?;
        Ok(())
    }

    fn remove_user_from_group(&self, user_name: &str, group_name: &str) -> Result<()> {
        self.call(
            "RemoveUserFromGroup",
            &[
                ("UserName", user_name.to_string()),
                ("GroupName", group_name.to_string()),
            ],
        )?;
        Ok(())
    }

    fn attach_user_policy(&self, user_name: &str, policy_arn: &str) -> Result<()> {
        self.call(
            "AttachUserPolicy",
            &[
                ("UserName", user_name.to_string()),
                ("PolicyArn", policy_arn.to_string()),
            ],
        )?;
        Ok(())
    }

    fn detach_user_policy(&self, user_name: &str, policy_arn: &str) -> Result<()> {
        self.call(
            "DetachUserPolicy",
            &[
                ("UserName", user_name.to_string()),
                ("PolicyArn", policy_arn.to_string()),
            ],
        )?;
        Ok(())
    }

    fn update_access_key(
        &self,
        user_name: &str,
        access_key_id: &str,
        status: KeyStatus,
    ) -> Result<()> {
        self.call(
            "UpdateAccessKey",
            &[
                ("UserName", user_name.to_string()),
                ("AccessKeyId", access_key_id.to_string()),
                ("Status", status.as_str().to_string()),
            ],
        )?;
        Ok(())
    }

    fn delete_user(&self, user_name: &str) -> Result<()> {
        self.call("DeleteUser", &[("UserName", user_name.to_string())])?;
        Ok(())
    }

    fn generate_credential_report(&self) -> Result<()> {
        self.call("GenerateCredentialReport", &[])?;
        Ok(())
    }

    fn get_credential_report(&self) -> Result<ReportState> {
        let body = match self.call("GetCredentialReport", &[]) {
            Ok(body) => body,
            Err(error) if error.api_code() == Some("ReportInProgress") => {
                return Ok(ReportState::NotReady);
            }
            Err(error) => return Err(error),
        };
        let document = roxmltree::Document::parse(&body)?;
        let content = child_text(document.root(), "Content").unwrap_or_default();
        let compact: String = content.split_whitespace().collect();
        Ok(ReportState::Ready(BASE64.decode(compact.as_bytes())?))
    }
}

/// Iterates the `<member>` elements of a list response, namespace ignored.
fn members<'a, 'input>(
    document: &'a roxmltree::Document<'input>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
    document
        .root()
        .descendants()
        .filter(|node| node.tag_name().name() == "member")
}

/// Text of the first descendant element with the given local name.
fn child_text(node: roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    node.descendants()
        .find(|candidate| candidate.tag_name().name() == name)
        .and_then(|candidate| candidate.text())
        .map(|text| text.trim().to_string())
}

fn parse_api_error(body: &str, status: u16) -> ToolError {
    if let Ok(document) = roxmltree::Document::parse(body) {
        if let Some(code) = child_text(document.root(), "Code") {
            return ToolError::Api {
                code,
                message: child_text(document.root(), "Message").unwrap_or_default(),
            };
        }
    }
    ToolError::Api {
        code: format!("HTTP{status}"),
        message: body.chars().take(200).collect(),
    }
}

fn require_env(name: &'static str) -> Result<String> {
    std::env::var(name).map_err(|_| ToolError::MissingCredentials(name))
}

/// Host portion of the endpoint URL, for the SigV4 `host` header.
fn host_of(endpoint: &str) -> String {
    let without_scheme = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest);
    without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}

/// Path portion of the endpoint URL, for the canonical request. Endpoint
/// overrides may carry a prefix path; the signature must cover it.
fn path_of(endpoint: &str) -> String {
    let without_scheme = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest);
    match without_scheme.find('/') {
        Some(index) => without_scheme[index..].to_string(),
        None => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_extracted_from_the_endpoint() {
        assert_eq!(host_of("https://iam.amazonaws.com"), "iam.amazonaws.com");
        assert_eq!(host_of("http://localhost:4566/iam"), "localhost:4566");
        assert_eq!(host_of("iam.amazonaws.com"), "iam.amazonaws.com");
    }

    #[test]
    fn endpoint_paths_are_carried_into_the_canonical_request() {
        assert_eq!(path_of("https://iam.amazonaws.com"), "/");
        assert_eq!(path_of("http://localhost:4566/iam"), "/iam");
        assert_eq!(path_of("http://localhost:4566/"), "/");
    }

    #[test]
    fn api_errors_surface_code_and_message() {
        let body = r#"<ErrorResponse xmlns="https://iam.amazonaws.com/doc/2010-05-08/">
            <Error>
                <Type>Sender</Type>
                <Code>NoSuchEntity</Code>
                <Message>The user with name ghost cannot be found.</Message>
            </Error>
            <RequestId>abc</RequestId>
        </ErrorResponse>"#;
        let error = parse_api_error(body, 404);
        assert_eq!(error.api_code(), Some("NoSuchEntity"));
    }

    #[test]
    fn list_members_are_parsed_ignoring_the_namespace() {
        let body = r#"<ListGroupsForUserResponse xmlns="https://iam.amazonaws.com/doc/2010-05-08/">
            <ListGroupsForUserResult>
                <Groups>
                    <member><GroupName>admins</GroupName><GroupId>A</GroupId></member>
                    <member><GroupName>devs</GroupName><GroupId>B</GroupId></member>
                </Groups>
                <IsTruncated>false</IsTruncated>
            </ListGroupsForUserResult>
        </ListGroupsForUserResponse>"#;
        let document = roxmltree::Document::parse(body).expect("parsed");
        let names: Vec<_> = members(&document)
            .filter_map(|member| child_text(member, "GroupName"))
            .collect();
        assert_eq!(names, vec!["admins", "devs"]);
    }
}
