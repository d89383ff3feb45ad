//! HTTP client for the console member API

use super::password::GeneratedPassword;
use super::role::Role;
use super::service::{MemberService, ServiceError};
use super::types::MemberId;
use crate::config::ServiceConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct UpdateRoleBody {
    role: Role,
}

#[derive(Serialize)]
struct ResetPasswordBody<'a> {
    password: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    send_email: bool,
}

/// [`MemberService`] backed by the console API of the current workspace.
///
/// Requests carry no timeout; a hung request stays pending until the server
/// or the connection gives up.
#[derive(Debug, Clone)]
pub struct HttpMemberService {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpMemberService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        let mut service = Self::new(config.base_url.clone());
        service.api_token = config.api_token.clone();
        service
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    fn member_url(&self, member_id: &MemberId) -> String {
        format!("{}/workspaces/current/members/{}", self.base_url, member_id)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(), ServiceError> {
        let request = match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), %body, "member API rejected request");
        Err(ServiceError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl MemberService for HttpMemberService {
    async fn update_role(&self, member_id: &MemberId, role: Role) -> Result<(), ServiceError> {
        let url = format!("{}/update-role", self.member_url(member_id));
        self.execute(self.client.put(url).json(&UpdateRoleBody { role }))
            .await
    }

    async fn reset_password(
        &self,
        member_id: &MemberId,
        password: &GeneratedPassword,
        send_email: bool,
    ) -> Result<(), ServiceError> {
        let url = format!("{}/reset-password", self.member_url(member_id));
        let body = ResetPasswordBody {
            password: password.expose(),
            send_email,
        };
        self.execute(self.client.post(url).json(&body)).await
    }

    async fn delete_or_cancel_invitation(&self, member_id: &MemberId) -> Result<(), ServiceError> {
        self.execute(self.client.delete(self.member_url(member_id)))
            .await
    }
}
