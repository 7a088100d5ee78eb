//! Group and membership endpoints

use tokio_util::sync::CancellationToken;

use super::client::ApiClient;
use super::dto::{CreateGroupRequest, InviteRequest, RoleUpdateRequest, UpdateGroupRequest};
use crate::error::ClientResult;
use crate::models::{Group, GroupId, GroupMember, MemberRole, UserId};

impl ApiClient {
    pub async fn list_groups(&self, cancel: &CancellationToken) -> ClientResult<Vec<Group>> {
        self.get("/groups/", &[], cancel).await
    }

    pub async fn get_group(&self, id: GroupId, cancel: &CancellationToken) -> ClientResult<Group> {
        self.get(&format!("/groups/{}", id), &[], cancel).await
    }

    pub async fn create_group(
        &self,
        request: &CreateGroupRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<Group> {
        self.post("/groups/", request, cancel).await
    }

    pub async fn update_group(
        &self,
        id: GroupId,
        request: &UpdateGroupRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<Group> {
        self.put(&format!("/groups/{}", id), request, cancel).await
    }

    pub async fn delete_group(&self, id: GroupId, cancel: &CancellationToken) -> ClientResult<()> {
        let _: serde_json::Value = self.delete(&format!("/groups/{}", id), cancel).await?;
        Ok(())
    }

    pub async fn join_group(&self, id: GroupId, cancel: &CancellationToken) -> ClientResult<()> {
        let _: serde_json::Value = self
            .post(&format!("/groups/{}/join", id), &serde_json::json!({}), cancel)
            .await?;
        Ok(())
    }

    pub async fn leave_group(&self, id: GroupId, cancel: &CancellationToken) -> ClientResult<()> {
        let _: serde_json::Value = self
            .post(&format!("/groups/{}/leave", id), &serde_json::json!({}), cancel)
            .await?;
        Ok(())
    }

    /// Invite someone to a group by email
    pub async fn invite_user(
        &self,
        id: GroupId,
        email: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let body = InviteRequest {
            email: email.to_string(),
        };
        let _: serde_json::Value = self
            .post(&format!("/groups/{}/invite", id), &body, cancel)
            .await?;
        Ok(())
    }

    pub async fn list_members(
        &self,
        id: GroupId,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<GroupMember>> {
        self.get(&format!("/groups/{}/members", id), &[], cancel).await
    }

    pub async fn update_member_role(
        &self,
        id: GroupId,
        user_id: UserId,
        role: MemberRole,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let body = RoleUpdateRequest { role };
        let _: serde_json::Value = self
            .put(&format!("/groups/{}/members/{}", id, user_id), &body, cancel)
            .await?;
        Ok(())
    }

    pub async fn remove_member(
        &self,
        id: GroupId,
        user_id: UserId,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let _: serde_json::Value = self
            .delete(&format!("/groups/{}/members/{}", id, user_id), cancel)
            .await?;
        Ok(())
    }
}
