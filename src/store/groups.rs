//! Groups Store

use tokio_util::sync::CancellationToken;

use super::Store;
use crate::api::{ApiClient, CreateGroupRequest, UpdateGroupRequest};
use crate::error::{ClientError, ClientResult};
use crate::models::{Group, GroupId, GroupMember, MemberRole, UserId};
use crate::realtime::RealtimeChannel;

pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// Models a group may answer with, as `(id, label)`
pub const AI_MODELS: [(&str, &str); 3] = [
    ("openai-gpt4", "GPT-4"),
    ("openai-gpt3.5", "GPT-3.5"),
    ("gemini", "Gemini"),
];

#[derive(Debug, Clone, Default)]
pub struct GroupState {
    pub groups: Vec<Group>,
    pub selected: Option<GroupId>,
    pub loading: bool,
    pub error: Option<String>,
}

impl GroupState {
    pub fn selected_group(&self) -> Option<&Group> {
        let id = self.selected?;
        self.groups.iter().find(|g| g.id == id)
    }
}

/// Check a create request before it is sent
pub fn validate_create(request: &CreateGroupRequest) -> ClientResult<()> {
    let name_len = request.name.trim().chars().count();
    if name_len == 0 {
        return Err(ClientError::Validation("Group name is required".into()));
    }
    if name_len < NAME_MIN_CHARS {
        return Err(ClientError::Validation(format!(
            "Group name must be at least {} characters",
            NAME_MIN_CHARS
        )));
    }
    if name_len > NAME_MAX_CHARS {
        return Err(ClientError::Validation(format!(
            "Group name must be less than {} characters",
            NAME_MAX_CHARS
        )));
    }

    let description_len = request
        .description
        .as_deref()
        .map_or(0, |d| d.chars().count());
    if description_len > DESCRIPTION_MAX_CHARS {
        return Err(ClientError::Validation(format!(
            "Description must be less than {} characters",
            DESCRIPTION_MAX_CHARS
        )));
    }

    if let Some(model) = request.ai_model.as_deref() {
        if request.ai_enabled && !AI_MODELS.iter().any(|(id, _)| *id == model) {
            return Err(ClientError::Validation(format!("Unknown AI model: {}", model)));
        }
    }
    Ok(())
}

pub struct GroupStore {
    api: ApiClient,
    store: Store<GroupState>,
}

impl GroupStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            store: Store::default(),
        }
    }

    pub fn store(&self) -> &Store<GroupState> {
        &self.store
    }

    pub fn groups(&self) -> Vec<Group> {
        self.store.read(|s| s.groups.clone())
    }

    pub fn selected(&self) -> Option<GroupId> {
        self.store.read(|s| s.selected)
    }

    pub fn selected_group(&self) -> Option<Group> {
        self.store.read(|s| s.selected_group().cloned())
    }

    pub fn get(&self, id: GroupId) -> Option<Group> {
        self.store
            .read(|s| s.groups.iter().find(|g| g.id == id).cloned())
    }

    pub fn is_loading(&self) -> bool {
        self.store.read(|s| s.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.store.read(|s| s.error.clone())
    }

    pub fn clear_error(&self) {
        self.store.update(|s| s.error = None);
    }

    pub fn reset(&self) {
        self.store.replace(GroupState::default());
    }

    /// Seed from persisted state without touching the server
    pub fn restore(&self, groups: Vec<Group>, selected: Option<GroupId>) {
        self.store.update(|s| {
            s.groups = groups;
            s.selected = selected;
        });
    }

    pub async fn fetch_groups(&self, cancel: &CancellationToken) -> ClientResult<()> {
        self.store.update(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = self.api.list_groups(cancel).await;
        self.settle(result, "Failed to fetch groups", |s, groups| {
            tracing::debug!(count = groups.len(), "Groups loaded");
            s.groups = groups;
        })
    }

    pub async fn create_group(
        &self,
        request: &CreateGroupRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<Group> {
        if let Err(e) = validate_create(request) {
            self.store.update(|s| s.error = Some(e.to_string()));
            return Err(e);
        }

        self.store.update(|s| {
            s.loading = true;
            s.error = None;
        });
        let result = self.api.create_group(request, cancel).await;
        self.settle(result, "Failed to create group", |s, group: Group| {
            tracing::info!(group_id = group.id, name = %group.name, "Group created");
            s.groups.push(group.clone());
            group
        })
    }

    /// Join, then reload the list so membership counts are current
    pub async fn join_group(&self, id: GroupId, cancel: &CancellationToken) -> ClientResult<()> {
        let result = self.api.join_group(id, cancel).await;
        self.settle(result, "Failed to join group", |_, ()| ())?;
        self.fetch_groups(cancel).await
    }

    pub async fn leave_group(&self, id: GroupId, cancel: &CancellationToken) -> ClientResult<()> {
        let result = self.api.leave_group(id, cancel).await;
        self.settle(result, "Failed to leave group", |s, ()| {
            s.groups.retain(|g| g.id != id);
            if s.selected == Some(id) {
                s.selected = None;
            }
        })
    }

    pub async fn update_group(
        &self,
        id: GroupId,
        request: &UpdateGroupRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<Group> {
        let result = self.api.update_group(id, request, cancel).await;
        self.settle(result, "Failed to update group", |s, group: Group| {
            if let Some(existing) = s.groups.iter_mut().find(|g| g.id == group.id) {
                *existing = group.clone();
            }
            group
        })
    }

    pub async fn delete_group(&self, id: GroupId, cancel: &CancellationToken) -> ClientResult<()> {
        let result = self.api.delete_group(id, cancel).await;
        self.settle(result, "Failed to delete group", |s, ()| {
            s.groups.retain(|g| g.id != id);
            if s.selected == Some(id) {
                s.selected = None;
            }
        })
    }

    pub async fn invite_user(
        &self,
        id: GroupId,
        email: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let result = self.api.invite_user(id, email, cancel).await;
        self.settle(result, "Failed to send invitation", |_, ()| {
            tracing::info!(group_id = id, "Invitation sent");
        })
    }

    pub async fn fetch_members(
        &self,
        id: GroupId,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<GroupMember>> {
        let result = self.api.list_members(id, cancel).await;
        self.settle(result, "Failed to fetch members", |_, members| members)
    }

    pub async fn update_member_role(
        &self,
        id: GroupId,
        user_id: UserId,
        role: MemberRole,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let result = self.api.update_member_role(id, user_id, role, cancel).await;
        self.settle(result, "Failed to update member role", |_, ()| ())
    }

    pub async fn remove_member(
        &self,
        id: GroupId,
        user_id: UserId,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let result = self.api.remove_member(id, user_id, cancel).await;
        self.settle(result, "Failed to remove member", |s, ()| {
            if let Some(group) = s.groups.iter_mut().find(|g| g.id == id) {
                group.member_count = group.member_count.saturating_sub(1);
            }
        })
    }

    /// Change the selection and move the realtime subscription with it.
    ///
    /// A disconnected channel is not an error here; the room is joined
    /// again once the connection is confirmed.
    pub fn select_group(&self, id: Option<GroupId>, channel: Option<&RealtimeChannel>) {
        let previous = self.store.update(|s| std::mem::replace(&mut s.selected, id));
        if previous == id {
            return;
        }

        let Some(channel) = channel else {
            return;
        };
        if let Some(old) = previous {
            let _ = channel.leave_group(old);
        }
        if let Some(new) = id {
            let _ = channel.join_group(new);
        }
    }

    /// Apply a successful result under the write lock, or record the error
    fn settle<T, R>(
        &self,
        result: ClientResult<T>,
        fallback: &str,
        apply: impl FnOnce(&mut GroupState, T) -> R,
    ) -> ClientResult<R> {
        match result {
            Ok(value) => Ok(self.store.update(|s| {
                s.loading = false;
                apply(s, value)
            })),
            Err(e) => {
                let message = (!e.is_cancelled()).then(|| e.user_message(fallback));
                self.store.update(|s| {
                    s.loading = false;
                    if message.is_some() {
                        s.error = message;
                    }
                });
                Err(e)
            }
        }
    }
}
