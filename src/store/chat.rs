//! Chat Store
//!
//! Per-group message history, member lists and the typing projection.
//! History only grows by appending (send, realtime) or by merging an older
//! page; edits and deletes go straight to the server.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::Store;
use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::models::{GroupId, GroupMember, Message, MessageId, UserId};

/// Messages requested per page
pub const MESSAGE_PAGE_SIZE: u32 = 20;

/// A typing entry with no refresh for this long is dropped
pub const TYPING_QUIET_PERIOD: Duration = Duration::from_secs(5);

/// How often a composer re-announces "typing" while keystrokes continue
pub const TYPING_REFRESH_INTERVAL: Duration = Duration::from_secs(2);

/// Pagination position of one group's history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Last page fetched, 1-based
    pub page: u32,
    pub has_more: bool,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            page: 0,
            has_more: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingEntry {
    pub user_id: UserId,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub messages: HashMap<GroupId, Vec<Message>>,
    pub cursors: HashMap<GroupId, PageCursor>,
    pub members: HashMap<GroupId, Vec<GroupMember>>,
    /// Groups whose member list changed since the last fetch
    pub stale_members: HashSet<GroupId>,
    pub typing: HashMap<GroupId, Vec<TypingEntry>>,
    pub loading_messages: bool,
    pub sending: bool,
    pub error: Option<String>,
}

/// Combine a fetched page with the cached history: dedupe by id, oldest first
pub fn merge_messages(existing: &[Message], incoming: Vec<Message>) -> Vec<Message> {
    let mut seen: HashSet<MessageId> = existing.iter().map(|m| m.id).collect();
    let mut merged = existing.to_vec();
    for message in incoming {
        if seen.insert(message.id) {
            merged.push(message);
        }
    }
    merged.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    merged
}

/// The server flag when it sends one, else "the page came back full"
pub fn page_has_more(server_flag: Option<bool>, received: usize) -> bool {
    server_flag.unwrap_or(received == MESSAGE_PAGE_SIZE as usize)
}

fn is_fresh(entry: &TypingEntry, now: DateTime<Utc>) -> bool {
    // A timestamp ahead of `now` fails `to_std`; keep those
    (now - entry.since)
        .to_std()
        .map_or(true, |age| age < TYPING_QUIET_PERIOD)
}

/// Outbound side of the typing indicator: decides when a keystroke should
/// (re)send "typing start" so remote entries never outlive their quiet period.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypingAnnouncer {
    last_sent: Option<DateTime<Utc>>,
}

impl TypingAnnouncer {
    /// True when this keystroke should send "typing start"
    pub fn on_keystroke(&mut self, now: DateTime<Utc>) -> bool {
        let due = match self.last_sent {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .map_or(false, |elapsed| elapsed >= TYPING_REFRESH_INTERVAL),
        };
        if due {
            self.last_sent = Some(now);
        }
        due
    }

    /// True when a "typing start" is outstanding and a stop should be sent
    pub fn stop(&mut self) -> bool {
        self.last_sent.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.last_sent.is_some()
    }
}

pub struct ChatStore {
    api: ApiClient,
    store: Store<ChatState>,
}

impl ChatStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            store: Store::default(),
        }
    }

    pub fn store(&self) -> &Store<ChatState> {
        &self.store
    }

    pub fn messages(&self, group_id: GroupId) -> Vec<Message> {
        self.store
            .read(|s| s.messages.get(&group_id).cloned().unwrap_or_default())
    }

    pub fn cursor(&self, group_id: GroupId) -> PageCursor {
        self.store
            .read(|s| s.cursors.get(&group_id).copied().unwrap_or_default())
    }

    pub fn has_more(&self, group_id: GroupId) -> bool {
        self.cursor(group_id).has_more
    }

    pub fn members(&self, group_id: GroupId) -> Vec<GroupMember> {
        self.store
            .read(|s| s.members.get(&group_id).cloned().unwrap_or_default())
    }

    pub fn members_stale(&self, group_id: GroupId) -> bool {
        self.store.read(|s| s.stale_members.contains(&group_id))
    }

    pub fn is_loading(&self) -> bool {
        self.store.read(|s| s.loading_messages)
    }

    pub fn error(&self) -> Option<String> {
        self.store.read(|s| s.error.clone())
    }

    pub fn clear_error(&self) {
        self.store.update(|s| s.error = None);
    }

    pub fn reset(&self) {
        self.store.replace(ChatState::default());
    }

    /// Forget one group's history, e.g. after leaving it
    pub fn clear_group(&self, group_id: GroupId) {
        self.store.update(|s| {
            s.messages.remove(&group_id);
            s.cursors.remove(&group_id);
            s.members.remove(&group_id);
            s.stale_members.remove(&group_id);
            s.typing.remove(&group_id);
        });
    }

    /// Fetch one page. Page 1 replaces the history, later pages merge in.
    pub async fn fetch_messages(
        &self,
        group_id: GroupId,
        page: u32,
        cancel: &CancellationToken,
    ) -> ClientResult<usize> {
        let page = page.max(1);
        self.store.update(|s| {
            s.loading_messages = true;
            s.error = None;
        });

        let result = self
            .api
            .list_messages(group_id, page, MESSAGE_PAGE_SIZE, cancel)
            .await;

        match result {
            Ok(body) => {
                let (incoming, server_flag) = body.into_parts();
                let received = incoming.len();
                let has_more = page_has_more(server_flag, received);

                self.store.update(|s| {
                    let history = if page == 1 {
                        merge_messages(&[], incoming)
                    } else {
                        let existing = s.messages.get(&group_id).map_or(&[][..], Vec::as_slice);
                        merge_messages(existing, incoming)
                    };
                    s.messages.insert(group_id, history);
                    s.cursors.insert(group_id, PageCursor { page, has_more });
                    s.loading_messages = false;
                });
                tracing::debug!(group_id, page, received, has_more, "Messages loaded");
                Ok(received)
            }
            Err(e) => {
                self.fail(&e, "Failed to fetch messages");
                Err(e)
            }
        }
    }

    /// Fetch the page after the last one loaded. Returns 0 once exhausted.
    pub async fn load_more(&self, group_id: GroupId, cancel: &CancellationToken) -> ClientResult<usize> {
        let cursor = self.cursor(group_id);
        if !cursor.has_more {
            return Ok(0);
        }
        self.fetch_messages(group_id, cursor.page + 1, cancel).await
    }

    pub async fn send_message(
        &self,
        group_id: GroupId,
        content: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ClientError::Validation("Message cannot be empty".into()));
        }

        self.store.update(|s| {
            s.sending = true;
            s.error = None;
        });
        match self.api.send_message(group_id, content, cancel).await {
            Ok(message) => {
                self.store.update(|s| s.sending = false);
                self.add_message(message.clone());
                Ok(message)
            }
            Err(e) => {
                self.fail(&e, "Failed to send message");
                Err(e)
            }
        }
    }

    /// Append a message unless its id is already cached. Returns whether it was added.
    pub fn add_message(&self, message: Message) -> bool {
        self.store.update(|s| {
            let history = s.messages.entry(message.group_id).or_default();
            if history.iter().any(|m| m.id == message.id) {
                return false;
            }
            // A message from someone who was typing ends their indicator
            if let Some(typing) = s.typing.get_mut(&message.group_id) {
                typing.retain(|t| t.user_id != message.user_id);
            }
            history.push(message);
            true
        })
    }

    pub fn set_typing(&self, group_id: GroupId, user_id: UserId, is_typing: bool, now: DateTime<Utc>) {
        self.store.update(|s| {
            let entries = s.typing.entry(group_id).or_default();
            match (is_typing, entries.iter_mut().find(|t| t.user_id == user_id)) {
                (true, Some(existing)) => existing.since = now,
                (true, None) => entries.push(TypingEntry { user_id, since: now }),
                (false, _) => entries.retain(|t| t.user_id != user_id),
            }
            if entries.is_empty() {
                s.typing.remove(&group_id);
            }
        });
    }

    /// Users typing in a group, in the order they started
    pub fn typing_users(&self, group_id: GroupId, now: DateTime<Utc>) -> Vec<UserId> {
        self.store.read(|s| {
            s.typing
                .get(&group_id)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|t| is_fresh(t, now))
                        .map(|t| t.user_id)
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    /// Drop expired typing entries; notifies only when something changed
    pub fn prune_typing(&self, now: DateTime<Utc>) -> usize {
        let expired = self.store.read(|s| {
            s.typing
                .values()
                .flatten()
                .filter(|t| !is_fresh(t, now))
                .count()
        });
        if expired > 0 {
            self.store.update(|s| {
                for entries in s.typing.values_mut() {
                    entries.retain(|t| is_fresh(t, now));
                }
                s.typing.retain(|_, entries| !entries.is_empty());
            });
        }
        expired
    }

    pub async fn fetch_members(
        &self,
        group_id: GroupId,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<GroupMember>> {
        match self.api.list_members(group_id, cancel).await {
            Ok(members) => {
                self.store.update(|s| {
                    s.members.insert(group_id, members.clone());
                    s.stale_members.remove(&group_id);
                });
                Ok(members)
            }
            Err(e) => {
                self.fail(&e, "Failed to fetch members");
                Err(e)
            }
        }
    }

    pub fn mark_members_stale(&self, group_id: GroupId) {
        self.store.update(|s| {
            s.stale_members.insert(group_id);
        });
    }

    /// Server-side edit; the cached history keeps the original text
    pub async fn edit_message(
        &self,
        id: MessageId,
        content: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<Message> {
        self.api.edit_message(id, content, cancel).await
    }

    /// Server-side delete; the cached history is left alone
    pub async fn delete_message(&self, id: MessageId, cancel: &CancellationToken) -> ClientResult<()> {
        self.api.delete_message(id, cancel).await
    }

    fn fail(&self, e: &ClientError, fallback: &str) {
        let message = (!e.is_cancelled()).then(|| e.user_message(fallback));
        self.store.update(|s| {
            s.loading_messages = false;
            s.sending = false;
            if message.is_some() {
                s.error = message;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message(id: MessageId, group_id: GroupId, minute: u32) -> Message {
        Message {
            id,
            content: format!("m{}", id),
            user_id: 1,
            group_id,
            is_ai_message: false,
            ai_model_used: None,
            credits_used: None,
            message_type: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap(),
            edited_at: None,
            sender: None,
        }
    }

    fn store() -> ChatStore {
        ChatStore::new(ApiClient::new(&crate::config::ApiConfig::default()).unwrap())
    }

    #[test]
    fn test_merge_dedupes_and_sorts() {
        let existing = vec![message(3, 1, 30), message(4, 1, 40)];
        let older = vec![message(1, 1, 10), message(2, 1, 20), message(3, 1, 30)];

        let merged = merge_messages(&existing, older);
        let ids: Vec<_> = merged.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_has_more_heuristic() {
        assert!(page_has_more(None, 20));
        assert!(!page_has_more(None, 19));
        assert!(!page_has_more(Some(false), 20));
        assert!(page_has_more(Some(true), 3));
    }

    #[test]
    fn test_add_message_dedupes() {
        let chat = store();
        assert!(chat.add_message(message(1, 7, 0)));
        assert!(!chat.add_message(message(1, 7, 0)));
        assert!(chat.add_message(message(2, 7, 1)));
        assert_eq!(chat.messages(7).len(), 2);
        assert!(chat.messages(8).is_empty());
    }

    #[test]
    fn test_typing_added_once_and_removed() {
        let chat = store();
        let now = Utc::now();
        chat.set_typing(3, 42, true, now);
        chat.set_typing(3, 42, true, now);
        assert_eq!(chat.typing_users(3, now), vec![42]);

        chat.set_typing(3, 42, false, now);
        assert!(chat.typing_users(3, now).is_empty());
    }

    #[test]
    fn test_typing_expires_after_quiet_period() {
        let chat = store();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        chat.set_typing(3, 1, true, start);
        chat.set_typing(3, 2, true, start + chrono::Duration::seconds(3));

        let later = start + chrono::Duration::seconds(6);
        assert_eq!(chat.typing_users(3, later), vec![2]);
        assert_eq!(chat.prune_typing(later), 1);
        assert_eq!(chat.prune_typing(later), 0);
    }

    #[test]
    fn test_continuous_typing_stays_visible() {
        let chat = store();
        let mut announcer = TypingAnnouncer::default();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        // One keystroke every 500ms for 12s, relayed to the receiving store
        let mut sent = 0;
        for tick in 0..24 {
            let now = start + chrono::Duration::milliseconds(tick * 500);
            if announcer.on_keystroke(now) {
                chat.set_typing(7, 2, true, now);
                sent += 1;
            }
            assert_eq!(chat.typing_users(7, now), vec![2], "tick {}", tick);
        }
        assert!(sent > 1 && sent < 24);
        assert!(announcer.is_active());

        assert!(announcer.stop());
        assert!(!announcer.stop());
        assert!(announcer.on_keystroke(start));
    }

    #[test]
    fn test_refresh_interval_shorter_than_quiet_period() {
        assert!(TYPING_REFRESH_INTERVAL < TYPING_QUIET_PERIOD);
    }

    #[test]
    fn test_incoming_message_clears_typing() {
        let chat = store();
        let now = Utc::now();
        chat.set_typing(7, 1, true, now);
        chat.add_message(message(9, 7, 0));
        assert!(chat.typing_users(7, now).is_empty());
    }

    #[test]
    fn test_members_stale_flag() {
        let chat = store();
        assert!(!chat.members_stale(5));
        chat.mark_members_stale(5);
        assert!(chat.members_stale(5));
        chat.clear_group(5);
        assert!(!chat.members_stale(5));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let chat = store();
        let err = chat
            .send_message(1, "   ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(chat.messages(1).is_empty());
    }
}
