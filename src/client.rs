//! Client Facade
//!
//! Wires the API client, the stores, persistence and the realtime channel
//! into one session lifecycle. Front ends construct a [`GroupChatClient`]
//! with their own storage, navigation and realtime driver.

use chrono::Utc;
use std::sync::{Arc, RwLock, Weak};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, CreateGroupRequest, RegisterRequest};
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    Group, GroupId, Notification, NotificationCounts, NotificationId, User, UserId,
};
use crate::realtime::{kind, InboundEvent, RealtimeChannel, RealtimeConnector, ReconnectPolicy};
use crate::store::notifications::DEFAULT_LIMIT;
use crate::store::persist::{self, ChatSnapshot};
use crate::store::{ChatStore, GroupStore, KeyValueStorage, NotificationStore, SessionStore};

/// Frame types the facade routes into the stores
const SUBSCRIBED_KINDS: [&str; 9] = [
    kind::MESSAGE,
    kind::NEW_MESSAGE,
    kind::TYPING,
    kind::USER_TYPING,
    kind::USER_STOPPED_TYPING,
    kind::USER_JOINED,
    kind::USER_LEFT,
    kind::CONNECTION_CONFIRMED,
    kind::ERROR,
];

/// Where a forced logout sends the user
pub trait Navigator: Send + Sync {
    fn go_to_login(&self);
}

/// For front ends without routes
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn go_to_login(&self) {}
}

pub struct GroupChatClient {
    config: Config,
    api: ApiClient,
    session: SessionStore,
    groups: GroupStore,
    chat: ChatStore,
    notifications: NotificationStore,
    storage: Arc<dyn KeyValueStorage>,
    navigator: Arc<dyn Navigator>,
    connector: Arc<dyn RealtimeConnector>,
    realtime: RwLock<Option<Arc<RealtimeChannel>>>,
}

impl GroupChatClient {
    pub fn new(
        config: Config,
        storage: Arc<dyn KeyValueStorage>,
        navigator: Arc<dyn Navigator>,
        connector: Arc<dyn RealtimeConnector>,
    ) -> ClientResult<Arc<Self>> {
        let api = ApiClient::new(&config.api)?;

        let client = Arc::new(Self {
            session: SessionStore::new(api.clone()),
            groups: GroupStore::new(api.clone()),
            chat: ChatStore::new(api.clone()),
            notifications: NotificationStore::new(api.clone()),
            api,
            config,
            storage,
            navigator,
            connector,
            realtime: RwLock::new(None),
        });

        let weak = Arc::downgrade(&client);
        client.api.set_unauthorized_hook(Arc::new(move || {
            if let Some(client) = weak.upgrade() {
                client.force_logout();
            }
        }));

        Ok(client)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn groups(&self) -> &GroupStore {
        &self.groups
    }

    pub fn chat(&self) -> &ChatStore {
        &self.chat
    }

    pub fn notifications(&self) -> &NotificationStore {
        &self.notifications
    }

    pub fn storage(&self) -> &dyn KeyValueStorage {
        self.storage.as_ref()
    }

    pub fn realtime(&self) -> Option<Arc<RealtimeChannel>> {
        self.realtime
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.session.user().map(|u| u.id)
    }

    /// Load persisted state. Resumes the session when one was saved.
    pub fn restore(self: &Arc<Self>) -> bool {
        let storage = self.storage.as_ref();

        if let Some(chat) = persist::load_chat(storage) {
            self.groups.restore(chat.groups, chat.current_group_id);
        }
        if let Some(counts) = persist::load_counts(storage) {
            self.notifications.restore(counts);
        }

        match persist::load_session(storage) {
            Some(session) if session.is_authenticated => {
                tracing::info!("Restoring saved session");
                self.session.restore(session);
                self.start_realtime();
                true
            }
            _ => false,
        }
    }

    pub async fn login(
        self: &Arc<Self>,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<User> {
        let user = self.session.login(email, password, cancel).await?;
        self.session_started();
        Ok(user)
    }

    pub async fn login_with_google(
        self: &Arc<Self>,
        id_token: Option<&str>,
        cancel: &CancellationToken,
    ) -> ClientResult<User> {
        let user = self.session.login_with_google(id_token, cancel).await?;
        self.session_started();
        Ok(user)
    }

    pub async fn register(
        self: &Arc<Self>,
        request: &RegisterRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<User> {
        let user = self.session.register(request, cancel).await?;
        self.session_started();
        Ok(user)
    }

    /// End the session locally: realtime closed, stores and storage cleared
    pub fn logout(&self) {
        self.stop_realtime();
        self.session.logout();
        self.groups.reset();
        self.chat.reset();
        self.notifications.reset();

        if let Err(e) = persist::clear_all(self.storage.as_ref()) {
            tracing::warn!(error = %e, "Failed to clear persisted state on logout");
        }
        tracing::info!("Logged out");
    }

    /// Logout triggered by a rejected credential
    pub fn force_logout(&self) {
        tracing::warn!("Session expired, returning to login");
        self.logout();
        self.navigator.go_to_login();
    }

    pub async fn refresh_user(&self, cancel: &CancellationToken) -> ClientResult<()> {
        match self.session.refresh_user(cancel).await {
            Ok(()) => {
                self.persist_session();
                Ok(())
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                self.logout();
                Err(e)
            }
        }
    }

    pub async fn refresh_credits(&self, cancel: &CancellationToken) -> ClientResult<f64> {
        let credits = self.session.refresh_credits(cancel).await?;
        self.persist_session();
        Ok(credits)
    }

    /// Open the realtime channel for the current token. Returns false
    /// when there is no token to authenticate with.
    pub fn start_realtime(self: &Arc<Self>) -> bool {
        let Some(token) = self.session.token() else {
            tracing::debug!("No session token, realtime not started");
            return false;
        };
        self.stop_realtime();

        let channel = Arc::new(RealtimeChannel::new(
            &self.config.realtime.ws_url,
            &token,
            ReconnectPolicy::from_config(&self.config.realtime),
        ));

        for frame_kind in SUBSCRIBED_KINDS {
            let weak: Weak<Self> = Arc::downgrade(self);
            channel.on_fn(frame_kind, move |frame| match weak.upgrade() {
                Some(client) => client.apply_event(frame.event()?),
                None => Ok(()),
            });
        }

        *self.realtime.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&channel));
        self.connector.start(channel);
        true
    }

    pub fn stop_realtime(&self) {
        let channel = self
            .realtime
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(channel) = channel {
            channel.dispose();
        }
    }

    fn apply_event(&self, event: InboundEvent) -> anyhow::Result<()> {
        match event {
            InboundEvent::Message(message) => {
                self.chat.add_message(message);
            }
            InboundEvent::Typing {
                group_id,
                user_id,
                is_typing,
            } => {
                if self.current_user_id() != Some(user_id) {
                    self.chat.set_typing(group_id, user_id, is_typing, Utc::now());
                }
            }
            InboundEvent::UserJoined { group_id, .. } | InboundEvent::UserLeft { group_id, .. } => {
                if self.groups.selected() == Some(group_id) {
                    self.chat.mark_members_stale(group_id);
                }
            }
            InboundEvent::ConnectionConfirmed { .. } => {
                // Rooms do not survive a reconnect
                if let (Some(group_id), Some(channel)) = (self.groups.selected(), self.realtime()) {
                    channel.join_group(group_id)?;
                }
            }
            InboundEvent::Error(message) => {
                tracing::warn!(%message, "Realtime server reported an error");
            }
            InboundEvent::Other => {}
        }
        Ok(())
    }

    pub fn select_group(&self, id: Option<GroupId>) {
        let channel = self.realtime();
        self.groups.select_group(id, channel.as_deref());
        self.persist_chat();
    }

    pub fn send_typing(&self, group_id: GroupId, is_typing: bool) -> ClientResult<()> {
        self.realtime()
            .ok_or(ClientError::NotConnected)?
            .send_typing(group_id, is_typing)
    }

    pub async fn fetch_groups(&self, cancel: &CancellationToken) -> ClientResult<()> {
        self.groups.fetch_groups(cancel).await?;
        self.persist_chat();
        Ok(())
    }

    pub async fn create_group(
        &self,
        request: &CreateGroupRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<Group> {
        let group = self.groups.create_group(request, cancel).await?;
        self.persist_chat();
        Ok(group)
    }

    pub async fn join_group(&self, id: GroupId, cancel: &CancellationToken) -> ClientResult<()> {
        self.groups.join_group(id, cancel).await?;
        self.persist_chat();
        Ok(())
    }

    pub async fn leave_group(&self, id: GroupId, cancel: &CancellationToken) -> ClientResult<()> {
        let was_selected = self.groups.selected() == Some(id);
        self.groups.leave_group(id, cancel).await?;
        if was_selected {
            if let Some(channel) = self.realtime() {
                let _ = channel.leave_group(id);
            }
        }
        self.chat.clear_group(id);
        self.persist_chat();
        Ok(())
    }

    pub async fn delete_group(&self, id: GroupId, cancel: &CancellationToken) -> ClientResult<()> {
        self.groups.delete_group(id, cancel).await?;
        self.chat.clear_group(id);
        self.persist_chat();
        Ok(())
    }

    pub async fn fetch_notifications(&self, cancel: &CancellationToken) -> ClientResult<()> {
        self.notifications
            .fetch_notifications(DEFAULT_LIMIT, 0, false, cancel)
            .await?;
        self.persist_counts(self.notifications.counts());
        Ok(())
    }

    pub async fn refresh_notification_count(
        &self,
        cancel: &CancellationToken,
    ) -> ClientResult<NotificationCounts> {
        let counts = self.notifications.refresh_count(cancel).await?;
        self.persist_counts(counts);
        Ok(counts)
    }

    pub async fn mark_notification_read(
        &self,
        id: NotificationId,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        self.notifications.mark_as_read(id, cancel).await?;
        self.persist_counts(self.notifications.counts());
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self, cancel: &CancellationToken) -> ClientResult<()> {
        self.notifications.mark_all_as_read(cancel).await?;
        self.persist_counts(self.notifications.counts());
        Ok(())
    }

    /// Accept an invitation and pull the group list that now includes it
    pub async fn accept_invitation(
        &self,
        notification: &Notification,
        cancel: &CancellationToken,
    ) -> ClientResult<String> {
        let group_name = self.notifications.accept_invitation(notification, cancel).await?;
        self.persist_counts(self.notifications.counts());
        if let Err(e) = self.fetch_groups(cancel).await {
            tracing::warn!(error = %e, group = %group_name, "Group list refresh after accepting failed");
        }
        Ok(group_name)
    }

    pub async fn decline_invitation(
        &self,
        notification: &Notification,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        self.notifications
            .decline_invitation(notification, cancel)
            .await?;
        self.persist_counts(self.notifications.counts());
        Ok(())
    }

    fn session_started(self: &Arc<Self>) {
        self.persist_session();
        self.start_realtime();
    }

    fn persist_session(&self) {
        if let Err(e) = persist::save_session(self.storage.as_ref(), &self.session.session()) {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }

    fn persist_chat(&self) {
        let snapshot = self.groups.store().read(|s| ChatSnapshot {
            groups: s.groups.clone(),
            current_group_id: s.selected,
        });
        if let Err(e) = persist::save_chat(self.storage.as_ref(), &snapshot) {
            tracing::warn!(error = %e, "Failed to persist groups");
        }
    }

    fn persist_counts(&self, counts: NotificationCounts) {
        if let Err(e) = persist::save_counts(self.storage.as_ref(), counts) {
            tracing::warn!(error = %e, "Failed to persist notification counts");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::{ConnectionStatus, Outgoing};
    use crate::store::persist::AUTH_KEY;
    use crate::store::{MemoryStorage, Session};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Opens every channel it is given and keeps the outbound queue
    #[derive(Default)]
    struct LoopbackConnector {
        opened: Mutex<Vec<(Arc<RealtimeChannel>, tokio::sync::mpsc::UnboundedReceiver<Outgoing>)>>,
    }

    impl RealtimeConnector for LoopbackConnector {
        fn start(&self, channel: Arc<RealtimeChannel>) {
            let rx = channel.opened();
            self.opened.lock().unwrap().push((channel, rx));
        }
    }

    #[derive(Default)]
    struct CountingNavigator(AtomicUsize);

    impl Navigator for CountingNavigator {
        fn go_to_login(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn user(id: UserId) -> User {
        serde_json::from_value(serde_json::json!({
            "id": id, "email": "u@example.com", "username": "u",
            "credits": 3.0, "created_at": "2024-03-01T10:00:00Z"
        }))
        .unwrap()
    }

    fn client_with(
        storage: Arc<MemoryStorage>,
        connector: Arc<LoopbackConnector>,
        navigator: Arc<CountingNavigator>,
    ) -> Arc<GroupChatClient> {
        GroupChatClient::new(Config::default(), storage, navigator, connector).unwrap()
    }

    #[test]
    fn test_restore_resumes_session_and_realtime() {
        let storage = Arc::new(MemoryStorage::new());
        persist::save_session(storage.as_ref(), &Session::authenticated(user(1), "tok".into())).unwrap();
        let connector = Arc::new(LoopbackConnector::default());
        let client = client_with(storage, Arc::clone(&connector), Arc::default());

        assert!(client.restore());
        assert!(client.is_authenticated());
        assert_eq!(client.api().token().as_deref(), Some("tok"));
        assert_eq!(connector.opened.lock().unwrap().len(), 1);
        assert!(client.realtime().unwrap().url().ends_with("/ws?token=tok"));
    }

    #[test]
    fn test_force_logout_clears_everything() {
        let storage = Arc::new(MemoryStorage::new());
        persist::save_session(storage.as_ref(), &Session::authenticated(user(1), "tok".into())).unwrap();
        let navigator = Arc::new(CountingNavigator::default());
        let client = client_with(
            Arc::clone(&storage),
            Arc::new(LoopbackConnector::default()),
            Arc::clone(&navigator),
        );
        client.restore();
        let channel = client.realtime().unwrap();

        client.force_logout();

        assert!(!client.is_authenticated());
        assert!(client.api().token().is_none());
        assert!(client.realtime().is_none());
        assert_eq!(channel.status().snapshot(), ConnectionStatus::Closed);
        assert!(storage.get(AUTH_KEY).unwrap().is_none());
        assert_eq!(navigator.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_realtime_frames_reach_stores() {
        let storage = Arc::new(MemoryStorage::new());
        persist::save_session(storage.as_ref(), &Session::authenticated(user(1), "tok".into())).unwrap();
        let client = client_with(storage, Arc::new(LoopbackConnector::default()), Arc::default());
        client.restore();
        client.groups().restore(vec![], Some(7));
        let channel = client.realtime().unwrap();

        channel.handle_text(
            r#"{"type": "new_message", "message": {"id": 5, "content": "hey", "user_id": 2,
                "group_id": 7, "created_at": "2024-03-01T10:00:00"}}"#,
        );
        channel.handle_text(r#"{"type": "typing", "group_id": 7, "user_id": 2, "data": {"is_typing": true}}"#);
        channel.handle_text(r#"{"type": "typing", "group_id": 7, "user_id": 2, "data": {"is_typing": true}}"#);
        channel.handle_text(r#"{"type": "typing", "group_id": 7, "user_id": 1, "data": {"is_typing": true}}"#);
        channel.handle_text(r#"{"type": "user_joined", "group_id": 7, "user_id": 3}"#);

        assert_eq!(client.chat().messages(7)[0].content, "hey");
        assert_eq!(client.chat().typing_users(7, Utc::now()), vec![2]);
        assert!(client.chat().members_stale(7));

        channel.handle_text(r#"{"type": "user_stopped_typing", "group_id": 7, "user_id": 2}"#);
        assert!(client.chat().typing_users(7, Utc::now()).is_empty());
    }

    #[test]
    fn test_connection_confirmed_rejoins_selected_group() {
        let storage = Arc::new(MemoryStorage::new());
        persist::save_session(storage.as_ref(), &Session::authenticated(user(1), "tok".into())).unwrap();
        let connector = Arc::new(LoopbackConnector::default());
        let client = client_with(storage, Arc::clone(&connector), Arc::default());
        client.restore();
        client.groups().restore(vec![], Some(9));

        client
            .realtime()
            .unwrap()
            .handle_text(r#"{"type": "connection_confirmed", "user_id": 1}"#);

        let mut opened = connector.opened.lock().unwrap();
        let (_, rx) = &mut opened[0];
        match rx.try_recv().unwrap() {
            Outgoing::Text(text) => {
                assert!(text.contains("join_group") && text.contains(r#""group_id":9"#))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_response_forces_logout() {
        let backend = crate::api::mock::MockBackend::start().await;
        let storage = Arc::new(MemoryStorage::new());
        persist::save_session(storage.as_ref(), &Session::authenticated(user(1), "stale".into())).unwrap();
        let navigator = Arc::new(CountingNavigator::default());
        let client = GroupChatClient::new(
            backend.config(),
            Arc::clone(&storage) as Arc<dyn KeyValueStorage>,
            Arc::clone(&navigator) as Arc<dyn Navigator>,
            Arc::new(crate::realtime::OfflineConnector),
        )
        .unwrap();
        client.restore();

        let err = client.fetch_groups(&CancellationToken::new()).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert!(!client.is_authenticated());
        assert!(storage.get(AUTH_KEY).unwrap().is_none());
        assert_eq!(navigator.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bad_login_does_not_force_logout() {
        let backend = crate::api::mock::MockBackend::start().await;
        let navigator = Arc::new(CountingNavigator::default());
        let client = GroupChatClient::new(
            backend.config(),
            Arc::new(MemoryStorage::new()),
            Arc::clone(&navigator) as Arc<dyn Navigator>,
            Arc::new(crate::realtime::OfflineConnector),
        )
        .unwrap();

        assert!(client.login("ada@example.com", "nope", &CancellationToken::new()).await.is_err());
        assert_eq!(navigator.0.load(Ordering::SeqCst), 0);
        assert_eq!(
            client.session().error().as_deref(),
            Some("Incorrect email or password")
        );
    }

    #[tokio::test]
    async fn test_login_persists_and_fetches_groups() {
        let backend = crate::api::mock::MockBackend::start().await;
        let storage = Arc::new(MemoryStorage::new());
        let connector = Arc::new(LoopbackConnector::default());
        let client = GroupChatClient::new(
            backend.config(),
            Arc::clone(&storage) as Arc<dyn KeyValueStorage>,
            Arc::new(NoopNavigator),
            Arc::clone(&connector) as Arc<dyn RealtimeConnector>,
        )
        .unwrap();
        let cancel = CancellationToken::new();

        client
            .login("ada@example.com", crate::api::mock::PASSWORD, &cancel)
            .await
            .unwrap();
        client.fetch_groups(&cancel).await.unwrap();
        client.select_group(Some(7));

        let saved = persist::load_session(storage.as_ref()).unwrap();
        assert_eq!(saved.token.as_deref(), Some(crate::api::mock::GOOD_TOKEN));
        let chat = persist::load_chat(storage.as_ref()).unwrap();
        assert_eq!(chat.groups.len(), 1);
        assert_eq!(chat.current_group_id, Some(7));
        assert_eq!(connector.opened.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_accept_invitation_refetches_groups_despite_read_failure() {
        let backend = crate::api::mock::MockBackend::start().await;
        let client = GroupChatClient::new(
            backend.config(),
            Arc::new(MemoryStorage::new()),
            Arc::new(NoopNavigator),
            Arc::new(crate::realtime::OfflineConnector),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        client
            .login("ada@example.com", crate::api::mock::PASSWORD, &cancel)
            .await
            .unwrap();
        client.fetch_notifications(&cancel).await.unwrap();
        assert!(client.groups().groups().is_empty());

        backend.state.fail_mark_read.store(true, Ordering::SeqCst);
        let invitation = client.notifications().notifications()[0].clone();
        let group_name = client.accept_invitation(&invitation, &cancel).await.unwrap();

        assert_eq!(group_name, "Book Club");
        assert_eq!(client.groups().groups().len(), 1);
        assert_eq!(client.notifications().unread_count(), 0);
    }

    #[test]
    fn test_start_realtime_needs_token() {
        let client = client_with(
            Arc::new(MemoryStorage::new()),
            Arc::new(LoopbackConnector::default()),
            Arc::default(),
        );
        assert!(!client.start_realtime());
        assert!(matches!(client.send_typing(1, true), Err(ClientError::NotConnected)));
    }
}
