//! Sync engine.
//!
//! Watches the session, owns the realtime channel lifecycle, and is the
//! single place where balance changes become activity log records. Two
//! reconciliation paths converge here: the diff path (every authenticated
//! user snapshot through `TokenLedger::observe`) and the push path
//! (server `token:updated` frames through `TokenLedger::apply_push`).

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{info, warn};

use skillswap_core::{ActivityLog, BalanceUpdate, TokenFlow};
use skillswap_realtime::{ChannelClient, ChannelConfig, ChannelError, ChannelState, ServerEvent};
use skillswap_store::{ActivityLogStore, Signal, UpdateSignal};

use crate::error::{AppError, Result};
use crate::ledger::TokenLedger;
use crate::session::{AuthSession, SessionHandle};

#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

struct Inner {
    store: Mutex<ActivityLogStore>,
    session: SessionHandle,
    ledger: Mutex<TokenLedger>,
    channel: RwLock<Option<ChannelClient>>,
    config: ChannelConfig,
    signal: UpdateSignal,
}

impl SyncEngine {
    pub fn new(store: ActivityLogStore, session: SessionHandle, config: ChannelConfig) -> Self {
        let signal = store.signal().clone();
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(store),
                session,
                ledger: Mutex::new(TokenLedger::new()),
                channel: RwLock::new(None),
                config,
                signal,
            }),
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.inner.session
    }

    pub fn signal(&self) -> &UpdateSignal {
        &self.inner.signal
    }

    pub async fn channel_state(&self) -> ChannelState {
        match self.inner.channel.read().await.as_ref() {
            Some(client) => client.state(),
            None => ChannelState::Disconnected,
        }
    }

    pub fn spawn(&self) -> tokio::task::JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move { engine.run().await })
    }

    /// Drive the engine until the session handle goes away.
    pub async fn run(&self) {
        let mut session_rx = self.inner.session.subscribe();
        let mut events: Option<broadcast::Receiver<ServerEvent>> = None;
        let mut identity: Option<(i64, String)> = None;

        // Reconcile whatever session state existed before the engine started.
        let initial = session_rx.borrow_and_update().clone();
        self.sync_session(&mut identity, &mut events, initial).await;

        loop {
            tokio::select! {
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = session_rx.borrow_and_update().clone();
                    self.sync_session(&mut identity, &mut events, snapshot).await;
                }
                event = next_event(&mut events) => match event {
                    Some(event) => self.handle_event(event).await,
                    None => events = None,
                },
            }
        }
        self.teardown_channel().await;
    }

    /// Request enrollment through the live channel. Settlement of the
    /// resulting balance change arrives separately as a `token:updated`
    /// push, so nothing is recorded here.
    pub async fn enroll_in_course(&self, course_id: i64, tokens_required: i64) -> Result<Value> {
        let client = self.client().await?;
        Ok(client.enroll_in_course(course_id, tokens_required).await?)
    }

    /// Report a completion through the live channel, then record it in the
    /// local activity log and nudge other clients.
    pub async fn complete_course(
        &self,
        course_id: i64,
        time_spent_hours: f64,
        tokens_earned: i64,
    ) -> Result<ActivityLog> {
        let client = self.client().await?;
        client
            .complete_course(course_id, time_spent_hours, tokens_earned)
            .await?;
        let log = {
            let store = self.inner.store.lock().await;
            store.record_course_completion(time_spent_hours, tokens_earned)?
        };
        client
            .emit_activity_update(json!({
                "type": "course_completed",
                "course_id": course_id,
            }))
            .await;
        Ok(log)
    }

    /// Push path: record the carried delta and patch the session user with
    /// the resulting balance. The ledger advances its baseline past the
    /// patch, so the diff path stays silent for this change.
    pub async fn apply_balance_update(&self, update: BalanceUpdate) -> Result<()> {
        let current = self.inner.session.current().tokens();
        let (balance, flow) = self.inner.ledger.lock().await.apply_push(update, current);
        self.record_flow(flow).await?;
        if let Some(tokens) = balance {
            self.inner.session.patch_tokens(tokens);
        }
        self.inner.signal.notify(Signal::Dashboard);
        Ok(())
    }

    async fn sync_session(
        &self,
        identity: &mut Option<(i64, String)>,
        events: &mut Option<broadcast::Receiver<ServerEvent>>,
        snapshot: AuthSession,
    ) {
        let next = snapshot.identity();
        if next != *identity {
            self.teardown_channel().await;
            *events = None;

            let user_changed = match (identity.as_ref(), next.as_ref()) {
                (Some((old, _)), Some((new, _))) => old != new,
                (None, None) => false,
                _ => true,
            };
            if user_changed {
                self.inner.ledger.lock().await.reset();
                info!("session identity changed; ledger baseline reset");
            }

            if let Some((_, token)) = &next {
                let client = ChannelClient::open(self.inner.config.clone(), token.clone());
                *events = Some(client.subscribe_events());
                *self.inner.channel.write().await = Some(client);
            }
            *identity = next;
        }

        // Every authenticated snapshot feeds the diff path.
        if let Some(tokens) = snapshot.tokens() {
            if let Err(err) = self.reconcile_observation(tokens).await {
                warn!("failed to record observed balance change: {err}");
            }
        }
    }

    async fn handle_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::TokenUpdated(update) => {
                if let Err(err) = self.apply_balance_update(update).await {
                    warn!("failed to apply pushed balance update: {err}");
                }
            }
            ServerEvent::ActivityUpdated
            | ServerEvent::DashboardRefresh
            | ServerEvent::DomainChanged { .. } => {
                self.inner.signal.notify(Signal::Dashboard);
            }
        }
    }

    async fn reconcile_observation(&self, tokens: i64) -> Result<()> {
        let flow = self.inner.ledger.lock().await.observe(tokens);
        self.record_flow(flow).await
    }

    async fn record_flow(&self, flow: TokenFlow) -> Result<()> {
        let store = self.inner.store.lock().await;
        match flow {
            TokenFlow::Earned(tokens) => {
                store.record_token_earned(tokens)?;
            }
            TokenFlow::Spent(tokens) => {
                store.record_token_usage(tokens)?;
            }
            TokenFlow::Unchanged => {}
        }
        Ok(())
    }

    async fn client(&self) -> Result<ChannelClient> {
        self.inner
            .channel
            .read()
            .await
            .clone()
            .ok_or(AppError::Channel(ChannelError::NotConnected))
    }

    async fn teardown_channel(&self) {
        if let Some(client) = self.inner.channel.write().await.take() {
            client.shutdown().await;
        }
    }
}

async fn next_event(events: &mut Option<broadcast::Receiver<ServerEvent>>) -> Option<ServerEvent> {
    match events {
        Some(rx) => loop {
            match rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("dropped {skipped} realtime events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        },
        None => std::future::pending().await,
    }
}
