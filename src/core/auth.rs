use crate::core::{AuthProvider, AuthUser};
use crate::utils::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};

/// Change in signed-in state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AuthUser),
    SignedOut,
}

impl From<Option<AuthUser>> for AuthEvent {
    fn from(user: Option<AuthUser>) -> Self {
        match user {
            Some(user) => AuthEvent::SignedIn(user),
            None => AuthEvent::SignedOut,
        }
    }
}

/// Receiving half of a subscription. Yields the state at subscribe time,
/// then each change in order, and ends once the subscription is cancelled.
pub struct AuthEvents {
    rx: mpsc::UnboundedReceiver<AuthEvent>,
}

impl AuthEvents {
    pub async fn next(&mut self) -> Option<AuthEvent> {
        self.rx.recv().await
    }
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    senders: HashMap<u64, mpsc::UnboundedSender<AuthEvent>>,
}

type SharedSubscribers = Arc<Mutex<Subscribers>>;

fn lock(subscribers: &SharedSubscribers) -> MutexGuard<'_, Subscribers> {
    subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cancellation token for a subscription. Dropping it also cancels.
pub struct Unsubscribe {
    subscribers: SharedSubscribers,
    id: u64,
}

impl Unsubscribe {
    pub fn unsubscribe(self) {}
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        lock(&self.subscribers).senders.remove(&self.id);
    }
}

/// Signed-in state on top of an [`AuthProvider`].
pub struct AuthSession<P: AuthProvider> {
    provider: P,
    state: watch::Sender<Option<AuthUser>>,
    subscribers: SharedSubscribers,
}

impl<P: AuthProvider> AuthSession<P> {
    pub fn new(provider: P) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            provider,
            state,
            subscribers: SharedSubscribers::default(),
        }
    }

    /// On failure the previous state is kept and the error carries a
    /// message fit to show next to the sign-in form.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        match self.provider.sign_in_with_password(email, password).await {
            Ok(user) => {
                tracing::info!("Signed in as {}", user.email);
                self.publish(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                tracing::warn!("Sign-in failed for {}: {}", email, e);
                Err(e)
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        let user = self.provider.sign_up(email, password).await?;
        tracing::info!("Created account {} ({})", user.email, user.uid);
        self.publish(Some(user.clone()));
        Ok(user)
    }

    pub fn sign_out(&self) {
        if let Some(user) = self.current_user() {
            tracing::info!("Signed out {}", user.email);
            self.publish(None);
        }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    pub fn id_token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|user| user.id_token.clone())
    }

    /// Watch handle on the signed-in user, for adapters that attach tokens.
    pub fn user_watch(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }

    // State update and fan-out happen under one lock so a subscriber never
    // misses or reorders a change relative to its initial event.
    fn publish(&self, user: Option<AuthUser>) {
        let mut subscribers = lock(&self.subscribers);
        self.state.send_replace(user.clone());
        let event = AuthEvent::from(user);
        subscribers
            .senders
            .retain(|_, tx| tx.send(event.clone()).is_ok());
    }

    /// Starts a subscription to sign-in state changes. Keep the
    /// [`Unsubscribe`] token alive for as long as events are wanted and
    /// invoke it on teardown.
    pub fn subscribe(&self) -> (AuthEvents, Unsubscribe) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = lock(&self.subscribers);

        let _ = tx.send(AuthEvent::from(self.state.borrow().clone()));
        subscribers.next_id += 1;
        let id = subscribers.next_id;
        subscribers.senders.insert(id, tx);
        drop(subscribers);

        (
            AuthEvents { rx },
            Unsubscribe {
                subscribers: Arc::clone(&self.subscribers),
                id,
            },
        )
    }

    pub fn active_subscriptions(&self) -> usize {
        lock(&self.subscribers).senders.len()
    }
}
