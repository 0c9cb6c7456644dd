//! The pairing state machine.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use strangers_common::UserId;
use tracing::{debug, error, info};

use crate::error::MatchError;
use crate::registry::PairRegistry;
use crate::types::{
    CoordinatorConfig, CoordinatorStats, Effect, OutboundMessage, UserEvent, UserState,
};
use crate::wait_queue::WaitQueue;


// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Queue and registry together.
///
/// Both live under one lock so every transition sees and mutates them as a
/// unit; a user can never be observed half-way between waiting and paired.
#[derive(Debug, Default)]
struct MatchState {
    queue: WaitQueue,
    pairs: PairRegistry,
}

/// Whether `leave` reports an idle user back to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdleNotice {
    Send,
    Suppress,
}

/// What `leave` took apart, so a failed follow-up step can put it back.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Departure {
    Session(UserId),
    Queue(usize),
    Nothing,
}

impl MatchState {
    fn state_of(&self, user: &UserId) -> UserState {
        if let Some(partner) = self.pairs.partner_of(user) {
            UserState::Paired(partner)
        } else if self.queue.contains(user) {
            UserState::Waiting
        } else {
            UserState::Idle
        }
    }

    fn request_match(
        &mut self,
        user: &UserId,
        effects: &mut Vec<Effect>,
    ) -> Result<(), MatchError> {
        match self.state_of(user) {
            UserState::Paired(_) => {
                effects.push(Effect::new(user.clone(), OutboundMessage::AlreadyInSession));
            }
            UserState::Waiting => {
                effects.push(Effect::new(user.clone(), OutboundMessage::AlreadyWaiting));
            }
            UserState::Idle => match self.queue.dequeue_oldest() {
                Ok(waiter) => {
                    if let Err(e) = self.pairs.pair(waiter.clone(), user.clone()) {
                        // Put the waiter back so the failed step leaves no trace.
                        if let Err(restore) = self.queue.requeue_front(waiter) {
                            error!(error = %restore, "Failed to restore waiter after pairing error");
                        }
                        return Err(e);
                    }
                    info!(user = %user, partner = %waiter, "Session started");
                    effects.push(Effect::new(waiter, OutboundMessage::Connected));
                    effects.push(Effect::new(user.clone(), OutboundMessage::Connected));
                }
                Err(MatchError::Empty) => {
                    self.queue.enqueue(user.clone())?;
                    debug!(user = %user, waiting = self.queue.len(), "User queued");
                    effects.push(Effect::new(user.clone(), OutboundMessage::Waiting));
                }
                Err(e) => return Err(e),
            },
        }
        Ok(())
    }

    fn leave(
        &mut self,
        user: &UserId,
        idle_notice: IdleNotice,
        effects: &mut Vec<Effect>,
    ) -> Departure {
        if let Some(partner) = self.pairs.unpair(user) {
            info!(user = %user, partner = %partner, "Session ended");
            effects.push(Effect::new(partner.clone(), OutboundMessage::PartnerLeft));
            effects.push(Effect::new(user.clone(), OutboundMessage::LeftSession));
            return Departure::Session(partner);
        }
        if let Some(index) = self.queue.position(user) {
            self.queue.remove(user);
            debug!(user = %user, "User left the queue");
            effects.push(Effect::new(user.clone(), OutboundMessage::LeftQueue));
            return Departure::Queue(index);
        }
        if idle_notice == IdleNotice::Send {
            effects.push(Effect::new(user.clone(), OutboundMessage::NotInSession));
        }
        Departure::Nothing
    }

    /// Leave, then match again. If the match step fails, the leave is
    /// undone and none of this transition's effects survive.
    fn rotate(&mut self, user: &UserId, effects: &mut Vec<Effect>) -> Result<(), MatchError> {
        let start = effects.len();
        let departure = self.leave(user, IdleNotice::Suppress, effects);
        let outcome = self.request_match(user, effects);
        if outcome.is_err() {
            effects.truncate(start);
            let restored = match departure {
                Departure::Session(partner) => self.pairs.pair(user.clone(), partner),
                Departure::Queue(index) => self.queue.insert(index, user.clone()),
                Departure::Nothing => Ok(()),
            };
            if let Err(e) = restored {
                error!(user = %user, error = %e, "Failed to undo leave after rotate error");
            }
        }
        outcome
    }

    fn relay(&self, user: &UserId, payload: String, effects: &mut Vec<Effect>) {
        match self.pairs.partner_of(user) {
            Some(partner) => {
                effects.push(Effect::new(partner, OutboundMessage::Relayed { payload }));
            }
            None => {
                effects.push(Effect::new(user.clone(), OutboundMessage::NotInSession));
            }
        }
    }

    fn disconnect(&mut self, user: &UserId, effects: &mut Vec<Effect>) {
        if let Some(partner) = self.pairs.unpair(user) {
            info!(user = %user, partner = %partner, "Session ended by disconnect");
            effects.push(Effect::new(partner, OutboundMessage::PartnerLeft));
        } else if self.queue.remove(user) {
            debug!(user = %user, "Waiting user disconnected");
        }
    }

    fn is_consistent(&self) -> bool {
        let mut seen = HashSet::new();
        if !self.queue.iter().all(|id| seen.insert(id)) {
            return false;
        }
        self.pairs.iter().all(|(user, partner)| {
            user != partner
                && self.pairs.partner_of(partner).as_ref() == Some(user)
                && !self.queue.contains(user)
        })
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Cloneable handle to the pairing state.
///
/// Every public method runs one transition under a single lock that covers
/// both the precondition check and the mutation, then returns the effects
/// for the caller to deliver after the lock is released.
#[derive(Clone)]
pub struct SessionCoordinator {
    config: Arc<CoordinatorConfig>,
    state: Arc<Mutex<MatchState>>,
}

impl SessionCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(MatchState::default())),
        }
    }

    /// Apply one user event and return what should be sent to whom.
    pub fn on_user_event(&self, user: &UserId, event: UserEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        let mut state = self.lock();

        let outcome = match event {
            UserEvent::StartCommand { name } => {
                effects.push(Effect::new(
                    user.clone(),
                    OutboundMessage::Welcome {
                        name,
                        group_link: self.config.group_link.clone(),
                    },
                ));
                Ok(())
            }
            UserEvent::RequestMatch => state.request_match(user, &mut effects),
            UserEvent::Leave => {
                state.leave(user, IdleNotice::Send, &mut effects);
                Ok(())
            }
            UserEvent::Rotate => state.rotate(user, &mut effects),
            UserEvent::Relay(payload) => {
                state.relay(user, payload, &mut effects);
                Ok(())
            }
        };

        debug_assert!(state.is_consistent(), "pairing invariants broken");
        drop(state);

        if let Err(e) = outcome {
            error!(user = %user, error = %e, "Transition aborted on internal error");
            effects.clear();
        }
        effects
    }

    /// The transport lost `user`'s connection: end their session or drop
    /// them from the queue. Only the partner is told.
    pub fn on_disconnect(&self, user: &UserId) -> Vec<Effect> {
        let mut effects = Vec::new();
        let mut state = self.lock();
        state.disconnect(user, &mut effects);
        debug_assert!(state.is_consistent(), "pairing invariants broken");
        effects
    }

    pub fn state_of(&self, user: &UserId) -> UserState {
        self.lock().state_of(user)
    }

    pub fn partner_of(&self, user: &UserId) -> Option<UserId> {
        self.lock().pairs.partner_of(user)
    }

    /// Waiting users, oldest first.
    pub fn waiting(&self) -> Vec<UserId> {
        self.lock().queue.iter().cloned().collect()
    }

    pub fn stats(&self) -> CoordinatorStats {
        let state = self.lock();
        CoordinatorStats {
            waiting: state.queue.len(),
            active_sessions: state.pairs.session_count(),
        }
    }

    /// Check the queue/registry invariants: no duplicates in the queue, a
    /// symmetric registry without self-pairs, and nobody both waiting and
    /// paired.
    pub fn is_consistent(&self) -> bool {
        self.lock().is_consistent()
    }

    fn lock(&self) -> MutexGuard<'_, MatchState> {
        // Transitions only mutate after all fallible checks, so a panic
        // elsewhere cannot leave the state half-applied.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}
