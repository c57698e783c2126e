//! Navigation history engine
//!
//! Interaction records live in an arena keyed by id; the stack holds ids and
//! a cursor. Network calls happen outside the lock, and each transition
//! commits only if no newer one was dispatched while it was in flight.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use framedev_common::{
    ActionBody, ButtonAction, Dispatch, Error, Interaction, InteractionRecord, Result,
};

// ============================================================================
// State
// ============================================================================

/// Snapshot of the navigation history
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryState {
    data_map: HashMap<String, Arc<InteractionRecord>>,
    stack: Vec<String>,
    stack_index: usize,
}

impl HistoryState {
    pub fn new(record: InteractionRecord) -> Self {
        let id = record.id.clone();
        let mut data_map = HashMap::new();
        data_map.insert(id.clone(), Arc::new(record));
        Self {
            data_map,
            stack: vec![id],
            stack_index: 0,
        }
    }

    pub fn data_map(&self) -> &HashMap<String, Arc<InteractionRecord>> {
        &self.data_map
    }

    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    pub fn stack_index(&self) -> usize {
        self.stack_index
    }

    pub fn get(&self, id: &str) -> Option<&Arc<InteractionRecord>> {
        self.data_map.get(id)
    }

    /// Record at `index` of the stack, if both slot and record exist.
    pub fn at(&self, index: usize) -> Option<&Arc<InteractionRecord>> {
        self.stack.get(index).and_then(|id| self.data_map.get(id))
    }

    pub fn current(&self) -> Option<&Arc<InteractionRecord>> {
        self.at(self.stack_index)
    }

    pub fn can_go_back(&self) -> bool {
        self.stack_index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.stack_index + 1 < self.stack.len()
    }

    /// Records on the stack, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &Arc<InteractionRecord>)> {
        self.stack
            .iter()
            .enumerate()
            .filter_map(|(i, id)| self.data_map.get(id).map(|r| (i, r)))
    }

    /// Drop everything past the cursor, then push `record` as the new tip.
    fn append(&mut self, record: InteractionRecord) -> String {
        let id = record.id.clone();
        self.stack.truncate(self.stack_index + 1);
        self.stack.push(id.clone());
        self.stack_index = self.stack.len() - 1;
        self.data_map.insert(id.clone(), Arc::new(record));
        id
    }

    /// Store a replayed record under an existing id.
    fn replace_slot(&mut self, id: &str, record: InteractionRecord) {
        self.data_map
            .insert(id.to_string(), Arc::new(record.into_slot(id)));
    }

    fn move_to(&mut self, index: usize) {
        self.stack_index = index;
    }

    /// Drop every record and start over with `record` as the only entry.
    fn restart(&mut self, record: InteractionRecord) -> String {
        self.data_map.clear();
        let id = record.id.clone();
        self.stack = vec![id.clone()];
        self.stack_index = 0;
        self.data_map.insert(id.clone(), Arc::new(record));
        id
    }
}

/// Outcome of a navigation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A new record was pushed at the tip.
    Appended { id: String },
    /// The history was restarted from a new record.
    Restarted { id: String },
    /// The current slot was replayed in place.
    Replaced { id: String },
    /// The cursor moved after replaying the target slot.
    Moved { from: usize, to: usize, id: String },
    /// Nothing to do (precondition not met or entry missing).
    Unchanged,
    /// A newer transition was dispatched while this one was in flight.
    Discarded,
}

/// Options for [`Navigator::get_frame`]
#[derive(Debug, Clone, Copy, Default)]
pub struct GetFrameOptions {
    /// Clear the whole history before inserting the new record
    pub replace_logs: bool,
}

// ============================================================================
// Navigator
// ============================================================================

struct Inner {
    state: Arc<HistoryState>,
    /// Bumped every time a transition is dispatched
    generation: u64,
    /// URL the session started from, re-resolved by `reset`
    entry_url: String,
}

/// Drives a [`Dispatch`] and keeps the navigation history of one session
pub struct Navigator<D> {
    dispatch: D,
    inner: Mutex<Inner>,
    tx: watch::Sender<Arc<HistoryState>>,
}

impl<D: Dispatch> Navigator<D> {
    /// Resolve `url` and start a session from it.
    pub async fn open(dispatch: D, url: &str) -> Result<Self> {
        let record = dispatch.get_frame(url).await?;
        info!(id = %record.id, "session opened at {}", url);

        let state = Arc::new(HistoryState::new(record));
        let (tx, _rx) = watch::channel(state.clone());

        Ok(Self {
            dispatch,
            inner: Mutex::new(Inner {
                state,
                generation: 0,
                entry_url: url.to_string(),
            }),
            tx,
        })
    }

    /// Latest committed state
    pub fn snapshot(&self) -> Arc<HistoryState> {
        self.inner.lock().state.clone()
    }

    /// Receive a snapshot after every commit
    pub fn subscribe(&self) -> watch::Receiver<Arc<HistoryState>> {
        self.tx.subscribe()
    }

    pub fn entry_url(&self) -> String {
        self.inner.lock().entry_url.clone()
    }

    pub fn dispatch(&self) -> &D {
        &self.dispatch
    }

    /// Take a ticket for a new transition, superseding any in flight.
    fn begin(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.generation
    }

    /// Like [`begin`](Self::begin), but only when `plan` finds something to
    /// do on the current state.
    fn begin_with<T>(&self, plan: impl FnOnce(&HistoryState) -> Option<T>) -> Option<(u64, T)> {
        let mut inner = self.inner.lock();
        let planned = plan(&inner.state)?;
        inner.generation += 1;
        Some((inner.generation, planned))
    }

    /// Apply `change` if `ticket` is still the newest transition, then
    /// publish the new snapshot.
    fn commit(
        &self,
        ticket: u64,
        change: impl FnOnce(&mut HistoryState, &mut String) -> Transition,
    ) -> Transition {
        let mut inner = self.inner.lock();
        if inner.generation != ticket {
            debug!(ticket, current = inner.generation, "discarding stale result");
            return Transition::Discarded;
        }

        let mut next = (*inner.state).clone();
        let transition = change(&mut next, &mut inner.entry_url);
        inner.state = Arc::new(next);
        self.tx.send_replace(inner.state.clone());
        transition
    }

    /// Re-issue the request that produced `record`.
    async fn replay(&self, record: &InteractionRecord) -> Result<InteractionRecord> {
        match &record.interaction {
            Interaction::Initial { url } => self.dispatch.get_frame(url).await,
            Interaction::Action { body } => self.dispatch.post_frame_action(body).await,
            Interaction::Redirect { body, .. } => self.dispatch.post_frame_redirect(body).await,
        }
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// GET a frame and push it, or restart the history with it.
    pub async fn get_frame(&self, url: &str, options: GetFrameOptions) -> Result<Transition> {
        let ticket = self.begin();
        let record = self.dispatch.get_frame(url).await?;

        Ok(self.commit(ticket, |state, entry_url| {
            if options.replace_logs {
                *entry_url = url.to_string();
                Transition::Restarted {
                    id: state.restart(record),
                }
            } else {
                Transition::Appended {
                    id: state.append(record),
                }
            }
        }))
    }

    pub async fn post_frame_action(&self, body: &ActionBody) -> Result<Transition> {
        let ticket = self.begin();
        let record = self.dispatch.post_frame_action(body).await?;
        Ok(self.commit(ticket, |state, _| Transition::Appended {
            id: state.append(record),
        }))
    }

    pub async fn post_frame_redirect(&self, body: &ActionBody) -> Result<Transition> {
        let ticket = self.begin();
        let record = self.dispatch.post_frame_redirect(body).await?;
        Ok(self.commit(ticket, |state, _| Transition::Appended {
            id: state.append(record),
        }))
    }

    /// Press button `button_index` of the current frame.
    pub async fn click(&self, button_index: u8, input_text: Option<String>) -> Result<Transition> {
        let current = self
            .snapshot()
            .current()
            .cloned()
            .ok_or_else(|| Error::Internal("history has no current record".to_string()))?;

        let (action, body) = action_body(&current, button_index, input_text)?;
        match action {
            ButtonAction::PostRedirect => self.post_frame_redirect(&body).await,
            _ => self.post_frame_action(&body).await,
        }
    }

    // ------------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------------

    pub async fn back(&self) -> Result<Transition> {
        self.step(|state| state.stack_index().checked_sub(1)).await
    }

    pub async fn forward(&self) -> Result<Transition> {
        self.step(|state| state.can_go_forward().then(|| state.stack_index() + 1))
            .await
    }

    /// Replay the slot chosen by `target`, then move the cursor onto it.
    async fn step(&self, target: impl FnOnce(&HistoryState) -> Option<usize>) -> Result<Transition> {
        let planned = self.begin_with(|state| {
            let to = target(state)?;
            let record = state.at(to)?.clone();
            Some((state.stack_index(), to, record))
        });
        let Some((ticket, (from, to, record))) = planned else {
            debug!("nothing to move to");
            return Ok(Transition::Unchanged);
        };

        let replayed = self.replay(&record).await?;
        Ok(self.commit(ticket, |state, _| {
            state.replace_slot(&record.id, replayed);
            state.move_to(to);
            Transition::Moved {
                from,
                to,
                id: record.id.clone(),
            }
        }))
    }

    /// Replay the current slot in place.
    pub async fn refresh(&self) -> Result<Transition> {
        let planned = self.begin_with(|state| state.current().cloned());
        let Some((ticket, record)) = planned else {
            warn!("current history entry is missing");
            return Ok(Transition::Unchanged);
        };

        let replayed = self.replay(&record).await?;
        Ok(self.commit(ticket, |state, _| {
            state.replace_slot(&record.id, replayed);
            Transition::Replaced {
                id: record.id.clone(),
            }
        }))
    }

    /// Re-resolve the session entry URL and restart the history from it.
    pub async fn reset(&self) -> Result<Transition> {
        let url = self.entry_url();
        self.get_frame(&url, GetFrameOptions { replace_logs: true })
            .await
    }
}

/// Build the body submitted when button `button_index` of `record` is
/// pressed, along with the kind of button.
pub fn action_body(
    record: &InteractionRecord,
    button_index: u8,
    input_text: Option<String>,
) -> Result<(ButtonAction, ActionBody)> {
    let button = record.frame.button(button_index).ok_or_else(|| {
        Error::InvalidInteraction(format!(
            "frame has no button {} ({} buttons)",
            button_index,
            record.frame.buttons.len()
        ))
    })?;

    match button.action {
        ButtonAction::Post | ButtonAction::PostRedirect => {}
        other => {
            return Err(Error::InvalidInteraction(format!(
                "button {} is a {:?} button and is handled by the client",
                button_index, other
            )))
        }
    }

    let url = record
        .context
        .url
        .clone()
        .unwrap_or_else(|| record.interaction.frame_url().to_string());
    let post_url = button
        .post_url
        .clone()
        .or_else(|| record.frame.post_url.clone())
        .unwrap_or_else(|| url.clone());

    let body = ActionBody {
        url,
        post_url,
        button_index,
        input_text: input_text.filter(|t| !t.is_empty()),
        state: record.frame.state.clone(),
        fid: None,
    };
    Ok((button.action, body))
}
