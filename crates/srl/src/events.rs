use std::future;
use std::sync::{Arc, LazyLock};

use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::runs::{LeaderboardKey, RunId};
use crate::time::Seconds;

static QUEUE: LazyLock<broadcast::Sender<Arc<Event>>> = LazyLock::new(|| broadcast::channel(64).0);

#[derive(Debug)]
pub enum Event {
    /// A run was reported as created, edited, approved, or deleted.
    RunChanged { run_id: RunId, key: LeaderboardKey },

    /// New standings for a leaderboard have been written.
    LeaderboardUpdated {
        key: LeaderboardKey,
        ranked: usize,
        newly_obsolete: Box<[RunId]>,
        record_time: Option<Seconds>,
    },

    /// A leaderboard could not be recomputed; its previous standings are still in place.
    RecomputationFailed { key: LeaderboardKey, reason: String },
}

impl Event {
    pub fn key(&self) -> &LeaderboardKey {
        match self {
            Self::RunChanged { key, .. }
            | Self::LeaderboardUpdated { key, .. }
            | Self::RecomputationFailed { key, .. } => key,
        }
    }
}

/// Dispatches an event to any active subscribers.
///
/// # Return
///
/// The return value is an upper bound on how many subscribers may see this event.
pub(crate) fn dispatch(event: Event) -> usize {
    QUEUE.send(Arc::new(event)).ok().unwrap_or(0)
}

/// Returns a [`Stream`] yielding [`Event`]s that were dispatched by this crate.
pub fn subscribe() -> impl Stream<Item = Arc<Event>> {
    BroadcastStream::new(QUEUE.subscribe()).filter_map(|item| {
        future::ready(match item {
            Ok(item) => Some(item),
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                warn!(n, "event queue subscriber lagged");
                None
            },
        })
    })
}
