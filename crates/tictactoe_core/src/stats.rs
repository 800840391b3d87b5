//! Win-ratio projection over finished sessions.

use crate::session::{Session, UserId};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A user's wins relative to losses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, new)]
pub struct WinRatio {
    user_id: UserId,
    login: String,
    ratio: f32,
}

impl WinRatio {
    /// Computes the ratio for `user_id` from their finished sessions.
    ///
    /// Every finished session the user did not win (draws included) counts
    /// as a loss. The ratio is `wins / losses`, or `wins` when there are no
    /// losses, and `0` with no finished games. Sessions that are not
    /// finished or do not seat the user are ignored.
    #[instrument(skip(sessions), fields(sessions = sessions.len()))]
    pub fn compute(user_id: &str, login: &str, sessions: &[Session]) -> Self {
        let finished: Vec<&Session> = sessions
            .iter()
            .filter(|s| s.state().is_terminal() && s.is_seated(user_id))
            .collect();

        let wins = finished
            .iter()
            .filter(|s| s.winner_id() == Some(user_id))
            .count();
        let losses = finished.len() - wins;

        let ratio = if losses == 0 {
            wins as f32
        } else {
            wins as f32 / losses as f32
        };
        Self::new(user_id.to_string(), login.to_string(), ratio)
    }
}
