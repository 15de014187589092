//! Timed two-person trips.
//!
//! A group is created when a proposal is accepted, announces itself to both
//! members, and expires when its timer fires. The timer never touches hub
//! state: it submits [`HubEvent::GroupExpired`] and the hub tears the group down.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::mpsc;

use crate::constants::{MSG_SHARED_LIKES, trip_start_message};
use crate::services::hub::HubEvent;

pub type GroupId = u64;

#[derive(Debug, Clone)]
pub struct SessionGroup {
    pub id: GroupId,
    pub members: [String; 2],
    pub minutes: u64,
    pub shared_likes: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl SessionGroup {
    pub fn new(id: GroupId, members: [String; 2], minutes: u64, shared_likes: Vec<String>) -> Self {
        Self {
            id,
            members,
            minutes,
            shared_likes,
            started_at: Utc::now(),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.minutes * 60)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.started_at + chrono::Duration::minutes(self.minutes as i64)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.members.iter().any(|member| member == user_id)
    }

    /// Messages each member receives when the trip starts.
    pub fn start_notices(&self) -> Vec<String> {
        let mut notices = vec![trip_start_message(self.minutes)];
        if !self.shared_likes.is_empty() {
            notices.push(MSG_SHARED_LIKES.to_string());
            notices.push(self.shared_likes.join(","));
        }
        notices
    }

    /// Spawns the expiry timer. On firing it asks the hub to end the trip.
    pub fn schedule_expiry(&self, hub: mpsc::Sender<HubEvent>) {
        let id = self.id;
        let duration = self.duration();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if hub.send(HubEvent::GroupExpired(id)).await.is_err() {
                tracing::debug!(group = id, "hub gone before trip expiry");
            }
        });
    }
}

/// Inclusive range of trip lengths, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripLength {
    pub min_minutes: u64,
    pub max_minutes: u64,
}

impl TripLength {
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.random_range(self.min_minutes..=self.max_minutes)
    }
}
