//! The matchmaking hub.
//!
//! One task owns every piece of shared matchmaking state: connected users,
//! the idle pool, relation edges, the offline bridge, live trips, pending
//! profiles and the interest catalog. Everything else talks to it through
//! [`HubEvent`]s, including its own follow-up work (match searches and trip
//! expiry), so state is only ever mutated from inside [`Hub::handle`].
//!
//! # Relations
//!
//! Relations are directed edges `user -> companion`. A search for `s` that
//! picks `c` creates the proposal edge `c -> s`; `c` answers it. Any answer
//! other than the rejection token adds `s -> c`, and two reciprocal edges are
//! a confirmed pairing.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::constants::*;
use crate::models::UserProfile;
use crate::services::catalog::InterestCatalog;
use crate::services::matching::{self, Candidate};
use crate::services::session::{GroupId, SessionGroup, TripLength};

/// Everything the hub reacts to.
#[derive(Debug)]
pub enum HubEvent {
    Register(Connection),
    Unregister { user_id: String, serial: u64 },
    Inbound { user_id: String, payload: String },
    SubmitProfile(UserProfile),
    Catalog(oneshot::Sender<Vec<String>>),
    Search(String),
    GroupExpired(GroupId),
}

/// A freshly upgraded connection, handed to the hub on registration.
#[derive(Debug)]
pub struct Connection {
    pub user_id: String,
    /// Distinguishes successive connections of the same user
    pub serial: u64,
    pub outbound: mpsc::Sender<String>,
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub is no longer running")]
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct HubSettings {
    pub trip: TripLength,
    pub queue_capacity: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            trip: TripLength {
                min_minutes: DEFAULT_SESSION_MIN_MINUTES,
                max_minutes: DEFAULT_SESSION_MAX_MINUTES,
            },
            queue_capacity: DEFAULT_HUB_QUEUE_CAPACITY,
        }
    }
}

/// Cloneable front door to a running hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    events: mpsc::Sender<HubEvent>,
    serials: Arc<AtomicU64>,
}

impl HubHandle {
    /// Wraps the sending side of a hub's event queue.
    pub fn new(events: mpsc::Sender<HubEvent>) -> Self {
        Self {
            events,
            serials: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Creates the outbound queue for a new connection of `user_id`.
    pub fn open_connection(&self, user_id: &str) -> (Connection, mpsc::Receiver<String>) {
        let (outbound, queue) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let connection = Connection {
            user_id: user_id.to_string(),
            serial: self.serials.fetch_add(1, Ordering::Relaxed),
            outbound,
        };
        (connection, queue)
    }

    async fn submit(&self, event: HubEvent) -> Result<(), HubError> {
        self.events.send(event).await.map_err(|_| HubError::Closed)
    }

    pub async fn register(&self, connection: Connection) -> Result<(), HubError> {
        self.submit(HubEvent::Register(connection)).await
    }

    pub async fn unregister(&self, user_id: String, serial: u64) -> Result<(), HubError> {
        self.submit(HubEvent::Unregister { user_id, serial }).await
    }

    pub async fn inbound(&self, user_id: String, payload: String) -> Result<(), HubError> {
        self.submit(HubEvent::Inbound { user_id, payload }).await
    }

    pub async fn submit_profile(&self, profile: UserProfile) -> Result<(), HubError> {
        self.submit(HubEvent::SubmitProfile(profile)).await
    }

    /// Current interest catalog, in first-seen order.
    pub async fn catalog(&self) -> Result<Vec<String>, HubError> {
        let (reply, response) = oneshot::channel();
        self.submit(HubEvent::Catalog(reply)).await?;
        response.await.map_err(|_| HubError::Closed)
    }
}

#[derive(Debug)]
struct Client {
    serial: u64,
    profile: UserProfile,
    outbound: mpsc::Sender<String>,
}

pub struct Hub {
    clients: HashMap<String, Client>,
    /// Connected users searching for a companion
    idle: BTreeSet<String>,
    /// Profiles submitted before their owner connected
    waiting: HashMap<String, UserProfile>,
    edges: HashMap<String, String>,
    /// Disconnected user -> companion of their confirmed pairing
    offline: HashMap<String, String>,
    groups: HashMap<GroupId, SessionGroup>,
    catalog: InterestCatalog,
    next_group_id: GroupId,
    trip: TripLength,
    rng: StdRng,
    events: mpsc::Sender<HubEvent>,
    /// Users dropped for a full outbound queue, awaiting relation cleanup
    evicted: Vec<String>,
}

impl Hub {
    pub fn new(settings: HubSettings, events: mpsc::Sender<HubEvent>) -> Self {
        Self::with_rng(settings, events, StdRng::from_os_rng())
    }

    pub fn with_rng(settings: HubSettings, events: mpsc::Sender<HubEvent>, rng: StdRng) -> Self {
        Self {
            clients: HashMap::new(),
            idle: BTreeSet::new(),
            waiting: HashMap::new(),
            edges: HashMap::new(),
            offline: HashMap::new(),
            groups: HashMap::new(),
            catalog: InterestCatalog::new(),
            next_group_id: 0,
            trip: settings.trip,
            rng,
            events,
            evicted: Vec::new(),
        }
    }

    /// Starts the hub loop on its own task.
    pub fn spawn(settings: HubSettings) -> HubHandle {
        let (tx, rx) = mpsc::channel(settings.queue_capacity);
        let hub = Hub::new(settings, tx.clone());
        tokio::spawn(hub.run(rx));
        HubHandle::new(tx)
    }

    pub async fn run(mut self, mut events: mpsc::Receiver<HubEvent>) {
        tracing::info!("hub started");
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        tracing::info!("hub stopped");
    }

    pub fn handle(&mut self, event: HubEvent) {
        match event {
            HubEvent::Register(connection) => self.register(connection),
            HubEvent::Unregister { user_id, serial } => self.unregister(&user_id, serial),
            HubEvent::Inbound { user_id, payload } => self.inbound(&user_id, payload),
            HubEvent::SubmitProfile(profile) => self.submit_profile(profile),
            HubEvent::Catalog(reply) => {
                let _ = reply.send(self.catalog.entries().to_vec());
            }
            HubEvent::Search(user_id) => self.search(&user_id),
            HubEvent::GroupExpired(id) => self.expire(id),
        }
        self.settle_evictions();
    }

    fn register(&mut self, connection: Connection) {
        let Connection { user_id, serial, outbound } = connection;

        let previous = self.clients.remove(&user_id);
        let replaced = previous.is_some();
        let profile = match self.waiting.remove(&user_id) {
            Some(profile) => profile,
            None => previous
                .map(|client| client.profile)
                .unwrap_or_else(|| UserProfile::anonymous(&user_id)),
        };
        self.clients.insert(user_id.clone(), Client { serial, profile, outbound });
        tracing::info!(user = %user_id, serial, replaced, online = self.clients.len(), "registered");

        if let Some(companion) = self.offline.remove(&user_id) {
            tracing::info!(user = %user_id, companion = %companion, "pairing restored");
            self.edges.insert(user_id, companion.clone());
            self.send(&companion, MSG_PARTNER_ONLINE);
        } else if replaced && self.is_paired(&user_id) {
            tracing::debug!(user = %user_id, "connection replaced inside a pairing");
        } else {
            self.idle.insert(user_id.clone());
            if self.send(&user_id, MSG_SEARCHING) {
                self.request_search(user_id);
            }
        }
    }

    fn unregister(&mut self, user_id: &str, serial: u64) {
        match self.clients.get(user_id) {
            Some(client) if client.serial == serial => {}
            _ => {
                tracing::debug!(user = %user_id, serial, "stale unregister ignored");
                return;
            }
        }

        self.clients.remove(user_id);
        self.idle.remove(user_id);
        tracing::info!(user = %user_id, online = self.clients.len(), "unregistered");
        self.release(user_id);
    }

    /// Settles the relation of a user who just went away.
    fn release(&mut self, user_id: &str) {
        let Some(companion) = self.edges.get(user_id).cloned() else {
            return;
        };

        if self.points_at(&companion, user_id) {
            self.offline.insert(user_id.to_string(), companion.clone());
            self.send(&companion, MSG_PARTNER_OFFLINE);
        } else {
            // an unanswered proposal dies with its addressee
            self.edges.remove(user_id);
        }
    }

    fn inbound(&mut self, user_id: &str, payload: String) {
        if !self.clients.contains_key(user_id) {
            tracing::debug!(user = %user_id, "message from unknown user dropped");
            return;
        }

        let Some(target) = self.edges.get(user_id).cloned() else {
            self.send(user_id, MSG_NO_COMPANION);
            return;
        };

        if self.idle.contains(&target) {
            if payload == REJECTION_TOKEN {
                tracing::info!(user = %user_id, proposer = %target, "proposal declined");
                self.edges.remove(user_id);
            } else {
                self.confirm(user_id, &target, payload);
            }
        } else if self.points_at(&target, user_id) {
            if self.clients.contains_key(&target) {
                self.send(&target, payload);
            } else {
                self.send(user_id, MSG_PARTNER_NOT_ONLINE);
            }
        } else {
            tracing::info!(user = %user_id, former = %target, "companion moved on");
            self.edges.remove(user_id);
            self.idle.insert(user_id.to_string());
            if self.send(user_id, MSG_PARTNER_MOVED_ON) {
                self.request_search(user_id.to_string());
            }
        }
    }

    /// `user_id` accepted the proposal from `proposer`; their trip starts now.
    fn confirm(&mut self, user_id: &str, proposer: &str, first_message: String) {
        self.edges.insert(proposer.to_string(), user_id.to_string());
        self.idle.remove(user_id);
        self.idle.remove(proposer);

        let shared = match (self.clients.get(proposer), self.clients.get(user_id)) {
            (Some(p), Some(u)) => matching::shared_likes(&p.profile, &u.profile),
            _ => Vec::new(),
        };
        let minutes = self.trip.pick(&mut self.rng);
        let id = self.next_group_id;
        self.next_group_id += 1;
        let group = SessionGroup::new(id, [user_id.to_string(), proposer.to_string()], minutes, shared);

        tracing::info!(
            group = id,
            user = %user_id,
            proposer = %proposer,
            minutes,
            expires_at = %group.expires_at(),
            "trip started"
        );

        self.send(proposer, MSG_PARTNER_FOUND);
        self.send(proposer, first_message);
        for member in &group.members {
            for notice in group.start_notices() {
                self.send(member, notice);
            }
        }

        group.schedule_expiry(self.events.clone());
        self.groups.insert(id, group);
    }

    fn search(&mut self, user_id: &str) {
        if !self.idle.contains(user_id) {
            return;
        }
        if let Some(proposer) = self.edges.get(user_id) {
            // already answering a proposal; a second one would cross it
            tracing::debug!(user = %user_id, proposer = %proposer, "search skipped, proposal pending");
            return;
        }
        let Some(searcher) = self.clients.get(user_id).map(|client| &client.profile) else {
            return;
        };

        let candidates: Vec<Candidate<'_>> = self
            .idle
            .iter()
            .filter(|id| id.as_str() != user_id)
            .filter_map(|id| self.clients.get(id))
            .map(|client| Candidate {
                profile: &client.profile,
                linked: self.edges.contains_key(&client.profile.id),
            })
            .collect();

        let Some(partner) = matching::select_partner(searcher, &candidates, &mut self.rng) else {
            tracing::debug!(user = %user_id, pool = candidates.len(), "no companion available");
            return;
        };
        let partner = partner.id.clone();
        let greeting = searcher.greeting().unwrap_or(MSG_DEFAULT_GREETING).to_string();

        tracing::info!(user = %user_id, candidate = %partner, "proposal sent");
        self.edges.insert(partner.clone(), user_id.to_string());
        if self.send(&partner, greeting) {
            self.send(&partner, MSG_ACCEPT_PROMPT);
        }
    }

    fn expire(&mut self, id: GroupId) {
        let Some(group) = self.groups.remove(&id) else {
            return;
        };
        tracing::info!(group = id, minutes = group.minutes, "trip over");

        for member in &group.members {
            self.edges.remove(member);
            self.offline.remove(member);
            if self.clients.contains_key(member) {
                self.idle.insert(member.clone());
                self.send(member, MSG_TRIP_OVER);
            }
        }
    }

    fn submit_profile(&mut self, profile: UserProfile) {
        let profile = profile.normalized();
        self.catalog.extend(&profile.likes);
        self.catalog.extend(&profile.dislikes);

        match self.clients.get_mut(&profile.id) {
            Some(client) => client.profile = profile,
            None => {
                self.waiting.insert(profile.id.clone(), profile);
            }
        }
    }

    /// Non-blocking delivery. A full queue evicts the consumer instead of stalling the loop.
    fn send(&mut self, user_id: &str, message: impl Into<String>) -> bool {
        let Some(client) = self.clients.get(user_id) else {
            return false;
        };

        match client.outbound.try_send(message.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(user = %user_id, "outbound queue full, dropping slow consumer");
                self.clients.remove(user_id);
                self.idle.remove(user_id);
                self.evicted.push(user_id.to_string());
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(user = %user_id, "outbound queue already closed");
                false
            }
        }
    }

    fn settle_evictions(&mut self) {
        while let Some(user_id) = self.evicted.pop() {
            self.release(&user_id);
        }
    }

    fn request_search(&self, user_id: String) {
        let events = self.events.clone();
        tokio::spawn(async move {
            if events.send(HubEvent::Search(user_id)).await.is_err() {
                tracing::debug!("hub gone before search");
            }
        });
    }

    fn points_at(&self, from: &str, to: &str) -> bool {
        self.edges.get(from).is_some_and(|target| target == to)
    }

    fn is_paired(&self, user_id: &str) -> bool {
        self.edges
            .get(user_id)
            .is_some_and(|companion| self.points_at(companion, user_id))
    }
}
