// =============================================================================
// Companion Broker Constants
// =============================================================================
// This file contains all constants used throughout the broker to enable
// easy tuning and configuration from a single location.

use std::time::Duration;

// =============================================================================
// CONNECTION PUMP
// =============================================================================

/// Time allowed to write a frame to the peer
pub const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Time allowed to read the next pong from the peer
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// Ping period, 9/10 of the pong wait so a probe always lands before the deadline
pub const PING_PERIOD: Duration = Duration::from_secs(54);

/// Maximum inbound frame size in bytes
pub const MAX_FRAME_SIZE: usize = 512;

/// Capacity of every connection's outbound queue
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

// =============================================================================
// HUB
// =============================================================================

/// Default capacity of the hub's event queue
pub const DEFAULT_HUB_QUEUE_CAPACITY: usize = 1024;

/// Shortest trip, in minutes
pub const DEFAULT_SESSION_MIN_MINUTES: u64 = 5;

/// Longest trip, in minutes
pub const DEFAULT_SESSION_MAX_MINUTES: u64 = 34;

/// Payload that declines a pending proposal
pub const REJECTION_TOKEN: &str = "NO";

// =============================================================================
// MATCH ENGINE
// =============================================================================

/// Shared likes needed for the first priority tier
pub const TIER_ONE_MIN_SHARED: usize = 5;

/// Shared likes needed for the second priority tier
pub const TIER_TWO_MIN_SHARED: usize = 3;

// =============================================================================
// NOTIFICATIONS
// =============================================================================

pub const MSG_SEARCHING: &str = "Looking for a travel companion for you~";
pub const MSG_PARTNER_FOUND: &str = "Found one~";
pub const MSG_DEFAULT_GREETING: &str = "Hi~";
pub const MSG_ACCEPT_PROMPT: &str = "Reply NO to decline, reply anything else to start the trip";
pub const MSG_PARTNER_ONLINE: &str = "Your companion is back online!";
pub const MSG_PARTNER_OFFLINE: &str = "Your companion went offline~";
pub const MSG_PARTNER_NOT_ONLINE: &str = "Your companion is not online yet~";
pub const MSG_PARTNER_MOVED_ON: &str =
    "Your companion found someone else~ looking for a new companion for you~";
pub const MSG_NO_COMPANION: &str = "No companion yet~";
pub const MSG_SHARED_LIKES: &str = "What you both like:";
pub const MSG_TRIP_OVER: &str = "Arrived at the destination, this trip is over~";

/// Trip start notice for a trip of `minutes`
pub fn trip_start_message(minutes: u64) -> String {
    format!("The trip begins, this trip lasts {} minutes", minutes)
}

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 8080;

// =============================================================================
// HELPER FUNCTIONS FOR VALIDATION
// =============================================================================

/// Length of a hyphenated UUID string
pub const USER_ID_LENGTH: usize = 36;

/// Validates that an identifier is a canonical hyphenated UUID
pub fn is_valid_user_id(id: &str) -> bool {
    id.len() == USER_ID_LENGTH && uuid::Uuid::try_parse(id).is_ok()
}
