//! HTTP handlers grouped by caller.
//!
//! - [`private_events`]: an initiator managing their own events
//! - [`private_requests`]: a user managing their participation requests
//! - [`admin`]: moderation and search
//! - [`public`]: anonymous browsing, which records view hits
//! - [`health`]: liveness

pub mod admin;
pub mod health;
pub mod private_events;
pub mod private_requests;
pub mod public;
