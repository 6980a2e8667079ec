//! # EWM Core
//!
//! Event lifecycle, participation request allocation and view aggregation
//! for the EWM event service.
//!
//! ## Components
//!
//! - [`lifecycle::EventLifecycle`]: validates event drafts and moderation
//!   transitions (`PENDING`, `PUBLISHED`, `CANCELED`)
//! - [`allocator::RequestAllocator`]: submits, confirms, rejects and cancels
//!   participation requests without exceeding an event's participant limit
//! - [`views::ViewAggregator`]: merges hit counts from the external stats
//!   collector into events and records public accesses
//! - [`service::EventService`]: facade used by the HTTP layer
//!
//! Domain rules live in [`reducer::Reducer`] implementations that take the
//! current state, an action and an environment, and either return the
//! facts they produced or an error with the state untouched.
//!
//! ## Example
//!
//! ```ignore
//! use ewm_core::{environment::*, ledger::Registry, service::EventService, views::*};
//! use std::sync::Arc;
//!
//! let env = DomainEnvironment::new(Arc::new(SystemClock), LeadTimes::default());
//! let views = ViewAggregator::new(stats_client, Arc::new(SystemClock), ViewConfig::default());
//! let service = EventService::new(Arc::new(Registry::new()), env, views);
//!
//! let event = service.create_event(initiator, draft).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod allocator;
pub mod environment;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod query;
pub mod reducer;
pub mod service;
pub mod stats;
pub mod timestamp;
pub mod types;
pub mod views;

pub use error::{DomainError, Result, StatsError};
