//! pressroom - counter bookkeeping for a small publishing backend.
//!
//! Request-handling services perform their primary write (an article, an
//! account, a follow edge) and then publish a [`event::Signal`] on the
//! [`event::event_bus::EventBus`]. Subscribers registered at startup apply the
//! secondary effects, mostly denormalized counters on users and articles,
//! before the publish call returns.

pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod model;
pub mod repository;
pub mod service;
pub mod subscriber;
