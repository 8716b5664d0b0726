//! Usage entitlement and credit metering engine.
//!
//! Decides, for a given user and feature, whether a metered action is
//! permitted under the subscription quota or may proceed by spending
//! pre-purchased credits, and records the resulting usage and credit
//! movements atomically under concurrent access.
//!
//! The caller-facing surface is the handler set in
//! `application::handlers::entitlement`: authorize, usage snapshot,
//! credit grants, and balance queries. HTTP routing, checkout/payment,
//! and authentication are external collaborators: requests arrive here
//! already validated and authenticated, and tier changes or credit
//! purchases arrive as settled facts.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
