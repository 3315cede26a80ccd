//! Core domain types
//!
//! These types are shared by every handler in the controller. The object store
//! is the only coordination medium between the controller and the fleet, so the
//! key layout here is load-bearing: nodes and the controller must agree on it.

pub mod aggregate;
pub mod checkpoint;
pub mod event;
pub mod layout;
pub mod manifest;
