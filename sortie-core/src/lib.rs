//! Sortie Core
//!
//! Core types and pure logic for the Sortie batch-fleet controller.
//!
//! This crate contains:
//! - Domain types: manifests, the object key layout, checkpoints, aggregate records
//! - Event classification: mapping a changed object key to the handler that owns it
//! - The manifest compiler that turns a manifest into a node startup script
//! - DTOs: the wire shape of object-store change notifications
//!
//! Nothing in here performs I/O.

pub mod compiler;
pub mod domain;
pub mod dto;
