//! Core types shared across vaultkeep facilities
//!
//! This crate provides the canonical schema constants used by both error
//! handling and logging facilities, so that every crate emits the same
//! structured field keys and event names.

pub mod schema;
