// src/lib.rs
// ============================================================================
// Crate: orc
// Description: Composition root for the Decision Orchestration Core.
// ============================================================================

//! The Decision Orchestration Core.
//!
//! [`Orchestrator::handle_event`] is the single entry point for C1-C12: one
//! inbound [`orc_core::event::RawEvent`] in, one
//! [`orc_core::decision::EventResult`] out. Plan execution (C14) is a
//! separate entry point, [`orc_scheduler::execute`], invoked independently by
//! a host once a decision's advisory signals carry a plan to run.

pub mod handler;

pub use handler::Orchestrator;
