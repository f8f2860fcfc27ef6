//! Amora Memory: deterministic conversational-memory model
//!
//! Evolves a per-(conversation, user) [`MemoryContext`] from each new
//! message: keyword-based trait extraction, monotonic five-stage
//! relationship progression, and running pattern counters. Everything in
//! this crate is a pure function over its inputs (no I/O, no clock beyond
//! stamping `updated_at`), so callers can persist the result however they
//! like and tests stay table-driven.
//!
//! # Flow
//!
//! ```text
//! message content ──► extract ──► TargetTraits (interests/topics/tone/sentiment)
//!                         │
//! MemoryContext ────► next_stage          (reads the PRE-update context)
//!        │                │
//!        └──► merge_traits + observe_patterns
//!                         │
//!                  MemoryContext'
//! ```
//!
//! Malformed or unrecognized content never fails: it simply yields neutral
//! tone/sentiment and no new traits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod extractor;
pub mod types;
pub mod updater;

pub use extractor::extract;
pub use types::{MemoryContext, Patterns, Sentiment, Stage, TargetTraits, Tone};
pub use updater::{advance, merge_traits, next_stage, observe_patterns};
