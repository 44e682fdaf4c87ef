//! Core domain types for the Govi voice-assistant backend.
//!
//! This crate is deliberately small: the heavy lifting (audio transport,
//! turn detection, speech-to-speech inference) happens in external services.
//! What lives here are the seams to those services:
//!
//! - `agent`: the immutable configuration bundle for one realtime model
//!   session (instructions, voice, temperature, turn-detection thresholds).
//! - `room`: the [`room::RoomService`] trait over the real-time audio room
//!   platform, plus the LiveKit-backed implementation (room provisioning,
//!   participant discovery, join-token minting).

pub mod agent;
pub mod room;
