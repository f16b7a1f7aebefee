//! # Fighter Sync Client Library
//!
//! Client-side synchronization for a two-player, server-authoritative fighting
//! game. The server owns the simulation; this library keeps the local fighter
//! responsive and the opponent smooth while staying consistent with it.
//!
//! ## Architecture Overview
//!
//! Everything is driven by one [`frame_loop::FrameLoop`]. Network handlers feed
//! it [`shared::ServerEvent`]s, the host calls `step` once per display frame,
//! and whatever the loop wants to send is drained from its outbox.
//!
//! ### Client-Side Prediction
//! The local fighter is advanced every frame from the current input through
//! [`shared::advance`], the same movement step the server runs. Inputs are
//! tagged with the server tick they are expected to land on.
//!
//! ### Input Batching
//! Rather than one datagram per frame, inputs are buffered and sent every
//! `frames_per_batch` frames. Sent inputs stay in a tick-keyed history until
//! the server acknowledges them.
//!
//! ### Server Reconciliation
//! Each authoritative snapshot carries the last tick the server processed for
//! us. The local state is replaced by the server's, every newer input is
//! replayed, and acknowledged history is pruned. The difference to the old
//! prediction is not applied at once but smoothed over a few frames.
//!
//! ### Remote Interpolation
//! The opponent is only known at snapshot rate, so its displayed position is
//! blended between the previous display and the newest snapshot over one
//! snapshot interval.
//!
//! ### Tick Estimation
//! `matchStart` anchors a [`clock::TickClock`]. Together with half the
//! measured round trip from [`latency::LatencyEstimator`] this maps local time
//! to server ticks for the rest of the round.
//!
//! ## Module Organization
//!
//! - `clock`: local monotonic time and the per-round tick anchor
//! - `latency`: ping/pong probes and the bounded round-trip history
//! - `input`: key mapping and the directional attack rules
//! - `batcher`: pending inputs, batch flushes and the replay history
//! - `reconciliation`: authoritative merge and input replay
//! - `smoothing`: decaying display offset after a correction
//! - `interpolation`: remote player blending
//! - `registry`: the players of the current match
//! - `frame_loop`: per-frame ordering and server event dispatch
//! - `rendering`: the renderer seam plus a headless renderer
//! - `network`: UDP transport with simulated latency and loss
//! - `bot`: scripted input for headless sessions
//!
//! ## Usage Example
//!
//! ```rust
//! use client::config::SyncConfig;
//! use client::frame_loop::FrameLoop;
//! use client::rendering::RecordingRenderer;
//! use shared::ServerEvent;
//!
//! let mut frame_loop = FrameLoop::new(SyncConfig::default());
//! let mut renderer = RecordingRenderer::default();
//! frame_loop.start();
//!
//! frame_loop
//!     .dispatch(ServerEvent::Connected { player_id: 1 }, 0.0)
//!     .unwrap();
//! frame_loop.handle_key("ArrowRight", true, 0.0);
//! frame_loop.step(16.0, &mut renderer);
//!
//! for event in frame_loop.drain_outbound() {
//!     // encode and send to the server
//!     let _ = shared::protocol::encode(&event).unwrap();
//! }
//! ```

pub mod batcher;
pub mod bot;
pub mod clock;
pub mod config;
pub mod error;
pub mod frame_loop;
pub mod input;
pub mod interpolation;
pub mod latency;
pub mod network;
pub mod reconciliation;
pub mod registry;
pub mod rendering;
pub mod smoothing;

pub use error::SyncError;
pub use frame_loop::{FrameLoop, FrameReport, LoopState};
