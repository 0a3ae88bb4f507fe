//! # Action Arbiter
//!
//! Cooperative exclusive-resource action scheduling for robot control loops.
//!
//! A robot is a set of mutually-exclusive subsystems (drive base, intake,
//! shooter) that many concurrently-composed routines want to control at
//! once. This library arbitrates which asynchronous unit of work ("action")
//! owns which named subsystem handle ("resource") at any instant, with
//! deterministic conflict resolution, safe eviction, and re-entrant nesting,
//! using purely cooperative task interleaving.
//!
//! ## Model
//!
//! - [`Resource`](core::Resource): a named, exclusively-ownable handle shared
//!   as an `Arc`, optionally carrying a default action relaunched whenever
//!   the resource becomes free.
//! - [`Arbiter`](core::Arbiter): a cloneable handle whose
//!   `use_resources(request, action)` suspends the caller until the action
//!   terminates; the paired [`ArbiterRunner`](core::ArbiterRunner) is a
//!   single serialized message loop that owns every scheduling decision.
//! - [`ActionContext`](core::ActionContext): the explicit claim token handed
//!   to each action body; nested `use_resources` calls issued through it are
//!   re-entrant over already-held resources.
//!
//! Requests naming an in-use resource are rejected synchronously unless the
//! caller set `cancel_conflicts`, in which case the conflicting owners are
//! cancelled and fully unwound before the new body runs. Resources release
//! unconditionally when their action terminates, however it terminates.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use action_arbiter::core::{Arbiter, Resource, UseRequest};
//! use action_arbiter::runtime::TokioSpawner;
//!
//! let (arbiter, runner) = Arbiter::new(TokioSpawner::from_current()?);
//! tokio::spawn(runner.run());
//!
//! let drive = Arc::new(Resource::new("Drive"));
//! arbiter
//!     .use_resources(UseRequest::new([drive.clone()]).named("Drive Forward"), |cx| async move {
//!         // exclusive control of the drive base here; nested cx.use_resources
//!         // calls re-enter this claim without self-conflict
//!         Ok(())
//!     })
//!     .await?;
//! ```

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Builders to construct scheduler instances from configuration.
pub mod builders;
/// Configuration models for scheduler instances.
pub mod config;
/// Core scheduling types and the scheduler loop.
pub mod core;
/// Runtime adapters (task spawners).
pub mod runtime;
/// Shared utilities.
pub mod util;
