//! Reusable observers for Spar solvers.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work across the coupled and optimization solvers.
//!
//! # Modules
//!
//! - [`traits`]: Capability traits for cross-solver observers
//!   ([`HasResidual`], [`HasObjective`], [`IsFailure`], [`CanStopEarly`],
//!   [`CanAssumeWorse`])
//!
//! # Observers
//!
//! - [`TracingObserver`]: logs every event through `tracing`
//! - [`ResidualHistory`]: records residuals and can stop once a tolerance
//!   is met
//! - [`RecoverFailures`]: answers failure events with an assume-worse action
//!
//! [`Observer`]: spar_core::Observer
//! [`HasResidual`]: traits::HasResidual
//! [`HasObjective`]: traits::HasObjective
//! [`IsFailure`]: traits::IsFailure
//! [`CanStopEarly`]: traits::CanStopEarly
//! [`CanAssumeWorse`]: traits::CanAssumeWorse

mod history;
mod logging;
mod recover;

pub mod traits;

pub use history::ResidualHistory;
pub use logging::TracingObserver;
pub use recover::RecoverFailures;
