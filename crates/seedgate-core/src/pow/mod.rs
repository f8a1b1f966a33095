//! Proof-of-work gate for account creation
//!
//! The puzzle: find the smallest `nonce` such that
//! `hex(sha256(public_id || created_at_ms || nonce))` starts with
//! `difficulty` zero characters. Numbers are rendered in decimal.
//!
//! ```rust,no_run
//! # async fn run() -> seedgate_core::ProvisionResult<()> {
//! use seedgate_core::pow::{Challenge, PowParams, PowSolver};
//!
//! let solver = PowSolver::new(PowParams::default())?;
//! let task = solver.spawn(Challenge::new("pk_example"));
//! let mut status = task.subscribe();
//! tokio::spawn(async move {
//!     while status.changed().await.is_ok() {
//!         println!("{:.0}%", status.borrow().progress() * 100.0);
//!     }
//! });
//! let result = task.join().await?;
//! assert!(result.verify("pk_example"));
//! # Ok(())
//! # }
//! ```

mod challenge;
mod solver;

pub use challenge::{hash_attempt, leading_zeros, meets_difficulty, Challenge, MAX_DIFFICULTY};
pub use solver::{
    PowParams, PowSolver, PowStatus, PowTask, ProofOfWorkResult, DEFAULT_CHUNK_SIZE,
    DEFAULT_DIFFICULTY, DEFAULT_MAX_ITERATIONS,
};
