//! Sequential proof-of-work search
//!
//! The search walks nonces from zero. Every `chunk_size` nonces it publishes
//! progress and checks for cancellation. Two drivers share the same chunk
//! loop:
//!
//! - [`PowSolver::spawn`] runs it on a blocking worker thread and reports
//!   through a `watch` channel, so the caller's thread never hashes.
//! - [`PowSolver::solve_cooperative`] runs it on the current task and yields
//!   to the scheduler between chunks, for single-threaded runtimes.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::challenge::{hash_attempt, meets_difficulty, Challenge, PrimedHasher, MAX_DIFFICULTY};
use crate::error::{ProvisionError, ProvisionResult};

/// Default number of leading zero hex digits
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Default iteration ceiling
pub const DEFAULT_MAX_ITERATIONS: u64 = 100_000;

/// Default nonces per progress report
pub const DEFAULT_CHUNK_SIZE: u64 = 1_000;

/// Progress never reaches 1.0 before a solution is found
const PROGRESS_CAP: f64 = 0.99;

/// Search parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowParams {
    /// Leading zero hex digits required
    pub difficulty: u32,
    /// Nonces tried before giving up
    pub max_iterations: u64,
    /// Nonces per progress report / cancellation check
    pub chunk_size: u64,
}

impl Default for PowParams {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl PowParams {
    /// Reject parameters the solver cannot honor.
    pub fn validate(&self) -> ProvisionResult<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ProvisionError::Config(format!(
                "difficulty {} exceeds {} hex digits",
                self.difficulty, MAX_DIFFICULTY
            )));
        }
        if self.max_iterations == 0 {
            return Err(ProvisionError::Config("max_iterations must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(ProvisionError::Config("chunk_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// A solved puzzle. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofOfWorkResult {
    /// Winning nonce
    pub nonce: u64,
    /// `hex(sha256(challenge || nonce))`
    pub hash: String,
    /// Challenge creation time in Unix milliseconds
    pub timestamp: i64,
    /// Difficulty the hash was required to meet
    pub difficulty: u32,
}

impl ProofOfWorkResult {
    /// Rebuild the challenge this result was solved against
    pub fn challenge(&self, public_id: &str) -> Challenge {
        Challenge::at(public_id, self.timestamp)
    }

    /// Re-hash the recorded nonce and check both the digest and the difficulty.
    pub fn verify(&self, public_id: &str) -> bool {
        let recomputed = hash_attempt(&self.challenge(public_id).seed(), self.nonce);
        recomputed == self.hash && meets_difficulty(&recomputed, self.difficulty)
    }
}

/// Solver state as published to observers.
///
/// `Idle -> Running -> {Success, Exhausted}`, with `Cancelled` reachable from
/// `Running`.
#[derive(Debug, Clone, PartialEq)]
pub enum PowStatus {
    /// Not started
    Idle,
    /// Searching; `progress` is `min(nonce / max_iterations, 0.99)`
    Running { nonce: u64, progress: f64 },
    /// Solution found
    Success(ProofOfWorkResult),
    /// Ceiling reached without a solution
    Exhausted { max_iterations: u64 },
    /// Stopped by the caller
    Cancelled { nonce: u64, progress: f64 },
}

impl PowStatus {
    /// Completion fraction; only `Success` reports 1.0
    pub fn progress(&self) -> f64 {
        match self {
            PowStatus::Idle => 0.0,
            PowStatus::Running { progress, .. } | PowStatus::Cancelled { progress, .. } => {
                *progress
            }
            PowStatus::Success(_) => 1.0,
            PowStatus::Exhausted { .. } => PROGRESS_CAP,
        }
    }

    /// Whether the search has stopped
    pub fn is_finished(&self) -> bool {
        !matches!(self, PowStatus::Idle | PowStatus::Running { .. })
    }
}

fn progress_fraction(nonce: u64, max_iterations: u64) -> f64 {
    (nonce as f64 / max_iterations as f64).min(PROGRESS_CAP)
}

enum ChunkOutcome {
    Found(ProofOfWorkResult),
    Exhausted,
    Continue,
}

/// One in-progress search. Restarting means building a new one.
struct Search {
    params: PowParams,
    timestamp: i64,
    hasher: PrimedHasher,
    nonce: u64,
}

impl Search {
    fn new(params: PowParams, challenge: &Challenge) -> Self {
        Self {
            params,
            timestamp: challenge.created_at_ms,
            hasher: PrimedHasher::new(&challenge.seed()),
            nonce: 0,
        }
    }

    fn run_chunk(&mut self) -> ChunkOutcome {
        let end = self
            .nonce
            .saturating_add(self.params.chunk_size)
            .min(self.params.max_iterations);
        while self.nonce < end {
            let hash = self.hasher.hash(self.nonce);
            if meets_difficulty(&hash, self.params.difficulty) {
                return ChunkOutcome::Found(ProofOfWorkResult {
                    nonce: self.nonce,
                    hash,
                    timestamp: self.timestamp,
                    difficulty: self.params.difficulty,
                });
            }
            self.nonce += 1;
        }
        if self.nonce >= self.params.max_iterations {
            ChunkOutcome::Exhausted
        } else {
            ChunkOutcome::Continue
        }
    }

    fn running(&self) -> PowStatus {
        PowStatus::Running {
            nonce: self.nonce,
            progress: progress_fraction(self.nonce, self.params.max_iterations),
        }
    }

    fn cancelled(&self) -> ProvisionError {
        ProvisionError::PowCancelled { nonce: self.nonce }
    }

    fn cancelled_status(&self) -> PowStatus {
        PowStatus::Cancelled {
            nonce: self.nonce,
            progress: progress_fraction(self.nonce, self.params.max_iterations),
        }
    }

    fn exhausted(&self) -> (PowStatus, ProvisionError) {
        let max_iterations = self.params.max_iterations;
        (
            PowStatus::Exhausted { max_iterations },
            ProvisionError::PowExceededIterations { max_iterations },
        )
    }
}

/// Proof-of-work solver with fixed parameters.
#[derive(Debug, Clone)]
pub struct PowSolver {
    params: PowParams,
}

impl PowSolver {
    /// Create a solver, validating the parameters
    pub fn new(params: PowParams) -> ProvisionResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Parameters in use
    pub fn params(&self) -> &PowParams {
        &self.params
    }

    /// Run the search to completion on the current thread.
    ///
    /// `on_status` is called with `Running` at the start and after every
    /// chunk, then once with the final status.
    ///
    /// # Errors
    ///
    /// `PowExceededIterations` when the ceiling is reached, `PowCancelled`
    /// when `cancel` fires between chunks.
    pub fn solve_blocking<F>(
        &self,
        challenge: &Challenge,
        cancel: &CancellationToken,
        mut on_status: F,
    ) -> ProvisionResult<ProofOfWorkResult>
    where
        F: FnMut(&PowStatus),
    {
        let mut search = Search::new(self.params, challenge);
        info!(
            public_id = %challenge.public_id,
            difficulty = self.params.difficulty,
            max_iterations = self.params.max_iterations,
            "Starting proof-of-work"
        );
        on_status(&search.running());

        loop {
            if cancel.is_cancelled() {
                warn!(nonce = search.nonce, "Proof-of-work cancelled");
                on_status(&search.cancelled_status());
                return Err(search.cancelled());
            }
            match search.run_chunk() {
                ChunkOutcome::Found(result) => {
                    info!(nonce = result.nonce, hash = %result.hash, "Proof-of-work solved");
                    on_status(&PowStatus::Success(result.clone()));
                    return Ok(result);
                }
                ChunkOutcome::Exhausted => {
                    warn!(max_iterations = self.params.max_iterations, "Proof-of-work exhausted");
                    let (status, err) = search.exhausted();
                    on_status(&status);
                    return Err(err);
                }
                ChunkOutcome::Continue => on_status(&search.running()),
            }
        }
    }

    /// Run the search on the current task, yielding to the scheduler after
    /// every chunk.
    pub async fn solve_cooperative<F>(
        &self,
        challenge: &Challenge,
        cancel: &CancellationToken,
        mut on_status: F,
    ) -> ProvisionResult<ProofOfWorkResult>
    where
        F: FnMut(&PowStatus),
    {
        let mut search = Search::new(self.params, challenge);
        on_status(&search.running());

        loop {
            if cancel.is_cancelled() {
                on_status(&search.cancelled_status());
                return Err(search.cancelled());
            }
            match search.run_chunk() {
                ChunkOutcome::Found(result) => {
                    debug!(nonce = result.nonce, "Proof-of-work solved cooperatively");
                    on_status(&PowStatus::Success(result.clone()));
                    return Ok(result);
                }
                ChunkOutcome::Exhausted => {
                    let (status, err) = search.exhausted();
                    on_status(&status);
                    return Err(err);
                }
                ChunkOutcome::Continue => {
                    on_status(&search.running());
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    /// Start the search on a blocking worker thread.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(&self, challenge: Challenge) -> PowTask {
        let (status_tx, status_rx) = watch::channel(PowStatus::Idle);
        let cancel = CancellationToken::new();
        let solver = self.clone();
        let token = cancel.clone();

        let handle = tokio::task::spawn_blocking(move || {
            solver.solve_blocking(&challenge, &token, |status| {
                status_tx.send_replace(status.clone());
            })
        });

        PowTask {
            handle,
            status: status_rx,
            cancel,
        }
    }

    /// Spawn the search and wait for it.
    pub async fn solve(&self, challenge: Challenge) -> ProvisionResult<ProofOfWorkResult> {
        self.spawn(challenge).join().await
    }
}

/// Handle to a search running on a worker thread.
pub struct PowTask {
    handle: JoinHandle<ProvisionResult<ProofOfWorkResult>>,
    status: watch::Receiver<PowStatus>,
    cancel: CancellationToken,
}

impl PowTask {
    /// Latest published status
    pub fn status(&self) -> PowStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status change
    pub fn subscribe(&self) -> watch::Receiver<PowStatus> {
        self.status.clone()
    }

    /// Ask the worker to stop after its current chunk
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this search, e.g. to tie it to a parent scope
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the worker to finish.
    pub async fn join(self) -> ProvisionResult<ProofOfWorkResult> {
        self.handle
            .await
            .map_err(|e| ProvisionError::PowWorker(e.to_string()))?
    }
}
