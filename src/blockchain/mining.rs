use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};
use rand::Rng;
use serde::Serialize;
use tokio::sync::watch;

use super::model::Shared;
use super::{Block, PROGRESS_CAP};
use crate::error::MiningError;
use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningState {
    Idle,
    Starting,
    Mining,
    Completed,
    Failed,
}

/// Snapshot of the miner, as served to pollers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MiningStatus {
    pub status: MiningState,
    /// Cosmetic estimate for UIs, 0..=100. While mining it is advanced by a
    /// timer with random steps and stays at or below `PROGRESS_CAP`; it says
    /// nothing about how far the nonce search actually is.
    pub progress: u8,
    pub block_index: Option<u64>,
    /// Seconds spent in the nonce search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mining_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for MiningStatus {
    fn default() -> Self {
        Self::idle()
    }
}

impl MiningStatus {
    pub fn idle() -> Self {
        Self::at(MiningState::Idle, 0, None)
    }

    fn at(status: MiningState, progress: u8, block_index: Option<u64>) -> Self {
        Self {
            status,
            progress,
            block_index,
            mining_time: None,
            hash: None,
            transaction_count: None,
            error: None,
        }
    }

    fn completed(block: &Block, elapsed: Duration) -> Self {
        Self {
            mining_time: Some(elapsed.as_secs_f64()),
            hash: Some(block.hash.clone()),
            transaction_count: Some(block.transactions.len()),
            ..Self::at(MiningState::Completed, 100, Some(block.index))
        }
    }

    fn failed(block_index: Option<u64>, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::at(MiningState::Failed, 0, block_index)
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, MiningState::Completed | MiningState::Failed)
    }
}

/// Invoked from the mining threads on every status update. Must not block.
pub type StatusCallback = Arc<dyn Fn(&MiningStatus) + Send + Sync>;

/// Handle to one mining cycle.
///
/// Dropping the handle detaches the cycle; it still runs to completion.
pub struct MiningHandle {
    block_index: u64,
    status: watch::Receiver<MiningStatus>,
    cancel: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

impl MiningHandle {
    /// Index of the block this cycle is building.
    pub fn block_index(&self) -> u64 {
        self.block_index
    }

    pub fn status(&self) -> MiningStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MiningStatus> {
        self.status.clone()
    }

    /// Ask the nonce search to stop. The cycle then ends as `failed` and the
    /// chain is left untouched.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the cycle ends and return its final status.
    pub fn wait(self) -> MiningStatus {
        if self.worker.join().is_err() {
            warn!("MINER - worker for block #{} panicked", self.block_index);
        }
        self.status.borrow().clone()
    }
}

/// Clears the in-progress flag on every exit path, unwinding included.
struct InProgressGuard<'a>(&'a AtomicBool);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Claim the single-flight gate and spawn the miner.
pub(super) fn start(
    shared: &Arc<Shared>,
    reward_address: &str,
    callback: Option<StatusCallback>,
) -> Result<MiningHandle, MiningError> {
    if shared
        .mining_in_progress
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return Err(MiningError::AlreadyInProgress);
    }

    let block_index = shared.state.lock().last_block().index + 1;
    let status = shared.status.subscribe();
    // The callback only ever runs on the miner threads, never on the caller's.
    shared.publish(
        MiningStatus::at(MiningState::Starting, 0, Some(block_index)),
        None,
    );

    let cancel = Arc::new(AtomicBool::new(false));
    *shared.cancel.lock() = Arc::clone(&cancel);
    let spawned = {
        let shared = Arc::clone(shared);
        let cancel = Arc::clone(&cancel);
        let reward_address = reward_address.to_string();
        thread::Builder::new()
            .name(format!("miner-{block_index}"))
            .spawn(move || run_cycle(&shared, &reward_address, &cancel, callback))
    };

    match spawned {
        Ok(worker) => {
            info!("MINER - started block #{block_index} for {reward_address}");
            Ok(MiningHandle {
                block_index,
                status,
                cancel,
                worker,
            })
        }
        Err(e) => {
            shared.publish(MiningStatus::failed(Some(block_index), e.to_string()), None);
            shared.mining_in_progress.store(false, Ordering::Release);
            Err(MiningError::Spawn(e))
        }
    }
}

fn run_cycle(
    shared: &Arc<Shared>,
    reward_address: &str,
    cancel: &AtomicBool,
    callback: Option<StatusCallback>,
) {
    let _in_progress = InProgressGuard(&shared.mining_in_progress);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        mine_once(shared, reward_address, cancel, callback.as_ref())
    }));
    let status = match outcome {
        Ok(Ok(status)) => status,
        Ok(Err((block_index, e))) => {
            warn!("MINER - block #{block_index} not sealed: {e}");
            MiningStatus::failed(Some(block_index), e.to_string())
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!("MINER - cycle panicked: {reason}");
            MiningStatus::failed(None, reason)
        }
    };
    shared.publish(status, callback.as_ref());
}

fn mine_once(
    shared: &Arc<Shared>,
    reward_address: &str,
    cancel: &AtomicBool,
    callback: Option<&StatusCallback>,
) -> Result<MiningStatus, (u64, MiningError)> {
    // Snapshot under the lock, search without it.
    let (mut block, difficulty, snapshot_len) = {
        let state = shared.state.lock();
        let tip = state.last_block();
        let block = Block::new(tip.index + 1, tip.hash.clone(), state.pending.clone());
        (block, state.difficulty, state.pending.len())
    };
    let block_index = block.index;
    shared.publish(
        MiningStatus::at(MiningState::Mining, 0, Some(block_index)),
        callback,
    );

    let search_done = Arc::new(AtomicBool::new(false));
    let reporter = spawn_progress_reporter(shared, &search_done, callback.cloned());

    let searched = block.mine_cancellable(difficulty, cancel);

    search_done.store(true, Ordering::Release);
    if let Some(reporter) = reporter {
        reporter.thread().unpark();
        if reporter.join().is_err() {
            warn!("MINER - progress reporter panicked");
        }
    }

    let elapsed = searched.map_err(|e| (block_index, e))?;
    let status = MiningStatus::completed(&block, elapsed);

    let mut state = shared.state.lock();
    let keep_from = snapshot_len.min(state.pending.len());
    let late = state.pending.split_off(keep_from);
    state.chain.push(block);
    let reward = Transaction::system(reward_address, state.mining_reward);
    state.pending = vec![reward];
    if shared.carry_over_pending {
        state.pending.extend(late);
    } else if !late.is_empty() {
        warn!(
            "MINER - dropped {} transfer(s) queued while block #{block_index} was mined",
            late.len()
        );
    }
    drop(state);

    info!(
        "MINER - sealed block #{} (hash={}, txs={}, {:.3}s)",
        block_index,
        status.hash.as_deref().unwrap_or_default(),
        snapshot_len,
        elapsed.as_secs_f64()
    );
    Ok(status)
}

/// Bumps `progress` by a random 1..=5 every tick until the search is done.
fn spawn_progress_reporter(
    shared: &Arc<Shared>,
    search_done: &Arc<AtomicBool>,
    callback: Option<StatusCallback>,
) -> Option<JoinHandle<()>> {
    let shared = Arc::clone(shared);
    let done = Arc::clone(search_done);
    let tick = shared.progress_tick;

    let spawned = thread::Builder::new()
        .name("mining-progress".into())
        .spawn(move || {
            let mut rng = rand::thread_rng();
            let mut progress = 0u8;
            loop {
                thread::park_timeout(tick);
                if done.load(Ordering::Acquire) {
                    break;
                }
                let next = progress
                    .saturating_add(rng.gen_range(1..=5))
                    .min(PROGRESS_CAP);
                if next == progress {
                    continue;
                }
                progress = next;
                let mut published = None;
                shared.status.send_if_modified(|s| {
                    if s.status != MiningState::Mining {
                        return false;
                    }
                    s.progress = progress;
                    published = Some(s.clone());
                    true
                });
                if let (Some(cb), Some(status)) = (&callback, published) {
                    cb(&status);
                }
            }
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            // Progress is cosmetic; mine without it.
            warn!("MINER - progress reporter unavailable: {e}");
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "mining task panicked".to_string()
    }
}
