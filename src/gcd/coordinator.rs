//! Shard coordinator for the parallel batch-GCD
//!
//! The coordinator is responsible for:
//! - Partitioning the modulus table into k contiguous shards
//! - Spawning one worker thread per shard
//! - Driving the two-phase tree protocol
//! - Collecting per-leaf gcds into globally-indexed matches
//!
//! Protocol, per worker i:
//!
//!   phase 1   driver -> worker   ProductTree { moduli }
//!             worker -> driver   ProductTreeDone { top }
//!   phase 2   driver -> worker   RemainderTree { head }
//!             worker -> driver   RemainderTreeDone { gcds }
//!
//! Between the phases the driver builds a head product tree over the
//! k shard roots and runs its remainder tree, yielding
//! H_i = P mod root_i^2. Splicing H_i in as worker i's root remainder
//! makes the sharded result bit-for-bit identical to a monolithic
//! run: the head tree is exactly the top log2(k) levels of the
//! monolithic remainder tree.
//!
//! Any worker failure fails the audit; partial results are not
//! meaningful and the run is simply repeated.

use crate::error::{ConfigError, Result, SweepError, WorkerError, WorkerResult};
use crate::gcd::driver::partition_gcds;
use crate::gcd::tree::ProductTree;
use crossbeam_channel::{bounded, Receiver, Sender};
use num_bigint::BigUint;
use num_traits::One;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info};

/// One non-trivial divisor found by the audit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Global index into the modulus table
    pub index: usize,

    /// The shared divisor, gcd(N_index, P / N_index)
    pub divisor: BigUint,
}

/// Driver-to-worker messages
enum ToWorker {
    ProductTree { moduli: Vec<BigUint> },
    RemainderTree { head: BigUint },
}

/// Worker-to-driver messages
enum FromWorker {
    ProductTreeDone { top: BigUint },
    RemainderTreeDone { gcds: Vec<BigUint> },
}

/// A spawned GCD worker and its channel endpoints
struct GcdWorker {
    id: usize,
    tx: Option<Sender<ToWorker>>,
    rx: Receiver<FromWorker>,
    handle: Option<JoinHandle<WorkerResult<()>>>,
}

impl GcdWorker {
    /// Spawn a worker thread. Channels are bounded to one message:
    /// the protocol is strictly request/reply.
    fn spawn(id: usize) -> WorkerResult<Self> {
        let (to_tx, to_rx) = bounded::<ToWorker>(1);
        let (from_tx, from_rx) = bounded::<FromWorker>(1);

        let handle = thread::Builder::new()
            .name(format!("gcd-{}", id))
            .spawn(move || worker_loop(id, to_rx, from_tx))
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            tx: Some(to_tx),
            rx: from_rx,
            handle: Some(handle),
        })
    }

    fn send(&self, msg: ToWorker) -> WorkerResult<()> {
        self.tx
            .as_ref()
            .ok_or(WorkerError::ChannelClosed { id: self.id })?
            .send(msg)
            .map_err(|_| WorkerError::ChannelClosed { id: self.id })
    }

    fn recv(&self) -> WorkerResult<FromWorker> {
        self.rx
            .recv()
            .map_err(|_| WorkerError::ChannelClosed { id: self.id })
    }

    /// Join the thread. Dropping the sender first unblocks a worker
    /// still waiting for a message on an aborted run.
    fn join(&mut self) -> WorkerResult<()> {
        self.tx.take();
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => Err(WorkerError::Panicked { id: self.id }),
            },
            None => Ok(()),
        }
    }
}

/// Worker thread body: one pass through the two-phase protocol.
fn worker_loop(
    id: usize,
    rx: Receiver<ToWorker>,
    tx: Sender<FromWorker>,
) -> WorkerResult<()> {
    let moduli = match rx.recv() {
        Ok(ToWorker::ProductTree { moduli }) => moduli,
        Ok(_) => {
            return Err(WorkerError::Protocol {
                id,
                expected: "ProductTree",
            })
        }
        Err(_) => return Err(WorkerError::ChannelClosed { id }),
    };

    debug!(worker = id, moduli = moduli.len(), "Building shard product tree");
    let tree = ProductTree::build(moduli);
    tx.send(FromWorker::ProductTreeDone {
        top: tree.root().clone(),
    })
    .map_err(|_| WorkerError::ChannelClosed { id })?;

    let head = match rx.recv() {
        Ok(ToWorker::RemainderTree { head }) => head,
        Ok(_) => {
            return Err(WorkerError::Protocol {
                id,
                expected: "RemainderTree",
            })
        }
        Err(_) => return Err(WorkerError::ChannelClosed { id }),
    };

    debug!(worker = id, "Evaluating shard remainder tree");
    let gcds = partition_gcds(&tree, Some(&head));
    tx.send(FromWorker::RemainderTreeDone { gcds })
        .map_err(|_| WorkerError::ChannelClosed { id })?;

    Ok(())
}

/// Coordinates the sharded batch-GCD computation
pub struct AuditCoordinator {
    worker_count: usize,
}

impl AuditCoordinator {
    /// Create a coordinator for k workers. k must be a power of two;
    /// divisibility against the modulus count is checked in `run`.
    pub fn new(worker_count: usize) -> Self {
        Self { worker_count }
    }

    /// Run the audit over a padded modulus table.
    ///
    /// Returns matches in ascending global index order. Pad entries
    /// (modulus 1) always gcd to 1 and are suppressed with every
    /// other trivial result.
    pub fn run(&self, moduli: &[BigUint]) -> Result<Vec<Match>> {
        let n = moduli.len();
        let k = self.worker_count;

        if k == 0 || !k.is_power_of_two() || k > n || n % k != 0 {
            return Err(SweepError::Config(ConfigError::WorkerCountMismatch {
                workers: k,
                moduli: n,
            }));
        }

        let shard_len = n / k;
        let start = Instant::now();
        info!(moduli = n, workers = k, shard = shard_len, "Starting batch-GCD audit");

        let mut workers = Vec::with_capacity(k);
        for id in 0..k {
            workers.push(GcdWorker::spawn(id)?);
        }

        let result = self.drive(moduli, shard_len, &mut workers);

        // Join everyone. A worker-side error explains a channel
        // failure better than the failure itself, so keep the first
        // error that is not a disconnect cascade.
        let mut join_error: Option<WorkerError> = None;
        for worker in &mut workers {
            if let Err(e) = worker.join() {
                match (&join_error, &e) {
                    (None, _) => join_error = Some(e),
                    (
                        Some(WorkerError::ChannelClosed { .. }),
                        WorkerError::ChannelClosed { .. },
                    ) => {}
                    (Some(WorkerError::ChannelClosed { .. }), _) => join_error = Some(e),
                    _ => {}
                }
            }
        }

        let matches = match (result, join_error) {
            (Ok(m), None) => m,
            (_, Some(e)) if !matches!(e, WorkerError::ChannelClosed { .. }) => {
                return Err(SweepError::Worker(e))
            }
            (Err(e), _) => return Err(SweepError::Worker(e)),
            (Ok(_), Some(e)) => return Err(SweepError::Worker(e)),
        };

        info!(
            matches = matches.len(),
            duration_secs = start.elapsed().as_secs(),
            "Audit completed"
        );
        Ok(matches)
    }

    /// The two protocol phases, with worker join handled by `run`.
    fn drive(
        &self,
        moduli: &[BigUint],
        shard_len: usize,
        workers: &mut [GcdWorker],
    ) -> WorkerResult<Vec<Match>> {
        // Phase 1: distribute shards, collect product-tree roots
        for (worker, shard) in workers.iter().zip(moduli.chunks(shard_len)) {
            worker.send(ToWorker::ProductTree {
                moduli: shard.to_vec(),
            })?;
        }

        let mut roots = Vec::with_capacity(workers.len());
        for worker in workers.iter() {
            match worker.recv()? {
                FromWorker::ProductTreeDone { top } => roots.push(top),
                _ => {
                    return Err(WorkerError::Protocol {
                        id: worker.id,
                        expected: "ProductTreeDone",
                    })
                }
            }
        }

        // Head splice: the upper log2(k) levels of the overall
        // remainder tree, evaluated on the driver.
        debug!(roots = roots.len(), "Building head tree");
        let head_tree = ProductTree::build(roots);
        let heads = head_tree.remainders(None);

        // Phase 2: hand each worker its head remainder, collect gcds
        for (worker, head) in workers.iter().zip(heads) {
            worker.send(ToWorker::RemainderTree { head })?;
        }

        let mut matches = Vec::new();
        for (i, worker) in workers.iter().enumerate() {
            match worker.recv()? {
                FromWorker::RemainderTreeDone { gcds } => {
                    if gcds.len() != shard_len {
                        return Err(WorkerError::Protocol {
                            id: worker.id,
                            expected: "one gcd per shard modulus",
                        });
                    }
                    let base = i * shard_len;
                    matches.extend(
                        gcds.into_iter()
                            .enumerate()
                            .filter(|(_, g)| !g.is_one())
                            .map(|(j, divisor)| Match {
                                index: base + j,
                                divisor,
                            }),
                    );
                }
                _ => {
                    return Err(WorkerError::Protocol {
                        id: worker.id,
                        expected: "RemainderTreeDone",
                    })
                }
            }
        }

        Ok(matches)
    }
}
