//! # Stress Harness
//!
//! ```text
//!   Writer 0 ──┐                        ┌──▶ Replica 0 ──┐
//!   Writer 1 ──┼──▶ Source<Ledger, S> ──┼──▶ Replica 1 ──┼──▶ [report channel] ──▶ StressReport
//!   Writer N ──┘                        └──▶ Replica M ──┘
//! ```
//!
//! Writers run a seeded mix of every write operation, including fallible
//! ones that are made to fail. Readers resync in a loop and check each value
//! they see. At the end the source version must equal the number of
//! committed writes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Sender};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use replicable_core::{Boxed, Inline, ReplicaStats, Source, Storage, Version};

use crate::config::{StrategyKind, StressConfig};
use crate::error::{HarnessError, HarnessResult};

/// The shared payload: a row of cells sealed by a checksum.
///
/// Every committed value is sealed. A replica that ever sees an unsealed
/// ledger has observed a half-applied write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    /// Bumped by every in-place edit.
    pub revision: u64,
    /// Payload cells.
    pub cells: Vec<u64>,
    /// Digest of `revision` and `cells`.
    pub checksum: u64,
}

impl Ledger {
    /// A sealed ledger of `len` zeroed cells.
    #[must_use]
    pub fn new(len: usize) -> Self {
        let mut ledger = Self {
            revision: 0,
            cells: vec![0; len],
            checksum: 0,
        };
        ledger.seal();
        ledger
    }

    /// A sealed ledger filled from `rng`.
    fn random(len: usize, rng: &mut ChaCha8Rng) -> Self {
        let mut ledger = Self {
            revision: rng.gen(),
            cells: (0..len).map(|_| rng.gen()).collect(),
            checksum: 0,
        };
        ledger.seal();
        ledger
    }

    /// Whether the checksum matches the contents.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.checksum == Self::digest(self.revision, &self.cells)
    }

    /// Edits one cell in place, leaving the ledger unsealed.
    fn scribble(&mut self, rng: &mut ChaCha8Rng) {
        let index = rng.gen_range(0..self.cells.len());
        self.cells[index] = self.cells[index].wrapping_add(rng.gen_range(1..1_000));
        self.revision = self.revision.wrapping_add(1);
    }

    fn seal(&mut self) {
        self.checksum = Self::digest(self.revision, &self.cells);
    }

    fn digest(revision: u64, cells: &[u64]) -> u64 {
        cells
            .iter()
            .fold(revision ^ 0x9E37_79B9_7F4A_7C15, |acc, &cell| {
                (acc.rotate_left(17) ^ cell).wrapping_mul(0xFF51_AFD7_ED55_8CCD)
            })
    }
}

/// Outcome of a stress run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StressReport {
    /// Strategy the run used.
    pub strategy: StrategyKind,
    /// Source version after all writers finished.
    pub final_version: Version,
    /// Writes that committed.
    pub committed_writes: u64,
    /// Fallible writes that were rejected and rolled back.
    pub rejected_writes: u64,
    /// Reader checks answered without locking, summed over replicas.
    pub fast_path_hits: u64,
    /// Reader checks that resynced, summed over replicas.
    pub resyncs: u64,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

/// Write operations a writer picks from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriteOp {
    Set,
    SetCloned,
    Modify,
    TryModify,
    TrySet,
    Replace,
}

impl WriteOp {
    /// `Replace` is last so it can be sliced off.
    const ALL: &'static [Self] = &[
        Self::Set,
        Self::SetCloned,
        Self::Modify,
        Self::TryModify,
        Self::TrySet,
        Self::Replace,
    ];
}

/// Grafts a pre-built value in wholesale. Only strategies that support it.
type ReplaceFn<S> = fn(&Source<Ledger, S>, Ledger);

fn replace_boxed(source: &Source<Ledger, Boxed>, ledger: Ledger) {
    source.replace(Box::new(ledger));
}

enum WorkerReport {
    Writer { committed: u64, rejected: u64 },
    Reader { stats: ReplicaStats },
    Violation { worker: String, detail: String },
}

/// Runs the harness described by `config`.
///
/// # Errors
///
/// [`HarnessError::InvalidConfig`] for a bad config,
/// [`HarnessError::InvariantViolated`] if any worker saw a broken invariant,
/// [`HarnessError::WorkerPanicked`] if a worker thread panicked.
pub fn run(config: &StressConfig) -> HarnessResult<StressReport> {
    config.validate()?;
    tracing::info!(
        strategy = config.strategy.as_str(),
        writers = config.writers,
        readers = config.readers,
        attempts = config.total_attempts(),
        "stress run starting"
    );

    let report = match config.strategy {
        StrategyKind::Inline => run_with::<Inline>(config, None),
        StrategyKind::Boxed => run_with::<Boxed>(config, Some(replace_boxed as ReplaceFn<Boxed>)),
    }?;

    tracing::info!(
        strategy = report.strategy.as_str(),
        version = report.final_version,
        committed = report.committed_writes,
        rejected = report.rejected_writes,
        fast_path_hits = report.fast_path_hits,
        resyncs = report.resyncs,
        elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
        "stress run finished"
    );
    Ok(report)
}

fn run_with<S>(config: &StressConfig, replace: Option<ReplaceFn<S>>) -> HarnessResult<StressReport>
where
    S: Storage<Ledger>,
    S::Stored: Send,
{
    let source = Source::<Ledger, S>::new(Ledger::new(config.payload_len));
    let writers_done = AtomicBool::new(false);
    let (tx, rx) = unbounded();
    let started = Instant::now();

    let joined: Result<(), HarnessError> = thread::scope(|scope| {
        let readers: Vec<_> = (0..config.readers)
            .map(|index| {
                let tx = tx.clone();
                let source = &source;
                let done = &writers_done;
                thread::Builder::new()
                    .name(format!("reader-{index}"))
                    .spawn_scoped(scope, move || read_loop(index, source, done, &tx))
            })
            .collect();

        let writers: Vec<_> = (0..config.writers)
            .map(|index| {
                let tx = tx.clone();
                let source = &source;
                thread::Builder::new()
                    .name(format!("writer-{index}"))
                    .spawn_scoped(scope, move || write_loop(index, config, source, replace, &tx))
            })
            .collect();

        let mut outcome = Ok(());
        for (index, writer) in writers.into_iter().enumerate() {
            if join_worker(writer, format!("writer-{index}")).is_err() && outcome.is_ok() {
                outcome = Err(HarnessError::WorkerPanicked(format!("writer-{index}")));
            }
        }
        writers_done.store(true, Ordering::Release);
        for (index, reader) in readers.into_iter().enumerate() {
            if join_worker(reader, format!("reader-{index}")).is_err() && outcome.is_ok() {
                outcome = Err(HarnessError::WorkerPanicked(format!("reader-{index}")));
            }
        }
        outcome
    });
    drop(tx);
    joined?;

    let mut report = StressReport {
        strategy: config.strategy,
        final_version: source.version(),
        elapsed: started.elapsed(),
        ..StressReport::default()
    };
    let mut first_violation = None;
    for message in rx {
        match message {
            WorkerReport::Writer { committed, rejected } => {
                report.committed_writes += committed;
                report.rejected_writes += rejected;
            }
            WorkerReport::Reader { stats } => {
                report.fast_path_hits += stats.fast_path_hits;
                report.resyncs += stats.resyncs;
            }
            WorkerReport::Violation { worker, detail } => {
                tracing::warn!(%worker, %detail, "invariant violated");
                if first_violation.is_none() {
                    first_violation = Some(HarnessError::InvariantViolated { worker, detail });
                }
            }
        }
    }
    if let Some(violation) = first_violation {
        return Err(violation);
    }

    if report.final_version != report.committed_writes {
        return Err(HarnessError::InvariantViolated {
            worker: "harness".into(),
            detail: format!(
                "source version {} != committed writes {}",
                report.final_version, report.committed_writes
            ),
        });
    }

    let mut late = source.replica();
    late.ensure_up_to_date();
    if !late.get().is_sealed() || late.version() != report.final_version {
        return Err(HarnessError::InvariantViolated {
            worker: "harness".into(),
            detail: "final replica does not match the source".into(),
        });
    }

    Ok(report)
}

/// Joins a spawned worker, logging a spawn failure or panic.
fn join_worker(
    spawned: std::io::Result<thread::ScopedJoinHandle<'_, ()>>,
    name: String,
) -> Result<(), ()> {
    match spawned {
        Ok(handle) => handle.join().map_err(|_| {
            tracing::warn!(worker = %name, "worker panicked");
        }),
        Err(err) => {
            tracing::warn!(worker = %name, error = %err, "worker failed to spawn");
            Err(())
        }
    }
}

/// Hands a worker's result to the harness. A closed channel means the
/// harness has stopped listening; the result is logged and dropped.
fn send_report(tx: &Sender<WorkerReport>, worker: &str, message: WorkerReport) {
    if let Err(err) = tx.send(message) {
        tracing::warn!(%worker, error = %err, "worker report dropped");
    }
}

fn write_loop<S: Storage<Ledger>>(
    index: usize,
    config: &StressConfig,
    source: &Source<Ledger, S>,
    replace: Option<ReplaceFn<S>>,
    tx: &Sender<WorkerReport>,
) {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed ^ (index as u64).wrapping_mul(0x9E37_79B9));
    let fail_probability = f64::from(config.failure_rate_percent) / 100.0;
    let ops = if replace.is_some() {
        WriteOp::ALL
    } else {
        &WriteOp::ALL[..WriteOp::ALL.len() - 1]
    };

    let mut committed = 0_u64;
    let mut rejected = 0_u64;

    for _ in 0..config.writes_per_writer {
        let op = ops[rng.gen_range(0..ops.len())];
        let ok = match op {
            WriteOp::Set => {
                source.set(Ledger::random(config.payload_len, &mut rng));
                true
            }
            WriteOp::SetCloned => {
                let ledger = Ledger::random(config.payload_len, &mut rng);
                source.set_cloned(&ledger);
                true
            }
            WriteOp::Modify => {
                source.modify(|ledger| {
                    ledger.scribble(&mut rng);
                    ledger.seal();
                });
                true
            }
            WriteOp::TryModify => {
                let fail = rng.gen_bool(fail_probability);
                source
                    .try_modify(|ledger| {
                        ledger.scribble(&mut rng);
                        if fail {
                            // Leave it unsealed: a leak would be visible to readers.
                            return Err(());
                        }
                        ledger.seal();
                        Ok(())
                    })
                    .is_ok()
            }
            WriteOp::TrySet => {
                let fail = rng.gen_bool(fail_probability);
                source
                    .try_set_with(|| {
                        if fail {
                            Err(())
                        } else {
                            Ok(Ledger::random(config.payload_len, &mut rng))
                        }
                    })
                    .is_ok()
            }
            WriteOp::Replace => match replace {
                Some(replace) => {
                    replace(source, Ledger::random(config.payload_len, &mut rng));
                    true
                }
                None => false,
            },
        };
        if ok {
            committed += 1;
        } else {
            rejected += 1;
        }
    }

    send_report(tx, &format!("writer-{index}"), WorkerReport::Writer { committed, rejected });
}

fn read_loop<S: Storage<Ledger>>(
    index: usize,
    source: &Source<Ledger, S>,
    writers_done: &AtomicBool,
    tx: &Sender<WorkerReport>,
) {
    let worker = format!("reader-{index}");
    let mut replica = source.replica();
    let mut last_version = replica.version();

    loop {
        let finished = writers_done.load(Ordering::Acquire);
        let version = replica.ensure_up_to_date();

        if version < last_version {
            let detail = format!("version went backwards: {last_version} -> {version}");
            send_report(tx, &worker, WorkerReport::Violation { worker: worker.clone(), detail });
            return;
        }
        if !replica.get().is_sealed() {
            let detail = format!("unsealed ledger at version {version}");
            send_report(tx, &worker, WorkerReport::Violation { worker: worker.clone(), detail });
            return;
        }
        last_version = version;

        if finished {
            break;
        }
        thread::yield_now();
    }

    let stats = replica.stats();
    send_report(tx, &worker, WorkerReport::Reader { stats });
}
