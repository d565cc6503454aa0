//! Serial execution queues which the [Dispatcher](crate::Dispatcher)
//! delivers messages on.
//!
//! Each [Queue] owns one worker thread. Jobs submitted to a queue run
//! one at a time, in submission order, and separate queues run
//! concurrently with respect to each other. Delayed jobs are held by
//! the worker in a timer heap and run once their deadline passes.

use crate::{QueueError, QueueLabel};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use std::{
    any::Any,
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{self, AtomicBool},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Command {
    Run(Job),
    RunAt(Instant, Job),
    Shutdown,
}

/// A job waiting in the worker's timer heap.
struct Timer {
    deadline: Instant,
    /// Breaks deadline ties in submission order.
    seq: u64,
    job: Job,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    // Reversed, so that the `BinaryHeap` pops the earliest deadline.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run a job on the worker, a panic is logged and does not stop the
/// worker.
fn run_job(label: &QueueLabel, job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        log::error!(
            "job on execution queue `{}` panicked: {}",
            label,
            panic_message(&*payload)
        );
    }
}

fn run_worker(label: QueueLabel, receiver: Receiver<Command>) {
    log::debug!("execution queue `{}` started", label);

    let mut timers: BinaryHeap<Timer> = BinaryHeap::new();
    let mut next_seq: u64 = 0;

    loop {
        let now = Instant::now();
        while timers.peek().map_or(false, |timer| timer.deadline <= now) {
            if let Some(timer) = timers.pop() {
                run_job(&label, timer.job);
            }
        }

        let command = match timers.peek() {
            Some(timer) => match receiver.recv_deadline(timer.deadline) {
                Ok(command) => command,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match receiver.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        match command {
            Command::Run(job) => run_job(&label, job),
            Command::RunAt(deadline, job) => {
                timers.push(Timer {
                    deadline,
                    seq: next_seq,
                    job,
                });
                next_seq += 1;
            }
            Command::Shutdown => break,
        }
    }

    if !timers.is_empty() {
        log::debug!(
            "execution queue `{}` discarded {} pending timer(s)",
            label,
            timers.len()
        );
    }
    log::debug!("execution queue `{}` stopped", label);
}

/// A named serial execution queue backed by a single worker thread.
///
/// Dropping the queue shuts it down, see [Queue::shutdown()].
pub struct Queue {
    label: QueueLabel,
    sender: Sender<Command>,
    closed: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Queue {
    /// Start a new queue with a worker thread named `perdux-<label>`.
    pub fn spawn<L: Into<QueueLabel>>(label: L) -> Result<Self, QueueError> {
        let label = label.into();
        let (sender, receiver) = crossbeam_channel::unbounded();

        let worker_label = label.clone();
        let worker = thread::Builder::new()
            .name(format!("perdux-{}", label))
            .spawn(move || run_worker(worker_label, receiver))
            .map_err(|source| QueueError::Spawn {
                label: label.clone(),
                source,
            })?;

        Ok(Self {
            label,
            sender,
            closed: AtomicBool::new(false),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn label(&self) -> &QueueLabel {
        &self.label
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(atomic::Ordering::SeqCst)
    }

    fn closed_error(&self) -> QueueError {
        QueueError::Closed {
            label: self.label.clone(),
        }
    }

    fn send(&self, command: Command) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(self.closed_error());
        }

        self.sender
            .send(command)
            .map_err(|_| self.closed_error())
    }

    /// Enqueue a job and return immediately.
    pub fn exec<F: FnOnce() + Send + 'static>(&self, job: F) -> Result<(), QueueError> {
        self.send(Command::Run(Box::new(job)))
    }

    /// Enqueue a job and block the calling thread until it has run.
    ///
    /// If the job panics, the panic is resumed on the calling thread.
    ///
    /// # Deadlocks
    ///
    /// Calling this from a job which is already running on this queue
    /// blocks forever, because the worker is busy running the caller.
    pub fn exec_sync<F: FnOnce() + Send + 'static>(&self, job: F) -> Result<(), QueueError> {
        let (done_sender, done_receiver) = crossbeam_channel::bounded(1);

        self.send(Command::Run(Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job));
            // The caller is blocked on the receiver, so this can't fail.
            let _ = done_sender.send(result);
        })))?;

        match done_receiver.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            // The job was dropped without running, the queue shut down
            // before reaching it.
            Err(_) => Err(self.closed_error()),
        }
    }

    /// Enqueue a job to run once `delay` has elapsed. The timer can't
    /// be cancelled, and is discarded if the queue shuts down first.
    ///
    /// A `delay` too large to represent as an [Instant] never fires;
    /// the job is dropped straight away.
    pub fn exec_after<F: FnOnce() + Send + 'static>(
        &self,
        delay: Duration,
        job: F,
    ) -> Result<(), QueueError> {
        match Instant::now().checked_add(delay) {
            Some(deadline) => self.exec_at(deadline, job),
            None => {
                if self.is_closed() {
                    return Err(self.closed_error());
                }

                log::debug!(
                    "execution queue `{}` dropped a timer with unreachable delay {:?}",
                    self.label,
                    delay
                );
                Ok(())
            }
        }
    }

    /// Enqueue a job to run once `deadline` has passed.
    fn exec_at<F: FnOnce() + Send + 'static>(
        &self,
        deadline: Instant,
        job: F,
    ) -> Result<(), QueueError> {
        self.send(Command::RunAt(deadline, Box::new(job)))
    }

    /// Stop accepting jobs, let the worker finish the jobs queued
    /// before this call, and wait for it to exit. Timers which have not
    /// fired yet are discarded.
    ///
    /// When called from a job on this queue, the worker exits after
    /// that job without being joined.
    pub fn shutdown(&self) {
        if self.closed.swap(true, atomic::Ordering::SeqCst) {
            return;
        }

        // The worker only exits after receiving this, so it can't fail.
        let _ = self.sender.send(Command::Shutdown);

        if let Some(worker) = self.worker.lock().take() {
            if worker.thread().id() == thread::current().id() {
                return;
            }

            if worker.join().is_err() {
                log::error!("worker for execution queue `{}` panicked", self.label);
            }
        }
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("label", &self.label)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A registry of [Queue]s by [QueueLabel]. Queues are spawned the
/// first time their label is requested.
#[derive(Default)]
pub struct Queues {
    queues: RwLock<HashMap<QueueLabel, Arc<Queue>>>,
    closed: AtomicBool,
}

impl Queues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the queue for `label`, spawning it if it doesn't exist yet.
    pub fn get(&self, label: &QueueLabel) -> Result<Arc<Queue>, QueueError> {
        if self.closed.load(atomic::Ordering::SeqCst) {
            return Err(QueueError::Closed {
                label: label.clone(),
            });
        }

        if let Some(queue) = self.queues.read().get(label) {
            return Ok(queue.clone());
        }

        let mut queues = self.queues.write();
        // Another thread may have spawned it between the two locks.
        if let Some(queue) = queues.get(label) {
            return Ok(queue.clone());
        }

        let queue = Arc::new(Queue::spawn(label.clone())?);
        queues.insert(label.clone(), queue.clone());
        Ok(queue)
    }

    /// The main (UI) queue, labelled [QueueLabel::MAIN].
    pub fn main(&self) -> Result<Arc<Queue>, QueueError> {
        self.get(&QueueLabel::MAIN)
    }

    /// Returns `true` if a queue for `label` has been spawned.
    pub fn contains(&self, label: &QueueLabel) -> bool {
        self.queues.read().contains_key(label)
    }

    /// Shut down every queue in this registry. Afterwards
    /// [Queues::get()] fails with [QueueError::Closed].
    pub fn shutdown(&self) {
        self.closed.store(true, atomic::Ordering::SeqCst);

        let queues: Vec<Arc<Queue>> = self
            .queues
            .write()
            .drain()
            .map(|(_, queue)| queue)
            .collect();
        for queue in queues {
            queue.shutdown();
        }
    }
}

impl Drop for Queues {
    fn drop(&mut self) {
        self.shutdown();
    }
}
