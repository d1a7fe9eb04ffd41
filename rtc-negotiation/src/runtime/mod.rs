//! Single-threaded run loops.
//!
//! An [`ExecutionContext`] owns one named OS thread that executes posted tasks
//! strictly in FIFO order. Two tasks posted to the same context never run
//! concurrently; tasks on different contexts do. Posting never blocks the
//! caller, and tasks posted before [`ExecutionContext::start`] are queued
//! without loss.
//!
//! State that must only ever be touched from one context is wrapped in a
//! [`Confined`] handle: the value itself lives inside the run loop and is only
//! reachable through closures executed there.
//!
//! ```
//! use rtc_negotiation::runtime::ExecutionContext;
//! use std::sync::mpsc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = ExecutionContext::new("worker");
//! ctx.start()?;
//!
//! let counter = ctx.confine(|| 0u32)?;
//! for _ in 0..3 {
//!     counter.post(|n| *n += 1)?;
//! }
//!
//! let (tx, rx) = mpsc::channel();
//! counter.post(move |n| {
//!     let _ = tx.send(*n);
//! })?;
//! assert_eq!(rx.recv()?, 3);
//!
//! ctx.stop();
//! # Ok(())
//! # }
//! ```

mod confined;
mod thread_pool;

pub use confined::Confined;
pub use thread_pool::ThreadPool;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};

use log::{debug, trace, warn};
use shared::error::{Error, Result};
use tokio::sync::mpsc;

pub(crate) type SlotKey = u64;

type LocalTask = Box<dyn FnOnce(&mut Slots) + Send + 'static>;

enum Envelope {
    Run(LocalTask),
    Quit,
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
enum RunState {
    #[default]
    Created = 0,
    Running = 1,
    Stopped = 2,
}

impl From<u8> for RunState {
    fn from(v: u8) -> Self {
        match v {
            1 => RunState::Running,
            2 => RunState::Stopped,
            _ => RunState::Created,
        }
    }
}

/// Values confined to a run loop, keyed by the [`Confined`] handles that own them.
#[derive(Default)]
pub(crate) struct Slots {
    entries: HashMap<SlotKey, Box<dyn Any>>,
}

impl Slots {
    pub(crate) fn insert<T: 'static>(&mut self, key: SlotKey, value: T) {
        self.entries.insert(key, Box::new(value));
    }

    pub(crate) fn get_mut<T: 'static>(&mut self, key: SlotKey) -> Option<&mut T> {
        self.entries
            .get_mut(&key)
            .and_then(|value| value.downcast_mut::<T>())
    }

    pub(crate) fn remove(&mut self, key: SlotKey) -> bool {
        self.entries.remove(&key).is_some()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

struct ContextInner {
    name: String,
    tx: mpsc::UnboundedSender<Envelope>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: OnceLock<ThreadId>,
    state: Arc<AtomicU8>,
    next_slot: AtomicU64,
}

/// A cloneable handle to a single-threaded run loop.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("name", &self.inner.name)
            .field("state", &RunState::from(self.inner.state.load(Ordering::SeqCst)))
            .finish()
    }
}

impl ExecutionContext {
    /// Creates a context whose thread is not running yet.
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(ContextInner {
                name: name.into(),
                tx,
                rx: Mutex::new(Some(rx)),
                handle: Mutex::new(None),
                thread_id: OnceLock::new(),
                state: Arc::new(AtomicU8::new(RunState::Created as u8)),
                next_slot: AtomicU64::new(1),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Spawns the context thread. Starting an already started context is a no-op.
    pub fn start(&self) -> Result<()> {
        let rx = match self.inner.rx.lock()?.take() {
            Some(rx) => rx,
            None => {
                warn!("Starting execution context {} more than once", self.name());
                return Ok(());
            }
        };

        let state = Arc::clone(&self.inner.state);
        state.store(RunState::Running as u8, Ordering::SeqCst);
        let name = self.inner.name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_loop(name, rx, state))
            .map_err(|err| {
                self.inner
                    .state
                    .store(RunState::Stopped as u8, Ordering::SeqCst);
                Error::ErrExecutionContextSpawn(self.inner.name.clone(), err.to_string())
            })?;

        let _ = self.inner.thread_id.set(handle.thread().id());
        *self.inner.handle.lock()? = Some(handle);
        debug!("execution context {} started", self.name());

        Ok(())
    }

    /// Returns true once started and until the loop has exited.
    pub fn is_running(&self) -> bool {
        RunState::from(self.inner.state.load(Ordering::SeqCst)) == RunState::Running
    }

    /// Returns true when called from a task executing on this context.
    pub fn is_current(&self) -> bool {
        self.inner
            .thread_id
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }

    /// Enqueues `task` for execution on this context.
    pub fn post<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_local(move |_: &mut Slots| task())
    }

    pub(crate) fn post_local<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce(&mut Slots) + Send + 'static,
    {
        self.inner
            .tx
            .send(Envelope::Run(Box::new(task)))
            .map_err(|_| Error::ErrExecutionContextStopped(self.inner.name.clone()))
    }

    /// Constructs a value on this context and returns the handle that owns it.
    ///
    /// `init` runs on the context thread, so `T` itself never crosses threads.
    pub fn confine<T, F>(&self, init: F) -> Result<Confined<T>>
    where
        T: 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.confine_with(move |_| init())
    }

    /// Like [`confine`](Self::confine), but `init` also receives the handle of
    /// the value it builds, so the value can post work back to itself.
    pub fn confine_with<T, F>(&self, init: F) -> Result<Confined<T>>
    where
        T: 'static,
        F: FnOnce(Confined<T>) -> T + Send + 'static,
    {
        let key = self.inner.next_slot.fetch_add(1, Ordering::SeqCst);
        let handle = Confined::new(key, self.clone());
        let this = handle.clone();
        self.post_local(move |slots: &mut Slots| slots.insert(key, init(this)))?;
        Ok(handle)
    }

    /// Runs every queued task, then lets the thread exit.
    ///
    /// Blocks until the thread has exited unless called from the context itself.
    pub fn stop(&self) {
        if self.inner.tx.send(Envelope::Quit).is_err() {
            trace!("execution context {} already stopped", self.name());
        }

        if self.is_current() {
            warn!(
                "execution context {} stopped from its own thread, not joining",
                self.name()
            );
            return;
        }

        let handle = match self.inner.handle.lock() {
            Ok(mut handle) => handle.take(),
            Err(err) => {
                warn!("execution context {} handle poisoned: {err}", self.name());
                None
            }
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("execution context {} panicked", self.name());
            }
        } else if RunState::from(self.inner.state.load(Ordering::SeqCst)) == RunState::Created {
            self.inner
                .state
                .store(RunState::Stopped as u8, Ordering::SeqCst);
        }
    }
}

fn run_loop(name: String, mut rx: mpsc::UnboundedReceiver<Envelope>, state: Arc<AtomicU8>) {
    let mut slots = Slots::default();

    while let Some(envelope) = rx.blocking_recv() {
        match envelope {
            Envelope::Run(task) => task(&mut slots),
            Envelope::Quit => {
                // Drain whatever is still queued, including tasks posted by drained tasks.
                while let Ok(envelope) = rx.try_recv() {
                    if let Envelope::Run(task) = envelope {
                        task(&mut slots);
                    }
                }
                break;
            }
        }
    }

    rx.close();
    state.store(RunState::Stopped as u8, Ordering::SeqCst);
    debug!(
        "execution context {name} exiting, dropping {} confined values",
        slots.len()
    );
}
