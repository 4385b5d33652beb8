use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Barrier};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::comm::{Collective, Message};
use crate::foundation::core::Rank;
use crate::foundation::error::{CompositeError, CompositeResult};

/// Shared channel fabric for one in-process group.
///
/// Both ends of every channel live here for the lifetime of the group, so a rank that stops
/// participating never disconnects anyone: its peers block, as they would in an MPI job.
struct Fabric {
    size: usize,
    // Indexed [from][to].
    senders: Vec<Vec<Sender<Message>>>,
    // Indexed [to][from].
    receivers: Vec<Vec<Receiver<Message>>>,
    barrier: Barrier,
    on_abort: Box<AbortHandler>,
}

// Called with the aborting rank and exit code just before the process exits.
type AbortHandler = dyn Fn(Rank, i32) + Send + Sync;

/// Exit code used when a rank's thread panics.
pub const PANIC_EXIT_CODE: i32 = 101;

/// In-process process group: one thread per rank, connected by unbounded channels.
pub struct ThreadGroup;

impl ThreadGroup {
    /// Create `size` connected communicators, one per rank, in rank order.
    pub fn connect(size: usize) -> CompositeResult<Vec<ThreadComm>> {
        Self::connect_with_abort_handler(size, |_, _| {})
    }

    /// Like [`ThreadGroup::connect`], running `on_abort` before any abort exits the process.
    ///
    /// The handler may block (it never returns control to the aborting rank either way).
    pub fn connect_with_abort_handler(
        size: usize,
        on_abort: impl Fn(Rank, i32) + Send + Sync + 'static,
    ) -> CompositeResult<Vec<ThreadComm>> {
        if size == 0 {
            return Err(CompositeError::validation("group size must be >= 1"));
        }

        let mut senders = vec![Vec::with_capacity(size); size];
        let mut receivers = vec![Vec::with_capacity(size); size];
        for from in 0..size {
            for to in 0..size {
                let (tx, rx) = unbounded();
                senders[from].push(tx);
                receivers[to].push(rx);
            }
        }
        // receivers[to] was filled in `from` order within each outer iteration.
        let fabric = Arc::new(Fabric {
            size,
            senders,
            receivers,
            barrier: Barrier::new(size),
            on_abort: Box::new(on_abort),
        });

        Ok((0..size)
            .map(|r| ThreadComm {
                rank: Rank(r),
                fabric: Arc::clone(&fabric),
            })
            .collect())
    }

    /// Run `body` once per rank on its own scoped thread and collect the results in rank order.
    ///
    /// Returns only when every rank has returned, so a rank that hangs in a collective hangs this
    /// call too. A rank whose body panics aborts the whole group with [`PANIC_EXIT_CODE`].
    pub fn run<R, F>(size: usize, body: F) -> CompositeResult<Vec<R>>
    where
        R: Send,
        F: Fn(ThreadComm) -> R + Sync,
    {
        Self::run_with_abort_handler(size, |_, _| {}, body)
    }

    /// [`ThreadGroup::run`] over a group built by [`ThreadGroup::connect_with_abort_handler`].
    pub fn run_with_abort_handler<R, F>(
        size: usize,
        on_abort: impl Fn(Rank, i32) + Send + Sync + 'static,
        body: F,
    ) -> CompositeResult<Vec<R>>
    where
        R: Send,
        F: Fn(ThreadComm) -> R + Sync,
    {
        let comms = Self::connect_with_abort_handler(size, on_abort)?;
        let body = &body;
        std::thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    let name = format!("rank-{}", comm.rank.0);
                    std::thread::Builder::new()
                        .name(name)
                        .spawn_scoped(scope, move || run_rank(comm, body))
                })
                .collect::<Result<_, _>>()?;

            let mut out = Vec::with_capacity(handles.len());
            for h in handles {
                out.push(
                    h.join()
                        .map_err(|_| CompositeError::collective("rank thread panicked"))?,
                );
            }
            Ok(out)
        })
    }
}

/// Run one rank's body; a panic must not leave its peers blocked in a collective.
fn run_rank<R>(comm: ThreadComm, body: &(impl Fn(ThreadComm) -> R + Sync)) -> R {
    let handle = comm.clone();
    match panic::catch_unwind(AssertUnwindSafe(|| body(comm))) {
        Ok(out) => out,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::error!(rank = handle.rank.0, panic = %msg, "rank panicked");
            handle.abort(PANIC_EXIT_CODE)
        }
    }
}

/// One rank's endpoint in a [`ThreadGroup`].
#[derive(Clone)]
pub struct ThreadComm {
    rank: Rank,
    fabric: Arc<Fabric>,
}

impl ThreadComm {
    fn check_peer(&self, peer: Rank) -> CompositeResult<()> {
        if peer.0 >= self.fabric.size {
            return Err(CompositeError::collective(format!(
                "{peer} is outside a group of {}",
                self.fabric.size
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.fabric.size)
            .finish()
    }
}

impl Collective for ThreadComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.fabric.size
    }

    fn send(&self, to: Rank, msg: Message) -> CompositeResult<()> {
        self.check_peer(to)?;
        self.fabric.senders[self.rank.0][to.0]
            .send(msg)
            .map_err(|_| CompositeError::collective(format!("channel to {to} is closed")))
    }

    fn recv(&self, from: Rank) -> CompositeResult<Message> {
        self.check_peer(from)?;
        self.fabric.receivers[self.rank.0][from.0]
            .recv()
            .map_err(|_| CompositeError::collective(format!("channel from {from} is closed")))
    }

    fn barrier(&self) -> CompositeResult<()> {
        self.fabric.barrier.wait();
        Ok(())
    }

    fn abort(&self, code: i32) -> ! {
        tracing::error!(rank = self.rank.0, code, "aborting process group");
        (self.fabric.on_abort)(self.rank, code);
        // Every rank shares this process, so exiting it tears the whole group down.
        std::process::exit(code)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/comm/thread_group.rs"]
mod tests;
