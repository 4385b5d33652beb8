//! Collective communication between ranks.
//!
//! The pipeline only needs a handful of primitives: point-to-point transfer for the merge, a
//! barrier for frame lockstep, and broadcast/all-reduce built on top of those. Every rank must
//! call every collective in the same order; there are no timeouts, so a rank that stops
//! participating leaves the rest of the group blocked.

pub(crate) mod thread_group;

use crate::foundation::core::Rank;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::render::buffer::ImageBuffer;

pub use thread_group::{PANIC_EXIT_CODE, ThreadComm, ThreadGroup};

/// Payloads exchanged between ranks.
#[derive(Clone, Debug)]
pub enum Message {
    /// Synchronized frame time, in seconds.
    Time(f64),
    /// One rank's vote in a logical reduction.
    Flag(bool),
    /// A color+depth image (local contribution or partial composite).
    Image(ImageBuffer),
}

impl Message {
    fn kind(&self) -> &'static str {
        match self {
            Self::Time(_) => "time",
            Self::Flag(_) => "flag",
            Self::Image(_) => "image",
        }
    }
}

fn unexpected(wanted: &str, from: Rank, got: &Message) -> CompositeError {
    CompositeError::collective(format!(
        "expected {wanted} message from {from}, got {}; ranks have diverged",
        got.kind()
    ))
}

/// Process-group runtime consumed by the pipeline.
///
/// Implementations provide ordered point-to-point delivery between every pair of ranks and a
/// full-group barrier. Broadcast and reductions are provided on top of those.
pub trait Collective {
    /// This process's rank.
    fn rank(&self) -> Rank;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Deliver `msg` to `to`. Messages between a given pair of ranks arrive in send order.
    fn send(&self, to: Rank, msg: Message) -> CompositeResult<()>;

    /// Block until the next message from `from` arrives.
    fn recv(&self, from: Rank) -> CompositeResult<Message>;

    /// Block until every rank in the group has reached the barrier.
    fn barrier(&self) -> CompositeResult<()>;

    /// Tear down the whole group. A local exit would leave the other ranks hanging.
    fn abort(&self, code: i32) -> !;

    /// Return `true` when this rank is the coordinator.
    fn is_coordinator(&self) -> bool {
        self.rank().is_coordinator()
    }

    /// Send `value` from `root` to every rank; all ranks return the root's bits.
    fn broadcast_f64(&self, root: Rank, value: f64) -> CompositeResult<f64> {
        if self.rank() == root {
            for r in (0..self.size()).map(Rank).filter(|&r| r != root) {
                self.send(r, Message::Time(value))?;
            }
            return Ok(value);
        }
        match self.recv(root)? {
            Message::Time(v) => Ok(v),
            other => Err(unexpected("time", root, &other)),
        }
    }

    /// Logical OR of `flag` across the group, returned on every rank.
    fn all_reduce_or(&self, flag: bool) -> CompositeResult<bool> {
        let root = Rank::COORDINATOR;
        let combined = if self.rank() == root {
            let mut any = flag;
            for r in (1..self.size()).map(Rank) {
                match self.recv(r)? {
                    Message::Flag(v) => any |= v,
                    other => return Err(unexpected("flag", r, &other)),
                }
            }
            for r in (1..self.size()).map(Rank) {
                self.send(r, Message::Flag(any))?;
            }
            any
        } else {
            self.send(root, Message::Flag(flag))?;
            match self.recv(root)? {
                Message::Flag(v) => v,
                other => return Err(unexpected("flag", root, &other)),
            }
        };
        Ok(combined)
    }

    /// Hand `image` to `to`; the buffer moves with the message.
    fn send_image(&self, to: Rank, image: ImageBuffer) -> CompositeResult<()> {
        self.send(to, Message::Image(image))
    }

    /// Send `image` to `to` and block until `to` hands the same buffer back with
    /// [`Collective::send_image`]. Lets both sides reuse one allocation every frame.
    fn lend_image(&self, to: Rank, image: ImageBuffer) -> CompositeResult<ImageBuffer> {
        self.send_image(to, image)?;
        self.recv_image(to)
    }

    /// Receive an image from `from`.
    fn recv_image(&self, from: Rank) -> CompositeResult<ImageBuffer> {
        match self.recv(from)? {
            Message::Image(img) => Ok(img),
            other => Err(unexpected("image", from, &other)),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/comm/mod.rs"]
mod tests;
