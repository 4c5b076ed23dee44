//! Candidate Queue (C6): buffers ICE candidates that arrive before the
//! remote description is set, then drains them FIFO once it is.
//!
//! Grounded on the buffer-until-ready-then-drain shape of
//! `haven-fast-transfer/src/receiver.rs`'s assembler, generalized from
//! byte chunks to opaque candidate values.

use std::collections::VecDeque;

use filedrop_types::signaling::Candidate;

#[derive(Debug, Default)]
pub struct CandidateQueue {
    pending: VecDeque<Candidate>,
    remote_description_set: bool,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `candidate` if the remote description isn't set yet; otherwise
    /// signals the caller to apply it directly, bypassing the queue.
    pub fn offer(&mut self, candidate: Candidate) -> Option<Candidate> {
        if self.remote_description_set {
            Some(candidate)
        } else {
            self.pending.push_back(candidate);
            None
        }
    }

    /// Marks the remote description as applied and drains every queued
    /// candidate, oldest first.
    pub fn drain(&mut self) -> Vec<Candidate> {
        self.remote_description_set = true;
        self.pending.drain(..).collect()
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.remote_description_set = false;
    }
}
