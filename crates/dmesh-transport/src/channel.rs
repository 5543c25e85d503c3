//! The bidirectional line channel a sync session runs over.
//!
//! Any carrier that can move whole JSON frames in both directions can
//! back a sync session. [`PairedChannel`] is the in-memory double used
//! by the test suites; real deployments wrap a socket, a serial link,
//! or a file-exchange loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{Result, TransportError};

/// A bidirectional channel moving one JSON frame per call.
pub trait FrameChannel {
    /// Send one frame to the peer.
    fn send(&mut self, frame: &str) -> Result<()>;

    /// Receive the next frame, or `None` when nothing is waiting.
    fn recv(&mut self) -> Result<Option<String>>;
}

#[derive(Debug, Default)]
struct Queues {
    a_to_b: VecDeque<String>,
    b_to_a: VecDeque<String>,
}

/// One endpoint of an in-memory channel pair.
#[derive(Debug, Clone)]
pub struct PairedChannel {
    queues: Arc<Mutex<Queues>>,
    is_a: bool,
}

impl PairedChannel {
    /// Create both endpoints of a connected pair.
    pub fn pair() -> (Self, Self) {
        let queues = Arc::new(Mutex::new(Queues::default()));
        (
            Self {
                queues: queues.clone(),
                is_a: true,
            },
            Self { queues, is_a: false },
        )
    }
}

impl FrameChannel for PairedChannel {
    fn send(&mut self, frame: &str) -> Result<()> {
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| TransportError::Io("channel lock poisoned".into()))?;
        if self.is_a {
            queues.a_to_b.push_back(frame.to_string());
        } else {
            queues.b_to_a.push_back(frame.to_string());
        }
        Ok(())
    }

    fn recv(&mut self) -> Result<Option<String>> {
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| TransportError::Io("channel lock poisoned".into()))?;
        let queue = if self.is_a {
            &mut queues.b_to_a
        } else {
            &mut queues.a_to_b
        };
        Ok(queue.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_cross_the_pair() {
        let (mut a, mut b) = PairedChannel::pair();
        a.send("hello").unwrap();
        a.send("world").unwrap();

        assert_eq!(b.recv().unwrap().as_deref(), Some("hello"));
        assert_eq!(b.recv().unwrap().as_deref(), Some("world"));
        assert_eq!(b.recv().unwrap(), None);
    }

    #[test]
    fn test_directions_are_independent() {
        let (mut a, mut b) = PairedChannel::pair();
        a.send("from a").unwrap();
        b.send("from b").unwrap();

        assert_eq!(a.recv().unwrap().as_deref(), Some("from b"));
        assert_eq!(b.recv().unwrap().as_deref(), Some("from a"));
        assert_eq!(a.recv().unwrap(), None);
    }
}
