//! Shared plane-buffer pooling.
//!
//! Decoded frames are produced and dropped at frame rate; reallocating their
//! plane buffers every frame is measurable overhead. The pool keeps a bounded
//! free list per buffer role and is passed explicitly (by `Arc`) into every
//! producer and consumer; there is no global instance.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::AudioFrame;
use crate::video::{FrameBuffer, VideoFrame};

/// Buffers are pooled per role, not per object, so a video plane freed by
/// one stream can serve another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferRole {
    VideoPlane,
    AudioPlane,
}

/// Free buffers retained per role. Beyond this, released buffers are dropped.
const MAX_FREE_PER_ROLE: usize = 32;

/// Concurrent free-list of plane buffers, keyed by [`BufferRole`].
///
/// Safe to share between decode/resample producers and the render-side
/// consumer; all access goes through one mutex, held only for the push/pop.
pub struct BufferPool {
    free: Mutex<HashMap<BufferRole, Vec<Vec<u8>>>>,
}

impl BufferPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            free: Mutex::new(HashMap::new()),
        })
    }

    /// Pops a pooled buffer of at least `len` bytes, or allocates one.
    /// The returned buffer is zero-extended/truncated to exactly `len`.
    pub fn acquire(&self, role: BufferRole, len: usize) -> Vec<u8> {
        let reused = self
            .free
            .lock()
            .get_mut(&role)
            .and_then(|list| list.pop());
        match reused {
            Some(mut buf) => {
                buf.resize(len, 0);
                buf
            }
            None => vec![0; len],
        }
    }

    /// Returns a buffer to the role's free list.
    pub fn release(&self, role: BufferRole, buf: Vec<u8>) {
        let mut free = self.free.lock();
        let list = free.entry(role).or_default();
        if list.len() < MAX_FREE_PER_ROLE {
            list.push(buf);
        }
    }

    /// Reclaims the plane buffers of a rendered video frame.
    /// Hardware surfaces carry no pooled planes and are simply dropped.
    pub fn recycle_video(&self, frame: VideoFrame) {
        if let FrameBuffer::Cpu(cpu) = frame.buffer {
            for plane in cpu.planes {
                self.release(BufferRole::VideoPlane, plane.data);
            }
        }
    }

    /// Reclaims the plane buffers of a played-out audio frame.
    pub fn recycle_audio(&self, frame: AudioFrame) {
        for plane in frame.planes {
            self.release(BufferRole::AudioPlane, plane);
        }
    }

    /// Number of buffers currently pooled for `role`.
    pub fn pooled(&self, role: BufferRole) -> usize {
        self.free.lock().get(&role).map_or(0, |list| list.len())
    }
}
