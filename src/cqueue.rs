//! Completion queue.

use std::sync::atomic;

use crate::sys;
use crate::util::Mmap;

/// The shared completion ring.
///
/// Exactly one reader (the engine's dispatcher) consumes events, so the
/// head is read with a plain load and advanced with a release store.
pub(crate) struct CompletionQueue {
    head: *const atomic::AtomicU32,
    tail: *const atomic::AtomicU32,
    ring_mask: u32,
    ring_entries: u32,
    overflow: *const atomic::AtomicU32,
    cqes: *const sys::io_uring_cqe,
}

unsafe impl Send for CompletionQueue {}

/// A completion event: the request cookie, the operation's signed return
/// value, and event flags.
#[derive(Clone, Copy)]
pub(crate) struct Entry(pub(crate) sys::io_uring_cqe);

impl CompletionQueue {
    #[rustfmt::skip]
    pub(crate) unsafe fn new(cq_mmap: &Mmap, p: &sys::io_uring_params) -> CompletionQueue {
        let head         = cq_mmap.field::<atomic::AtomicU32>(p.cq_off.head);
        let tail         = cq_mmap.field::<atomic::AtomicU32>(p.cq_off.tail);
        let ring_mask    = cq_mmap.field::<u32>(p.cq_off.ring_mask).read();
        let ring_entries = cq_mmap.field::<u32>(p.cq_off.ring_entries).read();
        let overflow     = cq_mmap.field::<atomic::AtomicU32>(p.cq_off.overflow);
        let cqes         = cq_mmap.field::<sys::io_uring_cqe>(p.cq_off.cqes);

        CompletionQueue {
            head,
            tail,
            ring_mask,
            ring_entries,
            overflow,
            cqes,
        }
    }

    /// Copy out the oldest unread completion event, if one is visible.
    /// Does not consume it; pair with [`advance`](Self::advance).
    pub(crate) fn peek(&self) -> Option<Entry> {
        unsafe {
            // The dispatcher is the only head writer, so a plain read
            // suffices here.
            let head = self.head.cast::<u32>().read();
            let tail = (*self.tail).load(atomic::Ordering::Acquire);

            if head != tail {
                Some(Entry(*self.cqes.add((head & self.ring_mask) as usize)))
            } else {
                None
            }
        }
    }

    /// Mark `n` events as consumed.
    pub(crate) fn advance(&self, n: u32) {
        if n != 0 {
            unsafe {
                (*self.head).fetch_add(n, atomic::Ordering::Release);
            }
        }
    }

    /// The number of completion events the kernel dropped for lack of CQ
    /// space (only possible without the NODROP feature).
    #[allow(dead_code)]
    pub(crate) fn overflow(&self) -> u32 {
        unsafe { (*self.overflow).load(atomic::Ordering::Acquire) }
    }

    #[allow(dead_code)]
    pub(crate) fn capacity(&self) -> u32 {
        self.ring_entries
    }
}

impl Entry {
    #[inline]
    pub(crate) fn user_data(&self) -> u64 {
        self.0.user_data
    }

    #[inline]
    pub(crate) fn result(&self) -> i32 {
        self.0.res
    }
}
