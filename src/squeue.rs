//! Submission queue.

use std::os::unix::io::RawFd;
use std::sync::atomic;
use std::{mem, ptr};

use bitflags::bitflags;

use crate::sys;
use crate::util::Mmap;

/// The shared submission ring plus the private lease window.
///
/// `sqe_head..sqe_tail` tracks entries leased to userspace but not yet
/// published to the kernel. All mutating access is serialized by the
/// engine's submission mutex; the kernel advances the shared head
/// concurrently.
pub(crate) struct SubmissionQueue {
    head: *const atomic::AtomicU32,
    tail: *const atomic::AtomicU32,
    ring_mask: u32,
    ring_entries: u32,
    flags: *const atomic::AtomicU32,
    dropped: *const atomic::AtomicU32,
    array: *mut u32,
    sqes: *mut sys::io_uring_sqe,

    sqe_head: u32,
    sqe_tail: u32,
}

unsafe impl Send for SubmissionQueue {}

/// A read-only view of the kernel-to-userspace SQ flags word, usable
/// without taking the submission mutex.
#[derive(Clone, Copy)]
pub(crate) struct SqFlags {
    flags: *const atomic::AtomicU32,
}

unsafe impl Send for SqFlags {}
unsafe impl Sync for SqFlags {}

bitflags! {
    /// Submission entry flags.
    pub struct Flags: u8 {
        /// Interpret the entry's fd as an index into the registered file table.
        const FIXED_FILE = sys::IOSQE_FIXED_FILE;
        /// Do not start this entry until all prior entries complete.
        const IO_DRAIN = sys::IOSQE_IO_DRAIN;
        /// Link the next entry after this one; a failure short-circuits the chain.
        const IO_LINK = sys::IOSQE_IO_LINK;
        /// Like `IO_LINK`, but the chain continues across failures.
        const IO_HARDLINK = sys::IOSQE_IO_HARDLINK;
        /// Always issue the operation from an async worker.
        const ASYNC = sys::IOSQE_ASYNC;
        /// Select a buffer from a registered buffer group.
        const BUFFER_SELECT = sys::IOSQE_BUFFER_SELECT;
    }
}

impl SubmissionQueue {
    #[rustfmt::skip]
    pub(crate) unsafe fn new(
        sq_mmap: &Mmap,
        sqe_mmap: &Mmap,
        p: &sys::io_uring_params,
    ) -> SubmissionQueue {
        let head         = sq_mmap.field::<atomic::AtomicU32>(p.sq_off.head);
        let tail         = sq_mmap.field::<atomic::AtomicU32>(p.sq_off.tail);
        let ring_mask    = sq_mmap.field::<u32>(p.sq_off.ring_mask).read();
        let ring_entries = sq_mmap.field::<u32>(p.sq_off.ring_entries).read();
        let flags        = sq_mmap.field::<atomic::AtomicU32>(p.sq_off.flags);
        let dropped      = sq_mmap.field::<atomic::AtomicU32>(p.sq_off.dropped);
        let array        = sq_mmap.field::<u32>(p.sq_off.array);

        let sqes         = sqe_mmap.field::<sys::io_uring_sqe>(0);

        SubmissionQueue {
            head,
            tail,
            ring_mask,
            ring_entries,
            flags,
            dropped,
            array,
            sqes,
            sqe_head: 0,
            sqe_tail: 0,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> u32 {
        self.ring_entries
    }

    /// Lease the next free submission entry, zeroed, returning its ring
    /// index for use with [`entry_mut`](Self::entry_mut).
    ///
    /// Fails when the lease window has caught up with the kernel's shared
    /// head, i.e. `sqe_tail + 1 - head > ring_entries`.
    pub(crate) fn lease(&mut self) -> Option<u32> {
        let head = unsafe { (*self.head).load(atomic::Ordering::Acquire) };
        let next = self.sqe_tail.wrapping_add(1);

        if next.wrapping_sub(head) <= self.ring_entries {
            let index = self.sqe_tail;
            unsafe {
                ptr::write(self.sqes.add((index & self.ring_mask) as usize), mem::zeroed());
            }
            self.sqe_tail = next;
            Some(index)
        } else {
            None
        }
    }

    pub(crate) fn entry_mut(&mut self, index: u32) -> &mut SqEntry {
        unsafe { &mut *(self.sqes.add((index & self.ring_mask) as usize) as *mut SqEntry) }
    }

    /// Return the most recent `n` leased entries to the pool without
    /// publishing them.
    pub(crate) fn unlease(&mut self, n: u32) {
        self.sqe_tail = self.sqe_tail.wrapping_sub(n);
    }

    /// Publish all leased entries to the kernel through the indirection
    /// array and return the number of entries pending in the shared ring.
    pub(crate) fn flush(&mut self) -> u32 {
        unsafe {
            // This side owns all tail stores, so a plain read suffices.
            let mut tail = self.tail.cast::<u32>().read();

            while self.sqe_head != self.sqe_tail {
                *self.array.add((tail & self.ring_mask) as usize) =
                    self.sqe_head & self.ring_mask;
                tail = tail.wrapping_add(1);
                self.sqe_head = self.sqe_head.wrapping_add(1);
            }

            (*self.tail).store(tail, atomic::Ordering::Release);
            tail.wrapping_sub((*self.head).load(atomic::Ordering::Acquire))
        }
    }

    /// The number of published entries the kernel has not consumed yet.
    pub(crate) fn pending(&self) -> u32 {
        unsafe {
            let tail = self.tail.cast::<u32>().read();
            tail.wrapping_sub((*self.head).load(atomic::Ordering::Acquire))
        }
    }

    /// When submission polling is set up, whether the kernel thread has
    /// gone to sleep and requires `io_uring_enter` to wake it up.
    #[inline]
    pub(crate) fn need_wakeup(&self) -> bool {
        unsafe {
            (*self.flags).load(atomic::Ordering::Acquire) & sys::IORING_SQ_NEED_WAKEUP != 0
        }
    }

    /// The number of invalid submission entries the kernel has encountered
    /// in the ring buffer.
    #[allow(dead_code)]
    pub(crate) fn dropped(&self) -> u32 {
        unsafe { (*self.dropped).load(atomic::Ordering::Acquire) }
    }

    pub(crate) fn flags_view(&self) -> SqFlags {
        SqFlags { flags: self.flags }
    }
}

impl SqFlags {
    /// Completion events have overflowed the CQ ring.
    #[inline]
    pub(crate) fn cq_overflow(&self) -> bool {
        unsafe {
            (*self.flags).load(atomic::Ordering::Acquire) & sys::IORING_SQ_CQ_OVERFLOW != 0
        }
    }
}

/// A leased 64-byte submission entry.
///
/// Request builders populate the entry through these setters; the engine
/// owns the user-data field and the fixed-file rewrite.
#[repr(transparent)]
pub struct SqEntry(pub(crate) sys::io_uring_sqe);

impl SqEntry {
    /// Fill the common operation fields.
    #[inline]
    pub fn prep(&mut self, opcode: u8, fd: RawFd, addr: u64, len: u32, offset: u64) {
        self.0.opcode = opcode;
        self.0.fd = fd;
        self.0.addr = addr;
        self.0.len = len;
        self.0.off = offset;
    }

    #[inline]
    pub fn opcode(&self) -> u8 {
        self.0.opcode
    }

    #[inline]
    pub fn fd(&self) -> RawFd {
        self.0.fd
    }

    /// Replace the fd with a registered-file slot index.
    #[inline]
    pub(crate) fn set_fd_index(&mut self, index: i32) {
        self.0.fd = index;
        self.0.flags |= Flags::FIXED_FILE.bits();
    }

    /// Operation-specific flags (`rw_flags`, `msg_flags`, `timeout_flags`, ...).
    #[inline]
    pub fn set_op_flags(&mut self, op_flags: u32) {
        self.0.op_flags = op_flags;
    }

    #[inline]
    pub fn set_flags(&mut self, flags: Flags) {
        self.0.flags |= flags.bits();
    }

    #[inline]
    pub fn clear_flags(&mut self, flags: Flags) {
        self.0.flags &= !flags.bits();
    }

    #[inline]
    pub(crate) fn set_user_data(&mut self, user_data: u64) {
        self.0.user_data = user_data;
    }

    #[inline]
    pub fn set_ioprio(&mut self, ioprio: u16) {
        self.0.ioprio = ioprio;
    }

    #[inline]
    pub fn set_buf_index(&mut self, buf_index: u16) {
        self.0.buf_index = buf_index;
    }
}
