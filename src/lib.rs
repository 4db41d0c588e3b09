//! Operation-oriented `io_uring` for Rust.
//!
//! A [`Uring`] owns one io_uring instance: the ring file descriptor, the
//! shared submission/completion rings, and a background dispatcher that
//! routes completion events to per-request [`OpResult`] handles.
//!
//! Requests are built with the types in [`opcode`], submitted from any
//! thread, and observed either through the returned result handle or
//! through a caller-supplied [`Sink`]:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use std::os::unix::io::AsRawFd;
//!
//! let ring = uring::Uring::new(8)?;
//! let file = std::fs::File::open("/etc/hostname")?;
//!
//! let request = uring::opcode::Read::new(file.as_raw_fd(), vec![0u8; 64]).build();
//! let (_cookie, result) = ring.submit(request, None)?;
//!
//! let n = result.return_int()? as usize;
//! println!("{}", String::from_utf8_lossy(&result.buffer().unwrap()[..n]));
//! # Ok(())
//! # }
//! ```

mod cqueue;
mod error;
pub mod opcode;
mod register;
mod request;
mod result;
pub mod squeue;
mod sys;
mod util;

use std::io;
use std::mem::ManuallyDrop;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{self, AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use std::{cmp, mem, thread};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};

use crate::cqueue::CompletionQueue;
use crate::register::FileRegister;
use crate::request::{InFlight, Registry};
use crate::squeue::{Flags, SqFlags, SubmissionQueue};
use crate::util::{Mmap, RingFd};

pub use error::{Error, Result};
pub use request::{with_info, Request, RequestState};
pub use result::{
    CancelOutcome, OpResult, OpValue, Resolution, Resolver, ResultGroup, TimeoutOutcome,
};
pub use squeue::SqEntry;

/// Where the dispatcher delivers completed results.
///
/// Delivery is non-blocking; see [`Uring::submit`].
pub type Sink = Sender<Arc<OpResult>>;

/// The receiving half of a result channel.
pub type ResultReceiver = Receiver<Arc<OpResult>>;

/// An unbounded result channel. The dispatcher can always deliver into
/// it.
pub fn result_channel() -> (Sink, ResultReceiver) {
    crossbeam_channel::unbounded()
}

/// A bounded result channel. If it fills up, deliveries are skipped (the
/// result handles themselves still complete), so size it for the number
/// of requests in flight.
pub fn bounded_result_channel(cap: usize) -> (Sink, ResultReceiver) {
    crossbeam_channel::bounded(cap)
}

/// An io_uring instance with a background completion dispatcher.
///
/// Safe for concurrent use from multiple threads: submissions serialize
/// on an internal mutex, completions are consumed by exactly one
/// dispatcher task.
pub struct Uring {
    core: Arc<Core>,
    dispatcher: Mutex<Option<thread::JoinHandle<()>>>,
}

struct Core {
    fd: RingFd,
    params: Parameters,
    memory: ManuallyDrop<MemoryMap>,
    sq: Mutex<SubmissionQueue>,
    sq_flags: SqFlags,
    cq: Mutex<CompletionQueue>,
    force_async: bool,
    registry: Registry,
    files: FileRegister,
    inflight: AtomicI64,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    /// Rejects new submissions once close begins.
    closed: AtomicBool,
    /// Tells the dispatcher to exit; set only after the registry has
    /// drained, so it cannot outrun the final completions.
    stopping: AtomicBool,
    drain_lock: Mutex<()>,
    drained: Condvar,
}

#[allow(dead_code)]
struct MemoryMap {
    sq_mmap: Mmap,
    sqe_mmap: Mmap,
    cq_mmap: Option<Mmap>,
}

unsafe impl Send for Core {}
unsafe impl Sync for Core {}

/// Ring construction options.
#[derive(Clone, Default)]
pub struct Builder {
    force_async: bool,
    params: sys::io_uring_params,
}

/// The parameters the kernel filled in at setup time.
#[derive(Clone)]
pub struct Parameters(sys::io_uring_params);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Chain {
    None,
    Link,
    HardLink,
}

impl Uring {
    /// Create a ring with `entries` submission slots (rounded up to a
    /// power of two by the kernel) and default options.
    pub fn new(entries: u32) -> io::Result<Uring> {
        Builder::default().build(entries)
    }

    /// Construction options.
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn params(&self) -> &Parameters {
        &self.core.params
    }

    /// The number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.core.registry.len()
    }

    /// Submit one request. On success the request is in flight and the
    /// returned cookie can be passed to [`cancel`](Self::cancel); the
    /// result completes when the kernel posts the completion event and is
    /// also delivered to `sink`, if one is given. On failure no
    /// submission slot is consumed and no result is produced.
    pub fn submit(&self, request: Request, sink: Option<Sink>) -> Result<(u64, Arc<OpResult>)> {
        let (mut out, _) = self.submit_batch(vec![request], sink, Chain::None)?;
        Ok(out.pop().expect("one request was staged"))
    }

    /// Submit an ordered batch. All requests are enqueued, or none are.
    pub fn submit_many(
        &self,
        requests: Vec<Request>,
        sink: Option<Sink>,
    ) -> Result<Vec<(u64, Arc<OpResult>)>> {
        let (out, _) = self.submit_batch(requests, sink, Chain::None)?;
        Ok(out)
    }

    /// Submit a LINK chain: the kernel runs the requests sequentially and
    /// a failure cancels the rest of the chain (they complete with
    /// [`Error::Canceled`]).
    pub fn submit_linked(
        &self,
        requests: Vec<Request>,
        sink: Option<Sink>,
    ) -> Result<Arc<ResultGroup>> {
        let (_, group) = self.submit_batch(requests, sink, Chain::Link)?;
        Ok(group.expect("linked batch produces a group"))
    }

    /// Submit a HARDLINK chain: sequential like [`submit_linked`], but
    /// the chain continues across individual failures.
    ///
    /// [`submit_linked`]: Self::submit_linked
    pub fn submit_hardlinked(
        &self,
        requests: Vec<Request>,
        sink: Option<Sink>,
    ) -> Result<Arc<ResultGroup>> {
        let (_, group) = self.submit_batch(requests, sink, Chain::HardLink)?;
        Ok(group.expect("linked batch produces a group"))
    }

    /// Submit `request` guarded by a per-request deadline. If it does not
    /// complete within `timeout` the kernel cancels it and it resolves to
    /// [`Error::Canceled`]. The guard's own completion is internal and
    /// never reaches the sink.
    pub fn submit_with_timeout(
        &self,
        request: Request,
        timeout: Duration,
        sink: Option<Sink>,
    ) -> Result<(u64, Arc<OpResult>)> {
        let requests = opcode::with_timeout(request, timeout);
        let (mut out, _) = self.submit_batch(requests, sink, Chain::None)?;
        out.truncate(1);
        Ok(out.pop().expect("the guarded request was staged"))
    }

    /// Ask the kernel to cancel the in-flight request identified by
    /// `cookie`. The canceled request completes with
    /// [`Error::Canceled`]; the returned result reports the cancel's own
    /// outcome ([`CancelOutcome`] or [`Error::NotFound`]).
    pub fn cancel(&self, cookie: u64, sink: Option<Sink>) -> Result<(u64, Arc<OpResult>)> {
        self.submit(opcode::AsyncCancel::new(cookie).build(), sink)
    }

    /// Pre-register a file descriptor, letting subsequent submissions on
    /// it use the kernel's fixed-file fast path. Slots freed by
    /// [`unregister_file`](Self::unregister_file) are reused.
    pub fn register_file(&self, fd: RawFd) -> io::Result<()> {
        self.core.files.register(fd)
    }

    pub fn register_files(&self, fds: &[RawFd]) -> io::Result<()> {
        self.core.files.register_many(fds)
    }

    pub fn unregister_file(&self, fd: RawFd) -> io::Result<()> {
        self.core.files.unregister(fd)
    }

    pub fn unregister_files(&self, fds: &[RawFd]) -> io::Result<()> {
        self.core.files.unregister_many(fds)
    }

    /// The registered slot of `fd`, if it is registered.
    pub fn file_index(&self, fd: RawFd) -> Option<usize> {
        self.core.files.index_of(fd)
    }

    /// Shut the engine down: reject further submissions, wait for every
    /// in-flight completion to drain, stop the dispatcher, unregister
    /// files and release the rings. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        if self.core.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        // A kernel-parked dispatcher only wakes on a completion; feed it
        // one. The channel ping covers the idle-parked case.
        let _ = self.submit_unchecked(vec![opcode::Nop::new().build()], None, Chain::None);
        let _ = self.core.wake_tx.try_send(());

        {
            let mut guard = self.core.drain_lock.lock();
            while self.core.registry.len() > 0 {
                self.core.drained.wait(&mut guard);
            }
        }

        self.core.stopping.store(true, Ordering::Release);
        let _ = self.core.wake_tx.try_send(());

        let handle = self.dispatcher.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::warn!("completion dispatcher panicked");
            }
        }

        if let Err(err) = self.core.files.unregister_all() {
            log::warn!("failed to unregister files on close: {}", err);
        }
        Ok(())
    }

    fn submit_batch(
        &self,
        requests: Vec<Request>,
        sink: Option<Sink>,
        chain: Chain,
    ) -> Result<(Vec<(u64, Arc<OpResult>)>, Option<Arc<ResultGroup>>)> {
        if self.core.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        self.submit_unchecked(requests, sink, chain)
    }

    /// The submission protocol. The whole batch runs under the
    /// submission mutex: lease, build, rewrite, stage, flush, enter.
    /// Requests are staged outside the registry until every builder has
    /// run, so an error path only has to return its leased entries.
    fn submit_unchecked(
        &self,
        requests: Vec<Request>,
        sink: Option<Sink>,
        chain: Chain,
    ) -> Result<(Vec<(u64, Arc<OpResult>)>, Option<Arc<ResultGroup>>)> {
        let core = &*self.core;

        if requests.is_empty() {
            return Ok((Vec::new(), None));
        }

        let n_requests = requests.len();
        let last = n_requests - 1;

        let mut sq = core.sq.lock();
        if n_requests as u32 > sq.capacity() {
            return Err(Error::QueueFull);
        }

        let mut staged: Vec<(u64, InFlight)> = Vec::with_capacity(n_requests);
        let mut results: Vec<(u64, Arc<OpResult>)> = Vec::with_capacity(n_requests);
        let mut leased = 0u32;

        for (i, request) in requests.into_iter().enumerate() {
            // With SQPOLL the kernel drains the shared head on its own.
            // Otherwise a full window means published entries from an
            // earlier batch are still pending, and submitting them frees
            // slots.
            let index = loop {
                match sq.lease() {
                    Some(index) => break index,
                    None => {
                        if !core.params.is_setup_sqpoll() {
                            let backlog = sq.pending();
                            if backlog > 0 {
                                let _ = core.enter_syscall(backlog, 0, 0);
                            }
                        }
                        thread::yield_now();
                    }
                }
            };
            leased += 1;

            let mut state = RequestState::new();
            let (op, fd) = {
                let sqe = sq.entry_mut(index);
                (request.0)(sqe, &mut state);
                (sqe.opcode(), sqe.fd())
            };

            let fixed = if fd >= 0 { core.files.index_of(fd) } else { None };
            if fd >= 0 && fixed.is_none() && core.params.is_setup_sqpoll() {
                // With a kernel submission thread, unregistered fds are
                // not usable.
                sq.unlease(leased);
                return Err(Error::UnregisteredFile);
            }

            let cookie = core.registry.mint();
            {
                let sqe = sq.entry_mut(index);
                if let Some(slot) = fixed {
                    sqe.set_fd_index(slot as i32);
                }
                if core.force_async {
                    sqe.set_flags(Flags::ASYNC);
                }
                if chain != Chain::None {
                    sqe.clear_flags(Flags::IO_LINK | Flags::IO_HARDLINK);
                    if i < last {
                        sqe.set_flags(match chain {
                            Chain::HardLink => Flags::IO_HARDLINK,
                            _ => Flags::IO_LINK,
                        });
                    }
                }
                sqe.set_user_data(cookie);
            }

            let (op_result, holds) = state.into_result(op);
            let op_result = Arc::new(op_result);
            staged.push((
                cookie,
                InFlight {
                    opcode: op,
                    result: Arc::clone(&op_result),
                    holds,
                    sink: sink.clone(),
                    group: None,
                },
            ));
            results.push((cookie, op_result));
        }

        let group = match chain {
            Chain::None => None,
            _ => {
                let members = results.iter().map(|(_, r)| Arc::clone(r)).collect();
                let group = Arc::new(ResultGroup::new(members));
                for (_, inflight) in staged.iter_mut() {
                    inflight.group = Some(Arc::clone(&group));
                }
                Some(group)
            }
        };

        for (cookie, inflight) in staged {
            core.registry.insert(cookie, inflight);
        }

        core.enter(&mut sq, n_requests as u32)?;
        Ok((results, group))
    }
}

impl AsRawFd for Uring {
    fn as_raw_fd(&self) -> RawFd {
        self.core.fd.as_raw_fd()
    }
}

impl Drop for Uring {
    fn drop(&mut self) {
        if self.close().is_err() {
            log::warn!("close failed during drop");
        }
    }
}

impl Core {
    /// Flush leased entries and enter the kernel if needed, then account
    /// the new submissions and ping the dispatcher.
    fn enter(&self, sq: &mut SubmissionQueue, submitted: u32) -> Result<()> {
        let pending = sq.flush();

        let mut flags = 0;
        let mut need_enter = !self.params.is_setup_sqpoll();
        if !need_enter {
            // The wakeup bit must be read after the tail store above.
            atomic::fence(Ordering::SeqCst);
            if sq.need_wakeup() {
                flags |= sys::IORING_ENTER_SQ_WAKEUP;
                need_enter = true;
            }
        }
        if self.params.is_setup_iopoll() {
            flags |= sys::IORING_ENTER_GETEVENTS;
        }

        let entered = if need_enter && pending > 0 {
            self.enter_syscall(pending, 0, flags).map(drop)
        } else {
            Ok(())
        };

        // Count the batch even if the enter failed: the entries are
        // already published, and the next successful enter (any submit,
        // or the close path) carries them into the kernel.
        self.inflight.fetch_add(submitted as i64, Ordering::AcqRel);
        let _ = self.wake_tx.try_send(());
        entered
    }

    fn enter_syscall(&self, to_submit: u32, min_complete: u32, flags: u32) -> Result<usize> {
        loop {
            let ret = unsafe {
                sys::io_uring_enter(
                    self.fd.as_raw_fd(),
                    to_submit,
                    min_complete,
                    flags,
                    std::ptr::null(),
                    0,
                )
            };
            if ret >= 0 {
                return Ok(ret as usize);
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(Error::Os(err.raw_os_error().unwrap_or(libc::EIO)));
        }
    }

    /// Block until a completion event is visible and consume it. Yields
    /// briefly before parking in the kernel with a wait count of one.
    fn reap(&self) -> Option<cqueue::Entry> {
        let mut spins = 0u32;
        loop {
            {
                let cq = self.cq.lock();
                if let Some(entry) = cq.peek() {
                    cq.advance(1);
                    return Some(entry);
                }
            }

            if self.sq_flags.cq_overflow() {
                // Have the kernel move overflowed completions into the ring.
                if let Err(err) = self.enter_syscall(0, 0, sys::IORING_ENTER_GETEVENTS) {
                    log::warn!("flushing overflowed completions failed: {}", err);
                }
                continue;
            }

            spins += 1;
            if spins < 64 {
                thread::yield_now();
                continue;
            }
            spins = 0;

            if let Err(err) = self.enter_syscall(0, 1, sys::IORING_ENTER_GETEVENTS) {
                log::warn!("waiting for completions failed: {}", err);
                thread::sleep(Duration::from_millis(1));
                return None;
            }
        }
    }

    fn notify_if_drained(&self) {
        if self.registry.len() == 0 {
            let _guard = self.drain_lock.lock();
            self.drained.notify_all();
        }
    }
}

impl Drop for Core {
    fn drop(&mut self) {
        // Unmap the rings before the fd field closes the ring itself.
        unsafe {
            ManuallyDrop::drop(&mut self.memory);
        }
    }
}

/// The completion dispatcher: the single reader of the completion ring.
fn dispatch(core: Arc<Core>) {
    loop {
        if core.inflight.load(Ordering::Acquire) <= 0 {
            if core.stopping.load(Ordering::Acquire) {
                break;
            }
            match core.wake_rx.recv() {
                Ok(()) => continue,
                Err(_) => break,
            }
        }

        let entry = match core.reap() {
            Some(entry) => entry,
            None => continue,
        };
        core.inflight.fetch_sub(1, Ordering::AcqRel);

        let state = match core.registry.remove(entry.user_data()) {
            Some(state) => state,
            None => {
                log::warn!("completion for unknown cookie {}", entry.user_data());
                core.notify_if_drained();
                continue;
            }
        };
        core.notify_if_drained();

        if state.opcode == sys::IORING_OP_LINK_TIMEOUT {
            // Link-timeout completions are internal bookkeeping; they
            // still count toward their chain's group.
            if let Some(group) = state.group {
                group.complete_one();
            }
            continue;
        }

        state.result.complete(entry.result());
        if let Some(group) = state.group {
            group.complete_one();
        }
        if let Some(sink) = state.sink {
            match sink.try_send(Arc::clone(&state.result)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::warn!(
                        "result sink full, skipping delivery for cookie {}",
                        entry.user_data()
                    );
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
        // `state.holds` drops here, releasing the request's pinned
        // argument memory now that the kernel is done with it.
    }
}

impl Builder {
    /// Create a kernel thread to poll the submission queue, so
    /// submissions usually avoid the enter syscall. Requires all fds to
    /// be registered. `idle` is the poll thread's idle time in
    /// milliseconds before it parks.
    pub fn setup_sqpoll(&mut self, idle: impl Into<Option<u32>>) -> &mut Self {
        self.params.flags |= sys::IORING_SETUP_SQPOLL;
        self.params.sq_thread_idle = idle.into().unwrap_or(0);
        self
    }

    /// Bind the submission poll thread to one CPU. Only meaningful with
    /// [`setup_sqpoll`](Self::setup_sqpoll).
    pub fn setup_sqpoll_cpu(&mut self, cpu: u32) -> &mut Self {
        self.params.flags |= sys::IORING_SETUP_SQ_AFF;
        self.params.sq_thread_cpu = cpu;
        self
    }

    /// Busy-wait for completions instead of interrupt driven I/O. Only
    /// usable with `O_DIRECT` files.
    pub fn setup_iopoll(&mut self) -> &mut Self {
        self.params.flags |= sys::IORING_SETUP_IOPOLL;
        self
    }

    /// Size the completion ring explicitly (rounded up to a power of
    /// two); it defaults to twice the submission ring.
    pub fn setup_cqsize(&mut self, entries: u32) -> &mut Self {
        self.params.flags |= sys::IORING_SETUP_CQSIZE;
        self.params.cq_entries = entries;
        self
    }

    /// Clamp over-large ring sizes to the kernel maximum instead of
    /// failing.
    pub fn setup_clamp(&mut self) -> &mut Self {
        self.params.flags |= sys::IORING_SETUP_CLAMP;
        self
    }

    /// Share the async worker pool of an existing ring.
    pub fn setup_attach_wq(&mut self, fd: RawFd) -> &mut Self {
        self.params.flags |= sys::IORING_SETUP_ATTACH_WQ;
        self.params.wq_fd = fd as _;
        self
    }

    /// Force every operation through an async worker instead of trying
    /// non-blocking issue first.
    pub fn force_async(&mut self) -> &mut Self {
        self.force_async = true;
        self
    }

    /// Build a [`Uring`] with `entries` submission slots.
    pub fn build(&self, entries: u32) -> io::Result<Uring> {
        let mut p = self.params;

        let fd = RingFd::setup(entries, &mut p)?;
        let (memory, sq, cq) = unsafe { setup_queue(&fd, &p)? };

        let sq_flags = sq.flags_view();
        let ring_fd = fd.as_raw_fd();
        let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);

        let core = Arc::new(Core {
            fd,
            params: Parameters(p),
            memory: ManuallyDrop::new(memory),
            sq: Mutex::new(sq),
            sq_flags,
            cq: Mutex::new(cq),
            force_async: self.force_async,
            registry: Registry::new(),
            files: FileRegister::new(ring_fd),
            inflight: AtomicI64::new(0),
            wake_tx,
            wake_rx,
            closed: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            drain_lock: Mutex::new(()),
            drained: Condvar::new(),
        });

        let dispatcher = {
            let core = Arc::clone(&core);
            thread::Builder::new()
                .name("uring-dispatch".into())
                .spawn(move || dispatch(core))?
        };

        Ok(Uring {
            core,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }
}

unsafe fn setup_queue(
    fd: &RingFd,
    p: &sys::io_uring_params,
) -> io::Result<(MemoryMap, SubmissionQueue, CompletionQueue)> {
    let sq_len = p.sq_off.array as usize + p.sq_entries as usize * mem::size_of::<u32>();
    let cq_len =
        p.cq_off.cqes as usize + p.cq_entries as usize * mem::size_of::<sys::io_uring_cqe>();
    let sqe_len = p.sq_entries as usize * mem::size_of::<sys::io_uring_sqe>();

    let sqe_mmap = Mmap::map_ring(fd, sys::IORING_OFF_SQES, sqe_len)?;

    if p.features & sys::IORING_FEAT_SINGLE_MMAP != 0 {
        let scq_mmap = Mmap::map_ring(fd, sys::IORING_OFF_SQ_RING, cmp::max(sq_len, cq_len))?;

        let sq = SubmissionQueue::new(&scq_mmap, &sqe_mmap, p);
        let cq = CompletionQueue::new(&scq_mmap, p);
        let memory = MemoryMap {
            sq_mmap: scq_mmap,
            sqe_mmap,
            cq_mmap: None,
        };

        Ok((memory, sq, cq))
    } else {
        let sq_mmap = Mmap::map_ring(fd, sys::IORING_OFF_SQ_RING, sq_len)?;
        let cq_mmap = Mmap::map_ring(fd, sys::IORING_OFF_CQ_RING, cq_len)?;

        let sq = SubmissionQueue::new(&sq_mmap, &sqe_mmap, p);
        let cq = CompletionQueue::new(&cq_mmap, p);
        let memory = MemoryMap {
            sq_mmap,
            sqe_mmap,
            cq_mmap: Some(cq_mmap),
        };

        Ok((memory, sq, cq))
    }
}

impl Parameters {
    pub fn is_setup_sqpoll(&self) -> bool {
        self.0.flags & sys::IORING_SETUP_SQPOLL != 0
    }

    pub fn is_setup_iopoll(&self) -> bool {
        self.0.flags & sys::IORING_SETUP_IOPOLL != 0
    }

    /// The SQ and CQ rings share one mapping.
    pub fn is_feature_single_mmap(&self) -> bool {
        self.0.features & sys::IORING_FEAT_SINGLE_MMAP != 0
    }

    /// The kernel never drops completion events when the CQ ring is
    /// full; it buffers them internally until space appears.
    pub fn is_feature_nodrop(&self) -> bool {
        self.0.features & sys::IORING_FEAT_NODROP != 0
    }

    /// Submission entry data is stable once consumed by the kernel.
    pub fn is_feature_submit_stable(&self) -> bool {
        self.0.features & sys::IORING_FEAT_SUBMIT_STABLE != 0
    }

    pub fn sq_entries(&self) -> u32 {
        self.0.sq_entries
    }

    pub fn cq_entries(&self) -> u32 {
        self.0.cq_entries
    }
}
