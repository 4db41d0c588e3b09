//! Per-request results and opcode-specific interpretation of kernel
//! return values.

use std::any::Any;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

/// How a timeout operation concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutOutcome {
    /// The timer ran out before its wait condition was met.
    Expired,
    /// The requested number of completion events arrived first.
    CountSatisfied,
}

/// How an async-cancel operation concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The target request was found and canceled.
    Canceled,
    /// The target was already running; it may or may not get canceled.
    MaybeCanceled,
}

/// A primary return value attached to a result during resolution.
#[derive(Clone, Copy)]
pub enum OpValue {
    /// An integer return: byte count, new file descriptor, ...
    Int(i32),
    Timeout(TimeoutOutcome),
    Cancel(CancelOutcome),
    /// A peer address written by the kernel (accept).
    Sockaddr(libc::sockaddr_storage, libc::socklen_t),
    /// A filled statx record.
    Statx(libc::statx),
}

/// Scratch state a resolver turns the raw kernel return into.
pub struct Resolution {
    /// The signed kernel return value from the completion event.
    pub res: i32,
    pub err: Option<Error>,
    pub value0: Option<OpValue>,
    pub value1: Option<OpValue>,
}

/// Interprets the kernel return for one opcode. Runs at most once per
/// result, the first time the caller reads an error or a typed value.
pub type Resolver = Box<dyn FnOnce(&mut Resolution) + Send>;

/// Default interpretation: a negative return is an errno, anything else is
/// success.
pub fn errno_resolver(r: &mut Resolution) {
    if r.res < 0 {
        r.err = Some(Error::from_errno(-r.res));
    }
}

/// For operations whose positive return is the value itself (byte counts,
/// new file descriptors).
pub fn fd_resolver(r: &mut Resolution) {
    errno_resolver(r);
    if r.err.is_none() {
        r.value0 = Some(OpValue::Int(r.res));
    }
}

/// For TIMEOUT: `-ETIME` means the timer expired, zero means the
/// completion count was satisfied first.
pub fn timeout_resolver(r: &mut Resolution) {
    if r.res < 0 {
        if -r.res == libc::ETIME {
            r.err = Some(Error::TimerExpired);
            r.value0 = Some(OpValue::Timeout(TimeoutOutcome::Expired));
        } else {
            r.err = Some(Error::from_errno(-r.res));
        }
    } else if r.res == 0 {
        r.value0 = Some(OpValue::Timeout(TimeoutOutcome::CountSatisfied));
    }
}

/// For TIMEOUT_REMOVE: `-EBUSY` means the timeout already fired,
/// `-ENOENT` means it was never there.
pub fn remove_timeout_resolver(r: &mut Resolution) {
    if r.res < 0 {
        r.err = Some(match -r.res {
            libc::EBUSY => Error::AlreadyCompleted,
            libc::ENOENT => Error::NotFound,
            errno => Error::from_errno(errno),
        });
    }
}

/// For ASYNC_CANCEL: zero means canceled, `-EALREADY` means the target was
/// already running, `-ENOENT` means it was not found.
pub fn cancel_resolver(r: &mut Resolution) {
    if r.res < 0 {
        match -r.res {
            libc::ENOENT => r.err = Some(Error::NotFound),
            libc::EALREADY => r.value0 = Some(OpValue::Cancel(CancelOutcome::MaybeCanceled)),
            errno => r.err = Some(Error::from_errno(errno)),
        }
    } else if r.res == 0 {
        r.value0 = Some(OpValue::Cancel(CancelOutcome::Canceled));
    }
}

struct Inner {
    res: Option<i32>,
    resolver: Option<Resolver>,
    resolution: Option<Resolution>,
}

/// The result of one submitted request.
///
/// A handle is returned at submission time and completes when the kernel
/// posts the matching completion event. The kernel return value is
/// interpreted lazily, exactly once, on the first read of an error or a
/// typed value; the typed accessors block until the request completes.
pub struct OpResult {
    opcode: u8,
    info: Option<Box<dyn Any + Send + Sync>>,
    buf: Option<Vec<u8>>,
    buf2: Option<Vec<u8>>,
    bufs: Option<Vec<Vec<u8>>>,
    inner: Mutex<Inner>,
    done: Condvar,
}

impl OpResult {
    pub(crate) fn new(
        opcode: u8,
        resolver: Option<Resolver>,
        info: Option<Box<dyn Any + Send + Sync>>,
        buf: Option<Vec<u8>>,
        buf2: Option<Vec<u8>>,
        bufs: Option<Vec<Vec<u8>>>,
    ) -> OpResult {
        OpResult {
            opcode,
            info,
            buf,
            buf2,
            bufs,
            inner: Mutex::new(Inner {
                res: None,
                resolver,
                resolution: None,
            }),
            done: Condvar::new(),
        }
    }

    /// Attach the kernel return value and fire the completion signal.
    /// Later calls are ignored; a request completes once.
    pub(crate) fn complete(&self, res: i32) {
        let mut inner = self.inner.lock();
        if inner.res.is_none() {
            inner.res = Some(res);
            self.done.notify_all();
        }
    }

    /// The opcode recorded at submission.
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn is_completed(&self) -> bool {
        self.inner.lock().res.is_some()
    }

    /// Block until the completion event has been dispatched.
    pub fn wait(&self) {
        let mut inner = self.inner.lock();
        while inner.res.is_none() {
            self.done.wait(&mut inner);
        }
    }

    /// Like [`wait`](Self::wait) with an upper bound; returns whether the
    /// request completed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut inner = self.inner.lock();
        while inner.res.is_none() {
            if self.done.wait_for(&mut inner, timeout).timed_out() {
                return inner.res.is_some();
            }
        }
        true
    }

    /// The raw signed kernel return, without interpretation. `None` while
    /// the request is still in flight.
    pub fn raw_result(&self) -> Option<i32> {
        self.inner.lock().res
    }

    fn resolved<R>(&self, f: impl FnOnce(&Resolution) -> R) -> Option<R> {
        let mut inner = self.inner.lock();
        let res = inner.res?;

        if inner.resolution.is_none() {
            let mut resolution = Resolution {
                res,
                err: None,
                value0: None,
                value1: None,
            };
            match inner.resolver.take() {
                Some(resolve) => resolve(&mut resolution),
                None => errno_resolver(&mut resolution),
            }
            inner.resolution = Some(resolution);
        }

        inner.resolution.as_ref().map(f)
    }

    /// The resolved error, if the operation failed. Blocks until
    /// completion.
    pub fn err(&self) -> Option<Error> {
        self.wait();
        self.resolved(|r| r.err.clone()).flatten()
    }

    /// The integer return value (byte count, fd, ...). Blocks until
    /// completion.
    pub fn return_int(&self) -> Result<i32> {
        self.wait();
        match self.resolved(|r| (r.err.clone(), r.value0)) {
            Some((None, Some(OpValue::Int(v)))) => Ok(v),
            Some((Some(err), _)) => Err(err),
            _ => Err(Error::Os(libc::EINVAL)),
        }
    }

    /// The new file descriptor produced by open/accept style operations.
    pub fn return_fd(&self) -> Result<RawFd> {
        self.return_int().map(|fd| fd as RawFd)
    }

    /// How a timeout concluded. Blocks until completion.
    pub fn timeout_outcome(&self) -> Result<TimeoutOutcome> {
        self.wait();
        match self.resolved(|r| (r.err.clone(), r.value0)) {
            Some((_, Some(OpValue::Timeout(outcome)))) => Ok(outcome),
            Some((Some(err), _)) => Err(err),
            _ => Err(Error::Os(libc::EINVAL)),
        }
    }

    /// How a cancel concluded. Blocks until completion.
    pub fn cancel_outcome(&self) -> Result<CancelOutcome> {
        self.wait();
        match self.resolved(|r| (r.err.clone(), r.value0)) {
            Some((_, Some(OpValue::Cancel(outcome)))) => Ok(outcome),
            Some((Some(err), _)) => Err(err),
            _ => Err(Error::Os(libc::EINVAL)),
        }
    }

    /// The peer address recorded by an accept. Blocks until completion.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.wait();
        self.resolved(|r| match (&r.err, &r.value1) {
            (None, Some(OpValue::Sockaddr(storage, len))) => {
                sockaddr_to_std(storage, *len)
            }
            _ => None,
        })
        .flatten()
    }

    /// The statx record filled in by a statx request. Blocks until
    /// completion.
    pub fn statx(&self) -> Result<libc::statx> {
        self.wait();
        match self.resolved(|r| (r.err.clone(), r.value0)) {
            Some((None, Some(OpValue::Statx(st)))) => Ok(st),
            Some((Some(err), _)) => Err(err),
            _ => Err(Error::Os(libc::EINVAL)),
        }
    }

    /// The request's primary byte buffer, for inspection after
    /// completion. Blocks until the kernel is done with it.
    pub fn buffer(&self) -> Option<&[u8]> {
        self.wait();
        self.buf.as_deref()
    }

    /// The secondary buffer (e.g. sendmsg/recvmsg control data).
    pub fn secondary_buffer(&self) -> Option<&[u8]> {
        self.wait();
        self.buf2.as_deref()
    }

    /// The vectored buffers of a readv/writev request.
    pub fn buffers(&self) -> Option<&[Vec<u8>]> {
        self.wait();
        self.bufs.as_deref()
    }

    /// The user info tag attached with [`with_info`](crate::request::with_info).
    pub fn info<T: 'static>(&self) -> Option<&T> {
        self.info.as_ref().and_then(|info| info.downcast_ref::<T>())
    }
}

/// The collective result of a linked or hard-linked batch: one result per
/// entry, in submission order, plus a group completion signal that fires
/// when every member has completed.
pub struct ResultGroup {
    results: Vec<Arc<OpResult>>,
    remaining: AtomicUsize,
    done_lock: Mutex<bool>,
    done: Condvar,
}

impl ResultGroup {
    pub(crate) fn new(results: Vec<Arc<OpResult>>) -> ResultGroup {
        let remaining = AtomicUsize::new(results.len());
        ResultGroup {
            results,
            remaining,
            done_lock: Mutex::new(false),
            done: Condvar::new(),
        }
    }

    /// The member results, in submission order.
    pub fn results(&self) -> &[Arc<OpResult>] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn is_completed(&self) -> bool {
        self.remaining.load(Ordering::Acquire) == 0
    }

    /// Block until every member of the chain has completed.
    pub fn wait(&self) {
        let mut done = self.done_lock.lock();
        while !*done {
            self.done.wait(&mut done);
        }
    }

    /// Like [`wait`](Self::wait) with an upper bound; returns whether the
    /// whole chain completed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut done = self.done_lock.lock();
        while !*done {
            if self.done.wait_for(&mut done, timeout).timed_out() {
                return *done;
            }
        }
        true
    }

    pub(crate) fn complete_one(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let mut done = self.done_lock.lock();
            *done = true;
            self.done.notify_all();
        }
    }
}

pub(crate) fn sockaddr_to_std(
    storage: &libc::sockaddr_storage,
    _len: libc::socklen_t,
) -> Option<SocketAddr> {
    match storage.ss_family as libc::c_int {
        libc::AF_INET => {
            let sin = unsafe { &*(storage as *const _ as *const libc::sockaddr_in) };
            let ip = Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr));
            Some(SocketAddr::V4(SocketAddrV4::new(
                ip,
                u16::from_be(sin.sin_port),
            )))
        }
        libc::AF_INET6 => {
            let sin6 = unsafe { &*(storage as *const _ as *const libc::sockaddr_in6) };
            let ip = Ipv6Addr::from(sin6.sin6_addr.s6_addr);
            Some(SocketAddr::V6(SocketAddrV6::new(
                ip,
                u16::from_be(sin6.sin6_port),
                sin6.sin6_flowinfo,
                sin6.sin6_scope_id,
            )))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(resolver: fn(&mut Resolution), res: i32) -> Resolution {
        let mut r = Resolution {
            res,
            err: None,
            value0: None,
            value1: None,
        };
        resolver(&mut r);
        r
    }

    #[test]
    fn test_errno_resolver() {
        assert_eq!(run(errno_resolver, 0).err, None);
        assert_eq!(run(errno_resolver, -libc::EBADF).err, Some(Error::Os(libc::EBADF)));
        assert_eq!(run(errno_resolver, -libc::ECANCELED).err, Some(Error::Canceled));
    }

    #[test]
    fn test_fd_resolver() {
        let r = run(fd_resolver, 7);
        assert_eq!(r.err, None);
        assert!(matches!(r.value0, Some(OpValue::Int(7))));

        let r = run(fd_resolver, -libc::EMFILE);
        assert_eq!(r.err, Some(Error::Os(libc::EMFILE)));
        assert!(r.value0.is_none());
    }

    #[test]
    fn test_timeout_resolver() {
        let r = run(timeout_resolver, -libc::ETIME);
        assert_eq!(r.err, Some(Error::TimerExpired));
        assert!(matches!(
            r.value0,
            Some(OpValue::Timeout(TimeoutOutcome::Expired))
        ));

        let r = run(timeout_resolver, 0);
        assert_eq!(r.err, None);
        assert!(matches!(
            r.value0,
            Some(OpValue::Timeout(TimeoutOutcome::CountSatisfied))
        ));
    }

    #[test]
    fn test_cancel_resolver() {
        let r = run(cancel_resolver, 0);
        assert!(matches!(r.value0, Some(OpValue::Cancel(CancelOutcome::Canceled))));

        let r = run(cancel_resolver, -libc::EALREADY);
        assert_eq!(r.err, None);
        assert!(matches!(
            r.value0,
            Some(OpValue::Cancel(CancelOutcome::MaybeCanceled))
        ));

        let r = run(cancel_resolver, -libc::ENOENT);
        assert_eq!(r.err, Some(Error::NotFound));
    }

    #[test]
    fn test_remove_timeout_resolver() {
        assert_eq!(run(remove_timeout_resolver, 0).err, None);
        assert_eq!(
            run(remove_timeout_resolver, -libc::EBUSY).err,
            Some(Error::AlreadyCompleted)
        );
        assert_eq!(
            run(remove_timeout_resolver, -libc::ENOENT).err,
            Some(Error::NotFound)
        );
    }

    #[test]
    fn test_result_completes_once() {
        let result = OpResult::new(0, None, None, None, None, None);
        assert!(!result.is_completed());
        result.complete(3);
        result.complete(-libc::EBADF);
        assert_eq!(result.raw_result(), Some(3));
        assert_eq!(result.err(), None);
    }

    #[test]
    fn test_group_countdown() {
        let results = vec![
            Arc::new(OpResult::new(0, None, None, None, None, None)),
            Arc::new(OpResult::new(0, None, None, None, None, None)),
        ];
        let group = ResultGroup::new(results);
        assert!(!group.is_completed());
        group.complete_one();
        assert!(!group.is_completed());
        group.complete_one();
        assert!(group.is_completed());
        group.wait();
    }
}
