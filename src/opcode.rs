//! Operation builders.
//!
//! Each builder captures the arguments of one I/O operation, and
//! `build()` turns it into a [`Request`] that fills a leased submission
//! entry and pins everything the kernel will dereference until the
//! completion arrives.

#![allow(clippy::new_without_default)]

use std::ffi::CString;
use std::mem;
use std::net::SocketAddr;
use std::os::unix::io::RawFd;
use std::time::Duration;

use crate::request::Request;
use crate::result::{
    cancel_resolver, errno_resolver, fd_resolver, remove_timeout_resolver, timeout_resolver,
    OpValue, Resolution,
};
use crate::squeue::Flags;
use crate::sys;

pub use sys::__kernel_timespec as Timespec;
pub use sys::open_how as OpenHow;

/// Kernel-visible argument structures (msghdr, iovec arrays, sockaddr)
/// contain raw pointers into memory that is pinned alongside them, so
/// moving them between threads is sound.
struct Pinned<T>(T);

unsafe impl<T> std::marker::Send for Pinned<T> {}

macro_rules! opcode {
    (
        $( #[$outer:meta] )*
        pub struct $name:ident {
            $( #[$new_meta:meta] )*
            $( $field:ident : $tname:ty ),* $(,)?
            ;;
            $(
                $( #[$opt_meta:meta] )*
                $opt_field:ident : $opt_tname:ty = $default:expr
            ),* $(,)?
        }
    ) => {
        $( #[$outer] )*
        pub struct $name {
            $( $field : $tname, )*
            $( $opt_field : $opt_tname, )*
        }

        impl $name {
            $( #[$new_meta] )*
            pub fn new( $( $field : $tname ),* ) -> Self {
                $name {
                    $( $field, )*
                    $( $opt_field: $default, )*
                }
            }

            $(
                $( #[$opt_meta] )*
                pub fn $opt_field(mut self, $opt_field: $opt_tname) -> Self {
                    self.$opt_field = $opt_field;
                    self
                }
            )*
        }
    }
}

fn timespec_from(d: Duration) -> Timespec {
    Timespec {
        tv_sec: d.as_secs() as i64,
        tv_nsec: d.subsec_nanos() as i64,
    }
}

fn sockaddr_from_std(addr: &SocketAddr) -> (libc::sockaddr_storage, libc::socklen_t) {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    let len = match addr {
        SocketAddr::V4(v4) => {
            let sin = unsafe { &mut *(&mut storage as *mut _ as *mut libc::sockaddr_in) };
            sin.sin_family = libc::AF_INET as libc::sa_family_t;
            sin.sin_port = v4.port().to_be();
            sin.sin_addr = libc::in_addr {
                s_addr: u32::from(*v4.ip()).to_be(),
            };
            mem::size_of::<libc::sockaddr_in>()
        }
        SocketAddr::V6(v6) => {
            let sin6 = unsafe { &mut *(&mut storage as *mut _ as *mut libc::sockaddr_in6) };
            sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sin6.sin6_port = v6.port().to_be();
            sin6.sin6_flowinfo = v6.flowinfo();
            sin6.sin6_addr.s6_addr = v6.ip().octets();
            sin6.sin6_scope_id = v6.scope_id();
            mem::size_of::<libc::sockaddr_in6>()
        }
    };
    (storage, len as libc::socklen_t)
}

opcode!(
    /// Do not perform any I/O.
    ///
    /// Useful for waking the ring or exercising the completion path.
    #[derive(Debug)]
    pub struct Nop { ;; }
);

impl Nop {
    pub fn build(self) -> Request {
        Request::new(move |sqe, _state| {
            sqe.prep(sys::IORING_OP_NOP, -1, 0, 0, 0);
        })
    }
}

opcode!(
    /// Read into an owned buffer, like `pread(2)` with offset 0 by default.
    ///
    /// The buffer travels with the request; inspect it through
    /// [`OpResult::buffer`](crate::OpResult::buffer) after completion.
    pub struct Read {
        fd: RawFd,
        buf: Vec<u8>,
        ;;
        offset: u64 = 0,
        /// A bitwise OR of per-I/O flags as described in `preadv2(2)`.
        rw_flags: u32 = 0
    }
);

impl Read {
    pub fn build(self) -> Request {
        let Read {
            fd,
            mut buf,
            offset,
            rw_flags,
        } = self;
        let addr = buf.as_mut_ptr() as u64;
        let len = buf.len() as u32;

        Request::new(move |sqe, state| {
            state.set_resolver(fd_resolver);
            sqe.prep(sys::IORING_OP_READ, fd, addr, len, offset);
            sqe.set_op_flags(rw_flags);
            state.set_buffer(buf);
        })
    }
}

opcode!(
    /// Write an owned buffer, like `pwrite(2)` with offset 0 by default.
    pub struct Write {
        fd: RawFd,
        buf: Vec<u8>,
        ;;
        offset: u64 = 0,
        rw_flags: u32 = 0
    }
);

impl Write {
    pub fn build(self) -> Request {
        let Write {
            fd,
            buf,
            offset,
            rw_flags,
        } = self;
        let addr = buf.as_ptr() as u64;
        let len = buf.len() as u32;

        Request::new(move |sqe, state| {
            state.set_resolver(fd_resolver);
            sqe.prep(sys::IORING_OP_WRITE, fd, addr, len, offset);
            sqe.set_op_flags(rw_flags);
            state.set_buffer(buf);
        })
    }
}

/// Read into caller-owned memory.
///
/// # Safety
///
/// `ptr..ptr + len` must stay valid and otherwise untouched until the
/// request's completion fires.
pub unsafe fn read_raw(fd: RawFd, ptr: *mut u8, len: u32, offset: u64) -> Request {
    let addr = ptr as u64;
    Request::new(move |sqe, state| {
        state.set_resolver(fd_resolver);
        sqe.prep(sys::IORING_OP_READ, fd, addr, len, offset);
    })
}

/// Write from caller-owned memory.
///
/// # Safety
///
/// `ptr..ptr + len` must stay valid and unmodified until the request's
/// completion fires.
pub unsafe fn write_raw(fd: RawFd, ptr: *const u8, len: u32, offset: u64) -> Request {
    let addr = ptr as u64;
    Request::new(move |sqe, state| {
        state.set_resolver(fd_resolver);
        sqe.prep(sys::IORING_OP_WRITE, fd, addr, len, offset);
    })
}

opcode!(
    /// Vectored read, like `preadv2(2)`.
    pub struct Readv {
        fd: RawFd,
        bufs: Vec<Vec<u8>>,
        ;;
        offset: u64 = 0,
        rw_flags: u32 = 0
    }
);

impl Readv {
    pub fn build(self) -> Request {
        let Readv {
            fd,
            mut bufs,
            offset,
            rw_flags,
        } = self;
        let iovecs: Box<[libc::iovec]> = bufs
            .iter_mut()
            .map(|b| libc::iovec {
                iov_base: b.as_mut_ptr() as *mut _,
                iov_len: b.len(),
            })
            .collect();
        let addr = iovecs.as_ptr() as u64;
        let len = iovecs.len() as u32;
        let iovecs = Pinned(iovecs);

        Request::new(move |sqe, state| {
            state.set_resolver(fd_resolver);
            sqe.prep(sys::IORING_OP_READV, fd, addr, len, offset);
            sqe.set_op_flags(rw_flags);
            state.hold(iovecs);
            state.set_buffer_list(bufs);
        })
    }
}

opcode!(
    /// Vectored write, like `pwritev2(2)`.
    pub struct Writev {
        fd: RawFd,
        bufs: Vec<Vec<u8>>,
        ;;
        offset: u64 = 0,
        rw_flags: u32 = 0
    }
);

impl Writev {
    pub fn build(self) -> Request {
        let Writev {
            fd,
            mut bufs,
            offset,
            rw_flags,
        } = self;
        let iovecs: Box<[libc::iovec]> = bufs
            .iter_mut()
            .map(|b| libc::iovec {
                iov_base: b.as_mut_ptr() as *mut _,
                iov_len: b.len(),
            })
            .collect();
        let addr = iovecs.as_ptr() as u64;
        let len = iovecs.len() as u32;
        let iovecs = Pinned(iovecs);

        Request::new(move |sqe, state| {
            state.set_resolver(fd_resolver);
            sqe.prep(sys::IORING_OP_WRITEV, fd, addr, len, offset);
            sqe.set_op_flags(rw_flags);
            state.hold(iovecs);
            state.set_buffer_list(bufs);
        })
    }
}

opcode!(
    /// Send on a socket, like `send(2)`.
    pub struct Send {
        fd: RawFd,
        buf: Vec<u8>,
        ;;
        msg_flags: u32 = 0
    }
);

impl Send {
    pub fn build(self) -> Request {
        let Send { fd, buf, msg_flags } = self;
        let addr = buf.as_ptr() as u64;
        let len = buf.len() as u32;

        Request::new(move |sqe, state| {
            state.set_resolver(fd_resolver);
            sqe.prep(sys::IORING_OP_SEND, fd, addr, len, 0);
            sqe.set_op_flags(msg_flags);
            state.set_buffer(buf);
        })
    }
}

opcode!(
    /// Receive from a socket, like `recv(2)`.
    pub struct Recv {
        fd: RawFd,
        buf: Vec<u8>,
        ;;
        msg_flags: u32 = 0
    }
);

impl Recv {
    pub fn build(self) -> Request {
        let Recv { fd, mut buf, msg_flags } = self;
        let addr = buf.as_mut_ptr() as u64;
        let len = buf.len() as u32;

        Request::new(move |sqe, state| {
            state.set_resolver(fd_resolver);
            sqe.prep(sys::IORING_OP_RECV, fd, addr, len, 0);
            sqe.set_op_flags(msg_flags);
            state.set_buffer(buf);
        })
    }
}

opcode!(
    /// Send a message on a socket, like `sendmsg(2)`.
    pub struct SendMsg {
        fd: RawFd,
        buf: Vec<u8>,
        ;;
        /// Ancillary (control) data to send alongside the payload.
        control: Vec<u8> = Vec::new(),
        /// Destination address for unconnected sockets.
        dest: Option<SocketAddr> = None,
        msg_flags: u32 = 0
    }
);

impl SendMsg {
    pub fn build(self) -> Request {
        let SendMsg {
            fd,
            mut buf,
            mut control,
            dest,
            msg_flags,
        } = self;

        let name = dest.map(|addr| Box::new(sockaddr_from_std(&addr)));
        let mut iov = Box::new(libc::iovec {
            iov_base: buf.as_mut_ptr() as *mut _,
            iov_len: buf.len(),
        });

        let mut msg: Box<libc::msghdr> = Box::new(unsafe { mem::zeroed() });
        if let Some(ref name) = name {
            msg.msg_name = &name.0 as *const _ as *mut _;
            msg.msg_namelen = name.1;
        }
        msg.msg_iov = &mut *iov;
        msg.msg_iovlen = 1;
        if !control.is_empty() {
            msg.msg_control = control.as_mut_ptr() as *mut _;
            msg.msg_controllen = control.len() as _;
        }
        let msg_addr = &*msg as *const libc::msghdr as u64;
        let msg = Pinned(msg);
        let iov = Pinned(iov);
        let name = name.map(Pinned);

        Request::new(move |sqe, state| {
            state.set_resolver(fd_resolver);
            sqe.prep(sys::IORING_OP_SENDMSG, fd, msg_addr, 1, 0);
            sqe.set_op_flags(msg_flags);
            state.hold(msg);
            state.hold(iov);
            if let Some(name) = name {
                state.hold(name);
            }
            state.set_buffer(buf);
            state.set_secondary_buffer(control);
        })
    }
}

opcode!(
    /// Receive a message from a socket, like `recvmsg(2)`.
    ///
    /// The sender's address is recovered through
    /// [`OpResult::peer_addr`](crate::OpResult::peer_addr).
    pub struct RecvMsg {
        fd: RawFd,
        buf: Vec<u8>,
        ;;
        /// Buffer for ancillary (control) data.
        control: Vec<u8> = Vec::new(),
        msg_flags: u32 = 0
    }
);

impl RecvMsg {
    pub fn build(self) -> Request {
        let RecvMsg {
            fd,
            mut buf,
            mut control,
            msg_flags,
        } = self;

        let mut name: Box<libc::sockaddr_storage> = Box::new(unsafe { mem::zeroed() });
        let mut iov = Box::new(libc::iovec {
            iov_base: buf.as_mut_ptr() as *mut _,
            iov_len: buf.len(),
        });

        let mut msg: Box<libc::msghdr> = Box::new(unsafe { mem::zeroed() });
        msg.msg_name = &mut *name as *mut _ as *mut _;
        msg.msg_namelen = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
        msg.msg_iov = &mut *iov;
        msg.msg_iovlen = 1;
        if !control.is_empty() {
            msg.msg_control = control.as_mut_ptr() as *mut _;
            msg.msg_controllen = control.len() as _;
        }
        let msg_addr = &*msg as *const libc::msghdr as u64;

        let msg = Pinned(msg);
        let name = Pinned(name);
        let iov = Pinned(iov);
        let resolver = move |r: &mut Resolution| {
            let _keep = &iov;
            fd_resolver(r);
            if r.err.is_none() {
                r.value1 = Some(OpValue::Sockaddr(*name.0, msg.0.msg_namelen as libc::socklen_t));
            }
        };

        Request::new(move |sqe, state| {
            state.set_resolver(resolver);
            sqe.prep(sys::IORING_OP_RECVMSG, fd, msg_addr, 1, 0);
            sqe.set_op_flags(msg_flags);
            state.set_buffer(buf);
            state.set_secondary_buffer(control);
        })
    }
}

opcode!(
    /// Accept a connection, like `accept4(2)`.
    ///
    /// The peer address is recovered through
    /// [`OpResult::peer_addr`](crate::OpResult::peer_addr); the new
    /// socket through [`OpResult::return_fd`](crate::OpResult::return_fd).
    pub struct Accept {
        fd: RawFd,
        ;;
        /// `SOCK_NONBLOCK` / `SOCK_CLOEXEC`, as for `accept4(2)`.
        flags: u32 = 0
    }
);

impl Accept {
    pub fn build(self) -> Request {
        let Accept { fd, flags } = self;

        let mut name: Box<(libc::sockaddr_storage, libc::socklen_t)> = Box::new((
            unsafe { mem::zeroed() },
            mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t,
        ));
        let addr = &mut name.0 as *mut _ as u64;
        let len_addr = &mut name.1 as *mut _ as u64;

        let name = Pinned(name);
        let resolver = move |r: &mut Resolution| {
            fd_resolver(r);
            if r.err.is_none() {
                r.value1 = Some(OpValue::Sockaddr(name.0 .0, name.0 .1));
            }
        };

        Request::new(move |sqe, state| {
            state.set_resolver(resolver);
            sqe.prep(sys::IORING_OP_ACCEPT, fd, addr, 0, len_addr);
            sqe.set_op_flags(flags);
        })
    }
}

opcode!(
    /// Connect a socket, like `connect(2)`.
    pub struct Connect {
        fd: RawFd,
        addr: SocketAddr,
        ;;
    }
);

impl Connect {
    pub fn build(self) -> Request {
        let Connect { fd, addr } = self;

        let name = Box::new(sockaddr_from_std(&addr));
        let name_addr = &name.0 as *const _ as u64;
        let name_len = name.1;

        Request::new(move |sqe, state| {
            state.set_resolver(errno_resolver);
            sqe.prep(sys::IORING_OP_CONNECT, fd, name_addr, 0, name_len as u64);
            state.hold(Pinned(name));
        })
    }
}

opcode!(
    /// Open a file relative to a directory fd, like `openat(2)`.
    ///
    /// `O_LARGEFILE` is always added to the flags.
    pub struct OpenAt {
        dirfd: RawFd,
        path: CString,
        ;;
        flags: i32 = 0,
        mode: u32 = 0
    }
);

impl OpenAt {
    pub fn build(self) -> Request {
        let OpenAt {
            dirfd,
            path,
            flags,
            mode,
        } = self;
        let path_addr = path.as_ptr() as u64;

        Request::new(move |sqe, state| {
            state.set_resolver(fd_resolver);
            sqe.prep(sys::IORING_OP_OPENAT, dirfd, path_addr, mode, 0);
            sqe.set_op_flags((flags | libc::O_LARGEFILE) as u32);
            state.hold(path);
        })
    }
}

opcode!(
    /// Open a file with an `open_how` block, like `openat2(2)`.
    pub struct OpenAt2 {
        dirfd: RawFd,
        path: CString,
        how: OpenHow,
        ;;
    }
);

impl OpenAt2 {
    pub fn build(self) -> Request {
        let OpenAt2 { dirfd, path, how } = self;
        let path_addr = path.as_ptr() as u64;
        let how = Box::new(how);
        let how_addr = &*how as *const OpenHow as u64;

        Request::new(move |sqe, state| {
            state.set_resolver(fd_resolver);
            sqe.prep(
                sys::IORING_OP_OPENAT2,
                dirfd,
                path_addr,
                mem::size_of::<OpenHow>() as u32,
                how_addr,
            );
            state.hold(path);
            state.hold(how);
        })
    }
}

opcode!(
    /// Query file metadata, like `statx(2)`. The record is surfaced on
    /// the result via [`OpResult::statx`](crate::OpResult::statx).
    pub struct Statx {
        dirfd: RawFd,
        path: CString,
        ;;
        flags: i32 = 0,
        mask: u32 = 0
    }
);

impl Statx {
    pub fn build(self) -> Request {
        let Statx {
            dirfd,
            path,
            flags,
            mask,
        } = self;
        let path_addr = path.as_ptr() as u64;

        let record: Box<libc::statx> = Box::new(unsafe { mem::zeroed() });
        let record_addr = &*record as *const libc::statx as u64;

        let record = Pinned(record);
        let resolver = move |r: &mut Resolution| {
            errno_resolver(r);
            if r.err.is_none() {
                r.value0 = Some(OpValue::Statx(*record.0));
            }
        };

        Request::new(move |sqe, state| {
            state.set_resolver(resolver);
            sqe.prep(sys::IORING_OP_STATX, dirfd, path_addr, mask, record_addr);
            sqe.set_op_flags(flags as u32);
            state.hold(path);
        })
    }
}

opcode!(
    /// File sync, like `fsync(2)`.
    pub struct Fsync {
        fd: RawFd,
        ;;
        /// Either 0 for a full sync or `datasync` semantics via
        /// [`Fsync::datasync`].
        flags: u32 = 0
    }
);

impl Fsync {
    /// Data sync only, like `fdatasync(2)`.
    pub fn datasync(fd: RawFd) -> Fsync {
        Fsync::new(fd).flags(sys::IORING_FSYNC_DATASYNC)
    }

    pub fn build(self) -> Request {
        let Fsync { fd, flags } = self;

        Request::new(move |sqe, state| {
            state.set_resolver(errno_resolver);
            sqe.prep(sys::IORING_OP_FSYNC, fd, 0, 0, 0);
            sqe.set_op_flags(flags);
        })
    }
}

opcode!(
    /// Preallocate or punch file space, like `fallocate(2)`.
    pub struct Fallocate {
        fd: RawFd,
        len: u64,
        ;;
        offset: u64 = 0,
        mode: i32 = 0
    }
);

impl Fallocate {
    pub fn build(self) -> Request {
        let Fallocate {
            fd,
            len,
            offset,
            mode,
        } = self;

        Request::new(move |sqe, state| {
            state.set_resolver(errno_resolver);
            sqe.prep(sys::IORING_OP_FALLOCATE, fd, len, mode as u32, offset);
        })
    }
}

opcode!(
    /// Close a file descriptor.
    pub struct Close {
        fd: RawFd,
        ;;
    }
);

impl Close {
    pub fn build(self) -> Request {
        let Close { fd } = self;

        Request::new(move |sqe, state| {
            state.set_resolver(errno_resolver);
            sqe.prep(sys::IORING_OP_CLOSE, fd, 0, 0, 0);
        })
    }
}

/// Give advice about a memory range, like `madvise(2)`.
///
/// # Safety
///
/// The range must stay mapped until the request's completion fires.
pub unsafe fn madvise(addr: *mut libc::c_void, len: u32, advice: i32) -> Request {
    let addr = addr as u64;
    Request::new(move |sqe, state| {
        state.set_resolver(errno_resolver);
        sqe.prep(sys::IORING_OP_MADVISE, -1, addr, len, 0);
        sqe.set_op_flags(advice as u32);
    })
}

opcode!(
    /// Add, modify or delete an epoll interest, like `epoll_ctl(2)`.
    pub struct EpollCtl {
        epfd: RawFd,
        fd: RawFd,
        op: i32,
        ;;
        /// Required for `EPOLL_CTL_ADD` / `EPOLL_CTL_MOD`.
        event: Option<libc::epoll_event> = None
    }
);

impl EpollCtl {
    pub fn build(self) -> Request {
        let EpollCtl {
            epfd,
            fd,
            op,
            event,
        } = self;

        let event = event.map(Box::new);
        let event_addr = event
            .as_ref()
            .map(|e| &**e as *const libc::epoll_event as u64)
            .unwrap_or(0);

        Request::new(move |sqe, state| {
            state.set_resolver(errno_resolver);
            sqe.prep(sys::IORING_OP_EPOLL_CTL, epfd, event_addr, op as u32, fd as u64);
            if let Some(event) = event {
                state.hold(Pinned(event));
            }
        })
    }
}

opcode!(
    /// A timer that completes with [`TimeoutOutcome::Expired`] when the
    /// interval runs out, or [`TimeoutOutcome::CountSatisfied`] when
    /// `count` completion events arrive first.
    ///
    /// [`TimeoutOutcome::Expired`]: crate::TimeoutOutcome::Expired
    /// [`TimeoutOutcome::CountSatisfied`]: crate::TimeoutOutcome::CountSatisfied
    pub struct Timeout {
        ts: Timespec,
        ;;
        count: u32 = 0,
        flags: u32 = 0
    }
);

impl Timeout {
    /// A relative timeout.
    pub fn after(d: Duration) -> Timeout {
        Timeout::new(timespec_from(d))
    }

    /// An absolute timeout against `CLOCK_MONOTONIC`.
    pub fn at(ts: Timespec) -> Timeout {
        Timeout::new(ts).flags(sys::IORING_TIMEOUT_ABS)
    }

    pub fn build(self) -> Request {
        let Timeout { ts, count, flags } = self;

        let ts = Box::new(ts);
        let ts_addr = &*ts as *const Timespec as u64;

        Request::new(move |sqe, state| {
            state.set_resolver(timeout_resolver);
            sqe.prep(sys::IORING_OP_TIMEOUT, -1, ts_addr, 1, count as u64);
            sqe.set_op_flags(flags);
            state.hold(ts);
        })
    }
}

/// Wait for `count` completion events; the far-future timer only bounds
/// the wait nominally.
pub fn count_completions(count: u32) -> Request {
    // ~100 years, safely below the kernel's ktime_t nanosecond range.
    const FOREVER: Timespec = Timespec {
        tv_sec: 100 * 365 * 86400,
        tv_nsec: 0,
    };
    Timeout::new(FOREVER).count(count).build()
}

opcode!(
    /// Remove a previously submitted timeout by its cookie.
    pub struct TimeoutRemove {
        user_data: u64,
        ;;
    }
);

impl TimeoutRemove {
    pub fn build(self) -> Request {
        let TimeoutRemove { user_data } = self;

        Request::new(move |sqe, state| {
            state.set_resolver(remove_timeout_resolver);
            sqe.prep(sys::IORING_OP_TIMEOUT_REMOVE, -1, user_data, 0, 0);
        })
    }
}

opcode!(
    /// A timeout that guards the immediately preceding LINK-flagged
    /// entry, canceling it if it has not completed within the interval.
    pub struct LinkTimeout {
        ts: Timespec,
        ;;
    }
);

impl LinkTimeout {
    pub fn after(d: Duration) -> LinkTimeout {
        LinkTimeout::new(timespec_from(d))
    }

    pub fn build(self) -> Request {
        let LinkTimeout { ts } = self;

        let ts = Box::new(ts);
        let ts_addr = &*ts as *const Timespec as u64;

        Request::new(move |sqe, state| {
            state.set_resolver(timeout_resolver);
            sqe.prep(sys::IORING_OP_LINK_TIMEOUT, -1, ts_addr, 1, 0);
            state.hold(ts);
        })
    }
}

opcode!(
    /// Cancel an in-flight request by its cookie.
    pub struct AsyncCancel {
        user_data: u64,
        ;;
    }
);

impl AsyncCancel {
    pub fn build(self) -> Request {
        let AsyncCancel { user_data } = self;

        Request::new(move |sqe, state| {
            state.set_resolver(cancel_resolver);
            sqe.prep(sys::IORING_OP_ASYNC_CANCEL, -1, user_data, 0, 0);
        })
    }
}

/// Guard `request` with a per-request deadline: a two-entry batch of the
/// request (LINK-flagged) followed by a link timeout. Submit the pair
/// with [`Uring::submit_many`](crate::Uring::submit_many) or, more
/// conveniently, [`Uring::submit_with_timeout`](crate::Uring::submit_with_timeout).
///
/// The link timeout's own completion is internal bookkeeping and never
/// reaches a sink.
pub fn with_timeout(request: Request, timeout: Duration) -> Vec<Request> {
    let guarded = Request::new(move |sqe, state| {
        (request.0)(sqe, state);
        sqe.set_flags(Flags::IO_LINK);
    });
    vec![guarded, LinkTimeout::after(timeout).build()]
}
