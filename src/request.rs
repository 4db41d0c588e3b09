//! Request descriptors and the in-flight registry.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::result::{OpResult, Resolution, Resolver, ResultGroup};
use crate::squeue::SqEntry;
use crate::Sink;

/// A request descriptor: a one-shot closure that fills a leased
/// submission entry and records resolver, pins and buffers on the
/// per-request state. Builders in [`opcode`](crate::opcode) produce
/// these; custom operations can construct them directly.
pub struct Request(pub(crate) Box<dyn FnOnce(&mut SqEntry, &mut RequestState) + Send>);

impl Request {
    pub fn new(
        build: impl FnOnce(&mut SqEntry, &mut RequestState) + Send + 'static,
    ) -> Request {
        Request(Box::new(build))
    }
}

/// Tag a request with a caller-supplied value, retrievable from the
/// result via [`OpResult::info`](crate::OpResult::info).
pub fn with_info<T: Any + Send + Sync>(request: Request, info: T) -> Request {
    Request::new(move |sqe, state| {
        (request.0)(sqe, state);
        state.set_info(info);
    })
}

/// Per-request state assembled while a builder runs.
///
/// Everything recorded here stays alive for the full in-flight window:
/// holds are released by the dispatcher when the completion arrives,
/// buffers move into the result for inspection afterwards.
pub struct RequestState {
    pub(crate) resolver: Option<Resolver>,
    pub(crate) holds: Vec<Box<dyn Any + Send>>,
    pub(crate) buf: Option<Vec<u8>>,
    pub(crate) buf2: Option<Vec<u8>>,
    pub(crate) bufs: Option<Vec<Vec<u8>>>,
    pub(crate) info: Option<Box<dyn Any + Send + Sync>>,
}

impl RequestState {
    pub(crate) fn new() -> RequestState {
        RequestState {
            resolver: None,
            holds: Vec::new(),
            buf: None,
            buf2: None,
            bufs: None,
            info: None,
        }
    }

    /// Choose how the kernel return value will be interpreted.
    pub fn set_resolver(
        &mut self,
        resolver: impl FnOnce(&mut Resolution) + Send + 'static,
    ) {
        self.resolver = Some(Box::new(resolver));
    }

    /// Keep `value` alive until the request completes. Used for kernel
    /// visible argument structures: msghdr, sockaddr, timespec, path
    /// bytes. Box the value *before* taking its address so the pinned
    /// allocation outlives any move of the box itself.
    pub fn hold(&mut self, value: impl Any + Send) {
        self.holds.push(Box::new(value));
    }

    /// Record the primary byte buffer of the request.
    pub fn set_buffer(&mut self, buf: Vec<u8>) {
        self.buf = Some(buf);
    }

    /// Record the secondary byte buffer (control data).
    pub fn set_secondary_buffer(&mut self, buf: Vec<u8>) {
        self.buf2 = Some(buf);
    }

    /// Record the vectored buffers of the request.
    pub fn set_buffer_list(&mut self, bufs: Vec<Vec<u8>>) {
        self.bufs = Some(bufs);
    }

    /// Attach an opaque user tag to the eventual result.
    pub fn set_info(&mut self, info: impl Any + Send + Sync) {
        self.info = Some(Box::new(info));
    }

    pub(crate) fn into_result(self, opcode: u8) -> (OpResult, Vec<Box<dyn Any + Send>>) {
        let RequestState {
            resolver,
            holds,
            buf,
            buf2,
            bufs,
            info,
        } = self;
        (
            OpResult::new(opcode, resolver, info, buf, buf2, bufs),
            holds,
        )
    }
}

/// One in-flight request, owned by the registry from submission until its
/// completion event is dispatched.
pub(crate) struct InFlight {
    pub opcode: u8,
    pub result: Arc<OpResult>,
    pub holds: Vec<Box<dyn Any + Send>>,
    pub sink: Option<Sink>,
    pub group: Option<Arc<ResultGroup>>,
}

/// Cookie-indexed table of in-flight requests.
///
/// Cookies are minted from a monotonic counter, so they are unique for
/// the lifetime of the engine and never collide with a live request.
pub(crate) struct Registry {
    next_cookie: AtomicU64,
    states: Mutex<HashMap<u64, InFlight>>,
}

impl Registry {
    pub(crate) fn new() -> Registry {
        Registry {
            next_cookie: AtomicU64::new(1),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn mint(&self) -> u64 {
        self.next_cookie.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn insert(&self, cookie: u64, state: InFlight) {
        self.states.lock().insert(cookie, state);
    }

    pub(crate) fn remove(&self, cookie: u64) -> Option<InFlight> {
        self.states.lock().remove(&cookie)
    }

    pub(crate) fn len(&self) -> usize {
        self.states.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookies_unique() {
        let registry = Registry::new();
        let a = registry.mint();
        let b = registry.mint();
        let c = registry.mint();
        assert!(a != 0, "cookie 0 is never handed out");
        assert!(a < b && b < c);
    }

    #[test]
    fn test_insert_remove() {
        let registry = Registry::new();
        let cookie = registry.mint();
        let (result, holds) = RequestState::new().into_result(0);
        registry.insert(
            cookie,
            InFlight {
                opcode: 0,
                result: Arc::new(result),
                holds,
                sink: None,
                group: None,
            },
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(cookie).is_some());
        assert!(registry.remove(cookie).is_none());
        assert_eq!(registry.len(), 0);
    }
}
