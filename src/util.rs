use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::ptr;

use crate::sys;

/// The ring file descriptor, owned from the setup syscall until the
/// engine is torn down.
pub(crate) struct RingFd(RawFd);

impl RingFd {
    /// Create a ring with `entries` submission slots, letting the kernel
    /// fill in the rest of `params` (actual capacities and the byte
    /// offsets of every ring field).
    pub fn setup(entries: u32, params: &mut sys::io_uring_params) -> io::Result<RingFd> {
        let fd = unsafe { sys::io_uring_setup(entries, params) };
        if fd < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(RingFd(fd))
        }
    }
}

impl AsRawFd for RingFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl Drop for RingFd {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.0);
        }
    }
}

/// One shared ring region, mapped from the ring fd at a kernel-defined
/// offset and unmapped on drop.
///
/// The head/tail/mask/flags words and the entry arrays live at byte
/// offsets the kernel reports in `io_uring_params`;
/// [`field`](Self::field) turns such an offset into a typed pointer
/// into the mapping.
pub(crate) struct Mmap {
    base: *mut u8,
    len: usize,
}

impl Mmap {
    pub fn map_ring(fd: &RingFd, offset: u64, len: usize) -> io::Result<Mmap> {
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_POPULATE,
                fd.as_raw_fd(),
                offset as libc::off_t,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Mmap {
            base: base as *mut u8,
            len,
        })
    }

    /// A typed pointer to the ring field `offset` bytes into the region.
    ///
    /// The offset must come from the kernel's offset block for this
    /// region, which keeps the result in bounds and aligned for `T`.
    pub unsafe fn field<T>(&self, offset: u32) -> *mut T {
        self.base.add(offset as usize) as *mut T
    }
}

impl Drop for Mmap {
    fn drop(&mut self) {
        if unsafe { libc::munmap(self.base as *mut _, self.len) } != 0 {
            log::warn!("munmap failed: {}", io::Error::last_os_error());
        }
    }
}
