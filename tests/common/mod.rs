#![allow(dead_code)]

use std::io::Write;
use std::os::unix::io::{AsRawFd, RawFd};

/// An owned fd for descriptors handed back by raw syscalls in tests.
pub struct Fd(pub RawFd);

impl AsRawFd for Fd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl Drop for Fd {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.0);
        }
    }
}

/// A tempfile pre-filled with `content`.
pub fn temp_file_with(content: &[u8]) -> anyhow::Result<std::fs::File> {
    let mut file = tempfile::tempfile()?;
    file.write_all(content)?;
    file.sync_all()?;
    Ok(file)
}
