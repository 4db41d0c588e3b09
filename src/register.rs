//! Registered (fixed) file support.
//!
//! The kernel-side file table is mirrored locally as a dense fd slice
//! with `-1` holes. A map of hole runs (start slot -> run length) lets
//! new registrations reuse freed slots with a single one-slot
//! FILES_UPDATE instead of rewriting the whole table.

use std::collections::HashMap;
use std::io;
use std::os::unix::io::RawFd;

use parking_lot::{Mutex, RwLock};

use crate::sys;

pub(crate) struct FileRegister {
    ring_fd: RawFd,
    /// Structure lock: fd slice, hole runs, kernel updates.
    table: Mutex<Table>,
    /// Lookup lock, separate so the submit path never waits behind a
    /// kernel files-update.
    index: RwLock<HashMap<RawFd, usize>>,
}

#[derive(Clone)]
struct Table {
    fds: Vec<RawFd>,
    holes: HashMap<usize, usize>,
    registered: bool,
}

impl Table {
    fn new() -> Table {
        Table {
            fds: Vec::new(),
            holes: HashMap::new(),
            registered: false,
        }
    }

    /// Claim the lowest-numbered hole slot, shrinking its run.
    fn take_slot(&mut self) -> Option<usize> {
        let start = self.holes.keys().copied().min()?;
        let len = self.holes.remove(&start)?;
        if len > 1 {
            self.holes.insert(start + 1, len - 1);
        }
        Some(start)
    }

    /// Turn `slot` into a hole, merging with adjacent runs on both sides.
    fn free_slot(&mut self, slot: usize) {
        self.fds[slot] = -1;

        let mut start = slot;
        let mut len = 1;

        let before = self
            .holes
            .iter()
            .find(|&(&s, &l)| s + l == slot)
            .map(|(&s, &l)| (s, l));
        if let Some((s, l)) = before {
            self.holes.remove(&s);
            start = s;
            len += l;
        }
        if let Some(l) = self.holes.remove(&(slot + 1)) {
            len += l;
        }

        self.holes.insert(start, len);
    }

    /// Place descriptors into holes first, then append; returns the
    /// chosen slot per descriptor.
    fn place(&mut self, fds: &[RawFd]) -> Vec<(RawFd, usize)> {
        let mut placed = Vec::with_capacity(fds.len());
        for &fd in fds {
            let slot = match self.take_slot() {
                Some(slot) => {
                    self.fds[slot] = fd;
                    slot
                }
                None => {
                    self.fds.push(fd);
                    self.fds.len() - 1
                }
            };
            placed.push((fd, slot));
        }
        placed
    }
}

impl FileRegister {
    pub(crate) fn new(ring_fd: RawFd) -> FileRegister {
        FileRegister {
            ring_fd,
            table: Mutex::new(Table::new()),
            index: RwLock::new(HashMap::new()),
        }
    }

    /// The registered slot of `fd`, if any. Takes only the read lock.
    pub(crate) fn index_of(&self, fd: RawFd) -> Option<usize> {
        if fd < 0 {
            return None;
        }
        self.index.read().get(&fd).copied()
    }

    /// Register one descriptor, reusing a hole when one exists.
    pub(crate) fn register(&self, fd: RawFd) -> io::Result<()> {
        self.register_many(&[fd])
    }

    /// Register descriptors, filling holes first and appending the rest.
    /// Already-registered and negative descriptors are skipped.
    pub(crate) fn register_many(&self, fds: &[RawFd]) -> io::Result<()> {
        let fresh: Vec<RawFd> = {
            let index = self.index.read();
            let mut fresh = Vec::with_capacity(fds.len());
            for &fd in fds {
                if fd >= 0 && !index.contains_key(&fd) && !fresh.contains(&fd) {
                    fresh.push(fd);
                }
            }
            fresh
        };
        if fresh.is_empty() {
            return Ok(());
        }

        let mut table = self.table.lock();

        if !table.registered {
            table.fds = fresh.clone();
            self.kernel_register(&table.fds)?;
            table.registered = true;

            let mut index = self.index.write();
            for (slot, &fd) in table.fds.iter().enumerate() {
                index.insert(fd, slot);
            }
            return Ok(());
        }

        let snapshot = table.clone();
        let placed = table.place(&fresh);

        // One full-table refresh covers both reused holes and the
        // appended tail.
        if let Err(err) = self.kernel_update(0, &table.fds) {
            *table = snapshot;
            return Err(err);
        }

        let mut index = self.index.write();
        for (fd, slot) in placed {
            index.insert(fd, slot);
        }
        Ok(())
    }

    /// Unregister one descriptor, leaving a reusable hole.
    pub(crate) fn unregister(&self, fd: RawFd) -> io::Result<()> {
        self.unregister_many(&[fd])
    }

    pub(crate) fn unregister_many(&self, fds: &[RawFd]) -> io::Result<()> {
        let mut table = self.table.lock();
        let snapshot = table.clone();

        let mut freed = Vec::with_capacity(fds.len());
        {
            let index = self.index.read();
            for &fd in fds {
                if let Some(&slot) = index.get(&fd) {
                    if table.fds[slot] == fd {
                        table.free_slot(slot);
                        freed.push((fd, slot));
                    }
                }
            }
        }
        if freed.is_empty() {
            return Ok(());
        }

        for &(_, slot) in &freed {
            if let Err(err) = self.kernel_update(slot, &table.fds[slot..slot + 1]) {
                *table = snapshot;
                return Err(err);
            }
        }

        let mut index = self.index.write();
        for (fd, _) in freed {
            index.remove(&fd);
        }
        Ok(())
    }

    /// Drop the whole kernel file table. Used on engine close.
    pub(crate) fn unregister_all(&self) -> io::Result<()> {
        let mut table = self.table.lock();
        if !table.registered {
            return Ok(());
        }

        let ret = unsafe {
            sys::io_uring_register(
                self.ring_fd,
                sys::IORING_UNREGISTER_FILES,
                std::ptr::null(),
                0,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        *table = Table::new();
        self.index.write().clear();
        Ok(())
    }

    fn kernel_register(&self, fds: &[RawFd]) -> io::Result<()> {
        let ret = unsafe {
            sys::io_uring_register(
                self.ring_fd,
                sys::IORING_REGISTER_FILES,
                fds.as_ptr().cast(),
                fds.len() as u32,
            )
        };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn kernel_update(&self, offset: usize, fds: &[RawFd]) -> io::Result<()> {
        let update = sys::io_uring_files_update {
            offset: offset as u32,
            resv: 0,
            fds: fds.as_ptr() as u64,
        };
        let ret = unsafe {
            sys::io_uring_register(
                self.ring_fd,
                sys::IORING_REGISTER_FILES_UPDATE,
                (&update as *const sys::io_uring_files_update).cast(),
                fds.len() as u32,
            )
        };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(fds: &[RawFd]) -> Table {
        let mut t = Table::new();
        t.fds = fds.to_vec();
        t.registered = true;
        for (slot, &fd) in fds.iter().enumerate() {
            if fd == -1 {
                t.free_slot(slot);
            }
        }
        t
    }

    #[test]
    fn test_take_lowest_hole() {
        let mut t = table(&[10, -1, 12, -1, 14]);
        assert_eq!(t.take_slot(), Some(1));
        assert_eq!(t.take_slot(), Some(3));
        assert_eq!(t.take_slot(), None);
    }

    #[test]
    fn test_free_merges_adjacent_runs() {
        let mut t = table(&[10, 11, 12, 13, 14]);
        t.free_slot(1);
        t.free_slot(3);
        assert_eq!(t.holes.len(), 2);

        // freeing slot 2 bridges both runs into one
        t.free_slot(2);
        assert_eq!(t.holes.len(), 1);
        assert_eq!(t.holes.get(&1), Some(&3));
    }

    #[test]
    fn test_place_fills_holes_then_appends() {
        let mut t = table(&[10, -1, 12]);
        let placed = t.place(&[20, 21]);
        assert_eq!(placed, vec![(20, 1), (21, 3)]);
        assert_eq!(t.fds, vec![10, 20, 12, 21]);
        assert!(t.holes.is_empty());
    }

    #[test]
    fn test_holes_cover_every_negative_slot() {
        let mut t = table(&[10, 11, 12, 13]);
        t.free_slot(0);
        t.free_slot(2);
        t.free_slot(1);

        let mut covered = vec![false; t.fds.len()];
        for (&start, &len) in &t.holes {
            for slot in start..start + len {
                covered[slot] = true;
            }
        }
        for (slot, &fd) in t.fds.iter().enumerate() {
            assert_eq!(fd == -1, covered[slot], "slot {}", slot);
        }
    }
}
