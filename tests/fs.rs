mod common;

use std::ffi::CString;
use std::io::{Read as _, Seek, SeekFrom, Write as _};
use std::os::unix::io::AsRawFd;

use common::temp_file_with;
use uring::{opcode, Uring};

#[test]
fn test_read_small_file() -> anyhow::Result<()> {
    let ring = Uring::new(4)?;
    let file = temp_file_with(b"hello, world!")?;

    let request = opcode::Read::new(file.as_raw_fd(), vec![0u8; 32]).build();
    let (_cookie, result) = ring.submit(request, None)?;

    assert_eq!(result.return_int()?, 13);
    assert_eq!(result.err(), None);
    assert_eq!(&result.buffer().unwrap()[..13], b"hello, world!");

    ring.close()?;
    Ok(())
}

#[test]
fn test_write_then_read_at_offset() -> anyhow::Result<()> {
    let ring = Uring::new(4)?;
    let mut file = tempfile::tempfile()?;

    let request = opcode::Write::new(file.as_raw_fd(), b"0123456789".to_vec()).build();
    let (_, result) = ring.submit(request, None)?;
    assert_eq!(result.return_int()?, 10);

    let request = opcode::Read::new(file.as_raw_fd(), vec![0u8; 4])
        .offset(6)
        .build();
    let (_, result) = ring.submit(request, None)?;
    assert_eq!(result.return_int()?, 4);
    assert_eq!(result.buffer().unwrap(), b"6789");

    // the write really reached the file
    let mut check = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut check)?;
    assert_eq!(check, b"0123456789");

    Ok(())
}

#[test]
fn test_readv_writev() -> anyhow::Result<()> {
    let ring = Uring::new(4)?;
    let file = tempfile::tempfile()?;

    let request = opcode::Writev::new(
        file.as_raw_fd(),
        vec![b"abcd".to_vec(), b"efgh".to_vec()],
    )
    .build();
    let (_, result) = ring.submit(request, None)?;
    assert_eq!(result.return_int()?, 8);

    let request = opcode::Readv::new(file.as_raw_fd(), vec![vec![0u8; 3], vec![0u8; 5]]).build();
    let (_, result) = ring.submit(request, None)?;
    assert_eq!(result.return_int()?, 8);

    let bufs = result.buffers().unwrap();
    assert_eq!(&bufs[0], b"abc");
    assert_eq!(&bufs[1], b"defgh");

    Ok(())
}

#[test]
fn test_openat_statx_fsync() -> anyhow::Result<()> {
    let ring = Uring::new(4)?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("scratch");
    let cpath = CString::new(path.to_str().unwrap())?;

    let request = opcode::OpenAt::new(libc::AT_FDCWD, cpath.clone())
        .flags(libc::O_CREAT | libc::O_RDWR)
        .mode(0o600)
        .build();
    let (_, result) = ring.submit(request, None)?;
    let fd = result.return_fd()?;
    assert!(fd >= 0);

    let (_, result) = ring.submit(
        opcode::Write::new(fd, b"payload".to_vec()).build(),
        None,
    )?;
    assert_eq!(result.return_int()?, 7);

    let (_, result) = ring.submit(opcode::Fsync::new(fd).build(), None)?;
    assert_eq!(result.err(), None);

    let request = opcode::Statx::new(libc::AT_FDCWD, cpath)
        .mask(libc::STATX_SIZE)
        .build();
    let (_, result) = ring.submit(request, None)?;
    let stat = result.statx()?;
    assert_eq!(stat.stx_size, 7);

    let (_, result) = ring.submit(opcode::Close::new(fd).build(), None)?;
    assert_eq!(result.err(), None);

    Ok(())
}

#[test]
fn test_fallocate() -> anyhow::Result<()> {
    let ring = Uring::new(2)?;
    let file = tempfile::tempfile()?;

    let (_, result) = ring.submit(
        opcode::Fallocate::new(file.as_raw_fd(), 4096).build(),
        None,
    )?;
    assert_eq!(result.err(), None);
    assert_eq!(file.metadata()?.len(), 4096);

    Ok(())
}

#[test]
fn test_linked_copy() -> anyhow::Result<()> {
    const LEN: usize = 32 * 1024;

    let ring = Uring::new(4)?;

    let pattern: Vec<u8> = (0..LEN).map(|i| (i * 7 % 251) as u8).collect();
    let src = temp_file_with(&pattern)?;
    let mut dst = tempfile::tempfile()?;

    // One shared buffer: the pread fills it, the linked pwrite drains it.
    // It must stay untouched until the write's completion.
    let mut buf = vec![0u8; LEN];
    let requests = unsafe {
        vec![
            opcode::read_raw(src.as_raw_fd(), buf.as_mut_ptr(), LEN as u32, 0),
            opcode::write_raw(dst.as_raw_fd(), buf.as_ptr(), LEN as u32, 0),
        ]
    };

    let group = ring.submit_linked(requests, None)?;
    group.wait();

    assert_eq!(group.results()[0].return_int()? as usize, LEN);
    assert_eq!(group.results()[1].return_int()? as usize, LEN);
    assert_eq!(buf, pattern);

    let mut copied = Vec::new();
    dst.seek(SeekFrom::Start(0))?;
    dst.read_to_end(&mut copied)?;
    assert_eq!(copied, pattern);

    Ok(())
}

#[test]
fn test_linked_short_circuit() -> anyhow::Result<()> {
    let ring = Uring::new(4)?;
    let file = temp_file_with(b"data")?;

    // A read from an invalid fd fails, so the linked read never runs and
    // completes as canceled without touching its buffer.
    let requests = vec![
        opcode::Read::new(-1, vec![0u8; 4]).build(),
        opcode::Read::new(file.as_raw_fd(), vec![1u8; 4]).build(),
    ];

    let group = ring.submit_linked(requests, None)?;
    group.wait();

    assert_eq!(group.results()[0].err(), Some(uring::Error::Os(libc::EBADF)));
    assert_eq!(group.results()[1].err(), Some(uring::Error::Canceled));
    assert_eq!(group.results()[1].buffer().unwrap(), &[1u8; 4]);

    Ok(())
}

#[test]
fn test_hardlinked_continues() -> anyhow::Result<()> {
    let ring = Uring::new(4)?;
    let file = temp_file_with(b"data")?;

    let requests = vec![
        opcode::Read::new(-1, vec![0u8; 4]).build(),
        opcode::Read::new(file.as_raw_fd(), vec![0u8; 4]).build(),
    ];

    let group = ring.submit_hardlinked(requests, None)?;
    group.wait();

    assert_eq!(group.results()[0].err(), Some(uring::Error::Os(libc::EBADF)));
    assert_eq!(group.results()[1].return_int()?, 4);
    assert_eq!(group.results()[1].buffer().unwrap(), b"data");

    Ok(())
}
