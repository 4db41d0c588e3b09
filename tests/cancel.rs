mod common;

use std::net::TcpListener;
use std::os::unix::io::AsRawFd;
use std::thread;
use std::time::Duration;

use common::Fd;
use uring::{opcode, CancelOutcome, Error, Uring};

#[test]
fn test_cancel_inflight_accept() -> anyhow::Result<()> {
    let ring = Uring::new(4)?;

    // no connection ever arrives, so the accept parks in the kernel
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let (cookie, accept_result) =
        ring.submit(opcode::Accept::new(listener.as_raw_fd()).build(), None)?;

    thread::sleep(Duration::from_millis(100));
    assert!(!accept_result.is_completed());

    let (_, cancel_result) = ring.cancel(cookie, None)?;

    let outcome = cancel_result.cancel_outcome()?;
    assert!(matches!(
        outcome,
        CancelOutcome::Canceled | CancelOutcome::MaybeCanceled
    ));
    assert_eq!(accept_result.err(), Some(Error::Canceled));

    ring.close()?;
    Ok(())
}

#[test]
fn test_cancel_inflight_pipe_read() -> anyhow::Result<()> {
    let ring = Uring::new(4)?;

    let (rp, wp) = nix::unistd::pipe()?;
    let (rp, _wp) = (Fd(rp), Fd(wp));

    let (cookie, read_result) = ring.submit(
        opcode::Read::new(rp.as_raw_fd(), vec![0u8; 8]).build(),
        None,
    )?;

    thread::sleep(Duration::from_millis(100));
    ring.cancel(cookie, None)?;

    read_result.wait();
    assert!(read_result.err().is_some());

    Ok(())
}

#[test]
fn test_cancel_completed_request() -> anyhow::Result<()> {
    let ring = Uring::new(4)?;

    let (cookie, result) = ring.submit(opcode::Nop::new().build(), None)?;
    result.wait();

    let (_, cancel_result) = ring.cancel(cookie, None)?;
    assert_eq!(cancel_result.cancel_outcome(), Err(Error::NotFound));

    Ok(())
}

#[test]
fn test_cancel_unknown_cookie() -> anyhow::Result<()> {
    let ring = Uring::new(4)?;

    let (_, cancel_result) = ring.cancel(0xdead_beef, None)?;
    assert_eq!(cancel_result.cancel_outcome(), Err(Error::NotFound));
    assert_eq!(cancel_result.err(), Some(Error::NotFound));

    Ok(())
}
