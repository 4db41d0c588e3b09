mod common;

use std::collections::HashSet;
use std::time::Duration;

use uring::{bounded_result_channel, opcode, result_channel, Error, Uring};

#[test]
fn test_nop_batch() -> anyhow::Result<()> {
    let ring = Uring::new(8)?;

    let requests = (0..3).map(|_| opcode::Nop::new().build()).collect();
    let submitted = ring.submit_many(requests, None)?;
    assert_eq!(submitted.len(), 3);

    let cookies: HashSet<u64> = submitted.iter().map(|(cookie, _)| *cookie).collect();
    assert_eq!(cookies.len(), 3);

    for (_, result) in &submitted {
        result.wait();
        assert_eq!(result.err(), None);
        assert_eq!(result.raw_result(), Some(0));
    }

    Ok(())
}

#[test]
fn test_batch_larger_than_ring_fails_cleanly() -> anyhow::Result<()> {
    let ring = Uring::new(2)?;
    let capacity = ring.params().sq_entries() as usize;

    let requests = (0..capacity + 1).map(|_| opcode::Nop::new().build()).collect();
    match ring.submit_many(requests, None) {
        Err(Error::QueueFull) => {}
        other => panic!("expected QueueFull, got {:?}", other.map(|v| v.len())),
    }

    // nothing was enqueued and the ring still works
    assert_eq!(ring.in_flight(), 0);
    let (_, result) = ring.submit(opcode::Nop::new().build(), None)?;
    result.wait();
    assert_eq!(result.err(), None);

    Ok(())
}

#[test]
fn test_results_delivered_to_sink() -> anyhow::Result<()> {
    let ring = Uring::new(8)?;
    let (sink, results) = result_channel();

    let requests = (0..4).map(|_| opcode::Nop::new().build()).collect();
    ring.submit_many(requests, Some(sink))?;

    for _ in 0..4 {
        let result = results.recv_timeout(Duration::from_secs(2))?;
        assert_eq!(result.err(), None);
    }
    assert_eq!(ring.in_flight(), 0);

    Ok(())
}

#[test]
fn test_bounded_sink_never_blocks_dispatch() -> anyhow::Result<()> {
    let ring = Uring::new(8)?;
    // room for one result only; the rest are dropped, not deadlocked
    let (sink, results) = bounded_result_channel(1);

    let requests = (0..4).map(|_| opcode::Nop::new().build()).collect();
    let submitted = ring.submit_many(requests, Some(sink))?;

    // every handle still completes even though deliveries were skipped
    for (_, result) in &submitted {
        assert!(result.wait_timeout(Duration::from_secs(2)));
    }
    assert!(results.try_recv().is_ok());

    Ok(())
}

#[test]
fn test_user_info_round_trip() -> anyhow::Result<()> {
    let ring = Uring::new(4)?;

    let request = uring::with_info(opcode::Nop::new().build(), "tagged");
    let (_, result) = ring.submit(request, None)?;
    result.wait();

    assert_eq!(result.info::<&str>(), Some(&"tagged"));
    Ok(())
}

#[test]
fn test_close_rejects_submissions() -> anyhow::Result<()> {
    let ring = Uring::new(8)?;

    let requests = (0..4).map(|_| opcode::Nop::new().build()).collect();
    let submitted = ring.submit_many(requests, None)?;

    ring.close()?;
    assert_eq!(ring.in_flight(), 0);
    for (_, result) in &submitted {
        assert!(result.is_completed());
    }

    match ring.submit(opcode::Nop::new().build(), None) {
        Err(Error::Closed) => {}
        _ => panic!("expected Closed"),
    }

    // closing again is fine
    ring.close()?;
    Ok(())
}

#[test]
fn test_many_rounds_through_small_ring() -> anyhow::Result<()> {
    // more requests than ring slots, forcing lease-window reuse
    let ring = Uring::new(2)?;

    for round in 0..64 {
        let (_, result) = ring.submit(opcode::Nop::new().build(), None)?;
        result.wait();
        assert_eq!(result.err(), None, "round {}", round);
    }
    assert_eq!(ring.in_flight(), 0);

    Ok(())
}
