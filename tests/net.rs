mod common;

use std::net::{TcpListener, TcpStream, UdpSocket};
use std::os::unix::io::AsRawFd;
use std::thread;
use std::time::Duration;

use common::Fd;
use uring::{opcode, Uring};

#[test]
fn test_send_recv() -> anyhow::Result<()> {
    let ring = Uring::new(8)?;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let client = TcpStream::connect(listener.local_addr()?)?;
    let (server, _) = listener.accept()?;

    let (_, send_result) = ring.submit(
        opcode::Send::new(client.as_raw_fd(), b"ping".to_vec()).build(),
        None,
    )?;
    assert_eq!(send_result.return_int()?, 4);

    let (_, recv_result) = ring.submit(
        opcode::Recv::new(server.as_raw_fd(), vec![0u8; 16]).build(),
        None,
    )?;
    assert_eq!(recv_result.return_int()?, 4);
    assert_eq!(&recv_result.buffer().unwrap()[..4], b"ping");

    Ok(())
}

#[test]
fn test_sendmsg_recvmsg() -> anyhow::Result<()> {
    let ring = Uring::new(8)?;

    let receiver = UdpSocket::bind("127.0.0.1:0")?;
    let sender = UdpSocket::bind("127.0.0.1:0")?;
    let receiver_addr = receiver.local_addr()?;
    let sender_addr = sender.local_addr()?;

    let request = opcode::SendMsg::new(sender.as_raw_fd(), b"datagram".to_vec())
        .dest(Some(receiver_addr))
        .build();
    let (_, send_result) = ring.submit(request, None)?;
    assert_eq!(send_result.return_int()?, 8);

    let request = opcode::RecvMsg::new(receiver.as_raw_fd(), vec![0u8; 64]).build();
    let (_, recv_result) = ring.submit(request, None)?;
    assert_eq!(recv_result.return_int()?, 8);
    assert_eq!(&recv_result.buffer().unwrap()[..8], b"datagram");
    assert_eq!(recv_result.peer_addr(), Some(sender_addr));

    Ok(())
}

#[test]
fn test_accept_returns_fd_and_peer() -> anyhow::Result<()> {
    let ring = Uring::new(8)?;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let (_, accept_result) = ring.submit(opcode::Accept::new(listener.as_raw_fd()).build(), None)?;

    let client = thread::spawn(move || TcpStream::connect(addr));
    let client = client.join().expect("client thread")?;

    let fd = Fd(accept_result.return_fd()?);
    assert!(fd.as_raw_fd() >= 0);
    assert_eq!(accept_result.peer_addr(), Some(client.local_addr()?));

    Ok(())
}

#[test]
fn test_connect() -> anyhow::Result<()> {
    use socket2::{Domain, Socket, Type};

    let ring = Uring::new(8)?;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let socket = Socket::new(Domain::ipv4(), Type::stream(), None)?;
    let (_, connect_result) = ring.submit(
        opcode::Connect::new(socket.as_raw_fd(), addr).build(),
        None,
    )?;

    connect_result.wait();
    assert_eq!(connect_result.err(), None);

    let (_, peer) = listener.accept()?;
    assert_eq!(peer, socket.local_addr()?.as_std().unwrap());

    Ok(())
}

#[test]
fn test_recv_with_deadline_on_quiet_socket() -> anyhow::Result<()> {
    let ring = Uring::new(8)?;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let client = TcpStream::connect(listener.local_addr()?)?;
    let (server, _) = listener.accept()?;
    let _client = client;

    // nothing is ever sent, so the deadline cancels the receive
    let (_, result) = ring.submit_with_timeout(
        opcode::Recv::new(server.as_raw_fd(), vec![0u8; 16]).build(),
        Duration::from_millis(300),
        None,
    )?;

    result.wait();
    assert_eq!(result.err(), Some(uring::Error::Canceled));

    Ok(())
}
