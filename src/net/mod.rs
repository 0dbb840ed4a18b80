use crate::common::{MAX_LINE_LENGTH, MIN_KEEPALIVE};
use futures::StreamExt;
use socket2::{SockRef, TcpKeepalive};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

mod locator;
pub use locator::*;

mod proxy;
pub use proxy::*;

mod scanner;
pub use scanner::*;


#[derive(Error, Debug)]
pub enum NetError {
    #[error("{0}")]
    IoError(#[from] std::io::Error),
    #[error("timed out")]
    TimeoutError(#[from] tokio::time::error::Elapsed),
    #[error("connection closed before a response was received")]
    ConnectionClosed,
    #[error("line longer than {0} bytes")]
    LineTooLong(usize),
}

/// Runs `f` against every address concurrently and pairs each address with
/// its result, in input order.
pub async fn group_request<F, R>(
    addrs: &[Ipv4Addr],
    f: F,
) -> Vec<(Ipv4Addr, <R as futures::Future>::Output)>
where
    F: Fn(Ipv4Addr) -> R,
    R: futures::Future,
{
    addrs
        .iter()
        .cloned()
        .zip(
            futures::future::join_all(addrs.iter().cloned().map(f).collect::<Vec<_>>())
                .await
                .into_iter(),
        )
        .collect()
}

/// Like `group_request`, but with at most `limit` requests in flight.
pub async fn group_request_bounded<F, R>(
    addrs: &[Ipv4Addr],
    limit: usize,
    f: F,
) -> Vec<(Ipv4Addr, <R as futures::Future>::Output)>
where
    F: Fn(Ipv4Addr) -> R,
    R: futures::Future,
{
    futures::stream::iter(addrs.iter().cloned())
        .map(|addr| {
            let req = f(addr);
            async move { (addr, req.await) }
        })
        .buffered(limit.max(1))
        .collect()
        .await
}

/// Reads one line of at most `max` bytes, without its terminator. `None`
/// on a clean end of stream.
pub async fn read_line_limited<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max: usize,
) -> Result<Option<String>, NetError> {
    let mut buf = Vec::new();
    let n = AsyncReadExt::take(&mut *reader, max as u64 + 2)
        .read_until(b'\n', &mut buf)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() > max {
        return Err(NetError::LineTooLong(max));
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

pub async fn connect(addr: SocketAddr, limit: Duration) -> Result<TcpStream, NetError> {
    Ok(timeout(limit, TcpStream::connect(addr)).await??)
}

/// Writes one line and reads one line back, each step bounded by `limit`.
/// The connection is closed when this returns.
pub async fn request_line(
    stream: TcpStream,
    line: &str,
    limit: Duration,
) -> Result<String, NetError> {
    let (read, mut write) = stream.into_split();
    timeout(limit, write.write_all(format!("{}\n", line).as_bytes())).await??;
    let mut reader = BufReader::new(read);
    timeout(limit, read_line_limited(&mut reader, MAX_LINE_LENGTH))
        .await??
        .ok_or(NetError::ConnectionClosed)
}

/// Enables TCP keep-alive: first probe after `timeout` of silence, then
/// every `timeout / 2`, giving up after `KEEPALIVE_RETRIES` unanswered
/// probes. Both delays are at least one second.
pub fn configure_keepalive(stream: &TcpStream, timeout: Duration) -> Result<(), NetError> {
    let idle = timeout.max(MIN_KEEPALIVE);
    let interval = (timeout / 2).max(MIN_KEEPALIVE);
    let keepalive = TcpKeepalive::new().with_time(idle).with_interval(interval);
    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd"
    ))]
    let keepalive = keepalive.with_retries(crate::common::KEEPALIVE_RETRIES);
    SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
    Ok(())
}
