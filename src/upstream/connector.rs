//! Socket-capped connector.
//!
//! Wraps the TCP connector so that every new backend socket first takes a
//! slot from the [`SocketPool`]. The slot lives inside the returned stream
//! and is released only when the socket closes, so pooled idle connections
//! count against the cap too. Requests beyond the cap wait in the client's
//! checkout for either an idle connection or a freed slot.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::rt::{Read, ReadBufCursor, Write};
use hyper::Uri;
use hyper_util::client::legacy::connect::{Connected, Connection, HttpConnector};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tower::Service;

use crate::upstream::pool::{SocketGuard, SocketPool};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// [`HttpConnector`] gated by a [`SocketPool`].
#[derive(Debug, Clone)]
pub struct CappedConnector {
    inner: HttpConnector,
    pool: SocketPool,
}

impl CappedConnector {
    pub fn new(inner: HttpConnector, pool: SocketPool) -> Self {
        Self { inner, pool }
    }
}

impl Service<Uri> for CappedConnector {
    type Response = CappedStream;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<CappedStream, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let pool = self.pool.clone();
        let connecting = self.inner.call(dst);
        Box::pin(async move {
            let slot = pool.acquire().await?;
            let io = connecting.await?;
            tracing::debug!(open = pool.in_use(), "Opened backend socket");
            Ok(CappedStream { io, _slot: slot })
        })
    }
}

/// A backend socket holding its pool slot.
pub struct CappedStream {
    io: TokioIo<TcpStream>,
    _slot: SocketGuard,
}

impl Connection for CappedStream {
    fn connected(&self) -> Connected {
        self.io.connected()
    }
}

impl Read for CappedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_read(cx, buf)
    }
}

impl Write for CappedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().io).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_shutdown(cx)
    }

    fn is_write_vectored(&self) -> bool {
        self.io.is_write_vectored()
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().io).poll_write_vectored(cx, bufs)
    }
}
