use std::{future::Future, io};

use tokio::{
    io::{AsyncWriteExt, BufReader, DuplexStream},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

/// One direction of the chat connection. The pumps only read or write a
/// half; releasing it is left to the session that owns the connection.
pub trait StreamHalf: Send + 'static {
    fn close(self) -> impl Future<Output = io::Result<()>> + Send;
}

impl StreamHalf for OwnedReadHalf {
    async fn close(self) -> io::Result<()> {
        drop(self);
        Ok(())
    }
}

impl StreamHalf for OwnedWriteHalf {
    async fn close(mut self) -> io::Result<()> {
        self.shutdown().await
    }
}

impl StreamHalf for DuplexStream {
    async fn close(mut self) -> io::Result<()> {
        self.shutdown().await
    }
}

impl<T> StreamHalf for BufReader<T>
where
    T: StreamHalf + tokio::io::AsyncRead,
{
    async fn close(self) -> io::Result<()> {
        self.into_inner().close().await
    }
}

/// Splits a connected socket into the halves a session runs on.
pub fn split(stream: TcpStream) -> (BufReader<OwnedReadHalf>, OwnedWriteHalf) {
    let (reader, writer) = stream.into_split();
    (BufReader::new(reader), writer)
}
