//! Length-prefixed JSON transport over a pair of byte streams.
//!
//! Each message is a JSON document preceded by its byte length as a 4-byte
//! little-endian integer. The server reads requests from the client's pipe
//! (normally stdin) and writes responses and events to the other (stdout).
//!
//! End of stream on a message boundary is the close notification: the
//! reader finishes with `Ok(())` and the inbound channel closes.

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

#[cfg(test)]
mod tests;

/// Outbound half: sends one message.
pub trait Transport: Send {
    fn send(&mut self, message: Value) -> BoxFuture<'_, Result<()>>;
}

/// Inbound half: reads until the stream closes, forwarding each message.
pub trait TransportReceiver: Send {
    fn run(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
}

/// Transport halves plus the channel the receiver feeds, as consumed by
/// [`Connection::run`](crate::Connection::run).
pub struct TransportParts {
    pub sender: Box<dyn Transport>,
    pub receiver: Box<dyn TransportReceiver>,
    pub message_rx: mpsc::UnboundedReceiver<Value>,
}

pub struct PipeTransportSender<W> {
    writer: W,
}

pub struct PipeTransportReceiver<R> {
    reader: R,
    message_tx: mpsc::UnboundedSender<Value>,
}

pub struct PipeTransport<W, R> {
    sender: PipeTransportSender<W>,
    receiver: PipeTransportReceiver<R>,
}

impl<W, R> PipeTransport<W, R>
where
    W: AsyncWrite + Unpin + Send + 'static,
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Creates a transport writing to `writer` and reading from `reader`.
    ///
    /// Returns the receiver of parsed inbound messages alongside it.
    pub fn new(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let transport = Self {
            sender: PipeTransportSender { writer },
            receiver: PipeTransportReceiver { reader, message_tx },
        };
        (transport, message_rx)
    }

    pub fn into_parts(self) -> (PipeTransportSender<W>, PipeTransportReceiver<R>) {
        (self.sender, self.receiver)
    }

    pub fn into_transport_parts(
        self,
        message_rx: mpsc::UnboundedReceiver<Value>,
    ) -> TransportParts {
        TransportParts {
            sender: Box::new(self.sender),
            receiver: Box::new(self.receiver),
            message_rx,
        }
    }

    /// Runs the read loop in place.
    pub async fn run(&mut self) -> Result<()> {
        self.receiver.read_loop().await
    }

    pub async fn send(&mut self, message: Value) -> Result<()> {
        self.sender.write_message(&message).await
    }
}

impl<W: AsyncWrite + Unpin + Send> PipeTransportSender<W> {
    async fn write_message(&mut self, message: &Value) -> Result<()> {
        let bytes = serde_json::to_vec(message)?;
        let length = u32::try_from(bytes.len()).map_err(|_| {
            Error::TransportError(format!("Message too large: {} bytes", bytes.len()))
        })?;

        self.writer.write_all(&length.to_le_bytes()).await?;
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

impl<W: AsyncWrite + Unpin + Send> Transport for PipeTransportSender<W> {
    fn send(&mut self, message: Value) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.write_message(&message).await })
    }
}

impl<R: AsyncRead + Unpin + Send> PipeTransportReceiver<R> {
    async fn read_loop(&mut self) -> Result<()> {
        loop {
            let Some(length) = read_length_prefix(&mut self.reader).await? else {
                tracing::debug!("transport reached end of stream");
                return Ok(());
            };

            let mut buf = vec![0u8; length as usize];
            self.reader.read_exact(&mut buf).await.map_err(|e| {
                Error::TransportError(format!("Failed to read message body: {e}"))
            })?;

            match serde_json::from_slice::<Value>(&buf) {
                Ok(message) => {
                    if self.message_tx.send(message).is_err() {
                        tracing::debug!("message receiver dropped, stopping transport");
                        return Ok(());
                    }
                }
                Err(e) => tracing::error!("Failed to parse message: {}", e),
            }
        }
    }
}

impl<R: AsyncRead + Unpin + Send + 'static> TransportReceiver for PipeTransportReceiver<R> {
    fn run(mut self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move { self.read_loop().await })
    }
}

/// Reads the 4-byte prefix; `None` on end of stream before the first byte.
async fn read_length_prefix<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(|e| Error::TransportError(format!("Failed to read length prefix: {e}")))?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(Error::TransportError(format!(
                "Failed to read length prefix: stream ended after {filled} of 4 bytes"
            )));
        }
        filled += n;
    }
    Ok(Some(u32::from_le_bytes(buf)))
}
