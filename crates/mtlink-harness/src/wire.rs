//! Async frame I/O shared by the simulated client and server.

use mtlink_core::RpcError;
use mtlink_proto::{
    Envelope,
    codec::{self, PREFIX_SIZE},
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Write one length-prefixed frame and flush.
pub async fn write_frame<W, T>(writer: &mut W, envelope: &Envelope<T>) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = envelope.encode()?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame.
///
/// The length prefix is validated before the body buffer is allocated.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Envelope<T>, RpcError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut prefix = [0u8; PREFIX_SIZE];
    reader.read_exact(&mut prefix).await?;
    let len = codec::body_len(prefix)?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Envelope::decode_body(&body)?)
}
