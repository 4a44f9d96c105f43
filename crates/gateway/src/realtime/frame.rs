//! Bit-level frame codec for the hand-rolled realtime channel. Ported 1:1
//! from `original_source/backend/internal/handler/http/realtime_ws.go`'s
//! `readWSFrame`/`writeWSFrame`: masked-only inbound frames with the 7/16/64
//! -bit length forms, 7-bit-length-only outbound frames (basic form,
//! ≤125-byte payload).

use concierge_domain::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const OP_TEXT: u8 = 0x1;
pub const OP_BINARY: u8 = 0x2;
pub const OP_CLOSE: u8 = 0x8;

fn io_err(err: std::io::Error) -> Error {
    Error::ProtocolError(err.to_string())
}

/// Reads one client frame, unmasking its payload in place. Any I/O error or
/// an unmasked frame is reported as [`Error::ProtocolError`] — per spec.md
/// §4.5, both terminate the connection at the call site.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<(u8, Vec<u8>)> {
    let mut head = [0u8; 2];
    reader.read_exact(&mut head).await.map_err(io_err)?;

    let opcode = head[0] & 0x0F;
    let masked = (head[1] & 0x80) != 0;
    if !masked {
        return Err(Error::ProtocolError("client frames must be masked".to_string()));
    }

    let mut payload_len = (head[1] & 0x7F) as u64;
    match payload_len {
        126 => {
            let mut ext = [0u8; 2];
            reader.read_exact(&mut ext).await.map_err(io_err)?;
            payload_len = u16::from_be_bytes(ext) as u64;
        }
        127 => {
            let mut ext = [0u8; 8];
            reader.read_exact(&mut ext).await.map_err(io_err)?;
            payload_len = u64::from_be_bytes(ext);
        }
        _ => {}
    }

    let mut mask = [0u8; 4];
    reader.read_exact(&mut mask).await.map_err(io_err)?;

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload).await.map_err(io_err)?;
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }

    Ok((opcode, payload))
}

/// Writes one server frame in the basic (7-bit length, ≤125 byte) form
/// only — larger outbound payloads are rejected rather than silently
/// extended to the 16/64-bit forms, matching the original encoder's
/// intentional limitation.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, opcode: u8, payload: &[u8]) -> Result<()> {
    if payload.len() > 125 {
        return Err(Error::ProtocolError("payload too large for basic websocket frame".to_string()));
    }
    let header = [0x80 | opcode, payload.len() as u8];
    writer.write_all(&header).await.map_err(io_err)?;
    writer.write_all(payload).await.map_err(io_err)?;
    writer.flush().await.map_err(io_err)?;
    Ok(())
}

/// Serializes `value` to JSON and writes it as a single text frame.
pub async fn write_text_json<W: AsyncWrite + Unpin, T: serde::Serialize>(writer: &mut W, value: &T) -> Result<()> {
    let payload = serde_json::to_vec(value).map_err(|e| Error::ProtocolError(e.to_string()))?;
    write_frame(writer, OP_TEXT, &payload).await
}

/// Builds a close-frame payload: a big-endian status code followed by the
/// UTF-8 reason, truncated to keep the whole payload within the basic
/// frame's 125-byte limit.
pub fn close_payload(status: u16, reason: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + reason.len());
    payload.extend_from_slice(&status.to_be_bytes());
    payload.extend_from_slice(reason.as_bytes());
    payload.truncate(125);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_frame_rejects_oversized_payload() {
        let mut buf = Vec::new();
        let payload = vec![0u8; 126];
        let err = write_frame(&mut buf, OP_TEXT, &payload).await.unwrap_err();
        assert!(matches!(err, Error::ProtocolError(_)));
    }

    #[tokio::test]
    async fn write_frame_produces_basic_header() {
        let mut buf = Vec::new();
        write_frame(&mut buf, OP_TEXT, b"hi").await.unwrap();
        assert_eq!(buf, vec![0x80 | OP_TEXT, 2, b'h', b'i']);
    }

    #[tokio::test]
    async fn read_frame_rejects_unmasked_frame() {
        let mut input: &[u8] = &[0x80 | OP_TEXT, 0x02, b'h', b'i'];
        let err = read_frame(&mut input).await.unwrap_err();
        assert!(matches!(err, Error::ProtocolError(_)));
    }

    #[tokio::test]
    async fn read_frame_unmasks_a_masked_payload() {
        let mask = [0x12u8, 0x34, 0x56, 0x78];
        let plain = b"hello";
        let masked: Vec<u8> = plain.iter().enumerate().map(|(i, b)| b ^ mask[i % 4]).collect();
        let mut input = vec![0x80 | OP_TEXT, 0x80 | (plain.len() as u8)];
        input.extend_from_slice(&mask);
        input.extend_from_slice(&masked);
        let mut cursor: &[u8] = &input;
        let (opcode, payload) = read_frame(&mut cursor).await.unwrap();
        assert_eq!(opcode, OP_TEXT);
        assert_eq!(payload, plain);
    }

    #[test]
    fn close_payload_truncates_to_basic_frame_limit() {
        let reason = "x".repeat(200);
        let payload = close_payload(1000, &reason);
        assert_eq!(payload.len(), 125);
        assert_eq!(&payload[..2], &1000u16.to_be_bytes());
    }
}
