use bytes::{BufMut, Bytes, BytesMut};
use peermon_net::{NetError, Socket};

use crate::error::WireError;

/// Maximum declared frame length the codec will accept.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Size of the payload exchanged by bandwidth probes.
pub const DEFAULT_PAYLOAD_SIZE: usize = 4 * 1024 * 1024;

/// Size of the length prefix.
const LEN_WORD_SIZE: usize = 4;

/// Size of the type word inside a typed frame.
const TYPE_WORD_SIZE: usize = 4;

/// A decoded typed frame.
///
/// On the wire: `[len: u32 LE][type: u32 LE][body]`, where `len` counts the
/// type word plus the body. All integers are little-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: u32,
    pub body: Bytes,
}

/// Write one typed frame.
pub async fn write_frame(socket: &dyn Socket, kind: u32, body: &[u8]) -> Result<(), WireError> {
    let len = TYPE_WORD_SIZE + body.len();
    if len > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut buf = BytesMut::with_capacity(LEN_WORD_SIZE + len);
    buf.put_u32_le(len as u32);
    buf.put_u32_le(kind);
    buf.extend_from_slice(body);

    socket.send(buf.freeze()).await?;
    Ok(())
}

/// Read one typed frame.
///
/// Returns `Ok(None)` when the peer closes the stream at a frame boundary,
/// which is how streaming responses signal their end. A close in the middle
/// of a frame is a `TruncatedFrame` error.
pub async fn read_frame(socket: &dyn Socket) -> Result<Option<Frame>, WireError> {
    let len_word = match socket.recv_exact(LEN_WORD_SIZE).await {
        Ok(bytes) => bytes,
        Err(NetError::ConnectionClosed) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let len = u32::from_le_bytes(len_word.as_ref().try_into().expect("4-byte read")) as usize;

    if len < TYPE_WORD_SIZE {
        return Err(WireError::ShortFrame { len });
    }
    if len > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut data = match socket.recv_exact(len).await {
        Ok(bytes) => bytes,
        Err(NetError::ConnectionClosed) => return Err(WireError::TruncatedFrame),
        Err(e) => return Err(e.into()),
    };
    let kind_word = data.split_to(TYPE_WORD_SIZE);
    let kind = u32::from_le_bytes(kind_word.as_ref().try_into().expect("4-byte slice"));

    Ok(Some(Frame { kind, body: data }))
}

/// Write one raw payload frame: `[len: u32 LE][bytes]`, no type word.
///
/// Used by the bandwidth probes, where the bytes themselves are the point.
pub async fn write_payload(socket: &dyn Socket, payload: &[u8]) -> Result<(), WireError> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let mut buf = BytesMut::with_capacity(LEN_WORD_SIZE + payload.len());
    buf.put_u32_le(payload.len() as u32);
    buf.extend_from_slice(payload);

    socket.send(buf.freeze()).await?;
    Ok(())
}

/// Read one raw payload frame. A zero-length payload is valid (it serves as
/// the upload-probe acknowledgement).
pub async fn read_payload(socket: &dyn Socket) -> Result<Bytes, WireError> {
    let len_word = match socket.recv_exact(LEN_WORD_SIZE).await {
        Ok(bytes) => bytes,
        Err(NetError::ConnectionClosed) => return Err(WireError::TruncatedFrame),
        Err(e) => return Err(e.into()),
    };
    let len = u32::from_le_bytes(len_word.as_ref().try_into().expect("4-byte read")) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    if len == 0 {
        return Ok(Bytes::new());
    }

    match socket.recv_exact(len).await {
        Ok(bytes) => Ok(bytes),
        Err(NetError::ConnectionClosed) => Err(WireError::TruncatedFrame),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use peermon_net::socket_pair;

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (a, b) = socket_pair();
        write_frame(&a, 2, b"{\"x\":1}").await.unwrap();

        let frame = read_frame(&b).await.unwrap().unwrap();
        assert_eq!(frame.kind, 2);
        assert_eq!(frame.body.as_ref(), b"{\"x\":1}");
    }

    #[tokio::test]
    async fn test_empty_body() {
        let (a, b) = socket_pair();
        write_frame(&a, 1, b"").await.unwrap();

        let frame = read_frame(&b).await.unwrap().unwrap();
        assert_eq!(frame.kind, 1);
        assert!(frame.body.is_empty());
    }

    #[tokio::test]
    async fn test_close_at_boundary_is_end_of_stream() {
        let (a, b) = socket_pair();
        write_frame(&a, 0, b"last").await.unwrap();
        a.close().await;

        assert!(read_frame(&b).await.unwrap().is_some());
        assert!(read_frame(&b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_mid_frame_is_truncated() {
        let (a, b) = socket_pair();
        // Declare 100 bytes but deliver only the length word and a fragment.
        a.send(Bytes::copy_from_slice(&100u32.to_le_bytes()))
            .await
            .unwrap();
        a.send(Bytes::from_static(b"frag")).await.unwrap();
        a.close().await;

        let err = read_frame(&b).await.unwrap_err();
        assert!(matches!(err, WireError::TruncatedFrame));
    }

    #[tokio::test]
    async fn test_short_declared_length() {
        let (a, b) = socket_pair();
        a.send(Bytes::copy_from_slice(&2u32.to_le_bytes())).await.unwrap();
        a.send(Bytes::from_static(b"xx")).await.unwrap();

        let err = read_frame(&b).await.unwrap_err();
        assert!(matches!(err, WireError::ShortFrame { len: 2 }));
    }

    #[tokio::test]
    async fn test_oversized_declared_length() {
        let (a, b) = socket_pair();
        let huge = (MAX_FRAME_SIZE as u32) + 1;
        a.send(Bytes::copy_from_slice(&huge.to_le_bytes()))
            .await
            .unwrap();

        let err = read_frame(&b).await.unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_write_oversized_body_rejected() {
        let (a, _b) = socket_pair();
        let body = vec![0u8; MAX_FRAME_SIZE];
        let err = write_frame(&a, 0, &body).await.unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_payload_roundtrip() {
        let (a, b) = socket_pair();
        let payload: Vec<u8> = (0..65536).map(|i| (i % 251) as u8).collect();
        write_payload(&a, &payload).await.unwrap();

        let got = read_payload(&b).await.unwrap();
        assert_eq!(got.as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn test_empty_payload_ack() {
        let (a, b) = socket_pair();
        write_payload(&a, &[]).await.unwrap();
        let got = read_payload(&b).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn test_payload_after_close_is_truncated() {
        let (a, b) = socket_pair();
        a.close().await;
        let err = read_payload(&b).await.unwrap_err();
        assert!(matches!(err, WireError::TruncatedFrame));
    }
}
