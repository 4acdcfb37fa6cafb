//! Length-prefixed frame I/O (SPEC_FULL.md §4.1, §6).
//!
//! Grounded on `examples/other_examples/733494cc_iainh-smpp__src-connection.rs.rs`'s
//! `Connection`: a `BufWriter`-wrapped stream plus a growable `BytesMut` read
//! buffer, looping `read_buf` until a full frame is parseable.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use durable_types::EntryKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::RuntimeError;

const HEADER_LEN: usize = 8;
const FLAG_COMPLETED: u16 = 1 << 0;
const FLAG_REQUIRES_ACK: u16 = 1 << 1;
const FLAG_KNOWN_BITS: u16 = FLAG_COMPLETED | FLAG_REQUIRES_ACK;

/// Message type tags. `0` is reserved; `Start` is the handshake message
/// that precedes the journal proper.
fn type_tag(kind: EntryKind) -> u16 {
    match kind {
        EntryKind::Start => 1,
        EntryKind::PollInput => 2,
        EntryKind::Output => 3,
        EntryKind::End => 4,
        EntryKind::Error => 5,
        EntryKind::Suspension => 6,
        EntryKind::GetState => 7,
        EntryKind::SetState => 8,
        EntryKind::ClearState => 9,
        EntryKind::ClearAllState => 10,
        EntryKind::GetStateKeys => 11,
        EntryKind::Sleep => 12,
        EntryKind::InvokeService => 13,
        EntryKind::BackgroundInvoke => 14,
        EntryKind::SideEffect => 15,
        EntryKind::Awakeable => 16,
        EntryKind::CompleteAwakeable => 17,
    }
}

fn kind_from_tag(tag: u16) -> Option<EntryKind> {
    Some(match tag {
        1 => EntryKind::Start,
        2 => EntryKind::PollInput,
        3 => EntryKind::Output,
        4 => EntryKind::End,
        5 => EntryKind::Error,
        6 => EntryKind::Suspension,
        7 => EntryKind::GetState,
        8 => EntryKind::SetState,
        9 => EntryKind::ClearState,
        10 => EntryKind::ClearAllState,
        11 => EntryKind::GetStateKeys,
        12 => EntryKind::Sleep,
        13 => EntryKind::InvokeService,
        14 => EntryKind::BackgroundInvoke,
        15 => EntryKind::SideEffect,
        16 => EntryKind::Awakeable,
        17 => EntryKind::CompleteAwakeable,
        _ => return None,
    })
}

/// A frame as read off the wire, before payload decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    pub kind: EntryKind,
    pub completed: bool,
    pub requires_ack: bool,
    pub payload: Bytes,
}

/// Reads and writes framed messages over a duplex octet stream.
///
/// Holds no buffering beyond what one `read_frame`/`write_frame` call needs,
/// per SPEC_FULL.md §4.1.
pub struct Codec<S> {
    stream: S,
    buffer: BytesMut,
}

impl<S> Codec<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Reads a single frame. Returns `Ok(None)` on a clean shutdown (stream
    /// closed with no partial frame buffered).
    pub async fn read_frame(&mut self) -> Result<Option<RawFrame>, RuntimeError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(RuntimeError::UnexpectedEof);
            }
        }
    }

    fn parse_frame(&mut self) -> Result<Option<RawFrame>, RuntimeError> {
        if self.buffer.len() < HEADER_LEN {
            return Ok(None);
        }

        let mut header = &self.buffer[..HEADER_LEN];
        let type_tag = header.get_u16();
        let flags = header.get_u16();
        let length = header.get_u32() as usize;

        if flags & !FLAG_KNOWN_BITS != 0 {
            return Err(RuntimeError::decode(format!(
                "unknown flag bits set: {flags:#06x}"
            )));
        }

        let frame_len = HEADER_LEN + length;
        if self.buffer.len() < frame_len {
            return Ok(None);
        }

        let kind = kind_from_tag(type_tag)
            .ok_or_else(|| RuntimeError::decode(format!("unknown message type {type_tag}")))?;

        self.buffer.advance(HEADER_LEN);
        let payload = self.buffer.split_to(length).freeze();

        Ok(Some(RawFrame {
            kind,
            completed: flags & FLAG_COMPLETED != 0,
            requires_ack: flags & FLAG_REQUIRES_ACK != 0,
            payload,
        }))
    }

    /// Writes a single frame and flushes it to the underlying stream.
    pub async fn write_frame(
        &mut self,
        kind: EntryKind,
        completed: bool,
        requires_ack: bool,
        payload: &[u8],
    ) -> Result<(), RuntimeError> {
        let mut flags = 0u16;
        if completed {
            flags |= FLAG_COMPLETED;
        }
        if requires_ack {
            flags |= FLAG_REQUIRES_ACK;
        }

        let mut header = BytesMut::with_capacity(HEADER_LEN);
        header.put_u16(type_tag(kind));
        header.put_u16(flags);
        header.put_u32(payload.len() as u32);

        self.stream.write_all(&header).await?;
        self.stream.write_all(payload).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips_a_frame() {
        let (client, server) = tokio::io::duplex(4096);
        let mut writer = Codec::new(client);
        let mut reader = Codec::new(server);

        writer
            .write_frame(EntryKind::SetState, false, false, b"hello")
            .await
            .unwrap();

        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.kind, EntryKind::SetState);
        assert!(!frame.completed);
        assert!(!frame.requires_ack);
        assert_eq!(&frame.payload[..], b"hello");
    }

    #[tokio::test]
    async fn completed_flag_round_trips() {
        let (client, server) = tokio::io::duplex(4096);
        let mut writer = Codec::new(client);
        let mut reader = Codec::new(server);

        writer
            .write_frame(EntryKind::Sleep, true, true, b"")
            .await
            .unwrap();

        let frame = reader.read_frame().await.unwrap().unwrap();
        assert!(frame.completed);
        assert!(frame.requires_ack);
    }

    #[tokio::test]
    async fn clean_shutdown_with_no_partial_frame_yields_none() {
        let (client, server) = tokio::io::duplex(4096);
        drop(client);
        let mut reader = Codec::new(server);
        assert_eq!(reader.read_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_flag_bits_are_a_decode_error() {
        let (mut client, server) = tokio::io::duplex(4096);
        let mut header = BytesMut::new();
        header.put_u16(type_tag(EntryKind::SetState));
        header.put_u16(0b1000_0000_0000_0000);
        header.put_u32(0);
        client.write_all(&header).await.unwrap();
        client.flush().await.unwrap();

        let mut reader = Codec::new(server);
        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, RuntimeError::DecodeFailed(_)));
    }
}
