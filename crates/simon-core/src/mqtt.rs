//! Minimal MQTT 3.1.1 packet codec
//!
//! Only what the game needs: a clean-session CONNECT with a client id,
//! QoS 0 SUBSCRIBE/PUBLISH, keep-alive pings and DISCONNECT. Decoding is
//! incremental so a session can feed it whatever the socket has delivered.

use log::warn;
use thiserror_no_std::Error;

/// Keep-alive interval announced in CONNECT (seconds)
pub const KEEP_ALIVE_SECS: u16 = 15;

const PROTOCOL_NAME: &[u8] = b"MQTT";
const PROTOCOL_LEVEL: u8 = 0x04;
const CLEAN_SESSION: u8 = 0x02;
/// Largest value the 4-byte remaining-length field can carry
const MAX_REMAINING_LENGTH: usize = 268_435_455;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("output buffer too small")]
    BufferTooSmall,
    #[error("remaining length is not a valid variable-length integer")]
    MalformedLength,
    #[error("malformed packet")]
    Malformed,
    #[error("string field exceeds 65535 bytes")]
    FieldTooLong,
}

/// MQTT control packet types (upper nibble of the fixed header)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PacketType {
    Connect = 0x10,
    ConnAck = 0x20,
    Publish = 0x30,
    Subscribe = 0x80,
    SubAck = 0x90,
    PingReq = 0xC0,
    PingResp = 0xD0,
    Disconnect = 0xE0,
}

/// A decoded inbound packet, borrowing from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet<'a> {
    ConnAck { session_present: bool, return_code: u8 },
    SubAck { packet_id: u16, return_code: u8 },
    Publish { topic: &'a str, payload: &'a [u8] },
    PingResp,
    /// Any other packet type; carries the raw fixed-header byte.
    Other(u8),
}

/// Bounds-checked cursor over an output buffer.
struct Writer<'b> {
    buf: &'b mut [u8],
    pos: usize,
}

impl<'b> Writer<'b> {
    fn new(buf: &'b mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let end = self.pos + bytes.len();
        let dst = self.buf.get_mut(self.pos..end).ok_or(CodecError::BufferTooSmall)?;
        dst.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn put_u8(&mut self, byte: u8) -> Result<(), CodecError> {
        self.put(&[byte])
    }

    fn put_u16(&mut self, value: u16) -> Result<(), CodecError> {
        self.put(&value.to_be_bytes())
    }

    /// Length-prefixed UTF-8 string / binary field
    fn put_field(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let len = u16::try_from(bytes.len()).map_err(|_| CodecError::FieldTooLong)?;
        self.put_u16(len)?;
        self.put(bytes)
    }

    fn put_header(&mut self, first: u8, remaining: usize) -> Result<(), CodecError> {
        self.put_u8(first)?;
        let mut encoded = [0u8; 4];
        let n = encode_remaining_length(remaining, &mut encoded)?;
        self.put(&encoded[..n])
    }
}

/// Encode `len` as an MQTT variable-length integer. Returns the bytes written.
pub fn encode_remaining_length(mut len: usize, out: &mut [u8; 4]) -> Result<usize, CodecError> {
    if len > MAX_REMAINING_LENGTH {
        return Err(CodecError::MalformedLength);
    }
    let mut i = 0;
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out[i] = byte;
        i += 1;
        if len == 0 {
            return Ok(i);
        }
    }
}

/// Decode a variable-length integer from the start of `buf`.
///
/// Returns `(value, bytes consumed)`, or `Ok(None)` if more bytes are needed.
pub fn decode_remaining_length(buf: &[u8]) -> Result<Option<(usize, usize)>, CodecError> {
    let mut value = 0usize;
    for (i, &byte) in buf.iter().enumerate().take(4) {
        value |= usize::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }
    if buf.len() >= 4 {
        Err(CodecError::MalformedLength)
    } else {
        Ok(None)
    }
}

fn field_len(bytes: &[u8]) -> Result<usize, CodecError> {
    u16::try_from(bytes.len())
        .map(|_| 2 + bytes.len())
        .map_err(|_| CodecError::FieldTooLong)
}

/// CONNECT with clean session, [`KEEP_ALIVE_SECS`] and no credentials.
pub fn encode_connect(client_id: &str, buf: &mut [u8]) -> Result<usize, CodecError> {
    let remaining = field_len(PROTOCOL_NAME)? + 1 + 1 + 2 + field_len(client_id.as_bytes())?;
    let mut w = Writer::new(buf);
    w.put_header(PacketType::Connect as u8, remaining)?;
    w.put_field(PROTOCOL_NAME)?;
    w.put_u8(PROTOCOL_LEVEL)?;
    w.put_u8(CLEAN_SESSION)?;
    w.put_u16(KEEP_ALIVE_SECS)?;
    w.put_field(client_id.as_bytes())?;
    Ok(w.pos)
}

/// SUBSCRIBE to a single topic filter at QoS 0.
pub fn encode_subscribe(packet_id: u16, topic: &str, buf: &mut [u8]) -> Result<usize, CodecError> {
    let remaining = 2 + field_len(topic.as_bytes())? + 1;
    let mut w = Writer::new(buf);
    // SUBSCRIBE carries the reserved flag bits 0b0010
    w.put_header(PacketType::Subscribe as u8 | 0x02, remaining)?;
    w.put_u16(packet_id)?;
    w.put_field(topic.as_bytes())?;
    w.put_u8(0)?;
    Ok(w.pos)
}

/// PUBLISH at QoS 0, no retain.
pub fn encode_publish(topic: &str, payload: &[u8], buf: &mut [u8]) -> Result<usize, CodecError> {
    let remaining = field_len(topic.as_bytes())? + payload.len();
    let mut w = Writer::new(buf);
    w.put_header(PacketType::Publish as u8, remaining)?;
    w.put_field(topic.as_bytes())?;
    w.put(payload)?;
    Ok(w.pos)
}

pub fn encode_pingreq(buf: &mut [u8]) -> Result<usize, CodecError> {
    let mut w = Writer::new(buf);
    w.put_header(PacketType::PingReq as u8, 0)?;
    Ok(w.pos)
}

pub fn encode_disconnect(buf: &mut [u8]) -> Result<usize, CodecError> {
    let mut w = Writer::new(buf);
    w.put_header(PacketType::Disconnect as u8, 0)?;
    Ok(w.pos)
}

/// Fixed header of a packet: type byte, header size and body size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FixedHeader {
    first: u8,
    header_len: usize,
    remaining: usize,
}

impl FixedHeader {
    fn total(&self) -> usize {
        self.header_len + self.remaining
    }
}

fn decode_header(buf: &[u8]) -> Result<Option<FixedHeader>, CodecError> {
    let Some(&first) = buf.first() else {
        return Ok(None);
    };
    let Some((remaining, len_bytes)) = decode_remaining_length(&buf[1..])? else {
        return Ok(None);
    };
    Ok(Some(FixedHeader {
        first,
        header_len: 1 + len_bytes,
        remaining,
    }))
}

/// Decode one packet from the front of `buf`.
///
/// Returns the packet and the number of bytes it occupied, or `Ok(None)`
/// when `buf` does not yet hold a complete packet.
pub fn decode(buf: &[u8]) -> Result<Option<(Packet<'_>, usize)>, CodecError> {
    let Some(header) = decode_header(buf)? else {
        return Ok(None);
    };
    let total = header.total();
    if buf.len() < total {
        return Ok(None);
    }
    let first = header.first;
    let body = &buf[header.header_len..total];

    let packet = match first & 0xF0 {
        t if t == PacketType::ConnAck as u8 => {
            let [flags, return_code] = body else {
                return Err(CodecError::Malformed);
            };
            Packet::ConnAck {
                session_present: flags & 0x01 != 0,
                return_code: *return_code,
            }
        }
        t if t == PacketType::SubAck as u8 => {
            let [id_hi, id_lo, return_code, ..] = body else {
                return Err(CodecError::Malformed);
            };
            Packet::SubAck {
                packet_id: u16::from_be_bytes([*id_hi, *id_lo]),
                return_code: *return_code,
            }
        }
        t if t == PacketType::Publish as u8 => decode_publish(first, body)?,
        t if t == PacketType::PingResp as u8 => Packet::PingResp,
        _ => Packet::Other(first),
    };

    Ok(Some((packet, total)))
}

/// Reassembles packets from a byte stream in a fixed `N`-byte buffer.
///
/// A packet larger than the buffer is skipped as it streams in, so the
/// stream stays framed on the packet that follows it. A packet whose body
/// does not parse is consumed and reported as [`CodecError::Malformed`];
/// only a broken fixed header ([`CodecError::MalformedLength`]) loses the
/// framing.
#[derive(Debug)]
pub struct PacketReader<const N: usize> {
    buf: [u8; N],
    len: usize,
    /// Size of the packet handed out by the last `next_packet`
    consumed: usize,
    /// Bytes of an oversized packet not yet received
    skip: usize,
}

impl<const N: usize> PacketReader<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
            consumed: 0,
            skip: 0,
        }
    }

    /// Forget everything buffered, including a partially skipped packet.
    pub fn clear(&mut self) {
        self.len = 0;
        self.consumed = 0;
        self.skip = 0;
    }

    /// Free space for the next read from the stream.
    pub fn spare(&mut self) -> &mut [u8] {
        self.release();
        &mut self.buf[self.len..]
    }

    /// Account for `n` bytes written to the front of [`spare`](Self::spare).
    pub fn commit(&mut self, n: usize) {
        let mut n = n.min(N - self.len);
        if self.skip > 0 {
            let dropped = self.skip.min(n);
            self.buf.copy_within(self.len + dropped..self.len + n, self.len);
            self.skip -= dropped;
            n -= dropped;
        }
        self.len += n;
    }

    /// Decode the next complete packet, or `Ok(None)` if more bytes are needed.
    pub fn next_packet(&mut self) -> Result<Option<Packet<'_>>, CodecError> {
        self.release();
        loop {
            let header = match decode_header(&self.buf[..self.len]) {
                Ok(Some(header)) => header,
                Ok(None) => return Ok(None),
                Err(e) => {
                    self.clear();
                    return Err(e);
                }
            };
            let total = header.total();
            if total <= N {
                if self.len < total {
                    return Ok(None);
                }
                self.consumed = total;
                let decoded = decode(&self.buf[..total])?;
                return Ok(decoded.map(|(packet, _)| packet));
            }

            warn!("Skipping {} byte packet (buffer holds {})", total, N);
            let dropped = total.min(self.len);
            self.discard(dropped);
            self.skip = total - dropped;
        }
    }

    fn release(&mut self) {
        let consumed = core::mem::take(&mut self.consumed);
        self.discard(consumed);
    }

    fn discard(&mut self, n: usize) {
        let n = n.min(self.len);
        self.buf.copy_within(n..self.len, 0);
        self.len -= n;
    }
}

impl<const N: usize> Default for PacketReader<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_publish(first: u8, body: &[u8]) -> Result<Packet<'_>, CodecError> {
    let [len_hi, len_lo, rest @ ..] = body else {
        return Err(CodecError::Malformed);
    };
    let topic_len = usize::from(u16::from_be_bytes([*len_hi, *len_lo]));
    let topic = rest.get(..topic_len).ok_or(CodecError::Malformed)?;
    let topic = core::str::from_utf8(topic).map_err(|_| CodecError::Malformed)?;

    let qos = (first >> 1) & 0x03;
    // QoS 1/2 insert a packet id between topic and payload
    let id_len = if qos > 0 { 2 } else { 0 };
    let payload = rest
        .get(topic_len + id_len..)
        .ok_or(CodecError::Malformed)?;

    Ok(Packet::Publish { topic, payload })
}
