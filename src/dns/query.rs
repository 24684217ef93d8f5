use std::net::Ipv4Addr;

use bytes::{BufMut, Bytes, BytesMut};

pub const HEADER_LEN: usize = 12;
pub const OPCODE_QUERY: u8 = 0;

/// QR=1, opcode 0, AA=1, RD=1 / RA=1, rcode 0.
const RESPONSE_FLAGS: [u8; 2] = [0x81, 0x80];
/// Compression pointer to the question name at offset 12.
const NAME_POINTER: u16 = 0xC00C;
const TYPE_A: u16 = 1;
const CLASS_IN: u16 = 1;
const MAX_NAME_LEN: usize = 255;

/// Why a datagram got no answer. Drops are silent towards the client.
#[derive(Debug, thiserror::Error)]
pub enum DropReason {
    #[error("datagram of {0} bytes is shorter than a DNS header")]
    Truncated(usize),
    #[error("unsupported opcode {0}")]
    UnsupportedOpcode(u8),
    #[error("malformed question section")]
    MalformedQuestion,
    #[error("question label is not valid UTF-8")]
    InvalidLabel,
    #[error("empty question name")]
    EmptyName,
    #[error("send failed: {0}")]
    Send(#[from] std::io::Error),
}

/// A standard query, borrowed from the datagram it was parsed from.
#[derive(Debug)]
pub struct DnsQuery<'a> {
    data: &'a [u8],
    pub id: u16,
    pub opcode: u8,
    /// Dotted name from the first question, without a trailing dot
    pub domain: String,
    question_end: usize,
}

/// Opcode from bits 3-6 of header byte 2.
pub fn opcode(data: &[u8]) -> Option<u8> {
    data.get(2).map(|flags| (flags >> 3) & 0x0F)
}

impl<'a> DnsQuery<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, DropReason> {
        if data.len() < HEADER_LEN {
            return Err(DropReason::Truncated(data.len()));
        }

        let opcode = opcode(data).ok_or(DropReason::Truncated(data.len()))?;
        if opcode != OPCODE_QUERY {
            return Err(DropReason::UnsupportedOpcode(opcode));
        }

        let id = u16::from_be_bytes([data[0], data[1]]);

        let mut labels = Vec::new();
        let mut pos = HEADER_LEN;
        loop {
            let len = *data.get(pos).ok_or(DropReason::MalformedQuestion)? as usize;
            pos += 1;
            if len == 0 {
                break;
            }
            // Pointers and extended label types never appear in a question name.
            if len & 0xC0 != 0 {
                return Err(DropReason::MalformedQuestion);
            }

            let label = data
                .get(pos..pos + len)
                .ok_or(DropReason::MalformedQuestion)?;
            labels.push(std::str::from_utf8(label).map_err(|_| DropReason::InvalidLabel)?);
            pos += len;

            if pos - HEADER_LEN > MAX_NAME_LEN {
                return Err(DropReason::MalformedQuestion);
            }
        }

        // QTYPE and QCLASS follow the name.
        let question_end = pos + 4;
        if question_end > data.len() {
            return Err(DropReason::MalformedQuestion);
        }

        let domain = labels.join(".");
        if domain.is_empty() {
            return Err(DropReason::EmptyName);
        }

        Ok(Self {
            data,
            id,
            opcode,
            domain,
            question_end,
        })
    }

    /// The first question entry exactly as the client sent it.
    pub fn question(&self) -> &'a [u8] {
        &self.data[HEADER_LEN..self.question_end]
    }

    /// Authoritative answer pointing the queried name at `address`.
    pub fn response(&self, address: Ipv4Addr, ttl: u32) -> Bytes {
        let question = self.question();
        let mut packet = BytesMut::with_capacity(HEADER_LEN + question.len() + 16);

        packet.put_u16(self.id);
        packet.put_slice(&RESPONSE_FLAGS);
        packet.put_u16(1); // questions
        packet.put_u16(1); // answers
        packet.put_u16(0); // authority
        packet.put_u16(0); // additional
        packet.put_slice(question);

        packet.put_u16(NAME_POINTER);
        packet.put_u16(TYPE_A);
        packet.put_u16(CLASS_IN);
        packet.put_u32(ttl);
        packet.put_u16(4);
        packet.put_slice(&address.octets());

        packet.freeze()
    }
}

/// Parses `data` and builds the answer, or says why there is none.
pub fn answer_query(data: &[u8], address: Ipv4Addr, ttl: u32) -> Result<(String, Bytes), DropReason> {
    let query = DnsQuery::parse(data)?;
    let response = query.response(address, ttl);
    Ok((query.domain, response))
}
