use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};

/// Maximum handler name length (bounded by the u16 length field).
pub const MAX_NAME_LEN: usize = u16::MAX as usize;

const TAG_MESSAGE: u8 = 1;
const TAG_REQUEST: u8 = 2;
const TAG_RESPONSE: u8 = 3;

/// Payload encoding tag carried by requests and responses.
///
/// `Text` is only produced for error responses. Unrecognized tags survive
/// decoding as `Unknown` so a single bad request can be answered with an
/// error response instead of tearing down the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Schemaless JSON text encoding.
    Json,
    /// Schema'd binary encoding.
    Schema,
    /// UTF-8 text, used for error response payloads.
    Text,
    /// A tag this version does not recognize.
    Unknown(u8),
}

impl DataType {
    pub fn to_wire(self) -> u8 {
        match self {
            DataType::Json => 1,
            DataType::Schema => 2,
            DataType::Text => 3,
            DataType::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: u8) -> Self {
        match raw {
            1 => DataType::Json,
            2 => DataType::Schema,
            3 => DataType::Text,
            other => DataType::Unknown(other),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Json => write!(f, "json"),
            DataType::Schema => write!(f, "schema"),
            DataType::Text => write!(f, "text"),
            DataType::Unknown(raw) => write!(f, "unknown({raw})"),
        }
    }
}

/// A named request carrying encoded parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Parameter encoding.
    pub data_type: DataType,
    /// Handler name on the receiving peer.
    pub name: String,
    /// Correlation id, unique per connection while in flight.
    pub req_id: u32,
    /// Encoded parameters. May be empty.
    pub data: Bytes,
}

/// A response correlated to a request by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Correlation id of the originating request.
    pub req_id: u32,
    /// Result encoding. `Text` when `is_error`.
    pub data_type: DataType,
    /// Whether `data` carries a public error message.
    pub is_error: bool,
    /// Encoded result, or a UTF-8 error message.
    pub data: Bytes,
}

/// The outermost wire unit: exactly one variant per transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wrapper {
    /// Reserved for future one-way content. Never produced by this version.
    Message(Bytes),
    Request(Request),
    Response(Response),
}

/// Encode a wrapper into its wire representation.
///
/// Wire format (little-endian):
/// ```text
/// tag:u8            1 = Message, 2 = Request, 3 = Response
/// Message  body :=  opaque bytes
/// Request  body :=  data_type:u8  req_id:u32  name_len:u16  name  data
/// Response body :=  data_type:u8  req_id:u32  is_error:u8   data
/// ```
pub fn encode(wrapper: &Wrapper) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    match wrapper {
        Wrapper::Message(data) => {
            buf.reserve(1 + data.len());
            buf.put_u8(TAG_MESSAGE);
            buf.put_slice(data);
        }
        Wrapper::Request(req) => {
            if req.name.len() > MAX_NAME_LEN {
                return Err(WireError::NameTooLong {
                    len: req.name.len(),
                    max: MAX_NAME_LEN,
                });
            }
            buf.reserve(1 + 1 + 4 + 2 + req.name.len() + req.data.len());
            buf.put_u8(TAG_REQUEST);
            buf.put_u8(req.data_type.to_wire());
            buf.put_u32_le(req.req_id);
            buf.put_u16_le(req.name.len() as u16);
            buf.put_slice(req.name.as_bytes());
            buf.put_slice(&req.data);
        }
        Wrapper::Response(res) => {
            buf.reserve(1 + 1 + 4 + 1 + res.data.len());
            buf.put_u8(TAG_RESPONSE);
            buf.put_u8(res.data_type.to_wire());
            buf.put_u32_le(res.req_id);
            buf.put_u8(res.is_error as u8);
            buf.put_slice(&res.data);
        }
    }
    Ok(buf.freeze())
}

/// Decode one wrapper from the bytes of a transport frame.
pub fn decode(bytes: &[u8]) -> Result<Wrapper> {
    if bytes.is_empty() {
        return Err(WireError::EmptyFrame);
    }

    let tag = bytes[0];
    let body = &bytes[1..];
    match tag {
        TAG_MESSAGE => Ok(Wrapper::Message(Bytes::copy_from_slice(body))),
        TAG_REQUEST => decode_request(body).map(Wrapper::Request),
        TAG_RESPONSE => decode_response(body).map(Wrapper::Response),
        other => Err(WireError::UnknownContent(other)),
    }
}

fn decode_request(body: &[u8]) -> Result<Request> {
    // data_type (1) + req_id (4) + name_len (2)
    if body.len() < 7 {
        return Err(WireError::Malformed("truncated request header"));
    }

    let data_type = DataType::from_wire(body[0]);
    let req_id = u32::from_le_bytes(body[1..5].try_into().unwrap());
    let name_len = u16::from_le_bytes(body[5..7].try_into().unwrap()) as usize;

    let rest = &body[7..];
    if rest.len() < name_len {
        return Err(WireError::Malformed("truncated request name"));
    }

    let name = std::str::from_utf8(&rest[..name_len])
        .map_err(|_| WireError::Malformed("request name is not UTF-8"))?
        .to_string();

    Ok(Request {
        data_type,
        name,
        req_id,
        data: Bytes::copy_from_slice(&rest[name_len..]),
    })
}

fn decode_response(body: &[u8]) -> Result<Response> {
    // data_type (1) + req_id (4) + is_error (1)
    if body.len() < 6 {
        return Err(WireError::Malformed("truncated response header"));
    }

    let data_type = DataType::from_wire(body[0]);
    let req_id = u32::from_le_bytes(body[1..5].try_into().unwrap());
    let is_error = body[5] != 0;

    Ok(Response {
        req_id,
        data_type,
        is_error,
        data: Bytes::copy_from_slice(&body[6..]),
    })
}
