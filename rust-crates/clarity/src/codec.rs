use crate::{
    ClarityValue,
    CodecError,
    Principal,
    Result,
    StandardPrincipal,
};
use std::collections::BTreeMap;

const MAX_DEPTH: usize = 32;

mod prefix {
    pub const INT: u8 = 0x00;
    pub const UINT: u8 = 0x01;
    pub const BUFFER: u8 = 0x02;
    pub const TRUE: u8 = 0x03;
    pub const FALSE: u8 = 0x04;
    pub const STANDARD_PRINCIPAL: u8 = 0x05;
    pub const CONTRACT_PRINCIPAL: u8 = 0x06;
    pub const RESPONSE_OK: u8 = 0x07;
    pub const RESPONSE_ERR: u8 = 0x08;
    pub const NONE: u8 = 0x09;
    pub const SOME: u8 = 0x0a;
    pub const LIST: u8 = 0x0b;
    pub const TUPLE: u8 = 0x0c;
    pub const STRING_ASCII: u8 = 0x0d;
    pub const STRING_UTF8: u8 = 0x0e;
}

impl ClarityValue {
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// `0x`-prefixed hex, the form the node HTTP API expects for arguments.
    pub fn to_hex(&self) -> Result<String> {
        Ok(format!("0x{}", hex::encode(self.serialize()?)))
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { bytes, pos: 0 };
        let value = reader.read_value(0)?;
        let remaining = bytes.len() - reader.pos;
        if remaining > 0 {
            return Err(CodecError::TrailingBytes(remaining));
        }
        Ok(value)
    }

    pub fn from_hex(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits)?;
        Self::deserialize(&bytes)
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            ClarityValue::Int(v) => {
                out.push(prefix::INT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            ClarityValue::UInt(v) => {
                out.push(prefix::UINT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            ClarityValue::Buffer(bytes) => {
                out.push(prefix::BUFFER);
                write_u32_len(out, "buffer", bytes.len())?;
                out.extend_from_slice(bytes);
            }
            ClarityValue::Bool(true) => out.push(prefix::TRUE),
            ClarityValue::Bool(false) => out.push(prefix::FALSE),
            ClarityValue::Principal(Principal::Standard(principal)) => {
                out.push(prefix::STANDARD_PRINCIPAL);
                write_standard_principal(out, principal);
            }
            ClarityValue::Principal(Principal::Contract { issuer, name }) => {
                out.push(prefix::CONTRACT_PRINCIPAL);
                write_standard_principal(out, issuer);
                write_u8_name(out, "contract name", name)?;
            }
            ClarityValue::ResponseOk(inner) => {
                out.push(prefix::RESPONSE_OK);
                inner.write_to(out)?;
            }
            ClarityValue::ResponseErr(inner) => {
                out.push(prefix::RESPONSE_ERR);
                inner.write_to(out)?;
            }
            ClarityValue::OptionalNone => out.push(prefix::NONE),
            ClarityValue::OptionalSome(inner) => {
                out.push(prefix::SOME);
                inner.write_to(out)?;
            }
            ClarityValue::List(items) => {
                out.push(prefix::LIST);
                write_u32_len(out, "list", items.len())?;
                for item in items {
                    item.write_to(out)?;
                }
            }
            ClarityValue::Tuple(fields) => {
                out.push(prefix::TUPLE);
                write_u32_len(out, "tuple", fields.len())?;
                for (name, value) in fields {
                    write_u8_name(out, "tuple field name", name)?;
                    value.write_to(out)?;
                }
            }
            ClarityValue::StringAscii(s) => {
                if !s.is_ascii() {
                    return Err(CodecError::NotAscii);
                }
                out.push(prefix::STRING_ASCII);
                write_u32_len(out, "string-ascii", s.len())?;
                out.extend_from_slice(s.as_bytes());
            }
            ClarityValue::StringUtf8(s) => {
                out.push(prefix::STRING_UTF8);
                write_u32_len(out, "string-utf8", s.len())?;
                out.extend_from_slice(s.as_bytes());
            }
        }
        Ok(())
    }
}

fn write_u32_len(out: &mut Vec<u8>, what: &'static str, len: usize) -> Result<()> {
    let len32 =
        u32::try_from(len).map_err(|_| CodecError::LengthOverflow { what, len })?;
    out.extend_from_slice(&len32.to_be_bytes());
    Ok(())
}

fn write_u8_name(out: &mut Vec<u8>, what: &'static str, name: &str) -> Result<()> {
    let len = u8::try_from(name.len()).map_err(|_| CodecError::LengthOverflow {
        what,
        len: name.len(),
    })?;
    out.push(len);
    out.extend_from_slice(name.as_bytes());
    Ok(())
}

fn write_standard_principal(out: &mut Vec<u8>, principal: &StandardPrincipal) {
    out.push(principal.version());
    out.extend_from_slice(principal.hash160());
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(CodecError::UnexpectedEnd)?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(CodecError::UnexpectedEnd)?;
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<usize> {
        Ok(u32::from_be_bytes(self.take_array()?) as usize)
    }

    fn read_name(&mut self) -> Result<String> {
        let len = usize::from(self.read_u8()?);
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    fn read_standard_principal(&mut self) -> Result<StandardPrincipal> {
        let version = self.read_u8()?;
        let hash160 = self.take_array()?;
        StandardPrincipal::new(version, hash160)
    }

    fn read_value(&mut self, depth: usize) -> Result<ClarityValue> {
        if depth > MAX_DEPTH {
            return Err(CodecError::DepthExceeded(MAX_DEPTH));
        }
        let value = match self.read_u8()? {
            prefix::INT => ClarityValue::Int(i128::from_be_bytes(self.take_array()?)),
            prefix::UINT => ClarityValue::UInt(u128::from_be_bytes(self.take_array()?)),
            prefix::BUFFER => {
                let len = self.read_u32()?;
                ClarityValue::Buffer(self.take(len)?.to_vec())
            }
            prefix::TRUE => ClarityValue::Bool(true),
            prefix::FALSE => ClarityValue::Bool(false),
            prefix::STANDARD_PRINCIPAL => {
                ClarityValue::Principal(Principal::Standard(self.read_standard_principal()?))
            }
            prefix::CONTRACT_PRINCIPAL => {
                let issuer = self.read_standard_principal()?;
                let name = self.read_name()?;
                ClarityValue::Principal(Principal::Contract { issuer, name })
            }
            prefix::RESPONSE_OK => {
                ClarityValue::ResponseOk(Box::new(self.read_value(depth + 1)?))
            }
            prefix::RESPONSE_ERR => {
                ClarityValue::ResponseErr(Box::new(self.read_value(depth + 1)?))
            }
            prefix::NONE => ClarityValue::OptionalNone,
            prefix::SOME => ClarityValue::OptionalSome(Box::new(self.read_value(depth + 1)?)),
            prefix::LIST => {
                let len = self.read_u32()?;
                // every item takes at least one byte
                let mut items = Vec::with_capacity(len.min(self.bytes.len() - self.pos));
                for _ in 0..len {
                    items.push(self.read_value(depth + 1)?);
                }
                ClarityValue::List(items)
            }
            prefix::TUPLE => {
                let len = self.read_u32()?;
                let mut fields = BTreeMap::new();
                for _ in 0..len {
                    let name = self.read_name()?;
                    let value = self.read_value(depth + 1)?;
                    fields.insert(name, value);
                }
                ClarityValue::Tuple(fields)
            }
            prefix::STRING_ASCII => {
                let len = self.read_u32()?;
                let bytes = self.take(len)?;
                if !bytes.is_ascii() {
                    return Err(CodecError::NotAscii);
                }
                ClarityValue::StringAscii(String::from_utf8_lossy(bytes).into_owned())
            }
            prefix::STRING_UTF8 => {
                let len = self.read_u32()?;
                let bytes = self.take(len)?;
                let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
                ClarityValue::StringUtf8(s.to_string())
            }
            other => return Err(CodecError::UnknownTypePrefix(other)),
        };
        Ok(value)
    }
}
