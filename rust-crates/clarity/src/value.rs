use crate::{
    CodecError,
    Result,
    StandardPrincipal,
};
use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Principal {
    Standard(StandardPrincipal),
    Contract {
        issuer: StandardPrincipal,
        name: String,
    },
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Standard(principal) => write!(f, "{principal}"),
            Principal::Contract { issuer, name } => write!(f, "{issuer}.{name}"),
        }
    }
}

impl FromStr for Principal {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((issuer, name)) if !name.is_empty() => Ok(Principal::Contract {
                issuer: issuer.parse()?,
                name: name.to_string(),
            }),
            Some(_) => Err(CodecError::InvalidAddress(s.to_string())),
            None => Ok(Principal::Standard(s.parse()?)),
        }
    }
}

/// A tagged Clarity value. Tuple fields are kept sorted by name, which is also
/// their wire order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClarityValue {
    Int(i128),
    UInt(u128),
    Buffer(Vec<u8>),
    Bool(bool),
    Principal(Principal),
    ResponseOk(Box<ClarityValue>),
    ResponseErr(Box<ClarityValue>),
    OptionalNone,
    OptionalSome(Box<ClarityValue>),
    List(Vec<ClarityValue>),
    Tuple(BTreeMap<String, ClarityValue>),
    StringAscii(String),
    StringUtf8(String),
}

impl ClarityValue {
    pub fn uint(value: impl Into<u128>) -> Self {
        ClarityValue::UInt(value.into())
    }

    pub fn some(value: ClarityValue) -> Self {
        ClarityValue::OptionalSome(Box::new(value))
    }

    pub fn ok(value: ClarityValue) -> Self {
        ClarityValue::ResponseOk(Box::new(value))
    }

    pub fn principal(address: &str) -> Result<Self> {
        Ok(ClarityValue::Principal(address.parse()?))
    }

    pub fn tuple<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ClarityValue)>,
    {
        ClarityValue::Tuple(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// Short type tag used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClarityValue::Int(_) => "int",
            ClarityValue::UInt(_) => "uint",
            ClarityValue::Buffer(_) => "buffer",
            ClarityValue::Bool(_) => "bool",
            ClarityValue::Principal(_) => "principal",
            ClarityValue::ResponseOk(_) => "ok",
            ClarityValue::ResponseErr(_) => "err",
            ClarityValue::OptionalNone => "none",
            ClarityValue::OptionalSome(_) => "some",
            ClarityValue::List(_) => "list",
            ClarityValue::Tuple(_) => "tuple",
            ClarityValue::StringAscii(_) => "string-ascii",
            ClarityValue::StringUtf8(_) => "string-utf8",
        }
    }
}
