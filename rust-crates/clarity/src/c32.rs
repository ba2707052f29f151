//! Crockford-style base-32 with a double SHA-256 checksum, as used for Stacks
//! addresses (`S` + version character + c32(hash160 ‖ checksum)).

use crate::{
    CodecError,
    Result,
};
use sha2::{
    Digest,
    Sha256,
};
use std::{
    fmt,
    str::FromStr,
};

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const CHECKSUM_LEN: usize = 4;

/// A single-key or multi-sig account address: a c32 version and a hash160.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StandardPrincipal {
    version: u8,
    hash160: [u8; 20],
}

impl StandardPrincipal {
    pub fn new(version: u8, hash160: [u8; 20]) -> Result<Self> {
        if usize::from(version) >= C32_ALPHABET.len() {
            return Err(CodecError::InvalidAddress(format!(
                "version {version} is not a c32 digit"
            )));
        }
        Ok(Self { version, hash160 })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn hash160(&self) -> &[u8; 20] {
        &self.hash160
    }
}

impl fmt::Display for StandardPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", c32check_encode(self.version, &self.hash160))
    }
}

impl FromStr for StandardPrincipal {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CodecError::InvalidAddress(s.to_string());
        let rest = s.strip_prefix('S').ok_or_else(invalid)?;
        let (version, data) = c32check_decode(rest)?;
        let hash160: [u8; 20] = data.try_into().map_err(|_| invalid())?;
        Self::new(version, hash160)
    }
}

pub fn c32_encode(input: &[u8]) -> String {
    let mut digits = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u8 = 0;
    let mut carry_bits: u8 = 0;

    for current in input.iter().rev() {
        let low_bits_to_take = 5 - carry_bits;
        let low_bits = current & ((1u8 << low_bits_to_take) - 1);
        let digit = (low_bits << carry_bits) + carry;
        digits.push(C32_ALPHABET[usize::from(digit)]);
        carry_bits = (8 + carry_bits) - 5;
        carry = current >> (8 - carry_bits);

        if carry_bits >= 5 {
            let digit = carry & 0x1f;
            digits.push(C32_ALPHABET[usize::from(digit)]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }

    if carry_bits > 0 {
        digits.push(C32_ALPHABET[usize::from(carry)]);
    }

    // the most significant digits sit at the end of `digits`
    while digits.last() == Some(&C32_ALPHABET[0]) {
        digits.pop();
    }
    for byte in input {
        if *byte != 0 {
            break;
        }
        digits.push(C32_ALPHABET[0]);
    }

    digits.iter().rev().map(|d| char::from(*d)).collect()
}

pub fn c32_decode(input: &str) -> Result<Vec<u8>> {
    // least significant digit first
    let digits = input
        .chars()
        .rev()
        .map(c32_digit)
        .collect::<Result<Vec<u8>>>()?;

    let mut bytes = Vec::with_capacity(digits.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u16 = 0;
    for digit in &digits {
        carry += u16::from(*digit) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            bytes.push((carry & 0xff) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }
    if carry_bits > 0 {
        bytes.push(carry as u8);
    }

    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    for digit in digits.iter().rev() {
        if *digit != 0 {
            break;
        }
        bytes.push(0);
    }

    bytes.reverse();
    Ok(bytes)
}

pub fn c32check_encode(version: u8, data: &[u8]) -> String {
    let mut payload = Vec::with_capacity(data.len() + CHECKSUM_LEN);
    payload.extend_from_slice(data);
    payload.extend_from_slice(&checksum(version, data));
    let version_char = char::from(C32_ALPHABET[usize::from(version & 0x1f)]);
    format!("{version_char}{}", c32_encode(&payload))
}

pub fn c32check_decode(input: &str) -> Result<(u8, Vec<u8>)> {
    let mut chars = input.chars();
    let version_char = chars
        .next()
        .ok_or_else(|| CodecError::InvalidAddress(input.to_string()))?;
    let version = c32_digit(version_char)?;

    let mut payload = c32_decode(chars.as_str())?;
    if payload.len() < CHECKSUM_LEN {
        return Err(CodecError::InvalidAddress(input.to_string()));
    }
    let expected = payload.split_off(payload.len() - CHECKSUM_LEN);
    if checksum(version, &payload)[..] != expected[..] {
        return Err(CodecError::ChecksumMismatch);
    }
    Ok((version, payload))
}

fn c32_digit(c: char) -> Result<u8> {
    let normalized = match c.to_ascii_uppercase() {
        'O' => '0',
        'I' | 'L' => '1',
        other => other,
    };
    C32_ALPHABET
        .iter()
        .position(|d| char::from(*d) == normalized)
        .map(|pos| pos as u8)
        .ok_or(CodecError::InvalidC32Character(c))
}

fn checksum(version: u8, data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    hasher.update(data);
    let once = hasher.finalize();
    let twice = Sha256::digest(once);
    [twice[0], twice[1], twice[2], twice[3]]
}
