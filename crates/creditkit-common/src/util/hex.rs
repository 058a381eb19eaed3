//! Hex encoding and decoding

use thiserror::Error;

/// Hex error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Non-hex character
    #[error("Invalid hex character: {0}")]
    InvalidCharacter(char),
    /// Odd number of digits
    #[error("Odd number of hex digits")]
    OddLength,
}

/// Encode bytes as lowercase hex
pub fn encode<T>(data: T) -> String
where
    T: AsRef<[u8]>,
{
    let mut out = String::with_capacity(data.as_ref().len() * 2);
    for byte in data.as_ref() {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Decode a hex string (either case) into bytes
pub fn decode<T>(hex: T) -> Result<Vec<u8>, Error>
where
    T: AsRef<[u8]>,
{
    let hex = hex.as_ref();
    if hex.len() % 2 != 0 {
        return Err(Error::OddLength);
    }

    let digit = |c: u8| -> Result<u8, Error> {
        match c {
            b'0'..=b'9' => Ok(c - b'0'),
            b'a'..=b'f' => Ok(c - b'a' + 10),
            b'A'..=b'F' => Ok(c - b'A' + 10),
            other => Err(Error::InvalidCharacter(other as char)),
        }
    };

    hex.chunks(2)
        .map(|pair| Ok(digit(pair[0])? << 4 | digit(pair[1])?))
        .collect()
}
