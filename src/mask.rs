// mask.rs - wildcard identity mask matching
//
// stonechat-ircd - single-server IRC daemon
// Copyright (C) 2024  The stonechat-ircd authors
//
// This library is free software; you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public
// License as published by the Free Software Foundation; either
// version 2.1 of the License, or (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this library; if not, write to the Free Software
// Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA

use std::error::Error;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MaskError {
    InvalidCharacter(char),
}

impl fmt::Display for MaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskError::InvalidCharacter(c) => {
                write!(f, "Invalid character {:?} in mask", c)
            }
        }
    }
}

impl Error for MaskError {}

/// Validated `nick!user@host` style glob. `?` matches one byte, `*` any
/// run of bytes. The empty mask matches everything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Mask {
    pattern: Vec<u8>,
}

impl Mask {
    /// Only printable ASCII may appear in a mask; spaces, commas and
    /// control bytes are rejected.
    pub(crate) fn compile(text: &str) -> Result<Mask, MaskError> {
        let mut pattern = Vec::with_capacity(text.len());
        for b in text.bytes() {
            match b {
                b',' => return Err(MaskError::InvalidCharacter(',')),
                0x21..=0x7e => pattern.push(b),
                _ => return Err(MaskError::InvalidCharacter(b as char)),
            }
        }
        Ok(Mask { pattern })
    }

    pub(crate) fn matches(&self, subject: &str) -> bool {
        if self.pattern.is_empty() {
            return true;
        }
        match_bytes(&self.pattern, subject.as_bytes())
    }
}

// Backtracking scan. Identity masks are short, so the worst case on long
// `*` runs does not matter here.
fn match_bytes(mask: &[u8], subject: &[u8]) -> bool {
    match mask.split_first() {
        None => subject.is_empty(),
        Some((b'*', rest)) => (0..=subject.len()).any(|i| match_bytes(rest, &subject[i..])),
        Some((b'?', rest)) => !subject.is_empty() && match_bytes(rest, &subject[1..]),
        Some((&c, rest)) => subject.first() == Some(&c) && match_bytes(rest, &subject[1..]),
    }
}
