//! Consistent overhead byte stuffing (COBS).
//!
//! Removes every zero byte from a sequence so that zero can be used as an
//! unambiguous frame delimiter on the wire. Each run of non-zero bytes is
//! prefixed with a code byte holding `run length + 1`; a run ends either at a
//! source zero (which is dropped) or after 254 non-zero bytes (code `0xFF`,
//! no source zero consumed).
//!
//! ```text
//! source:  01 01 01 00 00 05 00
//! stuffed: 04 01 01 01 01 02 05 01
//! ```

use crate::error::CobsError;

/// The reserved sentinel value. Never appears in stuffed output.
pub const DELIMITER: u8 = 0x00;

/// Code byte marking a full 254-byte run with no trailing zero.
const MAX_CODE: u8 = 0xFF;

/// Longest run of non-zero bytes a single code byte can cover.
const MAX_RUN: usize = MAX_CODE as usize - 1;

/// Destination capacity required to stuff `raw_len` bytes.
///
/// Callers must size encode destinations to at least this value.
pub const fn encoded_capacity(raw_len: usize) -> usize {
    raw_len + raw_len / MAX_RUN + 1
}

/// Destination capacity sufficient to unstuff `stuffed_len` bytes.
///
/// Every code byte expands to at most itself plus its run, so unstuffed
/// output is never longer than the input.
pub const fn decoded_capacity(stuffed_len: usize) -> usize {
    stuffed_len
}

/// Stuff `src` into `dst`, returning the number of bytes written.
///
/// An empty source produces no output. Fails without touching `dst` when it
/// is shorter than [`encoded_capacity`].
pub fn encode(src: &[u8], dst: &mut [u8]) -> Result<usize, CobsError> {
    if src.is_empty() {
        return Ok(0);
    }

    let required = encoded_capacity(src.len());
    if dst.len() < required {
        return Err(CobsError::DestinationTooSmall {
            required,
            actual: dst.len(),
        });
    }
    Ok(stuff(src, dst))
}

/// The stuffing loop proper. `dst` must hold `encoded_capacity(src.len())`.
fn stuff(src: &[u8], dst: &mut [u8]) -> usize {
    debug_assert!(dst.len() >= encoded_capacity(src.len()));
    if src.is_empty() {
        return 0;
    }

    let mut code_idx = 0usize;
    let mut code = 1u8;
    let mut pos = 1usize;

    for &byte in src {
        if byte == DELIMITER {
            dst[code_idx] = code;
            code_idx = pos;
            pos += 1;
            code = 1;
            continue;
        }

        dst[pos] = byte;
        pos += 1;
        code += 1;
        if code == MAX_CODE {
            dst[code_idx] = code;
            code_idx = pos;
            pos += 1;
            code = 1;
        }
    }
    dst[code_idx] = code;
    pos
}

/// Unstuff `src` into `dst`, returning the number of bytes written.
///
/// The zero implied by the final code byte terminates the stuffed
/// representation rather than the payload, so it is not counted in the
/// returned length. An empty source decodes to nothing.
pub fn decode(src: &[u8], dst: &mut [u8]) -> Result<usize, CobsError> {
    if src.is_empty() {
        return Ok(0);
    }

    let mut ptr = 0usize;
    let mut pos = 0usize;
    let mut last_code = MAX_CODE;

    while ptr < src.len() {
        let code = src[ptr];
        if code == DELIMITER {
            return Err(CobsError::ZeroInStuffed { offset: ptr });
        }

        let claimed = ptr + usize::from(code);
        if claimed > src.len() {
            return Err(CobsError::EncodedTooShort {
                required: claimed,
                actual: src.len(),
            });
        }
        ptr += 1;

        let run = usize::from(code) - 1;
        let written = run + usize::from(code < MAX_CODE);
        if pos + written > dst.len() {
            return Err(CobsError::DestinationTooShort {
                required: pos + written,
                actual: dst.len(),
            });
        }

        let chunk = &src[ptr..ptr + run];
        if let Some(offset) = chunk.iter().position(|&b| b == DELIMITER) {
            return Err(CobsError::ZeroInStuffed {
                offset: ptr + offset,
            });
        }
        dst[pos..pos + run].copy_from_slice(chunk);
        pos += run;
        ptr += run;

        if code < MAX_CODE {
            dst[pos] = DELIMITER;
            pos += 1;
        }
        last_code = code;
    }

    // A trailing full run carries no implied zero to trim.
    if last_code < MAX_CODE {
        pos -= 1;
    }
    Ok(pos)
}

/// Stuff `src` into a freshly allocated vector.
pub fn encode_to_vec(src: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; encoded_capacity(src.len())];
    let len = stuff(src, &mut out);
    out.truncate(len);
    out
}

/// Unstuff `src` into a freshly allocated vector.
pub fn decode_to_vec(src: &[u8]) -> Result<Vec<u8>, CobsError> {
    let mut out = vec![0u8; decoded_capacity(src.len())];
    let len = decode(src, &mut out)?;
    out.truncate(len);
    Ok(out)
}
