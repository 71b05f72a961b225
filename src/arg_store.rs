//! Writes arguments into the uncompressed binary layout.
//!
//! Layout: fixed-width values at their native width and byte order with no
//! prefix; strings as a native-order `u32` content length followed by exactly
//! that many content bytes, no terminator. Every write is preceded by a
//! [`size_argument`] call so the bytes written always equal the size reported.

use crate::arg_sizer::{
    size_argument, ArgumentSize, ArgumentSizes, SizingError, SizingState, LENGTH_PREFIX_SIZE,
};
use crate::argument::{Argument, WideChar, POINTER_SIZE, WIDE_CHAR_SIZE};
use crate::format_analyzer::{ParameterKind, ParsedFormat};

/// Stores one argument at the start of `out`.
///
/// Returns the same [`ArgumentSize`] that [`size_argument`] reports; nothing
/// is written when `out` is too short.
pub fn store_argument(
    kind: ParameterKind,
    state: SizingState,
    arg: &Argument<'_>,
    out: &mut [u8],
) -> Result<ArgumentSize, SizingError> {
    let size = size_argument(kind, state, arg)?;
    if out.len() < size.total {
        return Err(SizingError::BufferTooSmall {
            needed: size.total,
            available: out.len(),
        });
    }
    let out = &mut out[..size.total];

    match (*arg, size.content_len) {
        (Argument::Scalar(value), _) => value.write_ne(out),
        (Argument::Str(bytes), Some(content_len)) => {
            let body = write_length_prefix(out, content_len);
            body.copy_from_slice(&bytes[..content_len]);
        }
        (Argument::WideStr(units), Some(content_len)) => {
            let body = write_length_prefix(out, content_len);
            let count = content_len / WIDE_CHAR_SIZE;
            for (chunk, unit) in body.chunks_exact_mut(WIDE_CHAR_SIZE).zip(&units[..count]) {
                chunk.copy_from_slice(&unit.to_ne_bytes());
            }
        }
        (Argument::Pointer(_), _) | (Argument::Str(_) | Argument::WideStr(_), None) => {
            debug_assert_eq!(out.len(), POINTER_SIZE);
            out.copy_from_slice(&arg.address().to_ne_bytes());
        }
    }

    Ok(size)
}

fn write_length_prefix(out: &mut [u8], content_len: usize) -> &mut [u8] {
    let (prefix, body) = out.split_at_mut(LENGTH_PREFIX_SIZE);
    // size_argument has already rejected lengths beyond u32.
    prefix.copy_from_slice(&(content_len as u32).to_ne_bytes());
    body
}

/// Stores all arguments of one log call back to back at the start of `out`.
///
/// The whole record is sized first, so a short buffer fails before any byte is
/// written. Returns the number of bytes written.
///
/// # Examples
///
/// ```
/// # use binlog_format::{analyze, store_arguments, size_arguments, Argument};
/// let parsed = analyze("%.2s=%u");
/// let args = [Argument::from("abc"), Argument::from(9u32)];
/// let mut buf = [0u8; 64];
/// let written = store_arguments(&parsed, &args, &mut buf).unwrap();
/// assert_eq!(written, size_arguments(&parsed, &args).unwrap());
/// assert_eq!(&buf[..4], &2u32.to_ne_bytes());
/// assert_eq!(&buf[4..6], b"ab");
/// ```
pub fn store_arguments(
    format: &ParsedFormat,
    args: &[Argument<'_>],
    out: &mut [u8],
) -> Result<usize, SizingError> {
    let needed = ArgumentSizes::new(format, args)?
        .try_fold(0, |total, size| Ok::<_, SizingError>(total + size?.total))?;
    if out.len() < needed {
        return Err(SizingError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }

    let mut pos = 0;
    let mut state = SizingState::new();
    for (&kind, arg) in format.iter().zip(args) {
        let size = store_argument(kind, state, arg, &mut out[pos..])?;
        state = size.state;
        pos += size.total;
    }
    Ok(pos)
}

/// Reads back a string stored by [`store_argument`]: `(content, bytes consumed)`.
pub fn read_stored_str(data: &[u8]) -> Option<(&[u8], usize)> {
    let prefix: [u8; LENGTH_PREFIX_SIZE] = data.get(..LENGTH_PREFIX_SIZE)?.try_into().ok()?;
    let len = u32::from_ne_bytes(prefix) as usize;
    let content = data.get(LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + len)?;
    Some((content, LENGTH_PREFIX_SIZE + len))
}

/// Wide counterpart of [`read_stored_str`], decoding native-order units.
pub fn read_stored_wide_str(data: &[u8]) -> Option<(Vec<WideChar>, usize)> {
    let (content, consumed) = read_stored_str(data)?;
    if content.len() % WIDE_CHAR_SIZE != 0 {
        return None;
    }
    let units = content
        .chunks_exact(WIDE_CHAR_SIZE)
        .map(|chunk| {
            let mut unit = [0u8; WIDE_CHAR_SIZE];
            unit.copy_from_slice(chunk);
            WideChar::from_ne_bytes(unit)
        })
        .collect();
    Some((units, consumed))
}
