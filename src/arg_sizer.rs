//! Uncompressed argument sizing.
//!
//! Computes, per argument, the number of bytes its raw binary form occupies
//! in a log record, matching byte for byte what [`crate::arg_store`] writes.

use std::mem::size_of;

use thiserror::Error;

use crate::argument::{Argument, POINTER_SIZE, WIDE_CHAR_SIZE};
use crate::format_analyzer::{ParameterKind, ParsedFormat};

/// Bytes of the length field written ahead of every string's content.
pub const LENGTH_PREFIX_SIZE: usize = size_of::<u32>();

/// Errors raised while sizing or storing the arguments of one log call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizingError {
    #[error("argument slot has an invalid format specifier")]
    InvalidSpecifier,

    #[error("argument {index} has an invalid format specifier")]
    InvalidArgument { index: usize },

    #[error("format expects {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("argument {index} is a {found}, which does not fit {kind:?}")]
    TypeMismatch {
        index: usize,
        kind: ParameterKind,
        found: &'static str,
    },

    #[error("string of {len} bytes does not fit the 4-byte length prefix")]
    LengthOverflow { len: usize },

    #[error("record needs {needed} bytes but only {available} are available")]
    BufferTooSmall { needed: usize, available: usize },
}

/// The running state of one log call's sizing pass.
///
/// Holds the value of the most recent `DynamicPrecision` argument so the
/// following `%.*s` slot can be truncated. Create one per log call and move it
/// through each [`size_argument`] call in argument order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizingState {
    precision: Option<u64>,
}

impl SizingState {
    pub const fn new() -> Self {
        Self { precision: None }
    }

    /// Last dynamic precision seen; `None` means no truncation.
    pub const fn precision(&self) -> Option<u64> {
        self.precision
    }
}

/// Result of sizing one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentSize {
    /// Total bytes the argument occupies, length prefix included.
    pub total: usize,

    /// For strings, the content bytes to copy after truncation.
    pub content_len: Option<usize>,

    /// State to pass to the next argument of the same call.
    pub state: SizingState,
}

impl ArgumentSize {
    const fn fixed(total: usize, state: SizingState) -> Self {
        Self {
            total,
            content_len: None,
            state,
        }
    }
}

/// Sizes a single argument against its format slot.
///
/// Fixed-width values size to their native width; a `DynamicPrecision` value
/// is also recorded in the returned state. Strings are measured up to their
/// terminator, truncated by the slot's precision, and carry a
/// [`LENGTH_PREFIX_SIZE`] prefix. A string passed to a non-string slot (such
/// as `%p`) is sized as a pointer.
///
/// The slot is trusted to describe the argument; category checks belong to
/// the caller (see [`ArgumentSizes`]). An `Invalid` slot is always an error.
///
/// # Examples
///
/// ```
/// # use binlog_format::{analyze, size_argument, Argument, SizingState};
/// let parsed = analyze("%.*s");
/// let width = size_argument(parsed[0], SizingState::new(), &Argument::from(3i32)).unwrap();
/// let name = size_argument(parsed[1], width.state, &Argument::from("hello")).unwrap();
/// assert_eq!(name.content_len, Some(3));
/// assert_eq!(name.total, 3 + 4);
/// ```
pub fn size_argument(
    kind: ParameterKind,
    state: SizingState,
    arg: &Argument<'_>,
) -> Result<ArgumentSize, SizingError> {
    if !kind.is_valid() {
        return Err(SizingError::InvalidSpecifier);
    }

    match *arg {
        Argument::Scalar(value) => {
            let state = if kind == ParameterKind::DynamicPrecision {
                SizingState {
                    precision: value.as_precision(),
                }
            } else {
                state
            };
            Ok(ArgumentSize::fixed(value.width(), state))
        }
        Argument::Pointer(_) => Ok(ArgumentSize::fixed(POINTER_SIZE, state)),
        Argument::Str(bytes) => {
            if !kind.is_string() {
                return Ok(ArgumentSize::fixed(POINTER_SIZE, state));
            }
            let measured = memchr::memchr(0, bytes).unwrap_or(bytes.len());
            string_size(truncated_len(kind, state, measured), 1, state)
        }
        Argument::WideStr(units) => {
            if !kind.is_string() {
                return Ok(ArgumentSize::fixed(POINTER_SIZE, state));
            }
            let measured = units.iter().position(|&u| u == 0).unwrap_or(units.len());
            string_size(truncated_len(kind, state, measured), WIDE_CHAR_SIZE, state)
        }
    }
}

/// Applies `%.Ns` or `%.*s` truncation to a length counted in string units.
fn truncated_len(kind: ParameterKind, state: SizingState, measured: usize) -> usize {
    let limit = match kind {
        ParameterKind::StringWithStaticPrecision(precision) => Some(u64::from(precision)),
        ParameterKind::StringWithDynamicPrecision => state.precision,
        _ => None,
    };
    match limit {
        Some(limit) if (measured as u64) > limit => limit as usize,
        _ => measured,
    }
}

fn string_size(
    units: usize,
    unit_size: usize,
    state: SizingState,
) -> Result<ArgumentSize, SizingError> {
    let content_len = units * unit_size;
    if u32::try_from(content_len).is_err() {
        return Err(SizingError::LengthOverflow { len: content_len });
    }
    Ok(ArgumentSize {
        total: content_len + LENGTH_PREFIX_SIZE,
        content_len: Some(content_len),
        state,
    })
}

/// Walks a format's slots in lockstep with one call's arguments.
///
/// Owns the call's [`SizingState`], so independent calls never share one.
/// Each argument's category is checked against its slot before sizing.
pub struct ArgumentSizes<'f, 'a> {
    kinds: std::slice::Iter<'f, ParameterKind>,
    args: std::slice::Iter<'f, Argument<'a>>,
    index: usize,
    state: SizingState,
}

impl<'f, 'a> ArgumentSizes<'f, 'a> {
    /// Fails up front when the argument count differs from the slot count.
    pub fn new(format: &'f ParsedFormat, args: &'f [Argument<'a>]) -> Result<Self, SizingError> {
        if format.len() != args.len() {
            return Err(SizingError::ArgumentCount {
                expected: format.len(),
                actual: args.len(),
            });
        }
        Ok(Self {
            kinds: format.iter(),
            args: args.iter(),
            index: 0,
            state: SizingState::new(),
        })
    }
}

impl Iterator for ArgumentSizes<'_, '_> {
    type Item = Result<ArgumentSize, SizingError>;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = *self.kinds.next()?;
        let arg = self.args.next()?;
        let index = self.index;
        self.index += 1;

        if !kind.is_valid() {
            return Some(Err(SizingError::InvalidArgument { index }));
        }
        if !accepts(kind, arg) {
            return Some(Err(SizingError::TypeMismatch {
                index,
                kind,
                found: arg.category(),
            }));
        }

        let sized = size_argument(kind, self.state, arg);
        if let Ok(size) = &sized {
            self.state = size.state;
        }
        Some(sized)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.kinds.size_hint()
    }
}

/// Whether an argument's category can fill a slot.
///
/// `*` fields take integers, `%s` slots take narrow or wide strings, and other
/// conversions take any fixed-width value (a string passed to `%p` is stored
/// by address).
pub fn accepts(kind: ParameterKind, arg: &Argument<'_>) -> bool {
    match kind {
        ParameterKind::Invalid => false,
        ParameterKind::DynamicWidth | ParameterKind::DynamicPrecision => {
            matches!(arg, Argument::Scalar(s) if s.is_integer())
        }
        ParameterKind::NonString => true,
        ParameterKind::StringNoPrecision
        | ParameterKind::StringWithDynamicPrecision
        | ParameterKind::StringWithStaticPrecision(_) => {
            matches!(arg, Argument::Str(_) | Argument::WideStr(_))
        }
    }
}

/// Total uncompressed payload size of one log call's arguments.
///
/// # Examples
///
/// ```
/// # use binlog_format::{analyze, size_arguments, Argument};
/// let parsed = analyze("%s: %d");
/// let total = size_arguments(&parsed, &["db".into(), Argument::from(7i32)]).unwrap();
/// assert_eq!(total, (4 + 2) + 4);
/// ```
pub fn size_arguments(format: &ParsedFormat, args: &[Argument<'_>]) -> Result<usize, SizingError> {
    ArgumentSizes::new(format, args)?.try_fold(0, |total, size| Ok(total + size?.total))
}
