//! Printf format string analysis.
//!
//! This module turns a printf-style format string into the ordered list of
//! argument slots a log call must supply. The scan never formats anything and
//! never aborts on a bad specifier: each problem is recorded at its slot so the
//! caller can inspect the whole sequence and reject the statement once.

use std::ops::Index;
use std::slice;
use std::str;

use memchr::memchr;
use thiserror::Error;
use tracing::trace;

/// Describes one argument slot of a format string, in argument order.
///
/// A `DynamicWidth` or `DynamicPrecision` entry always precedes the entry for
/// the value it modifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// The specifier at this position could not be parsed or is unsupported.
    Invalid,

    /// The `*` in `%*d`; consumes one integer argument.
    DynamicWidth,

    /// The `*` in `%.*s`; consumes one integer used as the next slot's precision.
    DynamicPrecision,

    /// Any non-string conversion (`%d`, `%f`, `%p`, ...).
    NonString,

    /// `%s` without a precision.
    StringNoPrecision,

    /// `%.*s`, truncated by the preceding `DynamicPrecision` argument.
    StringWithDynamicPrecision,

    /// `%.Ns`, truncated to at most `N` characters.
    StringWithStaticPrecision(u32),
}

impl ParameterKind {
    /// Returns false only for [`ParameterKind::Invalid`].
    pub const fn is_valid(self) -> bool {
        !matches!(self, ParameterKind::Invalid)
    }

    /// Returns true for the three `%s` variants.
    pub const fn is_string(self) -> bool {
        matches!(
            self,
            ParameterKind::StringNoPrecision
                | ParameterKind::StringWithDynamicPrecision
                | ParameterKind::StringWithStaticPrecision(_)
        )
    }

    /// The precision embedded in the format text, if any.
    pub const fn static_precision(self) -> Option<u32> {
        match self {
            ParameterKind::StringWithStaticPrecision(precision) => Some(precision),
            _ => None,
        }
    }
}

/// A specifier that the analyzer could not turn into a usable slot.
///
/// Offsets are byte positions of the introducing `%`; slots are indexes into
/// [`ParsedFormat::params`] where the matching `Invalid` entry sits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("unrecognized conversion {conversion:?} in specifier at byte {offset}")]
    Invalid {
        offset: usize,
        slot: usize,
        conversion: char,
    },

    #[error("specifier at byte {offset} is missing its conversion character")]
    Unterminated { offset: usize, slot: usize },

    #[error("%n specifier at byte {offset} is not supported")]
    UnsupportedSpecifier { offset: usize, slot: usize },
}

impl AnalysisError {
    pub fn offset(&self) -> usize {
        match *self {
            AnalysisError::Invalid { offset, .. }
            | AnalysisError::Unterminated { offset, .. }
            | AnalysisError::UnsupportedSpecifier { offset, .. } => offset,
        }
    }

    pub fn slot(&self) -> usize {
        match *self {
            AnalysisError::Invalid { slot, .. }
            | AnalysisError::Unterminated { slot, .. }
            | AnalysisError::UnsupportedSpecifier { slot, .. } => slot,
        }
    }
}

/// The ordered argument slots of one format string.
///
/// The number of entries equals the number of runtime arguments the log call
/// must supply. Produced by [`analyze`] and immutable afterwards.
///
/// # Examples
///
/// ```
/// # use binlog_format::{analyze, ParameterKind};
/// let parsed = analyze("user=%s retries=%d");
/// assert_eq!(
///     parsed.params(),
///     &[ParameterKind::StringNoPrecision, ParameterKind::NonString]
/// );
/// assert!(parsed.is_valid());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFormat {
    params: Vec<ParameterKind>,
    issues: Vec<AnalysisError>,
}

impl ParsedFormat {
    pub fn params(&self) -> &[ParameterKind] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, ParameterKind> {
        self.params.iter()
    }

    /// Every bad specifier found during the scan, in scan order.
    pub fn issues(&self) -> &[AnalysisError] {
        &self.issues
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Fails with the first bad specifier.
    ///
    /// A format with any `Invalid` slot must not be logged at all: sizing a
    /// guessed slot would desynchronize every later record in the stream.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        match self.issues.first() {
            Some(issue) => Err(issue.clone()),
            None => Ok(()),
        }
    }

    fn push_specifier(&mut self, fmt: &[u8], offset: usize, spec: &Specifier) {
        if spec.dynamic_width {
            self.params.push(ParameterKind::DynamicWidth);
        }
        if spec.dynamic_precision {
            self.params.push(ParameterKind::DynamicPrecision);
        }

        let Some(kind) = spec.kind() else {
            return;
        };

        let slot = self.params.len();
        match spec.conversion {
            Conversion::Unknown => self.issues.push(AnalysisError::Invalid {
                offset,
                slot,
                conversion: char_at(fmt, spec.end - 1),
            }),
            Conversion::Unterminated => {
                self.issues.push(AnalysisError::Unterminated { offset, slot })
            }
            Conversion::Unsupported => {
                self.issues.push(AnalysisError::UnsupportedSpecifier { offset, slot })
            }
            Conversion::Percent | Conversion::Value | Conversion::Str => {}
        }
        self.params.push(kind);
    }
}

impl Index<usize> for ParsedFormat {
    type Output = ParameterKind;

    fn index(&self, index: usize) -> &ParameterKind {
        &self.params[index]
    }
}

impl<'a> IntoIterator for &'a ParsedFormat {
    type Item = &'a ParameterKind;
    type IntoIter = slice::Iter<'a, ParameterKind>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

/// Analyzes a printf-style format string.
///
/// Pure and deterministic: the same text always yields the same
/// [`ParsedFormat`]. A bad specifier becomes an `Invalid` slot and the scan
/// resumes after it. The text ends at the first NUL, as a C string would.
///
/// # Examples
///
/// ```
/// # use binlog_format::{analyze, ParameterKind};
/// let parsed = analyze("%.*s took 100%% of %5.2f ms");
/// assert_eq!(
///     parsed.params(),
///     &[
///         ParameterKind::DynamicPrecision,
///         ParameterKind::StringWithDynamicPrecision,
///         ParameterKind::NonString,
///     ]
/// );
/// ```
pub fn analyze(fmt: &str) -> ParsedFormat {
    analyze_bytes(fmt.as_bytes())
}

/// Byte-oriented [`analyze`]; non-ASCII bytes outside a specifier are literal text.
pub fn analyze_bytes(fmt: &[u8]) -> ParsedFormat {
    let len = memchr(0, fmt).unwrap_or(fmt.len());
    let fmt = &fmt[..len];

    let mut parsed = ParsedFormat::default();
    let mut pos = 0;
    while let Some(found) = memchr(b'%', &fmt[pos..]) {
        let start = pos + found;
        let spec = scan_specifier(fmt, len, start);
        parsed.push_specifier(fmt, start, &spec);
        pos = spec.end;
    }

    trace!(
        params = parsed.len(),
        issues = parsed.issues.len(),
        "analyzed format string"
    );
    parsed
}

// The character starting at `at`, for error messages; a stray byte that
// begins no valid UTF-8 sequence reads as U+FFFD.
fn char_at(fmt: &[u8], at: usize) -> char {
    let tail = &fmt[at..fmt.len().min(at + 4)];
    let text = match str::from_utf8(tail) {
        Ok(text) => text,
        Err(err) => str::from_utf8(&tail[..err.valid_up_to()]).unwrap_or_default(),
    };
    text.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// [`analyze`], failing on the first bad specifier.
pub fn try_analyze(fmt: &str) -> Result<ParsedFormat, AnalysisError> {
    let parsed = analyze(fmt);
    parsed.validate()?;
    Ok(parsed)
}

/// Number of arguments a call with this format must supply, evaluable at compile time.
pub const fn count_parameters(fmt: &str) -> usize {
    let bytes = fmt.as_bytes();
    let len = c_len(bytes);
    let mut count = 0;
    let mut pos = 0;
    while pos < len {
        if bytes[pos] != b'%' {
            pos += 1;
            continue;
        }
        let spec = scan_specifier(bytes, len, pos);
        count += spec.param_count();
        pos = spec.end;
    }
    count
}

/// Whether every specifier in `fmt` is usable, evaluable at compile time.
pub const fn is_supported(fmt: &str) -> bool {
    let bytes = fmt.as_bytes();
    let len = c_len(bytes);
    let mut pos = 0;
    while pos < len {
        if bytes[pos] != b'%' {
            pos += 1;
            continue;
        }
        let spec = scan_specifier(bytes, len, pos);
        if !spec.is_usable() {
            return false;
        }
        pos = spec.end;
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    // `%%`; consumes no argument.
    Percent,
    Value,
    Str,
    Unsupported,
    Unknown,
    Unterminated,
}

#[derive(Debug, Clone, Copy)]
struct Specifier {
    dynamic_width: bool,
    dynamic_precision: bool,
    precision: Option<u32>,
    conversion: Conversion,
    // One past the last byte of the specifier.
    end: usize,
}

impl Specifier {
    const fn kind(&self) -> Option<ParameterKind> {
        match self.conversion {
            Conversion::Percent => None,
            Conversion::Value => Some(ParameterKind::NonString),
            Conversion::Str => Some(if self.dynamic_precision {
                ParameterKind::StringWithDynamicPrecision
            } else {
                match self.precision {
                    Some(precision) => ParameterKind::StringWithStaticPrecision(precision),
                    None => ParameterKind::StringNoPrecision,
                }
            }),
            Conversion::Unsupported | Conversion::Unknown | Conversion::Unterminated => {
                Some(ParameterKind::Invalid)
            }
        }
    }

    const fn param_count(&self) -> usize {
        self.dynamic_width as usize
            + self.dynamic_precision as usize
            + self.kind().is_some() as usize
    }

    const fn is_usable(&self) -> bool {
        !matches!(
            self.conversion,
            Conversion::Unsupported | Conversion::Unknown | Conversion::Unterminated
        )
    }
}

const fn c_len(bytes: &[u8]) -> usize {
    let mut len = 0;
    while len < bytes.len() && bytes[len] != 0 {
        len += 1;
    }
    len
}

// Reads past `len` as NUL so the scan stops the way it would on a C string.
const fn byte_at(fmt: &[u8], len: usize, pos: usize) -> u8 {
    if pos < len {
        fmt[pos]
    } else {
        0
    }
}

const fn is_flag(c: u8) -> bool {
    matches!(c, b'-' | b'+' | b' ' | b'#' | b'0')
}

const fn is_length(c: u8) -> bool {
    matches!(c, b'h' | b'l' | b'j' | b'z' | b't' | b'L')
}

const fn is_terminal(c: u8) -> bool {
    matches!(
        c,
        b'd' | b'i'
            | b'u'
            | b'o'
            | b'x'
            | b'X'
            | b'f'
            | b'F'
            | b'e'
            | b'E'
            | b'g'
            | b'G'
            | b'a'
            | b'A'
            | b'c'
            | b'p'
            | b'%'
            | b's'
            | b'n'
    )
}

/// Scans `%<flags><width>.<precision><length><terminal>` starting at the `%`
/// at `start`. Only precision and terminal are kept; flags, static width and
/// length modifiers are skipped.
const fn scan_specifier(fmt: &[u8], len: usize, start: usize) -> Specifier {
    let mut pos = start + 1;

    if byte_at(fmt, len, pos) == b'%' {
        return Specifier {
            dynamic_width: false,
            dynamic_precision: false,
            precision: None,
            conversion: Conversion::Percent,
            end: pos + 1,
        };
    }

    while is_flag(byte_at(fmt, len, pos)) {
        pos += 1;
    }

    let mut dynamic_width = false;
    if byte_at(fmt, len, pos) == b'*' {
        dynamic_width = true;
        pos += 1;
    } else {
        while byte_at(fmt, len, pos).is_ascii_digit() {
            pos += 1;
        }
    }

    let mut dynamic_precision = false;
    let mut precision = None;
    if byte_at(fmt, len, pos) == b'.' {
        pos += 1;
        if byte_at(fmt, len, pos) == b'*' {
            dynamic_precision = true;
            pos += 1;
        } else {
            // A bare '.' means precision 0.
            let mut value: u32 = 0;
            while byte_at(fmt, len, pos).is_ascii_digit() {
                let digit = (byte_at(fmt, len, pos) - b'0') as u32;
                value = value.saturating_mul(10).saturating_add(digit);
                pos += 1;
            }
            precision = Some(value);
        }
    }

    while is_length(byte_at(fmt, len, pos)) {
        pos += 1;
    }

    let (conversion, end) = if pos >= len {
        (Conversion::Unterminated, len)
    } else {
        let conversion = match fmt[pos] {
            b's' => Conversion::Str,
            b'n' => Conversion::Unsupported,
            c if is_terminal(c) => Conversion::Value,
            _ => Conversion::Unknown,
        };
        (conversion, pos + 1)
    };

    Specifier {
        dynamic_width,
        dynamic_precision,
        precision,
        conversion,
        end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ParameterKind::*;

    #[test]
    fn test_scan_skips_flags_width_and_length() {
        let spec = scan_specifier(b"%-+ #012lld!", 11, 0);
        assert_eq!(spec.conversion, Conversion::Value);
        assert_eq!(spec.end, 11);
        assert!(!spec.dynamic_width);
        assert_eq!(spec.precision, None);
    }

    #[test]
    fn test_scan_reads_precision_digits() {
        let spec = scan_specifier(b"%8.123s", 7, 0);
        assert_eq!(spec.conversion, Conversion::Str);
        assert_eq!(spec.precision, Some(123));
        assert_eq!(spec.kind(), Some(StringWithStaticPrecision(123)));
    }

    #[test]
    fn test_scan_saturates_huge_precision() {
        let fmt = b"%.99999999999999s";
        let spec = scan_specifier(fmt, fmt.len(), 0);
        assert_eq!(spec.precision, Some(u32::MAX));
    }

    #[test]
    fn test_scan_stops_at_length_bound() {
        let spec = scan_specifier(b"%5dxyz", 2, 0);
        assert_eq!(spec.conversion, Conversion::Unterminated);
        assert_eq!(spec.end, 2);
    }

    #[test]
    fn test_scan_percent_after_width_is_a_value() {
        let spec = scan_specifier(b"%5%", 3, 0);
        assert_eq!(spec.conversion, Conversion::Value);
        assert_eq!(spec.kind(), Some(NonString));
        assert_eq!(spec.end, 3);
    }

    #[test]
    fn test_char_at_decodes_utf8() {
        assert_eq!(char_at("%é".as_bytes(), 1), 'é');
        assert_eq!(char_at("%🌍".as_bytes(), 1), '🌍');
        assert_eq!(char_at(b"%y", 1), 'y');
        assert_eq!(char_at(b"%\xff", 1), char::REPLACEMENT_CHARACTER);
        assert_eq!(char_at(b"%\xc3", 1), char::REPLACEMENT_CHARACTER);
    }

    #[test]
    fn test_const_helpers() {
        const COUNT: usize = count_parameters("%*.*s and %d%%");
        const SUPPORTED: bool = is_supported("%*.*s and %d%%");
        assert_eq!(COUNT, 4);
        assert!(SUPPORTED);
        assert!(!is_supported("%n"));
        assert!(!is_supported("trailing %"));
        assert!(!is_supported("%y"));
    }

    #[test]
    fn test_const_helpers_agree_with_analyze() {
        for fmt in ["", "%d", "%%", "%*d %.*s %n %q %", "%.s%ls%5%", "a\0%d"] {
            assert_eq!(count_parameters(fmt), analyze(fmt).len(), "{fmt:?}");
            assert_eq!(is_supported(fmt), analyze(fmt).is_valid(), "{fmt:?}");
        }
    }

    #[test]
    fn test_error_accessors() {
        let parsed = analyze("ok %d then %n");
        let issue = &parsed.issues()[0];
        assert_eq!(issue.offset(), 11);
        assert_eq!(issue.slot(), 1);
        assert_eq!(issue.to_string(), "%n specifier at byte 11 is not supported");
    }
}
