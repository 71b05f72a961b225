//! Runtime argument values handed to the sizer and the store.
//!
//! Arguments fall into a closed set of categories: fixed-width scalars,
//! opaque pointers, narrow strings and wide strings. Each category has its
//! own sizing rule, so dispatch is a `match` rather than overload resolution.

use std::ffi::CStr;
use std::mem::size_of;

/// Storage unit of a wide string, matching the platform's `wchar_t`.
#[cfg(windows)]
pub type WideChar = u16;

/// Storage unit of a wide string, matching the platform's `wchar_t`.
#[cfg(not(windows))]
pub type WideChar = u32;

/// Bytes occupied by one [`WideChar`].
pub const WIDE_CHAR_SIZE: usize = size_of::<WideChar>();

/// Bytes occupied by a stored pointer.
pub const POINTER_SIZE: usize = size_of::<usize>();

/// A fixed-width numeric value, stored at its native width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
}

impl Scalar {
    /// Natural storage width in bytes.
    pub const fn width(&self) -> usize {
        match self {
            Scalar::I8(_) => size_of::<i8>(),
            Scalar::I16(_) => size_of::<i16>(),
            Scalar::I32(_) => size_of::<i32>(),
            Scalar::I64(_) => size_of::<i64>(),
            Scalar::Isize(_) => size_of::<isize>(),
            Scalar::U8(_) => size_of::<u8>(),
            Scalar::U16(_) => size_of::<u16>(),
            Scalar::U32(_) => size_of::<u32>(),
            Scalar::U64(_) => size_of::<u64>(),
            Scalar::Usize(_) => size_of::<usize>(),
            Scalar::F32(_) => size_of::<f32>(),
            Scalar::F64(_) => size_of::<f64>(),
        }
    }

    pub const fn is_integer(&self) -> bool {
        !matches!(self, Scalar::F32(_) | Scalar::F64(_))
    }

    /// Interprets the value as a `*` precision.
    ///
    /// printf treats a negative precision as if none was given, so negative
    /// and non-finite values yield `None` (no truncation).
    pub fn as_precision(&self) -> Option<u64> {
        match *self {
            Scalar::I8(v) => u64::try_from(v).ok(),
            Scalar::I16(v) => u64::try_from(v).ok(),
            Scalar::I32(v) => u64::try_from(v).ok(),
            Scalar::I64(v) => u64::try_from(v).ok(),
            Scalar::Isize(v) => u64::try_from(v).ok(),
            Scalar::U8(v) => Some(u64::from(v)),
            Scalar::U16(v) => Some(u64::from(v)),
            Scalar::U32(v) => Some(u64::from(v)),
            Scalar::U64(v) => Some(v),
            Scalar::Usize(v) => u64::try_from(v).ok(),
            Scalar::F32(v) => float_precision(f64::from(v)),
            Scalar::F64(v) => float_precision(v),
        }
    }

    /// Writes the value in native byte order; `out` must be exactly [`Scalar::width`] bytes.
    pub(crate) fn write_ne(&self, out: &mut [u8]) {
        match *self {
            Scalar::I8(v) => out.copy_from_slice(&v.to_ne_bytes()),
            Scalar::I16(v) => out.copy_from_slice(&v.to_ne_bytes()),
            Scalar::I32(v) => out.copy_from_slice(&v.to_ne_bytes()),
            Scalar::I64(v) => out.copy_from_slice(&v.to_ne_bytes()),
            Scalar::Isize(v) => out.copy_from_slice(&v.to_ne_bytes()),
            Scalar::U8(v) => out.copy_from_slice(&v.to_ne_bytes()),
            Scalar::U16(v) => out.copy_from_slice(&v.to_ne_bytes()),
            Scalar::U32(v) => out.copy_from_slice(&v.to_ne_bytes()),
            Scalar::U64(v) => out.copy_from_slice(&v.to_ne_bytes()),
            Scalar::Usize(v) => out.copy_from_slice(&v.to_ne_bytes()),
            Scalar::F32(v) => out.copy_from_slice(&v.to_ne_bytes()),
            Scalar::F64(v) => out.copy_from_slice(&v.to_ne_bytes()),
        }
    }
}

fn float_precision(v: f64) -> Option<u64> {
    if v.is_finite() && v >= 0.0 {
        // Saturating cast, fraction dropped.
        Some(v as u64)
    } else {
        None
    }
}

/// One runtime argument of a log call.
///
/// String variants borrow C-style data: the content ends at the first
/// terminator unit (NUL) or at the end of the slice, whichever comes first.
///
/// # Examples
///
/// ```
/// # use binlog_format::{Argument, Scalar};
/// let args: [Argument; 3] = [42i32.into(), "disk full".into(), 0.5f64.into()];
/// assert_eq!(args[0], Argument::Scalar(Scalar::I32(42)));
/// assert!(matches!(args[1], Argument::Str(b"disk full")));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Argument<'a> {
    Scalar(Scalar),

    /// An opaque pointer, recorded by address.
    Pointer(usize),

    /// A narrow (byte) string.
    Str(&'a [u8]),

    /// A wide string in [`WideChar`] units.
    WideStr(&'a [WideChar]),
}

impl Argument<'_> {
    /// Short category name used in diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            Argument::Scalar(s) if s.is_integer() => "integer",
            Argument::Scalar(_) => "float",
            Argument::Pointer(_) => "pointer",
            Argument::Str(_) => "string",
            Argument::WideStr(_) => "wide string",
        }
    }

    /// Address recorded when a string is passed to a non-string slot such as `%p`.
    pub(crate) fn address(&self) -> usize {
        match *self {
            Argument::Pointer(addr) => addr,
            Argument::Str(bytes) => bytes.as_ptr() as usize,
            Argument::WideStr(units) => units.as_ptr() as usize,
            Argument::Scalar(_) => 0,
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(v: $ty) -> Self {
                    Scalar::$variant(v)
                }
            }

            impl From<$ty> for Argument<'_> {
                fn from(v: $ty) -> Self {
                    Argument::Scalar(Scalar::$variant(v))
                }
            }
        )*
    };
}

scalar_from! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
}

impl<'a> From<&'a str> for Argument<'a> {
    fn from(s: &'a str) -> Self {
        Argument::Str(s.as_bytes())
    }
}

impl<'a> From<&'a String> for Argument<'a> {
    fn from(s: &'a String) -> Self {
        Argument::Str(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Argument<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Argument::Str(bytes)
    }
}

impl<'a> From<&'a CStr> for Argument<'a> {
    fn from(s: &'a CStr) -> Self {
        Argument::Str(s.to_bytes())
    }
}

impl<'a> From<&'a [WideChar]> for Argument<'a> {
    fn from(units: &'a [WideChar]) -> Self {
        Argument::WideStr(units)
    }
}

impl<T> From<*const T> for Argument<'_> {
    fn from(ptr: *const T) -> Self {
        Argument::Pointer(ptr as usize)
    }
}

impl<T> From<*mut T> for Argument<'_> {
    fn from(ptr: *mut T) -> Self {
        Argument::Pointer(ptr as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_widths() {
        assert_eq!(Scalar::I8(1).width(), 1);
        assert_eq!(Scalar::U16(1).width(), 2);
        assert_eq!(Scalar::I32(1).width(), 4);
        assert_eq!(Scalar::F32(1.0).width(), 4);
        assert_eq!(Scalar::U64(1).width(), 8);
        assert_eq!(Scalar::F64(1.0).width(), 8);
        assert_eq!(Scalar::Usize(1).width(), POINTER_SIZE);
    }

    #[test]
    fn test_negative_precision_means_unlimited() {
        assert_eq!(Scalar::I32(-1).as_precision(), None);
        assert_eq!(Scalar::I32(7).as_precision(), Some(7));
        assert_eq!(Scalar::F64(f64::NAN).as_precision(), None);
        assert_eq!(Scalar::F64(3.9).as_precision(), Some(3));
    }

    #[test]
    fn test_write_native_bytes() {
        let mut buf = [0u8; 4];
        Scalar::I32(-2).write_ne(&mut buf);
        assert_eq!(buf, (-2i32).to_ne_bytes());
    }

    #[test]
    fn test_conversions() {
        let s = String::from("abc");
        assert_eq!(Argument::from(&s), Argument::Str(b"abc"));
        let c = CStr::from_bytes_with_nul(b"hi\0").unwrap();
        assert_eq!(Argument::from(c), Argument::Str(b"hi"));
        let value = 5u8;
        let ptr: *const u8 = &value;
        assert_eq!(Argument::from(ptr), Argument::Pointer(ptr as usize));
        assert_eq!(Argument::from(1.5f32).category(), "float");
    }
}
