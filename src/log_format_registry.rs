/// Format string information
#[derive(Debug)]
pub struct FormatInfo {
    pub format_string: &'static str,
    pub param_count: usize,
}

// Helpers for compile-time format string checks
#[doc(hidden)]
pub use crate::format_analyzer::{count_parameters, is_supported};

/// Checks a printf format literal at compile time.
///
/// Compilation fails when the literal contains an unrecognized, unterminated
/// or `%n` specifier. The argument count is computed at compile time as well.
///
/// ```
/// # use binlog_format::printf_format;
/// const INFO: binlog_format::FormatInfo = printf_format!("%*d items in %.*s");
/// assert_eq!(INFO.param_count, 4);
/// ```
///
/// ```compile_fail
/// # use binlog_format::printf_format;
/// let _ = printf_format!("stored %n bytes");
/// ```
#[macro_export]
macro_rules! printf_format {
    ($fmt:expr) => {{
        const _: () = assert!(
            $crate::log_format_registry::is_supported($fmt),
            "unsupported printf specifier in format string"
        );
        const PARAM_COUNT: usize = $crate::log_format_registry::count_parameters($fmt);

        $crate::log_format_registry::FormatInfo {
            format_string: $fmt,
            param_count: PARAM_COUNT,
        }
    }};
}

/// Computes the uncompressed payload size of one log statement.
///
/// This macro plays the role of a logging call site:
/// 1. Checks the format literal at compile time
/// 2. Registers it in the global format cache on first use
/// 3. Sizes every argument against its slot
///
/// Evaluates to `Result<usize, RecordError>`.
///
/// # Examples
///
/// ```
/// # use binlog_format::record_size;
/// let user = "alice";
/// let size = record_size!("user %.3s logged in %d times", user, 12i32).unwrap();
/// assert_eq!(size, (4 + 3) + 4);
///
/// // Wrong number of arguments is caught at the call
/// assert!(record_size!("%d %d", 1i32).is_err());
/// ```
#[macro_export]
macro_rules! record_size {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        let _ = $crate::printf_format!($fmt);
        (|| -> ::std::result::Result<usize, $crate::log_format_registry::RecordError> {
            let handle = $crate::format_cache::register_format($fmt)?;
            let args: &[$crate::Argument<'_>] = &[$($crate::Argument::from($arg)),*];
            Ok($crate::arg_sizer::size_arguments(&handle.params, args)?)
        })()
    }};
}

/// Failure of a [`record_size!`] statement.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Registry(#[from] crate::format_cache::RegistryError),

    #[error(transparent)]
    Sizing(#[from] crate::arg_sizer::SizingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_time_format() {
        const INFO: FormatInfo = printf_format!("Test: %d value=%s");
        assert_eq!(INFO.format_string, "Test: %d value=%s");
        assert_eq!(INFO.param_count, 2);
    }

    #[test]
    fn test_format_validation() {
        assert!(is_supported("Test: %d value=%s"));
        assert!(!is_supported("Test: %d value=%")); // Unterminated
        assert!(!is_supported("Test: %k value=%d")); // Unknown conversion
        assert!(is_supported("Test: 100%% escaped"));
    }

    #[test]
    fn test_record_size() {
        let size = record_size!("%s=%.*s", "key", 2i32, "value").unwrap();
        assert_eq!(size, (4 + 3) + 4 + (4 + 2));
    }

    #[test]
    fn test_record_size_type_mismatch() {
        let err = record_size!("%s", 5i32).unwrap_err();
        assert!(matches!(
            err,
            RecordError::Sizing(crate::arg_sizer::SizingError::TypeMismatch { index: 0, .. })
        ));
    }
}
