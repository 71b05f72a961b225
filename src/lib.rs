//! # Binlog Format
//!
//! The front end of a binary logging pipeline: it works out, without ever
//! formatting text, what a printf-style log statement's arguments look like
//! and how many bytes they take in an uncompressed binary record.
//!
//! * **Format analysis**: one scan of the format string yields the ordered
//!   argument slots, including dynamic `*` width and precision fields
//! * **Exact sizing**: each runtime argument is sized to the byte, with
//!   `%.Ns` and `%.*s` string truncation applied
//! * **Fail closed**: unrecognized specifiers and `%n` are reported, and a
//!   statement containing one is refused rather than sized by guesswork
//!
//! ## Main Components
//!
//! * `format_analyzer`: printf specifier scanner producing [`ParsedFormat`]
//! * `arg_sizer`: per-argument byte sizes and the per-call [`SizingState`]
//! * `arg_store`: writes arguments in the layout the sizes describe
//! * `format_cache`: process-wide, read-mostly cache of analyzed formats
//! * `log_format_registry`: compile-time checks and the `record_size!` macro
//!
//! ## Quick Start
//!
//! ```
//! use binlog_format::{analyze, size_arguments, store_arguments, Argument, ParameterKind};
//!
//! let parsed = analyze("%-8s| %.*s | %5.1f%%");
//! assert_eq!(
//!     parsed.params(),
//!     &[
//!         ParameterKind::StringNoPrecision,
//!         ParameterKind::DynamicPrecision,
//!         ParameterKind::StringWithDynamicPrecision,
//!         ParameterKind::NonString,
//!     ]
//! );
//!
//! let args = [
//!     Argument::from("worker"),
//!     Argument::from(4i32),
//!     Argument::from("overloaded"),
//!     Argument::from(93.5f64),
//! ];
//! let size = size_arguments(&parsed, &args).unwrap();
//! assert_eq!(size, (4 + 6) + 4 + (4 + 4) + 8);
//!
//! let mut record = vec![0u8; size];
//! assert_eq!(store_arguments(&parsed, &args, &mut record).unwrap(), size);
//! ```

pub mod arg_sizer;
pub mod arg_store;
pub mod argument;
pub mod format_analyzer;
pub mod format_cache;
pub mod log_format_registry;

pub use arg_sizer::{
    accepts, size_argument, size_arguments, ArgumentSize, ArgumentSizes, SizingError,
    SizingState, LENGTH_PREFIX_SIZE,
};
pub use arg_store::{store_argument, store_arguments};
pub use argument::{Argument, Scalar, WideChar, POINTER_SIZE, WIDE_CHAR_SIZE};
pub use format_analyzer::{
    analyze, analyze_bytes, count_parameters, is_supported, try_analyze, AnalysisError,
    ParameterKind, ParsedFormat,
};
pub use format_cache::{lookup_format, register_format, FormatCache, FormatHandle, FormatId};
pub use log_format_registry::{FormatInfo, RecordError};
