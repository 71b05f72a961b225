use binlog_format::{
    analyze, analyze_bytes, count_parameters, try_analyze, AnalysisError, ParameterKind,
};
use ParameterKind::*;

#[test]
fn test_plain_text_has_no_params() {
    assert!(analyze("").is_empty());
    assert!(analyze("no specifiers here").is_empty());
    assert!(analyze("unicode: 世界 🌍").is_empty());
}

#[test]
fn test_escaped_percent() {
    assert!(analyze("%%").is_empty());
    assert!(analyze("100%% done, %%%%").is_empty());
    assert_eq!(analyze("%%%d").params(), &[NonString]);
}

#[test]
fn test_percent_terminal_after_flags_takes_an_argument() {
    assert_eq!(analyze("%5%").params(), &[NonString]);
    assert_eq!(analyze("%-%").params(), &[NonString]);
    assert_eq!(analyze("%*%").params(), &[DynamicWidth, NonString]);
    assert_eq!(count_parameters("%5%"), 1);
    assert_eq!(count_parameters("%-%"), 1);
}

#[test]
fn test_non_string_conversions() {
    for fmt in [
        "%d", "%i", "%u", "%o", "%x", "%X", "%f", "%F", "%e", "%E", "%g", "%G", "%a", "%A", "%c",
        "%p",
    ] {
        assert_eq!(analyze(fmt).params(), &[NonString], "{fmt}");
    }
}

#[test]
fn test_flags_width_and_length_are_skipped() {
    let parsed = analyze("%-5d %+d % d %#x %08.3f %lld %hhu %zu %jd %td %Lf %lu");
    assert_eq!(parsed.len(), 12);
    assert!(parsed.iter().all(|&kind| kind == NonString));
    assert!(parsed.is_valid());
}

#[test]
fn test_string_precision_variants() {
    assert_eq!(analyze("%s").params(), &[StringNoPrecision]);
    assert_eq!(analyze("%-20s").params(), &[StringNoPrecision]);
    assert_eq!(analyze("%.5s").params(), &[StringWithStaticPrecision(5)]);
    assert_eq!(analyze("%10.32s").params(), &[StringWithStaticPrecision(32)]);
    assert_eq!(analyze("%ls").params(), &[StringNoPrecision]);
    assert_eq!(
        analyze("%.*s").params(),
        &[DynamicPrecision, StringWithDynamicPrecision]
    );
}

#[test]
fn test_bare_dot_means_zero_precision() {
    assert_eq!(analyze("%.s").params(), &[StringWithStaticPrecision(0)]);
}

#[test]
fn test_dynamic_fields_precede_their_value() {
    assert_eq!(analyze("%*d").params(), &[DynamicWidth, NonString]);
    assert_eq!(
        analyze("%*.*s").params(),
        &[DynamicWidth, DynamicPrecision, StringWithDynamicPrecision]
    );
    assert_eq!(
        analyze("%-*.*f").params(),
        &[DynamicWidth, DynamicPrecision, NonString]
    );
}

#[test]
fn test_percent_n_is_invalid() {
    assert_eq!(analyze("%n").params(), &[Invalid]);
    assert_eq!(analyze("%-10ln").params(), &[Invalid]);
    assert_eq!(analyze("%*n").params(), &[DynamicWidth, Invalid]);
    assert_eq!(
        try_analyze("wrote %n"),
        Err(AnalysisError::UnsupportedSpecifier { offset: 6, slot: 0 })
    );
}

#[test]
fn test_unknown_conversion_is_invalid_and_scan_continues() {
    let parsed = analyze("%y then %d and %s");
    assert_eq!(parsed.params(), &[Invalid, NonString, StringNoPrecision]);
    assert_eq!(
        parsed.issues(),
        &[AnalysisError::Invalid {
            offset: 0,
            slot: 0,
            conversion: 'y'
        }]
    );
}

#[test]
fn test_unterminated_specifier() {
    let parsed = analyze("load at 90%");
    assert_eq!(parsed.params(), &[Invalid]);
    assert_eq!(
        parsed.validate(),
        Err(AnalysisError::Unterminated { offset: 10, slot: 0 })
    );

    assert_eq!(analyze("%5.2l").params(), &[Invalid]);
    assert_eq!(analyze("%.*").params(), &[DynamicPrecision, Invalid]);
}

#[test]
fn test_multiple_issues_are_all_reported() {
    let parsed = analyze("%q %d %n %");
    assert_eq!(parsed.params(), &[Invalid, NonString, Invalid, Invalid]);
    let slots: Vec<_> = parsed.issues().iter().map(|issue| issue.slot()).collect();
    assert_eq!(slots, vec![0, 2, 3]);
    assert!(!parsed.is_valid());
}

#[test]
fn test_bytes_stop_at_nul() {
    assert_eq!(analyze_bytes(b"%d\0%s").params(), &[NonString]);
    assert_eq!(analyze_bytes(b"%\0d").params(), &[Invalid]);
}

#[test]
fn test_non_ascii_after_percent() {
    let parsed = analyze("%é %d");
    assert_eq!(parsed.params(), &[Invalid, NonString]);
    assert_eq!(
        parsed.issues(),
        &[AnalysisError::Invalid {
            offset: 0,
            slot: 0,
            conversion: 'é'
        }]
    );
    assert_eq!(
        parsed.issues()[0].to_string(),
        "unrecognized conversion 'é' in specifier at byte 0"
    );
}

#[test]
fn test_analyze_is_idempotent() {
    let fmt = "%*d|%.*s|%.3s|%p|%n|%%";
    assert_eq!(analyze(fmt), analyze(fmt));
}

#[test]
fn test_mixed_statement() {
    let parsed = analyze("[%s] %s:%d %.*s (%5.1f%% of %lu bytes) @%p");
    assert_eq!(
        parsed.params(),
        &[
            StringNoPrecision,
            StringNoPrecision,
            NonString,
            DynamicPrecision,
            StringWithDynamicPrecision,
            NonString,
            NonString,
            NonString,
        ]
    );
    assert!(try_analyze("[%s] %s:%d").is_ok());
}
