//! Human-readable error descriptions and structured JSON error formatting.

use station_core::{BuildError, CleanError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvertedWindow => {
                "What happened: The date window starts after it ends.\nLikely causes: --start and --end (or [window] start/end) swapped.\nHow to fix: Pass a start that is earlier than or equal to the end.".to_string()
            }
            BuildError::InvalidWindowBound(raw) => format!(
                "What happened: Could not read the window bound '{raw}'.\nLikely causes: Not an ISO-8601 date or date-time.\nHow to fix: Use e.g. 2024-03-01, 2024-03-01T12:00 or 2024-03-01T12:00:00Z."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `station check-config`."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CleanError>() {
        return match ce {
            CleanError::Source(msg) => format!(
                "What happened: The readings could not be fetched ({msg}).\nLikely causes: Missing or unreadable input file, or malformed JSON/CSV.\nHow to fix: Check the --input/--csv path and its contents."
            ),
            CleanError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: A typo or out-of-range value in the TOML.\nHow to fix: Edit the config file, then rerun `station check-config`."
            ),
            CleanError::UnknownCategory(name) => format!(
                "What happened: Unknown category '{name}'.\nHow to fix: Use one of {}.",
                station_config::CATEGORY_NAMES.join(", ")
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("series csv must have headers") {
        return "Invalid headers in series CSV. Expected 'timestamp,value'.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 for configuration problems, 4 when the input could
/// not be fetched, 1 for anything else. Usage errors exit with clap's 2.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<CleanError>() {
        Some(CleanError::Config(_)) => 3,
        Some(CleanError::Source(_)) => 4,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvertedWindow => "InvertedWindow",
            BuildError::InvalidWindowBound(_) => "InvalidWindowBound",
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
    }
    match err.downcast_ref::<CleanError>() {
        Some(CleanError::Config(_)) => "InvalidConfig",
        Some(CleanError::Source(_)) => "SourceUnavailable",
        Some(CleanError::UnknownCategory(_)) => "UnknownCategory",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
