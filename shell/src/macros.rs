//! Custom macros for reducing code repetition in vesper

/// Log an error and continue execution (non-fatal error handling)
///
/// # Example
/// ```ignore
/// log_and_continue!(ctx.render(requested), "repaint background");
/// ```
#[macro_export]
macro_rules! log_and_continue {
    ($expr:expr, $context:expr) => {
        if let Err(e) = $expr {
            log::error!("Failed to {}: {}", $context, e);
        }
    };
}

/// Validate an enum-like string value
///
/// # Example
/// ```ignore
/// validate_enum!(level, "trace", "debug", "info", "warn", "error");
/// ```
#[macro_export]
macro_rules! validate_enum {
    ($value:expr, $($variant:expr),+) => {
        match $value {
            $($variant)|+ => Ok(()),
            _ => anyhow::bail!("Invalid value: {} (expected one of: {})", $value, [$($variant),+].join(", ")),
        }
    };
}
