//! ---
//! brew_section: "03-logging"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Structured logging adapters for access events."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
/// Emit an informational log enriched with access context.
#[macro_export]
macro_rules! brew_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            actor = ctx.actor.unwrap_or(""),
            route = ctx.route.unwrap_or(""),
            module = ctx.module.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        tracing::event!(tracing::Level::INFO, message = %format_args!($($arg)+));
    }};
}

/// Emit a debug log enriched with access context.
#[macro_export]
macro_rules! brew_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            actor = ctx.actor.unwrap_or(""),
            route = ctx.route.unwrap_or(""),
            module = ctx.module.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        tracing::event!(tracing::Level::DEBUG, message = %format_args!($($arg)+));
    }};
}

/// Emit a warning log enriched with access context.
#[macro_export]
macro_rules! brew_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            actor = ctx.actor.unwrap_or(""),
            route = ctx.route.unwrap_or(""),
            module = ctx.module.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        tracing::event!(tracing::Level::WARN, message = %format_args!($($arg)+));
    }};
}
