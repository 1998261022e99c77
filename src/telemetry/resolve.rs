//! Resolution span helpers.

use tracing::Span;

/// Start a span covering one resolution of `schema` under `prefix`.
///
/// `config.extras` is declared empty and filled in by [`record_outcome`].
pub fn start_resolve_span(schema: &str, prefix: &str) -> Span {
    tracing::debug_span!(
        "config.resolve",
        "config.schema" = schema,
        "config.prefix" = prefix,
        "config.extras" = tracing::field::Empty,
    )
}

/// Record how many extra fields and depth diagnostics a resolution produced.
pub fn record_outcome(span: &Span, extras: usize, diagnostics: usize) {
    span.record("config.extras", extras);
    span.in_scope(|| {
        tracing::debug!(extras, diagnostics, "config_resolved");
    });
}
