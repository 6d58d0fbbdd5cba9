//! Route handlers.

pub mod analyze;

/// GET /healthz - Liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}
