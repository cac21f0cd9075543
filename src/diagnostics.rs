use std::sync::atomic::{AtomicBool, Ordering};

///
/// Receiver for best-effort diagnostics from a table. Queries outside the
/// sampled range are still answered (by extending the boundary cell), so
/// the only signal a caller gets is whatever the sink chooses to do with
/// the notification. Rate limiting is the sink's business.
///
pub trait DiagnosticSink: Send + Sync
{
    fn extrapolated(&self, x: f64, y: f64);
}

///
/// Warns through `tracing` on the first out-of-range query and stays
/// quiet afterwards, so a tight query loop cannot flood the log.
///
#[derive(Debug, Default)]
pub struct ExtrapolationWarning
{
    warned: AtomicBool,
}

impl ExtrapolationWarning
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn has_warned(&self) -> bool
    {
        self.warned.load(Ordering::Relaxed)
    }
}

impl DiagnosticSink for ExtrapolationWarning
{
    fn extrapolated(&self, x: f64, y: f64)
    {
        if !self.warned.swap(true, Ordering::Relaxed)
        {
            tracing::warn!(x, y, "bilinear table limits exceeded, results may be inaccurate");
        }
    }
}

#[test]
fn warning_state_latches_after_first_report()
{
    let sink = ExtrapolationWarning::new();
    assert!(!sink.has_warned());
    sink.extrapolated(11.0, 0.5);
    assert!(sink.has_warned());
    sink.extrapolated(-4.0, 0.5);
    assert!(sink.has_warned());
}
