use super::types::SessionEntry;

/// Receiver of finalized sessions.
///
/// The engine hands every completed or abandoned entry to its sink exactly
/// once. Sinks own their failure handling: a sink that cannot persist logs
/// the problem and keeps going, so finishing a ritual never fails on storage.
pub trait SessionSink {
    fn record(&mut self, entry: &SessionEntry);
}

impl<S: SessionSink + ?Sized> SessionSink for Box<S> {
    fn record(&mut self, entry: &SessionEntry) {
        (**self).record(entry);
    }
}

/// Fan a finalized entry out to two sinks, in order.
impl<A: SessionSink, B: SessionSink> SessionSink for (A, B) {
    fn record(&mut self, entry: &SessionEntry) {
        self.0.record(entry);
        self.1.record(entry);
    }
}

/// Collects entries in memory; handy as a test double.
impl SessionSink for Vec<SessionEntry> {
    fn record(&mut self, entry: &SessionEntry) {
        self.push(entry.clone());
    }
}
