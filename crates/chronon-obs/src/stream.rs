//! Stream sinks: where sampled values end up.

use std::sync::{Arc, Mutex};

use chronon_core::{Time, Value};

/// The sink side of a view.
///
/// Append-only during a run; closed exactly once at the end (or at the
/// point of failure — values written before a failed run are left
/// as-is, there is no rollback). Implementations decide durability: a
/// file, an in-memory matrix, a socket. `Send` so a whole kernel
/// instance can be moved onto a worker thread.
pub trait Stream: Send + 'static {
    /// A new `(model, port)` pair is now watched.
    fn observable_added(&mut self, model: &str, port: &str, time: Time);

    /// A watched pair disappeared (its model was removed mid-run).
    fn observable_removed(&mut self, model: &str, port: &str, time: Time);

    /// One sampled value.
    fn write_value(&mut self, model: &str, port: &str, time: Time, value: Value);

    /// The run is over; flush and seal the sink.
    fn close(&mut self, time: Time);
}

/// One sampled value as kept by [`MemoryStream`].
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Full hierarchical name of the sampled model.
    pub model: String,
    /// The sampled port.
    pub port: String,
    /// When the sample was taken.
    pub time: Time,
    /// The sampled value.
    pub value: Value,
}

#[derive(Debug, Default)]
struct MemoryData {
    records: Vec<Record>,
    closed_at: Option<Time>,
}

/// An in-memory sink.
///
/// The stream itself moves into the view; the cheap [`MemoryHandle`]
/// stays with the caller for reading results during and after the run.
///
/// # Examples
///
/// ```
/// use chronon_core::{Time, Value};
/// use chronon_obs::{MemoryStream, Stream};
///
/// let (mut stream, handle) = MemoryStream::new();
/// stream.write_value("root.cnt", "count", Time::new(1.0), Value::Integer(1));
/// stream.close(Time::new(5.0));
///
/// assert_eq!(handle.values("root.cnt", "count").len(), 1);
/// assert_eq!(handle.closed_at(), Some(Time::new(5.0)));
/// ```
#[derive(Debug)]
pub struct MemoryStream {
    shared: Arc<Mutex<MemoryData>>,
}

impl MemoryStream {
    /// A fresh sink and its read handle.
    pub fn new() -> (MemoryStream, MemoryHandle) {
        let shared = Arc::new(Mutex::new(MemoryData::default()));
        (
            MemoryStream {
                shared: Arc::clone(&shared),
            },
            MemoryHandle { shared },
        )
    }
}

impl Stream for MemoryStream {
    fn observable_added(&mut self, _model: &str, _port: &str, _time: Time) {}

    fn observable_removed(&mut self, _model: &str, _port: &str, _time: Time) {}

    fn write_value(&mut self, model: &str, port: &str, time: Time, value: Value) {
        let mut data = self.shared.lock().expect("memory stream poisoned");
        data.records.push(Record {
            model: model.to_string(),
            port: port.to_string(),
            time,
            value,
        });
    }

    fn close(&mut self, time: Time) {
        let mut data = self.shared.lock().expect("memory stream poisoned");
        data.closed_at = Some(time);
    }
}

/// Read access to a [`MemoryStream`]'s contents.
#[derive(Clone, Debug)]
pub struct MemoryHandle {
    shared: Arc<Mutex<MemoryData>>,
}

impl MemoryHandle {
    /// Every record written so far, in write order.
    pub fn records(&self) -> Vec<Record> {
        self.shared
            .lock()
            .expect("memory stream poisoned")
            .records
            .clone()
    }

    /// The `(time, value)` series of one `(model, port)` pair.
    pub fn values(&self, model: &str, port: &str) -> Vec<(Time, Value)> {
        self.shared
            .lock()
            .expect("memory stream poisoned")
            .records
            .iter()
            .filter(|r| r.model == model && r.port == port)
            .map(|r| (r.time, r.value.clone()))
            .collect()
    }

    /// The most recent value of one `(model, port)` pair.
    pub fn last_value(&self, model: &str, port: &str) -> Option<Value> {
        self.values(model, port).pop().map(|(_, v)| v)
    }

    /// The close time, once [`Stream::close`] has run.
    pub fn closed_at(&self) -> Option<Time> {
        self.shared.lock().expect("memory stream poisoned").closed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_sees_writes_in_order() {
        let (mut stream, handle) = MemoryStream::new();
        stream.write_value("m", "p", Time::new(1.0), Value::Integer(1));
        stream.write_value("m", "p", Time::new(2.0), Value::Integer(2));
        stream.write_value("m", "q", Time::new(2.0), Value::Bool(true));

        let series = handle.values("m", "p");
        assert_eq!(
            series,
            vec![
                (Time::new(1.0), Value::Integer(1)),
                (Time::new(2.0), Value::Integer(2)),
            ]
        );
        assert_eq!(handle.last_value("m", "q"), Some(Value::Bool(true)));
        assert_eq!(handle.last_value("m", "absent"), None);
    }

    #[test]
    fn close_is_visible_through_the_handle() {
        let (mut stream, handle) = MemoryStream::new();
        assert_eq!(handle.closed_at(), None);
        stream.close(Time::new(3.0));
        assert_eq!(handle.closed_at(), Some(Time::new(3.0)));
    }
}
