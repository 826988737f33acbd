use std::io::Write;

use super::Event;

/// Receives every record produced by the observer.
///
/// Sinks are driven from a single thread of control at a time; implementations do not need
/// internal synchronization.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, event: Event) {
        (**self).emit(event);
    }
}

/// Writes events as log records at `info` level under the `cgroup_event` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: Event) {
        log::info!(target: "cgroup_event", "{event}");
    }
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, event: &Event) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: Event) {
        if let Err(err) = self.write_line(&event) {
            log::error!("failed to write event `{event}`: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::event::PathStatus;

    #[test]
    fn test_json_lines_sink_writes_one_line_per_event() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(Event::SubsystemRoot {
            mountpoint: PathBuf::from("/sys/fs/cgroup/memory"),
            subsystem: "memory".to_owned(),
        });
        sink.emit(Event::PathStatus {
            path: PathBuf::from("/sys/fs/cgroup/memory"),
            status: PathStatus::Initial,
        });

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"event":"subsystem_root","mountpoint":"/sys/fs/cgroup/memory","subsystem":"memory"}"#
        );
        assert_eq!(
            lines[1],
            r#"{"event":"path_status","path":"/sys/fs/cgroup/memory","status":0}"#
        );
    }

    #[test]
    fn test_boxed_sink_forwards() {
        let mut sink: Box<Vec<Event>> = Box::default();
        sink.emit(Event::EmptyFile {
            path: PathBuf::from("/a"),
            filename: "cgroup.procs".to_owned(),
        });
        assert_eq!(sink.len(), 1);
    }
}
