//! Console listener printing one line per change event

use clap::ValueEnum;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use watcher::{ChangeEvent, ChangeKind, Listener};

/// How events are written to the console
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `File <path> was <kind>`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Render a single event as a line (without the trailing newline)
pub fn render(format: OutputFormat, kind: ChangeKind, path: &Path) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(format!("File {} was {}", path.display(), kind)),
        OutputFormat::Json => Ok(serde_json::to_string(&ChangeEvent::new(kind, path))?),
    }
}

/// Listener writing every event to stdout (or any writer)
pub struct ConsoleListener {
    format: OutputFormat,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleListener {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::with_writer(format, std::io::stdout())
    }

    pub fn with_writer(format: OutputFormat, writer: impl Write + Send + 'static) -> Self {
        Self {
            format,
            out: Mutex::new(Box::new(writer)),
        }
    }
}

impl Listener for ConsoleListener {
    fn notify(&self, kind: ChangeKind, path: &Path) -> anyhow::Result<()> {
        let line = render(self.format, kind, path)?;
        let mut out = self.out.lock();
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Writer appending into a shared buffer
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    #[test]
    fn test_text_format() {
        let line = render(OutputFormat::Text, ChangeKind::Created, Path::new("/w/a.txt")).unwrap();
        assert_eq!(line, "File /w/a.txt was Created");
    }

    #[test]
    fn test_json_format() {
        let line = render(OutputFormat::Json, ChangeKind::Deleted, Path::new("/w/a.txt")).unwrap();
        let event: ChangeEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(event, ChangeEvent::new(ChangeKind::Deleted, "/w/a.txt"));
    }

    #[test]
    fn test_listener_writes_lines() {
        let buf = SharedBuf::default();
        let listener = ConsoleListener::with_writer(OutputFormat::Text, buf.clone());

        listener.notify(ChangeKind::Created, Path::new("/w/a.txt")).unwrap();
        listener.notify(ChangeKind::Changed, Path::new("/w/a.txt")).unwrap();

        assert_eq!(
            buf.contents(),
            "File /w/a.txt was Created\nFile /w/a.txt was Changed\n"
        );
    }

    #[test]
    fn test_concurrent_writers_keep_whole_lines() {
        let buf = SharedBuf::default();
        let listener = Arc::new(ConsoleListener::with_writer(OutputFormat::Text, buf.clone()));

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let listener = listener.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let path = format!("/w/{worker}-{i}.txt");
                        listener.notify(ChangeKind::Changed, Path::new(&path)).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let contents = buf.contents();
        assert_eq!(contents.lines().count(), 200);
        assert!(contents
            .lines()
            .all(|line| line.starts_with("File /w/") && line.ends_with(".txt was Changed")));
    }
}
