use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Streams one JSON object per frame (JSON Lines) to a file or stdout.
pub struct FrameWriter {
    out: BufWriter<Box<dyn Write>>,
    frames: usize,
}

impl FrameWriter {
    /// `-` writes to stdout.
    pub fn new(output_path: &Path) -> Result<Self> {
        let sink: Box<dyn Write> = if output_path == Path::new("-") {
            Box::new(std::io::stdout().lock())
        } else {
            let file = File::create(output_path)
                .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
            Box::new(file)
        };
        log::info!("Writing frames to {}", output_path.display());
        Ok(Self::from_writer(sink))
    }

    pub fn from_writer(sink: Box<dyn Write>) -> Self {
        Self {
            out: BufWriter::new(sink),
            frames: 0,
        }
    }

    pub fn write_frame<T: Serialize>(&mut self, frame: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, frame).context("Failed to serialize frame")?;
        self.out.write_all(b"\n").context("Failed to write frame")?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> usize {
        self.frames
    }

    pub fn finish(mut self) -> Result<()> {
        self.out.flush().context("Failed to flush output")?;
        log::info!("Wrote {} frames", self.frames);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Shared sink so the test can inspect what was written.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Serialize)]
    struct Row {
        frame: usize,
        level: f32,
    }

    #[test]
    fn one_line_per_frame() {
        let capture = Capture::default();
        let mut writer = FrameWriter::from_writer(Box::new(capture.clone()));
        writer.write_frame(&Row { frame: 0, level: 0.5 }).unwrap();
        writer.write_frame(&Row { frame: 1, level: 1.0 }).unwrap();
        assert_eq!(writer.frames_written(), 2);
        writer.finish().unwrap();

        let text = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![r#"{"frame":0,"level":0.5}"#, r#"{"frame":1,"level":1.0}"#]);
    }
}
