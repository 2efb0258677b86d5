//! JSONL feed files: one `FeedFrame` (or any serializable record) per line.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use confluence_core::domain::FeedFrame;

/// Read every frame from a JSONL file. Blank lines are skipped.
pub fn read_frames(path: &Path) -> Result<Vec<FeedFrame>> {
    let file = File::open(path).with_context(|| format!("opening feed {}", path.display()))?;
    let mut frames = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {} line {}", path.display(), idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: FeedFrame = serde_json::from_str(&line)
            .with_context(|| format!("parsing {} line {}", path.display(), idx + 1))?;
        frames.push(frame);
    }
    tracing::debug!(path = %path.display(), frames = frames.len(), "feed loaded");
    Ok(frames)
}

/// Line-delimited JSON writer to a file or stdout.
pub struct JsonlWriter {
    inner: Box<dyn Write>,
    lines: usize,
}

impl JsonlWriter {
    pub fn create(path: Option<&Path>) -> Result<Self> {
        let inner: Box<dyn Write> = match path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
                let file =
                    File::create(path).with_context(|| format!("creating {}", path.display()))?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(BufWriter::new(std::io::stdout())),
        };
        Ok(Self { inner, lines: 0 })
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.inner, record)?;
        self.inner.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize> {
        self.inner.flush()?;
        Ok(self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use confluence_core::domain::MarketSnapshot;

    #[test]
    fn frames_roundtrip_through_jsonl() {
        let dir = std::env::temp_dir().join(format!("confluence-feed-{}", std::process::id()));
        let path = dir.join("feed.jsonl");
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        let frame = FeedFrame::new(MarketSnapshot::flat(ts, 4500.0), MarketSnapshot::flat(ts, 15600.0));

        let mut writer = JsonlWriter::create(Some(&path)).unwrap();
        writer.write(&frame).unwrap();
        writer.write(&frame).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let frames = read_frames(&path).unwrap();
        assert_eq!(frames, vec![frame.clone(), frame]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn bad_line_reports_position() {
        let dir = std::env::temp_dir().join(format!("confluence-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.jsonl");
        std::fs::write(&path, "\n{not json}\n").unwrap();
        let err = read_frames(&path).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
