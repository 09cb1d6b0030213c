//! Replay flow channel
//!
//! Reads flow results recorded as JSON lines and releases them as the
//! loop polls. Each line carries the poll (render tick) at which it
//! becomes available:
//!
//! ```json
//! {"release_tick": 3, "result": {"frame_id": 1, "descriptor": {"kind": "affine", "data": [1,0,0,1,4,0]}, "valid": true}}
//! ```

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use contracts::{FlowResult, FlowResultChannel, VisError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One recorded line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// Poll number (1-based) from which the result is available
    pub release_tick: u64,
    /// Recorded result
    pub result: FlowResult,
}

/// Flow result channel replaying a recording
#[derive(Debug)]
pub struct ReplayFlowChannel {
    path: PathBuf,
    records: VecDeque<ReplayRecord>,
    polls: u64,
}

impl ReplayFlowChannel {
    /// Load a recording.
    ///
    /// Records are released in `release_tick` order; lines sharing a tick
    /// keep their file order. Blank lines are ignored.
    pub fn load(path: &Path) -> Result<Self, VisError> {
        let file = File::open(path).map_err(|e| {
            VisError::analysis_unavailable(format!("cannot open {}: {e}", path.display()))
        })?;

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ReplayRecord = serde_json::from_str(&line).map_err(|e| {
                VisError::analysis_unavailable(format!(
                    "{}:{}: invalid record: {e}",
                    path.display(),
                    index + 1
                ))
            })?;
            records.push(record);
        }

        records.sort_by_key(|r| r.release_tick);

        info!(path = %path.display(), records = records.len(), "loaded flow recording");

        Ok(Self {
            path: path.to_path_buf(),
            records: records.into(),
            polls: 0,
        })
    }

    /// Records not yet released
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl FlowResultChannel for ReplayFlowChannel {
    fn poll_results(&mut self) -> Result<Vec<FlowResult>, VisError> {
        self.polls += 1;

        let mut released = Vec::new();
        while self
            .records
            .front()
            .is_some_and(|r| r.release_tick <= self.polls)
        {
            if let Some(record) = self.records.pop_front() {
                released.push(record.result);
            }
        }

        if !released.is_empty() {
            debug!(
                path = %self.path.display(),
                poll = self.polls,
                released = released.len(),
                "replayed flow results"
            );
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_recording(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn test_releases_by_tick() {
        let file = write_recording(&[
            r#"{"release_tick": 2, "result": {"frame_id": 1, "descriptor": {"kind": "affine", "data": [1,0,0,1,4,0]}, "valid": true}}"#,
            "",
            r#"{"release_tick": 1, "result": {"frame_id": 2, "descriptor": {"kind": "raw", "data": []}, "valid": false, "confidence": 0.0}}"#,
            r#"{"release_tick": 2, "result": {"frame_id": 3, "descriptor": {"kind": "homography", "data": [1,0,0,0,1,0,0,0,1]}, "valid": true}}"#,
        ]);

        let mut channel = ReplayFlowChannel::load(file.path()).unwrap();
        assert_eq!(channel.remaining(), 3);

        let first = channel.poll_results().unwrap();
        assert_eq!(first.len(), 1);
        assert!(!first[0].valid);

        let second: Vec<u64> = channel
            .poll_results()
            .unwrap()
            .iter()
            .map(|r| r.frame_id.get())
            .collect();
        assert_eq!(second, vec![1, 3]);
        assert!(channel.poll_results().unwrap().is_empty());
    }

    #[test]
    fn test_default_confidence() {
        let file = write_recording(&[
            r#"{"release_tick": 1, "result": {"frame_id": 9, "descriptor": {"kind": "affine", "data": [1,0,0,1,0,0]}, "valid": true}}"#,
        ]);
        let mut channel = ReplayFlowChannel::load(file.path()).unwrap();
        assert_eq!(channel.poll_results().unwrap()[0].confidence, 1.0);
    }

    #[test]
    fn test_malformed_line_names_position() {
        let file = write_recording(&[r#"{"release_tick": 1}"#]);
        let err = ReplayFlowChannel::load(file.path()).unwrap_err();
        assert!(matches!(err, VisError::AnalysisUnavailable { .. }));
        assert!(err.to_string().contains(":1:"));
    }

    #[test]
    fn test_missing_file() {
        let err = ReplayFlowChannel::load(Path::new("/nonexistent/flow.jsonl")).unwrap_err();
        assert_eq!(err.collaborator(), "transform flow analysis");
    }
}
