//! Local transcoding through ffmpeg.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use seg_protocol::VideoProfile;
use tracing::debug;

use crate::orchestrator::{Segment, TranscodeError};

/// Produces one output per profile for a segment.
pub trait SegmentTranscoder: Send + Sync {
    fn transcode(
        &self,
        segment: &Segment,
        profiles: &[VideoProfile],
    ) -> Result<Vec<Vec<u8>>, TranscodeError>;
}

/// Runs the ffmpeg binary once per profile, segment on stdin, MPEG-TS on stdout.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Command-line arguments for one profile.
    pub fn args(profile: &VideoProfile) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-s".to_string(),
            profile.resolution(),
            "-b:v".to_string(),
            format!("{}k", profile.bitrate_kbps),
            "-r".to_string(),
            profile.fps.to_string(),
            "-c:a".to_string(),
            "copy".to_string(),
            "-f".to_string(),
            "mpegts".to_string(),
            "pipe:1".to_string(),
        ]
    }

    fn run(&self, data: &[u8], profile: &VideoProfile) -> Result<Vec<u8>, TranscodeError> {
        let mut child = Command::new(&self.binary)
            .args(Self::args(profile))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TranscodeError::Unavailable(format!("{}: {}", self.binary.display(), e)))?;

        // stdin is fed while stdout drains.
        let stdin = child.stdin.take();
        let input = data.to_vec();
        let writer = thread::spawn(move || -> io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&input)?;
            }
            Ok(())
        });

        let output = child
            .wait_with_output()
            .map_err(|e| TranscodeError::Failed(format!("ffmpeg wait failed: {}", e)))?;

        // Exit status decides; a broken stdin pipe alone is not a failure.
        let _ = writer.join();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(TranscodeError::Failed(format!(
                "ffmpeg exited with status {:?} for {}: {}",
                output.status.code(),
                profile.name,
                last_line.trim()
            )));
        }

        Ok(output.stdout)
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl SegmentTranscoder for FfmpegTranscoder {
    fn transcode(
        &self,
        segment: &Segment,
        profiles: &[VideoProfile],
    ) -> Result<Vec<Vec<u8>>, TranscodeError> {
        profiles
            .iter()
            .map(|profile| {
                debug!(seq = segment.seq_no, profile = %profile.name, "transcoding");
                self.run(&segment.data, profile)
            })
            .collect()
    }
}
