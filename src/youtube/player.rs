use crate::youtube::constants::AUDIO_FORMAT;
use crate::youtube::error::{AppError, Result};
use crate::youtube::models::MediaKind;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Playback parameters for one mpv invocation.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackMode {
    pub kind: MediaKind,
    pub max_height: u32,
}

/// Adapter around an external mpv process. Playback runs detached from this
/// process; later invocations reach the running instance through mpv's JSON
/// IPC socket.
#[derive(Debug, Clone)]
pub struct MpvPlayer {
    bin: String,
    ipc_socket: PathBuf,
}

impl MpvPlayer {
    pub fn new(bin: impl Into<String>, ipc_socket: PathBuf) -> Self {
        Self { bin: bin.into(), ipc_socket }
    }

    /// Starts playback of `entries` (local paths or URLs), rotated so that
    /// `start_index` plays first. Any previously running instance is asked to
    /// quit first so the IPC socket stays unambiguous.
    pub fn play(&self, entries: &[String], start_index: usize, mode: PlaybackMode) -> Result<()> {
        if entries.is_empty() {
            return Err(AppError::Playback("nothing to play".to_string()));
        }
        let start_index = start_index.min(entries.len() - 1);

        // Best effort: an already running instance holds the socket
        let _ = self.stop();

        let mut cmd = Command::new(&self.bin);
        cmd.arg(format!("--input-ipc-server={}", self.ipc_socket.display()))
            .arg("--cache=yes")
            .arg("--cache-secs=1");

        match mode.kind {
            MediaKind::Audio => {
                cmd.arg("--no-video")
                    .arg("--force-window=no")
                    .arg(format!("--ytdl-format={AUDIO_FORMAT}"));
            }
            MediaKind::Video => {
                cmd.arg(format!(
                    "--ytdl-format=bestvideo[height<={h}]+bestaudio/best[height<={h}]",
                    h = mode.max_height
                ));
            }
        }

        cmd.args(&entries[start_index..]).args(&entries[..start_index]);

        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

        log::info!("Starting mpv with {} playlist entries", entries.len());
        match cmd.spawn() {
            Ok(_child) => Ok(()),
            Err(e) => Err(AppError::Playback(format!("failed to start {}: {e}", self.bin))),
        }
    }

    pub fn toggle_pause(&self) -> Result<()> {
        self.ipc_command(&serde_json::json!({ "command": ["cycle", "pause"] }))
    }

    pub fn next(&self) -> Result<()> {
        self.ipc_command(&serde_json::json!({ "command": ["playlist-next"] }))
    }

    pub fn stop(&self) -> Result<()> {
        self.ipc_command(&serde_json::json!({ "command": ["quit"] }))
    }

    #[cfg(unix)]
    fn ipc_command(&self, command: &serde_json::Value) -> Result<()> {
        use std::io::{Read, Write};
        use std::os::unix::net::UnixStream;
        use std::time::Duration;

        let mut stream = UnixStream::connect(&self.ipc_socket).map_err(|e| {
            AppError::Playback(format!(
                "cannot reach mpv at {}: {e}",
                self.ipc_socket.display()
            ))
        })?;
        let mut payload = command.to_string();
        payload.push('\n');
        stream
            .write_all(payload.as_bytes())
            .map_err(|e| AppError::Playback(format!("mpv IPC write failed: {e}")))?;

        // Read one response so mpv does not see a broken pipe
        let _ = stream.set_read_timeout(Some(Duration::from_millis(500)));
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf);
        Ok(())
    }

    #[cfg(not(unix))]
    fn ipc_command(&self, _command: &serde_json::Value) -> Result<()> {
        Err(AppError::Playback("mpv IPC control is only supported on Unix".to_string()))
    }
}
