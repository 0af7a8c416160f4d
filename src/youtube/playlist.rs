use crate::youtube::error::{AppError, Result};
use crate::youtube::models::{Track, VideoId};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Ordered sequence of tracks with unique identifiers. Order is playback
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn position_of(&self, video_id: &VideoId) -> Option<usize> {
        self.tracks.iter().position(|t| &t.video_id == video_id)
    }

    /// Adds a track. Re-adding an existing identifier replaces the entry in
    /// place: metadata is updated, playlist position is preserved, no
    /// duplicate is created. Returns true when an entry was replaced.
    pub fn add(&mut self, track: Track) -> bool {
        match self.position_of(&track.video_id) {
            Some(idx) => {
                self.tracks[idx] = track;
                true
            }
            None => {
                self.tracks.push(track);
                false
            }
        }
    }

    pub fn remove(&mut self, video_id: &VideoId) -> Option<Track> {
        self.position_of(video_id).map(|idx| self.tracks.remove(idx))
    }

    /// Moves the entry with `video_id` to 0-based index `new_index` (clamped
    /// to the end), preserving the relative order of all other entries.
    pub fn move_to(&mut self, video_id: &VideoId, new_index: usize) -> bool {
        let Some(idx) = self.position_of(video_id) else {
            return false;
        };
        let track = self.tracks.remove(idx);
        let new_index = new_index.min(self.tracks.len());
        self.tracks.insert(new_index, track);
        true
    }
}

/// Parses an `.m3u` file. A missing file yields an empty playlist. Unknown
/// `#` directives are ignored for forward compatibility; a malformed
/// `#EXTINF` directive is a `Parse` error.
pub fn load(path: &Path) -> Result<Playlist> {
    if !path.exists() {
        return Ok(Playlist::new());
    }
    let content = fs::read_to_string(path)?;
    parse_m3u(&content)
}

pub fn parse_m3u(content: &str) -> Result<Playlist> {
    let mut playlist = Playlist::new();
    let mut pending_title: Option<String> = None;

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(directive) = line.strip_prefix("#EXTINF:") {
            let title = directive.split_once(',').map(|(_, title)| title.trim()).ok_or(
                AppError::Parse {
                    line: lineno + 1,
                    message: "#EXTINF directive without a comma".to_string(),
                },
            )?;
            pending_title = Some(title.to_string());
        } else if let Some(comment) = line.strip_prefix('#') {
            // Tolerate `# Title` comments written by older versions, skip
            // every other directive.
            if let Some(title) = comment.strip_prefix(' ') {
                if !line.starts_with("#EXT") && !title.is_empty() {
                    pending_title = Some(title.to_string());
                }
            }
        } else {
            // Any non-directive line is a location; m3u permits spaces in
            // local paths
            let video_id = VideoId::from_location(line);
            let title = pending_title.take().unwrap_or_else(|| line.to_string());
            playlist.add(Track {
                video_id,
                title,
                link: line.to_string(),
                thumbnail_url: None,
                local_path: None,
            });
        }
    }

    Ok(playlist)
}

/// Serializes the playlist atomically: write to a temporary file in the same
/// directory, fsync, then rename over the target. A crash mid-save never
/// leaves a truncated playlist behind.
pub fn save(playlist: &Playlist, path: &Path) -> Result<()> {
    let tmp_path = tmp_path_for(path);
    {
        let mut file = fs::File::create(&tmp_path)?;
        writeln!(file, "#EXTM3U")?;
        for track in playlist.tracks() {
            let title = track.title.replace(['\n', '\r'], " ");
            writeln!(file, "#EXTINF:-1,{title}")?;
            writeln!(file, "{}", track.link)?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Owns the in-memory playlist plus its autosave location. Every mutation is
/// persisted to the autosave file; autosave failures are logged and never
/// undo or block the mutation.
#[derive(Debug)]
pub struct PlaylistManager {
    playlist: Playlist,
    autosave_path: PathBuf,
}

impl PlaylistManager {
    /// Loads prior state from the autosave file; an unreadable autosave is
    /// reported and replaced with an empty playlist rather than failing
    /// startup.
    pub fn open(autosave_path: PathBuf) -> Self {
        let playlist = match load(&autosave_path) {
            Ok(playlist) => playlist,
            Err(e) => {
                log::error!("Failed to load autosave playlist: {e}");
                Playlist::new()
            }
        };
        Self { playlist, autosave_path }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn add(&mut self, track: Track) -> bool {
        let replaced = self.playlist.add(track);
        self.autosave();
        replaced
    }

    pub fn remove(&mut self, video_id: &VideoId) -> Option<Track> {
        let removed = self.playlist.remove(video_id);
        if removed.is_some() {
            self.autosave();
        }
        removed
    }

    pub fn move_to(&mut self, video_id: &VideoId, new_index: usize) -> bool {
        let moved = self.playlist.move_to(video_id, new_index);
        if moved {
            self.autosave();
        }
        moved
    }

    /// Replaces the whole playlist, e.g. after an explicit load from a user
    /// supplied file.
    pub fn replace(&mut self, playlist: Playlist) {
        self.playlist = playlist;
        self.autosave();
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        save(&self.playlist, path)
    }

    fn autosave(&self) {
        if let Err(e) = save(&self.playlist, &self.autosave_path) {
            log::warn!("Autosave to {} failed: {e}", self.autosave_path.display());
        }
    }
}
