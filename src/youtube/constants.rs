pub const URL_EXPIRY_BUFFER: u64 = 60; // seconds
pub const EXPIRE_PARAM: &str = "expire=";

pub const CONCURRENT_YTDLP_LIMIT: usize = 3;
pub const URL_CACHE_SIZE: usize = 50;

pub const DEFAULT_SEARCH_LIMIT: usize = 15;

pub const AUTOSAVE_FILE: &str = "autosave.m3u";
pub const PART_SUFFIX: &str = "part";

pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

pub const AUDIO_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio/best";

pub fn video_format(max_height: u32) -> String {
    format!(
        "bestvideo[ext=webm][height<={max_height}]+bestaudio[ext=webm]/bestvideo[height<={max_height}]+bestaudio/best[height<={max_height}]"
    )
}
