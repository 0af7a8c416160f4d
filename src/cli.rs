use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "tubeplay",
    author,
    version,
    about = "Search YouTube, keep an m3u playlist, cache media locally and play it with mpv",
    rename_all = "kebab-case"
)]
pub struct Cli {
    #[arg(short = 'v', long, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search YouTube and print matching videos
    Search {
        /// Search terms
        #[arg(required = true)]
        query: Vec<String>,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Add a video to the playlist by URL or video id
    Add {
        /// Video URL or 11 character video id
        target: String,
        /// Title to store; fetched from the resolver when omitted
        #[arg(short, long)]
        title: Option<String>,
        /// Also download the media into the cache
        #[arg(short, long)]
        download: bool,
    },

    /// Remove a playlist entry by video id
    Remove {
        id: String,
    },

    /// Move a playlist entry to a new position (0-based)
    Move {
        id: String,
        index: usize,
    },

    /// Print the playlist
    List,

    /// Play the playlist through mpv, preferring cached files
    Play {
        /// Entry to start from (0-based)
        #[arg(default_value_t = 0)]
        index: usize,
        /// Play video instead of audio only
        #[arg(long)]
        video: bool,
        /// Maximum resolution: 480p, 720p or 1080p
        #[arg(long)]
        resolution: Option<String>,
        /// Do not download missing entries in the background
        #[arg(long)]
        no_fetch: bool,
    },

    /// Download playlist entries into the media cache
    Download {
        /// Video ids to download; use --missing for every uncached entry
        ids: Vec<String>,
        /// Download every playlist entry that is not cached yet
        #[arg(long)]
        missing: bool,
        /// Download video instead of audio only
        #[arg(long)]
        video: bool,
    },

    /// Save the playlist to an m3u file
    Save {
        path: PathBuf,
    },

    /// Load an m3u file, replacing the current playlist
    Load {
        path: PathBuf,
    },

    /// Resolve and print a direct stream URL for a video id
    Url {
        id: String,
    },

    /// Toggle pause on the running mpv instance
    Pause,

    /// Skip to the next playlist entry in the running mpv instance
    Next,

    /// Stop the running mpv instance
    Stop,
}
