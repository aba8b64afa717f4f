//! Playlist fixtures and filesystem helpers

use std::path::{Path, PathBuf};
use std::time::Duration;

use m3u_sweep::Config;

/// Write `content` to `name` inside `dir` and return its path
pub fn write_playlist(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("failed to write playlist fixture");
    path
}

/// Read a playlist back as text
pub fn read_playlist_text(path: &Path) -> String {
    std::fs::read_to_string(path).expect("failed to read playlist")
}

/// URL lines of a playlist, in order
pub fn url_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|l| l.starts_with("http://") || l.starts_with("https://"))
        .map(str::to_string)
        .collect()
}

/// Whether `sub` appears in `full` in the same relative order
pub fn is_subsequence(sub: &[String], full: &[String]) -> bool {
    let mut it = full.iter();
    sub.iter().all(|s| it.any(|f| f == s))
}

/// Config tuned for local mock servers: short timeout, modest concurrency
pub fn test_config(input: &Path) -> Config {
    let mut config = Config::new(input);
    config.probe.timeout = Duration::from_millis(500);
    config.probe.concurrency_limit = 8;
    config
}
