//! Extended M3U parsing and duplicate detection

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::DuplicateMatch;
use crate::error::{Error, Result};
use crate::types::{LinkRecord, PlaylistDocument};

/// Header marker; must start the first non-empty line to count
pub const HEADER: &str = "#EXTM3U";

/// Prefix of the metadata line that belongs to the following URL
pub const EXTINF_PREFIX: &str = "#EXTINF";

#[allow(clippy::expect_used)]
static URL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://\S+$").expect("URL line pattern is valid"));

/// Result of parsing a playlist
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedPlaylist {
    /// Header flag and unique records in input order
    pub document: PlaylistDocument,
    /// URL lines dropped because their URL was already seen
    pub duplicate_count: usize,
    /// Every URL line encountered, duplicates included
    pub url_lines: usize,
}

impl ParsedPlaylist {
    /// Whether the playlist holds no links (a warning, not an error)
    pub fn is_empty(&self) -> bool {
        self.document.records.is_empty()
    }

    /// Number of unique links
    pub fn unique_count(&self) -> usize {
        self.document.records.len()
    }
}

/// Whether a (trimmed) line is the playlist header
///
/// `#EXTM3U` alone or followed by whitespace-separated attributes
/// (`#EXTM3U x-tvg-url="..."`).
pub fn is_header_line(line: &str) -> bool {
    line.strip_prefix(HEADER)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

/// Whether a (trimmed) line is a probe-able URL line
pub fn is_url_line(line: &str) -> bool {
    URL_LINE.is_match(line)
}

/// Parse playlist text into unique link records
///
/// Blank lines are skipped. A `#EXTINF` line is held for the next URL; a
/// second one before any URL replaces it. Any other line clears it. The first
/// occurrence of a URL wins, and a dropped duplicate also drops its pending
/// EXTINF.
///
/// # Examples
///
/// ```
/// use m3u_sweep::config::DuplicateMatch;
/// use m3u_sweep::parser::parse_playlist;
///
/// let text = "#EXTM3U\n#EXTINF:-1,News\nhttp://a.example/live\nhttp://a.example/live\n";
/// let parsed = parse_playlist(text, DuplicateMatch::Exact);
///
/// assert!(parsed.document.has_header());
/// assert_eq!(parsed.document.records.len(), 1);
/// assert_eq!(parsed.duplicate_count, 1);
/// ```
pub fn parse_playlist(content: &str, duplicate_match: DuplicateMatch) -> ParsedPlaylist {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();

    let header = lines.next_if(|first| is_header_line(first)).map(str::to_string);

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    let mut pending_extinf: Option<String> = None;
    let mut duplicate_count = 0;
    let mut url_lines = 0;

    for line in lines {
        if line.starts_with(EXTINF_PREFIX) {
            if pending_extinf.is_some() {
                tracing::debug!(line, "EXTINF without URL replaced by a later EXTINF");
            }
            pending_extinf = Some(line.to_string());
        } else if is_url_line(line) {
            url_lines += 1;
            let extinf = pending_extinf.take();
            if !seen.insert(duplicate_match.key(line)) {
                duplicate_count += 1;
                tracing::debug!(url = line, "skipping duplicate URL");
                continue;
            }
            records.push(LinkRecord {
                url: line.to_string(),
                extinf,
                original_index: records.len(),
            });
        } else {
            pending_extinf = None;
        }
    }

    ParsedPlaylist {
        document: PlaylistDocument {
            header,
            records,
        },
        duplicate_count,
        url_lines,
    }
}

/// Read and parse a playlist file
///
/// # Errors
///
/// - [`Error::InputNotFound`] if the path does not exist
/// - [`Error::InputUnreadable`] if it cannot be read or is not valid UTF-8
pub async fn read_playlist(path: &Path, duplicate_match: DuplicateMatch) -> Result<ParsedPlaylist> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::from_input_io(path, e))?;

    let content = String::from_utf8(bytes).map_err(|e| Error::InputUnreadable {
        path: path.to_path_buf(),
        reason: format!("not valid UTF-8: {}", e.utf8_error()),
    })?;

    let parsed = parse_playlist(&content, duplicate_match);
    if parsed.is_empty() {
        tracing::warn!(path = %path.display(), "playlist contains no links");
    }
    Ok(parsed)
}
