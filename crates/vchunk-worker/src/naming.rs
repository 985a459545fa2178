//! Episode metadata from filenames and chunk output names.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Filename patterns, tried in order.
const EPISODE_PATTERNS: [&str; 3] = [
    r"(.*?)[._\s]S(\d+)E(\d+)",
    r"(.*?)[._\s](\d+)x(\d+)",
    r"(.*?)[._\s]Season(\d+)Episode(\d+)",
];

const DEFAULT_NUMBER: &str = "01";

fn episode_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        EPISODE_PATTERNS
            .iter()
            .filter_map(|p| RegexBuilder::new(p).case_insensitive(true).build().ok())
            .collect()
    })
}

/// Show, season and episode recovered from a filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowInfo {
    pub show: String,
    /// Zero-padded to at least two digits
    pub season: String,
    /// Zero-padded to at least two digits
    pub episode: String,
}

impl ShowInfo {
    /// Parse `path`'s file stem.
    ///
    /// Falls back to the whole stem with season and episode `01` when no
    /// pattern matches.
    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_stem(&stem)
    }

    pub fn from_stem(stem: &str) -> Self {
        for pattern in episode_patterns() {
            let Some(caps) = pattern.captures(stem) else {
                continue;
            };
            let show = clean_show_name(&caps[1]);
            if show.is_empty() {
                continue;
            }
            return Self {
                show,
                season: pad_number(&caps[2]),
                episode: pad_number(&caps[3]),
            };
        }

        Self {
            show: stem.trim().to_string(),
            season: DEFAULT_NUMBER.to_string(),
            episode: DEFAULT_NUMBER.to_string(),
        }
    }

    /// File name for chunk `part` (1-based).
    pub fn chunk_file_name(&self, part: usize) -> String {
        format!(
            "{}_S{}E{}_Part{:03}.mp4",
            self.show, self.season, self.episode, part
        )
    }

    /// Full output path for chunk `part` inside `output_dir`.
    pub fn chunk_path(&self, output_dir: &Path, part: usize) -> PathBuf {
        output_dir.join(self.chunk_file_name(part))
    }
}

fn clean_show_name(raw: &str) -> String {
    raw.replace(['.', '_'], " ").trim().to_string()
}

fn pad_number(digits: &str) -> String {
    match digits.parse::<u32>() {
        Ok(n) => format!("{n:02}"),
        Err(_) => format!("{digits:0>2}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sxxexx_pattern() {
        let info = ShowInfo::from_stem("The.Office.S03E07.720p");
        assert_eq!(info.show, "The Office");
        assert_eq!(info.season, "03");
        assert_eq!(info.episode, "07");
    }

    #[test]
    fn test_case_insensitive_and_padding() {
        let info = ShowInfo::from_stem("my_show_s1e2");
        assert_eq!(
            info,
            ShowInfo {
                show: "my show".to_string(),
                season: "01".to_string(),
                episode: "02".to_string(),
            }
        );
    }

    #[test]
    fn test_nxnn_pattern() {
        let info = ShowInfo::from_stem("Firefly 1x05 Out of Gas");
        assert_eq!(info.show, "Firefly");
        assert_eq!((info.season.as_str(), info.episode.as_str()), ("01", "05"));
    }

    #[test]
    fn test_season_episode_words() {
        let info = ShowInfo::from_stem("Nature_Season2Episode11");
        assert_eq!(info.show, "Nature");
        assert_eq!((info.season.as_str(), info.episode.as_str()), ("02", "11"));
    }

    #[test]
    fn test_wide_numbers_kept() {
        let info = ShowInfo::from_stem("Daily.Show.S2024E123");
        assert_eq!(info.season, "2024");
        assert_eq!(info.episode, "123");
    }

    #[test]
    fn test_fallback_uses_stem() {
        let info = ShowInfo::from_path(Path::new("/videos/Lecture Recording.mkv"));
        assert_eq!(info.show, "Lecture Recording");
        assert_eq!(info.season, "01");
        assert_eq!(info.episode, "01");
    }

    #[test]
    fn test_chunk_names() {
        let info = ShowInfo::from_stem("Show.S01E02");
        assert_eq!(info.chunk_file_name(1), "Show_S01E02_Part001.mp4");
        assert_eq!(
            info.chunk_path(Path::new("out"), 12),
            PathBuf::from("out/Show_S01E02_Part012.mp4")
        );
    }
}
