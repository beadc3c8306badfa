//! Input and compression resolution

use clap::ValueEnum;
use mrf_core::Compression;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Index file looked up in the working directory when no input is given
pub const DEFAULT_LOCAL_INPUT: &str = "2024-01-01_anthem_index.json.gz";

/// Published index used when the local copy is absent
pub const DEFAULT_REMOTE_INPUT: &str =
    "https://antm-pt-prod-dataz-nogbd-nophi-us-east1.s3.amazonaws.com/anthem/2024-01-01_anthem_index.json.gz";

/// Where the index document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Path(PathBuf),
    Url(Url),
}

impl Input {
    /// `http(s)` URLs are fetched; anything else is a local path
    pub fn parse(value: &str) -> Self {
        match Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Url(url),
            _ => Self::Path(PathBuf::from(value)),
        }
    }

    /// The local default if it exists in `dir`, else the remote default
    pub fn default_in(dir: &Path) -> Self {
        let local = dir.join(DEFAULT_LOCAL_INPUT);
        if local.is_file() {
            Self::Path(local)
        } else {
            Self::parse(DEFAULT_REMOTE_INPUT)
        }
    }

    /// Name used to guess the compression: the file path, or the URL path
    /// without its query string
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path.to_string_lossy().into_owned(),
            Self::Url(url) => url.path().to_string(),
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            // Signed URLs carry credentials in the query
            Self::Url(url) => write!(
                f,
                "{}://{}{}",
                url.scheme(),
                url.host_str().unwrap_or_default(),
                url.path()
            ),
        }
    }
}

/// `--compression` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CompressionMode {
    /// Gzip when the input name ends in `.gz`
    #[default]
    Auto,
    Gzip,
    None,
}

impl CompressionMode {
    pub fn resolve(self, input: &Input) -> Compression {
        match self {
            Self::Auto => Compression::from_name(&input.name()),
            Self::Gzip => Compression::Gzip,
            Self::None => Compression::None,
        }
    }
}

/// Parse an `ABBR=CODE` region override
pub fn parse_region_pair(value: &str) -> Result<(String, u32), String> {
    let (abbr, code) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ABBR=CODE, got '{value}'"))?;
    let abbr = abbr.trim();
    if abbr.is_empty() {
        return Err(format!("missing region abbreviation in '{value}'"));
    }
    let code = code
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid region code in '{value}': {e}"))?;
    Ok((abbr.to_ascii_uppercase(), code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distinguishes_urls_and_paths() {
        assert!(matches!(Input::parse("https://h.example/i.json.gz"), Input::Url(_)));
        assert!(matches!(Input::parse("http://h.example/i.json"), Input::Url(_)));
        assert!(matches!(Input::parse("index.json.gz"), Input::Path(_)));
        assert!(matches!(Input::parse("/data/index.json"), Input::Path(_)));
        assert!(matches!(Input::parse("file:///data/index.json"), Input::Path(_)));
    }

    #[test]
    fn test_default_falls_back_to_remote() {
        let dir = std::env::temp_dir().join("mrf-cli-no-such-dir");
        match Input::default_in(&dir) {
            Input::Url(url) => assert_eq!(url.as_str(), DEFAULT_REMOTE_INPUT),
            other => panic!("expected remote default, got {other:?}"),
        }
    }

    #[test]
    fn test_auto_compression_ignores_query() {
        let input = Input::parse("https://h.example/index.json.gz?Expires=1&Signature=x.y");
        assert_eq!(CompressionMode::Auto.resolve(&input), Compression::Gzip);
        assert_eq!(
            CompressionMode::Auto.resolve(&Input::parse("index.json")),
            Compression::None
        );
        assert_eq!(
            CompressionMode::Gzip.resolve(&Input::parse("index.json")),
            Compression::Gzip
        );
    }

    #[test]
    fn test_display_hides_query() {
        let input = Input::parse("https://h.example/a/index.json.gz?Signature=secret");
        assert_eq!(input.to_string(), "https://h.example/a/index.json.gz");
    }

    #[test]
    fn test_region_pairs() {
        assert_eq!(parse_region_pair("co=111"), Ok(("CO".to_string(), 111)));
        assert!(parse_region_pair("CO").is_err());
        assert!(parse_region_pair("=111").is_err());
        assert!(parse_region_pair("CO=abc").is_err());
    }
}
