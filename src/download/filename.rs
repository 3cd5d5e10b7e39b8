//! Output filename resolution.
//!
//! The name comes from the response's `Content-Disposition` header when it
//! advertises one, otherwise from the last segment of the URL path. A name
//! that is already taken in the destination directory gets a Unix timestamp
//! prefix so nothing is ever overwritten.

use reqwest::{header::CONTENT_DISPOSITION, header::HeaderMap, Url};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Used when neither the response nor the URL carries a usable name.
pub const FALLBACK_FILENAME: &str = "download";

/// Picks the name advertised by the response, or the one in the URL.
pub fn resolve(headers: &HeaderMap, url: &Url) -> String {
    headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_disposition)
        .or_else(|| from_url(url))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Extracts the filename from a `Content-Disposition` value.
///
/// `filename*=` (RFC 5987) wins over `filename=`.
pub fn parse_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let raw = raw.trim();
                let encoded = raw.split_once("''").map_or(raw, |(_, rest)| rest);
                extended = urlencoding::decode(encoded.trim_matches('"'))
                    .ok()
                    .map(|s| s.into_owned());
            }
            "filename" => plain = Some(raw.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }

    extended
        .and_then(|name| sanitize(&name))
        .or_else(|| plain.and_then(|name| sanitize(&name)))
}

/// Last segment of the URL path, percent-decoded.
pub fn from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(segment).ok()?;
    sanitize(&decoded)
}

/// Keeps only the final path component so a name can never escape the
/// destination directory.
fn sanitize(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}

/// Returns a path inside `directory` that does not exist yet.
///
/// A taken `name` becomes `<unix seconds>_<name>`, then
/// `<unix seconds>_<n>_<name>` if that is taken as well.
pub fn unique_path(directory: &Path, name: &str) -> (String, PathBuf) {
    let candidate = directory.join(name);
    if !candidate.exists() {
        return (name.to_string(), candidate);
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let stamped = format!("{}_{}", timestamp, name);
    let candidate = directory.join(&stamped);
    if !candidate.exists() {
        return (stamped, candidate);
    }

    let mut n: u64 = 1;
    loop {
        let numbered = format!("{}_{}_{}", timestamp, n, name);
        let candidate = directory.join(&numbered);
        if !candidate.exists() {
            return (numbered, candidate);
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn content_disposition_variants() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="report.pdf""#),
            Some("report.pdf".into())
        );
        assert_eq!(
            parse_content_disposition("attachment; filename=report.pdf"),
            Some("report.pdf".into())
        );
        assert_eq!(
            parse_content_disposition(
                r#"attachment; filename="fallback.txt"; filename*=UTF-8''na%C3%AFve%20file.txt"#
            ),
            Some("naïve file.txt".into())
        );
        assert_eq!(parse_content_disposition("inline"), None);
        assert_eq!(parse_content_disposition(r#"attachment; filename="""#), None);
    }

    #[test]
    fn content_disposition_cannot_escape_directory() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="../../etc/passwd""#),
            Some("passwd".into())
        );
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="..""#),
            None
        );
    }

    #[test]
    fn name_from_url() {
        let url = Url::parse("https://example.com/files/1Mio.dat").unwrap();
        assert_eq!(from_url(&url), Some("1Mio.dat".into()));

        let url = Url::parse("https://example.com/my%20file.zip?x=1").unwrap();
        assert_eq!(from_url(&url), Some("my file.zip".into()));

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(from_url(&url), None);
    }

    #[test]
    fn header_wins_over_url() {
        let url = Url::parse("https://example.com/get?id=3").unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(resolve(&headers, &url), "get");

        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static(r#"attachment; filename="data.csv""#),
        );
        assert_eq!(resolve(&headers, &url), "data.csv");
    }

    #[test]
    fn falls_back_when_nothing_usable() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(resolve(&HeaderMap::new(), &url), FALLBACK_FILENAME);
    }

    #[test]
    fn unique_path_prefixes_taken_names() {
        let dir = tempfile::tempdir().unwrap();

        let (name, path) = unique_path(dir.path(), "file.bin");
        assert_eq!(name, "file.bin");
        assert_eq!(path, dir.path().join("file.bin"));

        std::fs::write(&path, b"old").unwrap();
        let (stamped, stamped_path) = unique_path(dir.path(), "file.bin");
        assert_ne!(stamped, "file.bin");
        assert!(stamped.ends_with("_file.bin"));
        let prefix = stamped.trim_end_matches("_file.bin");
        assert!(prefix.parse::<u64>().is_ok());
        assert!(!stamped_path.exists());

        std::fs::write(&stamped_path, b"older").unwrap();
        let (numbered, numbered_path) = unique_path(dir.path(), "file.bin");
        assert_ne!(numbered, stamped);
        assert!(numbered.ends_with("_file.bin"));
        assert!(!numbered_path.exists());
    }
}
