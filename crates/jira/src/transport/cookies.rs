//! Session cookie persistence.
//!
//! Cookies are stored as a flat JSON array in `~/.jira.d/cookies.js`. The
//! record layout uses the same PascalCase keys as older go-jira installs, so
//! an existing cookie file keeps working. Saving always merges by name with
//! whatever is already on disk: cookies set by a prior run survive unless the
//! server sends a new value for the same name.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// How long a persisted cookie stays valid after it was last saved.
pub const COOKIE_LIFETIME_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("Failed to read cookie file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write cookie file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to serialize cookies: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single persisted session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub domain: String,
    pub expires: DateTime<Utc>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

impl SessionCookie {
    /// Create a cookie expiring one lifetime after `now`.
    pub fn new(name: impl Into<String>, value: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: String::new(),
            domain: String::new(),
            expires: now + Duration::days(COOKIE_LIFETIME_DAYS),
            secure: false,
            http_only: false,
        }
    }

    /// Parse a `Set-Cookie` header value.
    ///
    /// Only the name, value and the Path/Domain/Secure/HttpOnly attributes are
    /// kept. Server-supplied expiry is ignored; persisted cookies always get a
    /// fresh lifetime when saved.
    pub fn parse_set_cookie(header: &str, now: DateTime<Utc>) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self::new(name, value.trim().trim_matches('"'), now);
        for attribute in parts {
            let (key, val) = match attribute.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (attribute.trim(), ""),
            };
            match key.to_ascii_lowercase().as_str() {
                "path" => cookie.path = val.to_string(),
                "domain" => cookie.domain = val.to_string(),
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ => {}
            }
        }
        Some(cookie)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// Whether the cookie's Domain, Path and Secure attributes allow sending
    /// it to `url`. Unset attributes match anything.
    pub fn matches_url(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let domain = self.domain.trim_start_matches('.').to_ascii_lowercase();
        if !domain.is_empty() && host != domain && !host.ends_with(&format!(".{}", domain)) {
            return false;
        }

        let prefix = self.path.trim_end_matches('/');
        let path = url.path();
        if !prefix.is_empty() && path != prefix && !path.starts_with(&format!("{}/", prefix)) {
            return false;
        }

        !self.secure || url.scheme() == "https"
    }
}

/// Merge `incoming` into `existing` by cookie name.
///
/// Matching names are replaced in place, new names are appended, and every
/// other existing cookie is left untouched.
pub fn merge_cookies(mut existing: Vec<SessionCookie>, incoming: &[SessionCookie]) -> Vec<SessionCookie> {
    for cookie in incoming {
        match existing.iter_mut().find(|c| c.name == cookie.name) {
            Some(slot) => *slot = cookie.clone(),
            None => existing.push(cookie.clone()),
        }
    }
    existing
}

/// Render the live cookies that apply to `url` as a `Cookie` header value.
pub fn cookie_header(cookies: &[SessionCookie], url: &Url, now: DateTime<Utc>) -> Option<String> {
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|c| !c.is_expired(now) && c.matches_url(url))
        .map(|c| format!("{}={}", c.name, c.value))
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// File-backed cookie store.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored cookies.
    ///
    /// A missing file yields an empty list. A file that cannot be parsed is
    /// logged and treated as empty so a corrupt store never blocks login.
    pub fn load(&self) -> Result<Vec<SessionCookie>, CookieError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CookieError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str::<Vec<SessionCookie>>(&contents) {
            Ok(cookies) => {
                debug!("Loaded {} cookies from {}", cookies.len(), self.path.display());
                Ok(cookies)
            }
            Err(e) => {
                warn!("Failed to parse json from file {}: {}", self.path.display(), e);
                Ok(Vec::new())
            }
        }
    }

    /// Persist `incoming`, merged by name with the cookies already on disk.
    ///
    /// Each incoming cookie gets its expiry renewed relative to `now`.
    /// Returns the merged list that was written.
    pub fn save(
        &self,
        incoming: &[SessionCookie],
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionCookie>, CookieError> {
        let renewed: Vec<SessionCookie> = incoming
            .iter()
            .cloned()
            .map(|mut c| {
                c.expires = now + Duration::days(COOKIE_LIFETIME_DAYS);
                c
            })
            .collect();

        let merged = merge_cookies(self.load()?, &renewed);
        self.write(&merged)?;
        Ok(merged)
    }

    /// Remove the cookie file, if any.
    pub fn clear(&self) -> Result<(), CookieError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CookieError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&self, cookies: &[SessionCookie]) -> Result<(), CookieError> {
        let json = serde_json::to_string_pretty(cookies)?;
        let write_err = |source| CookieError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("js.tmp");
        fs::write(&temp_path, json).map_err(write_err)?;
        fs::rename(&temp_path, &self.path).map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn values(cookies: &[SessionCookie]) -> BTreeMap<String, String> {
        cookies
            .iter()
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect()
    }

    #[test]
    fn test_save_merges_by_name() {
        let temp = TempDir::new().unwrap();
        let store = CookieStore::new(temp.path().join("cookies.js"));

        store
            .save(
                &[SessionCookie::new("A", "1", now()), SessionCookie::new("B", "2", now())],
                now(),
            )
            .unwrap();
        store
            .save(
                &[SessionCookie::new("B", "3", now()), SessionCookie::new("C", "4", now())],
                now(),
            )
            .unwrap();

        let stored = values(&store.load().unwrap());
        let expected: BTreeMap<String, String> = [("A", "1"), ("B", "3"), ("C", "4")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(stored, expected);
    }

    #[test]
    fn test_save_renews_expiry() {
        let temp = TempDir::new().unwrap();
        let store = CookieStore::new(temp.path().join("cookies.js"));
        let stale = SessionCookie {
            expires: now() - Duration::days(30),
            ..SessionCookie::new("JSESSIONID", "abc", now())
        };

        let merged = store.save(&[stale], now()).unwrap();
        assert_eq!(merged[0].expires, now() + Duration::days(COOKIE_LIFETIME_DAYS));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = CookieStore::new(temp.path().join("nope").join("cookies.js"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cookies.js");
        fs::write(&path, "not json").unwrap();
        assert!(CookieStore::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn test_load_reads_go_style_records() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cookies.js");
        fs::write(
            &path,
            r#"[{"Name":"JSESSIONID","Value":"xyz","Path":"/","Domain":"","Expires":"2030-01-01T00:00:00Z","RawExpires":"","MaxAge":0,"Secure":false,"HttpOnly":true,"Raw":"","Unparsed":null}]"#,
        )
        .unwrap();

        let cookies = CookieStore::new(&path).load().unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "JSESSIONID");
        assert!(cookies[0].http_only);
    }

    #[test]
    fn test_clear_removes_file() {
        let temp = TempDir::new().unwrap();
        let store = CookieStore::new(temp.path().join("cookies.js"));
        store.save(&[SessionCookie::new("A", "1", now())], now()).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_parse_set_cookie_attributes() {
        let cookie = SessionCookie::parse_set_cookie(
            "JSESSIONID=6E3487971234567896704A9EB4AE501F; Path=/jira; Secure; HttpOnly",
            now(),
        )
        .unwrap();
        assert_eq!(cookie.name, "JSESSIONID");
        assert_eq!(cookie.value, "6E3487971234567896704A9EB4AE501F");
        assert_eq!(cookie.path, "/jira");
        assert!(cookie.secure);
        assert!(cookie.http_only);
    }

    #[test]
    fn test_parse_set_cookie_rejects_garbage() {
        assert!(SessionCookie::parse_set_cookie("no-equals-sign", now()).is_none());
        assert!(SessionCookie::parse_set_cookie("=value", now()).is_none());
    }

    #[test]
    fn test_cookie_header_skips_expired() {
        let live = SessionCookie::new("a", "1", now());
        let dead = SessionCookie {
            expires: now() - Duration::seconds(1),
            ..SessionCookie::new("b", "2", now())
        };
        let url = Url::parse("https://jira.example.com/rest/api/2/myself").unwrap();
        assert_eq!(
            cookie_header(&[live, dead], &url, now()),
            Some("a=1".to_string())
        );
        assert_eq!(cookie_header(&[], &url, now()), None);
    }

    #[test]
    fn test_cookie_attributes_scope_the_header() {
        let url = Url::parse("https://jira.example.com/jira/rest/api/2/myself").unwrap();
        let cookie = |header: &str| SessionCookie::parse_set_cookie(header, now()).unwrap();

        assert!(cookie("a=1").matches_url(&url));
        assert!(cookie("a=1; Domain=.example.com; Path=/jira").matches_url(&url));
        assert!(cookie("a=1; Domain=jira.example.com; Path=/").matches_url(&url));
        assert!(!cookie("a=1; Domain=other.example.net").matches_url(&url));
        assert!(!cookie("a=1; Domain=ample.com").matches_url(&url));
        assert!(!cookie("a=1; Path=/confluence").matches_url(&url));
        assert!(!cookie("a=1; Path=/ji").matches_url(&url));

        let plain = Url::parse("http://jira.example.com/jira/x").unwrap();
        assert!(!cookie("a=1; Secure").matches_url(&plain));
    }

    fn cookie_batch() -> impl Strategy<Value = Vec<(String, String)>> {
        prop::collection::vec(("[A-E]", "[0-9]{1,3}"), 0..6)
    }

    // Later saves win for shared names; every other name persists.
    proptest! {
        #[test]
        fn prop_save_merge_later_values_win(first in cookie_batch(), second in cookie_batch()) {
            let temp = TempDir::new().unwrap();
            let store = CookieStore::new(temp.path().join("cookies.js"));
            let to_cookies = |batch: &[(String, String)]| -> Vec<SessionCookie> {
                batch.iter().map(|(n, v)| SessionCookie::new(n.clone(), v.clone(), now())).collect()
            };

            store.save(&to_cookies(&first), now()).unwrap();
            store.save(&to_cookies(&second), now()).unwrap();

            let mut expected = BTreeMap::new();
            for (name, value) in first.iter().chain(second.iter()) {
                expected.insert(name.clone(), value.clone());
            }

            let stored = store.load().unwrap();
            prop_assert_eq!(values(&stored), expected.clone());
            prop_assert_eq!(stored.len(), expected.len());
        }
    }
}
