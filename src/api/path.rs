//! Mapping between job fullnames and Jenkins URLs
//!
//! `folder/app/main` lives at `<base>/job/folder/job/app/job/main/`.

use crate::error::{DeckError, DeckResult};
use url::Url;

/// Parse and normalise the server base URL so that paths append below it
pub fn base_url(raw: &str) -> DeckResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DeckError::NotConfigured);
    }
    let mut url = Url::parse(trimmed).map_err(|e| DeckError::ConfigInvalid {
        path: "server.url".into(),
        reason: e.to_string(),
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Split a fullname into its segments, rejecting empty ones
pub fn segments(fullname: &str) -> DeckResult<Vec<&str>> {
    let parts: Vec<&str> = fullname.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(DeckError::JobPath(fullname.to_string()));
    }
    Ok(parts)
}

/// URL of a resource below a job, e.g. `job_url(base, "a/b", &["12", "stop"])`
///
/// Every segment is percent-encoded, so branch names like `feature/x` that
/// Jenkins stores as `feature%2Fx` must be passed already decoded.
pub fn job_url(base: &Url, fullname: &str, tail: &[&str]) -> DeckResult<Url> {
    let parts = segments(fullname)?;
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| DeckError::JobPath(format!("base URL cannot hold paths: {}", base)))?;
        path.pop_if_empty();
        for part in parts {
            path.push("job").push(part);
        }
        if tail.is_empty() {
            // Job page itself; Jenkins redirects without the trailing slash
            path.push("");
        } else {
            path.extend(tail);
        }
    }
    Ok(url)
}

/// URL of a server-level resource, e.g. `root_url(base, &["queue", "api", "json"])`
pub fn root_url(base: &Url, tail: &[&str]) -> DeckResult<Url> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| DeckError::JobPath(format!("base URL cannot hold paths: {}", base)))?;
        path.pop_if_empty();
        path.extend(tail);
    }
    Ok(url)
}

/// Recover the job fullname from a build URL such as `<base>/job/a/job/b/12/`
pub fn fullname_from_build_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<String> = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .map(percent_decode)
        .collect();

    let mut names = Vec::new();
    let mut iter = segments.iter();
    while let Some(segment) = iter.next() {
        if segment == "job" {
            if let Some(name) = iter.next() {
                names.push(name.clone());
            }
        } else if !names.is_empty() {
            // The build number (or anything else) ends the job path
            break;
        }
    }

    (!names.is_empty()).then(|| names.join("/"))
}

fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
