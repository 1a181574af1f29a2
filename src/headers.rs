//! Request header helpers: `Accept` negotiation, `Prefer`, `Want-Digest`.

use sha2::{Digest, Sha256, Sha512};

use crate::error::{Result, VersioningError};
use crate::filter::Handling;
use crate::rdf::serializer::media_type_essence;

// --- ACCEPT ---

struct MediaRange {
    essence: String,
    q: f32,
}

fn quality(params: &str) -> f32 {
    params
        .split(';')
        .filter_map(|p| p.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("q"))
        .and_then(|(_, v)| v.trim().parse::<f32>().ok())
        .unwrap_or(1.0)
}

fn media_ranges(accept: &str) -> Vec<MediaRange> {
    accept
        .split(',')
        .filter(|r| !r.trim().is_empty())
        .map(|r| MediaRange { essence: media_type_essence(r), q: quality(r.split_once(';').map_or("", |(_, p)| p)) })
        .collect()
}

/// Picks the offered media type the client prefers. `offered` is in server
/// preference order, which breaks ties; a missing or empty `Accept` selects
/// the first entry.
pub fn negotiate(accept: Option<&str>, offered: &[&'static str]) -> Option<&'static str> {
    let accept = match accept.map(str::trim) {
        Some(a) if !a.is_empty() => a,
        _ => return offered.first().copied(),
    };
    let ranges = media_ranges(accept);

    let mut best: Option<(&'static str, f32)> = None;
    for &candidate in offered {
        let (major, _) = candidate.split_once('/').unwrap_or((candidate, ""));
        // Most specific matching range wins.
        let q = ranges
            .iter()
            .filter_map(|r| {
                let specificity = if r.essence == candidate {
                    3
                } else if r.essence.strip_suffix("/*") == Some(major) {
                    2
                } else if r.essence == "*/*" {
                    1
                } else {
                    return None;
                };
                Some((specificity, r.q))
            })
            .max_by_key(|(specificity, _)| *specificity)
            .map(|(_, q)| q);

        if let Some(q) = q {
            if q > 0.0 && best.map_or(true, |(_, top)| q > top) {
                best = Some((candidate, q));
            }
        }
    }
    best.map(|(m, _)| m)
}

// --- PREFER ---

/// The parts of `Prefer` the repository honours.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prefer {
    pub return_representation: bool,
    pub omit: Vec<String>,
    pub include: Vec<String>,
    pub handling: Handling,
}

impl Prefer {
    pub fn parse<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut prefer = Prefer::default();
        for preference in values.into_iter().flat_map(|v| v.split(',')) {
            for (i, part) in preference.split(';').enumerate() {
                let (name, value) = match part.split_once('=') {
                    Some((n, v)) => (n.trim(), v.trim().trim_matches('"')),
                    None => (part.trim(), ""),
                };
                match name.to_ascii_lowercase().as_str() {
                    "return" if i == 0 => prefer.return_representation = value.eq_ignore_ascii_case("representation"),
                    "handling" if i == 0 => {
                        prefer.handling =
                            if value.eq_ignore_ascii_case("lenient") { Handling::Lenient } else { Handling::Strict }
                    }
                    "omit" => prefer.omit.extend(value.split_whitespace().map(str::to_string)),
                    "include" => prefer.include.extend(value.split_whitespace().map(str::to_string)),
                    _ => {}
                }
            }
        }
        prefer
    }

    pub fn omits(&self, iri: &str) -> bool {
        self.return_representation && self.omit.iter().any(|o| o == iri)
    }
}

// --- WANT-DIGEST ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha-256",
            DigestAlgorithm::Sha512 => "sha-512",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sha-256" | "sha256" => Some(DigestAlgorithm::Sha256),
            "sha-512" | "sha512" => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    pub fn digest(self, content: &[u8]) -> String {
        match self {
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(content)),
            DigestAlgorithm::Sha512 => hex::encode(Sha512::digest(content)),
        }
    }
}

/// Supported algorithms named by `Want-Digest`, most wanted first.
/// Fails when the header names none the repository can compute.
pub fn want_digest(value: &str) -> Result<Vec<DigestAlgorithm>> {
    let mut wanted: Vec<(DigestAlgorithm, f32)> = value
        .split(',')
        .filter_map(|entry| {
            let (name, params) = entry.split_once(';').unwrap_or((entry, ""));
            let q = quality(params);
            DigestAlgorithm::from_name(name).filter(|_| q > 0.0).map(|alg| (alg, q))
        })
        .collect();

    if wanted.is_empty() {
        return Err(VersioningError::UnsupportedAlgorithm(value.trim().to_string()));
    }
    wanted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    wanted.dedup_by_key(|(alg, _)| *alg);
    Ok(wanted.into_iter().map(|(alg, _)| alg).collect())
}

/// `Digest` header value for `content`.
pub fn digest_header(algorithms: &[DigestAlgorithm], content: &[u8]) -> String {
    algorithms.iter().map(|alg| format!("{}={}", alg.name(), alg.digest(content))).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RDF: &[&str] = &["text/turtle", "application/ld+json", "application/n-triples"];

    #[test]
    fn negotiation_honours_quality() {
        assert_eq!(negotiate(None, RDF), Some("text/turtle"));
        assert_eq!(negotiate(Some("application/ld+json"), RDF), Some("application/ld+json"));
        assert_eq!(negotiate(Some("text/turtle;q=0.5, application/n-triples"), RDF), Some("application/n-triples"));
        assert_eq!(negotiate(Some("application/*"), RDF), Some("application/ld+json"));
        assert_eq!(negotiate(Some("*/*"), RDF), Some("text/turtle"));
        assert_eq!(negotiate(Some("image/png"), RDF), None);
        assert_eq!(negotiate(Some("*/*, text/turtle;q=0"), RDF), Some("application/ld+json"));
    }

    #[test]
    fn parses_omit_preference() {
        let prefer = Prefer::parse([
            "return=representation; omit=\"http://fedora.info/definitions/v4/repository#ServerManaged\"",
        ]);
        assert!(prefer.omits("http://fedora.info/definitions/v4/repository#ServerManaged"));
        assert_eq!(prefer.handling, Handling::Strict);
    }

    #[test]
    fn parses_lenient_handling() {
        let prefer = Prefer::parse(["handling=lenient; received=\"minimal\""]);
        assert_eq!(prefer.handling, Handling::Lenient);
        assert!(!prefer.return_representation);
    }

    #[test]
    fn want_digest_orders_by_quality() {
        let algs = want_digest("sha-256;q=0.3, SHA-512").unwrap();
        assert_eq!(algs, vec![DigestAlgorithm::Sha512, DigestAlgorithm::Sha256]);
        assert!(want_digest("md5, unknown").is_err());
    }

    #[test]
    fn computes_hex_digests() {
        let header = digest_header(&[DigestAlgorithm::Sha256], b"binary content");
        assert!(header.starts_with("sha-256="));
        assert_eq!(header.len(), "sha-256=".len() + 64);
    }
}
