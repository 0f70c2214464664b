use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const SEPARATORS: &[char] = &['-', '_', '.'];

const PRE_TAGS: &[(&str, &str)] = &[
    ("alpha", "a"),
    ("beta", "b"),
    ("preview", "rc"),
    ("pre", "rc"),
    ("rc", "rc"),
    ("a", "a"),
    ("b", "b"),
    ("c", "rc"),
];
const POST_TAGS: &[(&str, &str)] = &[("post", "post"), ("rev", "post"), ("r", "post")];
const DEV_TAGS: &[(&str, &str)] = &[("dev", "dev")];

/// A Python package version (`1.0`, `2.1.3`, `1.0rc1`, `1.0.post1`, `1.0.dev2`).
///
/// Ordering follows PEP 440: release segments, then pre-release phase, then
/// post release, then dev release, so `1.0.dev1 < 1.0a1.dev1 < 1.0a1 < 1.0 <
/// 1.0.post1.dev1 < 1.0.post1 < 1.0.0.1`. The text as written is kept for
/// display.
#[derive(Debug, Clone)]
pub struct ToolVersion {
    raw: String,
    release: Vec<u64>,
    key: SortKey,
    pre: Option<(&'static str, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
}

impl ToolVersion {
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            bail!("version must not be empty");
        }
        let lowered = raw.to_ascii_lowercase();
        let public = lowered.split('+').next().unwrap_or_default();
        let public = public.strip_prefix('v').unwrap_or(public);

        let body = match public.split_once('!') {
            Some((epoch, body)) => {
                let epoch: u64 = epoch
                    .parse()
                    .with_context(|| format!("invalid epoch in version '{raw}'"))?;
                if epoch != 0 {
                    bail!("version epochs are not supported: '{raw}'");
                }
                body
            }
            None => public,
        };

        let (release, mut rest) =
            parse_release(body).with_context(|| format!("invalid version '{raw}'"))?;

        let pre = match take_tagged(rest, PRE_TAGS) {
            Some((tag, number, after)) => {
                rest = after;
                Some((tag, number))
            }
            None => None,
        };

        let post = if let Some((_, number, after)) = take_tagged(rest, POST_TAGS) {
            rest = after;
            Some(number)
        } else if let Some(after) = rest.strip_prefix('-') {
            let (number, after) = take_number(after);
            let number = number.ok_or_else(|| anyhow!("invalid version '{raw}'"))?;
            rest = after;
            Some(number)
        } else {
            None
        };

        let dev = match take_tagged(rest, DEV_TAGS) {
            Some((_, number, after)) => {
                rest = after;
                Some(number)
            }
            None => None,
        };

        if !rest.is_empty() {
            bail!("invalid version '{raw}': unexpected trailing '{rest}'");
        }

        let key = SortKey::new(&release, pre, post, dev);
        Ok(Self {
            raw: raw.to_string(),
            release,
            key,
            pre,
            post,
            dev,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_devrelease(&self) -> bool {
        self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    /// A plain final release: no pre, dev, or post segment.
    pub fn is_stable(&self) -> bool {
        self.pre.is_none() && self.dev.is_none() && self.post.is_none()
    }

    /// Compares only the release segments, zero padded.
    pub fn same_release(&self, other: &Self) -> bool {
        let len = self.release.len().max(other.release.len());
        (0..len).all(|idx| {
            self.release.get(idx).copied().unwrap_or(0)
                == other.release.get(idx).copied().unwrap_or(0)
        })
    }

    pub fn release_starts_with(&self, prefix: &[u64]) -> bool {
        prefix
            .iter()
            .enumerate()
            .all(|(idx, part)| self.release.get(idx).copied().unwrap_or(0) == *part)
    }
}

fn parse_release(body: &str) -> anyhow::Result<(Vec<u64>, &str)> {
    let mut release = Vec::new();
    let mut rest = body;
    loop {
        let (number, after) = take_number(rest);
        let Some(number) = number else {
            bail!("release segment must be numeric");
        };
        release.push(number);
        rest = after;
        match rest.strip_prefix('.') {
            Some(after) if after.starts_with(|ch: char| ch.is_ascii_digit()) => rest = after,
            _ => break,
        }
    }
    Ok((release, rest))
}

fn take_number(input: &str) -> (Option<u64>, &str) {
    let digits = input.len() - input.trim_start_matches(|ch: char| ch.is_ascii_digit()).len();
    if digits == 0 {
        return (None, input);
    }
    (input[..digits].parse().ok(), &input[digits..])
}

fn take_tagged<'a>(
    input: &'a str,
    tags: &[(&str, &'static str)],
) -> Option<(&'static str, u64, &'a str)> {
    let trimmed = input.strip_prefix(SEPARATORS).unwrap_or(input);
    for (spelling, canonical) in tags {
        let Some(after) = trimmed.strip_prefix(spelling) else {
            continue;
        };
        let after_sep = after.strip_prefix(SEPARATORS).unwrap_or(after);
        return match take_number(after_sep) {
            (Some(number), rest) => Some((canonical, number, rest)),
            (None, _) => Some((canonical, 0, after)),
        };
    }
    None
}

/// PEP 440 sort key.
///
/// The leading three release segments order through [`semver::Version`];
/// any further segments follow with trailing zeros dropped so `1.0` and
/// `1.0.0.0` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct SortKey {
    base: Version,
    extra_release: Vec<u64>,
    pre: PreKey,
    post: Option<u64>,
    dev: DevKey,
}

/// A bare dev release sorts ahead of every pre-release of the same release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum PreKey {
    DevOnly,
    Tagged(u8, u64),
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum DevKey {
    Dev(u64),
    None,
}

impl SortKey {
    fn new(
        release: &[u64],
        pre: Option<(&'static str, u64)>,
        post: Option<u64>,
        dev: Option<u64>,
    ) -> Self {
        let base = Version::new(
            release.first().copied().unwrap_or(0),
            release.get(1).copied().unwrap_or(0),
            release.get(2).copied().unwrap_or(0),
        );
        let mut extra_release: Vec<u64> = release.iter().skip(3).copied().collect();
        while extra_release.last() == Some(&0) {
            extra_release.pop();
        }

        let pre = match (pre, post, dev) {
            (Some((tag, number)), _, _) => PreKey::Tagged(pre_rank(tag), number),
            (None, None, Some(_)) => PreKey::DevOnly,
            (None, _, _) => PreKey::Final,
        };
        let dev = dev.map_or(DevKey::None, DevKey::Dev);

        Self {
            base,
            extra_release,
            pre,
            post,
            dev,
        }
    }
}

fn pre_rank(tag: &str) -> u8 {
    match tag {
        "a" => 0,
        "b" => 1,
        _ => 2,
    }
}

impl PartialEq for ToolVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ToolVersion {}

impl PartialOrd for ToolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ToolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Hash for ToolVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ToolVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ToolVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ToolVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
