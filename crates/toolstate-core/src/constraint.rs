use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::version::ToolVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Compatible,
    Equal,
    NotEqual,
    LessEq,
    GreaterEq,
    Less,
    Greater,
    Arbitrary,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compatible => "~=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessEq => "<=",
            Self::GreaterEq => ">=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::Arbitrary => "===",
        }
    }

    // Longest spellings first so `===` is not read as `==`.
    fn split(clause: &str) -> Option<(Self, &str)> {
        const ORDERED: [Operator; 8] = [
            Operator::Arbitrary,
            Operator::Compatible,
            Operator::Equal,
            Operator::NotEqual,
            Operator::LessEq,
            Operator::GreaterEq,
            Operator::Less,
            Operator::Greater,
        ];
        ORDERED
            .iter()
            .find_map(|op| clause.strip_prefix(op.as_str()).map(|rest| (*op, rest)))
    }
}

#[derive(Debug, Clone)]
pub struct Clause {
    pub operator: Operator,
    pub version: Option<ToolVersion>,
    pub wildcard: Option<Vec<u64>>,
    text: String,
}

impl Clause {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
        let (operator, operand) =
            Operator::split(&compact).ok_or_else(|| anyhow!("missing comparison operator"))?;
        if operand.is_empty() {
            bail!("missing version after '{}'", operator.as_str());
        }

        if operator == Operator::Arbitrary {
            return Ok(Self {
                operator,
                version: None,
                wildcard: None,
                text: operand.to_string(),
            });
        }

        if let Some(prefix) = operand.strip_suffix(".*") {
            if !matches!(operator, Operator::Equal | Operator::NotEqual) {
                bail!("wildcards are only allowed with '==' and '!='");
            }
            let prefix = ToolVersion::parse(prefix)?;
            if !prefix.is_stable() {
                bail!("wildcard prefix must be a plain release");
            }
            return Ok(Self {
                operator,
                version: None,
                wildcard: Some(prefix.release().to_vec()),
                text: operand.to_string(),
            });
        }

        let version = ToolVersion::parse(operand)?;
        if operator == Operator::Compatible && version.release().len() < 2 {
            bail!("'~=' requires at least two release segments");
        }
        Ok(Self {
            operator,
            version: Some(version),
            wildcard: None,
            text: operand.to_string(),
        })
    }

    pub fn matches(&self, candidate: &ToolVersion) -> bool {
        if let Some(prefix) = &self.wildcard {
            let hit = candidate.release_starts_with(prefix);
            return match self.operator {
                Operator::NotEqual => !hit,
                _ => hit,
            };
        }

        let Some(version) = &self.version else {
            return candidate.as_str().eq_ignore_ascii_case(&self.text);
        };

        match self.operator {
            Operator::Equal => candidate == version,
            Operator::NotEqual => candidate != version,
            Operator::LessEq => candidate <= version,
            Operator::GreaterEq => candidate >= version,
            Operator::Less => {
                candidate < version
                    && !(candidate.is_prerelease()
                        && !version.is_prerelease()
                        && candidate.same_release(version))
            }
            Operator::Greater => {
                candidate > version
                    && !(candidate.is_postrelease()
                        && !version.is_postrelease()
                        && candidate.same_release(version))
            }
            Operator::Compatible => {
                let release = version.release();
                candidate >= version && candidate.release_starts_with(&release[..release.len() - 1])
            }
            Operator::Arbitrary => false,
        }
    }

    fn names_prerelease(&self) -> bool {
        self.version
            .as_ref()
            .is_some_and(|version| version.is_prerelease())
    }
}

/// A version specifier set such as `>=2.0,<3` or `~=1.4`.
///
/// Equality is textual, ignoring whitespace: two constraints that select the
/// same versions but are spelled differently are not equal.
#[derive(Debug, Clone)]
pub struct Constraint {
    raw: String,
    clauses: Vec<Clause>,
}

impl Constraint {
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            bail!("version constraint must not be empty");
        }
        let clauses = raw
            .split(',')
            .map(|clause| {
                Clause::parse(clause)
                    .with_context(|| format!("invalid version constraint '{raw}'"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            raw: raw.to_string(),
            clauses,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// The whitespace-free spelling used for comparisons.
    pub fn normalized(&self) -> String {
        normalize_constraint_text(&self.raw)
    }

    /// Pre-releases only match when a clause names one explicitly.
    pub fn matches(&self, candidate: &ToolVersion) -> bool {
        self.allows(candidate, false)
    }

    /// Like [`Constraint::matches`], with pre-releases also admitted when
    /// `include_prereleases` is set.
    pub fn allows(&self, candidate: &ToolVersion, include_prereleases: bool) -> bool {
        let allow_prereleases =
            include_prereleases || self.clauses.iter().any(Clause::names_prerelease);
        self.matches_with_prereleases(candidate, allow_prereleases)
    }

    pub fn matches_with_prereleases(&self, candidate: &ToolVersion, prereleases: bool) -> bool {
        if candidate.is_prerelease() && !prereleases {
            return false;
        }
        self.clauses.iter().all(|clause| clause.matches(candidate))
    }

    /// Compares against the textual constraint a tool was installed with.
    pub fn same_text(&self, recorded: &str) -> bool {
        self.normalized() == normalize_constraint_text(recorded)
    }
}

pub fn normalize_constraint_text(raw: &str) -> String {
    raw.chars().filter(|ch| !ch.is_whitespace()).collect()
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Constraint {}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Constraint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Constraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Constraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
