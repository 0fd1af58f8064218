//! Target dialect versions and the feature gate.
//!
//! A [`Target`] names the Python dialect the emitted code must run on:
//! an exact version (`"3.6"`), a family (`"2"`, `"3"`), `"sys"` (the
//! newest version this compiler knows), or universal (`""` — the output
//! must run on both 2.7 and the latest 3). Gating is a pure function of
//! the feature table and the target; see [`gate::check`].

pub mod features;
pub mod gate;

pub use features::{Feature, FeatureSpec};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A `major.minor` dialect version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// The newest dialect version this compiler knows about.
pub const LATEST: Version = Version::new(3, 13);

/// The configured target dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Target {
    /// Output must run on both 2.7 and the latest 3.
    Universal,
    /// A whole major family; output must run on every supported minor of
    /// that family (`2` means 2.7; `3` means 3.0 through [`LATEST`]).
    Family(u8),
    Exact(Version),
    /// The newest known version.
    #[default]
    Sys,
}

impl Target {
    /// Parse a target string: `""`, `"sys"`, `"2"`, `"3"`, or `"X.Y"`.
    pub fn parse(s: &str) -> Result<Target, String> {
        match s.trim() {
            "" => Ok(Target::Universal),
            "sys" => Ok(Target::Sys),
            "2" => Ok(Target::Family(2)),
            "3" => Ok(Target::Family(3)),
            other => {
                let mut parts = other.splitn(2, '.');
                let major = parts.next().unwrap_or("");
                let minor = parts.next();
                let parsed = match (major.parse::<u8>(), minor) {
                    (Ok(major @ 2..=3), Some(minor)) => minor
                        .parse::<u8>()
                        .ok()
                        .map(|minor| Target::Exact(Version::new(major, minor))),
                    _ => None,
                };
                parsed.ok_or_else(|| format!("unrecognized target {:?}", other))
            }
        }
    }

    /// The inclusive span of versions emitted code must support.
    pub fn version_span(&self) -> (Version, Version) {
        match self {
            Target::Universal => (Version::new(2, 7), LATEST),
            Target::Family(2) => (Version::new(2, 7), Version::new(2, 7)),
            Target::Family(major) => (Version::new(*major, 0), LATEST),
            Target::Exact(v) => (*v, *v),
            Target::Sys => (LATEST, LATEST),
        }
    }

    /// True when every supported version is at least `version`.
    pub fn at_least(&self, version: Version) -> bool {
        self.version_span().0 >= version
    }

    /// True when the feature is available across the whole version span.
    pub fn supports(&self, spec: &FeatureSpec) -> bool {
        let (lo, hi) = self.version_span();
        lo >= spec.introduced && spec.removed.map_or(true, |removed| hi < removed)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Universal => write!(f, "universal"),
            Target::Family(major) => write!(f, "{}", major),
            Target::Exact(v) => write!(f, "{}", v),
            Target::Sys => write!(f, "sys"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(Target::parse("").unwrap(), Target::Universal);
        assert_eq!(Target::parse("sys").unwrap(), Target::Sys);
        assert_eq!(Target::parse("2").unwrap(), Target::Family(2));
        assert_eq!(Target::parse("3").unwrap(), Target::Family(3));
        assert_eq!(
            Target::parse("3.6").unwrap(),
            Target::Exact(Version::new(3, 6))
        );
        assert_eq!(
            Target::parse("2.7").unwrap(),
            Target::Exact(Version::new(2, 7))
        );
        assert!(Target::parse("4.0").is_err());
        assert!(Target::parse("three").is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(Version::new(3, 10) > Version::new(3, 9));
        assert!(Version::new(3, 0) > Version::new(2, 7));
    }

    #[test]
    fn test_at_least() {
        assert!(Target::Sys.at_least(Version::new(3, 6)));
        assert!(Target::Exact(Version::new(3, 6)).at_least(Version::new(3, 6)));
        assert!(!Target::Exact(Version::new(2, 7)).at_least(Version::new(3, 0)));
        assert!(!Target::Universal.at_least(Version::new(3, 0)));
    }
}
