//! Shorts vs. long-form classification

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EstimatorError;

/// Videos at or under this many seconds are shorts
pub const DEFAULT_SHORTS_MAX_DURATION_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoKind {
    Short,
    LongForm,
}

/// Classify a video by duration alone.
///
/// A zero duration (live streams, premieres not yet processed) falls on the
/// short side of the threshold.
pub fn classify(duration_seconds: u64, shorts_max_duration_secs: u64) -> VideoKind {
    if duration_seconds <= shorts_max_duration_secs {
        VideoKind::Short
    } else {
        VideoKind::LongForm
    }
}

/// Which kinds of video make up a cohort.
///
/// Serde goes through [`FromStr`] and [`fmt::Display`], so requests accept the
/// same spellings as configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KindFilter {
    #[default]
    All,
    Short,
    LongForm,
}

impl KindFilter {
    pub fn admits(self, kind: VideoKind) -> bool {
        match self {
            Self::All => true,
            Self::Short => kind == VideoKind::Short,
            Self::LongForm => kind == VideoKind::LongForm,
        }
    }
}

impl fmt::Display for KindFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Short => "short",
            Self::LongForm => "long_form",
        };
        f.write_str(name)
    }
}

impl FromStr for KindFilter {
    type Err = EstimatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "all" | "" => Ok(Self::All),
            "short" | "shorts" => Ok(Self::Short),
            "long_form" | "long" | "longform" => Ok(Self::LongForm),
            _ => Err(EstimatorError::InvalidKindFilter(s.to_string())),
        }
    }
}

impl TryFrom<String> for KindFilter {
    type Error = EstimatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KindFilter> for String {
    fn from(filter: KindFilter) -> Self {
        filter.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        assert_eq!(classify(59, 60), VideoKind::Short);
        assert_eq!(classify(60, 60), VideoKind::Short);
        assert_eq!(classify(61, 60), VideoKind::LongForm);
        assert_eq!(classify(0, 60), VideoKind::Short);
    }

    #[test]
    fn test_filter_admits() {
        assert!(KindFilter::All.admits(VideoKind::Short));
        assert!(KindFilter::All.admits(VideoKind::LongForm));
        assert!(KindFilter::LongForm.admits(VideoKind::LongForm));
        assert!(!KindFilter::LongForm.admits(VideoKind::Short));
        assert!(!KindFilter::Short.admits(VideoKind::LongForm));
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("shorts".parse::<KindFilter>().unwrap(), KindFilter::Short);
        assert_eq!("long-form".parse::<KindFilter>().unwrap(), KindFilter::LongForm);
        assert_eq!("ALL".parse::<KindFilter>().unwrap(), KindFilter::All);
        assert!("reels".parse::<KindFilter>().is_err());
        assert_eq!(KindFilter::LongForm.to_string(), "long_form");
    }

    #[test]
    fn test_filter_serde_uses_same_spellings() {
        let parsed: KindFilter = serde_json::from_str(r#""long-form""#).unwrap();
        assert_eq!(parsed, KindFilter::LongForm);
        let parsed: KindFilter = serde_json::from_str(r#""shorts""#).unwrap();
        assert_eq!(parsed, KindFilter::Short);
        assert!(serde_json::from_str::<KindFilter>(r#""reels""#).is_err());
        assert_eq!(
            serde_json::to_string(&KindFilter::LongForm).unwrap(),
            r#""long_form""#
        );
    }
}
