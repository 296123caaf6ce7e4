//! Scheduled publication.
//!
//! A staff member is visible once its `published_at` instant has passed. A
//! missing instant keeps it a draft, a future one schedules it.
use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use serde::Serialize;

use crate::model::StaffMember;

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Publication state derived from `published_at` at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Publication {
    /// No publication instant.
    Draft,
    /// Publication instant in the future.
    Scheduled,
    /// Publication instant reached.
    Published,
}

impl Publication {
    /// State of an entity with the given `published_at`, seen at `now`.
    pub fn of(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match published_at {
            None => Self::Draft,
            Some(at) if at > now => Self::Scheduled,
            Some(_) => Self::Published,
        }
    }

    /// Only published entities show up in default listings.
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Published)
    }

    /// Lower-case name as used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Published => "published",
        }
    }
}

impl Display for Publication {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a date or date-time.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]` (with a space or `T`, taken as
/// UTC) and a bare `YYYY-MM-DD`, which means midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Schedule `member` for `at`, or turn it back into a draft with `None`.
///
/// Stored instants are truncated to whole seconds.
pub fn publish_at(member: &mut StaffMember, at: Option<DateTime<Utc>>) {
    member.published_at = at.map(|at| at.trunc_subsecs(0));
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::model::StaffMemberId;

    fn member() -> StaffMember {
        let now = Utc::now();
        StaffMember {
            id: StaffMemberId::new(1),
            name: "Jane Doe".into(),
            slug: Some("jane-doe".into()),
            description: None,
            position: 0,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_publication_states() {
        let now = Utc::now();
        assert_eq!(Publication::of(None, now), Publication::Draft);
        assert_eq!(
            Publication::of(Some(now + Duration::hours(1)), now),
            Publication::Scheduled
        );
        assert_eq!(Publication::of(Some(now), now), Publication::Published);
        assert!(!Publication::Scheduled.is_visible());
        assert_eq!(Publication::Published.to_string(), "published");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T09:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T11:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 09:30:00"), Some(expected));
        assert_eq!(parse_timestamp(" 2024-03-01 09:30 "), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("next tuesday"), None);
        assert_eq!(parse_timestamp("2024-13-01"), None);
    }

    #[test]
    fn test_publish_at_round_trip() {
        let mut member = member();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap() + Duration::milliseconds(750);
        publish_at(&mut member, Some(at));
        assert_eq!(
            member.published_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap())
        );
        assert!(!member.is_draft(at));

        publish_at(&mut member, None);
        assert!(member.is_draft(at));
    }
}
