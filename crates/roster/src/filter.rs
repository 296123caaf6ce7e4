//! Listing filters and paging parameters.
use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::model::StaffMember;
use crate::publish::Publication;
use crate::validation::{Rules, ValidationErrors};

/// Page size used when none is configured.
pub const DEFAULT_PER_PAGE: u64 = 15;
/// Largest page size a caller may ask for.
pub const MAX_PER_PAGE: u64 = 100;

/// Publication filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Everything.
    #[default]
    All,
    /// Drafts and scheduled members.
    Draft,
    /// Published members.
    Published,
}

impl FromStr for StatusFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            _ => Err(()),
        }
    }
}

/// Predicates applied to a listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filters {
    /// Case-insensitive substring of name, slug or description.
    pub search: Option<String>,
    /// Publication filter.
    pub status: StatusFilter,
    /// Exact slug.
    pub slug: Option<String>,
}

impl Filters {
    /// Returns `true` if `member` passes every filter at `now`.
    pub fn matches(&self, member: &StaffMember, now: DateTime<Utc>) -> bool {
        let status = match self.status {
            StatusFilter::All => true,
            StatusFilter::Draft => member.is_draft(now),
            StatusFilter::Published => member.publication(now) == Publication::Published,
        };
        if !status {
            return false;
        }
        if let Some(slug) = &self.slug
            && member.slug.as_deref() != Some(slug.as_str())
        {
            return false;
        }
        match &self.search {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [
                    Some(member.name.as_str()),
                    member.slug.as_deref(),
                    member.description.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|haystack| haystack.to_lowercase().contains(&needle))
            }
        }
    }
}

/// A filtered, paged listing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    /// Filters.
    pub filters: Filters,
    /// 1-based page number.
    pub page: u64,
    /// Page size.
    pub per_page: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Filters::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ListQuery {
    /// Build a query from request parameters.
    ///
    /// Recognised keys are `search`, `status`, `slug`, `page` and `per_page`;
    /// anything else is ignored. Blank values count as absent.
    pub fn from_params(
        params: &BTreeMap<String, String>,
        default_per_page: u64,
    ) -> Result<Self, ValidationErrors> {
        let param = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let mut errors = ValidationErrors::new();

        let status = param("status");
        Rules::new()
            .one_of(["all", "draft", "published"])
            .validate("status", status, &mut errors);
        let page = positive(param("page"), "page", 1, u64::MAX, &mut errors);
        let per_page = positive(
            param("per_page"),
            "per_page",
            default_per_page.clamp(1, MAX_PER_PAGE),
            MAX_PER_PAGE,
            &mut errors,
        );
        errors.into_result()?;

        Ok(Self {
            filters: Filters {
                search: param("search").map(ToOwned::to_owned),
                status: status.and_then(|s| s.parse().ok()).unwrap_or_default(),
                slug: param("slug").map(ToOwned::to_owned),
            },
            page,
            per_page,
        })
    }

    /// Number of items before this page.
    pub fn offset(&self) -> usize {
        let skipped = self.page.saturating_sub(1).saturating_mul(self.per_page);
        usize::try_from(skipped).unwrap_or(usize::MAX)
    }
}

fn positive(
    value: Option<&str>,
    field: &str,
    default: u64,
    max: u64,
    errors: &mut ValidationErrors,
) -> u64 {
    let Some(value) = value else {
        return default;
    };
    match value.parse::<u64>() {
        Ok(n) if (1..=max).contains(&n) => n,
        Ok(_) => {
            errors.add(field, format!("The {field} must be between 1 and {max}."));
            default
        }
        Err(_) => {
            errors.add(field, format!("The {field} must be an integer."));
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::StaffMemberId;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn member(name: &str, published_at: Option<DateTime<Utc>>) -> StaffMember {
        let now = Utc::now();
        StaffMember {
            id: StaffMemberId::new(1),
            name: name.into(),
            slug: Some(slug::slugify(name)),
            description: Some("Teaches the violin".into()),
            position: 0,
            published_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_defaults() {
        let query = ListQuery::from_params(&params(&[("unknown", "x")]), 25).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 25);
        assert_eq!(query.filters, Filters::default());
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_malformed_params() {
        let errors = ListQuery::from_params(
            &params(&[("status", "archived"), ("page", "0"), ("per_page", "many")]),
            15,
        )
        .unwrap_err();
        assert!(errors.contains("status"));
        assert!(errors.contains("page"));
        assert!(errors.contains("per_page"));

        let errors = ListQuery::from_params(&params(&[("per_page", "101")]), 15).unwrap_err();
        assert_eq!(
            errors.get("per_page").unwrap(),
            ["The per_page must be between 1 and 100."]
        );
    }

    #[test]
    fn test_offset() {
        let query = ListQuery::from_params(&params(&[("page", "3"), ("per_page", "10")]), 15).unwrap();
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn test_matches() {
        let now = Utc::now();
        let draft = member("Jane Doe", None);
        let live = member("John Roe", Some(now - Duration::days(1)));

        let filters = Filters {
            search: Some("VIOLIN".into()),
            ..Filters::default()
        };
        assert!(filters.matches(&draft, now));

        let filters = Filters {
            status: StatusFilter::Published,
            ..Filters::default()
        };
        assert!(!filters.matches(&draft, now));
        assert!(filters.matches(&live, now));

        let filters = Filters {
            status: StatusFilter::Draft,
            slug: Some("jane-doe".into()),
            ..Filters::default()
        };
        assert!(filters.matches(&draft, now));
        assert!(!filters.matches(&live, now));
    }
}
