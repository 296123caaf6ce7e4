//! Request and response bodies of the staff member API.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use roster::media::{Media, MediaId};
use roster::{Page, StaffMemberDetail, StaffMemberInput, ValidationErrors};
use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Image attached to a staff member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageResource {
    /// Media library id.
    pub id: u64,
    /// Original file name.
    pub file_name: String,
    /// MIME type.
    pub mime_type: String,
    /// Public URL.
    pub url: String,
}

impl From<Media> for ImageResource {
    fn from(media: Media) -> Self {
        Self {
            id: media.id.get(),
            file_name: media.file_name,
            mime_type: media.mime_type,
            url: media.url,
        }
    }
}

/// A staff member as the API renders it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffMemberResource {
    /// Immutable id.
    #[salvo(schema(example = 1))]
    pub id: u64,
    /// Display name.
    #[salvo(schema(example = "Jane Doe"))]
    pub name: String,
    /// Public lookup key.
    pub slug: Option<String>,
    /// Biography.
    pub description: Option<String>,
    /// Place in the display order, starting at zero.
    pub position: u32,
    /// Publication instant.
    pub published_at: Option<DateTime<Utc>>,
    /// `draft`, `scheduled` or `published`.
    #[salvo(schema(example = "published"))]
    pub status: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Attached image.
    pub image: Option<ImageResource>,
    /// Metadata entries.
    pub meta: BTreeMap<String, String>,
}

impl StaffMemberResource {
    /// Render `detail` with its publication status as of `now`.
    pub fn at(detail: StaffMemberDetail, now: DateTime<Utc>) -> Self {
        let StaffMemberDetail { member, image, meta } = detail;
        Self {
            id: member.id.get(),
            status: member.publication(now).as_str().to_owned(),
            name: member.name,
            slug: member.slug,
            description: member.description,
            position: member.position,
            published_at: member.published_at,
            created_at: member.created_at,
            updated_at: member.updated_at,
            image: image.map(Into::into),
            meta,
        }
    }
}

impl From<StaffMemberDetail> for StaffMemberResource {
    fn from(detail: StaffMemberDetail) -> Self {
        Self::at(detail, Utc::now())
    }
}

/// One page of staff members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffMemberPage {
    /// Members on this page, in position order.
    pub items: Vec<StaffMemberResource>,
    /// Page number, starting at one.
    pub page: u64,
    /// Page size.
    pub per_page: u64,
    /// Number of matching members across all pages.
    pub total: u64,
    /// Number of the last page, at least one.
    pub last_page: u64,
}

impl From<Page<StaffMemberDetail>> for StaffMemberPage {
    fn from(page: Page<StaffMemberDetail>) -> Self {
        let now = Utc::now();
        let last_page = page.last_page();
        Self {
            items: page
                .items
                .into_iter()
                .map(|detail| StaffMemberResource::at(detail, now))
                .collect(),
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            last_page,
        }
    }
}

/// Body of a create or update request.
///
/// Every field is optional at the JSON level so that missing values surface as
/// validation messages instead of deserialization failures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct StaffMemberPayload {
    /// Display name, required.
    #[salvo(schema(example = "Jane Doe"))]
    pub name: Option<String>,
    /// Public lookup key; derived from the name when blank.
    pub slug: Option<String>,
    /// Biography.
    pub description: Option<String>,
    /// Media library id of the image, required.
    #[serde(alias = "image_id", alias = "image")]
    pub image_id: Option<u64>,
    /// Publication instant; blank or absent keeps the member a draft.
    #[serde(alias = "published_at")]
    #[salvo(schema(example = "2024-01-01 09:00:00"))]
    pub published_at: Option<String>,
    /// Metadata changes; `null` removes an entry.
    pub meta: BTreeMap<String, Option<String>>,
}

impl From<StaffMemberPayload> for StaffMemberInput {
    fn from(payload: StaffMemberPayload) -> Self {
        Self {
            name: payload.name,
            slug: payload.slug,
            description: payload.description,
            image: payload.image_id.map(MediaId::new),
            published_at: payload.published_at,
            meta: payload.meta,
        }
    }
}

/// Body of a move request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct MovePayload {
    /// `up` or `down`.
    #[salvo(schema(example = "up"))]
    pub direction: Option<String>,
}

impl MovePayload {
    /// The direction named by a raw move body.
    ///
    /// A blank body, or an object without a `direction` (or with `null`), names
    /// none. A body that is not a JSON object, or a direction that is not a
    /// string, is invalid.
    pub fn direction_in(body: &[u8]) -> Result<Option<String>, ValidationErrors> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(mut fields)) => match fields.remove("direction") {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(direction)) => Ok(Some(direction)),
                Some(_) => Err(invalid_direction()),
            },
            _ => Err(invalid_direction()),
        }
    }
}

/// Validation failure for a move body that names no usable direction.
pub fn invalid_direction() -> ValidationErrors {
    ValidationErrors::single("direction", "The selected direction is invalid.")
}
