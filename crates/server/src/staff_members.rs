//! Staff member endpoints.
use std::collections::BTreeMap;

use roster::{StaffMemberId, StaffMembers};
use salvo::oapi::extract::{JsonBody, PathParam, QueryParam};
use salvo::prelude::*;

use crate::error::ApiError;
use crate::resources::{
    MovePayload, StaffMemberPage, StaffMemberPayload, StaffMemberResource, invalid_direction,
};

/// Routes of the admin and public staff member resources.
pub fn router() -> Router {
    Router::new()
        .push(
            Router::with_path("staff-members")
                .get(list_staff_members)
                .post(create_staff_member)
                .push(
                    Router::with_path("{id}")
                        .get(show_staff_member)
                        .put(update_staff_member)
                        .patch(update_staff_member)
                        .delete(destroy_staff_member)
                        .push(Router::with_path("move").post(move_staff_member)),
                ),
        )
        .push(
            Router::with_path("public/staff-members")
                .get(list_published_staff_members)
                .push(Router::with_path("{slug}").get(show_published_staff_member)),
        )
}

fn staff(depot: &Depot) -> Result<StaffMembers, ApiError> {
    depot
        .obtain::<StaffMembers>()
        .cloned()
        .map_err(|_| roster::Error::storage("staff member service is not configured").into())
}

fn query_map<const N: usize>(params: [(&str, QueryParam<String, false>); N]) -> BTreeMap<String, String> {
    params
        .into_iter()
        .filter_map(|(key, value)| value.into_inner().map(|value| (key.to_owned(), value)))
        .collect()
}

/// List staff members, drafts included, in display order.
#[endpoint(
    tags("staff members"),
    parameters(
        ("search", description = "Case-insensitive match on name, slug or description."),
        ("status", description = "`all`, `draft` or `published`."),
        ("slug", description = "Exact slug."),
        ("page", description = "Page number, starting at 1."),
        ("per_page", description = "Page size, 1 to 100."),
    )
)]
pub async fn list_staff_members(
    search: QueryParam<String, false>,
    status: QueryParam<String, false>,
    slug: QueryParam<String, false>,
    page: QueryParam<String, false>,
    per_page: QueryParam<String, false>,
    depot: &mut Depot,
) -> Result<Json<StaffMemberPage>, ApiError> {
    let params = query_map([
        ("search", search),
        ("status", status),
        ("slug", slug),
        ("page", page),
        ("per_page", per_page),
    ]);
    let page = staff(depot)?.list(&params).await?;
    Ok(Json(page.into()))
}

/// Create a staff member at the end of the display order.
#[endpoint(tags("staff members"))]
pub async fn create_staff_member(
    body: JsonBody<StaffMemberPayload>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<StaffMemberResource>, ApiError> {
    let created = staff(depot)?.create(body.into_inner().into()).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(created.into()))
}

/// Show one staff member with its image and metadata.
#[endpoint(tags("staff members"))]
pub async fn show_staff_member(
    id: PathParam<u64>,
    depot: &mut Depot,
) -> Result<Json<StaffMemberResource>, ApiError> {
    let detail = staff(depot)?.read(StaffMemberId::new(id.into_inner())).await?;
    Ok(Json(detail.into()))
}

/// Replace the content of a staff member; metadata is merged.
#[endpoint(tags("staff members"))]
pub async fn update_staff_member(
    id: PathParam<u64>,
    body: JsonBody<StaffMemberPayload>,
    depot: &mut Depot,
) -> Result<Json<StaffMemberResource>, ApiError> {
    let detail = staff(depot)?
        .update(StaffMemberId::new(id.into_inner()), body.into_inner().into())
        .await?;
    Ok(Json(detail.into()))
}

/// Move a staff member one place up or down.
///
/// The direction is read from the JSON body ([`MovePayload`]), or from the
/// `direction` query parameter when the body names none.
#[endpoint(tags("staff members"), status_codes(204, 404, 422, 500))]
pub async fn move_staff_member(
    id: PathParam<u64>,
    req: &mut Request,
    depot: &mut Depot,
) -> Result<StatusCode, ApiError> {
    let staff = staff(depot)?;
    let id = StaffMemberId::new(id.into_inner());
    let body = match req.payload().await {
        Ok(body) => MovePayload::direction_in(body),
        Err(e) => {
            tracing::debug!(error = %e, "unreadable move body");
            Err(invalid_direction())
        }
    };
    let direction = match body {
        Ok(direction) => direction.or_else(|| req.query::<String>("direction")),
        Err(errors) => {
            // unknown ids answer 404 before the body is judged
            staff.read(id).await?;
            return Err(errors.into());
        }
    };
    staff.reorder(id, direction.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a staff member with its image link and metadata.
#[endpoint(tags("staff members"), status_codes(204, 404, 500))]
pub async fn destroy_staff_member(
    id: PathParam<u64>,
    depot: &mut Depot,
) -> Result<StatusCode, ApiError> {
    staff(depot)?.destroy(StaffMemberId::new(id.into_inner())).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List published staff members in display order.
#[endpoint(
    tags("public"),
    parameters(
        ("search", description = "Case-insensitive match on name, slug or description."),
        ("page", description = "Page number, starting at 1."),
        ("per_page", description = "Page size, 1 to 100."),
    )
)]
pub async fn list_published_staff_members(
    search: QueryParam<String, false>,
    page: QueryParam<String, false>,
    per_page: QueryParam<String, false>,
    depot: &mut Depot,
) -> Result<Json<StaffMemberPage>, ApiError> {
    let params = query_map([("search", search), ("page", page), ("per_page", per_page)]);
    let page = staff(depot)?.list_published(&params).await?;
    Ok(Json(page.into()))
}

/// Show a published staff member by slug.
#[endpoint(tags("public"))]
pub async fn show_published_staff_member(
    slug: PathParam<String>,
    depot: &mut Depot,
) -> Result<Json<StaffMemberResource>, ApiError> {
    let detail = staff(depot)?.read_published(&slug.into_inner()).await?;
    Ok(Json(detail.into()))
}
