//! Mapping of domain errors onto HTTP responses.
use std::collections::BTreeMap;

use salvo::oapi::{self, Components, EndpointOutRegister, Operation, ToSchema};
use salvo::prelude::*;
use serde::{Deserialize, Serialize};

/// Message of every validation failure response.
pub const INVALID_DATA: &str = "The given data was invalid.";

/// JSON body of an error response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human readable summary.
    pub message: String,
    /// Messages per failing field, present on validation failures only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, Vec<String>>,
}

/// Error returned by the staff member endpoints.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub roster::Error);

impl ApiError {
    /// Status code the error renders with.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            roster::Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body the error renders with.
    pub fn body(&self) -> ErrorBody {
        match &self.0 {
            roster::Error::Validation(errors) => ErrorBody {
                message: INVALID_DATA.to_owned(),
                errors: errors
                    .iter()
                    .map(|(field, messages)| (field.clone(), messages.clone()))
                    .collect(),
            },
            e if e.is_not_found() => ErrorBody {
                message: e.to_string(),
                errors: BTreeMap::new(),
            },
            // storage details stay in the log
            _ => ErrorBody {
                message: "Server Error".to_owned(),
                errors: BTreeMap::new(),
            },
        }
    }
}

impl From<roster::ValidationErrors> for ApiError {
    fn from(errors: roster::ValidationErrors) -> Self {
        Self(errors.into())
    }
}

#[async_trait]
impl Writer for ApiError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        res.status_code(status);
        res.render(Json(self.body()));
    }
}

impl EndpointOutRegister for ApiError {
    fn register(components: &mut Components, operation: &mut Operation) {
        for (code, description) in [
            ("404", "Staff member not found"),
            ("422", INVALID_DATA),
            ("500", "Storage failure"),
        ] {
            operation.responses.insert(
                code,
                oapi::Response::new(description)
                    .add_content("application/json", ErrorBody::to_schema(components)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use roster::{StaffMemberId, ValidationErrors};

    use super::*;

    #[test]
    fn test_status_and_body() {
        let invalid = ApiError::from(ValidationErrors::single("name", "The name field is required."));
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = invalid.body();
        assert_eq!(body.message, INVALID_DATA);
        assert_eq!(body.errors["name"], vec!["The name field is required.".to_owned()]);

        let missing = ApiError(roster::Error::NotFound(StaffMemberId::new(3)));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert!(missing.body().errors.is_empty());

        let broken = ApiError(roster::Error::storage("disk on fire"));
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!broken.body().message.contains("disk"));
    }
}
