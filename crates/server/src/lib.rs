//! HTTP API for the roster back office.
//!
//! Admin routes live under `/staff-members`, read-only public routes under
//! `/public/staff-members`. The OpenAPI document is served at
//! `/api-doc/openapi.json` and browsable at `/swagger-ui`.
//!
//! ```no_run
//! use roster_server::config::Config;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let staff = roster_server::staff_members_from(&config).await?;
//! let service = roster_server::service(roster_server::router(staff, config.max_body_size));
//! # let _ = service;
//! # Ok(())
//! # }
//! ```
use std::path::Path;
use std::sync::Arc;

use roster::media::Media;
use roster::{MemoryMediaLibrary, MemoryStore, StaffMembers};
use salvo::catch_panic::CatchPanic;
use salvo::logging::Logger;
use salvo::oapi::swagger_ui::SwaggerUi;
use salvo::oapi::OpenApi;
use salvo::prelude::*;
use salvo::size_limiter;

pub mod config;
pub mod error;
pub mod logging;
pub mod resources;
pub mod staff_members;

use config::{Config, ConfigError};

/// Path of the OpenAPI document.
pub const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Build the application router around `staff`.
///
/// Request bodies above `max_body_size` bytes are rejected with 413.
pub fn router(staff: StaffMembers, max_body_size: u64) -> Router {
    let router = Router::new()
        .hoop(affix_state::inject(staff))
        .hoop(size_limiter::max_size(max_body_size))
        .push(staff_members::router());

    let doc = OpenApi::new("roster", env!("CARGO_PKG_VERSION")).merge_router(&router);
    router.unshift(doc.into_router(OPENAPI_PATH)).unshift(
        SwaggerUi::new(OPENAPI_PATH)
            .title("Roster - SwaggerUI")
            .into_router("/swagger-ui"),
    )
}

/// Wrap `router` in a service with request logging and panic recovery.
pub fn service(router: Router) -> Service {
    Service::new(router).hoop(Logger::new()).hoop(CatchPanic::new())
}

/// Build the staff member operations described by `config`.
pub async fn staff_members_from(config: &Config) -> Result<StaffMembers, ConfigError> {
    let media = match &config.media {
        Some(path) => load_media(path).await?,
        None => MemoryMediaLibrary::new(),
    };
    let rules = config.meta_rule_set()?;
    Ok(
        StaffMembers::new(Arc::new(MemoryStore::new()), Arc::new(media))
            .with_meta_rules(Arc::new(rules))
            .with_per_page(config.per_page),
    )
}

/// Load a media library from a JSON list of media records.
pub async fn load_media(path: &Path) -> Result<MemoryMediaLibrary, ConfigError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ConfigError::MediaRead {
        path: path.to_owned(),
        source,
    })?;
    let media: Vec<Media> =
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::MediaParse {
            path: path.to_owned(),
            source,
        })?;
    tracing::info!(path = %path.display(), count = media.len(), "media library loaded");
    Ok(MemoryMediaLibrary::with_media(media))
}
