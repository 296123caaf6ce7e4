//! Staff member domain for the roster back office.
//!
//! Staff members form one ordered list. Each has a name, an optional slug and
//! description, a position, a publication instant, one image from the media
//! library and free-form metadata. [`StaffMembers`] implements the operations
//! the admin API exposes on top of three seams:
//!
//! - [`StaffStore`] persists records, image links and metadata transactionally;
//! - [`MediaLibrary`] answers which media exist;
//! - [`MetaRules`] decides how metadata is validated.
//!
//! [`MemoryStore`] and [`MemoryMediaLibrary`] implement the first two in
//! memory.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use roster::media::{Media, MediaId, MemoryMediaLibrary};
//! use roster::{MemoryStore, StaffMemberInput, StaffMembers};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> roster::Result<()> {
//! let media = MemoryMediaLibrary::with_media([Media {
//!     id: MediaId::new(7),
//!     file_name: "jane.jpg".into(),
//!     mime_type: "image/jpeg".into(),
//!     url: "/media/7/jane.jpg".into(),
//! }]);
//! let staff = StaffMembers::new(Arc::new(MemoryStore::new()), Arc::new(media));
//!
//! let jane = staff
//!     .create(StaffMemberInput {
//!         name: Some("Jane Doe".into()),
//!         image: Some(MediaId::new(7)),
//!         ..Default::default()
//!     })
//!     .await?;
//! assert_eq!(jane.member.position, 0);
//! assert_eq!(jane.member.slug.as_deref(), Some("jane-doe"));
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
pub mod filter;
pub mod media;
pub mod memory;
pub mod meta;
pub mod model;
pub mod publish;
pub mod service;
pub mod store;
pub mod validation;

pub use error::{Error, Result};
pub use filter::{Filters, ListQuery, StatusFilter};
pub use media::{MediaLibrary, MemoryMediaLibrary};
pub use memory::MemoryStore;
pub use meta::{MetaRuleSet, MetaRules};
pub use model::{Direction, Page, Shift, StaffMember, StaffMemberDetail, StaffMemberId};
pub use publish::Publication;
pub use service::{StaffMemberInput, StaffMembers};
pub use store::{StaffStore, Visibility};
pub use validation::{Rules, ValidationErrors};
