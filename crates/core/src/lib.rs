//! atelier-core: outfit layering and pose navigation for virtual try-on.
//!
//! The core keeps an ordered history of garment layers, each with a cache of
//! generated pose images, and decides for every intent whether it can be
//! served from that cache or needs a call to the generation gateway.
//!
//! # Public API
//!
//! - [`Session`] -- synchronous state machine (begin/finish halves per intent)
//! - [`Studio`] -- async driver pairing a session with a gateway
//! - [`GenerationGateway`] -- the external image-generation boundary
//! - [`SessionView`] -- derived state for presentation
//! - [`PoseCatalog`], [`Wardrobe`], [`Garment`], [`OutfitLayer`],
//!   [`OutfitHistory`] -- data model

pub mod catalog;
pub mod error;
pub mod gateway;
pub mod image;
pub mod layer;
pub mod navigation;
pub mod session;
pub mod studio;
pub mod view;
pub mod wardrobe;

// ── Convenience re-exports ───────────────────────────────────────────

pub use catalog::{PoseCatalog, DEFAULT_POSE_INSTRUCTIONS};
pub use error::{CatalogError, ImageError, TryOnError};
pub use gateway::{GatewayError, GenerationGateway};
pub use image::{ImageRef, InlineImage};
pub use layer::{OutfitHistory, OutfitLayer};
pub use navigation::{step_target, PoseDirection};
pub use session::{Phase, Session, SkipReason, Start, Transition};
pub use studio::Studio;
pub use view::SessionView;
pub use wardrobe::{default_garments, Garment, Wardrobe};
