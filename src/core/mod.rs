pub mod adapter;
pub mod error;
pub mod metadata;
pub mod normalize;
pub mod payload;
pub mod platform;
pub mod relay;
pub mod resolver;
pub mod selector;

pub use adapter::{AdapterRegistry, BackendAdapter};
pub use error::ResolveError;
pub use metadata::{
    Engagement, LinkKind, MediaKind, MediaLink, MediaQuery, MediaRequest, Quality, ResolvedMedia,
    Thumbnail, VideoFormat, VideoMetadata,
};
pub use normalize::{normalize, AdapterOutput};
pub use payload::{CobaltOutcome, FacebookPayload, TieredOutcome, TieredPayload, TikTokPayload};
pub use platform::{classify, Platform};
pub use relay::{Relay, RelayStream};
pub use resolver::Resolver;
pub use selector::{select_format, ytdlp_selector};
