pub mod app_config;
pub mod carousel;
pub mod config;
pub mod error;
pub mod geo;
pub mod pipeline;
pub mod reply;
pub mod retry;
pub mod static_map;
pub mod zoom;

pub use app_config::{AppConfig, DatabaseEndpoint};
pub use carousel::{format_entries, format_entry, CarouselEntry, LinkAction};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, QueryError};
pub use geo::{rank_hotspots, Hotspot, LocationInput, RankedCandidate};
pub use pipeline::{HotspotStore, LocationReply, LocationReplier};
pub use reply::{assemble_reply, OutboundMessage};
pub use retry::retry_with_backoff;
pub use static_map::{MapRenderSpec, Marker};
pub use zoom::estimate_zoom;
