//! Config files, data directory layout and the typed settings built from them.

pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

pub use paths::AppPaths;
pub use service::{ConfigLayers, ConfigService};
pub use settings::{
    AppSettings, ChatSettings, LlmSettings, RetrievalSettings, ServerSettings, StoreSettings,
};
