mod settings;

pub use settings::{
    ChatApiConfig, ConnectivityConfig, CoordinatorConfig, LogConfig, ResyncConfig,
    ServerConfig, Settings, StorageConfig,
};
