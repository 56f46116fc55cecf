mod config;

pub use self::config::{
    EpochSettings, LoggingSettings, RpcSettings, Settings, SourceSettings, StorageSettings,
};
