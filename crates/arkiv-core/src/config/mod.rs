mod defaults;
mod deserialize;
mod resolve;
mod types;
mod util;

pub use self::defaults::{parse_human_duration, MAX_WORKERS};
pub use self::resolve::{
    default_config_search_paths, load_and_resolve, minimal_config_template, parse_config,
    resolve_config_path, ConfigSource, CONFIG_ENV_VAR,
};
pub use self::types::{
    ArkivConfig, LocatorConfig, SourceEntry, SourceKind, TransferConfig, ZeroSizePolicy,
};
pub use self::util::expand_tilde;
