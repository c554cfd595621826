use log::LevelFilter;

/// 初始化 logger；預設 info，`verbose` 時為 debug，`RUST_LOG` 優先
pub fn init(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp_secs()
        .try_init();
}
