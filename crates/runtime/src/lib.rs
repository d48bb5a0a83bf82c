mod config;
pub mod logging;

pub use config::{
    DEFAULT_MAX_QUERY_DEPTH, GALLERY_FILE_NAME, MAX_QUERY_DEPTH_CEILING, MAX_QUERY_DEPTH_ENV,
    PROGRAM_LOG_LEVEL, PROGRAM_NAME, data_dir, default_gallery_path, max_query_depth, xdg_or_home,
};

pub use logging::init;
