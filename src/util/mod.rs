mod format;
mod path;

pub use format::{format_size, format_timestamp, unix_now};
pub use path::{base_name, normalize_path, path_string};
