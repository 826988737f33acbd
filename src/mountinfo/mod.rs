mod detect;
mod error;
mod parser;

pub use detect::{CgroupMount, detect_cgroup_v1_mounts};
pub use error::{Error, Result};
pub use parser::{MountInfo, ParseError, parse_mount_info_line};
