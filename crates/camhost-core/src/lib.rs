//! camhost 核心库：安装流水线、服务注册与远程脚本启动器

pub mod account;
pub mod archive;
pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod host;
pub mod input;
pub mod install;
pub mod launcher;
pub mod packages;
pub mod precheck;
pub mod service;
pub mod stream_config;
pub mod telemetry;
pub mod unit;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{CamhostConfig, ServiceIdentity};
pub use constants::*;
pub use error::{CoreError, Result};
