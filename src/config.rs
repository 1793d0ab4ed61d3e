use crate::{
    cache::CacheKeyMode,
    exception::Exception,
    param::*,
    registry::Endpoint,
    resolver::ResponseSource,
    session::SessionConfig,
};

use num_cpus;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::warn;
use std::fs::File;
use std::io::prelude::*;
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_enable_cache")]
    enable_cache: bool,
    #[serde(default)]
    cache_key: CacheKeyMode,
    #[serde(default)]
    read_timeout_secs: u64,
    #[serde(default = "default_max_request_bytes")]
    max_request_bytes: usize,
    #[serde(default)]
    log: LogConfig,
    #[serde(default)]
    endpoints: Vec<EndpointConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_file")]
    file: String,
    #[serde(default = "default_program_name")]
    program_name: String,
    #[serde(default = "default_syslog")]
    syslog: bool,
    #[serde(default = "default_log_level")]
    level: String,
    /// 指定后改用 log4rs 的 YAML 配置文件，忽略上面的字段
    #[serde(default)]
    config_file: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EndpointConfig {
    path: String,
    response: String,
    #[serde(default = "default_method")]
    method: HttpRequestMethod,
    #[serde(default)]
    content_type: Option<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_local() -> bool {
    true
}

fn default_enable_cache() -> bool {
    true
}

fn default_max_request_bytes() -> usize {
    DEFAULT_MAX_REQUEST_BYTES
}

fn default_log_file() -> String {
    "log.txt".to_string()
}

fn default_program_name() -> String {
    SERVER_NAME.to_string()
}

fn default_syslog() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_method() -> HttpRequestMethod {
    HttpRequestMethod::Get
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            program_name: default_program_name(),
            syslog: default_syslog(),
            level: default_log_level(),
            config_file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: default_port(),
            local: default_local(),
            worker_threads: 0,
            enable_cache: default_enable_cache(),
            cache_key: CacheKeyMode::default(),
            read_timeout_secs: 0,
            max_request_bytes: default_max_request_bytes(),
            log: LogConfig::default(),
            endpoints: Vec::new(),
        }
    }

    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let mut file = File::open(filename).map_err(Exception::ConfigUnreadable)?;
        let mut str_val = String::new();
        file.read_to_string(&mut str_val)
            .map_err(Exception::ConfigUnreadable)?;
        Self::from_toml_str(&str_val)
    }

    pub fn from_toml_str(str_val: &str) -> Result<Self, Exception> {
        let mut raw_config: Config =
            toml::from_str(str_val).map_err(|e| Exception::ConfigInvalid(e.to_string()))?;
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.max_request_bytes == 0 {
            warn!("max_request_bytes被设置为0，将改为默认值{}。", DEFAULT_MAX_REQUEST_BYTES);
            raw_config.max_request_bytes = DEFAULT_MAX_REQUEST_BYTES;
        }
        Ok(raw_config)
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get()
        } else {
            self.worker_threads
        }
    }

    pub fn enable_cache(&self) -> bool {
        self.enable_cache
    }

    pub fn cache_key(&self) -> CacheKeyMode {
        self.cache_key
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        match self.read_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            read_timeout: self.read_timeout(),
            max_request_bytes: self.max_request_bytes,
        }
    }

    pub fn log(&self) -> &LogConfig {
        &self.log
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.iter().map(EndpointConfig::to_endpoint).collect()
    }
}

impl Config {
    pub fn set_enable_cache(&mut self, enable_cache: bool) {
        self.enable_cache = enable_cache;
    }

    pub fn set_cache_key(&mut self, cache_key: CacheKeyMode) {
        self.cache_key = cache_key;
    }
}

impl LogConfig {
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    pub fn syslog(&self) -> bool {
        self.syslog
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn config_file(&self) -> Option<&str> {
        self.config_file.as_deref()
    }
}

impl EndpointConfig {
    fn to_endpoint(&self) -> Endpoint {
        let endpoint = Endpoint::new(&self.path, ResponseSource::parse(&self.response), self.method);
        match &self.content_type {
            Some(content_type) => endpoint.with_content_type(content_type),
            None => endpoint,
        }
    }
}
