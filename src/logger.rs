// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 日志模块
//!
//! 业务代码只使用 `log` 门面（`debug!`/`info!`/`warn!`/`error!` 以及本模块的 `critical!`），
//! 后端由 log4rs 提供：
//! - 追加写入的本地日志文件，每行带时间戳与级别；
//! - 可选的系统日志（syslog），通过 `/dev/log` 发送 RFC 3164 格式的数据报。
//!
//! 日志状态是进程级的：由 [`init`] 初始化一次，由 [`shutdown`] 刷新落盘。
//! 每次写入只持有对应 appender 自己的锁。appender 出错时由 log4rs 打印到 stderr，
//! 不会影响请求处理。

use crate::{config::LogConfig, exception::Exception};

use log::{LevelFilter, Record};
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

use std::str::FromStr;

/// `critical!` 宏使用的 target，syslog 中映射为 LOG_CRIT
pub const CRITICAL_TARGET: &str = "critical";

/// 日志文件的行格式
pub const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}";

/// 以 Critical 严重度记录日志
#[macro_export]
macro_rules! critical {
    ($($arg:tt)+) => {
        log::error!(target: $crate::logger::CRITICAL_TARGET, "[CRITICAL] {}", format_args!($($arg)+))
    };
}

/// syslog 严重度（RFC 5424 数值）
pub fn syslog_severity(record: &Record) -> u8 {
    if record.target() == CRITICAL_TARGET {
        return 2;
    }
    match record.level() {
        log::Level::Error => 3,
        log::Level::Warn => 4,
        log::Level::Info => 6,
        log::Level::Debug | log::Level::Trace => 7,
    }
}

/// 组装 log4rs 配置，不安装为全局 logger。
///
/// 日志文件无法打开时退化为输出到 stderr，并返回说明原因的 `Exception`，
/// 由调用方在日志系统可用后以 Critical 级别记录。
pub fn build_config(log_config: &LogConfig) -> Result<(Config, Vec<Exception>), Exception> {
    let mut problems = Vec::new();
    let level = match LevelFilter::from_str(log_config.level()) {
        Ok(level) => level,
        Err(_) => {
            problems.push(Exception::LogSinkUnavailable(format!(
                "unknown log level {}, using info",
                log_config.level()
            )));
            LevelFilter::Info
        }
    };

    let mut builder = Config::builder();
    let mut root = Root::builder();

    match FileAppender::builder()
        .append(true)
        .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
        .build(log_config.file())
    {
        Ok(file) => {
            builder = builder.appender(Appender::builder().build("file", Box::new(file)));
            root = root.appender("file");
        }
        Err(e) => {
            problems.push(Exception::LogSinkUnavailable(format!(
                "can't open log file {}: {}",
                log_config.file(),
                e
            )));
            let console = ConsoleAppender::builder()
                .target(Target::Stderr)
                .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
                .build();
            builder = builder.appender(Appender::builder().build("stderr", Box::new(console)));
            root = root.appender("stderr");
        }
    }

    if log_config.syslog() {
        match syslog::SyslogAppender::connect(log_config.program_name()) {
            Ok(appender) => {
                builder = builder.appender(Appender::builder().build("syslog", Box::new(appender)));
                root = root.appender("syslog");
            }
            Err(e) => problems.push(Exception::LogSinkUnavailable(format!(
                "can't reach system log: {}",
                e
            ))),
        }
    }

    let config = builder
        .build(root.build(level))
        .map_err(|e| Exception::LogSinkUnavailable(e.to_string()))?;
    Ok((config, problems))
}

/// 初始化进程级日志。只应调用一次。
pub fn init(log_config: &LogConfig) -> Result<(), Exception> {
    if let Some(path) = log_config.config_file() {
        return log4rs::init_file(path, Default::default())
            .map_err(|e| Exception::LogSinkUnavailable(e.to_string()));
    }

    let (config, problems) = build_config(log_config)?;
    log4rs::init_config(config).map_err(|e| Exception::LogSinkUnavailable(e.to_string()))?;
    for problem in problems {
        critical!("{}", problem);
    }
    Ok(())
}

/// 刷新所有 appender
pub fn shutdown() {
    log::logger().flush();
}

#[cfg(unix)]
mod syslog {
    use super::syslog_severity;

    use chrono::Local;
    use log::Record;
    use log4rs::append::Append;

    use std::{io, os::unix::net::UnixDatagram, path::Path};

    const SYSLOG_SOCKETS: [&str; 3] = ["/dev/log", "/var/run/syslog", "/var/run/log"];
    const FACILITY_USER: u8 = 1;

    /// 把日志写入本机 syslog 的 log4rs appender
    #[derive(Debug)]
    pub struct SyslogAppender {
        socket: UnixDatagram,
        tag: String,
    }

    impl SyslogAppender {
        pub fn connect(program_name: &str) -> io::Result<Self> {
            let path = SYSLOG_SOCKETS
                .iter()
                .find(|p| Path::new(p).exists())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no syslog socket"))?;
            let socket = UnixDatagram::unbound()?;
            socket.connect(path)?;
            Ok(Self {
                socket,
                tag: format!("{}[{}]", program_name, std::process::id()),
            })
        }
    }

    pub fn format_message(severity: u8, tag: &str, message: &str) -> String {
        format!(
            "<{}>{} {}: {}",
            FACILITY_USER * 8 + severity,
            Local::now().format("%b %e %H:%M:%S"),
            tag,
            message
        )
    }

    impl Append for SyslogAppender {
        fn append(&self, record: &Record) -> anyhow::Result<()> {
            let message = format_message(syslog_severity(record), &self.tag, &record.args().to_string());
            self.socket.send(message.as_bytes())?;
            Ok(())
        }

        fn flush(&self) {}
    }
}

#[cfg(not(unix))]
mod syslog {
    use std::io;

    #[derive(Debug)]
    pub struct SyslogAppender;

    impl SyslogAppender {
        pub fn connect(_program_name: &str) -> io::Result<Self> {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "system log is only available on unix",
            ))
        }
    }

    impl log4rs::append::Append for SyslogAppender {
        fn append(&self, _record: &log::Record) -> anyhow::Result<()> {
            Ok(())
        }

        fn flush(&self) {}
    }
}
