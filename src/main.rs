// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 静态响应 Web 服务器
//!
//! 该程序按配置文件注册一组静态端点，在 Tokio 多线程运行时上提供服务：
//! - 每个连接只处理一次请求/响应交换；
//! - 按方法（或路径加方法）记忆化渲染好的响应；
//! - 日志同时写入本地文件与系统日志；
//! - 后台管理控制台（CLI 指令交互）。

use serveme::{critical, logger, App, Config};

use log::info;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    runtime::Builder,
};

use std::{process::ExitCode, sync::Arc, time::Duration};

/// 未指定配置文件时使用的默认路径
const DEFAULT_CONFIG: &str = "config/serveme.toml";
/// 停机后等待进行中会话结束的最长时间
const DRAIN_LIMIT: Duration = Duration::from_secs(10);

fn main() -> ExitCode {
    // 1. 环境配置加载：第一个命令行参数可覆盖默认的配置文件路径
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = match Config::from_toml(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[CRITICAL] 无法载入配置文件{}: {}", config_path, e);
            return ExitCode::FAILURE;
        }
    };

    // 2. 初始化日志系统：失败时只影响日志，服务照常启动
    if let Err(e) = logger::init(config.log()) {
        eprintln!("[CRITICAL] 日志系统初始化失败: {}", e);
    }
    info!("配置文件{}已载入", config_path);

    // 3. 异步运行时定制：根据配置文件动态分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            critical!("无法创建异步运行时: {}", e);
            logger::shutdown();
            return ExitCode::FAILURE;
        }
    };

    let port = config.port();
    let app = Arc::new(App::new(config));
    info!("已注册{}个端点", app.endpoint_count());

    runtime.block_on(async {
        // 4. 启动交互式管理控制台任务，不阻塞监听循环
        tokio::spawn(console(Arc::clone(&app)));
        app.start(port).await;
        // 停机只阻止新连接，退出前让进行中的会话完成
        if app.drain(DRAIN_LIMIT).await {
            info!("所有会话已结束");
        }
    });

    runtime.shutdown_background();
    logger::shutdown();
    ExitCode::SUCCESS
}

async fn console(app: Arc<App>) {
    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut input = String::new();
    loop {
        input.clear();
        match reader.read_line(&mut input).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let cmd = input.trim();
        match cmd {
            "stop" => {
                app.stop();
                println!("停机指令已激活，服务器不再接收新连接...");
                break;
            }
            "help" => {
                println!("== serveme Help ==");
                println!("stop   - 发出停机信号");
                println!("status - 查看当前服务器运行状态");
                println!("help   - 显示此帮助信息");
                println!("==================");
            }
            "status" => {
                println!("== serveme 状态 ===");
                println!("运行中: {}", app.is_running());
                match app.local_addr() {
                    Some(addr) => println!("监听地址: {}", addr),
                    None => println!("监听地址: 无"),
                }
                println!("当前活跃连接数: {}", app.active_sessions());
                println!("已注册端点数: {}", app.endpoint_count());
                println!("已缓存响应数: {}", app.cached_responses());
                println!("==================");
            }
            "" => {}
            _ => {
                println!("无效的命令：{}", cmd);
            }
        }
    }
}
