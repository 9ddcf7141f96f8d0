//! Web 服务器主程序入口

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use transpolish::env::{general::LogLevel, EnvVar};
use transpolish::web::WebServer;
use transpolish::AppConfig;

/// 翻译与润色 Web 服务器
#[derive(Parser, Debug)]
#[command(name = "transpolish-web", version, about)]
struct Args {
    /// 配置文件路径（默认读取 ./transpolish.toml）
    #[arg(short, long, env = "TRANSPOLISH_CONFIG")]
    config: Option<PathBuf>,

    /// 绑定地址，覆盖配置文件
    #[arg(short, long)]
    bind: Option<String>,

    /// 端口，覆盖配置文件
    #[arg(short, long)]
    port: Option<u16>,

    /// 静态前端目录，覆盖配置文件
    #[arg(long)]
    static_dir: Option<String>,
}

fn init_tracing() {
    let level = LogLevel::get().unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(static_dir) = args.static_dir {
        config.server.static_dir = Some(static_dir);
    }
    config.validate()?;

    let server = WebServer::new(config)?;
    server.start().await?;

    Ok(())
}
