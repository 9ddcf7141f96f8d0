//! 命令行客户端

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use transpolish::env::{general::LogLevel, generate_env_docs, EnvVar};
use transpolish::{
    AppConfig, Gateway, GatewayOutcome, PolishRequest, ProviderRegistry, RelayResult,
    ResponseCache, TranslateRequest,
};

#[derive(Parser, Debug)]
#[command(name = "transpolish", version, about = "Translate and polish text with LLM providers")]
struct Cli {
    /// 配置文件路径（默认读取 ./transpolish.toml）
    #[arg(short, long, global = true, env = "TRANSPOLISH_CONFIG")]
    config: Option<PathBuf>,

    /// 输出完整 JSON 响应
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 翻译文本（省略 TEXT 时从标准输入读取）
    Translate {
        text: Option<String>,
        /// 源语言，默认自动检测
        #[arg(short, long)]
        from: Option<String>,
        /// 目标语言，默认 zh
        #[arg(short, long)]
        to: Option<String>,
        #[arg(short, long)]
        service: Option<String>,
    },
    /// 润色文本（省略 TEXT 时从标准输入读取）
    Polish {
        text: Option<String>,
        /// formal / casual / academic / concise / creative
        #[arg(long)]
        style: Option<String>,
        #[arg(short, long)]
        service: Option<String>,
    },
    /// 缓存管理
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// 打印生效的配置
    Config,
    /// 列出支持的环境变量
    Env,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// 显示缓存统计
    Stats,
    /// 清空两级缓存
    Clear,
    /// 清理过期条目
    Sweep,
}

fn init_tracing() {
    let level = LogLevel::get().unwrap_or_else(|_| "warn".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_text(text: Option<String>) -> RelayResult<String> {
    match text {
        Some(text) if text != "-" => Ok(text),
        _ => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}

fn build_gateway(config: &AppConfig) -> RelayResult<Gateway> {
    let registry = Arc::new(ProviderRegistry::from_config(config)?);
    let cache = config.cache.build_cache().map(Arc::new);
    Ok(Gateway::new(
        registry,
        cache,
        config.default_service.clone(),
        config.request_timeout(),
    ))
}

fn print_outcome(outcome: &GatewayOutcome, json: bool) -> RelayResult<()> {
    let mut stdout = io::stdout().lock();
    if json {
        let mut value = serde_json::to_value(&outcome.response)?;
        value["cached"] = serde_json::Value::Bool(outcome.cached);
        writeln!(stdout, "{}", serde_json::to_string_pretty(&value)?)?;
    } else {
        writeln!(stdout, "{}", outcome.response.translated_text)?;
    }
    Ok(())
}

fn open_cache(config: &AppConfig) -> Option<ResponseCache> {
    config.cache.build_cache()
}

async fn run(cli: Cli) -> RelayResult<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Translate {
            text,
            from,
            to,
            service,
        } => {
            let gateway = build_gateway(&config)?;
            let outcome = gateway
                .translate(TranslateRequest {
                    text: read_text(text)?,
                    source_lang: from,
                    target_lang: to,
                    service,
                })
                .await;
            if let Some(cache) = gateway.cache() {
                cache.flush().await;
            }
            print_outcome(&outcome?, cli.json)?;
        }
        Command::Polish {
            text,
            style,
            service,
        } => {
            let gateway = build_gateway(&config)?;
            let outcome = gateway
                .polish(PolishRequest {
                    text: read_text(text)?,
                    style,
                    service,
                })
                .await;
            if let Some(cache) = gateway.cache() {
                cache.flush().await;
            }
            print_outcome(&outcome?, cli.json)?;
        }
        Command::Cache { action } => {
            let Some(cache) = open_cache(&config) else {
                println!("缓存未启用");
                return Ok(());
            };
            match action {
                CacheAction::Stats => {
                    let stats = cache.stats().await;
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&stats)?);
                    } else {
                        println!("内存条目: {}/{}", stats.memory_count, stats.memory_capacity);
                        println!(
                            "持久条目: {}{}",
                            stats.durable_count,
                            if stats.durable_enabled { "" } else { "（未启用）" }
                        );
                        println!("最大存活: {} 秒", stats.max_age_seconds);
                    }
                }
                CacheAction::Clear => {
                    cache.clear_all().await;
                    println!("缓存已清空");
                }
                CacheAction::Sweep => match cache.sweep_expired().await {
                    Some(report) => println!(
                        "已清理过期条目: 内存 {}，持久 {}",
                        report.memory_removed, report.durable_removed
                    ),
                    None => println!("已有清理任务在运行"),
                },
            }
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Env => {
            print!("{}", generate_env_docs());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
