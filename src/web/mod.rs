//! Web 服务器模块
//!
//! 为前端聊天界面提供翻译、润色、缓存管理和会话历史接口

pub mod handlers;
pub mod routes;
pub mod types;

pub use routes::*;
pub use types::*;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::signal;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{RelayError, RelayResult};

/// Web 服务器
pub struct WebServer {
    config: Arc<AppConfig>,
    state: Arc<AppState>,
}

impl WebServer {
    /// 按配置创建服务器及其依赖
    pub fn new(config: AppConfig) -> RelayResult<Self> {
        let config = Arc::new(config);
        let state = Arc::new(AppState::from_config(Arc::clone(&config))?);
        Ok(Self { config, state })
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    pub fn router(&self) -> Router {
        create_router(self.state(), self.config.server.static_dir.as_deref())
    }

    /// 启动 Web 服务器，收到 Ctrl+C 或 SIGTERM 后优雅退出
    pub async fn start(&self) -> RelayResult<()> {
        self.start_with_shutdown(shutdown_signal()).await
    }

    /// 启动 Web 服务器，`shutdown` 完成后停止接收新连接
    ///
    /// 处理中的请求结束后等待后台缓存写入落盘再返回。
    pub async fn start_with_shutdown<F>(&self, shutdown: F) -> RelayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sweeper = self.state.gateway.cache().map(|cache| {
            Arc::clone(cache).spawn_sweeper(self.config.cache.sweep_interval())
        });

        let address = self.config.server.listen_address();
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|e| RelayError::Config(format!("无法绑定 {}: {}", address, e)))?;

        info!("Web 服务器启动于 http://{}", address);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RelayError::Internal(format!("服务器错误: {}", e)))?;

        if let Some(sweeper) = sweeper {
            sweeper.stop();
        }
        if let Some(cache) = self.state.gateway.cache() {
            cache.flush().await;
            info!("缓存写入已全部完成");
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("无法监听 Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("无法监听 SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("收到 Ctrl+C，正在关闭服务器"),
        () = terminate => info!("收到 SIGTERM，正在关闭服务器"),
    }
}

/// 创建路由器
pub fn create_router(app_state: Arc<AppState>, static_dir: Option<&str>) -> Router {
    let mut app = create_routes().with_state(app_state);

    // 静态前端作为兜底路由
    if let Some(static_dir) = static_dir {
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    app.layer(CorsLayer::permissive())
}
