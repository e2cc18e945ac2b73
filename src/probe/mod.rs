//! HTTP可达性探测器
//!
//! 对单个端点发起一次有界等待的HTTP请求，并输出归一化结果。
//! 传输层失败（超时、连接拒绝、DNS失败等）是正常的可表示结果，
//! 永远不会作为错误向上抛出。

use crate::error::Result;
use crate::model::{CheckOutcome, Endpoint};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// 默认探测超时（毫秒）
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5000;

/// 探测器trait，定义探测接口
#[async_trait]
pub trait CheckExecutor: Send + Sync {
    /// 对端点执行一次探测
    ///
    /// # 参数
    /// * `endpoint` - 被探测的端点
    ///
    /// # 返回
    /// * `CheckOutcome` - 归一化的探测结果，网络失败不构成错误
    async fn probe(&self, endpoint: &Endpoint) -> CheckOutcome;

    /// 带自定义超时的探测
    ///
    /// # 参数
    /// * `endpoint` - 被探测的端点
    /// * `timeout_duration` - 等待上限
    ///
    /// # 返回
    /// * `CheckOutcome` - 归一化的探测结果
    async fn probe_with_timeout(
        &self,
        endpoint: &Endpoint,
        timeout_duration: Duration,
    ) -> CheckOutcome;
}

/// 基于reqwest的HTTP探测器实现
pub struct HttpCheckExecutor {
    /// HTTP客户端
    client: Client,
    /// 默认超时时间
    default_timeout: Duration,
}

impl HttpCheckExecutor {
    /// 创建新的HTTP探测器
    ///
    /// # 参数
    /// * `probe_timeout` - 默认等待上限
    ///
    /// # 返回
    /// * `Result<Self>` - 探测器实例
    pub fn new(probe_timeout: Duration) -> Result<Self> {
        // 等待上限由perform_request的外层计时器施加，客户端本身
        // 不设超时，否则会悄悄压低比默认值更长的自定义上限
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self {
            client,
            default_timeout: probe_timeout,
        })
    }

    /// 执行一次请求并归一化结果
    async fn perform_request(
        &self,
        endpoint: &Endpoint,
        timeout_duration: Duration,
    ) -> CheckOutcome {
        let start = Instant::now();

        let request = self
            .client
            .request(endpoint.method.as_reqwest(), &endpoint.url);

        let response_result = timeout(timeout_duration, request.send()).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match response_result {
            Ok(Ok(response)) => {
                let status_code = response.status().as_u16();
                debug!(
                    "探测完成: {} {} -> {} ({}ms)",
                    endpoint.method, endpoint.url, status_code, elapsed_ms
                );
                CheckOutcome::from_response(status_code, elapsed_ms)
            }
            Ok(Err(e)) => {
                debug!(
                    "探测失败: {} {} - {} ({}ms)",
                    endpoint.method,
                    endpoint.url,
                    format_request_error(&e),
                    elapsed_ms
                );
                CheckOutcome::transport_failure(elapsed_ms)
            }
            Err(_) => {
                debug!(
                    "探测超时: {} {} ({}ms)",
                    endpoint.method, endpoint.url, elapsed_ms
                );
                CheckOutcome::transport_failure(elapsed_ms)
            }
        }
    }
}

/// 格式化请求错误信息，仅用于日志输出
fn format_request_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "请求超时".to_string()
    } else if error.is_connect() {
        "连接失败".to_string()
    } else if error.is_request() {
        "非法请求".to_string()
    } else {
        let error_str = error.to_string();
        if error_str.contains("dns") || error_str.contains("DNS") {
            "DNS解析失败".to_string()
        } else if error_str.contains("certificate")
            || error_str.contains("tls")
            || error_str.contains("ssl")
        {
            "SSL/TLS证书错误".to_string()
        } else {
            format!("请求失败: {error_str}")
        }
    }
}

#[async_trait]
impl CheckExecutor for HttpCheckExecutor {
    async fn probe(&self, endpoint: &Endpoint) -> CheckOutcome {
        self.perform_request(endpoint, self.default_timeout).await
    }

    async fn probe_with_timeout(
        &self,
        endpoint: &Endpoint,
        timeout_duration: Duration,
    ) -> CheckOutcome {
        self.perform_request(endpoint, timeout_duration).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HttpMethod;
    use uuid::Uuid;

    fn test_endpoint(url: &str) -> Endpoint {
        Endpoint::new(
            Uuid::new_v4(),
            "Test Endpoint".to_string(),
            url.to_string(),
            HttpMethod::Get,
        )
    }

    #[tokio::test]
    async fn test_executor_creation() {
        let executor = HttpCheckExecutor::new(Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS));
        assert!(executor.is_ok());
    }

    #[tokio::test]
    async fn test_probe_success_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .with_status(200)
            .create_async()
            .await;

        let executor = HttpCheckExecutor::new(Duration::from_secs(5)).unwrap();
        let endpoint = test_endpoint(&format!("{}/ping", server.url()));
        let outcome = executor.probe(&endpoint).await;

        mock.assert_async().await;
        assert_eq!(outcome.status_code, 200);
        assert!(outcome.is_up);
    }

    #[tokio::test]
    async fn test_probe_redirect_is_up() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/moved")
            .with_status(301)
            .with_header("location", "/elsewhere")
            .create_async()
            .await;

        let executor = HttpCheckExecutor::new(Duration::from_secs(5)).unwrap();
        let endpoint = test_endpoint(&format!("{}/moved", server.url()));
        let outcome = executor.probe(&endpoint).await;

        // 3xx也视为可用
        assert!(outcome.is_up);
    }

    #[tokio::test]
    async fn test_probe_error_status_is_down() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/broken")
            .with_status(503)
            .create_async()
            .await;

        let executor = HttpCheckExecutor::new(Duration::from_secs(5)).unwrap();
        let endpoint = test_endpoint(&format!("{}/broken", server.url()));
        let outcome = executor.probe(&endpoint).await;

        // 收到响应即记录真实状态码，但5xx不可用
        assert_eq!(outcome.status_code, 503);
        assert!(!outcome.is_up);
    }

    #[tokio::test]
    async fn test_probe_unreachable_maps_to_zero() {
        // 端口1上没有监听进程，连接会被拒绝
        let executor = HttpCheckExecutor::new(Duration::from_secs(2)).unwrap();
        let endpoint = test_endpoint("http://127.0.0.1:1/");
        let outcome = executor.probe(&endpoint).await;

        assert_eq!(outcome.status_code, 0);
        assert!(!outcome.is_up);
    }

    #[tokio::test]
    async fn test_probe_timeout_maps_to_zero() {
        // 监听但永不应答的套接字，触发超时分支
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let executor = HttpCheckExecutor::new(Duration::from_secs(5)).unwrap();
        let endpoint = test_endpoint(&format!("http://{addr}/"));
        let outcome = executor
            .probe_with_timeout(&endpoint, Duration::from_millis(200))
            .await;

        assert_eq!(outcome.status_code, 0);
        assert!(!outcome.is_up);
        // 耗时不应明显超过等待上限
        assert!(outcome.response_ms < 2000);
    }

    #[tokio::test]
    async fn test_custom_timeout_longer_than_default_is_honored() {
        // 应答前停顿300ms的简易服务端
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            use std::io::{Read, Write};
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                std::thread::sleep(Duration::from_millis(300));
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            }
        });

        // 默认超时100ms，自定义上限放宽到5秒后探测应当成功
        let executor = HttpCheckExecutor::new(Duration::from_millis(100)).unwrap();
        let endpoint = test_endpoint(&format!("http://{addr}/"));
        let outcome = executor
            .probe_with_timeout(&endpoint, Duration::from_secs(5))
            .await;

        assert_eq!(outcome.status_code, 200);
        assert!(outcome.is_up);
    }

    #[tokio::test]
    async fn test_probe_head_method() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("HEAD", "/ping")
            .with_status(200)
            .create_async()
            .await;

        let executor = HttpCheckExecutor::new(Duration::from_secs(5)).unwrap();
        let mut endpoint = test_endpoint(&format!("{}/ping", server.url()));
        endpoint.method = HttpMethod::Head;
        let outcome = executor.probe(&endpoint).await;

        mock.assert_async().await;
        assert!(outcome.is_up);
    }
}
