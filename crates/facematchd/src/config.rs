use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Address the HTTP server binds to (default: all interfaces).
    pub bind_addr: IpAddr,
    /// TCP port (default: 5000).
    pub port: u16,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from `FACEMATCH_*` environment variables with
    /// defaults. Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_parsed("FACEMATCH_BIND", IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: env_parsed("FACEMATCH_PORT", 5000),
            model_dir: std::env::var("FACEMATCH_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models")),
            max_body_bytes: env_parsed::<usize>("FACEMATCH_MAX_BODY_MB", 20) * 1024 * 1024,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Path to the face detection model.
    pub fn detector_model_path(&self) -> PathBuf {
        self.model_dir.join("det_500m.onnx")
    }

    /// Path to the face embedding model.
    pub fn embedder_model_path(&self) -> PathBuf {
        self.model_dir.join("mobilefacenet.onnx")
    }
}

fn env_parsed<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parsed_absent_uses_default() {
        assert_eq!(env_parsed("FACEMATCH_TEST_UNSET", 42u16), 42);
    }

    #[test]
    fn test_env_parsed_garbage_uses_default() {
        std::env::set_var("FACEMATCH_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_parsed("FACEMATCH_TEST_GARBAGE", 7usize), 7);
    }

    #[test]
    fn test_env_parsed_reads_value() {
        std::env::set_var("FACEMATCH_TEST_PORT", "8080");
        assert_eq!(env_parsed("FACEMATCH_TEST_PORT", 5000u16), 8080);
    }

    #[test]
    fn test_model_paths_join_model_dir() {
        let config = Config {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            model_dir: PathBuf::from("/opt/models"),
            max_body_bytes: 0,
        };
        assert_eq!(
            config.detector_model_path(),
            PathBuf::from("/opt/models/det_500m.onnx")
        );
        assert_eq!(
            config.embedder_model_path(),
            PathBuf::from("/opt/models/mobilefacenet.onnx")
        );
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5000");
    }
}
