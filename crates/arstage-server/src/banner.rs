//! Operator instructions logged once the listener is bound.

use std::net::SocketAddr;

use tracing::{info, warn};

use crate::app::ListenMode;

/// Lines shown after an HTTPS bind.
pub fn https_lines(addr: SocketAddr) -> Vec<String> {
    vec![
        "HTTPS Server running!".to_string(),
        format!("Local: https://localhost:{}", addr.port()),
        "Next steps:".to_string(),
        "  1. Accept the self-signed certificate warning".to_string(),
        "  2. Upload marker to public/assets/markers/target.mind".to_string(),
        "  3. Add 3D model to public/assets/models/model.glb".to_string(),
        "  4. Open on mobile device and grant camera permissions".to_string(),
    ]
}

/// Lines shown after a plain HTTP bind.
pub fn http_lines(addr: SocketAddr) -> Vec<String> {
    vec![
        format!("Server running at http://localhost:{}", addr.port()),
        "Note: Camera access requires HTTPS. Use chrome://flags/#unsafely-treat-insecure-origin-as-secure"
            .to_string(),
    ]
}

/// Log the banner for a bound server.
pub fn log_banner(mode: &ListenMode, addr: SocketAddr) {
    match mode {
        ListenMode::Https(_) => {
            for line in https_lines(addr) {
                info!("{line}");
            }
        }
        ListenMode::Http => {
            let lines = http_lines(addr);
            if let Some((first, rest)) = lines.split_first() {
                info!("{first}");
                for line in rest {
                    warn!("{line}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_banner_uses_bound_port() {
        let lines = https_lines("0.0.0.0:8443".parse().expect("addr"));
        assert_eq!(lines[1], "Local: https://localhost:8443");
        assert_eq!(lines.len(), 7);
        assert!(lines[4].contains("public/assets/markers/target.mind"));
    }

    #[test]
    fn test_http_banner_warns_about_camera() {
        let lines = http_lines("127.0.0.1:3000".parse().expect("addr"));
        assert_eq!(lines[0], "Server running at http://localhost:3000");
        assert!(lines[1].contains("chrome://flags/#unsafely-treat-insecure-origin-as-secure"));
    }
}
