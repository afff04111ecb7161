//! TLS 证书指纹固定
//!
//! `PinnedFingerprint` 策略下跳过证书链校验，只比较服务端叶子证书
//! DER 编码的 SHA-256（32 字节）或 SHA-1（20 字节）摘要。

use std::sync::Arc;
use std::time::SystemTime;

use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ClientConfig, ServerName};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{Result, XmlRpcError};

/// 解析十六进制指纹，允许冒号与空白分隔
pub fn parse_fingerprint(raw: &str) -> Result<Vec<u8>> {
    let hex: String = raw
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .collect();

    if hex.len() % 2 != 0 {
        return Err(XmlRpcError::Config(format!("证书指纹长度非法: {}", raw)));
    }

    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| XmlRpcError::Config(format!("证书指纹包含非十六进制字符: {}", raw)))
        })
        .collect::<Result<Vec<u8>>>()?;

    match bytes.len() {
        20 | 32 => Ok(bytes),
        n => Err(XmlRpcError::Config(format!(
            "证书指纹应为 SHA-1 (20 字节) 或 SHA-256 (32 字节)，实际 {} 字节",
            n
        ))),
    }
}

/// 按指纹比对证书的校验器
#[derive(Debug)]
pub struct PinnedCertVerifier {
    fingerprint: Vec<u8>,
}

impl PinnedCertVerifier {
    pub fn new(fingerprint: &str) -> Result<Self> {
        Ok(Self {
            fingerprint: parse_fingerprint(fingerprint)?,
        })
    }

    fn matches(&self, der: &[u8]) -> bool {
        if self.fingerprint.len() == 32 {
            Sha256::digest(der).as_slice() == self.fingerprint.as_slice()
        } else {
            Sha1::digest(der).as_slice() == self.fingerprint.as_slice()
        }
    }
}

impl ServerCertVerifier for PinnedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        if self.matches(&end_entity.0) {
            Ok(ServerCertVerified::assertion())
        } else {
            warn!("服务端证书指纹不匹配");
            Err(rustls::Error::General("证书指纹不匹配".to_string()))
        }
    }
}

/// 构建指纹固定的 rustls 客户端配置
pub fn pinned_client_config(fingerprint: &str) -> Result<ClientConfig> {
    let verifier = PinnedCertVerifier::new(fingerprint)?;
    Ok(ClientConfig::builder()
        .with_safe_defaults()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth())
}
