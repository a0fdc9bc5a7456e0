// ==========================================
// 募捐活动结项 - 审计文档内容摘要
// ==========================================
// 算法: SHA-256，输出 64 位小写十六进制
// ==========================================

use sha2::{Digest, Sha256};

/// 计算文档内容哈希
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// 校验文档内容与已记录哈希是否一致（忽略大小写）
pub fn verify_content_hash(data: &[u8], expected: &str) -> bool {
    content_hash(data).eq_ignore_ascii_case(expected.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(content_hash(b"").len(), 64);
    }

    #[test]
    fn test_verify_detects_tampering() {
        let doc = b"informe de cierre".to_vec();
        let hash = content_hash(&doc);
        assert!(verify_content_hash(&doc, &hash));
        assert!(verify_content_hash(&doc, &hash.to_uppercase()));

        let mut tampered = doc.clone();
        tampered[0] ^= 0x01;
        assert!(!verify_content_hash(&tampered, &hash));
    }
}
