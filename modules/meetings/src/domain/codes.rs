use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

pub const CODE_LEN: usize = 8;

/// Source of join-code candidates. Uniqueness is the caller's job.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// 6 random bytes, base64url without padding: exactly [`CODE_LEN`] characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        let mut bytes = [0u8; 6];
        rand::rng().fill_bytes(&mut bytes);
        let mut code = URL_SAFE_NO_PAD.encode(bytes);
        code.truncate(CODE_LEN);
        code
    }
}

pub fn is_url_safe(code: &str) -> bool {
    code.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_are_eight_url_safe_chars() {
        let g = RandomCodeGenerator;
        for _ in 0..100 {
            let code = g.generate();
            assert_eq!(code.len(), CODE_LEN);
            assert!(is_url_safe(&code), "{code}");
        }
    }

    #[test]
    fn thousand_codes_do_not_collide() {
        let g = RandomCodeGenerator;
        let codes: HashSet<String> = (0..1000).map(|_| g.generate()).collect();
        // 48 bits of entropy; a collision among 1000 has probability ~1.8e-9.
        assert_eq!(codes.len(), 1000);
    }
}
