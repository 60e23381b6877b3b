//! WBI request signing.
//!
//! The platform issues two rotating tokens (`img_key`, `sub_key`) embedded in
//! asset URLs. Their concatenation is permuted through a fixed table into a
//! 32-character mixin key, which salts an MD5 digest over the sorted query.

use md5::{Digest, Md5};
use std::collections::BTreeMap;

const MIXIN_KEY_ENC_TAB: [usize; 64] = [
    46, 47, 18, 2, 53, 8, 23, 32, 15, 50, 10, 31, 58, 3, 45, 35, 27, 43, 5, 49, 33, 9, 42, 19, 29,
    28, 14, 39, 12, 38, 41, 13, 37, 48, 7, 16, 24, 55, 40, 61, 26, 17, 0, 1, 60, 51, 30, 4, 22, 25,
    54, 21, 56, 59, 6, 63, 57, 62, 11, 36, 20, 34, 44, 52,
];

const MIXIN_KEY_LEN: usize = 32;

/// Characters stripped from every value before hashing.
const FILTERED_CHARS: [char; 5] = ['!', '\'', '(', ')', '*'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WbiKeys {
    pub img_key: String,
    pub sub_key: String,
}

impl WbiKeys {
    /// Builds the key pair from the two asset URLs returned by the nav endpoint.
    pub fn from_urls(img_url: &str, sub_url: &str) -> Option<Self> {
        let img_key = extract_key_from_url(img_url)?;
        let sub_key = extract_key_from_url(sub_url)?;
        Some(Self { img_key, sub_key })
    }

    pub fn mixin_key(&self) -> String {
        mixin_key(&format!("{}{}", self.img_key, self.sub_key))
    }
}

/// Returns the file stem between the last `/` and a trailing `.png`.
pub fn extract_key_from_url(url: &str) -> Option<String> {
    let file = url.rsplit('/').next()?;
    let key = file.strip_suffix(".png")?;
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Permutes the concatenated raw key through the encoding table and keeps
/// the first 32 characters. Table positions past the end of a short input
/// are skipped.
pub fn mixin_key(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    MIXIN_KEY_ENC_TAB
        .iter()
        .filter_map(|&i| chars.get(i))
        .take(MIXIN_KEY_LEN)
        .collect()
}

/// A signed query: the caller's parameters plus `wts` and `w_rid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedParams {
    params: BTreeMap<String, String>,
}

impl SignedParams {
    pub fn w_rid(&self) -> &str {
        self.params.get("w_rid").map(String::as_str).unwrap_or_default()
    }

    pub fn wts(&self) -> i64 {
        self.params
            .get("wts")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn as_query(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.params
    }
}

/// Signs `params` with the current wall-clock second as `wts`.
pub fn sign_params(params: &BTreeMap<String, String>, mixin_key: &str) -> SignedParams {
    sign_params_at(params, mixin_key, chrono::Utc::now().timestamp())
}

/// Signs `params` with an explicit `wts` timestamp (epoch seconds).
pub fn sign_params_at(
    params: &BTreeMap<String, String>,
    mixin_key: &str,
    wts: i64,
) -> SignedParams {
    let mut with_wts = params.clone();
    with_wts.insert("wts".to_string(), wts.to_string());

    // BTreeMap iteration is already sorted by parameter name.
    let query = with_wts
        .iter()
        .map(|(key, value)| {
            let filtered: String = value.chars().filter(|c| !FILTERED_CHARS.contains(c)).collect();
            format!("{}={}", urlencoding::encode(key), urlencoding::encode(&filtered))
        })
        .collect::<Vec<_>>()
        .join("&");

    let digest = Md5::digest(format!("{query}{mixin_key}").as_bytes());
    with_wts.insert("w_rid".to_string(), format!("{:x}", digest));

    SignedParams { params: with_wts }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMG_KEY: &str = "7cd084941338484aae1ad9425b84077c";
    const SUB_KEY: &str = "4932caff0ff746eab6f01bf08b70ac45";

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_extract_key_from_url() {
        assert_eq!(
            extract_key_from_url(
                "https://i0.hdslb.com/bfs/wbi/7cd084941338484aae1ad9425b84077c.png"
            ),
            Some(IMG_KEY.to_string())
        );
        assert_eq!(extract_key_from_url("https://i0.hdslb.com/bfs/wbi/key.jpg"), None);
        assert_eq!(extract_key_from_url("https://i0.hdslb.com/bfs/wbi/.png"), None);
    }

    #[test]
    fn test_mixin_key_known_value() {
        let keys = WbiKeys {
            img_key: IMG_KEY.to_string(),
            sub_key: SUB_KEY.to_string(),
        };
        assert_eq!(keys.mixin_key(), "ea1db124af3c7062474693fa704f4ff8");
    }

    #[test]
    fn test_known_signature() {
        let mixin = "ea1db124af3c7062474693fa704f4ff8";
        let signed = sign_params_at(
            &params(&[("foo", "114"), ("bar", "514"), ("zab", "1919810")]),
            mixin,
            1702204169,
        );
        assert_eq!(signed.wts(), 1702204169);
        assert_eq!(signed.w_rid(), "8f6f2b5b3d485fe1886cec6a0be8c5d4");
        assert_eq!(signed.get("foo"), Some("114"));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let input = params(&[("b", "1"), ("a", "2")]);
        let first = sign_params_at(&input, "mixin", 1_700_000_000);
        let second = sign_params_at(&input, "mixin", 1_700_000_000);
        assert_eq!(first.w_rid(), second.w_rid());
        assert_eq!(first, second);
    }

    #[test]
    fn test_changing_a_value_changes_the_hash() {
        let a = sign_params_at(&params(&[("b", "1"), ("a", "2")]), "mixin", 1_700_000_000);
        let b = sign_params_at(&params(&[("b", "1"), ("a", "3")]), "mixin", 1_700_000_000);
        assert_ne!(a.w_rid(), b.w_rid());
    }

    #[test]
    fn test_filtered_characters_do_not_affect_hash() {
        let plain = sign_params_at(&params(&[("keyword", "offer")]), "mixin", 1);
        let noisy = sign_params_at(&params(&[("keyword", "o!f'f(e)r*")]), "mixin", 1);
        assert_eq!(plain.w_rid(), noisy.w_rid());
        // The outgoing value itself is left untouched.
        assert_eq!(noisy.get("keyword"), Some("o!f'f(e)r*"));
    }

    #[test]
    fn test_signed_query_uses_web_encoding() {
        let signed = sign_params_at(&params(&[("keyword", "秋招 x-y_z.~")]), "mixin", 1);
        let expected = Md5::digest("keyword=%E7%A7%8B%E6%8B%9B%20x-y_z.~&wts=1mixin".as_bytes());
        assert_eq!(signed.w_rid(), format!("{:x}", expected));
        assert_eq!(signed.get("keyword"), Some("秋招 x-y_z.~"));
    }
}
