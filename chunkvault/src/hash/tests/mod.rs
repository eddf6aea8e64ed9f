use super::*;

use crate::error::ChunkvaultError;
use crate::testing::get_fake_data;

const HELLO_WORLD_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

#[test]
fn test_basic() {
    let hash = Hash::sha256_from_bytes(b"hello world");
    assert_eq!(HELLO_WORLD_SHA256, hash.to_hex());
    assert_eq!(HELLO_WORLD_SHA256, digest(b"hello world"));

    let empty = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    assert_eq!(empty, digest(b""));
}

#[test]
fn test_verify() {
    assert!(verify(b"hello world", HELLO_WORLD_SHA256));
    assert!(verify(b"hello world", &HELLO_WORLD_SHA256.to_uppercase()));
    assert!(!verify(b"hello world!", HELLO_WORLD_SHA256));
    assert!(!verify(b"hello world", "not a digest"));
}

#[test]
fn test_from_hex() {
    let lower = Hash::from_hex(HELLO_WORLD_SHA256).unwrap();
    let upper = Hash::from_hex(&HELLO_WORLD_SHA256.to_uppercase()).unwrap();
    assert_eq!(lower, upper);
    assert_eq!(lower, Hash::sha256_from_bytes(b"hello world"));

    assert!(matches!(
        Hash::from_hex(""),
        Err(ChunkvaultError::HashError(Error::InvalidHashStringLength {
            expected: 64,
            actual: 0
        }))
    ));

    assert!(matches!(
        Hash::from_hex("gggggggggggggggggggggggggggggggggggggggggggggggggggggggggggggggg"),
        Err(ChunkvaultError::HashError(Error::InvalidBase16Hash(_)))
    ));
}

#[test]
fn test_serde() {
    let hash = Hash::sha256_from_bytes(b"hello world");
    let json = serde_json::to_string(&hash).unwrap();
    assert_eq!(format!("\"{}\"", HELLO_WORLD_SHA256), json);

    let parsed: Hash = serde_json::from_str(&json).unwrap();
    assert_eq!(hash, parsed);
}

#[tokio::test]
async fn test_digest_stream() {
    let data = get_fake_data(3 * 1024 * 1024 + 17);

    let streamed = digest_stream(data.as_slice()).await.unwrap();
    assert_eq!(digest(&data), streamed);

    let empty = digest_stream(&b""[..]).await.unwrap();
    assert_eq!(digest(b""), empty);
}

#[test]
fn test_digest_parts() {
    let parts: [&[u8]; 3] = [b"hello", b" ", b"world"];
    assert_eq!(HELLO_WORLD_SHA256, digest_parts(parts));
    assert_eq!(digest(b""), digest_parts(std::iter::empty()));
}
