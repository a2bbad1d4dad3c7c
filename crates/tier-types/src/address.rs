use bytes::Bytes;
use cid::Cid;
use multihash::Multihash;

use crate::error::TypeError;

/// Multihash code of the identity "hash": the digest is the content itself.
pub const IDENTITY: u64 = 0x00;
/// Multihash code for BLAKE3 with a 256-bit digest.
pub const BLAKE3_256: u64 = 0x1e;
/// Multicodec tag for unstructured bytes.
pub const RAW: u64 = 0x55;
/// Multicodec tag for DAG-CBOR encoded blocks.
pub const DAG_CBOR: u64 = 0x71;

/// Largest digest a CID can carry, and therefore the largest identity block.
pub const MAX_IDENTITY_SIZE: usize = 64;

/// Returns the embedded content if `cid` is an identity address.
///
/// The declared hash code is checked first so that ordinary addresses never
/// pay for a multihash decode. Only identity candidates are fully decoded and
/// re-checked. Any decode failure is reported as "not identity".
pub fn extract_identity(cid: &Cid) -> Option<Bytes> {
    if cid.hash().code() != IDENTITY {
        return None;
    }

    let decoded = Multihash::<64>::from_bytes(&cid.hash().to_bytes()).ok()?;
    if decoded.code() != IDENTITY {
        return None;
    }
    Some(Bytes::copy_from_slice(decoded.digest()))
}

/// Returns `true` if `cid` is a self-describing identity address.
pub fn is_identity(cid: &Cid) -> bool {
    extract_identity(cid).is_some()
}

/// Build a CIDv1 whose multihash embeds `data` verbatim.
pub fn identity_cid(codec: u64, data: &[u8]) -> Result<Cid, TypeError> {
    if data.len() > MAX_IDENTITY_SIZE {
        return Err(TypeError::IdentityTooLarge {
            size: data.len(),
            max: MAX_IDENTITY_SIZE,
        });
    }
    let mh = Multihash::<64>::wrap(IDENTITY, data)
        .map_err(|e| TypeError::InvalidMultihash(e.to_string()))?;
    Ok(Cid::new_v1(codec, mh))
}

/// Hash `data` with BLAKE3 and return the CIDv1 addressing it.
pub fn blake3_cid(codec: u64, data: &[u8]) -> Cid {
    let mh = Multihash::<64>::wrap(BLAKE3_256, blake3::hash(data).as_bytes())
        .expect("blake3 32-byte digest always fits in 64-byte multihash");
    Cid::new_v1(codec, mh)
}

/// Parse a CID from its string form (base32 CIDv1 or base58 CIDv0).
pub fn parse_cid(s: &str) -> Result<Cid, TypeError> {
    Cid::try_from(s).map_err(|e| TypeError::InvalidCid(e.to_string()))
}

/// Check that `data` hashes to the digest declared by `cid`.
///
/// Supports identity and BLAKE3-256 addresses.
pub fn verify_block(cid: &Cid, data: &[u8]) -> Result<bool, TypeError> {
    match cid.hash().code() {
        IDENTITY => Ok(cid.hash().digest() == data),
        BLAKE3_256 => Ok(cid.hash().digest() == blake3::hash(data).as_bytes()),
        other => Err(TypeError::UnsupportedHash(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn blake3_cid_is_not_identity() {
        let cid = blake3_cid(RAW, b"hello world");
        assert_eq!(cid.hash().code(), BLAKE3_256);
        assert!(extract_identity(&cid).is_none());
        assert!(!is_identity(&cid));
    }

    #[test]
    fn identity_cid_embeds_content() {
        let cid = identity_cid(RAW, b"inline").unwrap();
        assert_eq!(extract_identity(&cid).unwrap().as_ref(), b"inline");
    }

    #[test]
    fn empty_identity_is_identity() {
        let cid = identity_cid(DAG_CBOR, b"").unwrap();
        let embedded = extract_identity(&cid).expect("empty identity is still identity");
        assert!(embedded.is_empty());
    }

    #[test]
    fn identity_too_large_rejected() {
        let data = vec![7u8; MAX_IDENTITY_SIZE + 1];
        assert_eq!(
            identity_cid(RAW, &data),
            Err(TypeError::IdentityTooLarge {
                size: MAX_IDENTITY_SIZE + 1,
                max: MAX_IDENTITY_SIZE
            })
        );
    }

    #[test]
    fn parse_roundtrips_display() {
        let cid = blake3_cid(RAW, b"parse me");
        let parsed = parse_cid(&cid.to_string()).unwrap();
        assert_eq!(parsed, cid);
    }

    #[test]
    fn parse_garbage_fails() {
        assert!(matches!(parse_cid("not-a-cid"), Err(TypeError::InvalidCid(_))));
    }

    #[test]
    fn verify_blake3() {
        let cid = blake3_cid(RAW, b"original");
        assert!(verify_block(&cid, b"original").unwrap());
        assert!(!verify_block(&cid, b"tampered").unwrap());
    }

    #[test]
    fn verify_identity() {
        let cid = identity_cid(RAW, b"abc").unwrap();
        assert!(verify_block(&cid, b"abc").unwrap());
        assert!(!verify_block(&cid, b"abd").unwrap());
    }

    #[test]
    fn verify_unsupported_hash() {
        // sha2-256
        let mh = Multihash::<64>::wrap(0x12, &[0u8; 32]).unwrap();
        let cid = Cid::new_v1(RAW, mh);
        assert_eq!(verify_block(&cid, b"x"), Err(TypeError::UnsupportedHash(0x12)));
    }

    proptest! {
        #[test]
        fn identity_detection_returns_exact_bytes(data in proptest::collection::vec(any::<u8>(), 0..=MAX_IDENTITY_SIZE)) {
            let cid = identity_cid(RAW, &data).unwrap();
            let embedded = extract_identity(&cid).unwrap();
            prop_assert_eq!(embedded.as_ref(), data.as_slice());
        }

        #[test]
        fn hashed_addresses_never_classify_as_identity(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert!(!is_identity(&blake3_cid(RAW, &data)));
        }
    }
}
