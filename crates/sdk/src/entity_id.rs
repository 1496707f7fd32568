//! Entity ids (`shard.realm.num`) and their network-bound checksums.
//!
//! String-form ids may carry a five-letter checksum suffix
//! (`0.0.123-vfmkw`) derived from the id digits and the target network's
//! ledger id. A mismatch is a [`Error::BadEntityId`], distinct from the
//! parse errors raised for malformed strings.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Identifies which ledger (network) an entity id belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerId(Vec<u8>);

impl LedgerId {
    /// The production ledger.
    pub fn mainnet() -> Self {
        Self(vec![0])
    }

    /// The stable test ledger.
    pub fn testnet() -> Self {
        Self(vec![1])
    }

    /// The preview test ledger.
    pub fn previewnet() -> Self {
        Self(vec![2])
    }

    /// Builds a ledger id from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw ledger id bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [0] => f.write_str("mainnet"),
            [1] => f.write_str("testnet"),
            [2] => f.write_str("previewnet"),
            bytes => f.write_str(&hex::encode(bytes)),
        }
    }
}

impl FromStr for LedgerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mainnet" => Ok(Self::mainnet()),
            "testnet" => Ok(Self::testnet()),
            "previewnet" => Ok(Self::previewnet()),
            other => hex::decode(other)
                .map(Self)
                .map_err(|_| Error::basic_parse(format!("invalid ledger id {other:?}"))),
        }
    }
}

/// The id of a ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId {
    /// Shard the account lives in.
    pub shard: u64,
    /// Realm within the shard.
    pub realm: u64,
    /// The account number.
    pub num: u64,
}

/// The id of a consensus topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicId {
    /// Shard the topic lives in.
    pub shard: u64,
    /// Realm within the shard.
    pub realm: u64,
    /// The topic number.
    pub num: u64,
}

impl AccountId {
    /// Builds an account id in the default shard and realm.
    pub const fn new(num: u64) -> Self {
        Self { shard: 0, realm: 0, num }
    }

    /// Renders the id with its checksum for the given ledger.
    pub fn to_string_with_checksum(&self, ledger_id: &LedgerId) -> String {
        let addr = self.to_string();
        let check = checksum(ledger_id, &addr);
        format!("{addr}-{check}")
    }

    /// Verifies a checksum parsed alongside this id against a ledger.
    pub fn validate_checksum(&self, actual: &str, ledger_id: &LedgerId) -> Result<()> {
        validate_checksum(self.shard, self.realm, self.num, actual, ledger_id)
    }

    pub(crate) fn to_protobuf(self) -> hiero_proto::AccountId {
        hiero_proto::AccountId {
            shard_num: self.shard as i64,
            realm_num: self.realm as i64,
            account_num: self.num as i64,
        }
    }

    pub(crate) fn from_protobuf(pb: hiero_proto::AccountId) -> Self {
        Self {
            shard: pb.shard_num as u64,
            realm: pb.realm_num as u64,
            num: pb.account_num as u64,
        }
    }
}

impl TopicId {
    /// Builds a topic id in the default shard and realm.
    pub const fn new(num: u64) -> Self {
        Self { shard: 0, realm: 0, num }
    }

    /// Renders the id with its checksum for the given ledger.
    pub fn to_string_with_checksum(&self, ledger_id: &LedgerId) -> String {
        let addr = self.to_string();
        let check = checksum(ledger_id, &addr);
        format!("{addr}-{check}")
    }

    /// Verifies a checksum parsed alongside this id against a ledger.
    pub fn validate_checksum(&self, actual: &str, ledger_id: &LedgerId) -> Result<()> {
        validate_checksum(self.shard, self.realm, self.num, actual, ledger_id)
    }

    pub(crate) fn to_protobuf(self) -> hiero_proto::TopicId {
        hiero_proto::TopicId {
            shard_num: self.shard as i64,
            realm_num: self.realm as i64,
            topic_num: self.num as i64,
        }
    }

    pub(crate) fn from_protobuf(pb: hiero_proto::TopicId) -> Self {
        Self {
            shard: pb.shard_num as u64,
            realm: pb.realm_num as u64,
            num: pb.topic_num as u64,
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for AccountId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (shard, realm, num, _checksum) = parse_entity_id(s)?;
        Ok(Self { shard, realm, num })
    }
}

impl FromStr for TopicId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (shard, realm, num, _checksum) = parse_entity_id(s)?;
        Ok(Self { shard, realm, num })
    }
}

/// Splits `shard.realm.num[-checksum]` into its parts.
pub(crate) fn parse_entity_id(s: &str) -> Result<(u64, u64, u64, Option<&str>)> {
    let (addr, check) = match s.split_once('-') {
        Some((addr, check)) => (addr, Some(check)),
        None => (s, None),
    };
    if let Some(check) = check {
        if check.len() != 5 || !check.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(Error::basic_parse(format!(
                "invalid checksum {check:?} in entity id {s:?}"
            )));
        }
    }
    let mut parts = addr.splitn(3, '.');
    let (Some(shard), Some(realm), Some(num)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::basic_parse(format!(
            "expected entity id of form `shard.realm.num`, got {s:?}"
        )));
    };
    let parse = |part: &str| {
        part.parse::<u64>()
            .map_err(|_| Error::basic_parse(format!("invalid entity id part {part:?} in {s:?}")))
    };
    Ok((parse(shard)?, parse(realm)?, parse(num)?, check))
}

fn validate_checksum(
    shard: u64,
    realm: u64,
    num: u64,
    actual: &str,
    ledger_id: &LedgerId,
) -> Result<()> {
    let expected = checksum(ledger_id, &format!("{shard}.{realm}.{num}"));
    if expected == actual {
        Ok(())
    } else {
        Err(Error::BadEntityId {
            shard,
            realm,
            num,
            expected,
            actual: actual.to_owned(),
        })
    }
}

/// Five-letter checksum over an id's dotted-decimal form, bound to a ledger.
///
/// Digits (with `.` counted as 10) are folded by powers of 31 into sums mod
/// 11, 11, and 26^3; the ledger id bytes plus six zero bytes fold mod 26^5;
/// the combined value is permuted by the prime 1_000_003 and rendered as
/// five base-26 letters, most significant first.
pub(crate) fn checksum(ledger_id: &LedgerId, addr: &str) -> String {
    const P3: u64 = 26 * 26 * 26;
    const P5: u64 = 26 * 26 * 26 * 26 * 26;
    const W: u64 = 31;
    const M: u64 = 1_000_003;

    let mut s0 = 0u64;
    let mut s1 = 0u64;
    let mut s = 0u64;
    for (i, ch) in addr.chars().enumerate() {
        let d = if ch == '.' { 10 } else { ch.to_digit(10).unwrap_or(0) as u64 };
        s = (W * s + d) % P3;
        if i % 2 == 0 {
            s0 = (s0 + d) % 11;
        } else {
            s1 = (s1 + d) % 11;
        }
    }

    let mut sh = 0u64;
    for &b in ledger_id.as_bytes().iter().chain([0u8; 6].iter()) {
        sh = (W * sh + u64::from(b)) % P5;
    }

    let mut c = ((((addr.len() as u64 % 5) * 11 + s0) * 11 + s1) * P3 + s + sh) % P5;
    c = (c * M) % P5;

    let mut out = [0u8; 5];
    for slot in out.iter_mut().rev() {
        *slot = b'a' + (c % 26) as u8;
        c /= 26;
    }
    String::from_utf8(out.to_vec()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_account_id() {
        let id: AccountId = "0.0.123".parse().unwrap();
        assert_eq!(id, AccountId { shard: 0, realm: 0, num: 123 });
        assert_eq!(id.to_string(), "0.0.123");
    }

    #[test]
    fn test_parse_nonzero_shard_realm() {
        let id: AccountId = "1.2.3".parse().unwrap();
        assert_eq!(id, AccountId { shard: 1, realm: 2, num: 3 });
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        assert!("0.0".parse::<AccountId>().is_err());
        assert!("".parse::<AccountId>().is_err());
        assert!("0.0.".parse::<AccountId>().is_err());
    }

    #[test]
    fn test_parse_rejects_bad_checksum_length() {
        assert!("0.0.123-abc".parse::<AccountId>().is_err());
        assert!("0.0.123-abcdef".parse::<AccountId>().is_err());
        assert!("0.0.123-ABCDE".parse::<AccountId>().is_err());
    }

    #[test]
    fn test_checksum_is_deterministic_and_ledger_bound() {
        let id = AccountId::new(123);
        let on_mainnet = id.to_string_with_checksum(&LedgerId::mainnet());
        let on_testnet = id.to_string_with_checksum(&LedgerId::testnet());
        assert_eq!(on_mainnet, id.to_string_with_checksum(&LedgerId::mainnet()));
        assert_ne!(on_mainnet, on_testnet);
        let check = on_mainnet.split_once('-').unwrap().1;
        assert_eq!(check.len(), 5);
        assert!(check.bytes().all(|b| b.is_ascii_lowercase()));
    }

    #[test]
    fn test_validate_checksum_round_trip() {
        let ledger = LedgerId::testnet();
        let id = AccountId::new(98);
        let with_check = id.to_string_with_checksum(&ledger);
        let (_, _, _, check) = parse_entity_id(&with_check).unwrap();
        id.validate_checksum(check.unwrap(), &ledger).unwrap();
    }

    #[test]
    fn test_validate_checksum_mismatch_is_distinct_error() {
        let ledger = LedgerId::mainnet();
        let id = AccountId::new(98);
        let err = id.validate_checksum("aaaaa", &ledger).unwrap_err();
        assert!(matches!(err, Error::BadEntityId { .. }));
    }

    #[test]
    fn test_ledger_id_display_and_parse() {
        assert_eq!(LedgerId::mainnet().to_string(), "mainnet");
        assert_eq!("testnet".parse::<LedgerId>().unwrap(), LedgerId::testnet());
        assert_eq!(
            "0a0b".parse::<LedgerId>().unwrap(),
            LedgerId::from_bytes(vec![0x0a, 0x0b])
        );
    }
}
