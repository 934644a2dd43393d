//! Typed views over raw storage values.
//!
//! The indexer hands back Micheline rendered as JSON: naturals are decimal
//! strings, records are objects keyed by field annotation, sets and lists are
//! arrays. Values are checked here once, so the holdings sources only deal with
//! the types below.

use crate::amount::{self, TokenAmount};
use crate::reader::StorageKey;
use crate::Error;
use serde_json::Value;

/// A natural, possibly nested inside a record at a dot separated `field` path.
fn nat_at(key: &StorageKey, value: &Value, field: Option<&str>) -> Result<TokenAmount, Error> {
    let value = match field {
        Some(field) => field.split('.').try_fold(value, |value, name| {
            value.get(name).ok_or_else(|| malformed(key, format!("missing field `{}`", name)))
        })?,
        None => value,
    };
    nat(key, value)
}

fn nat(key: &StorageKey, value: &Value) -> Result<TokenAmount, Error> {
    match value {
        Value::String(s) => {
            amount::parse(s).ok_or_else(|| malformed(key, format!("`{}` is not a natural", s)))
        }
        Value::Number(n) => n
            .as_u64()
            .map(TokenAmount::from)
            .ok_or_else(|| malformed(key, format!("`{}` is not a natural", n))),
        other => Err(malformed(key, format!("expected a natural, found {}", other))),
    }
}

fn malformed(key: &StorageKey, reason: String) -> Error {
    Error::Malformed {
        key: key.to_string(),
        reason,
    }
}

/// Token units credited to an owner in a token ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenBalance(pub TokenAmount);

impl TokenBalance {
    pub fn decode(key: &StorageKey, value: &Value, field: Option<&str>) -> Result<Self, Error> {
        nat_at(key, value, field).map(Self)
    }
}

/// Pool shares (LP tokens, farm deposits) credited to an owner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareBalance(pub TokenAmount);

impl ShareBalance {
    pub fn decode(key: &StorageKey, value: &Value, field: Option<&str>) -> Result<Self, Error> {
        nat_at(key, value, field).map(Self)
    }
}

/// Principal of a single stake
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeRecord {
    pub stake: TokenAmount,
}

impl StakeRecord {
    pub fn decode(key: &StorageKey, value: &Value, field: Option<&str>) -> Result<Self, Error> {
        nat_at(key, value, field).map(|stake| Self { stake })
    }
}

/// Ids of the stakes owned by one address
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StakeIds(pub Vec<TokenAmount>);

impl StakeIds {
    pub fn decode(key: &StorageKey, value: &Value) -> Result<Self, Error> {
        value
            .as_array()
            .ok_or_else(|| malformed(key, format!("expected a list of stake ids, found {}", value)))?
            .iter()
            .map(|id| nat(key, id))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// A plain natural stored directly in contract storage (supplies, reserves, totals)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageNat(pub TokenAmount);

impl StorageNat {
    pub fn decode(key: &StorageKey, value: &Value) -> Result<Self, Error> {
        nat(key, value).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> StorageKey {
        StorageKey::field("KT1Pool", "storage")
    }

    #[test]
    fn decodes_bare_naturals() {
        assert_eq!(
            TokenBalance::decode(&key(), &json!("123456789012345678901234"), None).unwrap(),
            TokenBalance(amount::parse("123456789012345678901234").unwrap())
        );
        assert_eq!(
            StorageNat::decode(&key(), &json!(42)).unwrap(),
            StorageNat(TokenAmount::from(42u8))
        );
    }

    #[test]
    fn decodes_record_fields() {
        let value = json!({ "balance": "17", "approvals": {} });
        assert_eq!(
            ShareBalance::decode(&key(), &value, Some("balance")).unwrap(),
            ShareBalance(TokenAmount::from(17u8))
        );

        let nested = json!({ "storage": { "total_supply": "900" } });
        assert_eq!(
            StakeRecord::decode(&key(), &nested, Some("storage.total_supply"))
                .unwrap()
                .stake,
            TokenAmount::from(900u16)
        );
    }

    #[test]
    fn decodes_stake_ids() {
        assert_eq!(
            StakeIds::decode(&key(), &json!(["3", "17"])).unwrap(),
            StakeIds(vec![TokenAmount::from(3u8), TokenAmount::from(17u8)])
        );
        assert_eq!(StakeIds::decode(&key(), &json!([])).unwrap(), StakeIds::default());
    }

    #[test]
    fn rejects_unexpected_shapes() {
        assert!(TokenBalance::decode(&key(), &json!("-5"), None).is_err());
        assert!(TokenBalance::decode(&key(), &json!(1.5), None).is_err());
        assert!(ShareBalance::decode(&key(), &json!({ "stake": "1" }), Some("balance")).is_err());
        assert!(StakeIds::decode(&key(), &json!("3")).is_err());
        assert!(matches!(
            StorageNat::decode(&key(), &json!(null)),
            Err(Error::Malformed { .. })
        ));
    }
}
