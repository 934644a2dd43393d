use crate::amount::{self, TokenAmount};
use crate::reader::Snapshot;
use crate::sources::{HoldingsSource, SourceContext, TokenLedger, ValueSource};
use crate::{Address, Error};
use serde::Serialize;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SourceAmount {
    pub source: String,
    #[serde(serialize_with = "as_decimal_string")]
    pub amount: TokenAmount,
}

/// Tokens held by one voter at the snapshot height, per source, in token units.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct HoldingsBreakdown {
    pub voter: Address,
    /// In the order the sources were configured
    pub per_source: Vec<SourceAmount>,
    #[serde(serialize_with = "as_decimal_string")]
    pub total: TokenAmount,
}

impl HoldingsBreakdown {
    pub fn amount(&self, source: &str) -> Option<&TokenAmount> {
        self.per_source
            .iter()
            .find(|entry| entry.source == source)
            .map(|entry| &entry.amount)
    }
}

fn as_decimal_string<S: serde::Serializer>(
    amount: &TokenAmount,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(amount)
}

/// Resolves every configured source for `voter` on `snapshot`.
///
/// Each source amount is truncated to token units on its own and `total` is the
/// plain sum of the truncated amounts, so totals can be reproduced from the
/// per-source columns of a report.
pub fn resolve_holdings(
    voter: &Address,
    snapshot: Snapshot<'_>,
    token: &TokenLedger,
    sources: &[HoldingsSource],
) -> Result<HoldingsBreakdown, Error> {
    let ctx = SourceContext { snapshot, token };
    let per_source = sources
        .iter()
        .map(|source| -> Result<SourceAmount, Error> {
            let exact = source.exact_amount(&ctx, voter)?;
            let amount = amount::floor(&exact).ok_or_else(|| Error::Malformed {
                key: source.column().to_owned(),
                reason: format!("{} does not resolve to a finite amount", voter),
            })?;
            Ok(SourceAmount {
                source: source.column().to_owned(),
                amount,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let total = per_source
        .iter()
        .fold(TokenAmount::default(), |acc, entry| acc + &entry.amount);

    Ok(HoldingsBreakdown {
        voter: voter.clone(),
        per_source,
        total,
    })
}
