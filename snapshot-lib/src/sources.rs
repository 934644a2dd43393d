//! Strategies computing how many tokens a voter holds through one source.
//!
//! Each source answers with an exact amount for a single voter. A voter who never
//! touched a source simply has nothing there: absent entries read as zero, only
//! values that are present but unusable are errors.

use crate::amount::{self, ExactAmount, TokenAmount};
use crate::reader::{BigMapKey, Snapshot, StorageKey};
use crate::schema::{ShareBalance, StakeIds, StakeRecord, StorageNat, TokenBalance};
use crate::{Address, ContractAddress, Error};
use serde::Deserialize;
use serde_json::Value;

/// How a big map is keyed by owner
#[derive(Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyShape {
    #[default]
    Address,
    /// FA2 ledgers keyed by `(owner, token_id)`
    OwnerTokenId { token_id: u64 },
}

impl KeyShape {
    pub fn key_for(&self, owner: &str) -> BigMapKey {
        match self {
            Self::Address => BigMapKey::address(owner),
            Self::OwnerTokenId { token_id } => BigMapKey::owner_token_id(owner, *token_id),
        }
    }
}

/// A per-owner entry in a big map, holding either a bare natural or a record
/// with the natural at `value_field`.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BalanceEntry {
    pub contract: ContractAddress,
    pub path: String,
    #[serde(default)]
    pub key: KeyShape,
    #[serde(default)]
    pub value_field: Option<String>,
}

impl BalanceEntry {
    pub fn lookup(
        &self,
        snapshot: &Snapshot<'_>,
        owner: &str,
    ) -> Result<Option<(StorageKey, Value)>, Error> {
        snapshot.big_map_entry(&self.contract, &self.path, self.key.key_for(owner))
    }

    fn field(&self) -> Option<&str> {
        self.value_field.as_deref()
    }

    pub fn balance_of(&self, snapshot: &Snapshot<'_>, owner: &str) -> Result<TokenAmount, Error> {
        match self.lookup(snapshot, owner)? {
            Some((key, value)) => Ok(TokenBalance::decode(&key, &value, self.field())?.0),
            None => Ok(TokenAmount::default()),
        }
    }
}

/// The ledger of the governance token itself
pub type TokenLedger = BalanceEntry;

/// Everything a source may read: the pinned snapshot and the token ledger.
pub struct SourceContext<'a> {
    pub snapshot: Snapshot<'a>,
    pub token: &'a TokenLedger,
}

pub trait ValueSource {
    /// Name of the report column for this source
    fn column(&self) -> &str;

    /// Exact amount of tokens `voter` holds through this source.
    fn exact_amount(&self, ctx: &SourceContext<'_>, voter: &Address) -> Result<ExactAmount, Error>;
}

/// Tokens held directly in the voter's wallet
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DirectBalance {
    pub column: String,
}

impl ValueSource for DirectBalance {
    fn column(&self) -> &str {
        &self.column
    }

    fn exact_amount(&self, ctx: &SourceContext<'_>, voter: &Address) -> Result<ExactAmount, Error> {
        ctx.token
            .balance_of(&ctx.snapshot, voter)
            .map(amount::exact)
    }
}

/// A staking pool recording the staked principal per address
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StakingPool {
    pub column: String,
    pub stakes: BalanceEntry,
}

impl ValueSource for StakingPool {
    fn column(&self) -> &str {
        &self.column
    }

    fn exact_amount(&self, ctx: &SourceContext<'_>, voter: &Address) -> Result<ExactAmount, Error> {
        match self.stakes.lookup(&ctx.snapshot, voter)? {
            Some((key, value)) => {
                let record = StakeRecord::decode(&key, &value, self.stakes.field())?;
                Ok(amount::exact(record.stake))
            }
            None => Ok(amount::zero()),
        }
    }
}

fn default_owner_index_path() -> String {
    "stakes_owner_lookup".to_owned()
}

fn default_stakes_path() -> String {
    "stakes".to_owned()
}

fn default_stake_field() -> String {
    "stake".to_owned()
}

fn default_total_stake_path() -> String {
    "total_stake".to_owned()
}

/// A single staking contract where each address owns any number of stakes.
///
/// A stake entitles its owner to `balance * stake / total_stake`, `balance`
/// being the tokens the contract itself holds in the token ledger.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UnifiedStaking {
    pub column: String,
    pub contract: ContractAddress,
    #[serde(default = "default_owner_index_path")]
    pub owner_index_path: String,
    #[serde(default = "default_stakes_path")]
    pub stakes_path: String,
    #[serde(default = "default_stake_field")]
    pub stake_field: String,
    #[serde(default = "default_total_stake_path")]
    pub total_stake_path: String,
}

impl UnifiedStaking {
    fn stake_ids(&self, snapshot: &Snapshot<'_>, voter: &Address) -> Result<StakeIds, Error> {
        match snapshot.big_map_entry(
            &self.contract,
            &self.owner_index_path,
            BigMapKey::address(voter),
        )? {
            Some((key, value)) => StakeIds::decode(&key, &value),
            None => Ok(StakeIds::default()),
        }
    }

    fn stake(&self, snapshot: &Snapshot<'_>, id: &TokenAmount) -> Result<StakeRecord, Error> {
        let key = StorageKey::big_map_entry(&self.contract, &self.stakes_path, BigMapKey::nat(id));
        match snapshot.get(&key)? {
            Some(value) => StakeRecord::decode(&key, &value, Some(&self.stake_field)),
            None => Err(Error::Malformed {
                key: key.to_string(),
                reason: "stake listed for owner does not exist".to_owned(),
            }),
        }
    }
}

impl ValueSource for UnifiedStaking {
    fn column(&self) -> &str {
        &self.column
    }

    fn exact_amount(&self, ctx: &SourceContext<'_>, voter: &Address) -> Result<ExactAmount, Error> {
        let snapshot = &ctx.snapshot;
        let stakes = self
            .stake_ids(snapshot, voter)?
            .0
            .iter()
            .map(|id| self.stake(snapshot, id))
            .collect::<Result<Vec<_>, _>>()?;
        if stakes.iter().all(|record| amount::is_zero(&record.stake)) {
            return Ok(amount::zero());
        }

        let balance = ctx.token.balance_of(snapshot, &self.contract)?;
        let total_stake = required_nat(snapshot, &self.contract, &self.total_stake_path)?;

        stakes.into_iter().try_fold(amount::zero(), |acc, record| {
            amount::pro_rata(amount::exact(record.stake), &total_stake, &balance)
                .map(|withdrawable| acc + withdrawable)
                .ok_or_else(|| Error::ZeroDenominator {
                    what: "total stake",
                    voter: voter.clone(),
                })
        })
    }
}

/// Reserve side of a liquidity pool
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PoolReserves {
    pub contract: ContractAddress,
    pub total_supply_path: String,
    /// Reserve of the governance token
    pub reserve_path: String,
}

/// LP shares deposited into a yield farm, still backed by the pool reserve
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Farm {
    #[serde(flatten)]
    pub deposits: BalanceEntry,
    /// Extra decimals the farm records shares with, relative to the LP token.
    /// Has to be confirmed per contract.
    #[serde(default)]
    pub share_decimals_offset: u32,
}

impl Farm {
    fn shares(&self, snapshot: &Snapshot<'_>, voter: &Address) -> Result<ExactAmount, Error> {
        match self.deposits.lookup(snapshot, voter)? {
            Some((key, value)) => {
                let shares = ShareBalance::decode(&key, &value, self.deposits.field())?.0;
                Ok(amount::scale_down(shares, self.share_decimals_offset))
            }
            None => Ok(amount::zero()),
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LiquidityPool {
    pub column: String,
    pub shares: BalanceEntry,
    pub pool: PoolReserves,
    #[serde(default)]
    pub farms: Vec<Farm>,
}

impl ValueSource for LiquidityPool {
    fn column(&self) -> &str {
        &self.column
    }

    fn exact_amount(&self, ctx: &SourceContext<'_>, voter: &Address) -> Result<ExactAmount, Error> {
        let snapshot = &ctx.snapshot;
        // farms are only looked at for holders of the LP token
        let own = match self.shares.lookup(snapshot, voter)? {
            Some((key, value)) => ShareBalance::decode(&key, &value, self.shares.field())?.0,
            None => return Ok(amount::zero()),
        };

        let shares = self
            .farms
            .iter()
            .try_fold(amount::exact(own), |acc, farm| {
                farm.shares(snapshot, voter).map(|farmed| acc + farmed)
            })?;
        if shares == amount::zero() {
            return Ok(amount::zero());
        }

        let supply = required_nat(snapshot, &self.pool.contract, &self.pool.total_supply_path)?;
        let reserve = required_nat(snapshot, &self.pool.contract, &self.pool.reserve_path)?;
        amount::pro_rata(shares, &supply, &reserve).ok_or_else(|| Error::ZeroDenominator {
            what: "LP total supply",
            voter: voter.clone(),
        })
    }
}

fn required_nat(snapshot: &Snapshot<'_>, contract: &str, path: &str) -> Result<TokenAmount, Error> {
    match snapshot.field(contract, path)? {
        Some((key, value)) => Ok(StorageNat::decode(&key, &value)?.0),
        None => Err(Error::Malformed {
            key: StorageKey::field(contract, path).to_string(),
            reason: "missing from storage".to_owned(),
        }),
    }
}

/// A configured holdings source, as listed in a proposal configuration.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HoldingsSource {
    DirectBalance(DirectBalance),
    StakingPool(StakingPool),
    UnifiedStaking(UnifiedStaking),
    LiquidityPool(LiquidityPool),
}

impl HoldingsSource {
    fn inner(&self) -> &dyn ValueSource {
        match self {
            Self::DirectBalance(source) => source,
            Self::StakingPool(source) => source,
            Self::UnifiedStaking(source) => source,
            Self::LiquidityPool(source) => source,
        }
    }

    /// Farms whose share precision differs from their LP token
    pub fn rescaled_farms(&self) -> impl Iterator<Item = &Farm> {
        let farms: &[Farm] = match self {
            Self::LiquidityPool(pool) => &pool.farms,
            _ => &[],
        };
        farms.iter().filter(|farm| farm.share_decimals_offset != 0)
    }
}

impl ValueSource for HoldingsSource {
    fn column(&self) -> &str {
        self.inner().column()
    }

    fn exact_amount(&self, ctx: &SourceContext<'_>, voter: &Address) -> Result<ExactAmount, Error> {
        self.inner().exact_amount(ctx, voter)
    }
}
