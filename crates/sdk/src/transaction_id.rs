//! Transaction ids: the payer account plus the start of the validity window.
//!
//! Generated ids are strictly increasing process-wide, backdated by a small
//! clock-drift allowance so a submitting node with a slightly slow clock
//! still accepts the validity window.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::entity_id::AccountId;
use crate::error::{Error, Result};

/// Allowance for the submitting node's clock lagging ours.
const CLOCK_DRIFT_NANOS: i64 = 10_000_000_000;

/// Minimum spacing between two generated valid-start instants.
const MONOTONIC_STEP_NANOS: i64 = 1_000;

/// Last generated valid-start, in nanoseconds since the epoch.
static LAST_GENERATED_NANOS: AtomicI64 = AtomicI64::new(0);

/// The unique identity of a transaction.
///
/// Total order: unscheduled ids sort before scheduled ones, ids without a
/// payer account sort before ids with one, then payer account and
/// valid-start compare in the obvious way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TransactionId {
    /// Account paying for the transaction.
    pub account_id: Option<AccountId>,
    /// Start of the validity window, nanoseconds since the epoch.
    pub valid_start_nanos: Option<i64>,
    /// Distinguishes child transactions spawned by the same parent.
    pub nonce: Option<i32>,
    /// Whether this id refers to a scheduled execution.
    pub scheduled: bool,
}

impl TransactionId {
    /// Generates a fresh id for the given payer, with a valid-start that is
    /// unique and strictly increasing across threads.
    pub fn generate(account_id: AccountId) -> Self {
        let skew = rand::thread_rng().gen_range(0..MONOTONIC_STEP_NANOS);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(CLOCK_DRIFT_NANOS);
        let candidate = now - CLOCK_DRIFT_NANOS + skew;

        let prev = LAST_GENERATED_NANOS
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |last| {
                Some(if candidate > last { candidate } else { last + MONOTONIC_STEP_NANOS })
            })
            .unwrap_or(candidate);
        let chosen = if candidate > prev { candidate } else { prev + MONOTONIC_STEP_NANOS };

        Self {
            account_id: Some(account_id),
            valid_start_nanos: Some(chosen),
            nonce: None,
            scheduled: false,
        }
    }

    /// Builds an id from explicit parts.
    pub fn with_valid_start(account_id: AccountId, valid_start_nanos: i64) -> Self {
        Self {
            account_id: Some(account_id),
            valid_start_nanos: Some(valid_start_nanos),
            nonce: None,
            scheduled: false,
        }
    }

    /// The same id shifted forward by `nanos`; chunked transactions derive
    /// per-chunk ids this way.
    pub(crate) fn offset_nanos(mut self, nanos: i64) -> Self {
        if let Some(start) = self.valid_start_nanos.as_mut() {
            *start += nanos;
        }
        self
    }

    pub(crate) fn to_protobuf(self) -> hiero_proto::TransactionId {
        hiero_proto::TransactionId {
            transaction_valid_start: self.valid_start_nanos.map(|n| hiero_proto::Timestamp {
                seconds: n.div_euclid(1_000_000_000),
                nanos: n.rem_euclid(1_000_000_000) as i32,
            }),
            account_id: self.account_id.map(AccountId::to_protobuf),
            scheduled: self.scheduled,
            nonce: self.nonce.unwrap_or(0),
        }
    }

    pub(crate) fn from_protobuf(pb: hiero_proto::TransactionId) -> Self {
        Self {
            account_id: pb.account_id.map(AccountId::from_protobuf),
            // Saturate: the timestamp comes off the wire.
            valid_start_nanos: pb.transaction_valid_start.map(|t| {
                t.seconds.saturating_mul(1_000_000_000).saturating_add(i64::from(t.nanos))
            }),
            nonce: (pb.nonce != 0).then_some(pb.nonce),
            scheduled: pb.scheduled,
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(account_id) = self.account_id {
            write!(f, "{account_id}")?;
        }
        if let Some(nanos) = self.valid_start_nanos {
            write!(
                f,
                "@{}.{:09}",
                nanos.div_euclid(1_000_000_000),
                nanos.rem_euclid(1_000_000_000)
            )?;
        }
        if self.scheduled {
            f.write_str("?scheduled")?;
        }
        if let Some(nonce) = self.nonce {
            write!(f, "/{nonce}")?;
        }
        Ok(())
    }
}

impl FromStr for TransactionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (rest, nonce) = match s.rsplit_once('/') {
            Some((rest, nonce)) => {
                let nonce = nonce
                    .parse::<i32>()
                    .map_err(|_| Error::basic_parse(format!("invalid nonce in {s:?}")))?;
                (rest, Some(nonce))
            }
            None => (s, None),
        };
        let (rest, scheduled) = match rest.strip_suffix("?scheduled") {
            Some(rest) => (rest, true),
            None => (rest, false),
        };
        let Some((account, start)) = rest.split_once('@') else {
            return Err(Error::basic_parse(format!(
                "expected transaction id of form `account@seconds.nanos`, got {s:?}"
            )));
        };
        let account_id: AccountId = account.parse()?;
        let Some((seconds, nanos)) = start.split_once('.') else {
            return Err(Error::basic_parse(format!(
                "expected valid start of form `seconds.nanos` in {s:?}"
            )));
        };
        let seconds = seconds
            .parse::<i64>()
            .map_err(|_| Error::basic_parse(format!("invalid seconds in {s:?}")))?;
        let nanos = nanos
            .parse::<i64>()
            .map_err(|_| Error::basic_parse(format!("invalid nanos in {s:?}")))?;
        if !(0..1_000_000_000).contains(&nanos) {
            return Err(Error::basic_parse(format!("nanos out of range in {s:?}")));
        }
        Ok(Self {
            account_id: Some(account_id),
            valid_start_nanos: Some(seconds * 1_000_000_000 + nanos),
            nonce,
            scheduled,
        })
    }
}

impl Ord for TransactionId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Scheduled ids sort after unscheduled ones; absent fields sort
        // before present ones.
        self.scheduled
            .cmp(&other.scheduled)
            .then_with(|| self.account_id.cmp(&other.account_id))
            .then_with(|| self.valid_start_nanos.cmp(&other.valid_start_nanos))
    }
}

impl PartialOrd for TransactionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
