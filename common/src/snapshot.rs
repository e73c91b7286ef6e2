use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::contract::{validate_new_product, ProductContract};
use crate::error::{ProductError, ProductResult};
use crate::ledger::InMemoryLedger;
use crate::location::{ProductLocationData, ProductLocationEntry};
use crate::product::{Product, ProductId};
use crate::transaction::Invocation;

/// Whole-ledger contents: key -> stored JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub entries: BTreeMap<String, String>,
}

/// How far along its route a stored record is.
///
/// Ordered by history length, then by the current arrival date, then by the
/// current location name. Two records of the same product that share a past
/// always compare the same way on every peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordVersion {
    pub history_len: usize,
    pub current: ProductLocationEntry,
}

impl RecordVersion {
    fn of(product: &Product) -> Self {
        Self {
            history_len: product.location_data.history_len(),
            current: product.location_data.current.clone(),
        }
    }
}

impl Ord for RecordVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.history_len
            .cmp(&other.history_len)
            .then_with(|| self.current.arrival_date.cmp(&other.current.arrival_date))
            .then_with(|| self.current.location.cmp(&other.current.location))
    }
}

impl PartialOrd for RecordVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Summary of a snapshot: key -> version of the record held.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub versions: BTreeMap<String, RecordVersion>,
}

/// A change to a ledger snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LedgerDelta {
    /// Records to merge, as produced by [`LedgerSnapshot::delta`].
    Entries(LedgerSnapshot),
    /// Write transactions to replay through the contract, in order.
    Invocations(Vec<Invocation>),
}

impl LedgerDelta {
    /// Apply to `snapshot`. On error the snapshot is left as it was.
    pub fn apply(self, snapshot: &mut LedgerSnapshot) -> ProductResult<()> {
        match self {
            LedgerDelta::Entries(entries) => {
                entries.validate()?;
                snapshot.merge(entries);
            }
            LedgerDelta::Invocations(invocations) => {
                let ledger = InMemoryLedger::from_snapshot(snapshot.clone());
                let contract = ProductContract::new(&ledger);
                let applied = contract.apply_invocations(invocations)?;
                *snapshot = ledger.snapshot()?;
                tracing::debug!(applied, "replayed invocations");
            }
        }
        Ok(())
    }
}

fn decode(value: &str) -> Option<Product> {
    codec::decode::<Product>(value.as_bytes()).ok()
}

fn same_attributes(a: &Product, b: &Product) -> bool {
    let strip = |p: &Product| Product {
        location_data: ProductLocationData::default(),
        ..p.clone()
    };
    strip(a) == strip(b)
}

/// Whether `incoming` may replace `ours`.
///
/// Only `ship` changes a stored product, and it only ever appends to
/// `previous`. So a replacement must carry the same attributes and keep our
/// `previous` as its prefix; its current stop may differ from ours when the
/// product was shipped from the same place on two peers.
fn supersedes(incoming: &Product, ours: &Product) -> bool {
    let their_past = &incoming.location_data.previous;
    let our_past = &ours.location_data.previous;
    if same_attributes(incoming, ours) {
        if their_past.starts_with(our_past) {
            return RecordVersion::of(incoming) > RecordVersion::of(ours);
        }
        if our_past.starts_with(their_past) {
            return false;
        }
    }
    tracing::warn!(product_id = %ours.id, "ignoring record that rewrites product history");
    false
}

impl LedgerSnapshot {
    /// Check every entry is a complete product stored under its own id.
    pub fn validate(&self) -> ProductResult<()> {
        for (key, value) in &self.entries {
            let id = ProductId::from(key.as_str());
            let product = codec::decode_record(&id, value.as_bytes())?;
            if product.id != id {
                return Err(ProductError::CorruptRecord {
                    id,
                    reason: format!("record carries id {}", product.id),
                });
            }
            validate_new_product(&product).map_err(|e| ProductError::CorruptRecord {
                id,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Merge another snapshot into this one.
    ///
    /// New keys are added. For a key we already hold, the incoming record wins
    /// only if it continues our record's route and has the greater
    /// [`RecordVersion`]; the result does not depend on which side merges
    /// first. Undecodable incoming records are skipped.
    pub fn merge(&mut self, other: LedgerSnapshot) {
        for (key, value) in other.entries {
            let Some(incoming) = decode(&value) else {
                continue;
            };
            let replace = match self.entries.get(&key).and_then(|v| decode(v)) {
                Some(ours) => supersedes(&incoming, &ours),
                None => true,
            };
            if replace {
                self.entries.insert(key, value);
            }
        }
    }

    pub fn summarize(&self) -> LedgerSummary {
        LedgerSummary {
            versions: self
                .entries
                .iter()
                .filter_map(|(key, value)| {
                    decode(value).map(|product| (key.clone(), RecordVersion::of(&product)))
                })
                .collect(),
        }
    }

    /// Entries the summarizer is missing or holds an older version of.
    pub fn delta(&self, summary: &LedgerSummary) -> LedgerSnapshot {
        let entries = self
            .entries
            .iter()
            .filter(|(key, value)| {
                let Some(ours) = decode(value) else {
                    return false;
                };
                summary
                    .versions
                    .get(*key)
                    .is_none_or(|theirs| RecordVersion::of(&ours) > *theirs)
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        LedgerSnapshot { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::tests::product_json;

    fn ship(snapshot: &LedgerSnapshot, location: &str, date: &str) -> LedgerSnapshot {
        let mut next = snapshot.clone();
        LedgerDelta::Invocations(vec![Invocation::new(
            "shipProductTo",
            vec!["p".into(), location.into(), date.into()],
        )])
        .apply(&mut next)
        .unwrap();
        next
    }

    fn record(snapshot: &LedgerSnapshot) -> Product {
        codec::decode(snapshot.entries["p"].as_bytes()).unwrap()
    }

    fn entries_of(product: &Product) -> LedgerSnapshot {
        let text = String::from_utf8(codec::encode(product).unwrap()).unwrap();
        LedgerSnapshot {
            entries: BTreeMap::from([(product.id.to_string(), text)]),
        }
    }

    fn snapshot_after(ships: &[&str]) -> LedgerSnapshot {
        let contract = ProductContract::new(InMemoryLedger::new());
        contract
            .create_product(product_json("p").to_string())
            .unwrap();
        for (i, location) in ships.iter().enumerate() {
            contract
                .ship_product_to("p", location, &format!("T{i}"))
                .unwrap();
        }
        contract.ledger().snapshot().unwrap()
    }

    #[test]
    fn contract_output_validates() {
        assert!(snapshot_after(&["Mill"]).validate().is_ok());
    }

    #[test]
    fn mismatched_key_is_invalid() {
        let mut snapshot = snapshot_after(&[]);
        let value = snapshot.entries.remove("p").unwrap();
        snapshot.entries.insert("q".into(), value);
        assert!(matches!(
            snapshot.validate(),
            Err(ProductError::CorruptRecord { id, .. }) if id.as_str() == "q"
        ));
    }

    #[test]
    fn merge_keeps_longer_history() {
        let mut short = snapshot_after(&["Mill"]);
        let long = snapshot_after(&["Mill", "Shop"]);

        short.merge(long.clone());
        assert_eq!(short, long);

        let mut long_again = long.clone();
        long_again.merge(snapshot_after(&["Elsewhere"]));
        assert_eq!(long_again, long);
    }

    #[test]
    fn merge_adds_new_keys_and_skips_garbage() {
        let mut ours = LedgerSnapshot::default();
        let mut theirs = snapshot_after(&[]);
        theirs.entries.insert("junk".into(), "{{{".into());

        ours.merge(theirs);
        assert!(ours.entries.contains_key("p"));
        assert!(!ours.entries.contains_key("junk"));
    }

    #[test]
    fn invocation_delta_replays_writes() {
        let mut snapshot = snapshot_after(&[]);
        let delta = LedgerDelta::Invocations(vec![Invocation::new(
            "shipProductTo",
            vec!["p".into(), "Mill".into(), "T0".into()],
        )]);
        delta.apply(&mut snapshot).unwrap();
        assert_eq!(snapshot, snapshot_after(&["Mill"]));
    }

    #[test]
    fn failed_delta_leaves_snapshot_alone() {
        let mut snapshot = snapshot_after(&[]);
        let before = snapshot.clone();
        let delta = LedgerDelta::Invocations(vec![
            Invocation::new("shipProductTo", vec!["p".into(), "Mill".into(), "T0".into()]),
            Invocation::new("shipProductTo", vec!["nope".into(), "Mill".into(), "T0".into()]),
        ]);
        assert!(matches!(
            delta.apply(&mut snapshot),
            Err(ProductError::NotFound(_))
        ));
        assert_eq!(snapshot, before);

        let mut bad = LedgerSnapshot::default();
        bad.entries.insert("x".into(), "{}".into());
        assert!(LedgerDelta::Entries(bad).apply(&mut snapshot).is_err());
        assert_eq!(snapshot, before);
    }

    #[test]
    fn entries_delta_merges() {
        let mut snapshot = snapshot_after(&["Mill"]);
        let newer = snapshot_after(&["Mill", "Shop"]);
        let delta = LedgerDelta::Entries(newer.delta(&snapshot.summarize()));
        let json = serde_json::to_string(&delta).unwrap();
        assert!(json.starts_with(r#"{"entries":"#));

        let delta: LedgerDelta = serde_json::from_str(&json).unwrap();
        delta.apply(&mut snapshot).unwrap();
        assert_eq!(snapshot, newer);
    }

    #[test]
    fn delta_sends_only_what_summary_lacks() {
        let current = snapshot_after(&["Mill", "Shop"]);

        let stale = snapshot_after(&["Mill"]).summarize();
        assert_eq!(stale.versions.get("p").map(|v| v.history_len), Some(1));
        assert_eq!(current.delta(&stale), current);

        let fresh = current.summarize();
        assert!(current.delta(&fresh).entries.is_empty());
        assert_eq!(current.delta(&LedgerSummary::default()), current);
    }

    #[test]
    fn incomplete_record_is_invalid() {
        let mut snapshot = snapshot_after(&["Mill"]);
        let before = snapshot.clone();
        let mut product = record(&snapshot);
        product.name.clear();

        assert!(matches!(
            entries_of(&product).validate(),
            Err(ProductError::CorruptRecord { reason, .. }) if reason.contains("'name'")
        ));
        assert!(LedgerDelta::Entries(entries_of(&product))
            .apply(&mut snapshot)
            .is_err());
        assert_eq!(snapshot, before);
    }

    #[test]
    fn forged_history_is_ignored() {
        let mut snapshot = snapshot_after(&["Mill"]);
        let before = snapshot.clone();
        let mut forged = record(&snapshot);
        forged.location_data = ProductLocationData {
            current: ProductLocationEntry::new("X", "T9"),
            previous: vec![
                ProductLocationEntry::new("Nowhere", "T7"),
                ProductLocationEntry::new("Else", "T8"),
            ],
        };

        LedgerDelta::Entries(entries_of(&forged))
            .apply(&mut snapshot)
            .unwrap();
        assert_eq!(snapshot, before);
    }

    #[test]
    fn attributes_cannot_change_alongside_a_ship() {
        let mut snapshot = snapshot_after(&["Mill"]);
        let before = snapshot.clone();
        let mut shipped = record(&ship(&snapshot, "Shop", "T1"));
        shipped.barcode = "counterfeit".into();

        LedgerDelta::Entries(entries_of(&shipped))
            .apply(&mut snapshot)
            .unwrap();
        assert_eq!(snapshot, before);
    }

    #[test]
    fn concurrent_ships_converge() {
        let base = snapshot_after(&[]);
        let mut a = ship(&base, "A-side", "T1");
        let mut b = ship(&base, "B-side", "T1");

        let to_b = a.delta(&b.summarize());
        let to_a = b.delta(&a.summarize());
        LedgerDelta::Entries(to_b).apply(&mut b).unwrap();
        LedgerDelta::Entries(to_a).apply(&mut a).unwrap();

        assert_eq!(a, b);
        assert_eq!(record(&a).location_data.current.location, "B-side");
        assert!(a.delta(&b.summarize()).entries.is_empty());
    }

    #[test]
    fn merge_order_does_not_matter() {
        let base = snapshot_after(&[]);
        let early = ship(&base, "Depot", "T1");
        let late = ship(&base, "Market", "T2");

        let mut left = early.clone();
        left.merge(late.clone());
        let mut right = late.clone();
        right.merge(early);

        assert_eq!(left, right);
        assert_eq!(left, late);
    }
}
