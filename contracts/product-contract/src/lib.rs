//! Hosts the product ledger as a single Freenet contract.
//!
//! Contract state is a [`LedgerSnapshot`]. A delta is a [`LedgerDelta`]:
//! either write invocations replayed through the product contract, or
//! entries merged per product. A merged record must be complete and may only
//! move the product further along its route; anything else is refused
//! (`InvalidUpdate`) or ignored.
//!
//! [`LedgerSnapshot`]: tracechain_common::snapshot::LedgerSnapshot
//! [`LedgerDelta`]: tracechain_common::snapshot::LedgerDelta

#[cfg(feature = "contract")]
mod contract_impl {
    use freenet_stdlib::prelude::*;
    use tracechain_common::snapshot::{LedgerDelta, LedgerSnapshot, LedgerSummary};
    use tracechain_common::ProductError;

    pub struct Contract;

    fn load_snapshot(bytes: &[u8]) -> Result<LedgerSnapshot, ContractError> {
        if bytes.is_empty() {
            return Ok(LedgerSnapshot::default());
        }
        serde_json::from_slice(bytes).map_err(|e| ContractError::Deser(e.to_string()))
    }

    fn into_contract_error(err: ProductError) -> ContractError {
        match err {
            ProductError::CorruptRecord { .. } => ContractError::InvalidUpdate,
            other => ContractError::Other(other.to_string()),
        }
    }

    fn merge_state(snapshot: &mut LedgerSnapshot, bytes: &[u8]) -> Result<(), ContractError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let update = load_snapshot(bytes)?;
        LedgerDelta::Entries(update)
            .apply(snapshot)
            .map_err(into_contract_error)
    }

    fn apply_delta(snapshot: &mut LedgerSnapshot, bytes: &[u8]) -> Result<(), ContractError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let delta: LedgerDelta =
            serde_json::from_slice(bytes).map_err(|e| ContractError::Deser(e.to_string()))?;
        delta.apply(snapshot).map_err(into_contract_error)
    }

    #[contract]
    impl ContractInterface for Contract {
        fn validate_state(
            _parameters: Parameters<'static>,
            state: State<'static>,
            _related: RelatedContracts<'static>,
        ) -> Result<ValidateResult, ContractError> {
            let snapshot = load_snapshot(state.as_ref())?;
            if snapshot.validate().is_err() {
                return Ok(ValidateResult::Invalid);
            }
            Ok(ValidateResult::Valid)
        }

        fn update_state(
            _parameters: Parameters<'static>,
            state: State<'static>,
            data: Vec<UpdateData<'static>>,
        ) -> Result<UpdateModification<'static>, ContractError> {
            let mut snapshot = load_snapshot(state.as_ref())?;

            for ud in data {
                match ud {
                    UpdateData::State(s) => {
                        merge_state(&mut snapshot, s.as_ref())?;
                    }
                    UpdateData::Delta(d) => {
                        apply_delta(&mut snapshot, d.as_ref())?;
                    }
                    UpdateData::StateAndDelta { state, delta } => {
                        merge_state(&mut snapshot, state.as_ref())?;
                        apply_delta(&mut snapshot, delta.as_ref())?;
                    }
                    _ => return Err(ContractError::InvalidUpdate),
                }
            }

            let serialized =
                serde_json::to_vec(&snapshot).map_err(|e| ContractError::Other(e.to_string()))?;
            Ok(UpdateModification::valid(State::from(serialized)))
        }

        fn summarize_state(
            _parameters: Parameters<'static>,
            state: State<'static>,
        ) -> Result<StateSummary<'static>, ContractError> {
            if state.is_empty() {
                return Ok(StateSummary::from(vec![]));
            }

            let snapshot = load_snapshot(state.as_ref())?;
            let serialized = serde_json::to_vec(&snapshot.summarize())
                .map_err(|e| ContractError::Other(e.to_string()))?;
            Ok(StateSummary::from(serialized))
        }

        fn get_state_delta(
            _parameters: Parameters<'static>,
            state: State<'static>,
            summary: StateSummary<'static>,
        ) -> Result<StateDelta<'static>, ContractError> {
            if state.is_empty() {
                return Ok(StateDelta::from(vec![]));
            }

            let snapshot = load_snapshot(state.as_ref())?;
            let summary: LedgerSummary = if summary.is_empty() {
                LedgerSummary::default()
            } else {
                serde_json::from_slice(summary.as_ref())
                    .map_err(|e| ContractError::Deser(e.to_string()))?
            };

            let delta = LedgerDelta::Entries(snapshot.delta(&summary));
            let serialized =
                serde_json::to_vec(&delta).map_err(|e| ContractError::Other(e.to_string()))?;
            Ok(StateDelta::from(serialized))
        }
    }
}
