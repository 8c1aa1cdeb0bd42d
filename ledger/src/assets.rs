//! # Asset Registry
//!
//! Registration and lookup of assets, the root entities everything else
//! hangs off. Registering an asset also seeds one ownership record per
//! listed owner in the owner index, so "which assets does this owner
//! hold" is answerable by prefix scan without touching asset records.

use tracing::debug;

use crate::entity::{Asset, DocType, OwnerBalance};
use crate::error::{LedgerError, LedgerResult};
use crate::store::{EntityStore, StateStore};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_asset_input(input: &Asset) -> LedgerResult<()> {
    if input.id.trim().is_empty() {
        return Err(LedgerError::Validation(
            "asset id must not be empty".to_string(),
        ));
    }
    if input.doc_type != DocType::Asset {
        return Err(LedgerError::Validation(format!(
            "doc type for an asset must be \"ASSET\", got \"{}\"",
            input.doc_type
        )));
    }
    if input.owner.is_empty() {
        return Err(LedgerError::Validation(
            "asset must list at least one owner".to_string(),
        ));
    }
    for (position, owner) in input.owner.iter().enumerate() {
        if owner.trim().is_empty() {
            return Err(LedgerError::Validation(format!(
                "owner {} is empty",
                position + 1
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Registers a new asset and seeds an ownership record for each owner.
///
/// # Errors
///
/// Validation error on malformed input, conflict when an asset with the
/// same id already exists. Nothing is written on failure.
pub fn create_asset<S: StateStore + ?Sized>(store: &mut S, input: Asset) -> LedgerResult<()> {
    validate_asset_input(&input)?;

    if store.get_asset(&input.id)?.is_some() {
        return Err(LedgerError::Conflict("asset", input.id));
    }

    debug!(asset_id = %input.id, owners = input.owner.len(), "registering asset");
    store.put_asset(&input)?;

    for owner in &input.owner {
        let record = OwnerBalance::ownership_of(owner, &input.id, DocType::Asset);
        store.put_owner_balance(&record)?;
    }
    Ok(())
}

/// Looks up an asset by id.
pub fn query_asset<S: StateStore + ?Sized>(store: &S, asset_id: &str) -> LedgerResult<Asset> {
    store
        .get_asset(asset_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("asset not found with id: {asset_id}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::db::SledStore;
    use chrono::Utc;

    fn asset(id: &str, owners: &[&str]) -> Asset {
        Asset {
            id: id.to_string(),
            doc_type: DocType::Asset,
            desc: "test asset".into(),
            name: id.to_string(),
            address: "1 Test Way".into(),
            owner: owners.iter().map(|o| o.to_string()).collect(),
            is_active: true,
        }
    }

    #[test]
    fn create_then_query() {
        let store = SledStore::open_temporary().unwrap();
        store
            .invoke("tx-1", Utc::now(), |inv| {
                create_asset(inv, asset("plot-7", &["alice", "bob"]))
            })
            .unwrap();

        let found = store
            .invoke("tx-2", Utc::now(), |inv| query_asset(inv, "plot-7"))
            .unwrap();
        assert_eq!(found.owner, vec!["alice", "bob"]);
    }

    #[test]
    fn create_seeds_ownership_records() {
        let store = SledStore::open_temporary().unwrap();
        store
            .invoke("tx-1", Utc::now(), |inv| {
                create_asset(inv, asset("plot-7", &["alice", "bob"]))
            })
            .unwrap();

        store
            .invoke("tx-2", Utc::now(), |inv| {
                let alice = inv.get_owner_balance("alice", "plot-7")?.expect("seeded");
                assert_eq!(alice.balance, 0);
                assert_eq!(alice.parent_doc_type, DocType::Asset);
                assert!(inv.get_owner_balance("bob", "plot-7")?.is_some());
                assert!(inv.get_owner_balance("carol", "plot-7")?.is_none());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn duplicate_id_conflicts_and_first_asset_survives() {
        let store = SledStore::open_temporary().unwrap();
        store
            .invoke("tx-1", Utc::now(), |inv| {
                create_asset(inv, asset("plot-7", &["alice"]))
            })
            .unwrap();

        let err = store
            .invoke("tx-2", Utc::now(), |inv| {
                let mut second = asset("plot-7", &["mallory"]);
                second.name = "impostor".into();
                create_asset(inv, second)
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let found = store
            .invoke("tx-3", Utc::now(), |inv| query_asset(inv, "plot-7"))
            .unwrap();
        assert_eq!(found.owner, vec!["alice"]);
        assert_eq!(found.name, "plot-7");
    }

    #[test]
    fn empty_id_rejected() {
        let store = SledStore::open_temporary().unwrap();
        let err = store
            .invoke("tx-1", Utc::now(), |inv| {
                create_asset(inv, asset("   ", &["alice"]))
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn wrong_doc_type_rejected() {
        let store = SledStore::open_temporary().unwrap();
        let err = store
            .invoke("tx-1", Utc::now(), |inv| {
                let mut bad = asset("plot-7", &["alice"]);
                bad.doc_type = DocType::Token;
                create_asset(inv, bad)
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn blank_owner_rejected_with_position() {
        let store = SledStore::open_temporary().unwrap();
        let err = store
            .invoke("tx-1", Utc::now(), |inv| {
                create_asset(inv, asset("plot-7", &["alice", " "]))
            })
            .unwrap_err();
        assert!(err.to_string().contains("owner 2"));
    }

    #[test]
    fn ownerless_asset_rejected() {
        let store = SledStore::open_temporary().unwrap();
        let err = store
            .invoke("tx-1", Utc::now(), |inv| create_asset(inv, asset("plot-7", &[])))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn query_missing_asset_not_found() {
        let store = SledStore::open_temporary().unwrap();
        let err = store
            .invoke("tx-1", Utc::now(), |inv| query_asset(inv, "ghost"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
