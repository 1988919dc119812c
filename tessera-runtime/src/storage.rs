// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Account storage and the link/capability registry.
//!
//! Each account partitions its state by path domain: the `storage` domain
//! holds values (at most one per path), the `private` and `public` domains
//! hold links. Capabilities resolve through link chains to a storage path
//! and borrow from there.
//!
//! Storage references are invalidated by epoch: every `save` or `load` at a
//! path bumps that path's epoch, and a reference minted earlier fails its
//! next dereference. This is the strict reading of reference invalidation;
//! a replaced value can never be reached through a stale reference.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use tessera_core::{
    AccountAddress, ErrorKind, PathDomain, RuntimeError, SourceRange, StoragePath,
};
use tracing::trace;

use crate::heap::Heap;
use crate::types::{ConformanceResolver, Type};
use crate::values::{
    dynamic_type, CapabilityValue, ReferenceValue, StorageReference, Value,
};

/// The maximum number of link hops a capability resolution will follow.
const LINK_CHAIN_BOUND: usize = 8;

/// A link registry entry: where the link points and the reference type it
/// was created with.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkTarget {
    pub target: StoragePath,
    /// The full reference type (`&T` or `auth &T`) of the link.
    pub borrow_type: Type,
}

#[derive(Debug, Default)]
struct AccountState {
    /// `storage`-domain values by identifier.
    stored: IndexMap<String, Value>,
    /// `private`/`public`-domain links.
    links: IndexMap<StoragePath, LinkTarget>,
    /// Per-storage-identifier epoch, bumped on every save and load.
    epochs: HashMap<String, u64>,
}

/// All account state visible to one interpreter: storage, links, epochs.
#[derive(Debug, Default)]
pub struct AccountStorage {
    accounts: HashMap<AccountAddress, AccountState>,
}

fn non_storage_path(path: &StoragePath, range: SourceRange) -> RuntimeError {
    RuntimeError::at(
        ErrorKind::Unexpected {
            message: format!("expected a storage path, got {path}"),
        },
        range,
    )
}

/// The referenced type of a reference type, or the type itself. Link and
/// borrow type arguments arrive as full reference types.
fn referenced_type(ty: &Type) -> &Type {
    match ty {
        Type::Reference { referenced, .. } => referenced,
        other => other,
    }
}

fn reference_authorization(ty: &Type) -> bool {
    matches!(ty, Type::Reference { authorized: true, .. })
}

impl AccountStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn account(&mut self, address: AccountAddress) -> &mut AccountState {
        self.accounts.entry(address).or_default()
    }

    /// The current epoch of a storage path.
    pub fn epoch(&self, address: AccountAddress, identifier: &str) -> u64 {
        self.accounts
            .get(&address)
            .and_then(|account| account.epochs.get(identifier))
            .copied()
            .unwrap_or(0)
    }

    fn bump_epoch(&mut self, address: AccountAddress, identifier: &str) {
        *self
            .account(address)
            .epochs
            .entry(identifier.to_owned())
            .or_insert(0) += 1;
    }

    /// Saves a value at a storage path. The path must be vacant; contract
    /// values (and anything containing one) are non-transferable and are
    /// rejected; ownership propagates through the stored tree.
    pub fn save(
        &mut self,
        heap: &mut Heap,
        address: AccountAddress,
        path: &StoragePath,
        value: Value,
        range: SourceRange,
    ) -> Result<(), RuntimeError> {
        if path.domain != PathDomain::Storage {
            return Err(non_storage_path(path, range));
        }
        if let Some(id) = contains_non_transferable(heap, &value) {
            return Err(RuntimeError::at(
                ErrorKind::NonTransferableValue { ty: id },
                range,
            ));
        }
        let account = self.account(address);
        if account.stored.contains_key(&path.identifier) {
            return Err(RuntimeError::at(
                ErrorKind::Overwrite {
                    address: address.to_string(),
                    path: path.to_string(),
                },
                range,
            ));
        }
        heap.set_owner_value(&value, Some(address))?;
        trace!(%address, %path, "save");
        self.account(address)
            .stored
            .insert(path.identifier.clone(), value);
        self.bump_epoch(address, &path.identifier);
        Ok(())
    }

    /// Removes and returns the value at a storage path, if any. A stored
    /// value whose dynamic type is not a subtype of `ty` raises and is left
    /// in place.
    pub fn load(
        &mut self,
        heap: &mut Heap,
        resolver: &dyn ConformanceResolver,
        address: AccountAddress,
        path: &StoragePath,
        ty: &Type,
        range: SourceRange,
    ) -> Result<Option<Value>, RuntimeError> {
        if path.domain != PathDomain::Storage {
            return Err(non_storage_path(path, range));
        }
        let Some(stored) = self
            .accounts
            .get(&address)
            .and_then(|account| account.stored.get(&path.identifier))
        else {
            return Ok(None);
        };
        let expected = referenced_type(ty);
        let actual = dynamic_type(stored, heap);
        if !actual.is_subtype_of(expected, resolver) {
            return Err(RuntimeError::at(
                ErrorKind::ForceCastTypeMismatch {
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                },
                range,
            ));
        }
        let value = self
            .account(address)
            .stored
            .shift_remove(&path.identifier)
            .expect("presence checked above");
        heap.set_owner_value(&value, None)?;
        self.bump_epoch(address, &path.identifier);
        trace!(%address, %path, "load");
        Ok(Some(value))
    }

    /// Deep-copies the value at a storage path. Only non-resource values
    /// may be copied; the stored value stays in place and keeps its epoch.
    pub fn copy_stored(
        &mut self,
        heap: &mut Heap,
        resolver: &dyn ConformanceResolver,
        address: AccountAddress,
        path: &StoragePath,
        ty: &Type,
        range: SourceRange,
    ) -> Result<Option<Value>, RuntimeError> {
        if path.domain != PathDomain::Storage {
            return Err(non_storage_path(path, range));
        }
        let Some(stored) = self
            .accounts
            .get(&address)
            .and_then(|account| account.stored.get(&path.identifier))
            .cloned()
        else {
            return Ok(None);
        };
        let expected = referenced_type(ty);
        let actual = dynamic_type(&stored, heap);
        if !actual.is_subtype_of(expected, resolver) {
            return Err(RuntimeError::at(
                ErrorKind::ForceCastTypeMismatch {
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                },
                range,
            ));
        }
        if expected.is_resource_kinded(resolver) || actual.is_resource_kinded(resolver) {
            return Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: "cannot copy a resource".into(),
                },
                range,
            ));
        }
        Ok(Some(heap.deep_copy_value(&stored, None)?))
    }

    /// Borrows the value at a storage path as a reference of type `ty`
    /// (a reference type). Raises on a dynamic type mismatch.
    pub fn borrow_stored(
        &mut self,
        heap: &Heap,
        resolver: &dyn ConformanceResolver,
        address: AccountAddress,
        path: &StoragePath,
        ty: &Type,
        range: SourceRange,
    ) -> Result<Option<Value>, RuntimeError> {
        if path.domain != PathDomain::Storage {
            return Err(non_storage_path(path, range));
        }
        let Some(stored) = self
            .accounts
            .get(&address)
            .and_then(|account| account.stored.get(&path.identifier))
        else {
            return Ok(None);
        };
        let expected = referenced_type(ty);
        let actual = dynamic_type(stored, heap);
        if !actual.is_subtype_of(expected, resolver) {
            return Err(RuntimeError::at(
                ErrorKind::ForceCastTypeMismatch {
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                },
                range,
            ));
        }
        Ok(Some(self.mint_storage_reference(address, path, ty)))
    }

    fn mint_storage_reference(
        &self,
        address: AccountAddress,
        path: &StoragePath,
        ty: &Type,
    ) -> Value {
        Value::Reference(Rc::new(ReferenceValue::Storage(StorageReference {
            authorized: reference_authorization(ty),
            borrowed_type: referenced_type(ty).clone(),
            address,
            path: path.clone(),
            epoch: self.epoch(address, &path.identifier),
        })))
    }

    /// The dynamic type of the value stored at a path, if any.
    pub fn stored_type(
        &self,
        heap: &Heap,
        address: AccountAddress,
        path: &StoragePath,
    ) -> Option<Type> {
        self.accounts
            .get(&address)
            .and_then(|account| account.stored.get(&path.identifier))
            .map(|value| dynamic_type(value, heap))
    }

    /// Direct access to a stored value. Used by reference dereferencing and
    /// tests; does not bump the epoch.
    pub fn stored_value(&self, address: AccountAddress, path: &StoragePath) -> Option<&Value> {
        self.accounts
            .get(&address)
            .and_then(|account| account.stored.get(&path.identifier))
    }

    /// Creates a link at a private or public path pointing at `target`.
    /// Returns the capability, or `None` if the path is already linked.
    pub fn link(
        &mut self,
        address: AccountAddress,
        path: &StoragePath,
        target: StoragePath,
        borrow_type: Type,
        range: SourceRange,
    ) -> Result<Option<CapabilityValue>, RuntimeError> {
        if !path.domain.is_link_domain() {
            return Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: format!("cannot link at {path}: not a private or public path"),
                },
                range,
            ));
        }
        let account = self.account(address);
        if account.links.contains_key(path) {
            return Ok(None);
        }
        trace!(%address, %path, %target, "link");
        account.links.insert(
            path.clone(),
            LinkTarget {
                target,
                borrow_type: borrow_type.clone(),
            },
        );
        Ok(Some(CapabilityValue {
            address,
            path: path.clone(),
            borrow_type: Some(borrow_type),
        }))
    }

    /// Removes the link at a path. Unlinking a vacant path is a no-op.
    pub fn unlink(&mut self, address: AccountAddress, path: &StoragePath) {
        self.account(address).links.shift_remove(path);
    }

    pub fn get_link_target(
        &self,
        address: AccountAddress,
        path: &StoragePath,
    ) -> Option<StoragePath> {
        self.accounts
            .get(&address)
            .and_then(|account| account.links.get(path))
            .map(|link| link.target.clone())
    }

    /// An unconditioned capability handle for a path. Whether it can be
    /// borrowed is decided at borrow time.
    pub fn get_capability(
        &self,
        address: AccountAddress,
        path: &StoragePath,
        borrow_type: Option<Type>,
    ) -> CapabilityValue {
        CapabilityValue {
            address,
            path: path.clone(),
            borrow_type,
        }
    }

    /// Walks the link chain from a capability's path down to a storage
    /// path. Every hop's borrow type must be compatible with `ty`; a
    /// missing hop, an incompatible hop, a cycle, or an over-long chain
    /// yields `None`.
    fn resolve_link_chain(
        &self,
        resolver: &dyn ConformanceResolver,
        address: AccountAddress,
        path: &StoragePath,
        ty: &Type,
    ) -> Option<StoragePath> {
        let mut current = path.clone();
        let mut visited: HashSet<StoragePath> = HashSet::new();
        for _ in 0..LINK_CHAIN_BOUND {
            if current.domain == PathDomain::Storage {
                return Some(current);
            }
            if !visited.insert(current.clone()) {
                return None;
            }
            let link = self.accounts.get(&address)?.links.get(&current)?;
            if !link.borrow_type.is_subtype_of(ty, resolver) {
                return None;
            }
            current = link.target.clone();
        }
        None
    }

    /// Borrows through a capability: resolves the link chain, then borrows
    /// the storage path with the capability's (or requested) reference
    /// type. All failures yield `None`.
    pub fn borrow_capability(
        &mut self,
        heap: &Heap,
        resolver: &dyn ConformanceResolver,
        capability: &CapabilityValue,
        requested_type: Option<&Type>,
    ) -> Result<Option<Value>, RuntimeError> {
        let Some(ty) = requested_type.or(capability.borrow_type.as_ref()).cloned() else {
            return Ok(None);
        };
        let Some(target) =
            self.resolve_link_chain(resolver, capability.address, &capability.path, &ty)
        else {
            return Ok(None);
        };
        let Some(stored) = self.stored_value(capability.address, &target) else {
            return Ok(None);
        };
        let expected = referenced_type(&ty);
        let actual = dynamic_type(stored, heap);
        if !actual.is_subtype_of(expected, resolver) {
            return Ok(None);
        }
        Ok(Some(self.mint_storage_reference(
            capability.address,
            &target,
            &ty,
        )))
    }

    /// Whether a capability's borrow would currently succeed.
    pub fn check_capability(
        &mut self,
        heap: &Heap,
        resolver: &dyn ConformanceResolver,
        capability: &CapabilityValue,
        requested_type: Option<&Type>,
    ) -> Result<bool, RuntimeError> {
        Ok(self
            .borrow_capability(heap, resolver, capability, requested_type)?
            .is_some())
    }

    /// Resolves a storage reference to the current stored value, asserting
    /// the mint-time epoch and the borrowed type.
    pub fn dereference(
        &self,
        heap: &Heap,
        resolver: &dyn ConformanceResolver,
        reference: &StorageReference,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        let current = self.epoch(reference.address, &reference.path.identifier);
        if current != reference.epoch {
            return Err(RuntimeError::at(
                ErrorKind::Dereference {
                    reason: format!(
                        "storage reference to {} was invalidated by a save or load",
                        reference.path
                    ),
                },
                range,
            ));
        }
        let Some(stored) = self.stored_value(reference.address, &reference.path) else {
            return Err(RuntimeError::at(
                ErrorKind::Dereference {
                    reason: format!("nothing is stored at {}", reference.path),
                },
                range,
            ));
        };
        let actual = dynamic_type(stored, heap);
        if !actual.is_subtype_of(&reference.borrowed_type, resolver) {
            return Err(RuntimeError::at(
                ErrorKind::Dereference {
                    reason: format!(
                        "stored value has type `{actual}`, expected `{}`",
                        reference.borrowed_type
                    ),
                },
                range,
            ));
        }
        Ok(stored.clone())
    }

    /// The identifiers currently stored under an account's storage domain.
    pub fn stored_identifiers(&self, address: AccountAddress) -> Vec<String> {
        self.accounts
            .get(&address)
            .map(|account| account.stored.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Finds a contract-kinded composite anywhere in a value tree; such values
/// are non-transferable.
fn contains_non_transferable(heap: &Heap, value: &Value) -> Option<String> {
    match value {
        Value::Some(inner) => contains_non_transferable(heap, inner),
        Value::Array(id) | Value::Dictionary(id) | Value::Composite(id) => {
            let slab = heap.try_get(*id)?;
            match &slab.payload {
                crate::heap::SlabPayload::Array(array) => array
                    .elements
                    .iter()
                    .find_map(|element| contains_non_transferable(heap, element)),
                crate::heap::SlabPayload::Dictionary(dictionary) => dictionary
                    .entries
                    .values()
                    .find_map(|entry| contains_non_transferable(heap, entry)),
                crate::heap::SlabPayload::Composite(composite) => {
                    if !composite.kind.is_transferable() {
                        return Some(composite.qualified_id.to_string());
                    }
                    composite
                        .fields
                        .values()
                        .chain(composite.attachments.values())
                        .find_map(|field| contains_non_transferable(heap, field))
                }
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{CompositeSlab, SlabPayload};
    use crate::types::{CompositeKind, EmptyResolver};
    use tessera_core::{Location, QualifiedId};

    fn addr(n: u64) -> AccountAddress {
        AccountAddress::from_u64(n)
    }

    fn storage_path(name: &str) -> StoragePath {
        StoragePath::storage(name).unwrap()
    }

    fn new_composite(heap: &mut Heap, name: &str, kind: CompositeKind) -> Value {
        let id = heap.allocate(
            None,
            SlabPayload::Composite(CompositeSlab::new(
                QualifiedId::new(Location::test("storage"), name),
                kind,
            )),
        );
        Value::Composite(id)
    }

    #[test]
    fn test_save_then_overwrite_fails() {
        let mut heap = Heap::new();
        let mut storage = AccountStorage::new();
        let path = storage_path("r");
        let first = new_composite(&mut heap, "R", CompositeKind::Resource);
        storage
            .save(&mut heap, addr(1), &path, first, SourceRange::NONE)
            .unwrap();
        let second = new_composite(&mut heap, "R", CompositeKind::Resource);
        let error = storage
            .save(&mut heap, addr(1), &path, second, SourceRange::NONE)
            .unwrap_err();
        assert!(matches!(error.kind, ErrorKind::Overwrite { .. }));
    }

    #[test]
    fn test_save_rejects_contract_values() {
        let mut heap = Heap::new();
        let mut storage = AccountStorage::new();
        let contract = new_composite(&mut heap, "C", CompositeKind::Contract);
        let error = storage
            .save(
                &mut heap,
                addr(1),
                &storage_path("c"),
                contract,
                SourceRange::NONE,
            )
            .unwrap_err();
        assert!(matches!(error.kind, ErrorKind::NonTransferableValue { .. }));
    }

    #[test]
    fn test_load_round_trip_and_owner() {
        let mut heap = Heap::new();
        let mut storage = AccountStorage::new();
        let path = storage_path("s");
        let value = new_composite(&mut heap, "S", CompositeKind::Struct);
        let slab_id = value.slab_id().unwrap();
        storage
            .save(&mut heap, addr(2), &path, value, SourceRange::NONE)
            .unwrap();
        assert_eq!(heap.owner_of(slab_id), Some(addr(2)));

        let loaded = storage
            .load(
                &mut heap,
                &EmptyResolver,
                addr(2),
                &path,
                &Type::Any,
                SourceRange::NONE,
            )
            .unwrap()
            .unwrap();
        assert_eq!(loaded.slab_id(), Some(slab_id));
        assert_eq!(heap.owner_of(slab_id), None);
        // Path is vacant afterwards.
        assert!(storage.stored_value(addr(2), &path).is_none());
        assert!(storage
            .load(
                &mut heap,
                &EmptyResolver,
                addr(2),
                &path,
                &Type::Any,
                SourceRange::NONE,
            )
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_load_type_mismatch_leaves_value_in_place() {
        let mut heap = Heap::new();
        let mut storage = AccountStorage::new();
        let path = storage_path("s");
        let value = new_composite(&mut heap, "S", CompositeKind::Struct);
        storage
            .save(&mut heap, addr(1), &path, value, SourceRange::NONE)
            .unwrap();
        let error = storage
            .load(
                &mut heap,
                &EmptyResolver,
                addr(1),
                &path,
                &Type::Bool,
                SourceRange::NONE,
            )
            .unwrap_err();
        assert!(matches!(error.kind, ErrorKind::ForceCastTypeMismatch { .. }));
        assert!(storage.stored_value(addr(1), &path).is_some());
    }

    #[test]
    fn test_borrow_invalidated_by_load() {
        let mut heap = Heap::new();
        let mut storage = AccountStorage::new();
        let path = storage_path("s");
        let value = new_composite(&mut heap, "S", CompositeKind::Struct);
        storage
            .save(&mut heap, addr(1), &path, value, SourceRange::NONE)
            .unwrap();

        let reference = storage
            .borrow_stored(
                &heap,
                &EmptyResolver,
                addr(1),
                &path,
                &Type::reference(false, Type::Any),
                SourceRange::NONE,
            )
            .unwrap()
            .unwrap();
        let Value::Reference(reference) = reference else {
            panic!("expected a reference");
        };
        let ReferenceValue::Storage(storage_reference) = reference.as_ref() else {
            panic!("expected a storage reference");
        };

        // Valid before the load.
        storage
            .dereference(&heap, &EmptyResolver, storage_reference, SourceRange::NONE)
            .unwrap();

        storage
            .load(
                &mut heap,
                &EmptyResolver,
                addr(1),
                &path,
                &Type::Any,
                SourceRange::NONE,
            )
            .unwrap()
            .unwrap();

        let error = storage
            .dereference(&heap, &EmptyResolver, storage_reference, SourceRange::NONE)
            .unwrap_err();
        assert!(matches!(error.kind, ErrorKind::Dereference { .. }));
    }

    #[test]
    fn test_link_once_and_capability_chain() {
        let mut heap = Heap::new();
        let mut storage = AccountStorage::new();
        let target = storage_path("vault");
        let value = new_composite(&mut heap, "Vault", CompositeKind::Resource);
        let vault_type = dynamic_type(&value, &heap);
        storage
            .save(&mut heap, addr(1), &target, value, SourceRange::NONE)
            .unwrap();

        let reference_type = Type::reference(false, vault_type);
        let public = StoragePath::public("vault").unwrap();
        let capability = storage
            .link(
                addr(1),
                &public,
                target.clone(),
                reference_type.clone(),
                SourceRange::NONE,
            )
            .unwrap()
            .expect("first link succeeds");
        // Second link at the same path yields None.
        assert!(storage
            .link(
                addr(1),
                &public,
                target.clone(),
                reference_type.clone(),
                SourceRange::NONE,
            )
            .unwrap()
            .is_none());

        let borrowed = storage
            .borrow_capability(&heap, &EmptyResolver, &capability, None)
            .unwrap();
        assert!(borrowed.is_some());

        storage.unlink(addr(1), &public);
        let borrowed = storage
            .borrow_capability(&heap, &EmptyResolver, &capability, None)
            .unwrap();
        assert!(borrowed.is_none());
    }

    #[test]
    fn test_link_cycle_borrows_none() {
        let mut heap = Heap::new();
        let mut storage = AccountStorage::new();
        let a = StoragePath::private("a").unwrap();
        let b = StoragePath::private("b").unwrap();
        let ty = Type::reference(false, Type::Any);
        storage
            .link(addr(1), &a, b.clone(), ty.clone(), SourceRange::NONE)
            .unwrap()
            .unwrap();
        storage
            .link(addr(1), &b, a.clone(), ty.clone(), SourceRange::NONE)
            .unwrap()
            .unwrap();
        let capability = storage.get_capability(addr(1), &a, Some(ty));
        assert!(storage
            .borrow_capability(&heap, &EmptyResolver, &capability, None)
            .unwrap()
            .is_none());
    }
}
