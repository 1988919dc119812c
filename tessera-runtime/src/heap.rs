// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! The slab heap.
//!
//! Arrays, dictionaries, and composites live in an arena of slabs addressed
//! by stable [`SlabId`]s; the values that reference them carry handles. The
//! heap provides deterministic deep copy and deep removal, owner
//! propagation, and an encoded view for the host to persist. The encoding
//! here is the runtime's own length-prefixed form used for size accounting
//! and `encode_all`; the chain's wire codec is external.

use core::fmt;
use std::collections::HashMap;

use indexmap::IndexMap;
use tessera_core::{AccountAddress, ErrorKind, QualifiedId, RuntimeError};

use crate::types::{CompositeKind, Type};
use crate::values::{HashableValue, Value};

/// A stable identifier for a slab: the account it was allocated under and a
/// per-account index. Transient values allocate under the zero address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlabId {
    pub address: AccountAddress,
    pub index: u64,
}

impl fmt::Display for SlabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.index)
    }
}

impl fmt::Debug for SlabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Clone, Debug)]
pub struct ArraySlab {
    pub element_type: Type,
    /// `Some` for constant-sized arrays.
    pub constant_size: Option<usize>,
    pub elements: Vec<Value>,
}

#[derive(Clone, Debug)]
pub struct DictionarySlab {
    pub key_type: Type,
    pub value_type: Type,
    /// Insertion-ordered; iteration order is deterministic within one
    /// execution and unspecified across releases.
    pub entries: IndexMap<HashableValue, Value>,
}

#[derive(Clone, Debug)]
pub struct CompositeSlab {
    pub qualified_id: QualifiedId,
    pub kind: CompositeKind,
    pub fields: IndexMap<String, Value>,
    /// Attachment-type id to attachment composite, in attach order.
    pub attachments: IndexMap<QualifiedId, Value>,
    /// For attachments: the carrier they are attached to.
    pub attached_to: Option<SlabId>,
    /// Non-zero while `forEachAttachment` iterates this composite; any
    /// attach or remove with a non-zero depth raises.
    pub iteration_depth: u32,
    /// Set when a resource has been destroyed.
    pub burned: bool,
    pub uuid: Option<u64>,
}

impl CompositeSlab {
    pub fn new(qualified_id: QualifiedId, kind: CompositeKind) -> Self {
        Self {
            qualified_id,
            kind,
            fields: IndexMap::new(),
            attachments: IndexMap::new(),
            attached_to: None,
            iteration_depth: 0,
            burned: false,
            uuid: None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum SlabPayload {
    Array(ArraySlab),
    Dictionary(DictionarySlab),
    Composite(CompositeSlab),
}

impl SlabPayload {
    pub fn as_array(&self) -> Option<&ArraySlab> {
        match self {
            SlabPayload::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArraySlab> {
        match self {
            SlabPayload::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&DictionarySlab> {
        match self {
            SlabPayload::Dictionary(dictionary) => Some(dictionary),
            _ => None,
        }
    }

    pub fn as_dictionary_mut(&mut self) -> Option<&mut DictionarySlab> {
        match self {
            SlabPayload::Dictionary(dictionary) => Some(dictionary),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeSlab> {
        match self {
            SlabPayload::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    pub fn as_composite_mut(&mut self) -> Option<&mut CompositeSlab> {
        match self {
            SlabPayload::Composite(composite) => Some(composite),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Slab {
    /// The account that owns this value, or `None` while transient.
    pub owner: Option<AccountAddress>,
    /// Bumped whenever the owning handle is moved between slots; ephemeral
    /// references compare their mint-time lineage against this.
    pub lineage: u64,
    pub payload: SlabPayload,
}

/// The slab arena.
#[derive(Debug, Default)]
pub struct Heap {
    slabs: HashMap<SlabId, Slab>,
    next_index: HashMap<AccountAddress, u64>,
}

fn missing(id: SlabId) -> RuntimeError {
    ErrorKind::Dereference {
        reason: format!("slab {id} does not exist"),
    }
    .into()
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh slab. Ids are allocated under the owning account,
    /// or under the zero address for transient values.
    pub fn allocate(&mut self, owner: Option<AccountAddress>, payload: SlabPayload) -> SlabId {
        let address = owner.unwrap_or(AccountAddress::ZERO);
        let index = self.next_index.entry(address).or_insert(0);
        let id = SlabId {
            address,
            index: *index,
        };
        *index += 1;
        self.slabs.insert(
            id,
            Slab {
                owner,
                lineage: 0,
                payload,
            },
        );
        id
    }

    pub fn contains(&self, id: SlabId) -> bool {
        self.slabs.contains_key(&id)
    }

    pub fn try_get(&self, id: SlabId) -> Option<&Slab> {
        self.slabs.get(&id)
    }

    pub fn get(&self, id: SlabId) -> Result<&Slab, RuntimeError> {
        self.slabs.get(&id).ok_or_else(|| missing(id))
    }

    pub fn get_mut(&mut self, id: SlabId) -> Result<&mut Slab, RuntimeError> {
        self.slabs.get_mut(&id).ok_or_else(|| missing(id))
    }

    pub fn remove(&mut self, id: SlabId) -> Result<Slab, RuntimeError> {
        self.slabs.remove(&id).ok_or_else(|| missing(id))
    }

    /// Marks a move of the handle pointing at `id`, invalidating ephemeral
    /// references minted before the move.
    pub fn bump_lineage(&mut self, id: SlabId) {
        if let Some(slab) = self.slabs.get_mut(&id) {
            slab.lineage += 1;
        }
    }

    pub fn lineage(&self, id: SlabId) -> u64 {
        self.slabs.get(&id).map(|slab| slab.lineage).unwrap_or(0)
    }

    /// Deep-copies a value tree under a new owner. The result is
    /// structurally equal and shares no slabs with the source.
    pub fn deep_copy_value(
        &mut self,
        value: &Value,
        owner: Option<AccountAddress>,
    ) -> Result<Value, RuntimeError> {
        match value {
            Value::Some(inner) => Ok(Value::some(self.deep_copy_value(inner, owner)?)),
            Value::Array(id) => {
                let source = self.get(*id)?.payload.clone();
                let SlabPayload::Array(array) = source else {
                    return Err(missing(*id));
                };
                let mut elements = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    elements.push(self.deep_copy_value(element, owner)?);
                }
                let copy = self.allocate(
                    owner,
                    SlabPayload::Array(ArraySlab {
                        element_type: array.element_type,
                        constant_size: array.constant_size,
                        elements,
                    }),
                );
                Ok(Value::Array(copy))
            }
            Value::Dictionary(id) => {
                let source = self.get(*id)?.payload.clone();
                let SlabPayload::Dictionary(dictionary) = source else {
                    return Err(missing(*id));
                };
                let mut entries = IndexMap::with_capacity(dictionary.entries.len());
                for (key, entry) in &dictionary.entries {
                    entries.insert(key.clone(), self.deep_copy_value(entry, owner)?);
                }
                let copy = self.allocate(
                    owner,
                    SlabPayload::Dictionary(DictionarySlab {
                        key_type: dictionary.key_type,
                        value_type: dictionary.value_type,
                        entries,
                    }),
                );
                Ok(Value::Dictionary(copy))
            }
            Value::Composite(id) => {
                let source = self.get(*id)?.payload.clone();
                let SlabPayload::Composite(composite) = source else {
                    return Err(missing(*id));
                };
                let mut fields = IndexMap::with_capacity(composite.fields.len());
                for (name, field) in &composite.fields {
                    fields.insert(name.clone(), self.deep_copy_value(field, owner)?);
                }
                let copy = self.allocate(
                    owner,
                    SlabPayload::Composite(CompositeSlab {
                        qualified_id: composite.qualified_id.clone(),
                        kind: composite.kind,
                        fields,
                        attachments: IndexMap::new(),
                        attached_to: None,
                        iteration_depth: 0,
                        burned: false,
                        uuid: composite.uuid,
                    }),
                );
                // Attachments are copied after the carrier exists so their
                // back-pointers can name the new carrier.
                let mut attachments = IndexMap::with_capacity(composite.attachments.len());
                for (type_id, attachment) in &composite.attachments {
                    let copied = self.deep_copy_value(attachment, owner)?;
                    if let Some(attachment_id) = copied.slab_id() {
                        if let Some(slab) = self
                            .get_mut(attachment_id)?
                            .payload
                            .as_composite_mut()
                        {
                            slab.attached_to = Some(copy);
                        }
                    }
                    attachments.insert(type_id.clone(), copied);
                }
                if let Some(slab) = self.get_mut(copy)?.payload.as_composite_mut() {
                    slab.attachments = attachments;
                }
                Ok(Value::Composite(copy))
            }
            other => Ok(other.clone()),
        }
    }

    /// Removes a value tree: the root slab and every sub-slab it
    /// transitively owns. After removal, slab count and encoded size return
    /// to their totals from before the tree was created.
    pub fn deep_remove_value(&mut self, value: &Value) -> Result<(), RuntimeError> {
        match value {
            Value::Some(inner) => self.deep_remove_value(inner),
            Value::Array(id) => {
                let slab = self.remove(*id)?;
                if let SlabPayload::Array(array) = slab.payload {
                    for element in &array.elements {
                        self.deep_remove_value(element)?;
                    }
                }
                Ok(())
            }
            Value::Dictionary(id) => {
                let slab = self.remove(*id)?;
                if let SlabPayload::Dictionary(dictionary) = slab.payload {
                    for (_, entry) in &dictionary.entries {
                        self.deep_remove_value(entry)?;
                    }
                }
                Ok(())
            }
            Value::Composite(id) => {
                let slab = self.remove(*id)?;
                if let SlabPayload::Composite(composite) = slab.payload {
                    for (_, field) in &composite.fields {
                        self.deep_remove_value(field)?;
                    }
                    for (_, attachment) in &composite.attachments {
                        self.deep_remove_value(attachment)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Propagates a new owner through a value tree, e.g. when persisting
    /// into an account or loading back out of one.
    pub fn set_owner_value(
        &mut self,
        value: &Value,
        owner: Option<AccountAddress>,
    ) -> Result<(), RuntimeError> {
        match value {
            Value::Some(inner) => self.set_owner_value(inner, owner),
            Value::Array(id) | Value::Dictionary(id) | Value::Composite(id) => {
                let slab = self.get_mut(*id)?;
                slab.owner = owner;
                let children: Vec<Value> = match &slab.payload {
                    SlabPayload::Array(array) => array.elements.clone(),
                    SlabPayload::Dictionary(dictionary) => {
                        dictionary.entries.values().cloned().collect()
                    }
                    SlabPayload::Composite(composite) => composite
                        .fields
                        .values()
                        .chain(composite.attachments.values())
                        .cloned()
                        .collect(),
                };
                for child in &children {
                    self.set_owner_value(child, owner)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn owner_of(&self, id: SlabId) -> Option<AccountAddress> {
        self.slabs.get(&id).and_then(|slab| slab.owner)
    }

    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    pub fn total_encoded_size(&self) -> usize {
        self.slabs.values().map(|slab| encode_slab(slab).len()).sum()
    }

    /// Encodes every slab for the host to persist, in id order.
    pub fn encode_all(&self) -> Vec<(SlabId, Vec<u8>)> {
        let mut ids: Vec<SlabId> = self.slabs.keys().copied().collect();
        ids.sort();
        ids.into_iter()
            .map(|id| (id, encode_slab(&self.slabs[&id])))
            .collect()
    }
}

fn put_str(out: &mut Vec<u8>, text: &str) {
    out.extend_from_slice(&(text.len() as u32).to_be_bytes());
    out.extend_from_slice(text.as_bytes());
}

fn encode_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Void => out.push(0),
        Value::Nil => out.push(1),
        Value::Bool(v) => {
            out.push(2);
            out.push(*v as u8);
        }
        Value::Number(v) => {
            out.push(3);
            put_str(out, v.kind().as_str());
            put_str(out, &v.to_string());
        }
        Value::String(v) => {
            out.push(4);
            put_str(out, v);
        }
        Value::Address(v) => {
            out.push(5);
            out.extend_from_slice(v.as_bytes());
        }
        Value::Path(v) => {
            out.push(6);
            put_str(out, &v.to_string());
        }
        Value::Some(inner) => {
            out.push(7);
            encode_value(out, inner);
        }
        Value::Array(id) | Value::Dictionary(id) | Value::Composite(id) => {
            out.push(8);
            out.extend_from_slice(id.address.as_bytes());
            out.extend_from_slice(&id.index.to_be_bytes());
        }
        Value::Capability(capability) => {
            out.push(9);
            out.extend_from_slice(capability.address.as_bytes());
            put_str(out, &capability.path.to_string());
            match &capability.borrow_type {
                Some(ty) => put_str(out, &ty.to_string()),
                None => put_str(out, ""),
            }
        }
        Value::Type(ty) => {
            out.push(10);
            put_str(out, &ty.to_string());
        }
        // References, functions, and account handles are not persistable;
        // they encode as bare tags for size accounting.
        Value::Reference(_) => out.push(11),
        Value::Function(_) => out.push(12),
        Value::Account(_) => out.push(13),
        Value::Invalid => out.push(14),
    }
}

fn encode_slab(slab: &Slab) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    match slab.owner {
        Some(owner) => {
            out.push(1);
            out.extend_from_slice(owner.as_bytes());
        }
        None => out.push(0),
    }
    match &slab.payload {
        SlabPayload::Array(array) => {
            out.push(b'a');
            out.extend_from_slice(&(array.elements.len() as u32).to_be_bytes());
            for element in &array.elements {
                encode_value(&mut out, element);
            }
        }
        SlabPayload::Dictionary(dictionary) => {
            out.push(b'd');
            out.extend_from_slice(&(dictionary.entries.len() as u32).to_be_bytes());
            for (key, value) in &dictionary.entries {
                encode_value(&mut out, &key.to_value());
                encode_value(&mut out, value);
            }
        }
        SlabPayload::Composite(composite) => {
            out.push(b'c');
            put_str(&mut out, &composite.qualified_id.to_string());
            put_str(&mut out, composite.kind.as_str());
            out.extend_from_slice(&(composite.fields.len() as u32).to_be_bytes());
            for (name, value) in &composite.fields {
                put_str(&mut out, name);
                encode_value(&mut out, value);
            }
            out.extend_from_slice(&(composite.attachments.len() as u32).to_be_bytes());
            for (type_id, value) in &composite.attachments {
                put_str(&mut out, &type_id.to_string());
                encode_value(&mut out, value);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::{structural_equal, NumberValue};
    use tessera_core::Location;

    fn qid(name: &str) -> QualifiedId {
        QualifiedId::new(Location::test("heap"), name)
    }

    fn sample_array(heap: &mut Heap) -> Value {
        let inner = heap.allocate(
            None,
            SlabPayload::Array(ArraySlab {
                element_type: Type::Number(crate::types::NumberKind::UInt8),
                constant_size: None,
                elements: vec![
                    Value::Number(NumberValue::UInt8(1)),
                    Value::Number(NumberValue::UInt8(2)),
                ],
            }),
        );
        let outer = heap.allocate(
            None,
            SlabPayload::Array(ArraySlab {
                element_type: Type::Any,
                constant_size: None,
                elements: vec![Value::Array(inner), Value::string("tail")],
            }),
        );
        Value::Array(outer)
    }

    #[test]
    fn test_deep_copy_is_structurally_equal_and_disjoint() {
        let mut heap = Heap::new();
        let original = sample_array(&mut heap);
        let copy = heap
            .deep_copy_value(&original, Some(AccountAddress::from_u64(9)))
            .unwrap();
        assert!(structural_equal(&original, &copy, &heap));
        assert_ne!(original.slab_id(), copy.slab_id());
        assert_eq!(
            heap.owner_of(copy.slab_id().unwrap()),
            Some(AccountAddress::from_u64(9)),
        );
        assert_eq!(heap.owner_of(original.slab_id().unwrap()), None);
    }

    #[test]
    fn test_deep_remove_restores_totals() {
        let mut heap = Heap::new();
        let original = sample_array(&mut heap);
        let count_before = heap.slab_count();
        let size_before = heap.total_encoded_size();

        let copy = heap.deep_copy_value(&original, None).unwrap();
        assert!(heap.slab_count() > count_before);

        heap.deep_remove_value(&copy).unwrap();
        assert_eq!(heap.slab_count(), count_before);
        assert_eq!(heap.total_encoded_size(), size_before);
    }

    #[test]
    fn test_composite_copy_rewires_attachments() {
        let mut heap = Heap::new();
        let carrier_id = heap.allocate(
            None,
            SlabPayload::Composite(CompositeSlab::new(qid("R"), CompositeKind::Resource)),
        );
        let attachment_id = heap.allocate(
            None,
            SlabPayload::Composite(CompositeSlab {
                attached_to: Some(carrier_id),
                ..CompositeSlab::new(qid("A"), CompositeKind::Attachment)
            }),
        );
        heap.get_mut(carrier_id)
            .unwrap()
            .payload
            .as_composite_mut()
            .unwrap()
            .attachments
            .insert(qid("A"), Value::Composite(attachment_id));

        let copy = heap
            .deep_copy_value(&Value::Composite(carrier_id), None)
            .unwrap();
        let copy_id = copy.slab_id().unwrap();
        let copied_attachment = heap
            .get(copy_id)
            .unwrap()
            .payload
            .as_composite()
            .unwrap()
            .attachments[&qid("A")]
            .clone();
        let copied_attachment_id = copied_attachment.slab_id().unwrap();
        assert_ne!(copied_attachment_id, attachment_id);
        assert_eq!(
            heap.get(copied_attachment_id)
                .unwrap()
                .payload
                .as_composite()
                .unwrap()
                .attached_to,
            Some(copy_id),
        );
    }

    #[test]
    fn test_owner_propagates_transitively() {
        let mut heap = Heap::new();
        let value = sample_array(&mut heap);
        let owner = AccountAddress::from_u64(3);
        heap.set_owner_value(&value, Some(owner)).unwrap();
        for (_, slab) in heap.slabs.iter() {
            assert_eq!(slab.owner, Some(owner));
        }
    }

    #[test]
    fn test_encode_all_is_deterministic() {
        let mut heap = Heap::new();
        let _ = sample_array(&mut heap);
        let first = heap.encode_all();
        let second = heap.encode_all();
        assert_eq!(first, second);
        assert_eq!(first.len(), heap.slab_count());
    }
}
