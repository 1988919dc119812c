// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Static type descriptors.
//!
//! Types are produced by the external checker and carried through the
//! elaboration; the runtime uses them for dynamic subtype checks at casts,
//! borrows, and storage operations. Conformance questions are answered by a
//! [`ConformanceResolver`] (implemented by the elaboration) so the type
//! algebra itself stays table-free.

use core::fmt;

use tessera_core::{PathDomain, QualifiedId};

/// The kind of a composite declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    Struct,
    Resource,
    Contract,
    Event,
    Enum,
    Attachment,
}

impl CompositeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            CompositeKind::Struct => "struct",
            CompositeKind::Resource => "resource",
            CompositeKind::Contract => "contract",
            CompositeKind::Event => "event",
            CompositeKind::Enum => "enum",
            CompositeKind::Attachment => "attachment",
        }
    }

    /// Resource-kinded composites obey the linear move discipline.
    /// Attachments share their carrier's kind dynamically, but declarations
    /// of kind `Attachment` are themselves non-linear until attached.
    pub const fn is_resource(self) -> bool {
        matches!(self, CompositeKind::Resource)
    }

    /// Contract values may not be stored into accounts or nested inside
    /// transferable values.
    pub const fn is_transferable(self) -> bool {
        !matches!(self, CompositeKind::Contract)
    }

    pub const fn is_enum(self) -> bool {
        matches!(self, CompositeKind::Enum)
    }
}

impl fmt::Display for CompositeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The distinct numeric kinds. Each is a separate type with its own range
/// and overflow policy: widths up to 256 bits are checked, `Word*` kinds
/// wrap silently, `Int`/`UInt` are arbitrary precision, and the fixed-point
/// kinds scale by 10^8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumberKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    Int,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    UInt,
    Word8,
    Word16,
    Word32,
    Word64,
    Word128,
    Word256,
    Fix64,
    UFix64,
}

impl NumberKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            NumberKind::Int8 => "Int8",
            NumberKind::Int16 => "Int16",
            NumberKind::Int32 => "Int32",
            NumberKind::Int64 => "Int64",
            NumberKind::Int128 => "Int128",
            NumberKind::Int256 => "Int256",
            NumberKind::Int => "Int",
            NumberKind::UInt8 => "UInt8",
            NumberKind::UInt16 => "UInt16",
            NumberKind::UInt32 => "UInt32",
            NumberKind::UInt64 => "UInt64",
            NumberKind::UInt128 => "UInt128",
            NumberKind::UInt256 => "UInt256",
            NumberKind::UInt => "UInt",
            NumberKind::Word8 => "Word8",
            NumberKind::Word16 => "Word16",
            NumberKind::Word32 => "Word32",
            NumberKind::Word64 => "Word64",
            NumberKind::Word128 => "Word128",
            NumberKind::Word256 => "Word256",
            NumberKind::Fix64 => "Fix64",
            NumberKind::UFix64 => "UFix64",
        }
    }

    /// The byte width of the in-memory representation, or `None` for the
    /// arbitrary-precision kinds (whose width is value-dependent).
    pub const fn byte_width(self) -> Option<u64> {
        match self {
            NumberKind::Int8 | NumberKind::UInt8 | NumberKind::Word8 => Some(1),
            NumberKind::Int16 | NumberKind::UInt16 | NumberKind::Word16 => Some(2),
            NumberKind::Int32 | NumberKind::UInt32 | NumberKind::Word32 => Some(4),
            NumberKind::Int64
            | NumberKind::UInt64
            | NumberKind::Word64
            | NumberKind::Fix64
            | NumberKind::UFix64 => Some(8),
            NumberKind::Int128 | NumberKind::UInt128 | NumberKind::Word128 => Some(16),
            NumberKind::Int256 | NumberKind::UInt256 | NumberKind::Word256 => Some(32),
            NumberKind::Int | NumberKind::UInt => None,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            NumberKind::Int8
                | NumberKind::Int16
                | NumberKind::Int32
                | NumberKind::Int64
                | NumberKind::Int128
                | NumberKind::Int256
                | NumberKind::Int
                | NumberKind::Fix64
        )
    }

    /// Wrapping word kinds never trap on overflow.
    pub const fn is_wrapping(self) -> bool {
        matches!(
            self,
            NumberKind::Word8
                | NumberKind::Word16
                | NumberKind::Word32
                | NumberKind::Word64
                | NumberKind::Word128
                | NumberKind::Word256
        )
    }

    pub const fn is_fixed_point(self) -> bool {
        matches!(self, NumberKind::Fix64 | NumberKind::UFix64)
    }
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers conformance and kind questions about named types. Implemented by
/// the elaboration; injected so subtyping does not own the tables.
pub trait ConformanceResolver {
    /// Whether `composite` declares (directly or transitively) conformance
    /// to `interface`.
    fn conforms_to(&self, composite: &QualifiedId, interface: &QualifiedId) -> bool;

    /// The declared kind of the composite type, if known.
    fn composite_kind(&self, id: &QualifiedId) -> Option<CompositeKind>;
}

/// A resolver with no tables. Conformances are unknown; kinds are unknown.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyResolver;

impl ConformanceResolver for EmptyResolver {
    fn conforms_to(&self, _composite: &QualifiedId, _interface: &QualifiedId) -> bool {
        false
    }

    fn composite_kind(&self, _id: &QualifiedId) -> Option<CompositeKind> {
        None
    }
}

/// A static type descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Never,
    Bool,
    String,
    Address,
    /// `Path` when `None`, or a domain-restricted path type.
    Path(Option<PathDomain>),
    Number(NumberKind),
    Optional(Box<Type>),
    VarArray(Box<Type>),
    ConstArray(Box<Type>, usize),
    Dictionary(Box<Type>, Box<Type>),
    Composite(QualifiedId),
    Interface(QualifiedId),
    Reference {
        authorized: bool,
        referenced: Box<Type>,
    },
    Capability(Option<Box<Type>>),
    Function {
        parameters: Vec<Type>,
        return_type: Box<Type>,
    },
    Any,
    AnyStruct,
    AnyResource,
    /// The type of type values (`Type` in the language).
    MetaType,
    AuthAccount,
    PublicAccount,
}

impl Type {
    pub fn optional(inner: Type) -> Type {
        Type::Optional(Box::new(inner))
    }

    pub fn array(element: Type) -> Type {
        Type::VarArray(Box::new(element))
    }

    pub fn dictionary(key: Type, value: Type) -> Type {
        Type::Dictionary(Box::new(key), Box::new(value))
    }

    pub fn reference(authorized: bool, referenced: Type) -> Type {
        Type::Reference {
            authorized,
            referenced: Box::new(referenced),
        }
    }

    pub fn capability(borrow_type: Option<Type>) -> Type {
        Type::Capability(borrow_type.map(Box::new))
    }

    pub fn composite(id: QualifiedId) -> Type {
        Type::Composite(id)
    }

    /// Whether values of this type obey the linear resource discipline.
    pub fn is_resource_kinded(&self, resolver: &dyn ConformanceResolver) -> bool {
        match self {
            Type::AnyResource => true,
            Type::Composite(id) => resolver
                .composite_kind(id)
                .is_some_and(CompositeKind::is_resource),
            Type::Optional(inner) => inner.is_resource_kinded(resolver),
            Type::VarArray(element) | Type::ConstArray(element, _) => {
                element.is_resource_kinded(resolver)
            }
            Type::Dictionary(_, value) => value.is_resource_kinded(resolver),
            _ => false,
        }
    }

    /// Dynamic subtype check, used by casts, borrows, and storage reads.
    pub fn is_subtype_of(&self, other: &Type, resolver: &dyn ConformanceResolver) -> bool {
        if self == other || matches!(self, Type::Never) {
            return true;
        }
        match other {
            Type::Any => true,
            Type::AnyStruct => !self.is_resource_kinded(resolver) && !matches!(self, Type::Void),
            Type::AnyResource => self.is_resource_kinded(resolver),
            Type::Optional(sup_inner) => match self {
                Type::Optional(sub_inner) => sub_inner.is_subtype_of(sup_inner, resolver),
                // `T` widens into `T?`.
                sub => sub.is_subtype_of(sup_inner, resolver),
            },
            Type::Interface(interface) => match self {
                Type::Composite(composite) => resolver.conforms_to(composite, interface),
                _ => false,
            },
            Type::Reference {
                authorized: sup_auth,
                referenced: sup_ref,
            } => match self {
                Type::Reference {
                    authorized: sub_auth,
                    referenced: sub_ref,
                } => {
                    // Authorized references downcast to unauthorized, never
                    // the other way around.
                    (*sub_auth || !*sup_auth) && sub_ref.is_subtype_of(sup_ref, resolver)
                }
                _ => false,
            },
            Type::Capability(None) => matches!(self, Type::Capability(_)),
            Type::Capability(Some(sup_borrow)) => match self {
                Type::Capability(Some(sub_borrow)) => {
                    sub_borrow.is_subtype_of(sup_borrow, resolver)
                }
                _ => false,
            },
            Type::VarArray(sup_element) => match self {
                Type::VarArray(sub_element) => sub_element.is_subtype_of(sup_element, resolver),
                _ => false,
            },
            Type::ConstArray(sup_element, sup_size) => match self {
                Type::ConstArray(sub_element, sub_size) => {
                    sub_size == sup_size && sub_element.is_subtype_of(sup_element, resolver)
                }
                _ => false,
            },
            Type::Dictionary(sup_key, sup_value) => match self {
                Type::Dictionary(sub_key, sub_value) => {
                    sub_key.is_subtype_of(sup_key, resolver)
                        && sub_value.is_subtype_of(sup_value, resolver)
                }
                _ => false,
            },
            Type::Path(None) => matches!(self, Type::Path(_)),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("Void"),
            Type::Never => f.write_str("Never"),
            Type::Bool => f.write_str("Bool"),
            Type::String => f.write_str("String"),
            Type::Address => f.write_str("Address"),
            Type::Path(None) => f.write_str("Path"),
            Type::Path(Some(domain)) => match domain {
                PathDomain::Storage => f.write_str("StoragePath"),
                PathDomain::Private => f.write_str("PrivatePath"),
                PathDomain::Public => f.write_str("PublicPath"),
            },
            Type::Number(kind) => write!(f, "{kind}"),
            Type::Optional(inner) => write!(f, "{inner}?"),
            Type::VarArray(element) => write!(f, "[{element}]"),
            Type::ConstArray(element, size) => write!(f, "[{element}; {size}]"),
            Type::Dictionary(key, value) => write!(f, "{{{key}: {value}}}"),
            Type::Composite(id) | Type::Interface(id) => write!(f, "{id}"),
            Type::Reference {
                authorized,
                referenced,
            } => {
                if *authorized {
                    f.write_str("auth ")?;
                }
                write!(f, "&{referenced}")
            }
            Type::Capability(None) => f.write_str("Capability"),
            Type::Capability(Some(borrow)) => write!(f, "Capability<{borrow}>"),
            Type::Function {
                parameters,
                return_type,
            } => {
                f.write_str("fun(")?;
                for (i, parameter) in parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{parameter}")?;
                }
                write!(f, "): {return_type}")
            }
            Type::Any => f.write_str("Any"),
            Type::AnyStruct => f.write_str("AnyStruct"),
            Type::AnyResource => f.write_str("AnyResource"),
            Type::MetaType => f.write_str("Type"),
            Type::AuthAccount => f.write_str("AuthAccount"),
            Type::PublicAccount => f.write_str("PublicAccount"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::Location;

    fn qid(name: &str) -> QualifiedId {
        QualifiedId::new(Location::test("types"), name)
    }

    struct OneConformance;

    impl ConformanceResolver for OneConformance {
        fn conforms_to(&self, composite: &QualifiedId, interface: &QualifiedId) -> bool {
            composite == &qid("Vault") && interface == &qid("Provider")
        }

        fn composite_kind(&self, id: &QualifiedId) -> Option<CompositeKind> {
            (id == &qid("Vault")).then_some(CompositeKind::Resource)
        }
    }

    #[test]
    fn test_optional_widening() {
        let resolver = EmptyResolver;
        assert!(Type::Bool.is_subtype_of(&Type::optional(Type::Bool), &resolver));
        assert!(Type::optional(Type::Never).is_subtype_of(&Type::optional(Type::Bool), &resolver));
        assert!(!Type::optional(Type::Bool).is_subtype_of(&Type::Bool, &resolver));
    }

    #[test]
    fn test_reference_authorization() {
        let resolver = EmptyResolver;
        let auth = Type::reference(true, Type::String);
        let unauth = Type::reference(false, Type::String);
        assert!(auth.is_subtype_of(&unauth, &resolver));
        assert!(!unauth.is_subtype_of(&auth, &resolver));
    }

    #[test]
    fn test_interface_conformance() {
        let resolver = OneConformance;
        let vault = Type::composite(qid("Vault"));
        assert!(vault.is_subtype_of(&Type::Interface(qid("Provider")), &resolver));
        assert!(!vault.is_subtype_of(&Type::Interface(qid("Receiver")), &resolver));
        assert!(vault.is_subtype_of(&Type::AnyResource, &resolver));
        assert!(!vault.is_subtype_of(&Type::AnyStruct, &resolver));
    }

    #[test]
    fn test_numeric_kinds_are_distinct() {
        let resolver = EmptyResolver;
        let int8 = Type::Number(NumberKind::Int8);
        let uint8 = Type::Number(NumberKind::UInt8);
        assert!(!int8.is_subtype_of(&uint8, &resolver));
        assert!(int8.is_subtype_of(&int8, &resolver));
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::array(Type::Number(NumberKind::UInt64)).to_string(), "[UInt64]");
        assert_eq!(
            Type::dictionary(Type::String, Type::optional(Type::Bool)).to_string(),
            "{String: Bool?}",
        );
        assert_eq!(
            Type::capability(Some(Type::reference(false, Type::composite(qid("Vault")))))
                .to_string(),
            "Capability<&t.types.Vault>",
        );
    }
}
