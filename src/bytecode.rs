// CoinSmith: bytecode template customization engine for on-chain token contracts
//
// SPDX-License-Identifier: Apache-2.0
//
// Designed in 2024-2025 by Dr Maxim Orlovsky <orlovsky@ubideco.org>
// Written in 2024-2025 by Dr Maxim Orlovsky <orlovsky@ubideco.org>
//
// Copyright (C) 2024-2025 Laboratories for Ubiquitous Deterministic Computing (UBIDECO),
//                         Institute for Distributed and Cognitive Systems (InDCS), Switzerland.
// Copyright (C) 2024-2025 Dr Maxim Orlovsky.
// All rights under the above copyrights are reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

use core::fmt::{self, Display, Formatter};
use core::str::FromStr;
use std::collections::BTreeSet;

use amplify::confinement::{SmallBlob, SmallVec, TinyVec};
use amplify::{ByteArray, Bytes32};
use commit_verify::{CommitId, CommitmentId, DigestExt, ReservedBytes, Sha256};
use strict_encoding::stl::AsciiPrintable;
use strict_encoding::{DeserializeError, RString, StrictDeserialize, StrictDumb, StrictSerialize};

use crate::LIB_NAME_COINSMITH;

/// Maximum size of a serialized module in bytes.
pub const MODULE_MAX_SIZE: usize = u16::MAX as usize;

/// The `copy` ability bit of a struct definition.
pub const ABILITY_COPY: u8 = 0x01;
/// The `drop` ability bit of a struct definition.
pub const ABILITY_DROP: u8 = 0x02;
/// The `store` ability bit of a struct definition.
pub const ABILITY_STORE: u8 = 0x04;
/// The `key` ability bit of a struct definition.
pub const ABILITY_KEY: u8 = 0x08;

/// An entry of a module identifier table.
///
/// Holds between 1 and 64 ASCII characters; the first one must be a letter or an underscore, the
/// rest letters, digits or underscores. The grammar is checked on construction from a string and
/// during module deserialization; it is not re-checked when an identifier is assembled directly
/// from its inner representation.
#[derive(Wrapper, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, From, Display)]
#[wrapper(Deref)]
#[display(inner)]
#[derive(StrictType, StrictEncode, StrictDecode)]
#[strict_type(lib = LIB_NAME_COINSMITH)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Identifier(#[from] RString<AsciiPrintable, AsciiPrintable, 1, 64>);

impl StrictDumb for Identifier {
    fn strict_dumb() -> Self { Self::from("dumb") }
}

impl From<&'static str> for Identifier {
    fn from(s: &'static str) -> Self {
        Self::from_str(s).expect("invalid static identifier literal")
    }
}

impl FromStr for Identifier {
    type Err = InvalidIdent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_ident(s) {
            return Err(InvalidIdent(s.to_owned()));
        }
        RString::from_str(s)
            .map(Self)
            .map_err(|_| InvalidIdent(s.to_owned()))
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    s.len() <= 64
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Error indicating a string which can't be used as a module identifier.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display("string '{0}' is not a valid module identifier")]
pub struct InvalidIdent(pub String);

/// An entry of a module constant pool.
///
/// Byte-vector constants carry their byte length in the serialized form; textual values are
/// expected to be UTF-8, but the pool itself stores raw bytes and performs no text validation.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[derive(StrictType, StrictDumb, StrictEncode, StrictDecode)]
#[strict_type(lib = LIB_NAME_COINSMITH, tags = custom, dumb = { Constant::U8(0) })]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub enum Constant {
    /// A single unsigned byte.
    #[strict_type(tag = 0x01, dumb)]
    U8(u8),

    /// A 64-bit unsigned integer.
    #[strict_type(tag = 0x04)]
    U64(u64),

    /// An account or object address.
    #[strict_type(tag = 0x06)]
    Address(Bytes32),

    /// A length-prefixed byte vector.
    #[strict_type(tag = 0x10)]
    Bytes(SmallBlob),
}

impl Constant {
    /// Constructs a byte-vector constant from a UTF-8 string value.
    pub fn text(value: &str) -> Result<Self, amplify::confinement::Error> {
        SmallBlob::try_from(value.as_bytes().to_vec()).map(Constant::Bytes)
    }

    /// Detects whether two constants belong to the same type (and thus may substitute each other
    /// inside a constant pool).
    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Constant::U8(val) => write!(f, "u8({val})"),
            Constant::U64(val) => write!(f, "u64({val})"),
            Constant::Address(addr) => write!(f, "address(0x{addr:x})"),
            Constant::Bytes(data) => {
                f.write_str("bytes(0x")?;
                for byte in data {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A reference to a value type used by a struct field.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(StrictType, StrictDumb, StrictEncode, StrictDecode)]
#[strict_type(lib = LIB_NAME_COINSMITH, tags = custom)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub enum TypeRef {
    /// Boolean type.
    #[strict_type(tag = 0x00, dumb)]
    Bool,

    /// Unsigned byte type.
    #[strict_type(tag = 0x01)]
    U8,

    /// 64-bit unsigned integer type.
    #[strict_type(tag = 0x04)]
    U64,

    /// Address type.
    #[strict_type(tag = 0x06)]
    Address,

    /// Byte-vector type.
    #[strict_type(tag = 0x10)]
    Bytes,

    /// A struct declared in this module, referenced by its identifier table index.
    #[strict_type(tag = 0x20)]
    Named(u8),
}

/// A field of a struct definition.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(StrictType, StrictDumb, StrictEncode, StrictDecode)]
#[strict_type(lib = LIB_NAME_COINSMITH)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct FieldDef {
    /// Identifier table index of the field name.
    pub name: u8,
    /// Field value type.
    pub ty: TypeRef,
}

/// A struct definition of a module.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[derive(StrictType, StrictDumb, StrictEncode, StrictDecode)]
#[strict_type(lib = LIB_NAME_COINSMITH)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct StructDef {
    /// Identifier table index of the struct name.
    pub name: u8,
    /// Bitmask of the struct abilities (see [`ABILITY_COPY`] and friends).
    pub abilities: u8,
    /// Struct fields, in declaration order.
    pub fields: TinyVec<FieldDef>,
}

/// A function definition of a module.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[derive(StrictType, StrictDumb, StrictEncode, StrictDecode)]
#[strict_type(lib = LIB_NAME_COINSMITH)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct FunctionDef {
    /// Identifier table index of the function name.
    pub name: u8,
    /// Whether the function is callable from outside the module.
    pub public: bool,
    /// Instruction stream of the function body.
    ///
    /// Opaque to this crate; instructions reference identifiers and constants by their table
    /// index, so table-entry rewrites never require changes here.
    pub code: SmallBlob,
}

/// A compiled smart-contract module.
///
/// The parsed form of the module bytecode: an identifier table, a constant pool, struct
/// definitions and function definitions. Serialization is deterministic, so any two equal modules
/// serialize into equal byte sequences and [`Self::module_id`] identifies a module byte-for-byte.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(CommitEncode)]
#[commit_encode(strategy = strict, id = ModuleId)]
#[derive(StrictType, StrictDumb, StrictEncode, StrictDecode)]
#[strict_type(lib = LIB_NAME_COINSMITH)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct CompiledModule {
    /// Module format version (reserved, must be zero).
    pub version: ReservedBytes<2>,
    /// Identifier table index of the module own name.
    pub self_module: u8,
    /// Identifier table.
    pub identifiers: TinyVec<Identifier>,
    /// Constant pool.
    pub constants: SmallVec<Constant>,
    /// Struct definitions.
    pub structs: TinyVec<StructDef>,
    /// Function definitions.
    pub functions: TinyVec<FunctionDef>,
}

impl StrictSerialize for CompiledModule {}
impl StrictDeserialize for CompiledModule {}

impl CompiledModule {
    /// Parses a module out of its serialized bytecode.
    ///
    /// Performs full structural validation: the whole buffer must be consumed, identifiers must
    /// satisfy the identifier grammar and be unique, and every identifier reference must point
    /// inside the identifier table.
    pub fn from_serialized(bytecode: &[u8]) -> Result<Self, DecodeError> {
        let data = SmallBlob::try_from(bytecode.to_vec()).map_err(|_| DecodeError::Oversized)?;
        let module = Self::from_strict_serialized::<MODULE_MAX_SIZE>(data)?;
        module.verify()?;
        Ok(module)
    }

    /// Serializes the module into its canonical bytecode form.
    pub fn to_serialized(&self) -> Result<Vec<u8>, DecodeError> {
        self.to_strict_serialized::<MODULE_MAX_SIZE>()
            .map(|data| data.as_slice().to_vec())
            .map_err(|_| DecodeError::Oversized)
    }

    /// Computes the content id of the module.
    pub fn module_id(&self) -> ModuleId { self.commit_id() }

    /// Returns the identifier naming the module itself, if the self-reference is valid.
    pub fn self_ident(&self) -> Option<&Identifier> {
        self.identifiers.get(self.self_module as usize)
    }

    fn verify(&self) -> Result<(), DecodeError> {
        let mut seen = BTreeSet::new();
        for ident in &self.identifiers {
            if !is_ident(&ident.to_string()) {
                return Err(DecodeError::InvalidIdentifier(ident.to_string()));
            }
            if !seen.insert(ident) {
                return Err(DecodeError::DuplicateIdentifier(ident.clone()));
            }
        }
        let bound = self.identifiers.len() as u8;
        let check = |index: u8| {
            if index >= bound {
                return Err(DecodeError::DanglingIdentifier(index));
            }
            Ok(())
        };
        check(self.self_module)?;
        for def in &self.structs {
            check(def.name)?;
            for field in &def.fields {
                check(field.name)?;
                if let TypeRef::Named(index) = field.ty {
                    check(index)?;
                }
            }
        }
        for func in &self.functions {
            check(func.name)?;
        }
        Ok(())
    }
}

/// Errors of module bytecode decoding.
#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum DecodeError {
    /// the module does not fit into the maximum serialized module size.
    Oversized,

    /// module bytecode is malformed. Details: {0}
    #[from]
    Malformed(DeserializeError),

    /// identifier table entry '{0}' violates the identifier grammar.
    InvalidIdentifier(String),

    /// identifier table contains duplicated entry '{0}'.
    DuplicateIdentifier(Identifier),

    /// module references identifier no {0} absent from the identifier table.
    DanglingIdentifier(u8),
}

/// Unique module identifier - a commitment to the module bytecode.
#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From)]
#[wrapper(Deref, BorrowSlice, Hex, Index, RangeOps)]
#[derive(StrictType, StrictDumb, StrictEncode, StrictDecode)]
#[strict_type(lib = LIB_NAME_COINSMITH)]
#[cfg_attr(
    all(feature = "serde", not(feature = "baid64")),
    derive(Serialize, Deserialize),
    serde(transparent)
)]
pub struct ModuleId(
    #[from]
    #[from([u8; 32])]
    Bytes32,
);

impl From<Sha256> for ModuleId {
    fn from(hasher: Sha256) -> Self { hasher.finish().into() }
}

impl CommitmentId for ModuleId {
    const TAG: &'static str = "urn:ubideco:coinsmith:module#2025-02-10";
}

#[cfg(feature = "baid64")]
mod _baid4 {
    use core::fmt::{self, Display, Formatter};
    use core::str::FromStr;

    use baid64::{Baid64ParseError, DisplayBaid64, FromBaid64Str};

    use super::*;

    impl DisplayBaid64 for ModuleId {
        const HRI: &'static str = "module";
        const CHUNKING: bool = true;
        const PREFIX: bool = true;
        const EMBED_CHECKSUM: bool = false;
        const MNEMONIC: bool = false;
        fn to_baid64_payload(&self) -> [u8; 32] { self.to_byte_array() }
    }
    impl FromBaid64Str for ModuleId {}
    impl FromStr for ModuleId {
        type Err = Baid64ParseError;
        fn from_str(s: &str) -> Result<Self, Self::Err> { Self::from_baid64_str(s) }
    }
    impl Display for ModuleId {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { self.fmt_baid64(f) }
    }
}

#[cfg(all(feature = "serde", feature = "baid64"))]
mod _serde {
    use core::str::FromStr;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::*;

    impl Serialize for ModuleId {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer {
            if serializer.is_human_readable() {
                self.to_string().serialize(serializer)
            } else {
                self.to_byte_array().serialize(serializer)
            }
        }
    }

    impl<'de> Deserialize<'de> for ModuleId {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where D: Deserializer<'de> {
            if deserializer.is_human_readable() {
                let s = String::deserialize(deserializer)?;
                Self::from_str(&s).map_err(D::Error::custom)
            } else {
                let bytes = <[u8; 32]>::deserialize(deserializer)?;
                Ok(Self::from_byte_array(bytes))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn blob(data: &[u8]) -> SmallBlob { SmallBlob::try_from(data.to_vec()).unwrap() }

    fn sample_module() -> CompiledModule {
        CompiledModule {
            version: default!(),
            self_module: 0,
            identifiers: TinyVec::try_from(vec![
                Identifier::from("my_coin"),
                Identifier::from("MY_COIN"),
                Identifier::from("init"),
                Identifier::from("dummy_field"),
            ])
            .unwrap(),
            constants: SmallVec::try_from(vec![
                Constant::U8(6),
                Constant::Bytes(blob(b"TMPL")),
                Constant::Address(Bytes32::from_byte_array([0xAD; 32])),
                Constant::U64(1_000_000),
            ])
            .unwrap(),
            structs: TinyVec::try_from(vec![StructDef {
                name: 1,
                abilities: ABILITY_DROP,
                fields: TinyVec::try_from(vec![FieldDef { name: 3, ty: TypeRef::Bool }]).unwrap(),
            }])
            .unwrap(),
            functions: TinyVec::try_from(vec![FunctionDef {
                name: 2,
                public: false,
                code: blob(&[0x11, 0x00, 0x00, 0x02]),
            }])
            .unwrap(),
        }
    }

    #[test]
    fn identifier_grammar() {
        assert!(Identifier::from_str("my_coin").is_ok());
        assert!(Identifier::from_str("MY_COIN").is_ok());
        assert!(Identifier::from_str("_private2").is_ok());
        assert!(Identifier::from_str("").is_err());
        assert!(Identifier::from_str("9coin").is_err());
        assert!(Identifier::from_str("my coin").is_err());
        assert!(Identifier::from_str("my-coin").is_err());
        assert!(Identifier::from_str(&"a".repeat(65)).is_err());
    }

    #[test]
    fn serialization_roundtrip() {
        let module = sample_module();
        let bytecode = module.to_serialized().unwrap();
        let restored = CompiledModule::from_serialized(&bytecode).unwrap();
        assert_eq!(restored, module);
        assert_eq!(restored.to_serialized().unwrap(), bytecode);
    }

    #[test]
    fn self_ident() {
        let module = sample_module();
        assert_eq!(module.self_ident(), Some(&Identifier::from("my_coin")));
    }

    #[test]
    fn dangling_self_reference() {
        let mut module = sample_module();
        module.self_module = 9;
        let bytecode = module.to_serialized().unwrap();
        assert!(matches!(
            CompiledModule::from_serialized(&bytecode),
            Err(DecodeError::DanglingIdentifier(9))
        ));
    }

    #[test]
    fn dangling_field_reference() {
        let mut module = sample_module();
        module.structs = TinyVec::try_from(vec![StructDef {
            name: 1,
            abilities: ABILITY_DROP,
            fields: TinyVec::try_from(vec![FieldDef { name: 200, ty: TypeRef::Bool }]).unwrap(),
        }])
        .unwrap();
        let bytecode = module.to_serialized().unwrap();
        assert!(matches!(
            CompiledModule::from_serialized(&bytecode),
            Err(DecodeError::DanglingIdentifier(200))
        ));
    }

    #[test]
    fn duplicated_identifier() {
        let mut module = sample_module();
        module.identifiers =
            TinyVec::try_from(vec![Identifier::from("my_coin"), Identifier::from("my_coin")])
                .unwrap();
        let bytecode = module.to_serialized().unwrap();
        assert!(matches!(
            CompiledModule::from_serialized(&bytecode),
            Err(DecodeError::DuplicateIdentifier(_))
        ));
    }

    #[test]
    fn grammar_checked_on_decode() {
        let mut module = sample_module();
        module.identifiers =
            TinyVec::try_from(vec![Identifier::from(RString::from("my coin"))]).unwrap();
        let bytecode = module.to_serialized().unwrap();
        assert!(matches!(
            CompiledModule::from_serialized(&bytecode),
            Err(DecodeError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn malformed_bytecode() {
        assert!(CompiledModule::from_serialized(&[0xFF; 16]).is_err());
        assert!(CompiledModule::from_serialized(&[]).is_err());

        let mut bytecode = sample_module().to_serialized().unwrap();
        bytecode.push(0x00);
        assert!(CompiledModule::from_serialized(&bytecode).is_err());
    }

    #[test]
    fn module_id_determinism() {
        let module = sample_module();
        assert_eq!(module.module_id(), sample_module().module_id());

        let mut altered = sample_module();
        altered.constants = SmallVec::try_from(vec![Constant::U8(9)]).unwrap();
        assert_ne!(module.module_id(), altered.module_id());
    }

    #[test]
    fn constant_display() {
        assert_eq!(Constant::U8(6).to_string(), "u8(6)");
        assert_eq!(Constant::U64(42).to_string(), "u64(42)");
        assert_eq!(Constant::Bytes(blob(b"\xDE\xAD")).to_string(), "bytes(0xdead)");
        assert_eq!(
            Constant::Address(Bytes32::from_byte_array([0; 32])).to_string(),
            "address(0x0000000000000000000000000000000000000000000000000000000000000000)"
        );
    }

    #[test]
    #[cfg(feature = "baid64")]
    fn module_id_display() {
        let id = ModuleId::from_byte_array([0u8; 32]);
        assert_eq!(
            format!("{id}"),
            "module:AAAAAAAA-AAAAAAA-AAAAAAA-AAAAAAA-AAAAAAA-AAAAAAA"
        );
        assert_eq!(
            ModuleId::from_str("module:AAAAAAAA-AAAAAAA-AAAAAAA-AAAAAAA-AAAAAAA-AAAAAAA").unwrap(),
            id
        );
        assert_eq!(
            ModuleId::from_str("AAAAAAAA-AAAAAAA-AAAAAAA-AAAAAAA-AAAAAAA-AAAAAAA").unwrap(),
            id
        );
    }

    #[test]
    #[cfg(all(feature = "serde", feature = "baid64"))]
    fn module_id_serde() {
        use serde_test::{assert_tokens, Configure, Token};

        let id = ModuleId::from_byte_array([0u8; 32]);
        assert_eq!(bincode::serialize(&id).unwrap(), vec![0u8; 32]);
        assert_tokens(&id.readable(), &[Token::Str(
            "module:AAAAAAAA-AAAAAAA-AAAAAAA-AAAAAAA-AAAAAAA-AAAAAAA",
        )]);
    }
}
