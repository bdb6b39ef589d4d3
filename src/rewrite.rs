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

//! Byte-level module rewrite primitives.
//!
//! Each primitive is a pure function from an input bytecode buffer to a freshly allocated output
//! buffer: the input is deserialized, the parsed structure is edited, and the result is
//! re-serialized in canonical form. Length prefixes and the layout of dependent sections are thus
//! recomputed automatically, and a successful output is always a well-formed module. A primitive
//! which cannot locate its exact target fails with a typed error and produces no output.

use std::collections::BTreeMap;

use amplify::confinement::{SmallVec, TinyVec};

use crate::{CompiledModule, Constant, DecodeError, Identifier};

/// Replaces identifier table entries of a module according to the `renames` mapping.
///
/// Every mapping source must be present in the table, every occurrence of a source is replaced,
/// and no other part of the module is touched. The identifier table must stay duplicate-free
/// after the renaming.
pub fn rename_identifiers(
    bytecode: &[u8],
    renames: &BTreeMap<Identifier, Identifier>,
) -> Result<Vec<u8>, RewriteError> {
    let mut module = CompiledModule::from_serialized(bytecode)?;
    for from in renames.keys() {
        if !module.identifiers.contains(from) {
            return Err(RewriteError::IdentifierNotFound(from.clone()));
        }
    }
    let mut identifiers = TinyVec::new();
    for ident in &module.identifiers {
        let renamed = renames.get(ident).unwrap_or(ident).clone();
        // Can't overflow: the renamed table has the same entry count as the decoded one.
        let _ = identifiers.push(renamed);
    }
    for (pos, ident) in identifiers.iter().enumerate() {
        if identifiers.iter().skip(pos + 1).any(|other| other == ident) {
            return Err(RewriteError::IdentifierCollision(ident.clone()));
        }
    }
    module.identifiers = identifiers;
    Ok(module.to_serialized()?)
}

/// Replaces the constant pool entry exactly equal to `old` with the `new` value.
///
/// The match is by value: same constant type, same encoded payload. The operation fails if `new`
/// is of a different constant type than `old`, if no pool entry equals `old`, or if more than one
/// entry does (an ambiguous replacement could rewrite the wrong entry, so it is refused).
pub fn replace_constant(
    bytecode: &[u8],
    old: &Constant,
    new: &Constant,
) -> Result<Vec<u8>, RewriteError> {
    if !old.same_type(new) {
        return Err(RewriteError::TypeMismatch { old: old.clone(), new: new.clone() });
    }
    let mut module = CompiledModule::from_serialized(bytecode)?;
    let mut matches = module.constants.iter().enumerate().filter(|(_, c)| *c == old);
    let pos = match (matches.next(), matches.next()) {
        (None, _) => return Err(RewriteError::ConstantNotFound(old.clone())),
        (Some(_), Some(_)) => return Err(RewriteError::AmbiguousConstant(old.clone())),
        (Some((pos, _)), None) => pos,
    };
    let mut constants = SmallVec::new();
    for (no, constant) in module.constants.iter().enumerate() {
        let value = if no == pos { new.clone() } else { constant.clone() };
        // Can't overflow: the rewritten pool has the same entry count as the decoded one.
        let _ = constants.push(value);
    }
    module.constants = constants;
    Ok(module.to_serialized()?)
}

/// Lists all constant pool entries of a module.
pub fn list_constants(bytecode: &[u8]) -> Result<Vec<Constant>, DecodeError> {
    let module = CompiledModule::from_serialized(bytecode)?;
    Ok(module.constants.iter().cloned().collect())
}

/// Errors of module rewrite operations.
#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum RewriteError {
    /// module under rewrite cannot be decoded. Details: {0}
    #[from]
    Decode(DecodeError),

    /// identifier '{0}' is not present in the module identifier table.
    IdentifierNotFound(Identifier),

    /// renaming would duplicate identifier '{0}' in the module identifier table.
    IdentifierCollision(Identifier),

    /// constant {0} is not present in the module constant pool.
    ConstantNotFound(Constant),

    /// constant {0} occurs multiple times in the module constant pool, and its replacement is
    /// ambiguous.
    AmbiguousConstant(Constant),

    /// replacement value {new} does not match the type of the original constant {old}.
    TypeMismatch {
        /// The constant requested to be replaced.
        old: Constant,
        /// The replacement value of a non-matching type.
        new: Constant,
    },
}
