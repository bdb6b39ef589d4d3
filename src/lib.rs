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

//! **CoinSmith** customizes precompiled token-contract bytecode. It ships four fixed contract
//! templates (a plain coin, a regulated coin in pausable and unpausable policy variants, and a
//! closed-loop token) and rewrites each into a publishable module carrying user-chosen metadata:
//! the module and its witness type are renamed from their placeholder identifiers, and the four
//! embedded metadata constants (decimal count, symbol, display name, description) are substituted
//! with the user values. Everything else in the module, including its structure, its instruction
//! streams and its remaining constants, is preserved byte-for-byte.
//!
//! The engine is a pure transformation: no I/O, no chain interaction, no persistence. Publishing
//! the produced bytes, signing, and wallet plumbing are the caller's business. All edits are
//! structural (deserialize, rewrite, re-serialize), so any buffer the engine returns is guaranteed
//! to be a well-formed module; any step which cannot locate its target fails the whole operation
//! instead of handing back a half-customized artifact.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![deny(missing_docs)]

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate strict_encoding;
#[macro_use]
extern crate commit_verify;

#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;

mod bytecode;
mod rewrite;
mod template;
mod patch;

pub use bytecode::{
    CompiledModule, Constant, DecodeError, FieldDef, FunctionDef, Identifier, InvalidIdent,
    ModuleId, StructDef, TypeRef, ABILITY_COPY, ABILITY_DROP, ABILITY_KEY, ABILITY_STORE,
    MODULE_MAX_SIZE,
};
pub use patch::{patch, CoinSpec, PatchError, PatchedTemplate};
pub use rewrite::{list_constants, rename_identifiers, replace_constant, RewriteError};
pub use template::{ModuleName, Template, TemplateError, TemplateVariant, TokenDefaults};

/// Strict type library name for the types defined in this crate.
pub const LIB_NAME_COINSMITH: &str = "CoinSmith";
