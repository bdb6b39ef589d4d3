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

//! Template customization.
//!
//! Turns a contract template plus user-chosen token metadata into publishable module bytecode.
//! The customization is a chain of fallible rewrite steps over function-local buffers: the
//! placeholder identifiers are renamed first, then the four metadata constants are substituted in
//! their constant-pool order, each step consuming the output of the previous one. A failure of
//! any step fails the whole customization; no partially rewritten buffer can ever be observed by
//! the caller.

use crate::{
    list_constants, rename_identifiers, replace_constant, CompiledModule, Constant, DecodeError,
    ModuleId, RewriteError, Template, TemplateError, TemplateVariant,
};

/// User-chosen metadata of the token under creation.
///
/// The decimal count is bound to a single byte by the type system; textual fields are free-form
/// UTF-8 and are size-checked only against the maximum constant size during customization.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct CoinSpec {
    /// Display name of the token.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Human-readable token description.
    pub description: String,
    /// Number of decimal places of the token subdivision.
    pub decimals: u8,
}

impl CoinSpec {
    /// Assembles a coin specification from its components.
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        description: impl Into<String>,
        decimals: u8,
    ) -> Self {
        CoinSpec {
            name: name.into(),
            symbol: symbol.into(),
            description: description.into(),
            decimals,
        }
    }
}

/// Outcome of a successful template customization.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct PatchedTemplate {
    /// The untouched source bytecode of the template.
    pub original: Vec<u8>,
    /// Constant pool of the original template module, for caller-side diagnostics.
    pub constants: Vec<Constant>,
    /// The customized module bytecode, ready to be published.
    pub patched: Vec<u8>,
}

impl PatchedTemplate {
    /// Computes the content id of the customized module.
    pub fn patched_id(&self) -> Result<ModuleId, DecodeError> {
        CompiledModule::from_serialized(&self.patched).map(|module| module.module_id())
    }
}

/// Customizes the embedded template of the given variant with the user-chosen token metadata.
///
/// A shorthand for [`Template::get`] followed by [`Template::patch`].
pub fn patch(variant: TemplateVariant, spec: &CoinSpec) -> Result<PatchedTemplate, PatchError> {
    Template::get(variant)?.patch(spec)
}

impl Template {
    /// Customizes this template with the user-chosen token metadata.
    ///
    /// Renames the placeholder module and witness type into the fixed target names and replaces
    /// the four metadata constants (decimals, symbol, name, description, in this order) with the
    /// values from `spec`. Each replacement locates its target by exact value match in the output
    /// of the previous step; any miss aborts the whole customization.
    pub fn patch(&self, spec: &CoinSpec) -> Result<PatchedTemplate, PatchError> {
        let constants = list_constants(&self.source)?;

        let renames = bmap! {
            self.placeholder.module.clone() => self.target.module.clone(),
            self.placeholder.witness.clone() => self.target.witness.clone(),
        };
        let bytecode = rename_identifiers(&self.source, &renames)?;
        let bytecode = replace_constant(
            &bytecode,
            &Constant::U8(self.defaults.decimals),
            &Constant::U8(spec.decimals),
        )?;
        let bytecode = replace_constant(
            &bytecode,
            &text_constant("symbol", self.defaults.symbol)?,
            &text_constant("symbol", &spec.symbol)?,
        )?;
        let bytecode = replace_constant(
            &bytecode,
            &text_constant("name", self.defaults.name)?,
            &text_constant("name", &spec.name)?,
        )?;
        let bytecode = replace_constant(
            &bytecode,
            &text_constant("description", self.defaults.description)?,
            &text_constant("description", &spec.description)?,
        )?;

        Ok(PatchedTemplate { original: self.source.clone(), constants, patched: bytecode })
    }
}

fn text_constant(field: &'static str, value: &str) -> Result<Constant, PatchError> {
    Constant::text(value).map_err(|_| PatchError::FieldOversized { field, len: value.len() })
}

/// Errors of template customization.
#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum PatchError {
    /// unable to load the contract template. Details: {0}
    #[from]
    Template(TemplateError),

    /// unable to customize the contract template. Details: {0}
    #[from]
    Rewrite(RewriteError),

    /// unable to introspect the contract template. Details: {0}
    #[from]
    Decode(DecodeError),

    /// the {field} field value of {len} bytes does not fit into a module constant.
    FieldOversized {
        /// Name of the oversized field.
        field: &'static str,
        /// Byte length of the supplied value.
        len: usize,
    },
}
