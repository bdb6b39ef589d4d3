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

//! Embedded contract templates.
//!
//! The four templates are compiled contract modules embedded as hexadecimal blobs. They are
//! decoded, structurally validated and checked for the presence of their placeholders exactly once
//! per process; afterwards the loaded [`Template`] set is immutable and shared by all callers.

use core::str::FromStr;
use std::sync::OnceLock;

use amplify::hex::FromHex;

use crate::{CompiledModule, Constant, Identifier, ModuleId};

/// Compiled template of a plain fungible coin contract.
const STANDARD: &str = "00000004076d795f636f696e074d595f434f494e04696e69740b64756d6d795f6669656c6405000106100400544d504c100d0054656d706c61746520436f696e10190054656d706c61746520436f696e204465736372697074696f6e1000000101020103000102001200110000110100110200110300110400380002";

/// Compiled template of a regulated coin contract with a global pause switch.
const REGULATED_PAUSABLE: &str = "0000000510705f726567756c617465645f636f696e10505f524547554c415445445f434f494e04696e69740b64756d6d795f6669656c64097365745f706175736506000106100400544d504c101700526567756c617465642054656d706c61746520436f696e102300526567756c617465642054656d706c61746520436f696e204465736372697074696f6e01011000000101020103000202001200110000110100110200110300110500390002040105001104003002";

/// Compiled template of a regulated coin contract without a pause switch.
const REGULATED_UNPAUSABLE: &str = "0000000410755f726567756c617465645f636f696e10555f524547554c415445445f434f494e04696e69740b64756d6d795f6669656c6406000106100400544d504c101700526567756c617465642054656d706c61746520436f696e102300526567756c617465642054656d706c61746520436f696e204465736372697074696f6e01001000000101020103000102001200110000110100110200110300110500390002";

/// Compiled template of a closed-loop (permissioned) token contract.
const CLOSED_LOOP: &str = "0000000405746f6b656e05544f4b454e04696e69740b64756d6d795f6669656c6406000100100400544d504c100e0054656d706c61746520546f6b656e101a0054656d706c61746520546f6b656e204465736372697074696f6e10000006000000000000000000000000000000000000000000000000000000000000000001010201030001020012001100001101001102001103001104003a0002";

static TEMPLATES: OnceLock<Result<[Template; 4], TemplateError>> = OnceLock::new();

/// Selector of one of the four embedded contract templates.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "kebab-case"))]
#[repr(u8)]
pub enum TemplateVariant {
    /// Plain fungible coin.
    #[display("standard")]
    Standard = 0,

    /// Compliance-gated coin whose transfers can be globally paused.
    #[display("regulated-pausable")]
    RegulatedPausable = 1,

    /// Compliance-gated coin without a global pause switch.
    #[display("regulated-unpausable")]
    RegulatedUnpausable = 2,

    /// Closed-loop token restricted by an issuer-controlled policy.
    #[display("closed-loop")]
    ClosedLoop = 3,
}

impl FromStr for TemplateVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(TemplateVariant::Standard),
            "regulated-pausable" => Ok(TemplateVariant::RegulatedPausable),
            "regulated-unpausable" => Ok(TemplateVariant::RegulatedUnpausable),
            "closed-loop" => Ok(TemplateVariant::ClosedLoop),
            _ => Err(s.to_owned()),
        }
    }
}

impl TemplateVariant {
    /// All template variants, in the order of their discriminants.
    pub const ALL: [TemplateVariant; 4] = [
        TemplateVariant::Standard,
        TemplateVariant::RegulatedPausable,
        TemplateVariant::RegulatedUnpausable,
        TemplateVariant::ClosedLoop,
    ];

    fn blueprint(self) -> Blueprint {
        match self {
            TemplateVariant::Standard => Blueprint {
                source: STANDARD,
                placeholder: ("my_coin", "MY_COIN"),
                target: ("coin", "COIN"),
                defaults: TokenDefaults {
                    decimals: 6,
                    symbol: "TMPL",
                    name: "Template Coin",
                    description: "Template Coin Description",
                },
            },
            TemplateVariant::RegulatedPausable => Blueprint {
                source: REGULATED_PAUSABLE,
                placeholder: ("p_regulated_coin", "P_REGULATED_COIN"),
                target: ("regulated_coin", "REGULATED_COIN"),
                defaults: TokenDefaults {
                    decimals: 6,
                    symbol: "TMPL",
                    name: "Regulated Template Coin",
                    description: "Regulated Template Coin Description",
                },
            },
            TemplateVariant::RegulatedUnpausable => Blueprint {
                source: REGULATED_UNPAUSABLE,
                placeholder: ("u_regulated_coin", "U_REGULATED_COIN"),
                target: ("regulated_coin", "REGULATED_COIN"),
                defaults: TokenDefaults {
                    decimals: 6,
                    symbol: "TMPL",
                    name: "Regulated Template Coin",
                    description: "Regulated Template Coin Description",
                },
            },
            TemplateVariant::ClosedLoop => Blueprint {
                source: CLOSED_LOOP,
                placeholder: ("token", "TOKEN"),
                target: ("closed_token", "CLOSED_TOKEN"),
                defaults: TokenDefaults {
                    decimals: 0,
                    symbol: "TMPL",
                    name: "Template Token",
                    description: "Template Token Description",
                },
            },
        }
    }
}

struct Blueprint {
    source: &'static str,
    placeholder: (&'static str, &'static str),
    target: (&'static str, &'static str),
    defaults: TokenDefaults,
}

/// Identifier pair naming a contract module and its witness type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct ModuleName {
    /// Name of the module itself.
    pub module: Identifier,
    /// Name of the witness type declared by the module.
    pub witness: Identifier,
}

/// Default metadata constants embedded into a template, in constant-pool order.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "camelCase"))]
pub struct TokenDefaults {
    /// Placeholder decimal count.
    pub decimals: u8,
    /// Placeholder ticker symbol.
    pub symbol: &'static str,
    /// Placeholder display name.
    pub name: &'static str,
    /// Placeholder description.
    pub description: &'static str,
}

impl TokenDefaults {
    /// Returns the defaults in their constant-pool encoding, in replacement order: decimals,
    /// symbol, name, description.
    pub fn constants(&self) -> Result<[Constant; 4], amplify::confinement::Error> {
        Ok([
            Constant::U8(self.decimals),
            Constant::text(self.symbol)?,
            Constant::text(self.name)?,
            Constant::text(self.description)?,
        ])
    }
}

/// A loaded and validated contract template.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Template {
    /// The variant this template was loaded for.
    pub variant: TemplateVariant,
    /// Serialized module bytecode of the template.
    pub source: Vec<u8>,
    /// Content id of the template module.
    pub module_id: ModuleId,
    /// Placeholder module and witness type names present in [`Self::source`].
    pub placeholder: ModuleName,
    /// Fixed identifier pair the placeholders are renamed into.
    pub target: ModuleName,
    /// Default metadata constants present in [`Self::source`].
    pub defaults: TokenDefaults,
}

impl Template {
    /// Returns the template for the given variant.
    ///
    /// The first call (from any thread) decodes and validates all four embedded templates;
    /// subsequent calls reuse the loaded set. A validation failure signals a damaged build asset:
    /// it is not recoverable, and the same error is reported to every caller.
    pub fn get(variant: TemplateVariant) -> Result<&'static Template, TemplateError> {
        match TEMPLATES.get_or_init(load_all) {
            Ok(templates) => Ok(&templates[variant as usize]),
            Err(err) => Err(err.clone()),
        }
    }

    fn load(variant: TemplateVariant) -> Result<Template, TemplateError> {
        let blueprint = variant.blueprint();
        let damaged = |details: String| TemplateError::Damaged(variant, details);

        let source = Vec::<u8>::from_hex(blueprint.source).map_err(|err| damaged(err.to_string()))?;
        let module =
            CompiledModule::from_serialized(&source).map_err(|err| damaged(err.to_string()))?;

        let placeholder = ModuleName {
            module: Identifier::from(blueprint.placeholder.0),
            witness: Identifier::from(blueprint.placeholder.1),
        };
        let target = ModuleName {
            module: Identifier::from(blueprint.target.0),
            witness: Identifier::from(blueprint.target.1),
        };

        if module.self_ident() != Some(&placeholder.module) {
            return Err(TemplateError::MissingPlaceholder(
                variant,
                placeholder.module.to_string(),
            ));
        }
        if !module.identifiers.contains(&placeholder.witness) {
            return Err(TemplateError::MissingPlaceholder(
                variant,
                placeholder.witness.to_string(),
            ));
        }
        let defaults = blueprint
            .defaults
            .constants()
            .map_err(|err| damaged(err.to_string()))?;
        for constant in &defaults {
            let count = module.constants.iter().filter(|c| *c == constant).count();
            if count != 1 {
                return Err(TemplateError::MissingPlaceholder(variant, constant.to_string()));
            }
        }

        Ok(Template {
            variant,
            module_id: module.module_id(),
            source,
            placeholder,
            target,
            defaults: blueprint.defaults,
        })
    }
}

fn load_all() -> Result<[Template; 4], TemplateError> {
    Ok([
        Template::load(TemplateVariant::Standard)?,
        Template::load(TemplateVariant::RegulatedPausable)?,
        Template::load(TemplateVariant::RegulatedUnpausable)?,
        Template::load(TemplateVariant::ClosedLoop)?,
    ])
}

/// Errors of loading embedded templates; all of them indicate a damaged build asset.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum TemplateError {
    /// embedded {0} template is damaged and cannot be loaded. Details: {1}
    Damaged(TemplateVariant, String),

    /// embedded {0} template misses expected placeholder {1}.
    MissingPlaceholder(TemplateVariant, String),
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use super::*;
    use crate::list_constants;

    #[test]
    fn variant_display_from_str() {
        for variant in TemplateVariant::ALL {
            assert_eq!(TemplateVariant::from_str(&variant.to_string()), Ok(variant));
        }
        assert_eq!(TemplateVariant::from_str("premium"), Err(s!("premium")));
    }

    #[test]
    fn all_templates_load() {
        for variant in TemplateVariant::ALL {
            let template = Template::get(variant).unwrap();
            assert_eq!(template.variant, variant);
            let module = CompiledModule::from_serialized(&template.source).unwrap();
            assert_eq!(module.self_ident(), Some(&template.placeholder.module));
            assert!(module.identifiers.contains(&template.placeholder.witness));
            assert_eq!(module.module_id(), template.module_id);
        }
    }

    #[test]
    fn loading_is_deterministic() {
        for variant in TemplateVariant::ALL {
            let first = Template::get(variant).unwrap();
            let second = Template::get(variant).unwrap();
            assert!(std::ptr::eq(first, second), "templates must be loaded only once");
        }
    }

    #[test]
    fn template_sources_are_canonical() {
        for variant in TemplateVariant::ALL {
            let template = Template::get(variant).unwrap();
            let module = CompiledModule::from_serialized(&template.source).unwrap();
            assert_eq!(module.to_serialized().unwrap(), template.source);
        }
    }

    #[test]
    fn defaults_occur_once() {
        for variant in TemplateVariant::ALL {
            let template = Template::get(variant).unwrap();
            let constants = list_constants(&template.source).unwrap();
            for default in template.defaults.constants().unwrap() {
                let count = constants.iter().filter(|c| **c == default).count();
                assert_eq!(count, 1, "{variant} template must contain {default} exactly once");
            }
        }
    }

    #[test]
    fn module_ids_are_distinct() {
        let ids = TemplateVariant::ALL
            .map(|variant| Template::get(variant).unwrap().module_id)
            .into_iter()
            .collect::<BTreeSet<_>>();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn rename_targets_differ_from_placeholders() {
        for variant in TemplateVariant::ALL {
            let template = Template::get(variant).unwrap();
            assert_ne!(template.placeholder.module, template.target.module);
            assert_ne!(template.placeholder.witness, template.target.witness);
        }
    }
}
