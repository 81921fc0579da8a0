// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Built-in schema directives

use std::fmt;

/// Key of the leaf recording a resolved `$ref`
pub const PARSER_ID_KEY: &str = "!parser_id";

/// Key of the leaf recording a validated `!calculate`
pub const CALCULATE_KEY: &str = "!calculate";

/// Prefix every parser reference must start with
pub const REFERENCE_PREFIX: &str = "#/$defs/";

/// JSON-Schema keywords whose array values carry no structure
pub const SCHEMA_ARRAY_KEYWORDS: &[&str] = &[
    "required", "enum", "examples", "type", "anyOf", "allOf", "oneOf",
];

/// Keys recognised by the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// `properties`
    Properties,
    /// `additionalProperties`
    AdditionalProperties,
    /// `unevaluatedProperties`
    UnevaluatedProperties,
    /// `patternProperties`
    PatternProperties,
    /// `!parsing`
    Parsing,
    /// `!varname`
    Varname,
    /// `$ref`
    Reference,
    /// `!calculate`
    Calculate,
}

impl Directive {
    /// All built-in directives
    pub const ALL: [Directive; 8] = [
        Directive::Properties,
        Directive::AdditionalProperties,
        Directive::UnevaluatedProperties,
        Directive::PatternProperties,
        Directive::Parsing,
        Directive::Varname,
        Directive::Reference,
        Directive::Calculate,
    ];

    /// Look up the directive for a schema key
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "properties" => Some(Directive::Properties),
            "additionalProperties" => Some(Directive::AdditionalProperties),
            "unevaluatedProperties" => Some(Directive::UnevaluatedProperties),
            "patternProperties" => Some(Directive::PatternProperties),
            "!parsing" => Some(Directive::Parsing),
            "!varname" => Some(Directive::Varname),
            "$ref" => Some(Directive::Reference),
            "!calculate" => Some(Directive::Calculate),
            _ => None,
        }
    }

    /// Schema key of the directive
    pub const fn as_str(self) -> &'static str {
        match self {
            Directive::Properties => "properties",
            Directive::AdditionalProperties => "additionalProperties",
            Directive::UnevaluatedProperties => "unevaluatedProperties",
            Directive::PatternProperties => "patternProperties",
            Directive::Parsing => "!parsing",
            Directive::Varname => "!varname",
            Directive::Reference => "$ref",
            Directive::Calculate => "!calculate",
        }
    }

    /// Directives that only modify the context of the entry holding them.
    /// They are applied before any sibling is interpreted.
    pub const fn is_contextual(self) -> bool {
        matches!(
            self,
            Directive::PatternProperties | Directive::Parsing | Directive::Varname
        )
    }

    /// Directives outside the JSON-Schema vocabulary
    pub const fn is_extension(self) -> bool {
        matches!(
            self,
            Directive::Parsing | Directive::Varname | Directive::Calculate
        )
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
