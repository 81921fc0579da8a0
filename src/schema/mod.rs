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

//! Annotated schema interpretation
//!
//! A schema is a JSON-Schema document whose `properties` describe the shape
//! of the compiled metadata and whose `$defs` hold one schema per parser.
//! Extension directives bind parser results into that shape:
//!
//! ```json
//! {
//!   "properties": {
//!     "time": {"$ref": "#/$defs/time_parser"},
//!     "ratio": {"!calculate": {
//!       "expression": "{a} / {b}",
//!       "variables": {
//!         "a": {"$ref": "#/$defs/time_parser", "!parsing": {"keys": ["real"], "unpack": true}},
//!         "b": {"$ref": "#/$defs/time_parser", "!parsing": {"keys": ["user"], "unpack": true}}
//!       }
//!     }}
//!   },
//!   "$defs": {"time_parser": {"type": "object"}}
//! }
//! ```

pub mod directive;
pub mod entry;
pub mod error;
pub mod interpreter;
pub mod strip;

use serde_json::Value;

pub use directive::{CALCULATE_KEY, Directive, PARSER_ID_KEY, REFERENCE_PREFIX};
pub use entry::{
    CalculateDirective, Context, EntryNode, ParserReference, ParsingDirective, SchemaEntry, Unpack,
};
pub use error::{SchemaError, SchemaResult};
pub use interpreter::{SchemaInterpreter, interpret};
pub use strip::strip_directives;

/// JSON type name used in error messages
pub(crate) fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
