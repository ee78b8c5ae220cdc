//! # vapor - CloudFormation templates from Rust
//!
//! For CLI usage see the `vapor` binary (`vapor --help`).
//!
//! ## Introduction for developers
//!
//! Read this to understand how `vapor` is put together.
//!
//! ### Terms
//!
//! - a **template** is the whole document
//! - it has five **sections**: Parameters, Mappings, Conditions, Resources and Outputs
//! - each section holds named **elements**
//! - an element holds **attributes** (`name -> value`)
//! - a **value** is a literal, a list, an object, a **reference** to another element, or an
//!   **intrinsic function** call that only the provisioning engine evaluates
//!
//! ### Building
//!
//! Elements are created through their typed wrappers ([element::Parameter], [element::Resource], ...)
//! and chained setters, then attached with [template::Template::add]. `add` returns an
//! [element::ElementRef] that converts into a `{ "Ref": name }` value.
//!
//! ```
//! use vapor::element::{Output, Parameter};
//! use vapor::template::Template;
//!
//! let mut t = Template::default();
//! let key_name = t.add(Parameter::new("KeyName").type_("String"))?;
//! t.add(Output::new("KeyName").description("-").value(&key_name))?;
//!
//! assert!(t.to_json()?.contains(r#""Ref": "KeyName""#));
//! # Ok::<(), vapor::error::Error>(())
//! ```
//!
//! ### Merging
//!
//! [template::Template::merge] adds an element or, if the section already has one of that name,
//! merges the attributes. Objects merge key by key, so patching one property of a resource keeps
//! the others. This is what [recipe::Recipe]s use to layer changes onto a base document.
//!
//! ### Checks
//!
//! Mistakes are reported as early as possible:
//!
//! | check                                  | when                                    |
//! |----------------------------------------|-----------------------------------------|
//! | intrinsic argument count               | [intrinsics::Intrinsic::new]            |
//! | literal mapping lookups                | [element::Mapping::find_in_map]         |
//! | duplicate names                        | [template::Template::add]               |
//! | file content vs. source                | [metadata::Config::file]                |
//! | config set / authentication references | [metadata::CfnInit::build]              |
//! | required fields, element references    | [template::Template::to_wire]           |
//!
//! ### Output
//!
//! [template::Template::to_wire] renders the document as a [value::Value] which is serialized via
//! [serde]. Section and element order is stable, so rendering twice gives identical output.
pub mod attributes;
pub mod element;
pub mod error;
pub mod intrinsics;
pub mod metadata;
pub mod recipe;
pub mod template;
pub mod user_data;
pub mod value;
mod visit;
