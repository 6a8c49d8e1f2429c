//! # azsynth - infrastructure declarations to ARM templates
//!
//! For a user guide and material related to CLI usage see the README.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `azsynth` works internally.
//!
//! ### Declarations
//!
//! Infrastructure is declared in HCL documents (`*.infra.hcl`):
//!
//! ```hcl
//! naming {
//!   organization = "ctso"
//!   project      = "web"
//!   environment  = "nonprod"
//!   geography    = "eus"
//! }
//!
//! subscription "main" {
//!   resource_group "core" {
//!     location = "eastus"
//!
//!     resource "virtual_network" "hub" {
//!       addressSpace = { addressPrefixes = ["10.0.0.0/16"] }
//!
//!       resource "subnet" "web" {
//!         addressPrefix = "10.0.1.0/24"
//!       }
//!     }
//!
//!     resource "user_assigned_identity" "app" {}
//!
//!     grant "app_reads_network" {
//!       scope   = main.core.hub.id
//!       role    = "acdd72a7-3385-48ef-bd42-f606fba81ae7"
//!       grantee = main.core.app.id
//!     }
//!   }
//! }
//! ```
//!
//! ### Loading files
//!
//! An `.hcl` document is parsed as a `body` ([hcl_edit::structure::Body]). [hcl_documents::HclDocuments] stores all
//! (root) attributes and blocks of all documents and tracks their original source path. At this point the documents
//! only have to be valid HCL to be accepted.
//!
//! ### Parsing
//!
//! see [infra_document::InfraDocument::new]
//!
//! Blocks become nodes of a [tree::ConstructTree]. Traversals like `main.core.hub.id` become
//! [reference::DeferredRef]s: the longest declared prefix is the target node (`/main/core/hub`), the remainder is what
//! is requested of it (`id`).
//!
//! ### Construct tree
//!
//! see [tree]
//!
//! Containers (subscription, resource group, group) carry location, naming context and tags for their descendants.
//! Lookups go by [tree::Capability], never by node kind.
//!
//! ### Realization
//!
//! see [resource::Intent::realize]
//!
//! Each resource intent gets its name ([naming]), inherited location and tags and secure defaults, and is then
//! validated by its [resource::ResourceSchema] into a [resource::ResourceRecord]. Issues of all nodes are collected.
//!
//! ### Planning
//!
//! see [plan::Plan]
//!
//! References and explicit dependencies become edges between resources. Children of types that reject concurrent
//! child mutations are inlined into their parent. A topological sort yields the emission order or the cycle.
//!
//! ### Synthesis
//!
//! see [synth::synthesize]
//!
//! One template per deployment boundary. References are resolved into template expressions by
//! [reference::Resolver], same-unit edges become `dependsOn`.
//!
//! ### Output
//!
//! [synth::Document] is serialized via [serde], see [value::Value] for property values.
//!
pub mod error;
pub mod hcl_documents;
pub mod infra_document;
pub mod naming;
pub mod plan;
pub mod reference;
pub mod resource;
pub mod synth;
pub mod tree;
pub mod value;
mod visit;
