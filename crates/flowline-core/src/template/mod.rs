//! Template resolution module.
//!
//! Resolves `{{path}}` tokens against an execution context. The grammar is
//! narrow: a token holds one dotted path (`{{ident(.ident)*}}`),
//! no filters, no expressions.

mod resolver;

pub use resolver::{lookup, resolve, resolve_string, stringify};
