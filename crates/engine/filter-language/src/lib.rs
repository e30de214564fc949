//! The expression sub-language accepted by the filter field extension.
//!
//! Grammar, precedence high to low: `^` (right-associative), `* / %`, `+ -`,
//! `< <= > >=`, `== !=`, `&&`/`and`, `||`/`or`. Terms are literals, bare or
//! dotted field paths (segments may carry call arguments, e.g.
//! `tasks.where(done == true).count()`), and parenthesised sub-expressions.
//!
//! Parsing is schema-free: identifiers are resolved against the element type
//! by the consumer.

mod model;
mod parser;

pub use model::{BinaryOp, Expr, Literal, Segment};

pub use parser::parse;
