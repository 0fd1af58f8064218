//! Name and keyword queries for interactive tooling.
//!
//! The interactive-shell adapter builds its complete/inspect replies from
//! an explicit snapshot of known names rather than runtime introspection
//! of the host environment. The snapshot covers plume keywords (hard and
//! soft) and the host builtins the emitter assumes.

use crate::plume::parsing::engine::RESERVED;

/// Soft keywords recognized positionally by the grammar.
pub const SOFT_KEYWORDS: &[&str] = &["match", "case", "type", "operator"];

/// Builtins the translated output may reference.
pub const BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "bytes", "chr", "dict", "dir", "enumerate", "filter", "float",
    "format", "frozenset", "getattr", "hasattr", "hash", "hex", "id", "input", "int",
    "isinstance", "issubclass", "iter", "len", "list", "map", "max", "min", "next", "object",
    "oct", "open", "ord", "pow", "print", "range", "repr", "reversed", "round", "set", "setattr",
    "slice", "sorted", "str", "sum", "super", "tuple", "type", "vars", "zip", "False", "None",
    "True",
];

/// The full known-name snapshot, sorted and deduplicated.
pub fn known_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = RESERVED
        .iter()
        .chain(SOFT_KEYWORDS.iter())
        .chain(BUILTINS.iter())
        .copied()
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Completion candidates for a prefix, in sorted order.
pub fn complete(prefix: &str) -> Vec<&'static str> {
    known_names()
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .collect()
}

/// A short description of a known name, for inspect replies.
pub fn inspect(name: &str) -> Option<&'static str> {
    let doc = match name {
        "def" => "Define a function.",
        "class" => "Define a class.",
        "match" => "Structural pattern matching statement (soft keyword).",
        "case" => "One arm of a match statement (soft keyword).",
        "type" => "Type alias statement (soft keyword) or the type builtin.",
        "operator" => "Declare a custom infix operator (soft keyword).",
        "lambda" => "Reserved; plume lambdas use arrow syntax instead.",
        "await" => "Suspend on an awaitable inside an async function.",
        "yield" => "Produce a value from a generator.",
        "import" => "Bind a module name.",
        "from" => "Import names out of a module.",
        "if" | "elif" | "else" => "Conditional execution.",
        "while" => "Loop while a condition holds.",
        "for" => "Iterate over an iterable.",
        "in" => "Membership test, or the iteration clause of a for loop.",
        "is" => "Identity comparison.",
        "not" | "and" | "or" => "Boolean operator.",
        "return" => "Return from a function.",
        "pass" => "Do nothing.",
        "break" => "Exit the innermost loop.",
        "continue" => "Skip to the next loop iteration.",
        _ => {
            if BUILTINS.contains(&name) {
                "Host-language builtin."
            } else {
                return None;
            }
        }
    };
    Some(doc)
}
