//! Operation identifiers.
//!
//! Every (pack, method) pair is addressed as `pack.<pack_id>.<method>`.
//! Since `pack_id` is unique within a registry and `method` comes from a
//! closed set that never contains a `.`, the identifier is unique by
//! construction and can be split back on its last `.`.
//!
//! Some transports only accept `[A-Za-z0-9_-]` in tool names, so each
//! operation also gets a `pack__<token>__<method>` alias. Sanitizing is
//! lossy (`a.b` and `a_b` share a token); the registry detects and drops
//! colliding aliases.

use crate::method::Method;

pub const OPERATION_PREFIX: &str = "pack.";
pub const TOOL_NAME_PREFIX: &str = "pack__";

/// `pack_id` grammar: one or more of `[A-Za-z0-9._-]`.
pub fn is_valid_pack_id(pack_id: &str) -> bool {
    !pack_id.is_empty()
        && pack_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
}

/// `pack.<pack_id>.<method>`
pub fn operation_id(pack_id: &str, method: Method) -> String {
    format!("{OPERATION_PREFIX}{pack_id}.{method}")
}

/// Split an operation id into `(pack_id, method)`.
///
/// Returns `None` for anything that could not have been produced by
/// [`operation_id`].
pub fn parse_operation_id(name: &str) -> Option<(&str, Method)> {
    let rest = name.strip_prefix(OPERATION_PREFIX)?;
    let (pack_id, method) = rest.rsplit_once('.')?;
    if !is_valid_pack_id(pack_id) {
        return None;
    }
    Some((pack_id, method.parse().ok()?))
}

/// `pack__<sanitized pack_id>__<method>`
pub fn tool_name(pack_id: &str, method: Method) -> String {
    format!("{TOOL_NAME_PREFIX}{}__{method}", sanitize_tool_token(pack_id))
}

/// Map an identifier onto `[A-Za-z0-9_-]`: disallowed characters (dots
/// included) become `_`, runs of `_` collapse, and edge `_` are trimmed.
pub fn sanitize_tool_token(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}
