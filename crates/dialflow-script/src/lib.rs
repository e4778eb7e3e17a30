// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call script template rendering.
//!
//! Campaign scripts contain `{placeholder}` markers that are substituted
//! per recipient before the call is placed. Substitution sources, in
//! priority order: the recipient's built-in fields (`name`, `phone`),
//! then the recipient's free-form attributes. Placeholders with no
//! matching value are left verbatim so the conversational agent sees
//! exactly what the campaign author wrote.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use dialflow_core::Recipient;

/// Matches `{identifier}` where identifier is a typical template variable
/// name. Deliberately does not match `{}`, `{ spaced }`, or nested braces,
/// so JSON fragments inside a script survive untouched.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Render a script template for one recipient.
///
/// Unresolved placeholders are left verbatim in the output.
pub fn render(template: &str, recipient: &Recipient) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let key = &caps[1];
            lookup(recipient, key).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// List the distinct placeholder names a template references, in sorted
/// order. Used by campaign validation to warn about variables no
/// recipient can supply.
pub fn extract_variables(template: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

fn lookup(recipient: &Recipient, key: &str) -> Option<String> {
    match key {
        "name" => Some(recipient.name.clone()),
        "phone" => Some(recipient.phone.clone()),
        _ => recipient.attributes.get(key).cloned(),
    }
}
