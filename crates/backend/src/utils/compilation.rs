use std::borrow::Cow;

use alloy_primitives::Address;
use once_cell::sync::Lazy;
use regex::Regex;

/// Link placeholders emitted by solc >= 0.5: `__$` + 34 hex digits of the library hash + `$__`.
static SOLC_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"__\$.{34}\$__").unwrap());

/// Link placeholders emitted by Truffle and older solc: `__` + the library name padded with
/// underscores to 38 characters.
static TRUFFLE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"__\w{38}").unwrap());

/// The hex text every placeholder is replaced with.
static DUMMY_ADDRESS: Lazy<String> = Lazy::new(|| hex::encode(Address::ZERO));

/// A placeholder found in unlinked bytecode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkReference {
    /// Position of the placeholder, in characters of the bytecode string.
    pub start: usize,
    pub placeholder: String,
}

impl LinkReference {
    /// The byte offset of the library address inside the decoded bytecode, given the
    /// bytecode string the reference was found in.
    pub fn byte_offset(&self, code: &str) -> usize {
        let prefix = if code.starts_with("0x") { 2 } else { 0 };
        self.start.saturating_sub(prefix) / 2
    }
}

/// Links every library placeholder in `code` against the zero address.
///
/// Only the placeholders are touched; the result is valid hex as long as the rest of the
/// input was. Patching is idempotent.
pub fn link_contracts_fakely(code: &str) -> String {
    let code = replace_all(&SOLC_PLACEHOLDER, code);
    replace_all(&TRUFFLE_PLACEHOLDER, &code).into_owned()
}

fn replace_all<'a>(pattern: &Regex, code: &'a str) -> Cow<'a, str> {
    pattern.replace_all(code, DUMMY_ADDRESS.as_str())
}

/// Returns true if `code` still contains an unlinked placeholder.
pub fn has_placeholders(code: &str) -> bool {
    SOLC_PLACEHOLDER.is_match(code) || TRUFFLE_PLACEHOLDER.is_match(code)
}

/// Lists every placeholder in `code`, in order of appearance.
pub fn link_references(code: &str) -> Vec<LinkReference> {
    let mut refs: Vec<_> = SOLC_PLACEHOLDER
        .find_iter(code)
        .map(|m| LinkReference { start: m.start(), placeholder: m.as_str().to_string() })
        .collect();

    // A solc placeholder never matches the Truffle shape (`$` is not a word character), so
    // the two sets are disjoint.
    refs.extend(
        TRUFFLE_PLACEHOLDER
            .find_iter(code)
            .map(|m| LinkReference { start: m.start(), placeholder: m.as_str().to_string() }),
    );
    refs.sort_by_key(|r| r.start);
    refs
}
