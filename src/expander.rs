//! Pure string transformer: substitutes `${NAME}` (canonical) and `{$NAME}`
//! (legacy) variable references in a single left-to-right pass.

use std::collections::HashMap;

/// Looks up a variable name against special variables first, then the
/// in-progress environment map, returning `None` if unresolved.
pub struct Lookup<'a> {
    special: Option<&'a HashMap<String, String>>,
    env: &'a HashMap<String, String>,
}

impl<'a> Lookup<'a> {
    pub fn new(env: &'a HashMap<String, String>) -> Self {
        Self { special: None, env }
    }

    pub fn with_special(env: &'a HashMap<String, String>, special: &'a HashMap<String, String>) -> Self {
        Self { special: Some(special), env }
    }

    fn resolve(&self, name: &str) -> Option<&str> {
        if let Some(special) = self.special
            && let Some(value) = special.get(name)
        {
            return Some(value.as_str());
        }
        self.env.get(name).map(String::as_str)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Scan `chars[pos..]` for an identifier matching `[A-Za-z_][A-Za-z0-9_]*` and
/// return it along with the index just past it, if one starts at `pos`.
fn scan_name(chars: &[char], pos: usize) -> Option<(String, usize)> {
    if pos >= chars.len() || !is_name_start(chars[pos]) {
        return None;
    }
    let mut end = pos + 1;
    while end < chars.len() && is_name_char(chars[end]) {
        end += 1;
    }
    Some((chars[pos..end].iter().collect(), end))
}

/// Substitute `${NAME}`/`{$NAME}` references in `template` using `lookup`.
/// Unresolved references expand to the empty string. The result is produced
/// in a single pass — expanded text is never re-scanned for further references.
pub fn expand(template: &str, lookup: &Lookup) -> String {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;

    while i < chars.len() {
        // Canonical form: ${NAME}
        if chars[i] == '$' && chars.get(i + 1) == Some(&'{')
            && let Some((name, name_end)) = scan_name(&chars, i + 2)
            && chars.get(name_end) == Some(&'}')
        {
            if let Some(value) = lookup.resolve(&name) {
                out.push_str(value);
            }
            i = name_end + 1;
            continue;
        }

        // Legacy form: {$NAME}
        if chars[i] == '{' && chars.get(i + 1) == Some(&'$')
            && let Some((name, name_end)) = scan_name(&chars, i + 2)
            && chars.get(name_end) == Some(&'}')
        {
            if let Some(value) = lookup.resolve(&name) {
                out.push_str(value);
            }
            i = name_end + 1;
            continue;
        }

        out.push(chars[i]);
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn expands_canonical_form() {
        let e = env(&[("NAME", "world")]);
        let lookup = Lookup::new(&e);
        assert_eq!(expand("hello ${NAME}", &lookup), "hello world");
    }

    #[test]
    fn expands_legacy_form() {
        let e = env(&[("NAME", "world")]);
        let lookup = Lookup::new(&e);
        assert_eq!(expand("hello {$NAME}", &lookup), "hello world");
    }

    #[test]
    fn both_forms_in_one_pass() {
        let e = env(&[("A", "1"), ("B", "2")]);
        let lookup = Lookup::new(&e);
        assert_eq!(expand("${A}-{$B}", &lookup), "1-2");
    }

    #[test]
    fn unresolved_reference_becomes_empty() {
        let e = env(&[]);
        let lookup = Lookup::new(&e);
        assert_eq!(expand("x${MISSING}y", &lookup), "xy");
    }

    #[test]
    fn special_vars_take_priority_over_env() {
        let e = env(&[("__FILE__", "from-env")]);
        let special = env(&[("__FILE__", "from-special")]);
        let lookup = Lookup::with_special(&e, &special);
        assert_eq!(expand("${__FILE__}", &lookup), "from-special");
    }

    #[test]
    fn non_matching_braces_pass_through_literally() {
        let e = env(&[]);
        let lookup = Lookup::new(&e);
        assert_eq!(expand("${1NOTANAME}", &lookup), "${1NOTANAME}");
        assert_eq!(expand("{not a var}", &lookup), "{not a var}");
    }

    #[test]
    fn expansion_is_idempotent_when_output_has_no_new_references() {
        let e = env(&[("NAME", "world")]);
        let lookup = Lookup::new(&e);
        let once = expand("hello ${NAME}", &lookup);
        let twice = expand(&once, &lookup);
        assert_eq!(once, twice);
    }

    #[test]
    fn single_pass_does_not_rescan_substituted_text() {
        // A's value itself contains `${B}` syntax; a second scan would expand
        // it to "literal", but a single pass must leave it untouched.
        let e = env(&[("A", "${B}"), ("B", "literal")]);
        let lookup = Lookup::new(&e);
        assert_eq!(expand("${A}", &lookup), "${B}");
    }
}
