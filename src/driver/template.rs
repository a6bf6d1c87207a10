//! `$name` substitution over command templates.
//!
//! Deliberately dumb and positional: a single left-to-right scan, no escape
//! syntax, the longest bound name wins. Values are already shell-quoted by
//! the caller. Descriptor templates are compiled-in, so an unbound
//! placeholder is a programming error and panics.

/// Expand every `$name` in `template` using `bindings`.
pub fn expand(template: &str, bindings: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let mut best: Option<(&str, &str)> = None;
        for (key, value) in bindings {
            if after.starts_with(key) && best.map_or(true, |(k, _)| key.len() > k.len()) {
                best = Some((key, value));
            }
        }

        match best {
            Some((key, value)) => {
                out.push_str(value);
                rest = &after[key.len()..];
            }
            None => {
                let name: String = after
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                panic!("unbound placeholder `${name}` in template `{template}`");
            }
        }
    }

    out.push_str(rest);
    out
}
