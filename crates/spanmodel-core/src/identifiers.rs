//! Backtick quoting of Spanner identifiers.
//!
//! Identifiers are quoted per dot-separated segment: `singers.id` becomes
//! `` `singers`.`id` ``. Input that already carries backticks is respected:
//! a segment that starts with a backtick is treated as self-quoted, and
//! backticks inside a segment are escaped by doubling, with consecutive pairs
//! in the input collapsing into one escaped backtick.

/// Append the quoted form of `ident` to `out`.
pub fn quote_to(out: &mut String, ident: &str) {
    let mut under_quoted = false;
    let mut self_quoted = false;
    let mut pending_backticks: i32 = 0;
    let mut shift_delimiter: i32 = 0;

    for ch in ident.chars() {
        match ch {
            '`' => {
                pending_backticks += 1;
                if pending_backticks == 2 {
                    out.push_str("``");
                    pending_backticks = 0;
                }
            }
            '.' => {
                if pending_backticks > 0 || !self_quoted {
                    shift_delimiter = 0;
                    under_quoted = false;
                    pending_backticks = 0;
                    out.push('`');
                }
                out.push('.');
                continue;
            }
            _ => {
                if shift_delimiter - pending_backticks <= 0 && !under_quoted {
                    out.push('`');
                    under_quoted = true;
                    self_quoted = pending_backticks > 0;
                    if self_quoted {
                        pending_backticks -= 1;
                    }
                }
                while pending_backticks > 0 {
                    out.push_str("``");
                    pending_backticks -= 1;
                }
                out.push(ch);
            }
        }
        shift_delimiter = shift_delimiter.saturating_add(1);
    }

    if pending_backticks > 0 && !self_quoted {
        out.push_str("``");
    }
    out.push('`');
}

/// Quote `ident` into a new string.
pub fn quote(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 2);
    quote_to(&mut out, ident);
    out
}

/// Quote each name and join with `,` (no spaces), as used in column lists.
pub fn quote_list<S: AsRef<str>>(names: &[S]) -> String {
    let mut out = String::new();
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        quote_to(&mut out, name.as_ref());
    }
    out
}
