//! Positional parameter numbering.

/// Hands out `$1, $2, ...` placeholders in order.
///
/// One counter is threaded through every fragment of a statement so that
/// separately built pieces never reuse a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholders {
    next: usize,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self::new()
    }
}

impl Placeholders {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Counter whose first placeholder is `$start`.
    pub fn starting_at(start: usize) -> Self {
        Self { next: start.max(1) }
    }

    /// Returns the next placeholder and advances.
    pub fn next_placeholder(&mut self) -> String {
        let placeholder = format!("${}", self.next);
        self.next += 1;
        placeholder
    }

    /// Like [`Placeholders::next_placeholder`], followed by `::cast` when a
    /// cast type is given.
    pub fn next_typed(&mut self, cast: Option<&str>) -> String {
        let placeholder = self.next_placeholder();
        match cast {
            Some(type_name) => format!("{}::{}", placeholder, type_name),
            None => placeholder,
        }
    }

    /// Number the next placeholder will get.
    pub fn peek(&self) -> usize {
        self.next
    }

    /// Reserves `count` numbers without rendering them.
    pub fn advance(&mut self, count: usize) {
        self.next += count;
    }
}

/// Shifts the `$n` placeholders of a fragment written against its own
/// numbering (`$1..$k`) so that `$1` becomes `$offset + 1`.
///
/// Placeholders inside single-quoted literals are left alone.
pub fn renumber_placeholders(fragment: &str, offset: usize) -> String {
    if offset == 0 {
        return fragment.to_string();
    }

    let mut out = String::with_capacity(fragment.len() + 4);
    let mut chars = fragment.chars().peekable();
    let mut in_literal = false;

    while let Some(c) = chars.next() {
        if c == '\'' {
            in_literal = !in_literal;
            out.push(c);
            continue;
        }
        if c != '$' || in_literal {
            out.push(c);
            continue;
        }

        let mut digits = String::new();
        while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
            digits.push(*d);
            chars.next();
        }
        match digits.parse::<usize>() {
            Ok(n) => {
                out.push('$');
                out.push_str(&(n + offset).to_string());
            }
            Err(_) => {
                out.push('$');
                out.push_str(&digits);
            }
        }
    }

    out
}
