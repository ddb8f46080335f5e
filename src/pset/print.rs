//! Text rendering of a parameter set in one of three print modes.
use super::{Origin, ParameterSet, Value, ValueKind};

pub const INDENT: &str = "   ";

/// How source locations are shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrintMode {
    /// Values only.
    #[default]
    Raw,
    /// `key: value  # file:line`
    Annotated,
    /// `# file:line` on the line before `key: value`.
    PrefixAnnotated,
}

pub fn render(pset: &ParameterSet, level: usize, mode: PrintMode) -> String {
    let mut out = String::new();
    let mut printer = Printer { out: &mut out, mode };
    printer.table_body(pset, level);
    out
}

struct Printer<'a> {
    out: &'a mut String,
    mode: PrintMode,
}

impl Printer<'_> {
    fn pad(&mut self, level: usize) {
        for _ in 0..level {
            self.out.push_str(INDENT);
        }
    }

    fn table_body(&mut self, pset: &ParameterSet, level: usize) {
        for (key, value) in pset.iter() {
            self.assignment(key, value, level);
        }
    }

    fn assignment(&mut self, key: &str, value: &Value, level: usize) {
        let origin = value.origin.as_ref();
        if let (PrintMode::PrefixAnnotated, Some(origin)) = (self.mode, origin) {
            self.pad(level);
            self.out.push_str(&format!("# {origin}\n"));
        }
        self.pad(level);
        self.out.push_str(key);
        self.out.push_str(": ");
        self.value(value, level, origin, "");
    }

    /// Writes `value` starting mid-line; the annotation (if any) lands on the
    /// first line, after any opening bracket. `trail` goes at the end of the
    /// value's last line, ahead of any annotation there.
    fn value(&mut self, value: &Value, level: usize, annotate: Option<&Origin>, trail: &str) {
        match &value.kind {
            ValueKind::Atom(text) => {
                self.out.push_str(text);
                self.end_line(trail, annotate);
            }
            ValueKind::Sequence(xs) if xs.iter().all(|x| x.as_atom().is_some()) => {
                self.out.push('[');
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(x.as_atom().unwrap_or_default());
                }
                self.out.push(']');
                self.end_line(trail, annotate);
            }
            ValueKind::Sequence(xs) => {
                self.out.push('[');
                self.end_line("", annotate);
                for (i, x) in xs.iter().enumerate() {
                    let separator = if i + 1 < xs.len() { "," } else { "" };
                    self.pad(level + 1);
                    self.value(x, level + 1, x.origin.as_ref(), separator);
                }
                self.pad(level);
                self.out.push(']');
                self.end_line(trail, None);
            }
            ValueKind::Table(pset) if pset.is_empty() => {
                self.out.push_str("{}");
                self.end_line(trail, annotate);
            }
            ValueKind::Table(pset) => {
                self.out.push('{');
                self.end_line("", annotate);
                self.table_body(pset, level + 1);
                self.pad(level);
                self.out.push('}');
                self.end_line(trail, None);
            }
        }
    }

    fn end_line(&mut self, trail: &str, annotate: Option<&Origin>) {
        self.out.push_str(trail);
        if let (PrintMode::Annotated, Some(origin)) = (self.mode, annotate) {
            self.out.push_str(&format!("  # {origin}"));
        }
        self.out.push('\n');
    }
}
