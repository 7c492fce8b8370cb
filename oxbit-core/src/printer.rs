//! SMT-LIB2 printing of terms, models and whole formulas
//!
//! Shared ground subterms are emitted once through `let` bindings so the
//! printed size stays linear in the DAG size.

use crate::ast::{TermId, TermKind, TermManager};
use crate::value::Value;
use rustc_hash::FxHashMap;
use std::fmt::{self, Write};

/// Emits textual representations of terms, models and formulas
pub trait Printer {
    /// Write a single term
    fn write_term(&self, tm: &TermManager, term: TermId, out: &mut dyn Write) -> fmt::Result;

    /// Write a self-contained script declaring every constant of
    /// `assertions`, asserting them and checking satisfiability
    fn write_formula(&self, tm: &TermManager, assertions: &[TermId], out: &mut dyn Write) -> fmt::Result;

    /// Write a model given as `(constant, value)` pairs
    fn write_model(&self, tm: &TermManager, model: &[(TermId, TermId)], out: &mut dyn Write) -> fmt::Result;

    /// Render a term into a fresh string
    fn term_to_string(&self, tm: &TermManager, term: TermId) -> String {
        let mut s = String::new();
        // writing into a String cannot fail
        let _ = self.write_term(tm, term, &mut s);
        s
    }
}

/// SMT-LIB v2.6 printer
#[derive(Debug, Clone, Copy)]
pub struct SmtLibPrinter {
    /// Introduce `let` bindings for shared ground subterms
    pub use_lets: bool,
}

impl Default for SmtLibPrinter {
    fn default() -> Self {
        Self { use_lets: true }
    }
}

impl SmtLibPrinter {
    /// Printer with `let` sharing enabled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Printer that expands the DAG into a tree
    #[must_use]
    pub fn without_lets() -> Self {
        Self { use_lets: false }
    }

    fn render(&self, tm: &TermManager, root: TermId) -> String {
        let order = tm.post_order(&[root]);
        let mut parents: FxHashMap<TermId, u32> = FxHashMap::default();
        for &t in &order {
            for &a in &tm[t].args {
                *parents.entry(a).or_default() += 1;
            }
        }
        let mut text: FxHashMap<TermId, String> = FxHashMap::default();
        let mut lets: Vec<(String, String)> = Vec::new();
        for &t in &order {
            let s = node_text(tm, t, &text);
            let term = &tm[t];
            let shared = self.use_lets
                && t != root
                && !term.args.is_empty()
                && term.is_ground()
                && parents.get(&t).copied().unwrap_or(0) > 1;
            if shared {
                let name = format!("_let{}", lets.len());
                lets.push((name.clone(), s));
                text.insert(t, name);
            } else {
                text.insert(t, s);
            }
        }
        let mut body = text.remove(&root).unwrap_or_default();
        for (name, def) in lets.into_iter().rev() {
            body = format!("(let (({name} {def})) {body})");
        }
        body
    }
}

impl Printer for SmtLibPrinter {
    fn write_term(&self, tm: &TermManager, term: TermId, out: &mut dyn Write) -> fmt::Result {
        out.write_str(&self.render(tm, term))
    }

    fn write_formula(&self, tm: &TermManager, assertions: &[TermId], out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "(set-logic ALL)")?;
        for c in tm.collect_consts(assertions) {
            let name = const_name(tm, c);
            match tm.sort(tm.sort_of(c)).fun_sorts() {
                Some((domain, codomain)) => {
                    let domain: Vec<String> =
                        domain.iter().map(|&s| tm.sorts.display(s).to_string()).collect();
                    writeln!(
                        out,
                        "(declare-fun {name} ({}) {})",
                        domain.join(" "),
                        tm.sorts.display(codomain)
                    )?;
                }
                None => writeln!(out, "(declare-const {name} {})", tm.sorts.display(tm.sort_of(c)))?,
            }
        }
        for &a in assertions {
            writeln!(out, "(assert {})", self.render(tm, a))?;
        }
        writeln!(out, "(check-sat)")?;
        writeln!(out, "(exit)")
    }

    fn write_model(&self, tm: &TermManager, model: &[(TermId, TermId)], out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "(")?;
        for &(c, v) in model {
            let name = const_name(tm, c);
            let mut params = Vec::new();
            let mut body = v;
            while tm[body].kind == TermKind::Lambda {
                let var = tm[body].args[0];
                params.push(format!("({} {})", var_name(tm, var), tm.sorts.display(tm.sort_of(var))));
                body = tm[body].args[1];
            }
            writeln!(
                out,
                "  (define-fun {name} ({}) {} {})",
                params.join(" "),
                tm.sorts.display(tm.sort_of(body)),
                self.render(tm, body)
            )?;
        }
        writeln!(out, ")")
    }
}

fn node_text(tm: &TermManager, t: TermId, text: &FxHashMap<TermId, String>) -> String {
    let term = &tm[t];
    let arg = |i: usize| text.get(&term.args[i]).cloned().unwrap_or_default();
    let joined = |from: usize| {
        term.args[from..]
            .iter()
            .map(|a| text.get(a).map_or("", String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    };
    match term.kind {
        TermKind::Const => const_name(tm, t),
        TermKind::Var => var_name(tm, t),
        TermKind::Value => term.value.as_ref().map(value_text).unwrap_or_default(),
        TermKind::ConstArray => format!("((as const {}) {})", tm.sorts.display(term.sort), arg(0)),
        TermKind::Apply => format!("({} {})", arg(0), joined(1)),
        TermKind::Lambda | TermKind::Forall | TermKind::Exists => {
            let var = term.args[0];
            format!(
                "({} (({} {})) {})",
                term.kind.smt2_name(),
                arg(0),
                tm.sorts.display(tm.sort_of(var)),
                arg(1)
            )
        }
        kind if term.indices.is_empty() => format!("({} {})", kind.smt2_name(), joined(0)),
        kind => {
            let idx: Vec<String> = term.indices.iter().map(u32::to_string).collect();
            format!("((_ {} {}) {})", kind.smt2_name(), idx.join(" "), joined(0))
        }
    }
}

/// SMT-LIB2 literal syntax of a value
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::BitVec(bv) => bv.to_string(),
        Value::Fp(fp) => fp.to_string(),
        Value::Rm(rm) => rm.to_string(),
    }
}

fn const_name(tm: &TermManager, t: TermId) -> String {
    match tm.symbol(t) {
        Some(s) => quote_symbol(s),
        None => format!("_c{}", t.raw()),
    }
}

fn var_name(tm: &TermManager, t: TermId) -> String {
    match tm.symbol(t) {
        Some(s) => quote_symbol(s),
        None => format!("_v{}", t.raw()),
    }
}

/// Quote a symbol with `|...|` unless it is a simple SMT-LIB2 symbol
#[must_use]
pub fn quote_symbol(s: &str) -> String {
    const EXTRA: &str = "~!@$%^&*_-+=<>.?/";
    let simple = !s.is_empty()
        && !s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || EXTRA.contains(c));
    if simple { s.to_string() } else { format!("|{s}|") }
}
