//! Goto elimination. Bodies containing `goto` are rewritten into a state-
//! machine dispatch loop: segments per label inside a `switch` keyed on a
//! synthetic state variable, wrapped in a labeled endless loop. Bodies the
//! strategies cannot normalize are left untranslated with a warning.

mod dispatch;
mod strategies;

use indexmap::IndexSet;

use crate::ast::*;
use crate::diagnostics::{Diagnostics, TranslateError};
use crate::pipeline::Pass;
use crate::visit::{self, for_each_seq_mut, VisitorMut};

use dispatch::build_dispatch;
use strategies::{Strategy, STRATEGIES};

const PASS: &str = "goto-elimination";

pub(crate) const STATE_VAR: &str = "_goto";
pub(crate) const DISPATCH_LABEL: &str = "_GOTO_LOOP";

// --- body inspection helpers ---

struct GotoCollector {
    targets: IndexSet<String>,
    count: usize,
}

impl VisitorMut for GotoCollector {
    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        if let Stmt::Goto(label) = stmt {
            self.targets.insert(label.clone());
            self.count += 1;
        }
        visit::walk_stmt(self, stmt);
    }
}

/// Labels referenced by at least one goto, in first-reference order.
pub(crate) fn goto_targets(block: &mut Block) -> IndexSet<String> {
    let mut c = GotoCollector {
        targets: IndexSet::new(),
        count: 0,
    };
    c.visit_block(block);
    c.targets
}

pub(crate) fn count_gotos(block: &mut Block) -> usize {
    let mut c = GotoCollector {
        targets: IndexSet::new(),
        count: 0,
    };
    c.visit_block(block);
    c.count
}

pub(crate) fn count_gotos_to(block: &mut Block, label: &str) -> usize {
    struct Counter<'a> {
        label: &'a str,
        n: usize,
    }
    impl VisitorMut for Counter<'_> {
        fn visit_stmt(&mut self, stmt: &mut Stmt) {
            if matches!(stmt, Stmt::Goto(l) if l == self.label) {
                self.n += 1;
            }
            visit::walk_stmt(self, stmt);
        }
    }
    let mut counter = Counter { label, n: 0 };
    counter.visit_block(block);
    counter.n
}

/// The statement-sequence index (in traversal order) holding every
/// goto-bearing label, or `None` when they are spread across sequences:
/// the "bad labels" configuration the strategies work to repair.
pub(crate) fn label_home_seq(block: &mut Block, labels: &IndexSet<String>) -> Option<usize> {
    let mut seq_idx = 0usize;
    let mut home: Option<usize> = None;
    let mut found = 0usize;
    let mut split = false;
    for_each_seq_mut(block, &mut |stmts| {
        let here = stmts
            .iter()
            .filter(|s| matches!(s, Stmt::Label(l) if labels.contains(l)))
            .count();
        if here > 0 {
            match home {
                None => home = Some(seq_idx),
                Some(h) if h != seq_idx => split = true,
                _ => {}
            }
            found += here;
        }
        seq_idx += 1;
    });
    if split || found != labels.len() {
        return None;
    }
    home
}

// --- direct loop recovery ---

/// A bare break or continue that would be captured by a loop wrapped
/// around `stmt`.
fn has_unbound_jump(stmt: &Stmt, in_switch: bool) -> bool {
    match stmt {
        Stmt::Break { target: None } => !in_switch,
        Stmt::Continue { target: None } => true,
        // These claim the bare forms themselves.
        Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::For { .. } => false,
        Stmt::Switch { sections, .. } => sections
            .iter()
            .any(|sec| sec.stmts.iter().any(|s| has_unbound_jump(s, true))),
        Stmt::Block(b) => b.stmts.iter().any(|s| has_unbound_jump(s, in_switch)),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            has_unbound_jump(then_branch, in_switch)
                || else_branch
                    .as_deref()
                    .is_some_and(|e| has_unbound_jump(e, in_switch))
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            body.stmts.iter().any(|s| has_unbound_jump(s, in_switch))
                || catches
                    .iter()
                    .any(|c| c.body.stmts.iter().any(|s| has_unbound_jump(s, in_switch)))
                || finally
                    .as_ref()
                    .is_some_and(|f| f.stmts.iter().any(|s| has_unbound_jump(s, in_switch)))
        }
        _ => false,
    }
}

/// `label L; if (cond) { ...; goto L; }` with a single goto is a while loop
/// in disguise; recovering it directly beats the dispatch form.
fn rewrite_guarded_backjump(block: &mut Block) -> bool {
    if count_gotos(block) != 1 {
        return false;
    }
    let mut done = false;
    for_each_seq_mut(block, &mut |stmts| {
        if done {
            return;
        }
        for i in 0..stmts.len().saturating_sub(1) {
            let Stmt::Label(label) = &stmts[i] else {
                continue;
            };
            let Stmt::If {
                then_branch,
                else_branch: None,
                ..
            } = &stmts[i + 1]
            else {
                continue;
            };
            let Stmt::Block(guarded) = &**then_branch else {
                continue;
            };
            let jumps_back = matches!(guarded.stmts.last(), Some(Stmt::Goto(l)) if l == label);
            if !jumps_back {
                continue;
            }
            let run = &guarded.stmts[..guarded.stmts.len() - 1];
            if run.iter().any(|s| has_unbound_jump(s, false))
                || run.iter().any(|s| matches!(s, Stmt::Label(_)))
            {
                continue;
            }
            let Stmt::If { cond, then_branch, .. } = stmts.remove(i + 1) else {
                unreachable!("matched above");
            };
            let Stmt::Block(mut guarded) = *then_branch else {
                unreachable!("matched above");
            };
            guarded.stmts.pop();
            stmts[i] = Stmt::While {
                cond,
                body: Box::new(Stmt::Block(guarded)),
            };
            done = true;
            return;
        }
    });
    done
}

// --- cleanup rewrites ---

/// `goto L` directly followed by `label L` does nothing.
fn remove_redundant_gotos(block: &mut Block) {
    for_each_seq_mut(block, &mut |stmts| {
        let mut i = 0;
        while i + 1 < stmts.len() {
            let redundant = matches!(
                (&stmts[i], &stmts[i + 1]),
                (Stmt::Goto(g), Stmt::Label(l)) if g == l
            );
            if redundant {
                stmts.remove(i);
            } else {
                i += 1;
            }
        }
    });
}

/// Control cannot run past this statement.
pub(crate) fn is_terminal(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_)
        | Stmt::Throw(_)
        | Stmt::Goto(_)
        | Stmt::Break { .. }
        | Stmt::Continue { .. } => true,
        Stmt::Block(b) => b.stmts.last().is_some_and(is_terminal),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            is_terminal(then_branch) && else_branch.as_deref().is_some_and(is_terminal)
        }
        _ => false,
    }
}

/// Statements between a terminal branch and the next label can never run.
fn remove_unreachable(block: &mut Block) {
    for_each_seq_mut(block, &mut |stmts| {
        let mut i = 0;
        while i < stmts.len() {
            if is_terminal(&stmts[i]) {
                let mut j = i + 1;
                while j < stmts.len() && !matches!(stmts[j], Stmt::Label(_)) {
                    j += 1;
                }
                stmts.drain(i + 1..j);
            }
            i += 1;
        }
    });
}

/// Drops label statements nothing jumps to. Loop labels referenced by a
/// targeted break or continue are kept.
fn remove_dead_labels(block: &mut Block) {
    struct RefCollector {
        refs: IndexSet<String>,
    }
    impl VisitorMut for RefCollector {
        fn visit_stmt(&mut self, stmt: &mut Stmt) {
            match stmt {
                Stmt::Goto(l) => {
                    self.refs.insert(l.clone());
                }
                Stmt::Break { target: Some(l) } | Stmt::Continue { target: Some(l) } => {
                    self.refs.insert(l.clone());
                }
                _ => {}
            }
            visit::walk_stmt(self, stmt);
        }
    }
    let mut c = RefCollector {
        refs: IndexSet::new(),
    };
    c.visit_block(block);
    for_each_seq_mut(block, &mut |stmts| {
        stmts.retain(|s| !matches!(s, Stmt::Label(l) if !c.refs.contains(l)));
    });
}

/// A label opening a try block moves to just before the try; the dispatch
/// loop cannot jump into a protected region.
fn move_labels_out_of_try(block: &mut Block) {
    for_each_seq_mut(block, &mut |stmts| {
        let mut i = 0;
        while i < stmts.len() {
            let label = match &mut stmts[i] {
                Stmt::Try { body, .. } if matches!(body.stmts.first(), Some(Stmt::Label(_))) => {
                    match body.stmts.remove(0) {
                        Stmt::Label(l) => Some(l),
                        _ => None,
                    }
                }
                _ => None,
            };
            if let Some(l) = label {
                stmts.insert(i, Stmt::Label(l));
                i += 1;
            }
            i += 1;
        }
    });
}

// --- the pass ---

fn eliminate_in_body(
    context: &str,
    body: &mut Block,
    diags: &mut Diagnostics,
) {
    if count_gotos(body) == 0 {
        return;
    }
    move_labels_out_of_try(body);
    if rewrite_guarded_backjump(body) {
        return;
    }

    for strategy in STRATEGIES {
        if let Some(result) = attempt(body, strategy) {
            *body = result;
            return;
        }
    }
    diags.warn(
        PASS,
        context,
        "goto structure too irregular to rewrite; body left untranslated",
    );
}

/// One escalation attempt on a clone of the body. Returns the rewritten
/// clone on success.
fn attempt(body: &Block, strategy: Strategy) -> Option<Block> {
    let mut work = body.clone();
    strategies::label_loops(&mut work);
    strategies::switch_section_blocks_to_statements(&mut work);
    strategies::apply(&mut work, strategy);

    remove_redundant_gotos(&mut work);
    remove_dead_labels(&mut work);

    if count_gotos(&mut work) == 0 {
        remove_unreachable(&mut work);
        remove_dead_labels(&mut work);
        return Some(work);
    }

    let labels = goto_targets(&mut work);
    // The dispatch loop must enclose every rewritten goto, so the labels
    // have to sit in the body's own top sequence.
    if label_home_seq(&mut work, &labels)? != 0 {
        return None;
    }
    build_dispatch(&mut work, &labels);

    remove_unreachable(&mut work);
    remove_dead_labels(&mut work);
    (count_gotos(&mut work) == 0).then_some(work)
}

/// Rewrites goto/label control flow in every method and constructor body.
pub struct GotoElimination;

impl Pass for GotoElimination {
    fn name(&self) -> &'static str {
        PASS
    }

    fn run(&mut self, module: &mut Module, diags: &mut Diagnostics) -> Result<(), TranslateError> {
        for ty in module.types_mut() {
            let ty_name = ty.name.clone();
            for member in &mut ty.members {
                match member {
                    Member::Method(m) => {
                        if let Some(body) = &mut m.body {
                            let context = format!("{}.{}", ty_name, m.name);
                            eliminate_in_body(&context, body, diags);
                        }
                    }
                    Member::Ctor(c) => {
                        let context = format!("{}.{}", ty_name, c.name);
                        eliminate_in_body(&context, &mut c.body, diags);
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/t_gotos.rs"]
mod tests;
