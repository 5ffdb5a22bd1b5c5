//! The escalating normalization strategies. Each attempt composes some of:
//! lifting labels out of switch sections, inlining safe label targets at
//! their goto sites, and making implicit fall-through between labels
//! explicit. Later strategies subsume earlier ones and cost more tree
//! growth, so the cheapest workable one wins.

use crate::ast::*;
use crate::visit::{self, for_each_seq_mut, VisitorMut};

use super::{count_gotos_to, goto_targets, is_terminal};

#[derive(Debug, Clone, Copy)]
pub(super) struct Strategy {
    pub lift: bool,
    pub small_inline: bool,
    pub big_inline: bool,
    pub add_implicit: bool,
}

pub(super) const STRATEGIES: [Strategy; 5] = [
    Strategy {
        lift: false,
        small_inline: false,
        big_inline: false,
        add_implicit: false,
    },
    Strategy {
        lift: true,
        small_inline: false,
        big_inline: false,
        add_implicit: false,
    },
    Strategy {
        lift: true,
        small_inline: true,
        big_inline: false,
        add_implicit: false,
    },
    Strategy {
        lift: true,
        small_inline: true,
        big_inline: true,
        add_implicit: false,
    },
    Strategy {
        lift: true,
        small_inline: false,
        big_inline: true,
        add_implicit: true,
    },
];

pub(super) fn apply(block: &mut Block, strategy: Strategy) {
    if strategy.lift {
        lift_switch_labels(block);
    }
    if strategy.add_implicit {
        add_implicit_gotos(block);
    }
    if strategy.small_inline {
        inline_targets(block, 1);
    }
    if strategy.big_inline {
        inline_targets(block, usize::MAX);
    }
}

/// No nested labels or switches anywhere: the statement can be duplicated
/// or relocated without changing what a jump into it could reach.
fn is_safe(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Label(_) | Stmt::Switch { .. } => false,
        Stmt::Block(b) => b.stmts.iter().all(is_safe),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => is_safe(then_branch) && else_branch.as_deref().is_none_or(is_safe),
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => is_safe(body),
        Stmt::For { init, body, .. } => init.iter().all(is_safe) && is_safe(body),
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            body.stmts.iter().all(is_safe)
                && catches.iter().all(|c| c.body.stmts.iter().all(is_safe))
                && finally
                    .as_ref()
                    .is_none_or(|f| f.stmts.iter().all(is_safe))
        }
        _ => true,
    }
}

// --- loop labeling ---

/// Gives every loop with a bare break or continue an explicit label and
/// retargets those statements, so that wrapping code in the dispatch loop
/// cannot capture them.
pub(super) fn label_loops(block: &mut Block) {
    let mut next = 0usize;
    for stmt in &mut block.stmts {
        label_loops_in_stmt(stmt, &mut next);
    }
}

fn label_loops_in_stmt(stmt: &mut Stmt, next: &mut usize) {
    // Inner loops first, so a bare break inside them is claimed before the
    // outer loop looks.
    match stmt {
        Stmt::Block(b) => {
            for s in &mut b.stmts {
                label_loops_in_stmt(s, next);
            }
        }
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            label_loops_in_stmt(then_branch, next);
            if let Some(e) = else_branch {
                label_loops_in_stmt(e, next);
            }
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::For { body, .. } => {
            label_loops_in_stmt(body, next);
        }
        Stmt::Switch { sections, .. } => {
            for sec in sections {
                for s in &mut sec.stmts {
                    label_loops_in_stmt(s, next);
                }
            }
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            for s in &mut body.stmts {
                label_loops_in_stmt(s, next);
            }
            for c in catches {
                for s in &mut c.body.stmts {
                    label_loops_in_stmt(s, next);
                }
            }
            if let Some(f) = finally {
                for s in &mut f.stmts {
                    label_loops_in_stmt(s, next);
                }
            }
        }
        _ => {}
    }

    let body = match stmt {
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::For { body, .. } => body,
        _ => return,
    };
    let mut label: Option<String> = None;
    qualify_jumps(body, &mut label, next, false);
    if let Some(l) = label {
        let taken = std::mem::replace(stmt, Stmt::Block(Block::default()));
        *stmt = Stmt::Block(Block::new(vec![Stmt::label(l), taken]));
    }
}

/// Retargets bare breaks/continues binding the loop being labeled. Nested
/// loops rebind both; a nested switch rebinds breaks only.
fn qualify_jumps(stmt: &mut Stmt, label: &mut Option<String>, next: &mut usize, in_switch: bool) {
    let mut get = |label: &mut Option<String>, next: &mut usize| -> String {
        label
            .get_or_insert_with(|| {
                *next += 1;
                format!("_loop{}", next)
            })
            .clone()
    };
    match stmt {
        Stmt::Break { target: target @ None } if !in_switch => {
            *target = Some(get(label, next));
        }
        Stmt::Continue { target: target @ None } => {
            *target = Some(get(label, next));
        }
        Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::For { .. } => {}
        Stmt::Switch { sections, .. } => {
            for sec in sections {
                for s in &mut sec.stmts {
                    qualify_jumps(s, label, next, true);
                }
            }
        }
        Stmt::Block(b) => {
            for s in &mut b.stmts {
                qualify_jumps(s, label, next, in_switch);
            }
        }
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            qualify_jumps(then_branch, label, next, in_switch);
            if let Some(e) = else_branch {
                qualify_jumps(e, label, next, in_switch);
            }
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            for s in &mut body.stmts {
                qualify_jumps(s, label, next, in_switch);
            }
            for c in catches {
                for s in &mut c.body.stmts {
                    qualify_jumps(s, label, next, in_switch);
                }
            }
            if let Some(f) = finally {
                for s in &mut f.stmts {
                    qualify_jumps(s, label, next, in_switch);
                }
            }
        }
        _ => {}
    }
}

// --- switch normalization ---

/// A section holding one block statement is the same section with the
/// block's statements; flattening it puts its labels at section level where
/// the lift can see them.
pub(super) fn switch_section_blocks_to_statements(block: &mut Block) {
    struct Flattener;
    impl VisitorMut for Flattener {
        fn visit_stmt(&mut self, stmt: &mut Stmt) {
            visit::walk_stmt(self, stmt);
            if let Stmt::Switch { sections, .. } = stmt {
                for sec in sections {
                    if sec.stmts.len() == 1 {
                        if let Some(Stmt::Block(_)) = sec.stmts.first() {
                            let Some(Stmt::Block(b)) = sec.stmts.pop() else {
                                unreachable!();
                            };
                            sec.stmts = b.stmts;
                        }
                    }
                }
            }
        }
    }
    Flattener.visit_block(block);
}

/// Dismantles each switch whose sections carry goto targets: the switch
/// shrinks to per-section entry gotos, section bodies move after it as
/// labeled runs, and the section-ending breaks jump to a synthetic end
/// label. A goto into a switch body is then a plain same-level goto.
fn lift_switch_labels(block: &mut Block) {
    let targets = goto_targets(block);
    let mut next_id = 0usize;
    for_each_seq_mut(block, &mut |stmts| {
        let mut i = 0;
        while i < stmts.len() {
            let needs = matches!(
                &stmts[i],
                Stmt::Switch { sections, .. } if sections.iter().any(|sec| {
                    sec.stmts
                        .iter()
                        .any(|s| matches!(s, Stmt::Label(l) if targets.contains(l)))
                })
            );
            if !needs {
                i += 1;
                continue;
            }
            let Stmt::Switch {
                scrutinee,
                sections,
            } = stmts.remove(i)
            else {
                unreachable!("checked above");
            };
            next_id += 1;
            let end_label = format!("_SwitchEnd{}", next_id);
            let has_default = sections
                .iter()
                .any(|sec| sec.labels.iter().any(|l| matches!(l, CaseLabel::Default)));
            let mut new_sections = Vec::with_capacity(sections.len());
            let mut lifted: Vec<Stmt> = Vec::new();
            for (k, mut sec) in sections.into_iter().enumerate() {
                let entry = format!("_Case{}_{}", next_id, k);
                for s in &mut sec.stmts {
                    redirect_switch_breaks(s, &end_label);
                }
                new_sections.push(SwitchSection {
                    labels: sec.labels,
                    stmts: vec![Stmt::goto(entry.clone())],
                });
                lifted.push(Stmt::label(entry));
                lifted.append(&mut sec.stmts);
            }
            let mut replacement = vec![Stmt::Switch {
                scrutinee,
                sections: new_sections,
            }];
            if !has_default {
                replacement.push(Stmt::goto(end_label.clone()));
            }
            replacement.append(&mut lifted);
            replacement.push(Stmt::label(end_label));
            let n = replacement.len();
            stmts.splice(i..i, replacement);
            i += n;
        }
    });
}

/// Bare breaks binding the dismantled switch become gotos to its end label.
fn redirect_switch_breaks(stmt: &mut Stmt, end_label: &str) {
    match stmt {
        Stmt::Break { target: None } => *stmt = Stmt::goto(end_label),
        // These rebind bare breaks.
        Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::For { .. } | Stmt::Switch { .. } => {}
        Stmt::Block(b) => {
            for s in &mut b.stmts {
                redirect_switch_breaks(s, end_label);
            }
        }
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            redirect_switch_breaks(then_branch, end_label);
            if let Some(e) = else_branch {
                redirect_switch_breaks(e, end_label);
            }
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            for s in &mut body.stmts {
                redirect_switch_breaks(s, end_label);
            }
            for c in catches {
                for s in &mut c.body.stmts {
                    redirect_switch_breaks(s, end_label);
                }
            }
            if let Some(f) = finally {
                for s in &mut f.stmts {
                    redirect_switch_breaks(s, end_label);
                }
            }
        }
        _ => {}
    }
}

// --- fall-through and inlining ---

/// A safe label run that reaches the next label without branching gets an
/// explicit trailing goto, which both records the fall-through and makes
/// the run inlinable.
fn add_implicit_gotos(block: &mut Block) {
    for_each_seq_mut(block, &mut |stmts| {
        let mut inserts: Vec<(usize, String)> = Vec::new();
        let mut i = 0;
        while i < stmts.len() {
            if !matches!(stmts[i], Stmt::Label(_)) {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            while j < stmts.len() && !matches!(stmts[j], Stmt::Label(_)) {
                j += 1;
            }
            if j < stmts.len() {
                let Stmt::Label(next_label) = &stmts[j] else {
                    unreachable!();
                };
                let run = &stmts[i + 1..j];
                let branches = run.last().is_some_and(is_terminal);
                if !branches && run.iter().all(is_safe) {
                    inserts.push((j, next_label.clone()));
                }
            }
            i = j;
        }
        for (pos, label) in inserts.into_iter().rev() {
            stmts.insert(pos, Stmt::goto(label));
        }
    });
}

/// Replaces gotos with a copy of their target's statement run when the run
/// is safe, branch-terminated, and at most `max_size` statements. Smallest
/// reference count first, so cheap targets disappear before the expensive
/// ones are considered.
fn inline_targets(block: &mut Block, max_size: usize) {
    let targets = goto_targets(block);
    let mut candidates: Vec<(String, Vec<Stmt>, usize)> = Vec::new();
    for_each_seq_mut(block, &mut |stmts| {
        let mut i = 0;
        while i < stmts.len() {
            let Stmt::Label(label) = &stmts[i] else {
                i += 1;
                continue;
            };
            let label = label.clone();
            let mut j = i + 1;
            while j < stmts.len() && !matches!(stmts[j], Stmt::Label(_)) {
                j += 1;
            }
            if targets.contains(&label) {
                let run = &stmts[i + 1..j];
                let eligible = !run.is_empty()
                    && run.len() <= max_size
                    && run.iter().all(is_safe)
                    && run.last().is_some_and(is_terminal)
                    // A run jumping to its own label would inline forever.
                    && !run_jumps_to(run, &label);
                if eligible {
                    candidates.push((label, run.to_vec(), 0));
                }
            }
            i = j;
        }
    });
    for c in &mut candidates {
        c.2 = count_gotos_to(block, &c.0);
    }
    candidates.sort_by_key(|c| c.2);
    for (label, run, _) in candidates {
        replace_gotos(block, &label, &run);
    }
}

fn run_jumps_to(run: &[Stmt], label: &str) -> bool {
    struct Finder<'a> {
        label: &'a str,
        found: bool,
    }
    impl VisitorMut for Finder<'_> {
        fn visit_stmt(&mut self, stmt: &mut Stmt) {
            if matches!(stmt, Stmt::Goto(l) if l == self.label) {
                self.found = true;
            }
            visit::walk_stmt(self, stmt);
        }
    }
    let mut probe = run.to_vec();
    let mut finder = Finder {
        label,
        found: false,
    };
    for s in &mut probe {
        finder.visit_stmt(s);
    }
    finder.found
}

fn replace_gotos(block: &mut Block, label: &str, run: &[Stmt]) {
    struct Replacer<'a> {
        label: &'a str,
        run: &'a [Stmt],
    }
    impl VisitorMut for Replacer<'_> {
        fn visit_stmt(&mut self, stmt: &mut Stmt) {
            if matches!(stmt, Stmt::Goto(l) if l == self.label) {
                *stmt = Stmt::Block(Block::new(self.run.to_vec()));
                return;
            }
            visit::walk_stmt(self, stmt);
        }
    }
    Replacer { label, run }.visit_block(block);
}
