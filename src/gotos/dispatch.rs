//! Canonical dispatch form. Once every goto-bearing label sits in the
//! body's top statement sequence, the sequence splits into segments, one
//! per label plus an implicit leading one, and becomes a `switch` on a
//! state variable inside a labeled endless loop. Each former goto assigns
//! the target segment's number and restarts the loop.

use indexmap::{IndexMap, IndexSet};

use crate::ast::*;
use crate::visit::{self, VisitorMut};

use super::{is_terminal, DISPATCH_LABEL, STATE_VAR};

fn state_jump(index: i64) -> Stmt {
    Stmt::Block(Block::new(vec![
        Stmt::Expr(Expr::assign(Expr::ident(STATE_VAR), Expr::int(index))),
        Stmt::Continue {
            target: Some(DISPATCH_LABEL.to_string()),
        },
    ]))
}

struct GotoRewriter<'a> {
    index: &'a IndexMap<String, i64>,
}

impl VisitorMut for GotoRewriter<'_> {
    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        if let Stmt::Goto(label) = stmt {
            if let Some(&i) = self.index.get(label) {
                *stmt = state_jump(i);
                return;
            }
        }
        visit::walk_stmt(self, stmt);
    }
}

/// Rewrites `body`, whose top sequence holds all of `labels`, into the
/// dispatch loop. Segment numbering follows original order: the implicit
/// leading segment is the switch default, label `i` (1-based) is `case i`.
pub(super) fn build_dispatch(body: &mut Block, labels: &IndexSet<String>) {
    let ordered: Vec<String> = body
        .stmts
        .iter()
        .filter_map(|s| match s {
            Stmt::Label(l) if labels.contains(l) => Some(l.clone()),
            _ => None,
        })
        .collect();
    let index: IndexMap<String, i64> = ordered
        .iter()
        .enumerate()
        .map(|(i, l)| (l.clone(), (i + 1) as i64))
        .collect();

    GotoRewriter { index: &index }.visit_block(body);

    let mut sections: Vec<SwitchSection> = Vec::new();
    let mut current: Vec<Stmt> = Vec::new();
    let mut current_case: i64 = 0;
    let close = |sections: &mut Vec<SwitchSection>, case: i64, mut stmts: Vec<Stmt>, next: Option<i64>| {
        // A segment that does not branch continues explicitly: into the
        // next segment, or out of the dispatch loop after the last one.
        if !stmts.last().is_some_and(is_terminal) {
            match next {
                Some(n) => stmts.push(state_jump(n)),
                None => stmts.push(Stmt::Break {
                    target: Some(DISPATCH_LABEL.to_string()),
                }),
            }
        }
        let label = if case == 0 {
            CaseLabel::Default
        } else {
            CaseLabel::Case(Expr::int(case))
        };
        sections.push(SwitchSection {
            labels: vec![label],
            stmts,
        });
    };

    for stmt in std::mem::take(&mut body.stmts) {
        if let Stmt::Label(l) = &stmt {
            if let Some(&i) = index.get(l) {
                close(&mut sections, current_case, std::mem::take(&mut current), Some(i));
                current_case = i;
                continue;
            }
        }
        current.push(stmt);
    }
    close(&mut sections, current_case, current, None);

    body.stmts = vec![
        Stmt::var_decl(
            STATE_VAR,
            Some(Ty::prim(PrimTy::Number)),
            Some(Expr::int(0)),
        ),
        Stmt::label(DISPATCH_LABEL),
        Stmt::While {
            cond: Expr::bool(true),
            body: Box::new(Stmt::Switch {
                scrutinee: Expr::ident(STATE_VAR),
                sections,
            }),
        },
    ];
}
