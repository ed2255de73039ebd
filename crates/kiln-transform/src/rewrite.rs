//! Call-site rewriting
//!
//! Walks every source unit, innermost calls first, and replaces calls whose
//! qualified callee is in the [`DefinitionTable`]. Statements produced by a
//! BLOCK substitution are spliced into the enclosing statement list just
//! before the statement holding the call.

use crate::collect::DefinitionTable;
use crate::context::InlineContext;
use crate::error::{InlineError, Result};
use crate::inline::{inline_call, CallSite, InlineMode, InlineOutcome, Inlined, SkipReason};
use kiln_ast::{Expr, FunctionLit, Program, Stmt, UnaryOp};
use kiln_types::{QualifiedName, ScopeId};

/// Rewrite every call site in `program` against `table`
pub fn rewrite_program(
    program: &mut Program,
    table: &DefinitionTable,
    ctx: &mut InlineContext,
) -> Result<()> {
    for unit in &mut program.units {
        let scope = ctx
            .scopes
            .script_scope(unit.id)
            .ok_or_else(|| InlineError::UnknownUnitScope(unit.name.clone()))?;
        let mut rewriter = Rewriter {
            table,
            ctx: &mut *ctx,
            unit: &unit.name,
        };
        rewriter.stmts(&mut unit.body, scope)?;
    }
    Ok(())
}

/// Evaluation-order state within one statement
#[derive(Debug, Clone, Copy)]
struct Order {
    /// Everything evaluated so far is unconditional and neither writes nor
    /// reads state that an inlined body could modify. Reading any global,
    /// callees included, clears it: the body may assign globals.
    pure: bool,
    /// Some caller-local binding was read; a side-effecting argument moved
    /// ahead of the statement could change what that read saw
    read_local: bool,
}

impl Order {
    fn statement() -> Self {
        Self {
            pure: true,
            read_local: false,
        }
    }

    /// Code that may run zero or several times per statement execution
    fn conditional() -> Self {
        Self {
            pure: false,
            read_local: false,
        }
    }

    /// True if a block substitution for a call with `args`, evaluated in
    /// this state, can run before the whole statement
    fn can_hoist(&self, args: &[Expr]) -> bool {
        self.pure && !(self.read_local && args.iter().any(Expr::has_side_effects))
    }
}

struct Rewriter<'a> {
    table: &'a DefinitionTable,
    ctx: &'a mut InlineContext,
    unit: &'a str,
}

impl Rewriter<'_> {
    fn stmts(&mut self, stmts: &mut Vec<Stmt>, scope: ScopeId) -> Result<()> {
        let mut i = 0;
        while i < stmts.len() {
            let mut prelude = Vec::new();
            self.stmt(&mut stmts[i], scope, &mut prelude)?;

            let inserted = prelude.len();
            if discards_result(&stmts[i], &prelude) {
                stmts.remove(i);
                stmts.splice(i..i, prelude);
                i += inserted;
            } else {
                stmts.splice(i..i, prelude);
                i += inserted + 1;
            }
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &mut Stmt, scope: ScopeId, prelude: &mut Vec<Stmt>) -> Result<()> {
        match stmt {
            Stmt::Var { init, .. } => {
                if let Some(init) = init {
                    self.expr(init, scope, prelude, &mut Order::statement())?;
                }
            }
            Stmt::Function(func) => self.function(func)?,
            Stmt::Expr(expr) | Stmt::Throw(expr) | Stmt::Return(Some(expr)) => {
                self.expr(expr, scope, prelude, &mut Order::statement())?
            }
            Stmt::Return(None) | Stmt::Break(_) | Stmt::Continue(_) => {}
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition, scope, prelude, &mut Order::statement())?;
                self.stmts(then_branch, scope)?;
                if let Some(else_b) = else_branch {
                    self.stmts(else_b, scope)?;
                }
            }
            Stmt::While { condition, body } => {
                // Re-evaluated every iteration: a prelude would run only once
                self.expr(condition, scope, prelude, &mut Order::conditional())?;
                self.stmts(body, scope)?;
            }
            Stmt::Block(body) | Stmt::Labeled { body, .. } => self.stmts(body, scope)?,
        }
        Ok(())
    }

    fn function(&mut self, func: &mut FunctionLit) -> Result<()> {
        let scope = self
            .ctx
            .scopes
            .scope_of_function(func.id)
            .ok_or(InlineError::UnknownFunctionScope(func.id))?;
        self.stmts(&mut func.body, scope)
    }

    fn expr(
        &mut self,
        expr: &mut Expr,
        scope: ScopeId,
        prelude: &mut Vec<Stmt>,
        order: &mut Order,
    ) -> Result<()> {
        match expr {
            Expr::Undefined
            | Expr::Null
            | Expr::Bool(_)
            | Expr::Number(_)
            | Expr::String(_)
            | Expr::This => {}
            Expr::Ident(name) => {
                if self.ctx.scopes.is_locally_bound(scope, name) {
                    order.read_local = true;
                } else {
                    order.pure = false;
                }
            }
            Expr::Member { object, .. } => {
                self.expr(object, scope, prelude, order)?;
                order.pure = false;
            }
            Expr::Index { object, index } => {
                self.expr(object, scope, prelude, order)?;
                self.expr(index, scope, prelude, order)?;
                order.pure = false;
            }
            Expr::Call { .. } => self.call(expr, scope, prelude, order)?,
            Expr::New { callee, args } => {
                self.expr(callee, scope, prelude, order)?;
                for arg in args.iter_mut() {
                    self.expr(arg, scope, prelude, order)?;
                }
                order.pure = false;
            }
            Expr::Assign { target, value, .. } => {
                if !matches!(target.as_ref(), Expr::Ident(_)) {
                    self.expr(target, scope, prelude, order)?;
                }
                self.expr(value, scope, prelude, order)?;
                order.pure = false;
            }
            Expr::Binary { left, right, .. } => {
                self.expr(left, scope, prelude, order)?;
                self.expr(right, scope, prelude, order)?;
            }
            Expr::Logical { left, right, .. } => {
                self.expr(left, scope, prelude, order)?;
                self.branch(right, scope, prelude, order)?;
            }
            Expr::Unary { op, operand } => {
                self.expr(operand, scope, prelude, order)?;
                if *op == UnaryOp::Delete {
                    order.pure = false;
                }
            }
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expr(condition, scope, prelude, order)?;
                self.branch(then_expr, scope, prelude, order)?;
                self.branch(else_expr, scope, prelude, order)?;
            }
            Expr::Sequence(items) | Expr::Array(items) => {
                for item in items.iter_mut() {
                    self.expr(item, scope, prelude, order)?;
                }
            }
            Expr::Function(func) => self.function(func)?,
        }
        Ok(())
    }

    /// A conditionally evaluated operand
    fn branch(
        &mut self,
        expr: &mut Expr,
        scope: ScopeId,
        prelude: &mut Vec<Stmt>,
        order: &mut Order,
    ) -> Result<()> {
        let mut inner = Order::conditional();
        self.expr(expr, scope, prelude, &mut inner)?;
        order.read_local |= inner.read_local;
        if expr.has_side_effects() {
            order.pure = false;
        }
        Ok(())
    }

    fn call(
        &mut self,
        expr: &mut Expr,
        scope: ScopeId,
        prelude: &mut Vec<Stmt>,
        order: &mut Order,
    ) -> Result<()> {
        // Arguments move ahead of the statement along with a block
        // substitution: they must not write what was read before the call
        let before = *order;
        if let Expr::Call { callee, args } = expr {
            // A collected callee is constant for the whole run, so reading it
            // cannot observe an argument's side effects
            if !self.is_collected(callee, scope) {
                self.expr(callee, scope, prelude, order)?;
            }
            for arg in args.iter_mut() {
                self.expr(arg, scope, prelude, order)?;
            }
        }

        let inlined = match expr {
            Expr::Call { callee, args } => {
                let site = CallSite {
                    scope,
                    hoistable: before.can_hoist(args),
                };
                self.try_inline(callee, args, site)?
            }
            _ => None,
        };
        match inlined {
            Some(inlined) => {
                match inlined.mode {
                    InlineMode::Block => *order = before,
                    InlineMode::Direct => match &inlined.replacement {
                        Expr::Ident(name) if self.ctx.scopes.is_locally_bound(scope, name) => {
                            order.read_local = true;
                        }
                        other if other.is_literal() => {}
                        _ => order.pure = false,
                    },
                }
                prelude.extend(inlined.prelude);
                *expr = inlined.replacement;
            }
            None => order.pure = false,
        }
        Ok(())
    }

    /// Qualified callee with a collected definition and an unshadowed root
    fn is_collected(&self, callee: &Expr, scope: ScopeId) -> bool {
        match callee.qualified_name() {
            Some(name) if name.is_qualified() => {
                self.table.contains(&name)
                    && !self.ctx.scopes.is_locally_bound(scope, name.root())
            }
            _ => false,
        }
    }

    fn try_inline(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        site: CallSite,
    ) -> Result<Option<Inlined>> {
        let name = match callee.qualified_name() {
            Some(name) if name.is_qualified() => name,
            _ => return Ok(None),
        };
        let table = self.table;
        let def = match table.get(&name) {
            Some(def) => def,
            None => return Ok(None),
        };

        if self.ctx.scopes.is_locally_bound(site.scope, name.root()) {
            self.skipped(&name, &SkipReason::RootShadowed(name.root().to_string()));
            return Ok(None);
        }

        match inline_call(def, args, site, self.ctx)? {
            InlineOutcome::Inlined(inlined) => {
                log::debug!("{}: inlined {} ({})", self.unit, name, inlined.mode);
                match inlined.mode {
                    InlineMode::Direct => self.ctx.stats.inlined_direct += 1,
                    InlineMode::Block => self.ctx.stats.inlined_block += 1,
                }
                let changed = self.ctx.scopes.enclosing_change_scope(site.scope);
                if let Some(kind) = self.ctx.scopes.get(changed).map(|s| s.kind) {
                    self.ctx.changes.mark(kind);
                }
                Ok(Some(inlined))
            }
            InlineOutcome::Skip(reason) => {
                self.skipped(&name, &reason);
                Ok(None)
            }
        }
    }

    fn skipped(&mut self, name: &QualifiedName, reason: &SkipReason) {
        log::debug!("{}: left call to {}: {}", self.unit, name, reason);
        self.ctx.stats.skipped += 1;
    }
}

/// A statement reduced to a bare read of a result variable declared by its
/// own prelude computes nothing
fn discards_result(stmt: &Stmt, prelude: &[Stmt]) -> bool {
    match stmt {
        Stmt::Expr(Expr::Ident(read)) => prelude.iter().any(|s| {
            matches!(s, Stmt::Var { name, init: None, .. } if name == read)
        }),
        _ => false,
    }
}
