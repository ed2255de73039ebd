//! Hygienic substitution of one collected definition at one call site
//!
//! Two shapes are produced:
//!
//! - DIRECT: the body is a single `return <expr>` (or empty). The call is
//!   replaced by `<expr>` with parameters substituted. Arguments that are not
//!   safe to duplicate are evaluated once into `var` temporaries declared
//!   before the enclosing statement: `(t$inline_0 = arg, <expr>)`.
//! - BLOCK: anything else. The renamed body is spliced before the enclosing
//!   statement as `let r; label: { let p = arg; ... }` with every `return e`
//!   lowered to `r = e; break label;`, and the call becomes `r`. Locals
//!   declared with `var` are rebound with `let`, so a block spliced into a
//!   loop body starts them at `undefined` on every iteration.
//!
//! Call sites that cannot be inlined without changing behavior come back as
//! [`InlineOutcome::Skip`] and are left untouched by the rewriter.

use crate::analysis;
use crate::collect::Definition;
use crate::context::InlineContext;
use crate::error::{InlineError, Result};
use kiln_ast::{any_node, walk_expr, walk_stmts, Expr, FunctionLit, NodeRef, Stmt, VarKind, Walk};
use kiln_types::ScopeId;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

const RESULT_BASE: &str = "result";
const LABEL_BASE: &str = "label";

/// Shape of an inlined call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineMode {
    Direct,
    Block,
}

impl fmt::Display for InlineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InlineMode::Direct => write!(f, "direct"),
            InlineMode::Block => write!(f, "block"),
        }
    }
}

/// Why a call site was left alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UsesThis,
    UsesArguments,
    Recursive,
    /// Free variable bound below the global scope where the function is defined
    FreeVariable(String),
    /// Free variable shadowed by a local binding at the call site
    ShadowedAtCallSite(String),
    /// Root of the callee's qualified name is a local binding at the call site
    RootShadowed(String),
    /// Parameter listed twice or redeclared in the body
    RedeclaredParameter(String),
    /// Hoisted local captured by a nested function literal
    CapturedLocal(String),
    /// Block substitution needed but the call cannot be moved before its statement
    NotHoistable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UsesThis => write!(f, "body uses 'this'"),
            SkipReason::UsesArguments => write!(f, "body uses 'arguments'"),
            SkipReason::Recursive => write!(f, "function calls itself"),
            SkipReason::FreeVariable(name) => {
                write!(f, "'{}' is bound outside the global scope at the definition", name)
            }
            SkipReason::ShadowedAtCallSite(name) => {
                write!(f, "'{}' is shadowed at the call site", name)
            }
            SkipReason::RootShadowed(name) => {
                write!(f, "callee root '{}' is a local binding at the call site", name)
            }
            SkipReason::RedeclaredParameter(name) => {
                write!(f, "parameter '{}' is declared more than once", name)
            }
            SkipReason::CapturedLocal(name) => {
                write!(f, "local '{}' is captured by a nested function", name)
            }
            SkipReason::NotHoistable => write!(f, "call position is not hoistable"),
        }
    }
}

/// Where the call being inlined sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// Innermost scope enclosing the call
    pub scope: ScopeId,
    /// True if statements may be inserted before the enclosing statement
    /// without reordering side effects: the call is unconditionally
    /// evaluated, not in a loop condition, nothing side-effecting is
    /// evaluated before it in the same statement, and its arguments have no
    /// side effects if a local was read before it
    pub hoistable: bool,
}

/// A successful substitution
#[derive(Debug, Clone, PartialEq)]
pub struct Inlined {
    pub mode: InlineMode,
    /// Statements to insert before the statement holding the call
    pub prelude: Vec<Stmt>,
    /// Expression that replaces the call
    pub replacement: Expr,
    /// Result variable of a BLOCK substitution
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InlineOutcome {
    Inlined(Inlined),
    Skip(SkipReason),
}

/// Substitute `def` for a call with `args` at `site`.
///
/// Names introduced by the substitution are declared in the call site's
/// scope before returning. Only contract violations (a definition whose
/// scope was never resolved) are errors.
pub fn inline_call(
    def: &Definition,
    args: &[Expr],
    site: CallSite,
    ctx: &mut InlineContext,
) -> Result<InlineOutcome> {
    if let Some(reason) = check_eligibility(def, site, ctx)? {
        return Ok(InlineOutcome::Skip(reason));
    }

    let func = &def.function;
    let inlined = match direct_expr(func) {
        Some(expr) => inline_direct(func, expr, args, site, ctx),
        None => {
            if !site.hoistable {
                return Ok(InlineOutcome::Skip(SkipReason::NotHoistable));
            }
            if let Some(name) = analysis::redeclared_params(func).into_iter().next() {
                return Ok(InlineOutcome::Skip(SkipReason::RedeclaredParameter(name)));
            }
            let hoisted = analysis::hoisted_locals(&func.body);
            let captured = analysis::captured_by_nested_functions(&func.body);
            if let Some(name) = captured.into_iter().find(|name| hoisted.contains(name)) {
                return Ok(InlineOutcome::Skip(SkipReason::CapturedLocal(name)));
            }
            inline_block(func, args, site, ctx)
        }
    };

    ctx.scopes.declare_spliced(site.scope, &inlined.prelude);
    Ok(InlineOutcome::Inlined(inlined))
}

fn check_eligibility(
    def: &Definition,
    site: CallSite,
    ctx: &InlineContext,
) -> Result<Option<SkipReason>> {
    let func = &def.function;
    if analysis::uses_this(&func.body) {
        return Ok(Some(SkipReason::UsesThis));
    }
    if analysis::uses_arguments(&func.body) {
        return Ok(Some(SkipReason::UsesArguments));
    }
    if analysis::calls_qualified(&func.body, &def.name) {
        return Ok(Some(SkipReason::Recursive));
    }

    let def_scope = ctx
        .scopes
        .scope_of_function(func.id)
        .ok_or(InlineError::UnknownFunctionScope(func.id))?;
    for name in analysis::free_variables(func) {
        if ctx.scopes.is_locally_bound(def_scope, &name) {
            return Ok(Some(SkipReason::FreeVariable(name)));
        }
        if ctx.scopes.is_locally_bound(site.scope, &name) {
            return Ok(Some(SkipReason::ShadowedAtCallSite(name)));
        }
    }
    Ok(None)
}

/// The expression a DIRECT substitution would produce, if the function
/// qualifies for one
fn direct_expr(func: &FunctionLit) -> Option<Expr> {
    let expr = match func.body.as_slice() {
        [] | [Stmt::Return(None)] => Expr::Undefined,
        [Stmt::Return(Some(expr))] => expr.clone(),
        _ => return None,
    };
    if analysis::contains_function(&expr) || analysis::assigns_any(&expr, &func.params) {
        return None;
    }
    Some(expr)
}

fn inline_direct(
    func: &FunctionLit,
    mut expr: Expr,
    args: &[Expr],
    site: CallSite,
    ctx: &mut InlineContext,
) -> Inlined {
    let late = reads_after_side_effects(&expr, &func.params);
    let mut prelude = Vec::new();
    let mut sequence = Vec::new();
    let mut bindings: HashMap<&str, Expr> = HashMap::new();

    for (i, param) in func.params.iter().enumerate() {
        let arg = args.get(i).cloned().unwrap_or(Expr::Undefined);
        if count_reads(&expr, param) == 0 {
            if arg.has_side_effects() {
                sequence.push(arg);
            }
            continue;
        }

        let later_effects = args.iter().skip(i + 1).any(Expr::has_side_effects);
        let duplicable = arg.is_literal()
            || (matches!(arg, Expr::Ident(_)) && !later_effects && !late.contains(param.as_str()));
        if duplicable {
            bindings.insert(param.as_str(), arg);
            continue;
        }

        let temp = ctx.fresh_name(param, site.scope);
        prelude.push(Stmt::Var {
            kind: VarKind::Var,
            name: temp.clone(),
            init: None,
        });
        sequence.push(Expr::Assign {
            target: Box::new(Expr::Ident(temp.clone())),
            op: None,
            value: Box::new(arg),
        });
        bindings.insert(param.as_str(), Expr::Ident(temp));
    }
    for extra in args.iter().skip(func.params.len()) {
        if extra.has_side_effects() {
            sequence.push(extra.clone());
        }
    }

    substitute(&mut expr, &bindings);
    let replacement = if sequence.is_empty() {
        expr
    } else {
        sequence.push(expr);
        Expr::Sequence(sequence)
    };

    Inlined {
        mode: InlineMode::Direct,
        prelude,
        replacement,
        result: None,
    }
}

fn inline_block(
    func: &FunctionLit,
    args: &[Expr],
    site: CallSite,
    ctx: &mut InlineContext,
) -> Inlined {
    let scope = site.scope;
    let result = ctx.fresh_name(RESULT_BASE, scope);

    let trailing = matches!(func.body.last(), Some(Stmt::Return(_)));
    let label = if count_returns(&func.body) > usize::from(trailing) {
        Some(ctx.fresh_name(LABEL_BASE, scope))
    } else {
        None
    };

    let mut names = HashMap::new();
    for name in analysis::declared_names(&func.params, &func.body) {
        let fresh = ctx.fresh_name(&name, scope);
        names.insert(name, fresh);
    }
    let mut labels = HashMap::new();
    for name in body_labels(&func.body) {
        let fresh = ctx.fresh_name(&name, scope);
        labels.insert(name, fresh);
    }

    let mut body = func.body.clone();
    rename_stmts(&mut body, &names, &labels, ctx);
    let rebound = rebind_vars(&mut body);

    let tail = if trailing { body.pop() } else { None };
    if let Some(label) = &label {
        lower_returns(&mut body, &result, label);
    }
    if let Some(Stmt::Return(Some(value))) = tail {
        body.push(assign_to(&result, value));
    }

    let mut block = Vec::with_capacity(func.params.len() + rebound.len() + body.len());
    for (i, param) in func.params.iter().enumerate() {
        block.push(Stmt::Var {
            kind: VarKind::Let,
            name: names.get(param).cloned().unwrap_or_else(|| param.clone()),
            init: args.get(i).cloned(),
        });
    }
    for extra in args.iter().skip(func.params.len()) {
        if extra.has_side_effects() {
            block.push(Stmt::Expr(extra.clone()));
        }
    }
    block.extend(rebound);
    block.extend(body);

    let wrapped = match label {
        Some(label) => Stmt::Labeled { label, body: block },
        None => Stmt::Block(block),
    };

    Inlined {
        mode: InlineMode::Block,
        prelude: vec![
            Stmt::Var {
                kind: VarKind::Let,
                name: result.clone(),
                init: None,
            },
            wrapped,
        ],
        replacement: Expr::Ident(result.clone()),
        result: Some(result),
    }
}

/// Turn the body's `var` declarations into `let` bindings, so every run of
/// the spliced block starts them at `undefined` as a call would.
///
/// A `var` declared once at the top level and not referenced above its
/// declaration becomes `let` in place. Any other is returned as a `let`
/// declaration for the top of the block, and its declarations in the body
/// become assignments.
fn rebind_vars(body: &mut Vec<Stmt>) -> Vec<Stmt> {
    let mut declared: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    any_node(body.as_slice(), false, |node| {
        if let NodeRef::Stmt(Stmt::Var {
            kind: VarKind::Var,
            name,
            ..
        }) = node
        {
            let count = counts.entry(name.clone()).or_insert(0);
            if *count == 0 {
                declared.push(name.clone());
            }
            *count += 1;
        }
        false
    });

    let mut hoisted = HashSet::new();
    let mut out = Vec::new();
    for name in declared {
        let top = body.iter().position(|stmt| is_var_named(stmt, &name));
        match top {
            Some(k) if counts.get(&name) == Some(&1) && !mentions(&body[..=k], &name) => {
                if let Stmt::Var { kind, .. } = &mut body[k] {
                    *kind = VarKind::Let;
                }
            }
            _ => {
                out.push(Stmt::Var {
                    kind: VarKind::Let,
                    name: name.clone(),
                    init: None,
                });
                hoisted.insert(name);
            }
        }
    }
    if !hoisted.is_empty() {
        demote_vars(body, &hoisted);
    }
    out
}

fn is_var_named(stmt: &Stmt, name: &str) -> bool {
    matches!(stmt, Stmt::Var { kind: VarKind::Var, name: n, .. } if n == name)
}

/// Identifier reads or writes of `name`, nested functions included
fn mentions(stmts: &[Stmt], name: &str) -> bool {
    any_node(stmts, true, |node| {
        matches!(node, NodeRef::Expr(Expr::Ident(n)) if n == name)
    })
}

/// `var x = e` becomes `x = e;` and `var x;` is dropped, for every `x` in
/// `names`. Nested functions keep their own declarations.
fn demote_vars(stmts: &mut Vec<Stmt>, names: &HashSet<String>) {
    let old = std::mem::take(stmts);
    for mut stmt in old {
        match &mut stmt {
            Stmt::Var {
                kind: VarKind::Var,
                name,
                init,
            } if names.contains(name.as_str()) => {
                if let Some(init) = init.take() {
                    stmts.push(assign_to(name, init));
                }
                continue;
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                demote_vars(then_branch, names);
                if let Some(else_b) = else_branch {
                    demote_vars(else_b, names);
                }
            }
            Stmt::While { body, .. } | Stmt::Block(body) | Stmt::Labeled { body, .. } => {
                demote_vars(body, names)
            }
            _ => {}
        }
        stmts.push(stmt);
    }
}

fn assign_to(name: &str, value: Expr) -> Stmt {
    Stmt::Expr(Expr::Assign {
        target: Box::new(Expr::Ident(name.to_string())),
        op: None,
        value: Box::new(value),
    })
}

/// Parameters in `params` read after some side effect of `expr` has been
/// evaluated, in evaluation order
fn reads_after_side_effects<'p>(expr: &Expr, params: &'p [String]) -> HashSet<&'p str> {
    struct Scan<'p> {
        params: &'p [String],
        effect_seen: bool,
        late: HashSet<&'p str>,
    }

    impl<'p> Scan<'p> {
        fn expr(&mut self, expr: &Expr) {
            match expr {
                Expr::Ident(name) => {
                    if self.effect_seen {
                        if let Some(param) = self.params.iter().find(|p| *p == name) {
                            self.late.insert(param.as_str());
                        }
                    }
                }
                Expr::Call { callee, args } | Expr::New { callee, args } => {
                    self.expr(callee);
                    for arg in args {
                        self.expr(arg);
                    }
                    self.effect_seen = true;
                }
                Expr::Assign { target, value, .. } => {
                    if !matches!(target.as_ref(), Expr::Ident(_)) {
                        self.expr(target);
                    }
                    self.expr(value);
                    self.effect_seen = true;
                }
                Expr::Unary {
                    op: kiln_ast::UnaryOp::Delete,
                    operand,
                } => {
                    self.expr(operand);
                    self.effect_seen = true;
                }
                Expr::Undefined
                | Expr::Null
                | Expr::Bool(_)
                | Expr::Number(_)
                | Expr::String(_)
                | Expr::This
                | Expr::Function(_) => {}
                Expr::Member { object, .. } => self.expr(object),
                Expr::Index { object, index } => {
                    self.expr(object);
                    self.expr(index);
                }
                Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                    self.expr(left);
                    self.expr(right);
                }
                Expr::Unary { operand, .. } => self.expr(operand),
                Expr::Conditional {
                    condition,
                    then_expr,
                    else_expr,
                } => {
                    self.expr(condition);
                    self.expr(then_expr);
                    self.expr(else_expr);
                }
                Expr::Sequence(items) | Expr::Array(items) => {
                    for item in items {
                        self.expr(item);
                    }
                }
            }
        }
    }

    let mut scan = Scan {
        params,
        effect_seen: false,
        late: HashSet::new(),
    };
    scan.expr(expr);
    scan.late
}

fn count_reads(expr: &Expr, name: &str) -> usize {
    let mut count = 0;
    walk_expr(expr, &mut |node| {
        if matches!(node, NodeRef::Expr(Expr::Ident(n)) if n == name) {
            count += 1;
        }
        Walk::Continue
    });
    count
}

/// Replace identifier reads bound in `bindings`. Only used on expressions
/// without function literals, so there is no shadowing to respect.
fn substitute(expr: &mut Expr, bindings: &HashMap<&str, Expr>) {
    if let Expr::Ident(name) = expr {
        if let Some(value) = bindings.get(name.as_str()) {
            *expr = value.clone();
        }
        return;
    }
    for child in expr.children_mut() {
        substitute(child, bindings);
    }
}

/// `return` statements of the function itself
fn count_returns(body: &[Stmt]) -> usize {
    let mut count = 0;
    walk_stmts(body, &mut |node| match node {
        NodeRef::Stmt(Stmt::Return(_)) => {
            count += 1;
            Walk::Continue
        }
        NodeRef::Stmt(Stmt::Function(_)) | NodeRef::Expr(Expr::Function(_)) => Walk::Prune,
        _ => Walk::Continue,
    });
    count
}

fn body_labels(body: &[Stmt]) -> Vec<String> {
    let mut labels = Vec::new();
    walk_stmts(body, &mut |node| match node {
        NodeRef::Stmt(Stmt::Labeled { label, .. }) => {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
            Walk::Continue
        }
        NodeRef::Stmt(Stmt::Function(_)) | NodeRef::Expr(Expr::Function(_)) => Walk::Prune,
        _ => Walk::Continue,
    });
    labels
}

/// Rewrite every `return` of the function itself into an assignment to
/// `result` followed by `break label`
fn lower_returns(stmts: &mut Vec<Stmt>, result: &str, label: &str) {
    let old = std::mem::take(stmts);
    for stmt in old {
        match stmt {
            Stmt::Return(value) => {
                if let Some(value) = value {
                    stmts.push(assign_to(result, value));
                }
                stmts.push(Stmt::Break(Some(label.to_string())));
            }
            Stmt::If {
                condition,
                mut then_branch,
                mut else_branch,
            } => {
                lower_returns(&mut then_branch, result, label);
                if let Some(else_b) = else_branch.as_mut() {
                    lower_returns(else_b, result, label);
                }
                stmts.push(Stmt::If {
                    condition,
                    then_branch,
                    else_branch,
                });
            }
            Stmt::While {
                condition,
                mut body,
            } => {
                lower_returns(&mut body, result, label);
                stmts.push(Stmt::While { condition, body });
            }
            Stmt::Block(mut body) => {
                lower_returns(&mut body, result, label);
                stmts.push(Stmt::Block(body));
            }
            Stmt::Labeled {
                label: inner,
                mut body,
            } => {
                lower_returns(&mut body, result, label);
                stmts.push(Stmt::Labeled { label: inner, body });
            }
            other => stmts.push(other),
        }
    }
}

fn rename(name: &mut String, map: &HashMap<String, String>) {
    if let Some(fresh) = map.get(name.as_str()) {
        *name = fresh.clone();
    }
}

fn rename_stmts(
    stmts: &mut [Stmt],
    names: &HashMap<String, String>,
    labels: &HashMap<String, String>,
    ctx: &mut InlineContext,
) {
    for stmt in stmts {
        match stmt {
            Stmt::Var { name, init, .. } => {
                rename(name, names);
                if let Some(init) = init {
                    rename_expr(init, names, ctx);
                }
            }
            Stmt::Function(func) => {
                if let Some(name) = func.name.as_mut() {
                    rename(name, names);
                }
                rename_function(func, false, names, ctx);
            }
            Stmt::Expr(expr) | Stmt::Throw(expr) | Stmt::Return(Some(expr)) => {
                rename_expr(expr, names, ctx)
            }
            Stmt::Return(None) => {}
            Stmt::Break(label) | Stmt::Continue(label) => {
                if let Some(label) = label {
                    rename(label, labels);
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                rename_expr(condition, names, ctx);
                rename_stmts(then_branch, names, labels, ctx);
                if let Some(else_b) = else_branch {
                    rename_stmts(else_b, names, labels, ctx);
                }
            }
            Stmt::While { condition, body } => {
                rename_expr(condition, names, ctx);
                rename_stmts(body, names, labels, ctx);
            }
            Stmt::Block(body) => rename_stmts(body, names, labels, ctx),
            Stmt::Labeled { label, body } => {
                rename(label, labels);
                rename_stmts(body, names, labels, ctx);
            }
        }
    }
}

/// Give a copied function literal a fresh id and rename the outer names it
/// references, except those its own declarations shadow
fn rename_function(
    func: &mut FunctionLit,
    is_expression: bool,
    names: &HashMap<String, String>,
    ctx: &mut InlineContext,
) {
    func.id = ctx.fresh_node_id();
    let mut shadowed: HashSet<String> = analysis::declared_names(&func.params, &func.body)
        .into_iter()
        .collect();
    if is_expression {
        shadowed.extend(func.name.iter().cloned());
    }
    let inner: HashMap<String, String> = names
        .iter()
        .filter(|(name, _)| !shadowed.contains(name.as_str()))
        .map(|(name, fresh)| (name.clone(), fresh.clone()))
        .collect();
    // Labels never cross a function boundary
    rename_stmts(&mut func.body, &inner, &HashMap::new(), ctx);
}

fn rename_expr(expr: &mut Expr, names: &HashMap<String, String>, ctx: &mut InlineContext) {
    match expr {
        Expr::Ident(name) => rename(name, names),
        Expr::Function(func) => rename_function(func, true, names, ctx),
        _ => {
            for child in expr.children_mut() {
                rename_expr(child, names, ctx);
            }
        }
    }
}
