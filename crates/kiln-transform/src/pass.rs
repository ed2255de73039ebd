//! Pass driver: configuration, sequencing of the two phases, reporting

use crate::changes::ChangeSet;
use crate::collect::{collect_with_policy, DefinitionTable, DuplicatePolicy};
use crate::context::InlineContext;
use crate::error::Result;
use crate::names::{NameIdSupplier, UniqueIdSupplier};
use crate::rewrite::rewrite_program;
use kiln_ast::{validate, Program};
use kiln_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Definition host of the J2CL array helpers
pub const J2CL_ARRAYS_HOST: &str = "j2cl/transpiler/vmbootstrap/Arrays.impl.js";
/// Definition host of the J2CL cast helpers
pub const J2CL_CASTS_HOST: &str = "j2cl/transpiler/vmbootstrap/Casts.impl.js";

/// One definition host and the function names to inline from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineTarget {
    /// Suffix matched against source unit names
    pub host: String,
    /// Last segments of the qualified names to collect
    pub functions: BTreeSet<String>,
}

impl InlineTarget {
    pub fn new<I, S>(host: impl Into<String>, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            host: host.into(),
            functions: functions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Targets processed in order, one collect/rewrite run each
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineConfig {
    #[serde(default, rename = "target")]
    pub targets: Vec<InlineTarget>,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

impl InlineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The J2CL runtime helpers
    pub fn j2cl() -> Self {
        Self::new()
            .with_target(InlineTarget::new(
                J2CL_ARRAYS_HOST,
                ["$create", "$init", "$instanceIsOfType", "$castTo"],
            ))
            .with_target(InlineTarget::new(J2CL_CASTS_HOST, ["to"]))
    }

    pub fn with_target(mut self, target: InlineTarget) -> Self {
        self.targets.push(target);
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// Counters accumulated over a pass run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineStats {
    pub targets: usize,
    pub collected: usize,
    pub inlined_direct: usize,
    pub inlined_block: usize,
    pub skipped: usize,
}

impl InlineStats {
    pub fn inlined(&self) -> usize {
        self.inlined_direct + self.inlined_block
    }
}

/// Outcome of a pass run
#[derive(Debug, Clone)]
pub struct InlineReport {
    pub changes: ChangeSet,
    pub diagnostics: Diagnostics,
    pub stats: InlineStats,
}

impl InlineReport {
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Inlines calls to designated static functions
pub struct StaticFunctionInliner {
    config: InlineConfig,
    supplier: Box<dyn NameIdSupplier>,
}

impl StaticFunctionInliner {
    pub fn new(config: InlineConfig) -> Self {
        Self {
            config,
            supplier: Box::new(UniqueIdSupplier::new()),
        }
    }

    pub fn j2cl() -> Self {
        Self::new(InlineConfig::j2cl())
    }

    /// Replace the source of fresh-name ids
    pub fn with_name_supplier(mut self, supplier: impl NameIdSupplier + 'static) -> Self {
        self.supplier = Box::new(supplier);
        self
    }

    pub fn config(&self) -> &InlineConfig {
        &self.config
    }

    /// Run every target against `program`, mutating it in place.
    ///
    /// Each target is collected completely before any of its call sites is
    /// rewritten, and targets run one after another.
    pub fn run(self, program: &mut Program) -> Result<InlineReport> {
        validate(program)?;

        let mut ctx = InlineContext::new(program, self.supplier);
        let mut diagnostics = Diagnostics::new();

        for target in &self.config.targets {
            let table = collect_with_policy(
                program,
                &target.host,
                &target.functions,
                self.config.duplicate_policy,
            );
            diagnostics.extend(collection_diagnostics(
                target,
                &table,
                self.config.duplicate_policy,
            ));

            ctx.stats.targets += 1;
            ctx.stats.collected += table.len();
            let before = ctx.stats.clone();
            rewrite_program(program, &table, &mut ctx)?;

            log::info!(
                "{}: {} definition(s), {} call(s) inlined, {} left",
                target.host,
                table.len(),
                ctx.stats.inlined() - before.inlined(),
                ctx.stats.skipped - before.skipped
            );
        }

        Ok(InlineReport {
            changes: ctx.changes,
            diagnostics,
            stats: ctx.stats,
        })
    }
}

fn collection_diagnostics(
    target: &InlineTarget,
    table: &DefinitionTable,
    policy: DuplicatePolicy,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    let Some(host_unit) = table.host_units().first() else {
        out.push(
            Diagnostic::new(
                DiagnosticCode::HostUnitNotFound,
                format!("no source unit ends with '{}'", target.host),
            )
            .with_help("calls to its functions are left as they are")
            .build(),
        );
        return out;
    };

    for dup in table.duplicates() {
        let kept = match policy {
            DuplicatePolicy::LastWins => "the last definition is used",
            DuplicatePolicy::FirstWins => "the first definition is used",
        };
        out.push(
            Diagnostic::new(
                DiagnosticCode::DuplicateDefinition,
                format!("'{}' is defined {} times", dup.name, dup.occurrences),
            )
            .with_unit(dup.unit_name.clone())
            .with_help(kept)
            .with_related(
                Some(dup.unit_name.clone()),
                format!("{} assignment(s) ignored", dup.occurrences - 1),
            )
            .build(),
        );
    }

    for function in &target.functions {
        if !table.has_function(function) {
            out.push(
                Diagnostic::new(
                    DiagnosticCode::CandidateNotFound,
                    format!("'{}' has no definition in the host", function),
                )
                .with_unit(host_unit.clone())
                .build(),
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ast::builder::*;
    use crate::changes::ChangedScope;
    use kiln_ast::{print_program, print_stmts, print_unit, AstError, Expr, Stmt};

    const ARRAYS: &str = "out/j2cl/transpiler/vmbootstrap/Arrays.impl.js";
    const CASTS: &str = "out/j2cl/transpiler/vmbootstrap/Casts.impl.js";

    fn define(path: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
        assign_stmt(qualified(path), function_expr(params, body))
    }

    fn arrays_create(value: f64) -> Stmt {
        define(
            "Arrays.$create",
            &["dims", "type"],
            vec![ret(call_qualified(
                "Arrays.$createImpl",
                vec![ident("dims"), ident("type"), num(value)],
            ))],
        )
    }

    fn run(program: &mut Program) -> InlineReport {
        StaticFunctionInliner::j2cl().run(program).unwrap()
    }

    #[test]
    fn test_j2cl_defaults() {
        let config = InlineConfig::j2cl();
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].host, J2CL_ARRAYS_HOST);
        assert!(config.targets[0].functions.contains("$instanceIsOfType"));
        assert_eq!(config.targets[1].functions.len(), 1);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::LastWins);
    }

    #[test]
    fn test_no_candidates_is_a_no_op() {
        let mut program = Program::new();
        program.add_unit(ARRAYS, vec![define("Arrays.$other", &[], vec![])]);
        program.add_unit("app/Main.js", vec![expr_stmt(call_qualified("Arrays.$other", vec![]))]);
        let before = program.clone();

        let report = run(&mut program);
        assert_eq!(program, before);
        assert!(!report.changed());
        assert_eq!(report.stats.inlined(), 0);
    }

    #[test]
    fn test_program_without_calls_is_unchanged() {
        let mut program = Program::new();
        program.add_unit(ARRAYS, vec![arrays_create(1.0)]);
        program.add_unit("app/Main.js", vec![var("x", Some(num(1.0)))]);
        let before = program.clone();

        let report = run(&mut program);
        assert_eq!(program, before);
        assert!(report.changes.is_empty());
        assert_eq!(report.stats.collected, 1);
    }

    #[test]
    fn test_duplicate_definition_last_write_wins() {
        let mut program = Program::new();
        program.add_unit(ARRAYS, vec![arrays_create(1.0), arrays_create(2.0)]);
        program.add_unit(
            "app/Main.js",
            vec![var("a", Some(call_qualified("Arrays.$create", vec![ident("d"), ident("t")])))],
        );

        let report = run(&mut program);
        assert_eq!(
            print_unit(&program.units[1]),
            "var a = Arrays.$createImpl(d, t, 2);\n"
        );
        let dups: Vec<_> = report
            .diagnostics
            .with_code(DiagnosticCode::DuplicateDefinition)
            .collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].unit.as_deref(), Some(ARRAYS));
        assert_eq!(dups[0].related[0].message, "1 assignment(s) ignored");
    }

    #[test]
    fn test_hygiene_with_caller_local_named_like_callee_local() {
        let mut program = Program::new();
        program.add_unit(
            CASTS,
            vec![define(
                "Casts.to",
                &["x"],
                vec![var("t", Some(add(ident("x"), num(1.0)))), ret(mul(ident("t"), num(2.0)))],
            )],
        );
        program.add_unit(
            "app/Main.js",
            vec![function_decl(
                "main",
                &[],
                vec![
                    var("t", Some(num(5.0))),
                    ret(add(call_qualified("Casts.to", vec![ident("t")]), ident("t"))),
                ],
            )],
        );

        let report = run(&mut program);
        assert_eq!(
            print_unit(&program.units[1]),
            "function main() {\n  var t = 5;\n  let result$inline_0;\n  {\n    let x$inline_1 = t;\n    let t$inline_2 = x$inline_1 + 1;\n    result$inline_0 = t$inline_2 * 2;\n  }\n  return result$inline_0 + t;\n}\n"
        );
        assert_eq!(report.stats.inlined_block, 1);
    }

    #[test]
    fn test_side_effecting_argument_evaluated_once() {
        let mut program = Program::new();
        program.add_unit(
            CASTS,
            vec![define("Casts.to", &["x"], vec![ret(add(ident("x"), ident("x")))])],
        );
        program.add_unit(
            "app/Main.js",
            vec![var("y", Some(call_qualified("Casts.to", vec![call(ident("sideEffecting"), vec![])])))],
        );

        run(&mut program);
        assert_eq!(
            print_unit(&program.units[1]),
            "var x$inline_0;\nvar y = (x$inline_0 = sideEffecting(), x$inline_0 + x$inline_0);\n"
        );
        let mut calls = 0;
        kiln_ast::walk_stmts(&program.units[1].body, &mut |node| {
            if let kiln_ast::NodeRef::Expr(Expr::Call { .. }) = node {
                calls += 1;
            }
            kiln_ast::Walk::Continue
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_single_return_uses_direct_mode() {
        let mut program = Program::new();
        program.add_unit(
            CASTS,
            vec![define("Casts.to", &["x", "c"], vec![ret(call_qualified("Casts.$check", vec![ident("x"), ident("c")]))])],
        );
        program.add_unit(
            "app/Main.js",
            vec![var("y", Some(call_qualified("Casts.to", vec![ident("o"), qualified("Foo")])))],
        );

        let report = run(&mut program);
        assert_eq!(print_unit(&program.units[1]), "var y = Casts.$check(o, Foo);\n");
        assert_eq!(report.stats.inlined_direct, 1);
        assert_eq!(report.stats.inlined_block, 0);
    }

    #[test]
    fn test_two_statement_body_uses_block_mode() {
        let mut program = Program::new();
        program.add_unit(
            CASTS,
            vec![define(
                "Casts.to",
                &["x"],
                vec![
                    if_(unary(kiln_ast::UnaryOp::Not, ident("x")), vec![throw_error()], None),
                    ret(ident("x")),
                ],
            )],
        );
        program.add_unit(
            "app/Main.js",
            vec![var("y", Some(call_qualified("Casts.to", vec![ident("o")])))],
        );

        let report = run(&mut program);
        assert_eq!(report.stats.inlined_block, 1);
        assert_eq!(
            print_unit(&program.units[1]),
            "let result$inline_0;\n{\n  let x$inline_1 = o;\n  if (!x$inline_1) {\n    throw new Error();\n  }\n  result$inline_0 = x$inline_1;\n}\nvar y = result$inline_0;\n"
        );
    }

    fn throw_error() -> Stmt {
        Stmt::Throw(new_expr(ident("Error"), vec![]))
    }

    #[test]
    fn test_unqualified_call_is_untouched() {
        let mut program = Program::new();
        program.add_unit(ARRAYS, vec![arrays_create(1.0)]);
        program.add_unit(
            "app/Main.js",
            vec![
                function_decl("$create", &[], vec![]),
                expr_stmt(call(ident("$create"), vec![])),
            ],
        );
        let before = program.units[1].clone();

        let report = run(&mut program);
        assert_eq!(program.units[1], before);
        assert_eq!(report.stats.skipped, 0);
    }

    #[test]
    fn test_cross_unit_isolation() {
        let mut program = Program::new();
        program.add_unit(ARRAYS, vec![arrays_create(1.0)]);
        // Same qualified name defined outside the host: never collected
        program.add_unit(
            "app/Shadow.js",
            vec![define("Arrays.$create", &[], vec![ret(num(9.0))])],
        );
        program.add_unit(
            "app/Main.js",
            vec![expr_stmt(call(
                ident("use"),
                vec![call_qualified("Arrays.$create", vec![num(1.0), num(2.0)])],
            ))],
        );

        let report = run(&mut program);
        assert_eq!(report.stats.collected, 1);
        assert_eq!(
            print_unit(&program.units[2]),
            "use(Arrays.$createImpl(1, 2, 1));\n"
        );
    }

    #[test]
    fn test_missing_host_and_candidates_are_reported() {
        let mut program = Program::new();
        program.add_unit(ARRAYS, vec![arrays_create(1.0)]);

        let report = run(&mut program);
        let missing_host: Vec<_> = report
            .diagnostics
            .with_code(DiagnosticCode::HostUnitNotFound)
            .collect();
        assert_eq!(missing_host.len(), 1);
        assert!(missing_host[0].message.contains(J2CL_CASTS_HOST));
        // $init, $instanceIsOfType and $castTo have no definition
        assert_eq!(
            report
                .diagnostics
                .with_code(DiagnosticCode::CandidateNotFound)
                .count(),
            3
        );
    }

    #[test]
    fn test_changes_record_enclosing_scopes() {
        let mut program = Program::new();
        program.add_unit(CASTS, vec![define("Casts.to", &["x"], vec![ret(ident("x"))])]);
        let f = function_decl(
            "f",
            &[],
            vec![ret(call_qualified("Casts.to", vec![num(2.0)]))],
        );
        let f_id = match &f {
            Stmt::Function(func) => func.id,
            _ => unreachable!(),
        };
        let main = program.add_unit(
            "app/Main.js",
            vec![
                expr_stmt(call(ident("use"), vec![call_qualified("Casts.to", vec![num(1.0)])])),
                f,
                function_decl("g", &[], vec![ret(num(3.0))]),
            ],
        );

        let report = run(&mut program);
        assert_eq!(report.stats.inlined_direct, 2);
        assert!(print_program(&program).contains("use(1);"));
        assert_eq!(
            report.changes.iter().collect::<Vec<_>>(),
            vec![ChangedScope::Script(main), ChangedScope::Function(f_id)]
        );

        // The recorded ids still name the rewritten bodies
        let unit = program.unit(main).unwrap();
        let changed = unit
            .body
            .iter()
            .find_map(|stmt| match stmt {
                Stmt::Function(func) if func.id == f_id => Some(func),
                _ => None,
            })
            .unwrap();
        assert_eq!(changed.name.as_deref(), Some("f"));
        assert_eq!(print_stmts(&changed.body), "return 2;\n");
        assert_eq!(report.changes.scripts().collect::<Vec<_>>(), vec![main]);
    }

    #[test]
    fn test_later_target_sees_earlier_rewrites() {
        let config = InlineConfig::new()
            .with_target(InlineTarget::new("A.impl.js", ["f"]))
            .with_target(InlineTarget::new("B.impl.js", ["g"]));
        let mut program = Program::new();
        program.add_unit("main.js", vec![var("v", Some(call_qualified("A.f", vec![num(1.0)])))]);
        program.add_unit("A.impl.js", vec![define("A.f", &["x"], vec![ret(call_qualified("B.g", vec![ident("x")]))])]);
        program.add_unit(
            "B.impl.js",
            vec![define(
                "B.g",
                &["y"],
                vec![var("z", Some(ident("y"))), ret(ident("z"))],
            )],
        );

        let report = StaticFunctionInliner::new(config).run(&mut program).unwrap();
        assert_eq!(report.stats.targets, 2);
        assert_eq!(report.stats.inlined_direct, 1);
        // main.js and the body of A.f both call B.g by the second target
        assert_eq!(report.stats.inlined_block, 2);
        assert_eq!(
            print_unit(&program.units[0]),
            "let result$inline_0;\n{\n  let y$inline_1 = 1;\n  let z$inline_2 = y$inline_1;\n  result$inline_0 = z$inline_2;\n}\nvar v = result$inline_0;\n"
        );
    }

    #[test]
    fn test_custom_name_supplier() {
        struct Letters(u8);
        impl NameIdSupplier for Letters {
            fn next_id(&mut self) -> String {
                self.0 += 1;
                ((b'a' + self.0 - 1) as char).to_string()
            }
        }

        let mut program = Program::new();
        program.add_unit(CASTS, vec![define("Casts.to", &["x"], vec![ret(mul(ident("x"), ident("x")))])]);
        program.add_unit("main.js", vec![var("v", Some(call_qualified("Casts.to", vec![call(ident("g"), vec![])])))]);

        StaticFunctionInliner::j2cl()
            .with_name_supplier(Letters(0))
            .run(&mut program)
            .unwrap();
        assert_eq!(
            print_unit(&program.units[1]),
            "var x$inline_a;\nvar v = (x$inline_a = g(), x$inline_a * x$inline_a);\n"
        );
    }

    #[test]
    fn test_malformed_program_is_rejected() {
        let mut program = Program::new();
        program.add_unit("a.js", vec![]);
        program.add_unit("b.js", vec![]);
        program.units[1].id = program.units[0].id;

        let err = StaticFunctionInliner::j2cl().run(&mut program).unwrap_err();
        assert!(matches!(
            err,
            crate::error::InlineError::Ast(AstError::DuplicateUnitId(_))
        ));
    }

    #[test]
    fn test_config_from_toml() {
        let config: InlineConfig = toml::from_str(
            r#"
            duplicate_policy = "first-wins"

            [[target]]
            host = "A.impl.js"
            functions = ["f", "g"]
            "#,
        )
        .unwrap();
        assert_eq!(config.targets[0].functions.len(), 2);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::FirstWins);
    }
}
