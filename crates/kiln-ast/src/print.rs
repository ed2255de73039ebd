//! JavaScript-like source printer
//!
//! Output is deterministic: two-space indentation, one statement per line,
//! parentheses only where precedence requires them.

use crate::ir::{BinaryOp, Expr, FunctionLit, LogicalOp, Program, SourceUnit, Stmt, UnaryOp};

const PREC_SEQUENCE: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_CONDITIONAL: u8 = 3;
const PREC_UNARY: u8 = 14;
const PREC_CALL: u8 = 17;
const PREC_PRIMARY: u8 = 18;

pub fn print_program(program: &Program) -> String {
    let mut out = String::new();
    for unit in &program.units {
        out.push_str(&format!("// {}\n", unit.name));
        out.push_str(&print_unit(unit));
    }
    out
}

pub fn print_unit(unit: &SourceUnit) -> String {
    print_stmts(&unit.body)
}

pub fn print_stmts(stmts: &[Stmt]) -> String {
    let mut printer = Printer::default();
    for stmt in stmts {
        printer.stmt(stmt);
    }
    printer.out
}

pub fn print_stmt(stmt: &Stmt) -> String {
    print_stmts(std::slice::from_ref(stmt))
}

pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::default();
    printer.expr(expr, PREC_SEQUENCE);
    printer.out
}

fn binary_prec(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::BitOr => 6,
        BinaryOp::BitXor => 7,
        BinaryOp::BitAnd => 8,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 9,
        BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge
        | BinaryOp::InstanceOf
        | BinaryOp::In => 10,
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 11,
        BinaryOp::Add | BinaryOp::Sub => 12,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 13,
    }
}

fn logical_prec(op: LogicalOp) -> u8 {
    match op {
        LogicalOp::Or | LogicalOp::Nullish => 4,
        LogicalOp::And => 5,
    }
}

fn expr_prec(expr: &Expr) -> u8 {
    match expr {
        Expr::Sequence(_) => PREC_SEQUENCE,
        Expr::Assign { .. } => PREC_ASSIGN,
        Expr::Conditional { .. } => PREC_CONDITIONAL,
        Expr::Logical { op, .. } => logical_prec(*op),
        Expr::Binary { op, .. } => binary_prec(*op),
        Expr::Unary { .. } => PREC_UNARY,
        Expr::Call { .. } | Expr::New { .. } | Expr::Member { .. } | Expr::Index { .. } => PREC_CALL,
        Expr::Number(n) if *n < 0.0 => PREC_UNARY,
        _ => PREC_PRIMARY,
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn block(&mut self, stmts: &[Stmt]) {
        if stmts.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        self.indent += 1;
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.line_start();
        self.out.push('}');
    }

    fn function(&mut self, func: &FunctionLit) {
        self.out.push_str("function");
        if let Some(name) = &func.name {
            self.out.push(' ');
            self.out.push_str(name);
        }
        self.out.push('(');
        self.out.push_str(&func.params.join(", "));
        self.out.push_str(") ");
        self.block(&func.body);
    }

    fn stmt(&mut self, stmt: &Stmt) {
        self.line_start();
        match stmt {
            Stmt::Var { kind, name, init } => {
                self.out.push_str(kind.as_str());
                self.out.push(' ');
                self.out.push_str(name);
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    self.expr(init, PREC_ASSIGN);
                }
                self.out.push(';');
            }
            Stmt::Function(func) => self.function(func),
            Stmt::Expr(expr) => {
                // A leading `function` keyword would start a declaration
                if matches!(expr, Expr::Function(_)) {
                    self.out.push('(');
                    self.expr(expr, PREC_SEQUENCE);
                    self.out.push(')');
                } else {
                    self.expr(expr, PREC_SEQUENCE);
                }
                self.out.push(';');
            }
            Stmt::Return(value) => {
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.expr(value, PREC_SEQUENCE);
                }
                self.out.push(';');
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.out.push_str("if (");
                self.expr(condition, PREC_SEQUENCE);
                self.out.push_str(") ");
                self.block(then_branch);
                if let Some(else_b) = else_branch {
                    self.out.push_str(" else ");
                    self.block(else_b);
                }
            }
            Stmt::While { condition, body } => {
                self.out.push_str("while (");
                self.expr(condition, PREC_SEQUENCE);
                self.out.push_str(") ");
                self.block(body);
            }
            Stmt::Block(body) => self.block(body),
            Stmt::Labeled { label, body } => {
                self.out.push_str(label);
                self.out.push_str(": ");
                self.block(body);
            }
            Stmt::Break(label) => {
                self.out.push_str("break");
                if let Some(label) = label {
                    self.out.push(' ');
                    self.out.push_str(label);
                }
                self.out.push(';');
            }
            Stmt::Continue(label) => {
                self.out.push_str("continue");
                if let Some(label) = label {
                    self.out.push(' ');
                    self.out.push_str(label);
                }
                self.out.push(';');
            }
            Stmt::Throw(expr) => {
                self.out.push_str("throw ");
                self.expr(expr, PREC_SEQUENCE);
                self.out.push(';');
            }
        }
        self.out.push('\n');
    }

    fn args(&mut self, args: &[Expr]) {
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(arg, PREC_ASSIGN);
        }
        self.out.push(')');
    }

    fn expr(&mut self, expr: &Expr, min_prec: u8) {
        let parens = expr_prec(expr) < min_prec;
        if parens {
            self.out.push('(');
        }
        match expr {
            Expr::Undefined => self.out.push_str("undefined"),
            Expr::Null => self.out.push_str("null"),
            Expr::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Expr::Number(n) => self.out.push_str(&format_number(*n)),
            Expr::String(s) => self.out.push_str(&quote(s)),
            Expr::Ident(name) => self.out.push_str(name),
            Expr::This => self.out.push_str("this"),
            Expr::Member { object, property } => {
                self.expr(object, PREC_CALL);
                self.out.push('.');
                self.out.push_str(property);
            }
            Expr::Index { object, index } => {
                self.expr(object, PREC_CALL);
                self.out.push('[');
                self.expr(index, PREC_SEQUENCE);
                self.out.push(']');
            }
            Expr::Call { callee, args } => {
                if matches!(callee.as_ref(), Expr::Function(_)) {
                    self.out.push('(');
                    self.expr(callee, PREC_SEQUENCE);
                    self.out.push(')');
                } else {
                    self.expr(callee, PREC_CALL);
                }
                self.args(args);
            }
            Expr::New { callee, args } => {
                self.out.push_str("new ");
                self.expr(callee, PREC_PRIMARY);
                self.args(args);
            }
            Expr::Assign { target, op, value } => {
                self.expr(target, PREC_CALL);
                match op {
                    Some(op) => {
                        self.out.push(' ');
                        self.out.push_str(op.as_str());
                        self.out.push_str("= ");
                    }
                    None => self.out.push_str(" = "),
                }
                self.expr(value, PREC_ASSIGN);
            }
            Expr::Binary { op, left, right } => {
                let prec = binary_prec(*op);
                self.expr(left, prec);
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                self.expr(right, prec + 1);
            }
            Expr::Logical { op, left, right } => {
                let prec = logical_prec(*op);
                self.expr(left, prec);
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                self.expr(right, prec + 1);
            }
            Expr::Unary { op, operand } => {
                self.out.push_str(op.as_str());
                if matches!(op, UnaryOp::TypeOf | UnaryOp::Void | UnaryOp::Delete) {
                    self.out.push(' ');
                }
                self.expr(operand, PREC_UNARY);
            }
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expr(condition, PREC_CONDITIONAL + 1);
                self.out.push_str(" ? ");
                self.expr(then_expr, PREC_ASSIGN);
                self.out.push_str(" : ");
                self.expr(else_expr, PREC_ASSIGN);
            }
            Expr::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(item, PREC_ASSIGN);
                }
            }
            Expr::Array(items) => {
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(item, PREC_ASSIGN);
                }
                self.out.push(']');
            }
            Expr::Function(func) => self.function(func),
        }
        if parens {
            self.out.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;

    #[test]
    fn test_print_precedence() {
        let expr = mul(add(ident("a"), ident("b")), ident("c"));
        assert_eq!(print_expr(&expr), "(a + b) * c");
        let expr = add(ident("a"), mul(ident("b"), ident("c")));
        assert_eq!(print_expr(&expr), "a + b * c");
        let expr = binary(BinaryOp::Sub, ident("a"), binary(BinaryOp::Sub, ident("b"), ident("c")));
        assert_eq!(print_expr(&expr), "a - (b - c)");
    }

    #[test]
    fn test_print_sequence_as_argument() {
        let expr = call(
            ident("g"),
            vec![sequence(vec![assign(ident("t"), num(1.0)), ident("t")])],
        );
        assert_eq!(print_expr(&expr), "g((t = 1, t))");
    }

    #[test]
    fn test_print_statements() {
        let stmts = vec![
            var("x", Some(call_qualified("A.f", vec![num(1.5), string("s")]))),
            if_(
                unary(UnaryOp::Not, ident("x")),
                vec![Stmt::Return(None)],
                Some(vec![assign_stmt(member(this(), "y"), ident("x"))]),
            ),
        ];
        assert_eq!(
            print_stmts(&stmts),
            "var x = A.f(1.5, \"s\");\nif (!x) {\n  return;\n} else {\n  this.y = x;\n}\n"
        );
    }

    #[test]
    fn test_print_function_and_labels() {
        let stmts = vec![
            function_decl("f", &["a", "b"], vec![ret(add(ident("a"), ident("b")))]),
            Stmt::Labeled {
                label: "done".to_string(),
                body: vec![Stmt::Break(Some("done".to_string()))],
            },
        ];
        assert_eq!(
            print_stmts(&stmts),
            "function f(a, b) {\n  return a + b;\n}\ndone: {\n  break done;\n}\n"
        );
    }

    #[test]
    fn test_print_iife() {
        let expr = call(function_expr(&[], vec![]), vec![]);
        assert_eq!(print_expr(&expr), "(function() {})()");
    }
}
