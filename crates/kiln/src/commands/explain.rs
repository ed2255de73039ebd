//! Explain command - explain diagnostic codes

use anyhow::{anyhow, Result};
use clap::Args;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Diagnostic code to explain (e.g., I001)
    pub code: String,
}

struct CodeExplanation {
    code: &'static str,
    title: &'static str,
    description: &'static str,
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [&'static str],
}

const CODE_EXPLANATIONS: &[CodeExplanation] = &[
    CodeExplanation {
        code: "I001",
        title: "Duplicate Definition",
        description: "The definition host assigns the same qualified name more than once. Only one of the function literals can be inlined.",
        example: Some(r#"Arrays.$create = function(d) { return d; };
Arrays.$create = function(d, t) { return new t(d); };"#),
        suggestion: Some(r#"By default the last assignment is used. Pass --first-wins or set
duplicate_policy = "first-wins" in kiln.toml to keep the first one."#),
        related: &["I003"],
    },
    CodeExplanation {
        code: "I002",
        title: "Definition Host Not Found",
        description: "No source unit name ends with the configured host path, so no definitions were collected for that target and its calls are left alone.",
        example: Some(r#"[[target]]
host = "j2cl/transpiler/vmbootstrap/Casts.impl.js"  # not part of the program"#),
        suggestion: Some("Check the host path in kiln.toml against the unit names in the program."),
        related: &["I003"],
    },
    CodeExplanation {
        code: "I003",
        title: "Candidate Not Found",
        description: "A function listed for a target has no `Qualified.name = function ...` assignment in the definition host.",
        example: Some(r#"functions = ["$create", "$createArray"]  # host only defines $create"#),
        suggestion: Some("Remove the name from the target or check its spelling."),
        related: &["I001", "I002"],
    },
    CodeExplanation {
        code: "I900",
        title: "Internal Error",
        description: "The program is malformed (duplicate unit or function ids, calls without a target) or the pass hit an inconsistent scope table. The program is left unchanged.",
        example: None,
        suggestion: Some("Regenerate the program JSON; if it validates and the error persists, report it with the input attached."),
        related: &[],
    },
];

pub fn run(args: ExplainArgs, format: OutputFormat, use_color: bool) -> Result<()> {
    let code = args.code.to_uppercase();

    let explanation = CODE_EXPLANATIONS
        .iter()
        .find(|e| e.code == code)
        .ok_or_else(|| anyhow!("Unknown diagnostic code: {}", code))?;

    match format {
        OutputFormat::Text => {
            let rule = "=".repeat(code.len() + explanation.title.len() + 2);
            if use_color {
                println!(
                    "\n{}: {}\n{}",
                    console::style(&code).bold().cyan(),
                    console::style(explanation.title).bold(),
                    rule
                );
            } else {
                println!("\n{}: {}\n{}", code, explanation.title, rule);
            }
            println!("\n{}\n", explanation.description);

            if let Some(example) = explanation.example {
                section("Example", example, use_color.then(console::Style::new));
            }
            if let Some(suggestion) = explanation.suggestion {
                section(
                    "Suggestion",
                    suggestion,
                    use_color.then(|| console::Style::new().green()),
                );
            }
            if !explanation.related.is_empty() {
                let related = explanation.related.join(", ");
                if use_color {
                    println!("{}: {}", console::style("Related").dim(), related);
                } else {
                    println!("Related: {}", related);
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "code": explanation.code,
                "title": explanation.title,
                "description": explanation.description,
                "example": explanation.example,
                "suggestion": explanation.suggestion,
                "related": explanation.related,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// A bold heading followed by the indented body
fn section(heading: &str, body: &str, style: Option<console::Style>) {
    match style {
        Some(style) => println!("{}:", style.bold().apply_to(heading)),
        None => println!("{}:", heading),
    }
    for line in body.lines() {
        println!("  {}", line);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_diagnostics::DiagnosticCode;

    #[test]
    fn test_every_code_is_explained() {
        for code in DiagnosticCode::ALL {
            assert!(
                CODE_EXPLANATIONS.iter().any(|e| e.code == code.as_str()),
                "{} has no explanation",
                code
            );
        }
    }

    #[test]
    fn test_related_codes_exist() {
        for explanation in CODE_EXPLANATIONS {
            for related in explanation.related {
                assert!(DiagnosticCode::from_code(related).is_some());
            }
        }
    }
}
