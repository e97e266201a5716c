//! Template documentation fallback
//!
//! Each of the seven documents is a fixed Markdown template filled with
//! literal IR fields. Inline code spans only ever contain IR names, numbers
//! are IR counts, and IR free text is flattened onto one line, so the output
//! passes the same grounding check applied to backend prose.

use modernizer_ir::{
    DocumentKind, DocumentationBundle, FunctionIR, IoType, ModuleIR, ProjectIR, Severity,
};

/// IR free text on one line, without backticks
fn prose(text: &str) -> String {
    text.replace('`', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn code(text: &str) -> String {
    format!("`{text}`")
}

fn code_list<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let items: Vec<String> = items.into_iter().map(|s| code(s)).collect();
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// `name(a, b)`
fn signature(function: &FunctionIR) -> String {
    let params: Vec<&str> = function.inputs.iter().map(|i| i.name.as_str()).collect();
    code(&format!("{}({})", function.name, params.join(", ")))
}

fn io_rows(lines: &mut Vec<String>, heading: &str, items: &[IoType]) {
    if items.is_empty() {
        lines.push(format!("{heading}: none"));
        return;
    }
    lines.push(format!("{heading}:"));
    lines.push(String::new());
    lines.push("| Name | Type | Notes |".into());
    lines.push("|------|------|-------|".into());
    for item in items {
        lines.push(format!(
            "| {} | {} | {} |",
            code(&item.name),
            code(&item.ty),
            prose(item.description.as_deref().unwrap_or(""))
        ));
    }
    lines.push(String::new());
}

fn overview(lines: &mut Vec<String>, ir: &ProjectIR) {
    lines.push(prose(&ir.summary));
    lines.push(String::new());
    lines.push(format!("- Language: {}", code(&ir.language)));
    lines.push(format!("- Original file: {}", code(&ir.original_filename)));
    lines.push(format!("- Suggested file: {}", code(&ir.suggested_filename)));
    lines.push(format!("- Modules: {}", ir.modules.len()));
    lines.push(format!("- Functions: {}", ir.function_count()));
    lines.push(format!("- Technical debt items: {}", ir.technical_debt.len()));
    lines.push(format!("- Dependencies: {}", code_list(&ir.dependencies)));
    lines.push(String::new());
}

fn module_section(lines: &mut Vec<String>, module: &ModuleIR, level: &str) {
    lines.push(format!("{level} {} ({})", code(&module.name), module.kind));
    lines.push(String::new());
    if !module.description.is_empty() {
        lines.push(prose(&module.description));
        lines.push(String::new());
    }
    let functions: Vec<String> = module.functions.iter().map(signature).collect();
    lines.push(format!(
        "- Functions: {}",
        if functions.is_empty() {
            "none".to_string()
        } else {
            functions.join(", ")
        }
    ));
    let attributes: Vec<String> = module
        .attributes
        .iter()
        .map(|a| format!("{}: {}", code(&a.name), code(&a.ty)))
        .collect();
    lines.push(format!(
        "- Attributes: {}",
        if attributes.is_empty() {
            "none".to_string()
        } else {
            attributes.join(", ")
        }
    ));
    lines.push(format!("- Imports: {}", code_list(&module.imports)));
    lines.push(format!(
        "- Design patterns: {}",
        code_list(&module.design_patterns)
    ));
    lines.push(String::new());
}

fn debt_section(lines: &mut Vec<String>, ir: &ProjectIR, level: &str) {
    if ir.technical_debt.is_empty() {
        lines.push("No technical debt recorded.".into());
        lines.push(String::new());
        return;
    }
    for severity in Severity::DESCENDING {
        let items: Vec<_> = ir.debt_with_severity(severity).collect();
        if items.is_empty() {
            continue;
        }
        lines.push(format!("{level} {severity} ({})", items.len()));
        lines.push(String::new());
        for item in items {
            if item.description.is_empty() {
                lines.push(format!("- **{}**", prose(&item.category)));
            } else {
                lines.push(format!(
                    "- **{}**: {}",
                    prose(&item.category),
                    prose(&item.description)
                ));
            }
            lines.push(format!("  - Recommendation: {}", prose(&item.recommendation)));
        }
        lines.push(String::new());
    }
}

fn priorities(lines: &mut Vec<String>, ir: &ProjectIR) {
    if ir.modernization_priority.is_empty() {
        lines.push("No modernization priorities recorded.".into());
    } else {
        for (i, step) in ir.modernization_priority.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, prose(step)));
        }
    }
    lines.push(String::new());
}

fn function_reference(lines: &mut Vec<String>, function: &FunctionIR) {
    lines.push(format!("### {}", signature(function)));
    lines.push(String::new());
    if !function.description.is_empty() {
        lines.push(prose(&function.description));
        lines.push(String::new());
    }
    io_rows(lines, "Inputs", &function.inputs);
    io_rows(lines, "Outputs", &function.outputs);
    if !function.modifiers.is_empty() {
        lines.push(format!("- Modifiers: {}", code_list(&function.modifiers)));
    }
    if !function.dependencies.is_empty() {
        lines.push(format!("- Uses: {}", code_list(&function.dependencies)));
    }
    for exception in &function.exceptions {
        lines.push(format!("- Fails when: {}", prose(exception)));
    }
    for effect in &function.side_effects {
        lines.push(format!("- Side effect: {}", prose(effect)));
    }
    for decision in &function.decisions {
        let condition = prose(&decision.condition);
        match &decision.description {
            Some(d) => lines.push(format!("- Decision: {condition}: {}", prose(d))),
            None => lines.push(format!("- Decision: {condition}")),
        }
    }
    if !function.business_logic.is_empty() {
        lines.push(format!("- Business logic: {}", prose(&function.business_logic)));
    }
    lines.push(String::new());
}

fn readme(ir: &ProjectIR) -> Vec<String> {
    let mut lines = vec![format!("# {}", code(&ir.original_filename)), String::new()];
    overview(&mut lines, ir);
    lines.push("## Modules".into());
    lines.push(String::new());
    for module in &ir.modules {
        lines.push(format!(
            "- {} ({}): {}",
            code(&module.name),
            module.kind,
            prose(&module.description)
        ));
    }
    lines
}

fn architecture(ir: &ProjectIR) -> Vec<String> {
    let mut lines = vec![
        format!("# Architecture of {}", code(&ir.original_filename)),
        String::new(),
    ];
    for module in &ir.modules {
        module_section(&mut lines, module, "##");
    }
    lines.push("## External dependencies".into());
    lines.push(String::new());
    lines.push(code_list(&ir.dependencies));
    lines
}

fn migration_guide(ir: &ProjectIR) -> Vec<String> {
    let mut lines = vec![
        format!(
            "# Migrating {} to {}",
            code(&ir.original_filename),
            code(&ir.suggested_filename)
        ),
        String::new(),
        "## Priorities".into(),
        String::new(),
    ];
    priorities(&mut lines, ir);
    lines.push("## Recommendations".into());
    lines.push(String::new());
    let mut any = false;
    for severity in Severity::DESCENDING {
        for item in ir.debt_with_severity(severity) {
            lines.push(format!("- [{severity}] {}", prose(&item.recommendation)));
            any = true;
        }
    }
    if !any {
        lines.push("No recommendations recorded.".into());
    }
    lines
}

fn technical_debt(ir: &ProjectIR) -> Vec<String> {
    let mut lines = vec![
        format!("# Technical debt in {}", code(&ir.original_filename)),
        String::new(),
        format!("Total items: {}", ir.technical_debt.len()),
        String::new(),
    ];
    debt_section(&mut lines, ir, "##");
    lines
}

fn api_reference(ir: &ProjectIR) -> Vec<String> {
    let mut lines = vec![
        format!("# API reference for {}", code(&ir.original_filename)),
        String::new(),
    ];
    for module in &ir.modules {
        lines.push(format!("## {}", code(&module.name)));
        lines.push(String::new());
        if module.functions.is_empty() {
            lines.push("No functions recorded.".into());
            lines.push(String::new());
        }
        for function in &module.functions {
            function_reference(&mut lines, function);
        }
    }
    lines
}

fn testing_guide(ir: &ProjectIR) -> Vec<String> {
    let mut lines = vec![
        format!("# Testing guide for {}", code(&ir.original_filename)),
        String::new(),
    ];
    for module in &ir.modules {
        lines.push(format!("## {}", code(&module.name)));
        lines.push(String::new());
        if module.functions.is_empty() {
            lines.push(format!(
                "No functions recorded; cover {} at module level.",
                code(&module.name)
            ));
            lines.push(String::new());
            continue;
        }
        for function in &module.functions {
            lines.push(format!("### {}", signature(function)));
            lines.push(String::new());
            let inputs: Vec<&String> = function.inputs.iter().map(|i| &i.name).collect();
            let outputs: Vec<&String> = function.outputs.iter().map(|o| &o.name).collect();
            lines.push(format!("- Vary inputs: {}", code_list(inputs)));
            lines.push(format!("- Check outputs: {}", code_list(outputs)));
            for decision in &function.decisions {
                lines.push(format!("- Cover both outcomes of: {}", prose(&decision.condition)));
            }
            for exception in &function.exceptions {
                lines.push(format!("- Trigger failure: {}", prose(exception)));
            }
            for effect in &function.side_effects {
                lines.push(format!("- Observe side effect: {}", prose(effect)));
            }
            lines.push(String::new());
        }
    }
    lines
}

fn master_documentation(ir: &ProjectIR) -> Vec<String> {
    let mut lines = vec![
        format!(
            "# Modernization documentation: {} to {}",
            code(&ir.original_filename),
            code(&ir.suggested_filename)
        ),
        String::new(),
        "## Overview".into(),
        String::new(),
    ];
    overview(&mut lines, ir);
    lines.push("## Modules".into());
    lines.push(String::new());
    for module in &ir.modules {
        module_section(&mut lines, module, "###");
    }
    lines.push("## Functions".into());
    lines.push(String::new());
    for module in &ir.modules {
        for function in &module.functions {
            function_reference(&mut lines, function);
        }
    }
    lines.push("## Technical debt".into());
    lines.push(String::new());
    debt_section(&mut lines, ir, "###");
    lines.push("## Modernization roadmap".into());
    lines.push(String::new());
    priorities(&mut lines, ir);
    lines
}

/// Render one document from the IR
#[must_use]
pub fn render_document(kind: DocumentKind, ir: &ProjectIR) -> String {
    let lines = match kind {
        DocumentKind::Readme => readme(ir),
        DocumentKind::MasterDocumentation => master_documentation(ir),
        DocumentKind::Architecture => architecture(ir),
        DocumentKind::MigrationGuide => migration_guide(ir),
        DocumentKind::TechnicalDebt => technical_debt(ir),
        DocumentKind::ApiReference => api_reference(ir),
        DocumentKind::TestingGuide => testing_guide(ir),
    };
    let mut text = lines.join("\n");
    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    text.push('\n');
    text
}

/// All seven documents rendered from fixed templates
#[must_use]
pub fn documentation_fallback(ir: &ProjectIR) -> DocumentationBundle {
    DocumentKind::ALL
        .into_iter()
        .fold(DocumentationBundle::new(), |bundle, kind| {
            bundle.with(kind, render_document(kind, ir))
        })
}
