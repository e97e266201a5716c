//! Code skeleton generator
//!
//! A deterministic outline of the modernized target, derived from the IR
//! alone. Python, Java and JavaScript get real declarations with stub
//! bodies; any other language gets a commented outline.

use modernizer_ir::{FunctionIR, ModuleIR, ModuleKind, ProjectIR};

const INDENT: &str = "    ";

fn params(function: &FunctionIR) -> Vec<&str> {
    function.inputs.iter().map(|i| i.name.as_str()).collect()
}

fn doc_lines(function: &FunctionIR) -> Vec<String> {
    let mut lines = Vec::new();
    if !function.description.is_empty() {
        lines.push(function.description.clone());
    }
    for input in &function.inputs {
        lines.push(format!("{}: {}", input.name, input.ty));
    }
    for output in &function.outputs {
        lines.push(format!("returns {}: {}", output.name, output.ty));
    }
    for exception in &function.exceptions {
        lines.push(format!("fails when {exception}"));
    }
    lines
}

fn python(ir: &ProjectIR) -> String {
    let mut out = vec![format!("\"\"\"{}\"\"\"", ir.summary.replace("\"\"\"", "'''"))];
    for module in &ir.modules {
        out.push(String::new());
        let (indent, receiver) = match module.kind {
            ModuleKind::Module => ("", None),
            ModuleKind::Class | ModuleKind::Interface => {
                out.push(format!("class {}:", module.name));
                out.push(format!("{INDENT}\"\"\"{}\"\"\"", module.description));
                (INDENT, Some("self"))
            }
        };
        if receiver.is_some() && module.functions.is_empty() {
            out.push(format!("{INDENT}pass"));
        }
        for function in &module.functions {
            let mut args: Vec<&str> = receiver.into_iter().collect();
            args.extend(params(function));
            out.push(String::new());
            out.push(format!("{indent}def {}({}):", function.name, args.join(", ")));
            out.push(format!("{indent}{INDENT}\"\"\""));
            for line in doc_lines(function) {
                out.push(format!("{indent}{INDENT}{line}"));
            }
            out.push(format!("{indent}{INDENT}\"\"\""));
            out.push(format!("{indent}{INDENT}raise NotImplementedError"));
        }
    }
    out.join("\n")
}

fn javadoc(out: &mut Vec<String>, indent: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    out.push(format!("{indent}/**"));
    for line in lines {
        out.push(format!("{indent} * {line}"));
    }
    out.push(format!("{indent} */"));
}

fn java_module(out: &mut Vec<String>, module: &ModuleIR) {
    let (header, is_interface) = match module.kind {
        ModuleKind::Interface => (format!("public interface {}", module.name), true),
        ModuleKind::Class => (format!("public class {}", module.name), false),
        ModuleKind::Module => (format!("public final class {}", module.name), false),
    };
    javadoc(out, "", &[module.description.clone()]);
    out.push(format!("{header} {{"));
    for attribute in &module.attributes {
        out.push(format!("{INDENT}private Object {}; // {}", attribute.name, attribute.ty));
    }
    for function in &module.functions {
        out.push(String::new());
        javadoc(out, INDENT, &doc_lines(function));
        let args: Vec<String> = params(function)
            .into_iter()
            .map(|p| format!("Object {p}"))
            .collect();
        let ret = if function.outputs.is_empty() { "void" } else { "Object" };
        let statics = if module.kind == ModuleKind::Module { "static " } else { "" };
        if is_interface {
            out.push(format!("{INDENT}{ret} {}({});", function.name, args.join(", ")));
        } else {
            out.push(format!(
                "{INDENT}public {statics}{ret} {}({}) {{",
                function.name,
                args.join(", ")
            ));
            out.push(format!(
                "{INDENT}{INDENT}throw new UnsupportedOperationException(\"{}\");",
                function.name
            ));
            out.push(format!("{INDENT}}}"));
        }
    }
    out.push("}".into());
}

fn java(ir: &ProjectIR) -> String {
    let mut out = Vec::new();
    for (i, module) in ir.modules.iter().enumerate() {
        if i > 0 {
            out.push(String::new());
        }
        java_module(&mut out, module);
    }
    out.join("\n")
}

fn javascript(ir: &ProjectIR) -> String {
    let mut out = vec![format!("// {}", ir.summary)];
    for module in &ir.modules {
        out.push(String::new());
        let class = module.kind != ModuleKind::Module;
        if class {
            javadoc(&mut out, "", &[module.description.clone()]);
            out.push(format!("export class {} {{", module.name));
        }
        let indent = if class { INDENT } else { "" };
        for function in &module.functions {
            javadoc(&mut out, indent, &doc_lines(function));
            let head = if class {
                format!("{}({})", function.name, params(function).join(", "))
            } else {
                format!("export function {}({})", function.name, params(function).join(", "))
            };
            out.push(format!("{indent}{head} {{"));
            out.push(format!(
                "{indent}{INDENT}throw new Error('{} is not implemented');",
                function.name
            ));
            out.push(format!("{indent}}}"));
        }
        if class {
            out.push("}".into());
        }
    }
    out.join("\n")
}

fn outline(ir: &ProjectIR) -> String {
    let comment = match ir.language.as_str() {
        "ruby" | "perl" | "shell" | "bash" | "r" => "#",
        "sql" | "lua" | "haskell" => "--",
        _ => "//",
    };
    let mut out = vec![
        format!("{comment} {} ({})", ir.suggested_filename, ir.language),
        format!("{comment} {}", ir.summary),
    ];
    for module in &ir.modules {
        out.push(comment.to_string());
        out.push(format!("{comment} {} {}", module.kind, module.name));
        for function in &module.functions {
            out.push(format!(
                "{comment}{INDENT}{}({})",
                function.name,
                params(function).join(", ")
            ));
        }
    }
    out.join("\n")
}

/// Skeleton source for the modernized target of `ir`
#[must_use]
pub fn generate_skeleton(ir: &ProjectIR) -> String {
    let mut text = match ir.language.as_str() {
        "python" => python(ir),
        "java" => java(ir),
        "javascript" | "typescript" => javascript(ir),
        _ => outline(ir),
    };
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use modernizer_ir::validate;
    use modernizer_test_utils::calc_ir_json;
    use serde_json::json;

    fn ir_for(language: &str, kind: &str) -> ProjectIR {
        let mut value = calc_ir_json();
        value["language"] = json!(language);
        value["modules"][0]["type"] = json!(kind);
        validate(&value).unwrap()
    }

    #[test]
    fn python_module_functions() {
        let text = generate_skeleton(&ir_for("python", "module"));
        assert!(text.contains("def add(a, b):"));
        assert!(text.contains("\n    a: number\n"));
        assert!(text.contains("raise NotImplementedError"));
    }

    #[test]
    fn python_class_methods_take_self() {
        let text = generate_skeleton(&ir_for("python", "class"));
        assert!(text.contains("class calc:"));
        assert!(text.contains("    def add(self, a, b):"));
    }

    #[test]
    fn java_module_is_final_class_with_static_methods() {
        let text = generate_skeleton(&ir_for("java", "module"));
        assert!(text.contains("public final class calc {"));
        assert!(text.contains("public static Object add(Object a, Object b) {"));
    }

    #[test]
    fn java_interface_declares_only() {
        let text = generate_skeleton(&ir_for("java", "interface"));
        assert!(text.contains("public interface calc {"));
        assert!(text.contains("    Object add(Object a, Object b);"));
        assert!(!text.contains("throw new"));
    }

    #[test]
    fn javascript_exports_functions() {
        let text = generate_skeleton(&ir_for("javascript", "module"));
        assert!(text.contains("export function add(a, b) {"));
    }

    #[test]
    fn other_languages_get_commented_outline() {
        let text = generate_skeleton(&ir_for("go", "module"));
        assert!(text.lines().all(|l| l.starts_with("//")));
        assert!(text.contains("//    add(a, b)"));
    }

    #[test]
    fn skeleton_is_deterministic() {
        let ir = ir_for("python", "class");
        assert_eq!(generate_skeleton(&ir), generate_skeleton(&ir));
    }
}
