//! Kernel-language text for functions.

use itertools::Itertools;

use crate::function::Function;

const BODY_INDENT: &str = "    ";

impl Function {
    /// Prototype, e.g. `double square(double x);`.
    pub fn signature(&self) -> String {
        format!("{} {}({});", self.return_type(), self.name(), self.parameter_list())
    }

    /// Plain definition without guard or dependencies.
    pub fn definition(&self) -> String {
        let body = dedent(self.body());
        let mut code = format!("{} {}({}){{\n", self.return_type(), self.name(), self.parameter_list());
        for line in body.lines() {
            if !line.trim().is_empty() {
                code.push_str(BODY_INDENT);
                code.push_str(line);
            }
            code.push('\n');
        }
        code.push('}');
        code
    }

    /// Include guard symbol, derived from the name only.
    pub fn guard_name(&self) -> String {
        format!("INCLUDE_GUARD_{}", self.name())
    }

    /// Extra code and definition wrapped in the include guard.
    pub fn guarded_definition(&self) -> String {
        let guard = self.guard_name();
        let mut code = format!("#ifndef {guard}\n#define {guard}\n");
        if let Some(extra) = self.extra() {
            code.push_str(extra.trim_matches('\n'));
            code.push('\n');
        }
        code.push_str(&self.definition());
        code.push_str(&format!("\n#endif // {guard}\n"));
        code
    }

    /// Complete compilable code: every dependency's guarded definition (dependencies first,
    /// each once) followed by this function's own.
    pub fn cl_code(&self) -> String {
        self.dependency_order().iter().map(Function::guarded_definition).join("\n")
    }

    fn parameter_list(&self) -> String {
        self.parameters().iter().map(|parameter| parameter.signature()).join(", ")
    }
}

/// Strips blank leading and trailing lines, trailing whitespace and the common indentation.
fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let first = lines.iter().position(|line| !line.trim().is_empty());
    let last = lines.iter().rposition(|line| !line.trim().is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };
    let lines = &lines[first..=last];

    // Only ASCII blanks count, so the slice below stays on a char boundary.
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    lines.iter().map(|line| if line.trim().is_empty() { "" } else { line[indent..].trim_end() }).join("\n")
}
