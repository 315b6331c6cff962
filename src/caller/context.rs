//! Call-site metadata.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Where a manual log call was made, and with which arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub function: &'static str,
    pub file: &'static str,
    pub line: u32,
    /// `(name, Debug rendering)` in call order.
    pub arguments: Vec<(&'static str, String)>,
}

impl CallerContext {
    pub fn new(function: &'static str, file: &'static str, line: u32) -> Self {
        Self {
            function,
            file,
            line,
            arguments: Vec::new(),
        }
    }

    pub fn with_argument<T: fmt::Debug + ?Sized>(mut self, name: &'static str, value: &T) -> Self {
        self.arguments.push((name, format!("{value:?}")));
        self
    }

    /// Arguments as `{a: 1, b: "x"}`.
    pub fn arguments_display(&self) -> String {
        let rendered: Vec<String> = self
            .arguments
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        format!("{{{}}}", rendered.join(", "))
    }

    /// `"{relative file} {function}"`, relative to `cwd`.
    pub fn request_path(&self, cwd: &Path) -> String {
        let file = relative_path(Path::new(self.file), cwd);
        format!("{} {}", file.display(), self.function)
    }
}

/// Strip the module path and closure frames from a `type_name` of a nested
/// item named `f`.
pub fn short_function_name(path: &'static str) -> &'static str {
    let mut path = path.strip_suffix("::f").unwrap_or(path);
    while let Some(outer) = path.strip_suffix("::{{closure}}") {
        path = outer;
    }
    path.rsplit("::").next().unwrap_or(path)
}

/// `file` relative to `cwd`.
///
/// Relative paths are returned unchanged. Absolute paths under `cwd` lose
/// that prefix; other absolute paths keep the components after the first
/// one that differs from `cwd`.
pub fn relative_path(file: &Path, cwd: &Path) -> PathBuf {
    if file.is_relative() {
        return file.to_path_buf();
    }
    if let Ok(inside) = file.strip_prefix(cwd) {
        return inside.to_path_buf();
    }
    let common = file
        .components()
        .zip(cwd.components())
        .take_while(|(a, b)| a == b)
        .count();
    file.components()
        .skip(common)
        .filter(|component| matches!(component, Component::Normal(_)))
        .collect()
}
