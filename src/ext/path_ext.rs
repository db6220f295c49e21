use std::path::{Component, Path, PathBuf};

/// Path helpers shared by the index and its error messages.
pub trait PathExt {
    /// Canonical form of the path when it exists, otherwise an absolute,
    /// lexically normalized form. Only meant for display.
    fn best_effort_display(&self) -> String;

    /// The leaf segment shown for an entry. Empty for paths without a final
    /// segment, such as `/`.
    fn leaf_label(&self) -> String;

    /// Rebases `self` from below `old_prefix` to below `new_prefix`.
    /// Returns `None` when `self` is not inside `old_prefix`.
    fn rebase(&self, old_prefix: &Path, new_prefix: &Path) -> Option<PathBuf>;
}

impl PathExt for Path {
    fn best_effort_display(&self) -> String {
        match self.canonicalize() {
            Ok(canonical_path) => canonical_path.display().to_string(),
            Err(_) => {
                let absolute_path = if self.is_absolute() {
                    self.to_path_buf()
                } else {
                    match std::env::current_dir() {
                        Ok(current_dir) => current_dir.join(self),
                        Err(_) => self.to_path_buf(),
                    }
                };
                normalize(&absolute_path).display().to_string()
            }
        }
    }

    fn leaf_label(&self) -> String {
        match self.components().next_back() {
            Some(Component::Normal(name)) => name.to_string_lossy().into_owned(),
            _ => String::new(),
        }
    }

    fn rebase(&self, old_prefix: &Path, new_prefix: &Path) -> Option<PathBuf> {
        let rest = self.strip_prefix(old_prefix).ok()?;
        if rest.as_os_str().is_empty() {
            Some(new_prefix.to_path_buf())
        } else {
            Some(new_prefix.join(rest))
        }
    }
}

impl PathExt for PathBuf {
    fn best_effort_display(&self) -> String {
        self.as_path().best_effort_display()
    }

    fn leaf_label(&self) -> String {
        self.as_path().leaf_label()
    }

    fn rebase(&self, old_prefix: &Path, new_prefix: &Path) -> Option<PathBuf> {
        self.as_path().rebase(old_prefix, new_prefix)
    }
}

/// Resolves `.` and `..` lexically. `..` never climbs above the root.
fn normalize(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}
