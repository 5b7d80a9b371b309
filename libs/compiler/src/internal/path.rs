use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Lexically normalise `path`: collapse `.` segments and resolve `..` against the preceding
/// segment without touching the filesystem. A `..` directly under the root is dropped, as on
/// every platform the parent of `/` is `/` itself.
pub fn normalize_path(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
      Component::CurDir => {}
      Component::ParentDir => {
        let last = normalized.components().next_back();
        if matches!(last, Some(Component::Normal(_))) {
          normalized.pop();
        } else if !normalized.has_root() {
          normalized.push("..");
        }
      }
      Component::Normal(segment) => normalized.push(segment),
    }
  }
  if normalized.as_os_str().is_empty() {
    normalized.push(".");
  }
  normalized
}

/// The filesystem root `path` lives under (`/` on Unix, `C:\` on Windows).
pub fn filesystem_root(path: &Path) -> PathBuf {
  path
    .components()
    .take_while(|component| matches!(component, Component::Prefix(_) | Component::RootDir))
    .map(|component| component.as_os_str())
    .collect()
}

/// Join the distinct filesystem roots of `paths` into the comma separated list accepted by
/// `--allow-paths`.
pub fn allow_paths_argument<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> OsString {
  let roots: BTreeSet<PathBuf> = paths.into_iter().map(|path| filesystem_root(path)).collect();
  let mut argument = OsString::new();
  for (index, root) in roots.iter().enumerate() {
    if index > 0 {
      argument.push(",");
    }
    argument.push(root.as_os_str());
  }
  argument
}

/// Name a source is registered under in a per-file invocation.
pub fn file_name_identifier(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Working directory for an invocation compiling `path`.
pub fn parent_dir(path: &Path) -> Option<&Path> {
  path.parent().filter(|parent| !parent.as_os_str().is_empty())
}
