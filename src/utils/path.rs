//! Path manipulation utilities

use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving `.` and `..` components
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {
                // Skip '.' components
            }
            Component::ParentDir => {
                // Handle '..' by popping the last component if possible
                match components.last() {
                    None | Some(Component::ParentDir) => components.push(component),
                    Some(Component::RootDir | Component::Prefix(_)) => {}
                    Some(_) => {
                        components.pop();
                    }
                }
            }
            _ => {
                components.push(component);
            }
        }
    }

    components.iter().collect()
}

/// Expand a leading `~` or `~/` to the given home directory
#[must_use]
pub fn expand_user(path: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(path);
    };

    if path == "~" {
        return home.to_path_buf();
    }

    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
    }

    #[test]
    fn test_expand_user() {
        let home = Path::new("/home/me");
        assert_eq!(expand_user("~", Some(home)), PathBuf::from("/home/me"));
        assert_eq!(expand_user("~/notes.txt", Some(home)), PathBuf::from("/home/me/notes.txt"));
        assert_eq!(expand_user("~other/x", Some(home)), PathBuf::from("~other/x"));
        assert_eq!(expand_user("~/x", None), PathBuf::from("~/x"));
    }
}
