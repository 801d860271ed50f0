use super::env::Env;
use std::path::{Path, PathBuf};

// Expand an initial tilde component in the directory
pub fn expand_tilde(dir: &Path, env: &Env) -> PathBuf {
    let mut components = dir.components();
    if let Some(first_component) = components.next() {
        if first_component.as_os_str() == "~" {
            let mut expanded_dir = env.home_dir.clone();
            expanded_dir.extend(components);
            return expanded_dir;
        }
    }
    dir.to_owned()
}
