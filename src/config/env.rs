use anyhow::Context;
use anyhow::Result;
use std::env::var;
use std::path::PathBuf;

pub struct Env {
    pub home_dir: PathBuf,
}

impl Env {
    /// Construct an environment from the user's host environment
    pub fn from_host() -> Result<Self> {
        #[cfg(target_os = "windows")]
        let home_var = "USERPROFILE";
        #[cfg(not(target_os = "windows"))]
        let home_var = "HOME";

        Ok(Self {
            home_dir: var(home_var)
                .with_context(|| format!("Couldn't get ${home_var} environment variable"))?
                .into(),
        })
    }

    /// Construct a mock environment for tests
    #[cfg(test)]
    pub fn mock() -> Self {
        Self {
            home_dir: PathBuf::from("/Users/user"),
        }
    }
}
