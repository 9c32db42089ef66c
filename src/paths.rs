use anyhow::Result;
use std::{env, path::PathBuf};

#[derive(Clone, Debug)]
pub struct Paths {
    pub home: PathBuf,
    pub settings: PathBuf,
}

/// `$XDG_CONFIG_HOME/gitstate`, or `$HOME/.config/gitstate` when unset.
pub fn gitstate_home() -> Result<PathBuf> {
    let xdg = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty());
    let base = xdg
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config"));
    Ok(base.join("gitstate"))
}

pub fn paths() -> Result<Paths> {
    let home = gitstate_home()?;
    Ok(Paths {
        settings: home.join("settings.toml"),
        home,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn home_prefers_xdg_config_home() {
        let prev = env::var_os("XDG_CONFIG_HOME");
        unsafe { env::set_var("XDG_CONFIG_HOME", "/tmp/xdg") };
        let p = paths().unwrap();
        assert_eq!(p.home, PathBuf::from("/tmp/xdg/gitstate"));
        assert_eq!(p.settings, PathBuf::from("/tmp/xdg/gitstate/settings.toml"));
        match prev {
            Some(v) => unsafe { env::set_var("XDG_CONFIG_HOME", v) },
            None => unsafe { env::remove_var("XDG_CONFIG_HOME") },
        }
    }

    #[test]
    #[serial]
    fn home_falls_back_to_dot_config() {
        let prev_xdg = env::var_os("XDG_CONFIG_HOME");
        let prev_home = env::var_os("HOME");
        unsafe {
            env::remove_var("XDG_CONFIG_HOME");
            env::set_var("HOME", "/home/alice");
        }
        assert_eq!(
            gitstate_home().unwrap(),
            PathBuf::from("/home/alice/.config/gitstate")
        );
        unsafe {
            if let Some(v) = prev_xdg {
                env::set_var("XDG_CONFIG_HOME", v);
            }
            match prev_home {
                Some(v) => env::set_var("HOME", v),
                None => env::remove_var("HOME"),
            }
        }
    }
}
