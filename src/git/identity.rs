//! Run-as identity resolution through the system user database.

use std::ffi::{CStr, CString};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use crate::error::{ConvergeError, Result};

/// A resolved user that git invocations run as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub uid: u32,
    /// Primary group; `None` when a bare numeric uid has no passwd entry.
    pub gid: Option<u32>,
    pub home: Option<PathBuf>,
}

impl Identity {
    /// Switch the child process to this identity before exec.
    pub fn apply(&self, cmd: &mut Command) {
        if let Some(gid) = self.gid {
            cmd.gid(gid);
        }
        cmd.uid(self.uid);
        if let Some(home) = &self.home {
            cmd.env("HOME", home);
        }
    }
}

/// Resolve a user name or numeric uid.
///
/// A numeric uid without a passwd entry is still accepted and keeps the
/// caller's group.
pub fn resolve_identity(user: &str) -> Result<Identity> {
    let numeric = user.parse::<u32>().ok();
    match lookup(user, numeric)? {
        Some(id) => Ok(id),
        None => match numeric {
            Some(uid) => Ok(Identity {
                name: user.to_string(),
                uid,
                gid: None,
                home: None,
            }),
            None => Err(ConvergeError::UnknownUser(user.to_string())),
        },
    }
}

fn lookup(user: &str, numeric: Option<u32>) -> Result<Option<Identity>> {
    let cname = match numeric {
        Some(_) => None,
        None => Some(
            CString::new(user).map_err(|_| ConvergeError::UnknownUser(user.to_string()))?,
        ),
    };

    let mut buf: Vec<libc::c_char> = vec![0; 4096];
    loop {
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();

        let rc = unsafe {
            match (&cname, numeric) {
                (Some(c), _) => libc::getpwnam_r(
                    c.as_ptr(),
                    &mut pwd,
                    buf.as_mut_ptr(),
                    buf.len(),
                    &mut result,
                ),
                (None, Some(uid)) => libc::getpwuid_r(
                    uid,
                    &mut pwd,
                    buf.as_mut_ptr(),
                    buf.len(),
                    &mut result,
                ),
                (None, None) => unreachable!("name or uid is always set"),
            }
        };

        if rc == libc::ERANGE && buf.len() < 1 << 20 {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if rc != 0 || result.is_null() {
            return Ok(None);
        }

        // Pointers in `pwd` point into `buf`, which is still alive here.
        let name = unsafe { CStr::from_ptr(pwd.pw_name) }
            .to_string_lossy()
            .into_owned();
        let home = if pwd.pw_dir.is_null() {
            None
        } else {
            let dir = unsafe { CStr::from_ptr(pwd.pw_dir) }.to_string_lossy().into_owned();
            (!dir.is_empty()).then(|| PathBuf::from(dir))
        };
        return Ok(Some(Identity {
            name,
            uid: pwd.pw_uid,
            gid: Some(pwd.pw_gid),
            home,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_root_by_name_and_uid() {
        let by_name = resolve_identity("root").unwrap();
        assert_eq!(by_name.uid, 0);
        assert_eq!(by_name.gid, Some(0));

        let by_uid = resolve_identity("0").unwrap();
        assert_eq!(by_uid.name, "root");
        assert_eq!(by_uid.uid, 0);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = resolve_identity("no-such-user-gitstate-test").unwrap_err();
        assert!(matches!(err, ConvergeError::UnknownUser(_)));
    }

    #[test]
    fn interior_nul_is_an_error() {
        assert!(matches!(
            resolve_identity("ro\0ot"),
            Err(ConvergeError::UnknownUser(_))
        ));
    }

    #[test]
    fn unmapped_numeric_uid_keeps_caller_group() {
        let id = resolve_identity("4000000000").unwrap();
        assert_eq!(id.uid, 4_000_000_000);
        assert_eq!(id.gid, None);
        assert_eq!(id.home, None);
    }
}
