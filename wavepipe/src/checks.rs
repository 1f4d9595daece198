//! Startup-time predicates on the ambient environment. They only produce
//! warnings; nothing here changes how the process runs.

use nix::unistd::{getgid, getuid, User};

pub const ROOT_WARNING: &str = "it is NOT advisable to run wavepipe as root!";
pub const DEBUG_WARNING: &str = "running in debug mode; authentication disabled!";

/// True if the process runs with root's uid or gid, or as a user named root.
pub fn running_as_root() -> bool {
    let uid = getuid();
    if uid.is_root() || getgid().as_raw() == 0 {
        return true;
    }
    matches!(User::from_uid(uid), Ok(Some(user)) if user.name == "root")
}

pub fn startup_warnings(as_root: bool, debug: bool) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if as_root {
        warnings.push(ROOT_WARNING);
    }
    if debug {
        warnings.push(DEBUG_WARNING);
    }
    warnings
}
