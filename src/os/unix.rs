use std::os::unix::fs::PermissionsExt;
use std::{path::Path, sync::LazyLock};

/// What a file is used for, which decides its full permission mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionClass {
    Executable,
    Data,
}

pub fn get_umask() -> u32 {
    static UMASK: LazyLock<u32> = LazyLock::new(|| {
        let value = unsafe {
            // SAFETY: we're only getting and setting integers.
            let current = libc::umask(0o022);
            libc::umask(current);
            current
        };
        // Cast used because it might be u16 on macOS.
        value as u32
    });

    *UMASK
}

pub fn get_effective_posix_permission(class: PermissionClass) -> u32 {
    let full = match class {
        PermissionClass::Executable => 0o777,
        PermissionClass::Data => 0o666,
    };
    full & !get_umask()
}

pub fn set_posix_permission(target: &Path, mode: u32) -> std::io::Result<()> {
    let mut perm = target.metadata()?.permissions();
    perm.set_mode(mode);
    std::fs::set_permissions(target, perm)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_permission_respects_umask() {
        let umask = get_umask();

        let exe = get_effective_posix_permission(PermissionClass::Executable);
        let data = get_effective_posix_permission(PermissionClass::Data);

        assert_eq!(exe & umask, 0);
        assert_eq!(data & 0o111, 0);
        assert_eq!(exe & !0o777, 0);
    }
}
