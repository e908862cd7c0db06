//! Fixtures shared by unit tests.

use std::io::Write;
use std::path::{Path, PathBuf};

/// Write an executable `#!/bin/sh` script named `name` into `dir` with the given mode.
pub(crate) fn write_script(dir: &Path, name: &str, body: &str, mode: u32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    {
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "{}", body).unwrap();
        file.sync_all().unwrap();
    }
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
    path
}
