use std::fs;
use std::path::Path;

use anyhow::Context;

/// Swaps `tmp` into place at `dst`, keeping the old file as `.bak` until the
/// rename succeeds.
pub fn replace_file(tmp: &Path, dst: &Path) -> anyhow::Result<()> {
    let backup = dst.with_extension("bak");

    if dst.exists() {
        let _ = fs::remove_file(&backup);
        fs::rename(dst, &backup)
            .with_context(|| format!("failed rename {} -> {}", dst.display(), backup.display()))?;
    }

    if let Err(e) = fs::rename(tmp, dst) {
        if backup.exists() {
            let _ = fs::rename(&backup, dst);
        }
        let _ = fs::remove_file(tmp);
        return Err(anyhow::Error::new(e).context(format!(
            "failed rename {} -> {}",
            tmp.display(),
            dst.display()
        )));
    }

    let _ = fs::remove_file(&backup);
    Ok(())
}

/// Writes `bytes` next to `dst` and swaps it in.
pub fn write_atomic(dst: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory: {}", parent.display()))?;
    }
    let tmp = dst.with_extension("tmp");
    fs::write(&tmp, bytes).with_context(|| format!("write temp: {}", tmp.display()))?;
    replace_file(&tmp, dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_file_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("state.json");
        write_atomic(&dst, b"one").unwrap();
        write_atomic(&dst, b"two").unwrap();

        assert_eq!(fs::read_to_string(&dst).unwrap(), "two");
        assert!(!dst.with_extension("bak").exists());
        assert!(!dst.with_extension("tmp").exists());
    }

    #[test]
    fn missing_temp_keeps_the_original() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("state.json");
        fs::write(&dst, "keep").unwrap();

        let err = replace_file(&dir.path().join("nope.tmp"), &dst).unwrap_err();
        assert!(err.to_string().contains("failed rename"));
        assert_eq!(fs::read_to_string(&dst).unwrap(), "keep");
    }
}
