use flate2::read::GzDecoder;
use mcxb_types::StrategyError;
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::Archive;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveKind::TarGz => "tar.gz",
            ArchiveKind::Zip => "zip",
        }
    }
}

pub fn extract_archive(archive: &Path, kind: ArchiveKind, dest: &Path) -> Result<(), StrategyError> {
    std::fs::create_dir_all(dest)
        .map_err(|e| StrategyError::Failed(format!("Failed to create {:?}: {}", dest, e)))?;

    match kind {
        ArchiveKind::TarGz => extract_tar_gz(archive, dest),
        ArchiveKind::Zip => extract_zip(archive, dest),
    }
}

fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<(), StrategyError> {
    let file = File::open(archive_path)
        .map_err(|e| StrategyError::Failed(format!("Failed to open archive: {}", e)))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let entries = archive
        .entries()
        .map_err(|e| StrategyError::Failed(format!("Failed to read archive: {}", e)))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| StrategyError::Failed(format!("Failed to read archive entry: {}", e)))?;
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| StrategyError::Failed(format!("Failed to extract entry: {}", e)))?;
        if !unpacked {
            let name = entry
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(StrategyError::Failed(format!(
                "Refusing archive entry outside destination: {}",
                name
            )));
        }
    }

    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<(), StrategyError> {
    let file = File::open(archive_path)
        .map_err(|e| StrategyError::Failed(format!("Failed to open archive: {}", e)))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| StrategyError::Failed(format!("Failed to read zip archive: {}", e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| StrategyError::Failed(format!("Failed to read zip entry: {}", e)))?;

        let relative = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => {
                return Err(StrategyError::Failed(format!(
                    "Refusing archive entry outside destination: {}",
                    entry.name()
                )))
            }
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)
                .map_err(|e| StrategyError::Failed(format!("Failed to create dir: {}", e)))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StrategyError::Failed(format!("Failed to create dir: {}", e)))?;
        }
        let mut out = File::create(&out_path)
            .map_err(|e| StrategyError::Failed(format!("Failed to create file: {}", e)))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|e| StrategyError::Failed(format!("Failed to extract entry: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
            }
        }
    }

    Ok(())
}

/// Finds the runtime executable under `root`, looking first at `root` itself
/// and then one directory level down (vendor archives wrap everything in a
/// versioned top-level folder).
pub fn resolve_executable(root: &Path, candidates: &[PathBuf]) -> Option<PathBuf> {
    for relative in candidates {
        let direct = root.join(relative);
        if direct.is_file() {
            return Some(direct);
        }
    }

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();

    for dir in subdirs {
        for relative in candidates {
            let nested = dir.join(relative);
            if nested.is_file() {
                return Some(nested);
            }
        }
    }

    None
}

pub fn ensure_executable(path: &Path) -> Result<(), StrategyError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .map_err(|e| StrategyError::Failed(format!("Failed to get permissions: {}", e)))?
            .permissions();
        if perms.mode() & 0o111 == 0 {
            perms.set_mode(0o755);
            std::fs::set_permissions(path, perms)
                .map_err(|e| StrategyError::Failed(format!("Failed to set permissions: {}", e)))?;
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn java_candidates() -> Vec<PathBuf> {
        vec![PathBuf::from("bin/java")]
    }

    fn build_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn build_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, data) in entries {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extract_tar_gz_nested_layout() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("jre.tar.gz");
        build_tar_gz(
            &archive,
            &[
                ("jdk-17.0.9+9-jre/bin/java", b"#!/bin/sh\n"),
                ("jdk-17.0.9+9-jre/release", b"JAVA_VERSION=17"),
            ],
        );

        let dest = dir.path().join("jre");
        extract_archive(&archive, ArchiveKind::TarGz, &dest).unwrap();

        let exe = resolve_executable(&dest, &java_candidates()).unwrap();
        assert_eq!(exe, dest.join("jdk-17.0.9+9-jre/bin/java"));
    }

    #[test]
    fn test_extract_zip_flat_layout() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("jre.zip");
        build_zip(&archive, &[("bin/java", b"binary"), ("lib/modules", b"mods")]);

        let dest = dir.path().join("jre");
        extract_archive(&archive, ArchiveKind::Zip, &dest).unwrap();

        let exe = resolve_executable(&dest, &java_candidates()).unwrap();
        assert_eq!(exe, dest.join("bin/java"));
        assert_eq!(std::fs::read(exe).unwrap(), b"binary");
    }

    #[test]
    fn test_resolve_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("jdk/lib")).unwrap();
        assert!(resolve_executable(dir.path(), &java_candidates()).is_none());
        assert!(resolve_executable(&dir.path().join("absent"), &java_candidates()).is_none());
    }

    #[test]
    fn test_resolve_does_not_descend_two_levels() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a/b/bin");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(deep.join("java"), b"x").unwrap();
        assert!(resolve_executable(dir.path(), &java_candidates()).is_none());
    }

    #[test]
    fn test_corrupt_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.tar.gz");
        std::fs::write(&archive, b"definitely not gzip").unwrap();
        let result = extract_archive(&archive, ArchiveKind::TarGz, &dir.path().join("out"));
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_executable_sets_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("java");
        std::fs::write(&exe, b"x").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o644)).unwrap();

        ensure_executable(&exe).unwrap();
        let mode = std::fs::metadata(&exe).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
