//! Model pack catalog and install locations.

use std::path::{Path, PathBuf};

use super::Availability;

/// One downloadable recognition model pack.
#[derive(Debug, Clone, Copy)]
pub struct PackInfo {
    pub name: &'static str,
    pub url: &'static str,
    pub description: &'static str,
    pub size_mb: u64,
}

/// Packs this build knows how to install.
pub const PACKS: &[PackInfo] = &[
    PackInfo {
        name: "tiny",
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.bin",
        description: "~75 MB - Fastest, lower quality",
        size_mb: 75,
    },
    PackInfo {
        name: "base",
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.bin",
        description: "~142 MB - Fast, decent quality",
        size_mb: 142,
    },
    PackInfo {
        name: "small",
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.bin",
        description: "~466 MB - Balanced (recommended)",
        size_mb: 466,
    },
    PackInfo {
        name: "medium",
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-medium.bin",
        description: "~1.5 GB - Better quality, slower",
        size_mb: 1500,
    },
];

/// Pack used when settings do not name one.
pub const DEFAULT_PACK: &str = "small";

/// A pack file smaller than this is a truncated download, not a model.
const MIN_PACK_BYTES: u64 = 1024 * 1024;

/// Look up a pack by name.
pub fn find(name: &str) -> Option<&'static PackInfo> {
    PACKS.iter().find(|pack| pack.name == name)
}

/// Directory packs are installed into.
pub fn packs_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("murmur")
        .join("models")
}

impl PackInfo {
    /// Install path inside `dir`.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("ggml-{}.bin", self.name))
    }

    /// Default install path.
    pub fn install_path(&self) -> PathBuf {
        self.path_in(&packs_dir())
    }

    pub fn installed_in(&self, dir: &Path) -> bool {
        verify(&self.path_in(dir))
    }
}

/// Whether `path` holds a plausibly complete pack file.
fn verify(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.len() >= MIN_PACK_BYTES,
        Err(_) => false,
    }
}

/// Availability of the pack named `name`, checking `dir` for installs.
pub fn availability_in(name: &str, dir: &Path) -> Availability {
    match find(name) {
        None => Availability::Unavailable,
        Some(pack) if pack.installed_in(dir) => Availability::Available,
        Some(_) => Availability::Downloadable,
    }
}

/// Availability of the pack named `name` under the default install dir.
pub fn availability(name: &str) -> Availability {
    availability_in(name, &packs_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pack_is_in_catalog() {
        assert!(find(DEFAULT_PACK).is_some());
    }

    #[test]
    fn test_find_unknown_pack() {
        assert!(find("enormous").is_none());
    }

    #[test]
    fn test_install_path_format() {
        let pack = find("tiny").unwrap();
        let path = pack.path_in(Path::new("/data/packs"));
        assert_eq!(path, Path::new("/data/packs/ggml-tiny.bin"));
    }

    #[test]
    fn test_availability_transitions() {
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(
            availability_in("enormous", dir.path()),
            Availability::Unavailable
        );
        assert_eq!(
            availability_in("base", dir.path()),
            Availability::Downloadable
        );

        // An undersized file is a truncated download, still downloadable.
        let dest = find("base").unwrap().path_in(dir.path());
        std::fs::write(&dest, b"stub").unwrap();
        assert_eq!(
            availability_in("base", dir.path()),
            Availability::Downloadable
        );

        std::fs::write(&dest, vec![0u8; 2 * 1024 * 1024]).unwrap();
        assert_eq!(
            availability_in("base", dir.path()),
            Availability::Available
        );
    }
}
