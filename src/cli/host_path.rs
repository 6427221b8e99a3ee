use std::path::PathBuf;

/// Path of the host binary installed next to `path`.
pub fn to_host_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("webtally-host");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::to_host_path;

    #[cfg(not(windows))]
    #[test]
    fn test_host_lives_next_to_cli() {
        assert_eq!(
            to_host_path(PathBuf::from("/usr/local/bin/webtally")),
            PathBuf::from("/usr/local/bin/webtally-host")
        );
    }
}
