//! Extraction of base images from Dockerfile `FROM` lines

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

const FROM_PATTERN: &str = r"(?im)^FROM\s*([^\s]+)(\s*AS\s[a-zA-Z0-9]+)?\s*$";

/// Finds the non-official base images a Dockerfile builds from
#[derive(Debug, Clone)]
pub struct DockerfileScanner {
    from_line: Regex,
}

impl DockerfileScanner {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            from_line: Regex::new(FROM_PATTERN)?,
        })
    }

    /// Images named on `FROM` lines that contain a `/`
    ///
    /// Official single-name images like `alpine:3.19` are left out, they
    /// never need credentials.
    pub fn images(&self, content: &str) -> Vec<String> {
        self.from_line
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|image| image.contains('/'))
            .map(str::to_string)
            .collect()
    }

    pub fn images_in_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<String>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(self.images(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_multi_stage_dockerfile() {
        let dockerfile = "\
FROM golang:1.22 AS builder
RUN go build ./...

from gcr.io/distroless/static:nonroot as runtime
COPY --from=builder /app /app

FROM registry.example.com/team/base:2
";
        let scanner = DockerfileScanner::new().unwrap();
        assert_eq!(
            scanner.images(dockerfile),
            vec![
                "gcr.io/distroless/static:nonroot".to_string(),
                "registry.example.com/team/base:2".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_from_lines() {
        let scanner = DockerfileScanner::new().unwrap();
        assert!(scanner.images("RUN echo FROM nowhere/image\n").is_empty());
    }

    #[test]
    fn test_images_in_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "FROM extensions/docker:stable").unwrap();

        let scanner = DockerfileScanner::new().unwrap();
        assert_eq!(
            scanner.images_in_file(file.path()).unwrap(),
            vec!["extensions/docker:stable".to_string()]
        );
    }

    #[test]
    fn test_missing_file() {
        let scanner = DockerfileScanner::new().unwrap();
        assert!(scanner.images_in_file("/nonexistent/Dockerfile").is_err());
    }
}
