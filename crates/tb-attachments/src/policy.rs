//! Upload policy

use tb_core::ValidationErrors;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Matches the `attachments.filename` column
pub const MAX_FILENAME_LENGTH: usize = 255;

const BLOCKED_MIME_TYPES: &[&str] = &[
    "application/x-msdownload",
    "application/x-msdos-program",
    "application/x-executable",
    "application/x-sh",
    "application/x-bat",
    "application/vnd.microsoft.portable-executable",
];

const BLOCKED_EXTENSIONS: &[&str] = &["exe", "bat", "cmd", "com", "msi", "scr", "sh", "ps1"];

#[derive(Debug, Clone)]
pub struct AllowedFileTypes {
    pub blocked_mime_types: Vec<String>,
    pub blocked_extensions: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
}

impl Default for AllowedFileTypes {
    fn default() -> Self {
        Self {
            blocked_mime_types: BLOCKED_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            blocked_extensions: BLOCKED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl AllowedFileTypes {
    pub fn with_max_file_size(max_file_size: u64) -> Self {
        Self {
            max_file_size,
            ..Self::default()
        }
    }

    pub fn is_allowed(&self, filename: &str, content_type: &str) -> bool {
        let content_type = content_type.trim().to_ascii_lowercase();
        if self.blocked_mime_types.iter().any(|t| *t == content_type) {
            return false;
        }
        let extension = normalize_filename(filename)
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        !matches!(extension, Some(ext) if self.blocked_extensions.contains(&ext))
    }

    /// Content type to store: the client's declared type unless it is missing
    /// or generic, then a guess from the filename
    pub fn content_type_for(&self, filename: &str, declared: Option<&str>) -> String {
        match declared.map(str::trim) {
            Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
            _ => mime_guess::from_path(filename)
                .first_or_octet_stream()
                .to_string(),
        }
    }

    /// Validate an upload; `filename` should already be normalized
    pub fn check(&self, filename: &str, content_type: &str, size: u64) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if filename.is_empty() {
            errors.add("filename", "can't be blank");
        }
        if filename.chars().count() > MAX_FILENAME_LENGTH {
            errors.add(
                "filename",
                format!("is too long (maximum is {MAX_FILENAME_LENGTH} characters)"),
            );
        }
        if size == 0 {
            errors.add("file", "must not be empty");
        }
        if size > self.max_file_size {
            errors.add(
                "file",
                format!("is too large (maximum is {} bytes)", self.max_file_size),
            );
        }
        if !self.is_allowed(filename, content_type) {
            errors.add("file", "has a file type that is not allowed");
        }
        errors.into_result()
    }
}

/// The name a file is stored and served under: the last path segment, with
/// control characters removed and surrounding whitespace and trailing dots
/// dropped (`"setup.exe. "` is `"setup.exe"` to most filesystems)
pub fn normalize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    cleaned
        .trim()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_file_types() {
        let allowed = AllowedFileTypes::default();
        assert!(allowed.is_allowed("photo.png", "image/png"));
        assert!(allowed.is_allowed("report.pdf", "application/pdf"));
        assert!(!allowed.is_allowed("setup.exe", "application/octet-stream"));
        assert!(!allowed.is_allowed("payload.bin", "application/x-msdownload"));
        assert!(!allowed.is_allowed("RUN.BAT", "text/plain"));
    }

    #[test]
    fn test_trailing_dots_and_spaces_do_not_hide_extension() {
        let allowed = AllowedFileTypes::default();
        assert!(!allowed.is_allowed("setup.exe ", "application/octet-stream"));
        assert!(!allowed.is_allowed("setup.exe.", "application/octet-stream"));
        assert!(!allowed.is_allowed("setup.exe. . ", "text/plain"));
        assert!(!allowed.is_allowed("setup.exe\0", "text/plain"));
    }

    #[test]
    fn test_normalize_filename() {
        assert_eq!(normalize_filename("  report.pdf "), "report.pdf");
        assert_eq!(normalize_filename("setup.exe."), "setup.exe");
        assert_eq!(normalize_filename("setup.exe . "), "setup.exe");
        assert_eq!(normalize_filename("C:\\Users\\me\\notes.txt"), "notes.txt");
        assert_eq!(normalize_filename("../../etc/passwd"), "passwd");
        assert_eq!(normalize_filename("tab\tname.txt"), "tabname.txt");
        assert_eq!(normalize_filename(" . "), "");
    }

    #[test]
    fn test_check_filename_length_and_blank() {
        let policy = AllowedFileTypes::default();
        let longest = format!("{}.txt", "a".repeat(MAX_FILENAME_LENGTH - 4));
        assert!(policy.check(&longest, "text/plain", 1).is_ok());

        let too_long = format!("{}.txt", "a".repeat(MAX_FILENAME_LENGTH));
        let errors = policy.check(&too_long, "text/plain", 1).unwrap_err();
        assert!(errors.has_error("filename"));

        let errors = policy.check("", "text/plain", 1).unwrap_err();
        assert!(errors.has_error("filename"));
    }

    #[test]
    fn test_content_type_fallback() {
        let allowed = AllowedFileTypes::default();
        assert_eq!(allowed.content_type_for("a.png", None), "image/png");
        assert_eq!(
            allowed.content_type_for("a.png", Some("application/octet-stream")),
            "image/png"
        );
        assert_eq!(allowed.content_type_for("a.bin", Some("text/csv")), "text/csv");
        assert_eq!(
            allowed.content_type_for("noext", None),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_check_size_limits() {
        let policy = AllowedFileTypes::with_max_file_size(10);
        assert!(policy.check("a.txt", "text/plain", 10).is_ok());

        let errors = policy.check("a.txt", "text/plain", 11).unwrap_err();
        assert!(errors.has_error("file"));

        let errors = policy.check("a.txt", "text/plain", 0).unwrap_err();
        assert_eq!(errors.get("file").map(Vec::len), Some(1));

        assert_eq!(AllowedFileTypes::default().max_file_size, 10 * 1024 * 1024);
    }
}
