//! Pipeline stages for resume-to-document conversion.
//!
//! Each submodule implements exactly one transformation step and can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ extract ──▶ template
//! (paths)   (pdfium)   (base64)   (Gemini)    (.docx)
//! ```
//!
//! 1. [`input`]: resolve the CLI path to the PDFs to process
//! 2. [`render`]: rasterise every page at one uniform scale; blocking,
//!    so async callers use `spawn_blocking`
//! 3. [`encode`]: JPEG-encode and base64-wrap each page
//! 4. [`extract`]: one structured-output model call per resume; the only
//!    stage with network I/O
//! 5. [`template`]: fill the `.docx` template from the alias-keyed record

pub mod encode;
pub mod extract;
pub mod input;
pub mod render;
pub mod template;

use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

/// Temp file in `dir` for an output that is replaced atomically on persist.
///
/// Created with mode `0o666` less the umask, like a plain `File::create`,
/// not the owner-only mode of an ordinary temp file.
pub(crate) fn output_staging_file(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".cv2doc-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}
