//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use cv2doc::{
    Cv2DocError, Experience, Expertise, Language, PageImage, PageRenderer, Pipeline,
    ResumeExtractor, ResumeRecord, Settings, SoftSkill,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const PROMPT: &str = "Tu es un assistant RH. Nous sommes le {date}.";

pub const DOCUMENT_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
    r#"<w:p><w:r><w:t>{{ nom }}</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>{{ t</w:t></w:r><w:r><w:t>éléphone }}</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>{%p for e in expériences %}</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>{{ e.société }} / {{ e.début }}</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>{%p endfor %}</w:t></w:r></w:p>"#,
    r#"</w:body></w:document>"#
);

pub const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><!-- {{ untouched }} --></w:styles>"#;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Write a minimal `.docx` package whose body is `document_xml`.
pub fn write_template(path: &Path, document_xml: &str) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", RELS_XML),
        ("word/document.xml", document_xml),
        ("word/styles.xml", STYLES_XML),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Read one entry of a zip archive as text.
pub fn read_zip_entry(path: &Path, name: &str) -> String {
    use std::io::Read;
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut out = String::new();
    entry.read_to_string(&mut out).unwrap();
    out
}

/// A valid PDF with one blank page per entry of `widths` (points), 842 pt tall.
pub fn minimal_pdf(widths: &[u32]) -> Vec<u8> {
    let kids = (0..widths.len())
        .map(|i| format!("{} 0 R", i + 3))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", widths.len()),
    ];
    for w in widths {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} 842] /Resources << >> >>"
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}

pub fn sample_record() -> ResumeRecord {
    ResumeRecord {
        full_name: "Jean Dupont".into(),
        phone_e164: "+33601020304".into(),
        primary_industry: "Banque".into(),
        expertises: vec![Expertise {
            title: "Développement Back-end".into(),
            bullet_skills: "• Rust\n • PostgreSQL".into(),
            level: "Expert".into(),
        }],
        soft_skills: vec![SoftSkill {
            text: "• Esprit d'équipe\n".into(),
        }],
        languages: vec![Language {
            name: "Anglais".into(),
            level: "Courant".into(),
        }],
        experiences: vec![
            experience("ACME", "Janvier 2022"),
            experience("Globex & Co", "2019"),
        ],
    }
}

fn experience(company: &str, start: &str) -> Experience {
    Experience {
        start: start.into(),
        end: "En cours".into(),
        company: company.into(),
        industry: "• Banque\n".into(),
        program: "Refonte paiements".into(),
        role: "• Tech Lead\n".into(),
        objective: "Migrer le coeur de paiement".into(),
        activities: "• Conception\n • Revue de code".into(),
        tech_environment: "• Rust\n • Kafka".into(),
        mobilized_expertise: "• Architecture\n".into(),
    }
}

// ── Stubs ────────────────────────────────────────────────────────────────

/// Renderer returning `pages` fake images; records each path it was given
/// and whether the file existed at that moment.
pub struct StubRenderer {
    pages: usize,
    pub seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl StubRenderer {
    pub fn new(pages: usize) -> Arc<Self> {
        Arc::new(Self {
            pages,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<(PathBuf, bool)> {
        self.seen.lock().unwrap().clone()
    }
}

impl PageRenderer for StubRenderer {
    fn render(&self, pdf_path: &Path) -> Result<Vec<PageImage>, Cv2DocError> {
        self.seen
            .lock()
            .unwrap()
            .push((pdf_path.to_path_buf(), pdf_path.exists()));
        Ok((0..self.pages)
            .map(|i| PageImage::new("image/jpeg", format!("PAGE{i}")))
            .collect())
    }
}

type ErrorFactory = Box<dyn Fn() -> Cv2DocError + Send + Sync>;

/// Extractor returning a fixed record, or a fixed error.
pub struct StubExtractor {
    outcome: Result<ResumeRecord, ErrorFactory>,
    pub page_counts: Mutex<Vec<usize>>,
}

impl StubExtractor {
    pub fn returning(record: ResumeRecord) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(record),
            page_counts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(make: impl Fn() -> Cv2DocError + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(Box::new(make)),
            page_counts: Mutex::new(Vec::new()),
        })
    }

    pub fn provider_error(message: &'static str) -> Arc<Self> {
        Self::failing(move || Cv2DocError::Provider {
            message: message.to_string(),
        })
    }
}

#[async_trait]
impl ResumeExtractor for StubExtractor {
    async fn extract(&self, pages: &[PageImage]) -> Result<ResumeRecord, Cv2DocError> {
        self.page_counts.lock().unwrap().push(pages.len());
        match &self.outcome {
            Ok(record) => Ok(record.clone()),
            Err(make) => Err(make()),
        }
    }
}

// ── Workspace ────────────────────────────────────────────────────────────

/// A temp directory holding a prompt file and a template, with settings
/// pointing at them and at `json/` and `docs/` output directories.
pub struct Workspace {
    pub dir: TempDir,
    pub settings: Settings,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_document(DOCUMENT_XML)
    }

    pub fn with_document(document_xml: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("prompt.txt"), PROMPT).unwrap();
        write_template(&root.join("template.docx"), document_xml);

        let settings = Settings::builder()
            .api_key("test-key")
            .prompt_path(root.join("prompt.txt"))
            .json_output_dir(root.join("out/json"))
            .results_dir(root.join("out/docs"))
            .template_path(root.join("template.docx"))
            .build()
            .unwrap();

        Self { dir, settings }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn pipeline(
        &self,
        renderer: Arc<dyn PageRenderer>,
        extractor: Arc<dyn ResumeExtractor>,
    ) -> Pipeline {
        Pipeline::new(self.settings.clone(), renderer, extractor)
    }

    /// Create an input file under `in/` and return its path.
    pub fn input(&self, name: &str) -> PathBuf {
        let dir = self.root().join("in");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, minimal_pdf(&[595])).unwrap();
        path
    }
}
