//! The extracted resume record and its alias table.
//!
//! Internal code uses the English field names of [`ResumeRecord`]. The
//! French business names the model sees, the persisted JSON carries and the
//! document templates reference live in one place: the [`RecordSpec`] tables
//! below. They are consulted only at serialization boundaries:
//!
//! * [`RecordSpec::response_schema`] builds the structured-output schema sent
//!   to the model;
//! * [`ResumeRecord::from_aliased`] decodes the model's aliased JSON;
//! * [`ResumeRecord::to_aliased`] encodes a record for the JSON file and the
//!   template context.
//!
//! Renaming is scoped per record type: `expertises` is the list of expertise
//! groups at the root but the bullet-list text inside a group.

use crate::error::Cv2DocError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// ── Record types ─────────────────────────────────────────────────────────

/// A group of related skills with a seniority level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expertise {
    pub title: String,
    pub bullet_skills: String,
    pub level: String,
}

/// One soft-skill entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftSkill {
    pub text: String,
}

/// A spoken language and proficiency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub name: String,
    pub level: String,
}

/// One work experience. Several fields are pre-formatted bullet lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub start: String,
    pub end: String,
    pub company: String,
    pub industry: String,
    pub program: String,
    pub role: String,
    pub objective: String,
    pub activities: String,
    pub tech_environment: String,
    pub mobilized_expertise: String,
}

/// Everything extracted from one resume.
///
/// Serializes with internal field names; use [`ResumeRecord::to_aliased`] for
/// the alias-keyed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub full_name: String,
    pub phone_e164: String,
    pub primary_industry: String,
    #[serde(default)]
    pub expertises: Vec<Expertise>,
    #[serde(default, rename = "savoir_etre")]
    pub soft_skills: Vec<SoftSkill>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
}

impl ResumeRecord {
    /// Decode alias-keyed JSON (model output, persisted file) into a record.
    pub fn from_aliased(value: Value) -> Result<Self, Cv2DocError> {
        let internal = RESUME.from_alias(value);
        serde_json::from_value(internal).map_err(|e| Cv2DocError::SchemaViolation {
            detail: e.to_string(),
        })
    }

    /// Encode the record with alias keys.
    pub fn to_aliased(&self) -> Result<Value, Cv2DocError> {
        let internal = serde_json::to_value(self)
            .map_err(|e| Cv2DocError::Internal(format!("record serialisation: {e}")))?;
        Ok(RESUME.to_alias(internal))
    }

    /// Alias-keyed, 2-space indented JSON.
    pub fn to_aliased_json_pretty(&self) -> Result<String, Cv2DocError> {
        serde_json::to_string_pretty(&self.to_aliased()?)
            .map_err(|e| Cv2DocError::Internal(format!("record serialisation: {e}")))
    }
}

// ── Alias table ──────────────────────────────────────────────────────────

/// Shape of one field.
#[derive(Debug)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Ordered list of nested records.
    List(&'static RecordSpec),
}

/// One row of the alias table.
#[derive(Debug)]
pub struct FieldSpec {
    /// Internal (Rust) field name.
    pub name: &'static str,
    /// External name used by the model, the JSON file and the templates.
    pub alias: &'static str,
    /// Guidance for the model.
    pub description: &'static str,
    pub examples: &'static [&'static str],
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Text fields must be present; lists may be omitted (empty).
    pub fn is_required(&self) -> bool {
        matches!(self.kind, FieldKind::Text)
    }
}

/// Alias table for one record type.
#[derive(Debug)]
pub struct RecordSpec {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl RecordSpec {
    pub fn field_by_name(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_alias(&self, alias: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.alias == alias)
    }

    /// Rename internal keys to aliases, recursing into list fields.
    ///
    /// Keys absent from the table pass through unchanged.
    pub fn to_alias(&self, value: Value) -> Value {
        self.rename(value, Direction::ToAlias)
    }

    /// Rename alias keys to internal names, recursing into list fields.
    pub fn from_alias(&self, value: Value) -> Value {
        self.rename(value, Direction::FromAlias)
    }

    fn rename(&self, value: Value, direction: Direction) -> Value {
        let Value::Object(map) = value else {
            return value;
        };

        let mut out = Map::with_capacity(map.len());
        for (key, val) in map {
            let field = match direction {
                Direction::ToAlias => self.field_by_name(&key),
                Direction::FromAlias => self.field_by_alias(&key),
            };
            let Some(field) = field else {
                out.insert(key, val);
                continue;
            };
            let target = match direction {
                Direction::ToAlias => field.alias,
                Direction::FromAlias => field.name,
            };
            let val = match (&field.kind, val) {
                (FieldKind::List(child), Value::Array(items)) => Value::Array(
                    items
                        .into_iter()
                        .map(|item| child.rename(item, direction))
                        .collect(),
                ),
                (_, other) => other,
            };
            out.insert(target.to_string(), val);
        }
        Value::Object(out)
    }

    /// Structured-output schema (OpenAPI subset accepted by Gemini), keyed by alias.
    pub fn response_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        let mut ordering = Vec::new();

        for field in self.fields {
            let description = describe(field);
            let schema = match field.kind {
                FieldKind::Text => json!({ "type": "STRING", "description": description }),
                FieldKind::List(child) => json!({
                    "type": "ARRAY",
                    "description": description,
                    "items": child.response_schema(),
                }),
            };
            properties.insert(field.alias.to_string(), schema);
            ordering.push(Value::from(field.alias));
            if field.is_required() {
                required.push(Value::from(field.alias));
            }
        }

        json!({
            "type": "OBJECT",
            "title": self.name,
            "properties": properties,
            "required": required,
            "propertyOrdering": ordering,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    ToAlias,
    FromAlias,
}

/// The schema dialect has no `examples` keyword, so examples ride in the description.
fn describe(field: &FieldSpec) -> String {
    if field.examples.is_empty() {
        field.description.to_string()
    } else {
        format!(
            "{} Exemples : {}",
            field.description,
            field
                .examples
                .iter()
                .map(|e| format!("{e:?}"))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

const fn text(
    name: &'static str,
    alias: &'static str,
    description: &'static str,
    examples: &'static [&'static str],
) -> FieldSpec {
    FieldSpec {
        name,
        alias,
        description,
        examples,
        kind: FieldKind::Text,
    }
}

const fn list(
    name: &'static str,
    alias: &'static str,
    description: &'static str,
    child: &'static RecordSpec,
) -> FieldSpec {
    FieldSpec {
        name,
        alias,
        description,
        examples: &[],
        kind: FieldKind::List(child),
    }
}

pub static EXPERTISE: RecordSpec = RecordSpec {
    name: "Expertise",
    fields: &[
        text(
            "title",
            "titre_expertise",
            "Intitulé général du groupe de compétences, ou nom du domaine d'expertise.",
            &["Développement Back-end", "Gestion de Projet", "Bases de données"],
        ),
        text(
            "bullet_skills",
            "expertises",
            "Compétences fondées sur l'expérience professionnelle. Liste à puces (une seule chaîne).",
            &["• Compétence 1\n • Compétence 2\n • Compétence 3"],
        ),
        text(
            "level",
            "niveau_expertise",
            "Niveau : Junior (<= 3 ans), Autonome (4+ ans), Expert (8+ ans).",
            &["Junior", "Autonome", "Expert"],
        ),
    ],
};

pub static SOFT_SKILL: RecordSpec = RecordSpec {
    name: "SavoirEtre",
    fields: &[text(
        "text",
        "compétence",
        "Mot-clé ou expression courte de savoir-être.",
        &["• Esprit d'équipe\n", "• Sens de l'organisation\n", "• Adaptabilité\n"],
    )],
};

pub static LANGUAGE: RecordSpec = RecordSpec {
    name: "Langue",
    fields: &[
        text("name", "langue", "Nom de la langue.", &[]),
        text(
            "level",
            "niveau",
            "Niveau : Novice (A1 - A2), Intermédiaire (B1 - B2), Courant (C1 - C2), Maternelle.",
            &["Novice", "Intermédiaire", "Courant", "Maternelle"],
        ),
    ],
};

pub static EXPERIENCE: RecordSpec = RecordSpec {
    name: "Experience",
    fields: &[
        text("start", "début", "Mois Année.", &["Janvier 2022", "2019"]),
        text(
            "end",
            "fin",
            "Mois Année ou 'En cours'.",
            &["En cours", "2022", "Décembre 2023"],
        ),
        text("company", "société", "Nom de l'entreprise.", &[]),
        text(
            "industry",
            "secteur_activité",
            "Secteur d'activité ou domaine.",
            &["• Banque\n", "• Assurance\n", "• Télécommunications\n", "• Santé\n"],
        ),
        text(
            "program",
            "programme",
            "Nom ou description du programme ou projet.",
            &[],
        ),
        text(
            "role",
            "poste",
            "Poste occupé.",
            &["• Consultant DevOps\n", "• Chef de Projet\n", "• Ingénieur Sécurité\n"],
        ),
        text("objective", "objectif", "Objectif principal de la mission.", &[]),
        text(
            "activities",
            "activités",
            "Activités réalisées. Liste à puces (une seule chaîne).",
            &["• <Activité 1>\n • <Activité 2>\n • <Activité 3>"],
        ),
        text(
            "tech_environment",
            "environnement_technique",
            "Environnement technique. Liste à puces (une seule chaîne).",
            &["• Environnement 1\n • Environnement 2\n • Environnement 3"],
        ),
        text(
            "mobilized_expertise",
            "expertise_mobilisées",
            "Expertises mobilisées. Liste à puces (une seule chaîne).",
            &["• Expertise 1\n • Maintenance système\n"],
        ),
    ],
};

pub static RESUME: RecordSpec = RecordSpec {
    name: "CV",
    fields: &[
        text(
            "full_name",
            "nom",
            "Nom complet au format 'Prénom Nom'.",
            &["Jean Dupont"],
        ),
        text(
            "phone_e164",
            "téléphone",
            "Numéro de téléphone au format international (E.164).",
            &["+33601020304"],
        ),
        text(
            "primary_industry",
            "secteur_d_activité",
            "Secteur d'activité principal du candidat.",
            &[],
        ),
        list(
            "expertises",
            "expertises",
            "Groupes d'expertise du candidat.",
            &EXPERTISE,
        ),
        list("savoir_etre", "savoir_etre", "Savoir-être du candidat.", &SOFT_SKILL),
        list("languages", "langues", "Langues parlées.", &LANGUAGE),
        list(
            "experiences",
            "expériences",
            "Expériences professionnelles, de la plus récente à la plus ancienne.",
            &EXPERIENCE,
        ),
    ],
};
