//! Typed decoding of RF2 rows.

use std::fs::File;
use std::io::{BufReader, Read};

use csv::{Reader, ReaderBuilder, StringRecord};
use terminus_types::{Concept, Description, RefsetItem, RefsetPayload, Relationship, SctId};
use uuid::Uuid;

use crate::error::{Rf2Error, Rf2Result};
use crate::filename::{ComponentKind, ReleaseFile};

/// Expected leading columns per component type, per the RF2 specification.
const CONCEPT_COLUMNS: &[&str] = &["id", "effectiveTime", "active", "moduleId", "definitionStatusId"];

const DESCRIPTION_COLUMNS: &[&str] = &[
    "id",
    "effectiveTime",
    "active",
    "moduleId",
    "conceptId",
    "languageCode",
    "typeId",
    "term",
    "caseSignificanceId",
];

const RELATIONSHIP_COLUMNS: &[&str] = &[
    "id",
    "effectiveTime",
    "active",
    "moduleId",
    "sourceId",
    "destinationId",
    "relationshipGroup",
    "typeId",
    "characteristicTypeId",
    "modifierId",
];

const REFSET_BASE_COLUMNS: &[&str] = &[
    "id",
    "effectiveTime",
    "active",
    "moduleId",
    "refsetId",
    "referencedComponentId",
];

/// A decoded RF2 row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A concept row.
    Concept(Concept),
    /// A description or text-definition row.
    Description(Description),
    /// A relationship row.
    Relationship(Relationship),
    /// A reference-set member row of any schema.
    RefsetItem(RefsetItem),
}

/// A reference-set column schema, derived from the header row's trailing
/// columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefsetSchema {
    /// No trailing columns.
    Simple,
    /// `acceptabilityId`.
    Language,
    /// `targetComponentId`.
    Association,
    /// `mapTarget`.
    SimpleMap,
    /// Anything else: the trailing column names in file order.
    Extension(Vec<String>),
}

impl RefsetSchema {
    fn from_extra_columns(columns: &[String]) -> RefsetSchema {
        match columns {
            [] => RefsetSchema::Simple,
            [single] if single == "acceptabilityId" => RefsetSchema::Language,
            [single] if single == "targetComponentId" => RefsetSchema::Association,
            [single] if single == "mapTarget" => RefsetSchema::SimpleMap,
            other => RefsetSchema::Extension(other.to_vec()),
        }
    }

    /// The trailing column names this schema covers, in file order.
    pub fn field_names(&self) -> Vec<String> {
        match self {
            RefsetSchema::Simple => Vec::new(),
            RefsetSchema::Language => vec!["acceptabilityId".to_string()],
            RefsetSchema::Association => vec!["targetComponentId".to_string()],
            RefsetSchema::SimpleMap => vec!["mapTarget".to_string()],
            RefsetSchema::Extension(names) => names.clone(),
        }
    }
}

/// How rows of this file decode, fixed by the header row.
enum Decoder {
    Concept,
    Description,
    Relationship,
    Refset(RefsetSchema),
}

/// A streaming reader yielding typed records from one RF2 file.
///
/// Rows decode lazily; a malformed row surfaces as an error carrying the
/// file name and line number and ends the stream.
pub struct RecordReader<R: Read> {
    reader: Reader<R>,
    file_name: String,
    decoder: Decoder,
}

impl RecordReader<BufReader<File>> {
    /// Opens a classified release file for reading.
    pub fn open(release_file: &ReleaseFile) -> Rf2Result<Self> {
        let file = File::open(&release_file.path)?;
        Self::from_reader(
            BufReader::new(file),
            release_file.component,
            release_file.file_name(),
        )
    }
}

impl<R: Read> RecordReader<R> {
    /// Creates a reader over raw bytes, validating the header row.
    pub fn from_reader(reader: R, kind: ComponentKind, file_name: String) -> Rf2Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(false)
            .quoting(false)
            .from_reader(reader);

        let decoder = validate_headers(&mut csv_reader, kind, &file_name)?;

        Ok(Self {
            reader: csv_reader,
            file_name,
            decoder,
        })
    }

    /// The refset schema derived from the header; `None` for primary
    /// component files.
    pub fn refset_schema(&self) -> Option<&RefsetSchema> {
        match &self.decoder {
            Decoder::Refset(schema) => Some(schema),
            _ => None,
        }
    }

    fn decode(&self, record: &StringRecord, line: u64) -> Rf2Result<Record> {
        let ctx = FieldContext {
            file: &self.file_name,
            line,
        };
        match &self.decoder {
            Decoder::Concept => Ok(Record::Concept(decode_concept(record, ctx)?)),
            Decoder::Description => Ok(Record::Description(decode_description(record, ctx)?)),
            Decoder::Relationship => Ok(Record::Relationship(decode_relationship(record, ctx)?)),
            Decoder::Refset(schema) => {
                Ok(Record::RefsetItem(decode_refset_item(record, schema, ctx)?))
            }
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Rf2Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut record = StringRecord::new();
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    if record.iter().all(|field| field.trim().is_empty()) {
                        continue;
                    }
                    let line = record.position().map(|p| p.line()).unwrap_or(0);
                    return Some(self.decode(&record, line));
                }
                Ok(false) => return None,
                Err(source) => {
                    return Some(Err(Rf2Error::Csv {
                        file: self.file_name.clone(),
                        source,
                    }))
                }
            }
        }
    }
}

/// Validates the header row against the expected columns for `kind` and,
/// for refset files, derives the member schema from the trailing columns.
fn validate_headers<R: Read>(
    reader: &mut Reader<R>,
    kind: ComponentKind,
    file_name: &str,
) -> Rf2Result<Decoder> {
    let expected: &[&str] = match kind {
        ComponentKind::Concept => CONCEPT_COLUMNS,
        ComponentKind::Description => DESCRIPTION_COLUMNS,
        ComponentKind::Relationship => RELATIONSHIP_COLUMNS,
        ComponentKind::Refset => REFSET_BASE_COLUMNS,
    };

    let headers = reader.headers().map_err(|source| Rf2Error::Csv {
        file: file_name.to_string(),
        source,
    })?;

    if headers.len() < expected.len() {
        return Err(Rf2Error::TruncatedHeader {
            file: file_name.to_string(),
            expected: expected.len(),
            found: headers.len(),
        });
    }

    for (position, expected_col) in expected.iter().enumerate() {
        let found = headers.get(position).unwrap_or("");
        // A UTF-8 BOM may precede the first column name.
        let found = found.trim_start_matches('\u{feff}');
        if found != *expected_col {
            return Err(Rf2Error::UnexpectedColumn {
                file: file_name.to_string(),
                position,
                expected: (*expected_col).to_string(),
                found: found.to_string(),
            });
        }
    }

    Ok(match kind {
        ComponentKind::Concept => Decoder::Concept,
        ComponentKind::Description => Decoder::Description,
        ComponentKind::Relationship => Decoder::Relationship,
        ComponentKind::Refset => {
            let extra: Vec<String> = headers
                .iter()
                .skip(REFSET_BASE_COLUMNS.len())
                .map(|c| c.to_string())
                .collect();
            Decoder::Refset(RefsetSchema::from_extra_columns(&extra))
        }
    })
}

#[derive(Clone, Copy)]
struct FieldContext<'a> {
    file: &'a str,
    line: u64,
}

impl FieldContext<'_> {
    fn invalid(&self, column: &'static str, value: &str) -> Rf2Error {
        Rf2Error::InvalidField {
            file: self.file.to_string(),
            line: self.line,
            column,
            value: value.to_string(),
        }
    }
}

fn field<'r>(record: &'r StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or("")
}

fn decode_concept(record: &StringRecord, ctx: FieldContext<'_>) -> Rf2Result<Concept> {
    Ok(Concept {
        id: parse::sctid(field(record, 0)).map_err(|v| ctx.invalid("id", v))?,
        effective_time: parse::effective_time(field(record, 1))
            .map_err(|v| ctx.invalid("effectiveTime", v))?,
        active: parse::boolean(field(record, 2)).map_err(|v| ctx.invalid("active", v))?,
        module_id: parse::sctid(field(record, 3)).map_err(|v| ctx.invalid("moduleId", v))?,
        definition_status_id: parse::sctid(field(record, 4))
            .map_err(|v| ctx.invalid("definitionStatusId", v))?,
    })
}

fn decode_description(record: &StringRecord, ctx: FieldContext<'_>) -> Rf2Result<Description> {
    Ok(Description {
        id: parse::sctid(field(record, 0)).map_err(|v| ctx.invalid("id", v))?,
        effective_time: parse::effective_time(field(record, 1))
            .map_err(|v| ctx.invalid("effectiveTime", v))?,
        active: parse::boolean(field(record, 2)).map_err(|v| ctx.invalid("active", v))?,
        module_id: parse::sctid(field(record, 3)).map_err(|v| ctx.invalid("moduleId", v))?,
        concept_id: parse::sctid(field(record, 4)).map_err(|v| ctx.invalid("conceptId", v))?,
        language_code: field(record, 5).to_string(),
        type_id: parse::sctid(field(record, 6)).map_err(|v| ctx.invalid("typeId", v))?,
        term: field(record, 7).to_string(),
        case_significance_id: parse::sctid(field(record, 8))
            .map_err(|v| ctx.invalid("caseSignificanceId", v))?,
    })
}

fn decode_relationship(record: &StringRecord, ctx: FieldContext<'_>) -> Rf2Result<Relationship> {
    Ok(Relationship {
        id: parse::sctid(field(record, 0)).map_err(|v| ctx.invalid("id", v))?,
        effective_time: parse::effective_time(field(record, 1))
            .map_err(|v| ctx.invalid("effectiveTime", v))?,
        active: parse::boolean(field(record, 2)).map_err(|v| ctx.invalid("active", v))?,
        module_id: parse::sctid(field(record, 3)).map_err(|v| ctx.invalid("moduleId", v))?,
        source_id: parse::sctid(field(record, 4)).map_err(|v| ctx.invalid("sourceId", v))?,
        destination_id: parse::sctid(field(record, 5))
            .map_err(|v| ctx.invalid("destinationId", v))?,
        relationship_group: parse::integer(field(record, 6))
            .map_err(|v| ctx.invalid("relationshipGroup", v))?,
        type_id: parse::sctid(field(record, 7)).map_err(|v| ctx.invalid("typeId", v))?,
        characteristic_type_id: parse::sctid(field(record, 8))
            .map_err(|v| ctx.invalid("characteristicTypeId", v))?,
        modifier_id: parse::sctid(field(record, 9)).map_err(|v| ctx.invalid("modifierId", v))?,
    })
}

fn decode_refset_item(
    record: &StringRecord,
    schema: &RefsetSchema,
    ctx: FieldContext<'_>,
) -> Rf2Result<RefsetItem> {
    let payload = match schema {
        RefsetSchema::Simple => RefsetPayload::Simple,
        RefsetSchema::Language => RefsetPayload::Language {
            acceptability_id: parse::sctid(field(record, 6))
                .map_err(|v| ctx.invalid("acceptabilityId", v))?,
        },
        RefsetSchema::Association => RefsetPayload::Association {
            target_component_id: parse::sctid(field(record, 6))
                .map_err(|v| ctx.invalid("targetComponentId", v))?,
        },
        RefsetSchema::SimpleMap => RefsetPayload::SimpleMap {
            map_target: field(record, 6).to_string(),
        },
        RefsetSchema::Extension(_) => RefsetPayload::Extension(
            record
                .iter()
                .skip(REFSET_BASE_COLUMNS.len())
                .map(|c| c.to_string())
                .collect(),
        ),
    };

    Ok(RefsetItem {
        id: parse::member_uuid(field(record, 0)).map_err(|v| ctx.invalid("id", v))?,
        effective_time: parse::effective_time(field(record, 1))
            .map_err(|v| ctx.invalid("effectiveTime", v))?,
        active: parse::boolean(field(record, 2)).map_err(|v| ctx.invalid("active", v))?,
        module_id: parse::sctid(field(record, 3)).map_err(|v| ctx.invalid("moduleId", v))?,
        refset_id: parse::sctid(field(record, 4)).map_err(|v| ctx.invalid("refsetId", v))?,
        referenced_component_id: parse::sctid(field(record, 5))
            .map_err(|v| ctx.invalid("referencedComponentId", v))?,
        payload,
    })
}

/// Field-level parse helpers.
///
/// Each returns the raw value on failure so callers can wrap it with
/// file-and-line context.
pub mod parse {
    use super::{SctId, Uuid};

    /// Parses an SCTID.
    pub fn sctid(value: &str) -> Result<SctId, &str> {
        value.parse::<u64>().map_err(|_| value)
    }

    /// Parses a `"0"`/`"1"` active flag.
    pub fn boolean(value: &str) -> Result<bool, &str> {
        match value {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(value),
        }
    }

    /// Parses a `YYYYMMDD` effective time.
    pub fn effective_time(value: &str) -> Result<u32, &str> {
        if value.len() != 8 || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(value);
        }
        value.parse::<u32>().map_err(|_| value)
    }

    /// Parses an unsigned integer field.
    pub fn integer<T: std::str::FromStr>(value: &str) -> Result<T, &str> {
        value.parse::<T>().map_err(|_| value)
    }

    /// Parses a refset member UUID.
    pub fn member_uuid(value: &str) -> Result<Uuid, &str> {
        Uuid::parse_str(value).map_err(|_| value)
    }
}
