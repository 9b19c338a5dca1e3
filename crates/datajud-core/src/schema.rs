/// Arrow schema for flattened case rows, shared by every output sink.
pub mod cases {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
    use arrow::error::ArrowError;
    use arrow::record_batch::RecordBatch;

    use crate::flatten::CaseRow;

    pub const CNJ: &str = "CNJ";
    pub const CLASS_NAME: &str = "Classe Processual";
    pub const FILING_DATE: &str = "Data Ajuizamento";
    pub const DAYS_IN_PROGRESS: &str = "Dias em Tramitação";
    pub const CLAIM_VALUE: &str = "Valor da Causa";
    pub const CLAIM_VALUE_FORMATTED: &str = "Valor Formatado";
    pub const COURT_UNIT: &str = "Vara/Órgão";
    pub const MUNICIPALITY: &str = "Município";
    pub const TRIBUNAL: &str = "Tribunal";
    pub const PLAINTIFFS: &str = "Polo Ativo (Autores)";
    pub const DEFENDANTS: &str = "Polo Passivo (Réus)";
    pub const SECRECY_LEVEL: &str = "Nível de Sigilo";
    pub const ELECTRONIC: &str = "Processo Eletrônico?";
    pub const SUBJECTS: &str = "Assuntos";

    /// Column order of every export.
    pub fn case_schema() -> Schema {
        Schema::new(vec![
            Field::new(CNJ, DataType::Utf8, false),
            Field::new(CLASS_NAME, DataType::Utf8, false),
            Field::new(FILING_DATE, DataType::Utf8, false),
            Field::new(DAYS_IN_PROGRESS, DataType::Int64, false),
            Field::new(CLAIM_VALUE, DataType::Float64, false),
            Field::new(CLAIM_VALUE_FORMATTED, DataType::Utf8, false),
            Field::new(COURT_UNIT, DataType::Utf8, false),
            Field::new(MUNICIPALITY, DataType::Utf8, false),
            Field::new(TRIBUNAL, DataType::Utf8, false),
            Field::new(PLAINTIFFS, DataType::Utf8, false),
            Field::new(DEFENDANTS, DataType::Utf8, false),
            Field::new(SECRECY_LEVEL, DataType::Int64, false),
            Field::new(ELECTRONIC, DataType::Utf8, false),
            Field::new(SUBJECTS, DataType::Utf8, false),
        ])
    }

    /// Build one RecordBatch holding all rows, in order.
    pub fn to_record_batch(rows: &[CaseRow]) -> Result<RecordBatch, ArrowError> {
        let schema: SchemaRef = Arc::new(case_schema());

        let columns: Vec<ArrayRef> = vec![
            utf8(rows, |r| r.cnj.as_str()),
            utf8(rows, |r| r.class_name.as_str()),
            utf8(rows, |r| r.filing_date.as_str()),
            int64(rows, |r| r.days_in_progress),
            float64(rows, |r| r.claim_value),
            utf8(rows, |r| r.claim_value_formatted.as_str()),
            utf8(rows, |r| r.court_unit.as_str()),
            utf8(rows, |r| r.municipality_code.as_str()),
            utf8(rows, |r| r.tribunal.as_str()),
            utf8(rows, |r| r.plaintiffs.as_str()),
            utf8(rows, |r| r.defendants.as_str()),
            int64(rows, |r| r.secrecy_level),
            utf8(rows, |r| r.electronic.as_str()),
            utf8(rows, |r| r.subjects.as_str()),
        ];

        RecordBatch::try_new(schema, columns)
    }

    fn utf8<'a>(rows: &'a [CaseRow], f: impl Fn(&'a CaseRow) -> &'a str) -> ArrayRef {
        Arc::new(StringArray::from_iter_values(rows.iter().map(f)))
    }

    fn float64(rows: &[CaseRow], f: impl Fn(&CaseRow) -> f64) -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(rows.iter().map(f)))
    }

    fn int64(rows: &[CaseRow], f: impl Fn(&CaseRow) -> i64) -> ArrayRef {
        Arc::new(Int64Array::from_iter_values(rows.iter().map(f)))
    }
}
