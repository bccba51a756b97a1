//! Parquet rendition of result tables
//!
//! Every column is stored as UTF-8; the true label column is nullable since
//! register rows have none.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringBuilder};
use arrow::record_batch::RecordBatch;
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;

use super::{ACTUAL_LABEL_COLUMN, ResultRow, ResultTable};
use crate::error::{PipelineError, Result};
use crate::utils::logging::{TableIo, log_table_done};

/// Arrow schema for a result table
#[must_use]
pub fn arrow_schema(table: &ResultTable) -> Schema {
    Schema::new(
        table
            .schema
            .columns()
            .into_iter()
            .map(|name| {
                let nullable = name == ACTUAL_LABEL_COLUMN;
                Field::new(name, DataType::Utf8, nullable)
            })
            .collect::<Vec<_>>(),
    )
}

/// Convert result rows to a single record batch
pub fn to_record_batch(table: &ResultTable) -> Result<RecordBatch> {
    let schema = Arc::new(arrow_schema(table));
    let feature_count = table.schema.feature_columns().len();

    let mut case_ids = StringBuilder::new();
    let mut features: Vec<StringBuilder> =
        (0..feature_count).map(|_| StringBuilder::new()).collect();
    let mut actual = StringBuilder::new();
    let mut predicted = StringBuilder::new();

    for ResultRow {
        case_id,
        features: values,
        actual_label,
        predicted_label,
    } in &table.rows
    {
        if values.len() != feature_count {
            return Err(PipelineError::schema(format!(
                "result row for case {case_id} has {} answers, expected {feature_count}",
                values.len()
            )));
        }
        case_ids.append_value(case_id);
        for (builder, value) in features.iter_mut().zip(values) {
            builder.append_value(value);
        }
        match actual_label {
            Some(label) => actual.append_value(label),
            None => actual.append_null(),
        }
        predicted.append_value(predicted_label);
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(feature_count + 3);
    columns.push(Arc::new(case_ids.finish()));
    columns.extend(
        features
            .iter_mut()
            .map(|builder| Arc::new(builder.finish()) as ArrayRef),
    );
    columns.push(Arc::new(actual.finish()));
    columns.push(Arc::new(predicted.finish()));

    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Write a result table to a Parquet file
pub fn write_result_table(table: &ResultTable, path: &Path) -> Result<()> {
    let start = std::time::Instant::now();
    let batch = to_record_batch(table)?;
    let file = File::create(path).map_err(|e| {
        PipelineError::io_with_context(format!("Failed to create {}", path.display()), e)
    })?;

    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;

    log_table_done(TableIo::Write, path, batch.num_rows(), start.elapsed());
    Ok(())
}
