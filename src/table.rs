use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::io::Read;
use thiserror::Error;

pub const FC_COLUMN: &str = "log2FoldChange";
pub const P_COLUMN: &str = "pvalue";
pub const BASE_MEAN_COLUMN: &str = "baseMean";

/// Columns which must be present in the header of a differential expression table.
pub const REQUIRED_COLUMNS: [&str; 3] = [FC_COLUMN, P_COLUMN, BASE_MEAN_COLUMN];

/// One row of a differential expression table.
#[derive(Debug, Clone, PartialEq)]
pub struct DeRow {
    pub id: String,
    pub log2_fold_change: f64,
    pub pvalue: f64,
    /// `-log10(pvalue)`. This is `inf` for a p-value of zero and `NaN` for a negative p-value.
    pub neg_log10_p: f64,
}

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Missing required columns in the input file. Expected columns: {expected:?}, missing: {missing:?}")]
    MissingColumns {
        expected: Vec<String>,
        missing: Vec<String>,
    },

    #[error("row {row}: column `{column}` has a non-numeric value `{value}`")]
    NotNumeric {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: has no value in column {column}")]
    MissingCell { row: usize, column: usize },
}

/// Parses a numeric cell. Missing values (`NA`, `NaN`, empty) become `NaN`; anything else
/// which is not a number is `None`.
pub fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    match cell {
        "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" => Some(f64::NAN),
        _ => cell.parse::<f64>().ok(),
    }
}

/// Reads a differential expression table with a header row. Gene identifiers are taken
/// from the first column, which is usually unnamed.
///
/// # Errors
///
/// This function will return an error if:
/// * Any of `REQUIRED_COLUMNS` is absent from the header. This is checked before any rows
///   are read.
/// * A required column holds a value which is neither a number nor a missing value.
/// * The file is not valid CSV.
pub fn read_de_table<R: Read>(rdr: R) -> Result<Vec<DeRow>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(rdr);

    let headers = rdr.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|&&c| position(c).is_none())
        .map(|c| c.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(TableError::MissingColumns {
            expected: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            missing,
        }
        .into());
    }

    let [fc_idx, p_idx, base_idx] = REQUIRED_COLUMNS.map(|c| position(c).unwrap_or_default());

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // 1-indexed, counting the header
        let row = i + 2;

        let numeric = |idx: usize, name: &str| -> Result<f64, TableError> {
            let value = record
                .get(idx)
                .ok_or(TableError::MissingCell { row, column: idx })?;
            parse_cell(value).ok_or_else(|| TableError::NotNumeric {
                row,
                column: name.to_string(),
                value: value.to_string(),
            })
        };

        let pvalue = numeric(p_idx, P_COLUMN)?;
        // checked for a number, but not otherwise used
        numeric(base_idx, BASE_MEAN_COLUMN)?;
        rows.push(DeRow {
            id: record.get(0).unwrap_or_default().to_string(),
            log2_fold_change: numeric(fc_idx, FC_COLUMN)?,
            pvalue,
            neg_log10_p: -pvalue.log10(),
        });
    }

    Ok(rows)
}

pub fn read_de_table_path(path: &str) -> Result<Vec<DeRow>> {
    let file =
        std::fs::File::open(path).with_context(|| format!("Unable to open file {path}"))?;
    read_de_table(std::io::BufReader::new(file))
        .with_context(|| format!("Could not read differential expression table {path}"))
}

/// A row of a headerless table, holding the values used for ranking.
/// A value of `None` is a cell which was missing or could not be read as a number.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRow {
    pub id: String,
    pub fc: Option<f64>,
    pub pvalue: Option<f64>,
}

/// Column positions of a headerless table.
#[derive(Copy, Clone, Debug)]
pub struct ColumnLayout {
    pub id: usize,
    pub fc: usize,
    pub pvalue: usize,
}

/// Cells which were coerced to missing values while reading a headerless table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CoercionReport {
    pub rows: usize,
    pub fc: usize,
    pub pvalue: usize,
    /// 1-indexed rows with at least one coerced cell
    pub coerced_rows: Vec<usize>,
}

/// Reads a headerless table, coercing fold change and p-value cells which are not numbers
/// into missing values. Every coerced cell is counted in the returned `CoercionReport`; rows
/// are never dropped.
pub fn read_ranked_table<R: Read>(
    rdr: R,
    layout: &ColumnLayout,
) -> Result<(Vec<RankedRow>, CoercionReport)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(rdr);

    let mut report = CoercionReport::default();
    let mut rows = Vec::new();

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;

        let id = record
            .get(layout.id)
            .ok_or(TableError::MissingCell {
                row,
                column: layout.id,
            })?
            .to_string();

        let fc = record.get(layout.fc).and_then(parse_cell).filter(|v| !v.is_nan());
        let pvalue = record
            .get(layout.pvalue)
            .and_then(parse_cell)
            .filter(|v| !v.is_nan());

        report.rows += 1;
        report.fc += fc.is_none() as usize;
        report.pvalue += pvalue.is_none() as usize;
        if fc.is_none() || pvalue.is_none() {
            report.coerced_rows.push(row);
        }

        rows.push(RankedRow { id, fc, pvalue });
    }

    Ok((rows, report))
}

pub fn read_ranked_table_path(
    path: &str,
    layout: &ColumnLayout,
) -> Result<(Vec<RankedRow>, CoercionReport)> {
    let file =
        std::fs::File::open(path).with_context(|| format!("Unable to open file {path}"))?;
    read_ranked_table(std::io::BufReader::new(file), layout)
        .with_context(|| format!("Could not read table {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn reads_de_table() {
        let csv = indoc! {"
            ,baseMean,log2FoldChange,lfcSE,stat,pvalue,padj
            g1,10,2.0,0.1,1,0.001,0.01
            g2,10,-2.0,0.1,1,0.001,0.01
            g3,10,0.1,0.1,1,NA,NA
        "};

        let rows = read_de_table(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, "g1");
        assert_eq!(rows[1].log2_fold_change, -2.0);
        assert!((rows[0].neg_log10_p - 3.0).abs() < 1e-9);
        assert!(rows[2].pvalue.is_nan());
    }

    #[test]
    fn reports_missing_columns() {
        let csv = ",log2FoldChange,padj\ng1,1.0,0.5\n";
        let err = read_de_table(csv.as_bytes()).unwrap_err();

        match err.downcast_ref::<TableError>() {
            Some(TableError::MissingColumns { missing, .. }) => {
                assert_eq!(missing, &vec!["pvalue".to_string(), "baseMean".to_string()])
            }
            _ => panic!("unexpected error {err}"),
        }
    }

    #[test]
    fn rejects_non_numeric_values() {
        let csv = ",log2FoldChange,pvalue,baseMean\ng1,big,0.5,1\n";
        let err = read_de_table(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("log2FoldChange"));
    }

    #[test]
    fn rejects_non_numeric_base_mean() {
        let csv = ",log2FoldChange,pvalue,baseMean\ng1,1.0,0.5,lots\n";
        let err = read_de_table(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("baseMean"));
    }

    #[test]
    fn zero_pvalue_is_infinitely_significant() {
        let csv = ",log2FoldChange,pvalue,baseMean\ng1,1.0,0,1\n";
        let rows = read_de_table(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].neg_log10_p, f64::INFINITY);
    }

    #[test]
    fn coerces_and_counts_cells() {
        let csv = indoc! {"
            id,x,log2FoldChange,a,b,pvalue
            g1,x,-1.5,a,b,0.01
            g2,x,NA,a,b,0.2
            g3,x,0.5,a,b
        "};
        let layout = ColumnLayout { id: 0, fc: 2, pvalue: 5 };

        let (rows, report) = read_ranked_table(csv.as_bytes(), &layout).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(report.rows, 4);
        assert_eq!(report.fc, 2);
        assert_eq!(report.pvalue, 2);
        assert_eq!(report.coerced_rows, vec![1, 3, 4]);
        assert_eq!(rows[1].fc, Some(-1.5));
        assert_eq!(rows[3].pvalue, None);
    }
}
