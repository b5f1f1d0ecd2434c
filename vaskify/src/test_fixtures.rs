//! Small hand-built panels with known anomalies.
//!
//! Rows are deliberately out of order so that every detector has to sort
//! before it reads consecutive periods.

use crate::error::Result;
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

fn panel_schema(y_type: DataType) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("unit_id", DataType::Utf8, true),
        Field::new("time_period", DataType::Utf8, false),
        Field::new("turnover", y_type, true),
        Field::new("category_code", DataType::Utf8, true),
    ]))
}

/// Three monthly units over `2020-01..2020-03`.
///
/// - unit `1` jumps from 100 to 100 000 in `2020-02` (thousand error up);
/// - unit `2` drops from 520 to 0.4 in `2020-03` (thousand error down);
/// - unit `3` has no `2020-02` value, so none of its rows has a usable
///   predecessor.
pub fn small_panel() -> Result<RecordBatch> {
    let batch = RecordBatch::try_new(
        panel_schema(DataType::Float64),
        vec![
            Arc::new(StringArray::from(vec![
                "2", "1", "3", "1", "2", "3", "1", "2", "3",
            ])),
            Arc::new(StringArray::from(vec![
                "2020-02", "2020-03", "2020-01", "2020-01", "2020-01", "2020-03", "2020-02",
                "2020-03", "2020-02",
            ])),
            Arc::new(Float64Array::from(vec![
                Some(520.0),
                Some(110_000.0),
                Some(200.0),
                Some(100.0),
                Some(500.0),
                Some(210.0),
                Some(100_000.0),
                Some(0.4),
                None,
            ])),
            Arc::new(StringArray::from(vec!["C", "G", "J", "G", "C", "J", "G", "C", "J"])),
        ],
    )?;
    Ok(batch)
}

/// Quarterly units reporting cumulative figures.
///
/// - `A` reports year-to-date totals in every quarter (flagged in all rows
///   after the first);
/// - `B` grows modestly;
/// - `C` has a single row;
/// - `D` jumps once and then falls back.
pub fn accumulation_panel() -> Result<RecordBatch> {
    let batch = RecordBatch::try_new(
        panel_schema(DataType::Int64),
        vec![
            Arc::new(StringArray::from(vec![
                "A", "B", "D", "C", "A", "B", "D", "A", "D", "B",
            ])),
            Arc::new(StringArray::from(vec![
                "2021-Q2", "2021-Q1", "2021-Q3", "2021-Q1", "2021-Q1", "2021-Q2", "2021-Q1",
                "2021-Q3", "2021-Q2", "2021-Q3",
            ])),
            Arc::new(Int64Array::from(vec![
                210, 100, 150, 75, 100, 105, 100, 330, 200, 110,
            ])),
            Arc::new(StringArray::from(vec![
                "M", "N", "S", "B", "M", "N", "S", "M", "S", "N",
            ])),
        ],
    )?;
    Ok(batch)
}

/// Yearly panel for the HB method with periods `2023` and `2024`.
///
/// Units `u01..u10` have positive values in both years; `u09` grows
/// tenfold. `u11` has no `2023` value and `u12` reported zero in `2023`, so
/// neither takes part in the test. `region` splits the units into `north`
/// (`u01..u06`) and `south` (`u07..u12`).
pub fn hb_panel() -> Result<RecordBatch> {
    let previous: [(&str, Option<f64>); 12] = [
        ("u01", Some(100.0)),
        ("u02", Some(200.0)),
        ("u03", Some(150.0)),
        ("u04", Some(300.0)),
        ("u05", Some(120.0)),
        ("u06", Some(250.0)),
        ("u07", Some(180.0)),
        ("u08", Some(400.0)),
        ("u09", Some(220.0)),
        ("u10", Some(160.0)),
        ("u11", None),
        ("u12", Some(0.0)),
    ];
    let current = [
        105.0, 210.0, 160.0, 290.0, 126.0, 260.0, 190.0, 420.0, 2200.0, 150.0, 95.0, 80.0,
    ];

    let mut ids = Vec::new();
    let mut periods = Vec::new();
    let mut values = Vec::new();
    let mut regions = Vec::new();
    for (i, ((id, before), after)) in previous.iter().zip(current).enumerate() {
        let region = if i < 6 { "north" } else { "south" };
        // current year first to exercise sorting
        ids.push(*id);
        periods.push("2024");
        values.push(Some(after));
        regions.push(region);
        if let Some(before) = before {
            ids.push(*id);
            periods.push("2023");
            values.push(Some(*before));
            regions.push(region);
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("unit_id", DataType::Utf8, false),
        Field::new("year", DataType::Utf8, false),
        Field::new("turnover", DataType::Float64, true),
        Field::new("region", DataType::Utf8, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(periods)),
            Arc::new(Float64Array::from(values)),
            Arc::new(StringArray::from(regions)),
        ],
    )?;
    Ok(batch)
}
