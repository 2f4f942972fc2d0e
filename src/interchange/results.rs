//! Solution export.

use super::InterchangeError;
use crate::interpret::{format_intervals, SolutionReport};
use csv::Writer;
use std::path::{Path, PathBuf};
use tracing::info;

/// Files written by [`write_solution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFile {
    BerthAssignment,
    SlotAllocations,
    Intervals,
    ShipStart,
    CompartmentStart,
    ObjectiveBreakdown,
}

impl ResultFile {
    pub const ALL: [ResultFile; 6] = [
        ResultFile::BerthAssignment,
        ResultFile::SlotAllocations,
        ResultFile::Intervals,
        ResultFile::ShipStart,
        ResultFile::CompartmentStart,
        ResultFile::ObjectiveBreakdown,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ResultFile::BerthAssignment => "berth_assignment.csv",
            ResultFile::SlotAllocations => "slot_allocations.csv",
            ResultFile::Intervals => "intervals.csv",
            ResultFile::ShipStart => "e_s.csv",
            ResultFile::CompartmentStart => "e_sk.csv",
            ResultFile::ObjectiveBreakdown => "objective_breakdown.csv",
        }
    }

    pub fn header(self) -> &'static [&'static str] {
        match self {
            ResultFile::BerthAssignment => &["ship", "berth"],
            ResultFile::SlotAllocations => &["ship", "k", "row", "slot"],
            ResultFile::Intervals => &["ship", "k", "row", "intervals"],
            ResultFile::ShipStart => &["ship", "e_s"],
            ResultFile::CompartmentStart => &["ship", "k", "e_sk"],
            ResultFile::ObjectiveBreakdown => &[
                "ship",
                "transshipment_cost",
                "storage_cost",
                "berth_time",
                "alpha",
                "beta",
                "weighted_contribution",
            ],
        }
    }

    fn rows(self, report: &SolutionReport) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for plan in &report.ships {
            let s = plan.ship.to_string();
            match self {
                ResultFile::BerthAssignment => {
                    for b in &plan.berths {
                        rows.push(vec![s.clone(), b.to_string()]);
                    }
                }
                ResultFile::SlotAllocations => {
                    for c in &plan.compartments {
                        let mut cells: Vec<(usize, usize)> = c
                            .row
                            .into_iter()
                            .flat_map(|r| c.slots.iter().map(move |&v| (r, v)))
                            .chain(c.stray.iter().copied())
                            .collect();
                        cells.sort_unstable();
                        for (r, v) in cells {
                            rows.push(vec![
                                s.clone(),
                                c.compartment.to_string(),
                                r.to_string(),
                                v.to_string(),
                            ]);
                        }
                    }
                }
                ResultFile::Intervals => {
                    for c in &plan.compartments {
                        let Some(row) = c.row else { continue };
                        if c.intervals.is_empty() {
                            continue;
                        }
                        rows.push(vec![
                            s.clone(),
                            c.compartment.to_string(),
                            row.to_string(),
                            format_intervals(&c.intervals),
                        ]);
                    }
                }
                ResultFile::ShipStart => rows.push(vec![s, plan.start_time.to_string()]),
                ResultFile::CompartmentStart => {
                    for c in &plan.compartments {
                        rows.push(vec![
                            s.clone(),
                            c.compartment.to_string(),
                            c.start_time.to_string(),
                        ]);
                    }
                }
                ResultFile::ObjectiveBreakdown => rows.push(vec![
                    s,
                    plan.cost.transshipment.to_string(),
                    plan.cost.storage.to_string(),
                    plan.cost.berth_time.to_string(),
                    report.alpha.to_string(),
                    report.beta.to_string(),
                    plan.cost.weighted.to_string(),
                ]),
            }
        }
        rows
    }
}

/// Writes every [`ResultFile`] into `dir`, which must exist.
pub fn write_solution(
    report: &SolutionReport,
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, InterchangeError> {
    let dir = dir.as_ref();
    let mut written = Vec::with_capacity(ResultFile::ALL.len());
    for file in ResultFile::ALL {
        let path = dir.join(file.file_name());
        let csv_err = |source| InterchangeError::Csv {
            path: path.clone(),
            source,
        };
        let mut wtr = Writer::from_path(&path).map_err(csv_err)?;
        wtr.write_record(file.header()).map_err(csv_err)?;
        for row in file.rows(report) {
            wtr.write_record(&row).map_err(csv_err)?;
        }
        wtr.flush().map_err(|source| InterchangeError::Io {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "solution written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpret::{
        merge_runs, CompartmentPlacement, ShipCost, ShipPlan, SolutionReport,
    };
    use crate::milp::SolverStatus;
    use std::fs;

    fn report() -> SolutionReport {
        let placement = |k: usize, row: usize, slots: Vec<usize>, start: f64| CompartmentPlacement {
            compartment: k,
            row: Some(row),
            intervals: merge_runs(&slots),
            slots,
            stray: Vec::new(),
            start_time: start,
        };
        let cost = ShipCost {
            transshipment: 10.0,
            storage: 2.5,
            berth_time: 4.0,
            weighted: 16.5,
        };
        SolutionReport {
            status: SolverStatus::Optimal,
            objective_value: Some(33.0),
            alpha: 1.0,
            beta: 1.0,
            ships: vec![
                ShipPlan {
                    ship: 0,
                    berths: vec![1],
                    start_time: 2.0,
                    compartments: vec![
                        placement(0, 3, vec![3, 7, 8, 9], 2.0),
                        placement(1, 0, vec![0, 1], 3.5),
                    ],
                    cost,
                },
                ShipPlan {
                    ship: 1,
                    berths: vec![0],
                    start_time: 0.0,
                    compartments: vec![placement(0, 1, vec![4], 0.0), placement(1, 2, vec![], 1.0)],
                    cost,
                },
            ],
            total: ShipCost::default(),
        }
    }

    #[test]
    fn test_files_and_contents() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_solution(&report(), dir.path()).unwrap();
        assert_eq!(files.len(), 6);

        let read = |f: ResultFile| fs::read_to_string(dir.path().join(f.file_name())).unwrap();

        assert_eq!(read(ResultFile::BerthAssignment), "ship,berth\n0,1\n1,0\n");
        assert_eq!(
            read(ResultFile::Intervals),
            "ship,k,row,intervals\n0,0,3,3;7-9\n0,1,0,0-1\n1,0,1,4\n"
        );
        assert_eq!(read(ResultFile::ShipStart), "ship,e_s\n0,2\n1,0\n");
        assert!(read(ResultFile::CompartmentStart).contains("0,1,3.5\n"));
        assert_eq!(read(ResultFile::SlotAllocations).lines().count(), 1 + 7);
        assert_eq!(
            read(ResultFile::ObjectiveBreakdown).lines().nth(1),
            Some("0,10,2.5,4,1,1,16.5")
        );
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        assert!(matches!(
            write_solution(&report(), &missing),
            Err(InterchangeError::Csv { .. })
        ));
    }
}
