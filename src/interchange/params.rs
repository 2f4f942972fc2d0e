//! Instance parameters as one CSV per array plus a key/value table.
//!
//! For a base path `data/inst`, the files are `data/inst_general.csv`,
//! `data/inst_arrival.csv`, and so on (see [`ParamFile`]).

use super::{InterchangeError, LoadReport, LoadWarning};
use crate::instance::{Dimensions, Geometry, Instance};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The parameter files and their headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamFile {
    General,
    Arrival,
    CargoWeight,
    CargoDensity,
    MaxResponseAngle,
    RequiredSlots,
    UnloadingSpeed,
    TransshipmentCost,
    StorageCost,
    Combined,
}

impl ParamFile {
    /// Every file written by [`write_params`].
    pub const TABLES: [ParamFile; 9] = [
        ParamFile::General,
        ParamFile::Arrival,
        ParamFile::CargoWeight,
        ParamFile::CargoDensity,
        ParamFile::MaxResponseAngle,
        ParamFile::RequiredSlots,
        ParamFile::UnloadingSpeed,
        ParamFile::TransshipmentCost,
        ParamFile::StorageCost,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            ParamFile::General => "general",
            ParamFile::Arrival => "arrival",
            ParamFile::CargoWeight => "cargoWeight",
            ParamFile::CargoDensity => "cargoDensity",
            ParamFile::MaxResponseAngle => "maxResponseAngle",
            ParamFile::RequiredSlots => "requiredSlots",
            ParamFile::UnloadingSpeed => "unloadingSpeed",
            ParamFile::TransshipmentCost => "transshipmentCost",
            ParamFile::StorageCost => "storageCost",
            ParamFile::Combined => "combined",
        }
    }

    /// Header of the table; empty for the combined file, whose columns
    /// depend on the dimensions.
    pub fn header(self) -> &'static [&'static str] {
        match self {
            ParamFile::General => &["key", "value"],
            ParamFile::Arrival => &["ship", "arrivalTime"],
            ParamFile::CargoWeight => &["ship", "weight"],
            ParamFile::CargoDensity | ParamFile::MaxResponseAngle | ParamFile::RequiredSlots => {
                &["ship", "k", "value"]
            }
            ParamFile::UnloadingSpeed => &["ship", "berth", "k", "value"],
            ParamFile::TransshipmentCost => &["berth", "row", "slot", "value"],
            ParamFile::StorageCost => &["ship", "k", "row", "value"],
            ParamFile::Combined => &[],
        }
    }

    /// `<base>_<suffix>.csv`.
    pub fn path(self, base: &Path) -> PathBuf {
        let mut name = OsString::from(base.as_os_str());
        name.push(format!("_{}.csv", self.suffix()));
        PathBuf::from(name)
    }
}

/// Result of [`load_params`].
#[derive(Debug, Clone)]
pub struct LoadedParams {
    pub instance: Instance,
    pub report: LoadReport,
}

fn write_table(
    path: &Path,
    header: &[&str],
    rows: impl IntoIterator<Item = Vec<String>>,
) -> Result<(), InterchangeError> {
    let csv_err = |source| InterchangeError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = Writer::from_path(path).map_err(csv_err)?;
    wtr.write_record(header).map_err(csv_err)?;
    for row in rows {
        wtr.write_record(&row).map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| InterchangeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the nine parameter tables of `instance` next to `base`.
///
/// Floats use the shortest representation that parses back to the same
/// value, so [`load_params`] restores the arrays exactly.
pub fn write_params(instance: &Instance, base: impl AsRef<Path>) -> Result<Vec<PathBuf>, InterchangeError> {
    let base = base.as_ref();
    let d = instance.dims;
    let mut written = Vec::with_capacity(ParamFile::TABLES.len());

    let mut emit = |file: ParamFile, rows: Vec<Vec<String>>| -> Result<(), InterchangeError> {
        let path = file.path(base);
        write_table(&path, file.header(), rows)?;
        written.push(path);
        Ok(())
    };

    let kv = |k: &str, v: String| vec![k.to_string(), v];
    emit(
        ParamFile::General,
        vec![
            kv("numBerths", d.num_berths.to_string()),
            kv("numRows", d.num_rows.to_string()),
            kv("numSlotsPerRow", d.num_slots_per_row.to_string()),
            kv("numShips", d.num_ships.to_string()),
            kv("planningHorizon", instance.planning_horizon.to_string()),
            kv("numShipK", d.num_ship_k.to_string()),
            kv("width", instance.geometry.width.to_string()),
            kv("relativeHeight", instance.geometry.relative_height.to_string()),
            kv("alpha", instance.alpha.to_string()),
            kv("beta", instance.beta.to_string()),
        ],
    )?;

    let per_ship = |values: &[f64]| -> Vec<Vec<String>> {
        values
            .iter()
            .enumerate()
            .map(|(s, v)| vec![s.to_string(), v.to_string()])
            .collect()
    };
    emit(ParamFile::Arrival, per_ship(&instance.arrival_time))?;
    emit(ParamFile::CargoWeight, per_ship(&instance.cargo_weight))?;

    fn rows2<T: ToString>(cells: impl Iterator<Item = ((usize, usize), T)>) -> Vec<Vec<String>> {
        cells
            .map(|((i, j), v)| vec![i.to_string(), j.to_string(), v.to_string()])
            .collect()
    }
    fn rows3<T: ToString>(
        cells: impl Iterator<Item = ((usize, usize, usize), T)>,
    ) -> Vec<Vec<String>> {
        cells
            .map(|((i, j, k), v)| {
                vec![i.to_string(), j.to_string(), k.to_string(), v.to_string()]
            })
            .collect()
    }

    emit(ParamFile::CargoDensity, rows2(instance.cargo_density.indexed()))?;
    emit(
        ParamFile::MaxResponseAngle,
        rows2(instance.max_response_angle.indexed()),
    )?;
    emit(ParamFile::RequiredSlots, rows2(instance.required_slots.indexed()))?;
    emit(ParamFile::UnloadingSpeed, rows3(instance.unloading_speed.indexed()))?;
    emit(
        ParamFile::TransshipmentCost,
        rows3(instance.transshipment_cost.indexed()),
    )?;
    emit(ParamFile::StorageCost, rows3(instance.storage_cost.indexed()))?;

    info!(base = %base.display(), files = written.len(), "parameters written");
    Ok(written)
}

/// Writes one row per ship with every per-ship array spread over columns.
pub fn write_combined(instance: &Instance, base: impl AsRef<Path>) -> Result<PathBuf, InterchangeError> {
    let path = ParamFile::Combined.path(base.as_ref());
    let d = instance.dims;

    let mut header: Vec<String> = vec!["ship".into(), "arrivalTime".into(), "cargoWeight".into()];
    for name in ["requiredSlots", "cargoDensity", "maxResponseAngle"] {
        header.extend((0..d.num_ship_k).map(|k| format!("{name}_k{k}")));
    }
    for b in 0..d.num_berths {
        header.extend((0..d.num_ship_k).map(|k| format!("unloadingSpeed_b{b}_k{k}")));
    }
    for r in 0..d.num_rows {
        header.extend((0..d.num_ship_k).map(|k| format!("storageCost_r{r}_k{k}")));
    }
    let header_refs: Vec<&str> = header.iter().map(String::as_str).collect();

    let rows = (0..d.num_ships).map(|s| {
        let mut row = vec![
            s.to_string(),
            instance.arrival_time[s].to_string(),
            instance.cargo_weight[s].to_string(),
        ];
        row.extend((0..d.num_ship_k).map(|k| instance.required_slots[(s, k)].to_string()));
        row.extend((0..d.num_ship_k).map(|k| instance.cargo_density[(s, k)].to_string()));
        row.extend((0..d.num_ship_k).map(|k| instance.max_response_angle[(s, k)].to_string()));
        for b in 0..d.num_berths {
            row.extend((0..d.num_ship_k).map(|k| instance.unloading_speed[(s, b, k)].to_string()));
        }
        for r in 0..d.num_rows {
            row.extend((0..d.num_ship_k).map(|k| instance.storage_cost[(s, k, r)].to_string()));
        }
        row
    });

    write_table(&path, &header_refs, rows)?;
    Ok(path)
}

/// Largest array the loader allocates for an instance.
pub const MAX_TABLE_ENTRIES: usize = 1 << 26;

/// Reads every data record of a table, reporting the ones `apply` rejects.
///
/// A missing or unreadable table is reported and skipped.
fn read_table(
    file: ParamFile,
    base: &Path,
    report: &mut LoadReport,
    mut apply: impl FnMut(&StringRecord) -> Result<(), String>,
) {
    let path = file.path(base);
    let mut rdr = match ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(&path)
    {
        Ok(rdr) => rdr,
        Err(e) => {
            report.push(LoadWarning::new(&path, 0, format!("cannot open: {e}")));
            return;
        }
    };

    for result in rdr.records() {
        match result {
            Ok(record) => {
                if record.iter().all(str::is_empty) {
                    continue;
                }
                let line = record.position().map_or(0, |p| p.line());
                if let Err(reason) = apply(&record) {
                    report.push(LoadWarning::new(&path, line, reason));
                }
            }
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                report.push(LoadWarning::new(&path, line, e.to_string()));
                if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                    break;
                }
            }
        }
    }
}

fn field<T: std::str::FromStr>(record: &StringRecord, i: usize, name: &str) -> Result<T, String> {
    let raw = record
        .get(i)
        .ok_or_else(|| format!("missing column `{name}`"))?;
    raw.parse()
        .map_err(|_| format!("cannot parse `{name}` from {raw:?}"))
}

fn out_of_range(what: &str) -> String {
    format!("{what} index out of range")
}

/// Loads an instance written by [`write_params`] (or by hand).
///
/// Only a missing or unreadable general table is an error. Missing tables,
/// unparsable fields and out-of-range indices are skipped, leaving the
/// affected values at zero, and recorded in [`LoadedParams::report`].
pub fn load_params(base: impl AsRef<Path>) -> Result<LoadedParams, InterchangeError> {
    let base = base.as_ref();
    let general_path = ParamFile::General.path(base);
    if !general_path.is_file() {
        return Err(InterchangeError::MissingGeneral(general_path));
    }

    let mut report = LoadReport::default();
    let mut dims = Dimensions::new(0, 0, 0, 0, 0);
    let mut horizon = 0.0;
    let mut geometry = Geometry::new(0.0, 0.0);
    let (mut alpha, mut beta) = (1.0, 1.0);

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(&general_path)
        .map_err(|source| InterchangeError::Csv {
            path: general_path.clone(),
            source,
        })?;
    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(source) if matches!(source.kind(), csv::ErrorKind::Io(_)) => {
                return Err(InterchangeError::Csv {
                    path: general_path,
                    source,
                });
            }
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                report.push(LoadWarning::new(&general_path, line, e.to_string()));
                continue;
            }
        };
        let line = record.position().map_or(0, |p| p.line());
        let key = record.get(0).unwrap_or_default();
        let parsed = match key {
            "numBerths" => field(&record, 1, key).map(|v| dims.num_berths = v),
            "numRows" => field(&record, 1, key).map(|v| dims.num_rows = v),
            "numSlotsPerRow" => field(&record, 1, key).map(|v| dims.num_slots_per_row = v),
            "numShips" => field(&record, 1, key).map(|v| dims.num_ships = v),
            "numShipK" => field(&record, 1, key).map(|v| dims.num_ship_k = v),
            "planningHorizon" => field(&record, 1, key).map(|v| horizon = v),
            "width" => field(&record, 1, key).map(|v| geometry.width = v),
            "relativeHeight" => field(&record, 1, key).map(|v| geometry.relative_height = v),
            "alpha" => field(&record, 1, key).map(|v| alpha = v),
            "beta" => field(&record, 1, key).map(|v| beta = v),
            "" => continue,
            other => Err(format!("unknown key `{other}`")),
        };
        if let Err(reason) = parsed {
            report.push(LoadWarning::new(&general_path, line, reason));
        }
    }

    match dims.largest_table() {
        Some(entries) if entries <= MAX_TABLE_ENTRIES => {}
        _ => {
            return Err(InterchangeError::TooLarge {
                path: general_path,
                dims,
            })
        }
    }

    let mut inst = Instance::zeroed(dims, horizon, geometry);
    inst.alpha = alpha;
    inst.beta = beta;

    read_table(ParamFile::Arrival, base, &mut report, |rec| {
        let s: usize = field(rec, 0, "ship")?;
        let v: f64 = field(rec, 1, "arrivalTime")?;
        *inst.arrival_time.get_mut(s).ok_or_else(|| out_of_range("ship"))? = v;
        Ok(())
    });
    read_table(ParamFile::CargoWeight, base, &mut report, |rec| {
        let s: usize = field(rec, 0, "ship")?;
        let v: f64 = field(rec, 1, "weight")?;
        *inst.cargo_weight.get_mut(s).ok_or_else(|| out_of_range("ship"))? = v;
        Ok(())
    });
    read_table(ParamFile::CargoDensity, base, &mut report, |rec| {
        let (s, k, v): (usize, usize, f64) =
            (field(rec, 0, "ship")?, field(rec, 1, "k")?, field(rec, 2, "value")?);
        *inst
            .cargo_density
            .get_mut(s, k)
            .ok_or_else(|| out_of_range("ship/k"))? = v;
        Ok(())
    });
    read_table(ParamFile::MaxResponseAngle, base, &mut report, |rec| {
        let (s, k, v): (usize, usize, f64) =
            (field(rec, 0, "ship")?, field(rec, 1, "k")?, field(rec, 2, "value")?);
        *inst
            .max_response_angle
            .get_mut(s, k)
            .ok_or_else(|| out_of_range("ship/k"))? = v;
        Ok(())
    });
    read_table(ParamFile::RequiredSlots, base, &mut report, |rec| {
        let (s, k, v): (usize, usize, u32) =
            (field(rec, 0, "ship")?, field(rec, 1, "k")?, field(rec, 2, "value")?);
        *inst
            .required_slots
            .get_mut(s, k)
            .ok_or_else(|| out_of_range("ship/k"))? = v;
        Ok(())
    });
    read_table(ParamFile::UnloadingSpeed, base, &mut report, |rec| {
        let (s, b, k, v): (usize, usize, usize, f64) = (
            field(rec, 0, "ship")?,
            field(rec, 1, "berth")?,
            field(rec, 2, "k")?,
            field(rec, 3, "value")?,
        );
        *inst
            .unloading_speed
            .get_mut(s, b, k)
            .ok_or_else(|| out_of_range("ship/berth/k"))? = v;
        Ok(())
    });
    read_table(ParamFile::TransshipmentCost, base, &mut report, |rec| {
        let (b, r, v, c): (usize, usize, usize, f64) = (
            field(rec, 0, "berth")?,
            field(rec, 1, "row")?,
            field(rec, 2, "slot")?,
            field(rec, 3, "value")?,
        );
        *inst
            .transshipment_cost
            .get_mut(b, r, v)
            .ok_or_else(|| out_of_range("berth/row/slot"))? = c;
        Ok(())
    });
    read_table(ParamFile::StorageCost, base, &mut report, |rec| {
        let (s, k, r, c): (usize, usize, usize, f64) = (
            field(rec, 0, "ship")?,
            field(rec, 1, "k")?,
            field(rec, 2, "row")?,
            field(rec, 3, "value")?,
        );
        *inst
            .storage_cost
            .get_mut(s, k, r)
            .ok_or_else(|| out_of_range("ship/k/row"))? = c;
        Ok(())
    });

    for w in &report.warnings {
        warn!(file = %w.file.display(), line = w.line, reason = %w.reason, "parameter record skipped");
    }
    info!(
        base = %base.display(),
        ships = dims.num_ships,
        berths = dims.num_berths,
        warnings = report.warnings.len(),
        "parameters loaded"
    );

    Ok(LoadedParams {
        instance: inst,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{GeneratorConfig, InstanceGenerator};
    use std::fs;

    fn generated() -> Instance {
        let config = GeneratorConfig::new(2, 3)
            .with_yard(4, 10)
            .with_compartments(2)
            .with_seed(7);
        InstanceGenerator::generate(&config).unwrap()
    }

    #[test]
    fn test_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("inst");
        let inst = generated();

        let files = write_params(&inst, &base).unwrap();
        assert_eq!(files.len(), 9);
        assert!(files[0].ends_with("inst_general.csv"));

        let loaded = load_params(&base).unwrap();
        assert!(loaded.report.is_clean(), "{:?}", loaded.report.warnings);
        assert_eq!(loaded.instance, inst);
    }

    #[test]
    fn test_headers_match_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("inst");
        write_params(&generated(), &base).unwrap();

        let text = fs::read_to_string(ParamFile::UnloadingSpeed.path(&base)).unwrap();
        assert!(text.starts_with("ship,berth,k,value\n0,0,0,"));
        let text = fs::read_to_string(ParamFile::General.path(&base)).unwrap();
        assert!(text.starts_with("key,value\nnumBerths,2\nnumRows,4\n"));
    }

    #[test]
    fn test_bad_records_are_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("inst");
        let inst = generated();
        write_params(&inst, &base).unwrap();

        let storage = ParamFile::StorageCost.path(&base);
        let mut text = fs::read_to_string(&storage).unwrap();
        // zero the first data row, then append broken ones
        text = text.replacen("0,0,0,", "0,0,0,abc\n#", 1);
        text.push_str("9,0,0,5\n");
        text.push_str("0,1\n");
        fs::write(&storage, text).unwrap();
        fs::remove_file(ParamFile::Arrival.path(&base)).unwrap();

        let loaded = load_params(&base).unwrap();
        let w = &loaded.report.warnings;
        assert_eq!(w.iter().filter(|w| w.file == storage).count(), 4);
        assert!(w.iter().any(|w| w.reason.contains("out of range")));
        assert!(w
            .iter()
            .any(|w| w.file == ParamFile::Arrival.path(&base) && w.line == 0));
        assert_eq!(loaded.instance.storage_cost[(0, 0, 0)], 0.0);
        assert!(loaded.instance.arrival_time.iter().all(|&a| a == 0.0));
        assert_eq!(loaded.instance.cargo_weight, inst.cargo_weight);
    }

    #[test]
    fn test_missing_general_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nothing");
        assert!(matches!(
            load_params(&base),
            Err(InterchangeError::MissingGeneral(_))
        ));
    }

    #[test]
    fn test_unknown_general_key_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("inst");
        write_params(&generated(), &base).unwrap();
        let general = ParamFile::General.path(&base);
        let mut text = fs::read_to_string(&general).unwrap();
        text.push_str("gravity,9.81\n");
        fs::write(&general, text).unwrap();

        let loaded = load_params(&base).unwrap();
        assert_eq!(loaded.report.warnings.len(), 1);
        assert!(loaded.report.warnings[0].reason.contains("gravity"));
    }

    #[test]
    fn test_undecodable_general_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("inst");
        let inst = generated();
        write_params(&inst, &base).unwrap();
        let general = ParamFile::General.path(&base);
        let mut bytes = fs::read(&general).unwrap();
        bytes.extend_from_slice(b"comment,\xff\xfe\n");
        fs::write(&general, bytes).unwrap();

        let loaded = load_params(&base).unwrap();
        let w = &loaded.report.warnings;
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].file, general);
        assert!(w[0].line > 0);
        assert_eq!(loaded.instance, inst);
    }

    #[test]
    fn test_oversized_dimensions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for (rows, slots) in [("100000", "100000"), ("4000000000", "4000000000")] {
            let base = dir.path().join(format!("huge_{rows}"));
            let text = format!(
                "key,value\nnumBerths,2\nnumRows,{rows}\nnumSlotsPerRow,{slots}\n\
                 numShips,1\nnumShipK,1\nplanningHorizon,10\n"
            );
            fs::write(ParamFile::General.path(&base), text).unwrap();
            assert!(matches!(
                load_params(&base),
                Err(InterchangeError::TooLarge { .. })
            ));
        }
    }

    #[test]
    fn test_combined_layout() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("inst");
        let inst = generated();
        let path = write_combined(&inst, &base).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let mut lines = text.lines();
        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        // 3 + 3 * K + B * K + R * K
        assert_eq!(header.len(), 3 + 6 + 4 + 8);
        assert_eq!(header[3], "requiredSlots_k0");
        assert_eq!(header.last(), Some(&"storageCost_r3_k1"));
        assert_eq!(lines.count(), 3);
    }
}
