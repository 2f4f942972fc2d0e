//! CPLEX LP text export, for diagnosing models outside this crate.

use super::model::{LinearExpr, MilpModel, Sense};
use super::variables::VarKind;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;

/// Renders `model` in CPLEX LP format.
///
/// Constraint rows are named `<family>_<n>`, with `n` counting within the
/// family. Missing objectives are written as `obj: 0`.
pub fn to_lp_string(model: &MilpModel) -> String {
    let names: Vec<&str> = model.variables().iter().map(|v| v.name.as_str()).collect();
    let mut out = String::new();

    let _ = writeln!(out, "\\ Model {}", model.name);
    let (sense, objective) = match model.objective() {
        Some(o) => (o.sense, Some(&o.expr)),
        None => (Sense::Minimize, None),
    };
    out.push_str(match sense {
        Sense::Minimize => "Minimize\n",
        Sense::Maximize => "Maximize\n",
    });
    out.push_str(" obj: ");
    match objective {
        Some(expr) => {
            out.push_str(&render_expr(expr, &names));
            if expr.constant != 0.0 {
                let _ = write!(out, " {} {}", sign(expr.constant), expr.constant.abs());
            }
        }
        None => out.push('0'),
    }
    out.push('\n');

    out.push_str("Subject To\n");
    let mut seen = std::collections::HashMap::<&str, usize>::new();
    for c in model.constraints() {
        let n = seen.entry(c.family).or_insert(0);
        let _ = writeln!(
            out,
            " {}_{}: {} {} {}",
            c.family,
            n,
            render_expr(&c.expr, &names),
            c.relation.symbol(),
            c.rhs
        );
        *n += 1;
    }

    out.push_str("Bounds\n");
    for v in model.variables().iter().filter(|v| v.kind == VarKind::Continuous) {
        if v.upper.is_finite() {
            let _ = writeln!(out, " {} <= {} <= {}", v.lower, v.name, v.upper);
        } else {
            let _ = writeln!(out, " {} >= {}", v.name, v.lower);
        }
    }

    let binaries: Vec<&str> = model
        .variables()
        .iter()
        .filter(|v| v.is_binary())
        .map(|v| v.name.as_str())
        .collect();
    if !binaries.is_empty() {
        out.push_str("Binaries\n");
        for chunk in binaries.chunks(8) {
            let _ = writeln!(out, " {}", chunk.join(" "));
        }
    }
    out.push_str("End\n");
    out
}

/// Writes `model` to `path` in CPLEX LP format.
pub fn write_lp(model: &MilpModel, path: impl AsRef<Path>) -> io::Result<()> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    file.write_all(to_lp_string(model).as_bytes())?;
    file.flush()
}

fn sign(value: f64) -> char {
    if value < 0.0 {
        '-'
    } else {
        '+'
    }
}

fn render_expr(expr: &LinearExpr, names: &[&str]) -> String {
    let compact = expr.compact();
    if compact.terms.is_empty() {
        return "0".to_string();
    }
    let mut out = String::new();
    for (i, &(v, c)) in compact.terms.iter().enumerate() {
        let name = names.get(v.index()).copied().unwrap_or("?");
        if i == 0 {
            if c < 0.0 {
                out.push_str("- ");
            }
        } else {
            let _ = write!(out, " {} ", sign(c));
        }
        if c.abs() != 1.0 {
            let _ = write!(out, "{} ", c.abs());
        }
        out.push_str(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MilpModel {
        let mut model = MilpModel::new("sample");
        let z = model.add_binary("z_0_0").unwrap();
        let e = model.add_continuous("e_0", 2.0, 10.0).unwrap();
        let t = model.add_continuous("tau_0", 0.0, f64::INFINITY).unwrap();
        model.add_eq("single_berth", LinearExpr::from(z), 1.0);
        model.add_le(
            "no_overlap",
            LinearExpr::new().with(e, 1.0).with(z, -8.0),
            2.0,
        );
        model.set_objective(
            Sense::Minimize,
            LinearExpr::new().with(e, 3.0).with(t, 1.0).plus(-2.0),
        );
        model
    }

    #[test]
    fn test_sections_and_rows() {
        let lp = to_lp_string(&sample());
        assert!(lp.starts_with("\\ Model sample\nMinimize\n obj: 3 e_0 + tau_0 - 2\n"));
        assert!(lp.contains(" single_berth_0: z_0_0 = 1\n"));
        assert!(lp.contains(" no_overlap_0: e_0 - 8 z_0_0 <= 2\n"));
        assert!(lp.contains(" 2 <= e_0 <= 10\n"));
        assert!(lp.contains(" tau_0 >= 0\n"));
        assert!(lp.contains("Binaries\n z_0_0\n"));
        assert!(lp.ends_with("End\n"));
    }

    #[test]
    fn test_every_variable_and_row_exported() {
        let model = sample();
        let lp = to_lp_string(&model);
        for v in model.variables() {
            assert!(lp.contains(&v.name));
        }
        let rows = lp
            .lines()
            .skip_while(|l| *l != "Subject To")
            .skip(1)
            .take_while(|l| *l != "Bounds")
            .count();
        assert_eq!(rows, model.constraint_count());
    }

    #[test]
    fn test_write_lp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.lp");
        write_lp(&sample(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, to_lp_string(&sample()));
    }
}
