use ibs_core::errors::{ErrorInfo, IbsError};
use ibs_core::{ElementIntegrals, PartitionNumbers, RadiationIntegrals, TwissTable};

fn optional_column<'a>(table: &'a TwissTable, name: &str) -> Result<Option<&'a [f64]>, IbsError> {
    if table.contains(name) {
        table.column(name).map(Some)
    } else {
        Ok(None)
    }
}

fn curly_h(beta: f64, alpha: f64, d: f64, dp: f64) -> f64 {
    let gamma = (1.0 + alpha * alpha) / beta;
    gamma * d * d + 2.0 * alpha * d * dp + beta * dp * dp
}

/// Derives per-element radiation integrals from a MAD-X style twiss table.
///
/// Bends are treated as sector magnets without edge focusing. `L`, `ANGLE`,
/// `BETX`, `ALFX`, `DX` and `DPX` are required; `K1L` and the vertical
/// columns default to zero when absent. Only horizontal bending is modelled,
/// so `i4y` is always zero.
pub fn element_integrals_from_twiss(table: &TwissTable) -> Result<Vec<ElementIntegrals>, IbsError> {
    let length = table.column("L")?;
    let angle = table.column("ANGLE")?;
    let betx = table.column("BETX")?;
    let alfx = table.column("ALFX")?;
    let dx = table.column("DX")?;
    let dpx = table.column("DPX")?;
    let k1l = optional_column(table, "K1L")?;
    let bety = optional_column(table, "BETY")?;
    let alfy = optional_column(table, "ALFY")?;
    let dy = optional_column(table, "DY")?;
    let dpy = optional_column(table, "DPY")?;

    let at = |column: Option<&[f64]>, row: usize| column.and_then(|c| c.get(row)).copied();

    let mut elements = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let l = length[row];
        let theta = angle[row];
        if l <= 0.0 || theta == 0.0 {
            elements.push(ElementIntegrals::default());
            continue;
        }
        if betx[row] <= 0.0 {
            return Err(IbsError::Lattice(
                ErrorInfo::new("invalid-twiss", "horizontal beta must be positive in bends")
                    .with_context("row", row.to_string()),
            ));
        }
        let inv_rho = theta / l;
        let k = at(k1l, row).unwrap_or(0.0) / l;
        let abs_inv_rho3 = inv_rho.abs().powi(3);

        let hx = curly_h(betx[row], alfx[row], dx[row], dpx[row]);
        let hy = match (at(bety, row), at(alfy, row), at(dy, row), at(dpy, row)) {
            (Some(b), alpha, d, dp) if b > 0.0 => curly_h(
                b,
                alpha.unwrap_or(0.0),
                d.unwrap_or(0.0),
                dp.unwrap_or(0.0),
            ),
            _ => 0.0,
        };

        elements.push(ElementIntegrals {
            i1: dx[row] * inv_rho * l,
            i2: inv_rho * inv_rho * l,
            i3: abs_inv_rho3 * l,
            i4x: dx[row] * inv_rho * (inv_rho * inv_rho + 2.0 * k) * l,
            i4y: 0.0,
            i5x: hx * abs_inv_rho3 * l,
            i5y: hy * abs_inv_rho3 * l,
        });
    }
    Ok(elements)
}

/// Damping partition numbers `Jx = 1 − I4x/I2`, `Jy = 1 − I4y/I2`,
/// `Js = 2 + (I4x + I4y)/I2`.
pub fn partition_numbers(integrals: &RadiationIntegrals) -> Result<PartitionNumbers, IbsError> {
    let partition = PartitionNumbers {
        jx: 1.0 - integrals.i4x / integrals.i2,
        jy: 1.0 - integrals.i4y / integrals.i2,
        js: 2.0 + (integrals.i4x + integrals.i4y) / integrals.i2,
    };
    for (plane, value) in [("x", partition.jx), ("y", partition.jy), ("s", partition.js)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(IbsError::Lattice(
                ErrorInfo::new("anti-damping", "partition number is not positive")
                    .with_context("plane", plane)
                    .with_value("value", value),
            ));
        }
    }
    Ok(partition)
}
