//! Exit combinations: the fixed catalog of take-profit / stop-loss pairs that
//! backtest results are grouped by.

use serde::{Deserialize, Serialize};

/// A (take-profit, stop-loss) pair from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExitCombination {
    /// 1-based ordinal in the catalog.
    pub ordinal: u8,
    pub take_profit: u8,
    pub stop_loss: u8,
}

const fn combo(ordinal: u8, take_profit: u8, stop_loss: u8) -> ExitCombination {
    ExitCombination {
        ordinal,
        take_profit,
        stop_loss,
    }
}

pub const CATALOG: [ExitCombination; 25] = [
    combo(1, 10, 10),
    combo(2, 10, 15),
    combo(3, 15, 10),
    combo(4, 15, 15),
    combo(5, 20, 10),
    combo(6, 20, 15),
    combo(7, 10, 20),
    combo(8, 15, 20),
    combo(9, 20, 20),
    combo(10, 20, 25),
    combo(11, 25, 20),
    combo(12, 25, 25),
    combo(13, 25, 30),
    combo(14, 30, 25),
    combo(15, 20, 30),
    combo(16, 30, 20),
    combo(17, 30, 30),
    combo(18, 30, 35),
    combo(19, 35, 30),
    combo(20, 35, 35),
    combo(21, 35, 40),
    combo(22, 40, 35),
    combo(23, 30, 40),
    combo(24, 40, 30),
    combo(25, 40, 40),
];

impl ExitCombination {
    /// Percentages as stored in the catalog (tenths of a percent): 10 is 1.0%.
    pub fn take_profit_percent(&self) -> f64 {
        f64::from(self.take_profit) / 10.0
    }

    pub fn stop_loss_percent(&self) -> f64 {
        f64::from(self.stop_loss) / 10.0
    }

    /// `TP10_SL15`
    pub fn id(&self) -> String {
        format!("TP{}_SL{}", self.take_profit, self.stop_loss)
    }

    /// `02_TP10_SL15`
    pub fn path(&self) -> String {
        format!("{:02}_{}", self.ordinal, self.id())
    }

    /// Look up the catalog entry for percentages such as `(1.0, 1.5)`.
    pub fn find(take_profit: f64, stop_loss: f64) -> Option<ExitCombination> {
        let tp = to_tenths(take_profit)?;
        let sl = to_tenths(stop_loss)?;
        CATALOG
            .iter()
            .copied()
            .find(|c| c.take_profit == tp && c.stop_loss == sl)
    }

    /// Look up by id (`TP10_SL15`) or path (`02_TP10_SL15`).
    pub fn by_id(id: &str) -> Option<ExitCombination> {
        CATALOG
            .iter()
            .copied()
            .find(|c| c.id() == id || c.path() == id)
    }

    pub fn all() -> &'static [ExitCombination] {
        &CATALOG
    }
}

impl std::fmt::Display for ExitCombination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

fn to_tenths(percent: f64) -> Option<u8> {
    let tenths = (percent * 10.0).round();
    if !percent.is_finite() || (percent * 10.0 - tenths).abs() > 1e-6 || !(0.0..=255.0).contains(&tenths) {
        return None;
    }
    Some(tenths as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_paths() {
        assert_eq!(CATALOG[0].path(), "01_TP10_SL10");
        assert_eq!(CATALOG[14].path(), "15_TP20_SL30");
        assert_eq!(CATALOG[24].path(), "25_TP40_SL40");
    }

    #[test]
    fn ordinals_are_sequential_and_pairs_unique() {
        for (i, c) in CATALOG.iter().enumerate() {
            assert_eq!(c.ordinal as usize, i + 1);
        }
        let mut ids: Vec<String> = CATALOG.iter().map(|c| c.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), CATALOG.len());
    }

    #[test]
    fn find_by_percentages() {
        let c = ExitCombination::find(1.5, 2.0).unwrap();
        assert_eq!(c.path(), "08_TP15_SL20");
        assert_eq!(c.take_profit_percent(), 1.5);
        assert_eq!(c.stop_loss_percent(), 2.0);
        assert_eq!(ExitCombination::find(1.0, 4.0), None);
        assert_eq!(ExitCombination::find(1.23, 1.0), None);
    }

    #[test]
    fn by_id_accepts_id_or_path() {
        assert_eq!(ExitCombination::by_id("TP40_SL30"), Some(CATALOG[23]));
        assert_eq!(ExitCombination::by_id("24_TP40_SL30"), Some(CATALOG[23]));
        assert_eq!(ExitCombination::by_id("TP45_SL45"), None);
    }
}
