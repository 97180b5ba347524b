/// Breakpoint set paired with the level values it partitions the score domain into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelTable<'a> {
    breakpoints: &'a [i64],
    levels: &'a [i64],
}

impl<'a> LevelTable<'a> {
    /// Returns `None` unless there is exactly one more level than breakpoints.
    pub fn new(breakpoints: &'a [i64], levels: &'a [i64]) -> Option<Self> {
        if levels.len() != breakpoints.len() + 1 {
            return None;
        }
        Some(Self {
            breakpoints,
            levels,
        })
    }

    /// Level for `value`; a value equal to a breakpoint lands on the higher side.
    pub fn resolve(&self, value: i64) -> i64 {
        let crossed = self
            .breakpoints
            .iter()
            .filter(|threshold| value >= **threshold)
            .count();
        self.levels[crossed]
    }

    pub fn breakpoints(&self) -> &'a [i64] {
        self.breakpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_shapes() {
        assert!(LevelTable::new(&[25, 50], &[0, 1]).is_none());
        assert!(LevelTable::new(&[], &[7]).is_some());
    }

    #[test]
    fn resolves_across_breakpoints() {
        let table = LevelTable::new(&[25, 50, 75], &[10, 20, 30, 40]).expect("valid table");
        assert_eq!(table.resolve(i64::MIN), 10);
        assert_eq!(table.resolve(10), 10);
        assert_eq!(table.resolve(25), 20);
        assert_eq!(table.resolve(52), 30);
        assert_eq!(table.resolve(75), 40);
        assert_eq!(table.resolve(100), 40);
    }
}
