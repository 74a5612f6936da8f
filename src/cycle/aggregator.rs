use super::parser::ParsedReading;

/// Lines per sampling window.
pub(crate) const WINDOW_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WindowSummary {
    pub avg_load: f64,
    pub avg_trash: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum WindowStatus {
    Open,
    Full(WindowSummary),
}

/// Running sums over one window. Not reset after reporting `Full`: every
/// later observation reports `Full` again, so build a fresh aggregator for
/// each window.
#[derive(Debug, Clone)]
pub(crate) struct SampleAggregator {
    loads: Vec<f64>,
    trash: Vec<f64>,
    count: usize,
    window_size: usize,
}

impl SampleAggregator {
    pub(crate) fn new(window_size: usize) -> Self {
        Self {
            loads: Vec::with_capacity(window_size),
            trash: Vec::with_capacity(window_size),
            count: 0,
            window_size,
        }
    }

    pub(crate) fn observe(&mut self, reading: ParsedReading) -> WindowStatus {
        self.count += 1;
        match reading {
            ParsedReading::LoadGrams(grams) => self.loads.push(grams),
            ParsedReading::TrashPercent(percent) => self.trash.push(percent),
            ParsedReading::Unrecognized => {}
        }

        if self.count >= self.window_size {
            WindowStatus::Full(self.summary())
        } else {
            WindowStatus::Open
        }
    }

    /// Lines observed so far, recognized or not.
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn summary(&self) -> WindowSummary {
        WindowSummary {
            avg_load: mean(&self.loads),
            avg_trash: mean(&self.trash),
        }
    }
}

impl Default for SampleAggregator {
    fn default() -> Self {
        Self::new(WINDOW_SIZE)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_window_averages_to_zero() {
        let mut agg = SampleAggregator::default();
        let mut status = WindowStatus::Open;
        for _ in 0..WINDOW_SIZE {
            status = agg.observe(ParsedReading::Unrecognized);
        }
        assert_eq!(
            status,
            WindowStatus::Full(WindowSummary {
                avg_load: 0.0,
                avg_trash: 0.0
            })
        );
    }

    #[test]
    fn stays_full_after_threshold() {
        let mut agg = SampleAggregator::new(3);
        assert_eq!(agg.observe(ParsedReading::LoadGrams(1.0)), WindowStatus::Open);
        assert_eq!(agg.observe(ParsedReading::LoadGrams(2.0)), WindowStatus::Open);
        assert!(matches!(
            agg.observe(ParsedReading::LoadGrams(3.0)),
            WindowStatus::Full(_)
        ));
        assert!(matches!(
            agg.observe(ParsedReading::Unrecognized),
            WindowStatus::Full(_)
        ));
        assert_eq!(agg.count(), 4);
    }

    #[test]
    fn mixed_window() {
        let mut agg = SampleAggregator::default();
        let mut last = WindowStatus::Open;
        for i in 0..WINDOW_SIZE {
            let reading = match i % 5 {
                0 | 1 | 2 => ParsedReading::LoadGrams(if i % 2 == 0 { 100.0 } else { 200.0 }),
                3 => ParsedReading::TrashPercent(50.0),
                _ => ParsedReading::Unrecognized,
            };
            last = agg.observe(reading);
        }
        let WindowStatus::Full(summary) = last else {
            panic!("window should be full");
        };
        assert!((summary.avg_load - 150.0).abs() < 1e-9);
        assert_eq!(summary.avg_trash, 50.0);
    }

    proptest! {
        #[test]
        fn load_average_over_recognized_lines(
            loads in proptest::collection::vec(-5000.0f64..5000.0, 0..=WINDOW_SIZE)
        ) {
            let mut agg = SampleAggregator::default();
            let mut statuses = Vec::new();
            for grams in &loads {
                statuses.push(agg.observe(ParsedReading::LoadGrams(grams.abs())));
            }
            for _ in loads.len()..WINDOW_SIZE {
                statuses.push(agg.observe(ParsedReading::Unrecognized));
            }

            prop_assert_eq!(agg.count(), WINDOW_SIZE);
            prop_assert!(statuses[..WINDOW_SIZE - 1].iter().all(|s| *s == WindowStatus::Open));

            let expected = if loads.is_empty() {
                0.0
            } else {
                loads.iter().map(|v| v.abs()).sum::<f64>() / loads.len() as f64
            };
            match statuses[WINDOW_SIZE - 1] {
                WindowStatus::Full(summary) => {
                    prop_assert!((summary.avg_load - expected).abs() < 1e-6);
                    prop_assert_eq!(summary.avg_trash, 0.0);
                }
                WindowStatus::Open => prop_assert!(false, "window not full after {} lines", WINDOW_SIZE),
            }
        }

        #[test]
        fn full_after_exactly_window_size_lines(
            kinds in proptest::collection::vec(0u8..3, WINDOW_SIZE)
        ) {
            let mut agg = SampleAggregator::default();
            for (i, kind) in kinds.iter().enumerate() {
                let reading = match kind {
                    0 => ParsedReading::LoadGrams(1.0),
                    1 => ParsedReading::TrashPercent(1.0),
                    _ => ParsedReading::Unrecognized,
                };
                let status = agg.observe(reading);
                prop_assert_eq!(matches!(status, WindowStatus::Full(_)), i + 1 == WINDOW_SIZE);
            }
        }
    }
}
