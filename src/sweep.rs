use std::path::Path;

use anyhow::{Context, Result};

/// An ordered, strictly decreasing run of integer levels.
///
/// Levels start at `start` and drop by `step` until they would reach the
/// floor. With an inclusive floor the floor itself is tried, otherwise the
/// last level is the first one strictly above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSweep {
    pub start: u32,
    pub step: u32,
    pub floor: u32,
    pub floor_inclusive: bool,
}

impl ParameterSweep {
    pub fn new(start: u32, step: u32, floor: u32, floor_inclusive: bool) -> Self {
        Self {
            start,
            step: step.max(1),
            floor,
            floor_inclusive,
        }
    }

    /// A sweep that tries exactly one level.
    pub fn single(level: u32) -> Self {
        Self::new(level, 1, level, true)
    }

    fn admits(&self, level: u32) -> bool {
        if self.floor_inclusive {
            level >= self.floor
        } else {
            level > self.floor
        }
    }

    pub fn levels(&self) -> impl Iterator<Item = u32> + '_ {
        let mut next = Some(self.start);
        std::iter::from_fn(move || {
            let level = next.filter(|l| self.admits(*l))?;
            next = level.checked_sub(self.step);
            Some(level)
        })
    }

    pub fn len(&self) -> usize {
        self.levels().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Produces one candidate artifact for a given level.
pub trait Render {
    fn render(&mut self, level: u32, output: &Path) -> Result<()>;
}

impl<F> Render for F
where
    F: FnMut(u32, &Path) -> Result<()>,
{
    fn render(&mut self, level: u32, output: &Path) -> Result<()> {
        self(level, output)
    }
}

/// One render-and-measure step of a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub level: u32,
    pub size: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Level and size of the first attempt that met the target.
    pub reached: Option<(u32, u64)>,
    pub steps: Vec<Step>,
}

impl SearchOutcome {
    pub fn success(&self) -> bool {
        self.reached.is_some()
    }

    /// Size of the artifact currently on disk, if the last step produced one.
    pub fn last_size(&self) -> Option<u64> {
        self.steps.last().and_then(|s| s.size)
    }
}

pub fn measure(path: &Path) -> Result<u64> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat output {}", path.display()))?;
    Ok(meta.len())
}

/// Linear search down the sweep for the first level whose output fits the budget.
pub fn search<R: Render + ?Sized>(
    render: &mut R,
    sweep: &ParameterSweep,
    output: &Path,
    target_bytes: u64,
) -> SearchOutcome {
    let mut steps = Vec::new();

    for level in sweep.levels() {
        let measured = render
            .render(level, output)
            .and_then(|_| measure(output));

        match measured {
            Ok(size) => {
                log::debug!("level {}: {} bytes (target {})", level, size, target_bytes);
                steps.push(Step {
                    level,
                    size: Some(size),
                    error: None,
                });
                if size <= target_bytes {
                    return SearchOutcome {
                        reached: Some((level, size)),
                        steps,
                    };
                }
            }
            Err(e) => {
                log::warn!("level {} failed: {:#}", level, e);
                steps.push(Step {
                    level,
                    size: None,
                    error: Some(format!("{:#}", e)),
                });
            }
        }
    }

    SearchOutcome {
        reached: None,
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn write_len(bytes: u64, output: &Path) -> Result<()> {
        std::fs::write(output, vec![0u8; bytes as usize])?;
        Ok(())
    }

    #[test]
    fn image_sweep_runs_95_down_to_10() {
        let sweep = ParameterSweep::new(95, 5, 10, true);
        let levels: Vec<_> = sweep.levels().collect();
        assert_eq!(levels.first(), Some(&95));
        assert_eq!(levels.last(), Some(&10));
        assert_eq!(levels.len(), 18);
        assert!(levels.windows(2).all(|w| w[0] - w[1] == 5));
    }

    #[test]
    fn exclusive_floor_is_never_tried() {
        let sweep = ParameterSweep::new(100, 10, 10, false);
        let levels: Vec<_> = sweep.levels().collect();
        assert_eq!(levels, vec![100, 90, 80, 70, 60, 50, 40, 30, 20]);
    }

    #[test]
    fn step_past_zero_stops() {
        let sweep = ParameterSweep::new(7, 5, 0, true);
        assert_eq!(sweep.levels().collect::<Vec<_>>(), vec![7, 2]);
    }

    #[test]
    fn start_below_floor_is_empty() {
        assert!(ParameterSweep::new(5, 5, 10, true).is_empty());
        assert_eq!(ParameterSweep::single(42).levels().collect::<Vec<_>>(), vec![42]);
    }

    #[test]
    fn stops_at_first_level_under_target() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bin");
        let sweep = ParameterSweep::new(95, 5, 10, true);
        // Size shrinks with level: level * 100 bytes.
        let mut render = |level: u32, path: &Path| write_len(level as u64 * 100, path);

        let outcome = search(&mut render, &sweep, &out, 5_000);
        assert_eq!(outcome.reached, Some((50, 5_000)));
        assert_eq!(outcome.steps.len(), 10);
        assert_eq!(std::fs::metadata(&out).unwrap().len(), 5_000);
    }

    #[test]
    fn first_attempt_can_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bin");
        let sweep = ParameterSweep::new(95, 5, 10, true);
        let mut render = |_level: u32, path: &Path| write_len(10, path);

        let outcome = search(&mut render, &sweep, &out, 10);
        assert_eq!(outcome.reached, Some((95, 10)));
        assert_eq!(outcome.steps.len(), 1);
    }

    #[test]
    fn unreachable_target_exhausts_sweep_and_keeps_last_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bin");
        let sweep = ParameterSweep::new(95, 5, 10, true);
        let mut render = |level: u32, path: &Path| write_len(level as u64 * 100, path);

        let outcome = search(&mut render, &sweep, &out, 999);
        assert!(!outcome.success());
        assert_eq!(outcome.steps.len(), sweep.len());
        assert_eq!(outcome.steps.last().unwrap().level, 10);
        assert_eq!(outcome.last_size(), Some(1_000));
        assert_eq!(std::fs::metadata(&out).unwrap().len(), 1_000);
    }

    #[test]
    fn failed_renders_do_not_stop_the_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bin");
        let sweep = ParameterSweep::new(100, 10, 10, false);
        let mut render = |level: u32, path: &Path| {
            if level > 60 {
                Err(anyhow!("encoder choked at {}", level))
            } else {
                write_len(level as u64, path)
            }
        };

        let outcome = search(&mut render, &sweep, &out, 60);
        assert_eq!(outcome.reached, Some((60, 60)));
        assert_eq!(outcome.steps.len(), 5);
        assert!(outcome.steps[..4].iter().all(|s| s.error.is_some() && s.size.is_none()));
    }

    #[test]
    fn render_that_writes_nothing_counts_as_failed_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never-written.bin");
        let sweep = ParameterSweep::single(1);
        let mut render = |_level: u32, _path: &Path| Ok(());

        let outcome = search(&mut render, &sweep, &out, u64::MAX);
        assert!(!outcome.success());
        assert!(outcome.steps[0].error.as_deref().unwrap().contains("Failed to stat"));
    }

    #[test]
    fn repeated_searches_agree() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bin");
        let sweep = ParameterSweep::new(95, 5, 10, true);
        let mut render = |level: u32, path: &Path| write_len((level as u64).pow(2), path);

        let first = search(&mut render, &sweep, &out, 2_000);
        let second = search(&mut render, &sweep, &out, 2_000);
        assert_eq!(first, second);
        assert_eq!(first.reached, Some((40, 1_600)));
    }
}
